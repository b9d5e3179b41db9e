//! # Auth
//!
//! Optional bearer-token resolution. The hosted auth provider owns real
//! sessions; this service only maps issued API tokens to user ids so ranking
//! can personalize. A missing, malformed, or unknown token degrades to
//! anonymous scoring — auth failure is never a request error here.
//!
//! Tokens load from JSON (`{ "token": "user-id", ... }`) with an empty map as
//! the safe default: no file means everyone is anonymous.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_TOKENS_PATH: &str = "config/api_tokens.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenMap {
    #[serde(flatten)]
    tokens: HashMap<String, String>,
}

impl TokenMap {
    /// Load from a JSON file. Falls back to an empty map on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Single-token map, handy for local development and tests.
    pub fn with_token(token: &str, user_id: &str) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token.to_string(), user_id.to_string());
        Self { tokens }
    }

    /// Resolve an `Authorization` header value to a user id.
    /// Anything unexpected yields None (anonymous), never an error.
    pub fn resolve(&self, authorization: Option<&str>) -> Option<String> {
        let header = authorization?.trim();
        let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;
        self.tokens.get(token.trim()).cloned()
    }
}

/// Short anonymized hash for log lines. Never log raw tokens or user ids.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
