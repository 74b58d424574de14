//! Shared engine configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default minimum length for a share token to be looked up at all.
///
/// Generated tokens are 43 characters; anything much shorter is not ours.
pub const DEFAULT_MIN_SHARE_TOKEN_LEN: usize = 32;

/// Settings shared by the services and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tokens shorter than this are rejected as malformed without a lookup.
    pub min_share_token_len: usize,
    /// When set, new documents expire this many days after creation.
    pub share_expiry_days: Option<i64>,
    /// Public base URL used to print share links, e.g. `https://docs.example.com/share`.
    pub share_base_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_share_token_len: DEFAULT_MIN_SHARE_TOKEN_LEN,
            share_expiry_days: None,
            share_base_url: None,
        }
    }
}

impl EngineConfig {
    /// Expiry timestamp for a document created at `now`, if expiry is configured.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.share_expiry_days
            .filter(|days| *days > 0)
            .map(|days| now + Duration::days(days))
    }

    /// Public link for a share token, or the bare token when no base URL is set.
    pub fn share_link(&self, token: &str) -> String {
        match &self.share_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), token),
            None => token.to_string(),
        }
    }
}
