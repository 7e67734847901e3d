//! Cache keys

use crate::error::ParleyResult;
use crate::llm::CompletionRequest;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex SHA-256 of the canonical JSON form of a request.
///
/// The request's `caching` and `chat_id` flags are not serialized and so never
/// affect the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &CompletionRequest) -> ParleyResult<Self> {
        let canonical = serde_json::to_vec(request)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
