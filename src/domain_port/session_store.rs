use crate::application_port::AuthError;
use std::time::Duration;

/// Key-value capability with per-key TTL. Every call is atomic on its own key;
/// there are no multi-key transactions.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
    /// `None` when the key is absent or its TTL has elapsed.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Returns the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> Result<u64, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        AuthError::Store(error.to_string())
    }
}
