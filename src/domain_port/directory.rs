use crate::domain_model::Identity;

#[async_trait::async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Looks the user up by id. Group membership is best-effort: a failed
    /// group search yields an empty list, never an error.
    async fn resolve_user(&self, user_id: &str) -> Result<Identity, DirectoryError>;
    /// Authenticates `dn` with `password` on a fresh connection.
    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("no directory entry for {0}")]
    NotFound(String),
    #[error("{count} directory entries match {user_id}")]
    Ambiguous { user_id: String, count: usize },
    #[error("bind failed for {dn}: {reason}")]
    Bind { dn: String, reason: String },
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
