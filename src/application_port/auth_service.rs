use crate::domain_model::*;
use serde::Serialize;

/// Stable failure classes the boundary layer maps to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    UnprocessableEntity,
    Expired,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("unprocessable entity: {0}")]
    UnprocessableEntity(String),
    #[error("token is expired")]
    Expired,
    #[error("store error: {0}")]
    Store(String),
    #[error("directory error: {0}")]
    Directory(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::UnprocessableEntity(_) => ErrorKind::UnprocessableEntity,
            AuthError::Expired => ErrorKind::Expired,
            AuthError::Store(_) | AuthError::Directory(_) | AuthError::InternalError(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }
}

#[derive(Debug, Clone)]
pub struct Authorization {
    pub identity: Identity,
    pub tokens: TokenPair,
    pub expire_in: ExpireIn,
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub identity: Identity,
    /// Seconds until the access token's signed expiry.
    pub expire_in: i64,
}

#[derive(Debug, Clone)]
pub struct Refreshed {
    pub tokens: TokenPair,
    /// Seconds until the new refresh token's signed expiry.
    pub expire_in: i64,
}

/// Operations exposed to the HTTP layer.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn authorize(&self, username: &str, password: &str) -> Result<Authorization, AuthError>;
    async fn verify(&self, access_token: &str) -> Result<Verification, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<Refreshed, AuthError>;
    async fn deauthorize(&self, access_token: &str) -> Result<bool, AuthError>;
}
