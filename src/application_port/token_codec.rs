use super::AuthError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("token is not a jwt: {0}")]
    Malformed(String),
    #[error("token is expired or not yet valid")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),
    #[error("unexpected {0} claim")]
    ClaimType(String),
}

impl From<CodecError> for AuthError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Signing(e) => AuthError::InternalError(e),
            CodecError::Expired => AuthError::Expired,
            CodecError::InvalidSignature => AuthError::Unauthorized(error.to_string()),
            CodecError::UnexpectedAlgorithm(_) => AuthError::Forbidden(error.to_string()),
            CodecError::Malformed(_) | CodecError::ClaimType(_) => {
                AuthError::UnprocessableEntity(error.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub id: TokenId,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks tokens for one token class. Each instance owns one key pair.
pub trait TokenCodec: Send + Sync {
    fn create(&self, ttl: Duration) -> Result<Token, CodecError>;
    /// Checks signature, algorithm and expiry. Does not look at the session store.
    fn verify(&self, value: &str) -> Result<VerifiedToken, CodecError>;
}
