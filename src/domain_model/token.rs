use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier embedded in every signed token as the `uuid` claim.
/// Also the key of the token's session record.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub uuid::Uuid);

impl TokenId {
    pub fn new_random() -> Self {
        TokenId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TokenId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(TokenId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub id: TokenId,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Whole seconds left until the signed expiry, floored at zero.
    pub fn expire_in(&self, now: DateTime<Utc>) -> i64 {
        seconds_until(self.expires_at, now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: Token,
    pub refresh: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpireIn {
    pub access: i64,
    pub refresh: i64,
}

impl TokenPair {
    pub fn expire_in(&self, now: DateTime<Utc>) -> ExpireIn {
        ExpireIn {
            access: self.access.expire_in(now),
            refresh: self.refresh.expire_in(now),
        }
    }
}

pub fn seconds_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (until - now).num_seconds().max(0)
}
