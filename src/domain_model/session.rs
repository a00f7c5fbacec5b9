use super::TokenId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Access,
    Refresh,
}

/// Liveness record of one issued token, stored under the token's id.
/// `linked_id` is the id of the other token of the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub kind: SessionKind,
    pub subject_id: String,
    pub linked_id: TokenId,
    /// Distinguished name the subject had when the pair was issued.
    pub subject_dn: String,
}

impl SessionRecord {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
