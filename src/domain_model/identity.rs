use serde::Serialize;

/// A user as resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub dn: String,
    pub id: String,
    pub groups: Vec<String>,
}
