//! Authenticated callers of the admin surface.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Persisted principal. Only the SHA-256 digest of the token secret is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: Uuid,
    pub email: String,
    pub token_prefix: Option<String>,
    pub hashed_secret: Option<Vec<u8>>,
    pub admin: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// How an operator names the principal to update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalLookup {
    Email(String),
    Id(Uuid),
}

impl std::fmt::Display for PrincipalLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email(email) => write!(f, "email `{email}`"),
            Self::Id(id) => write!(f, "uid `{id}`"),
        }
    }
}
