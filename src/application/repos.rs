//! Persistence seams: the document store and the principals repository.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::principals::PrincipalRecord;

/// Collection holding the root content document.
pub const ROOT_COLLECTION: &str = "siteContent";
/// Key of the root content document.
pub const ROOT_KEY: &str = "public";
/// One document per case study, keyed by slug.
pub const WORK_COLLECTION: &str = "siteContent/public/work";
/// Contact form submissions, keyed by a generated id.
pub const CONTACT_COLLECTION: &str = "contactRequests";

const PERMISSION_DENIED_CODES: &[&str] = &["permission-denied", "firestore/permission-denied"];
const PERMISSION_DENIED_MESSAGES: &[&str] =
    &["permission-denied", "Missing or insufficient permissions"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },
    #[error("content store unavailable: {message}")]
    Unavailable { message: String },
    #[error("content store error `{code}`: {message}")]
    Backend { code: String, message: String },
    #[error("invalid document payload: {message}")]
    InvalidPayload { message: String },
}

impl StoreError {
    /// Classify a backend failure from its code and message.
    ///
    /// Stores report missing grants in several shapes; any of the known
    /// codes or message fragments maps to [`StoreError::PermissionDenied`].
    pub fn classify(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        let denied_code = code.is_some_and(|code| PERMISSION_DENIED_CODES.contains(&code));
        let denied_message = PERMISSION_DENIED_MESSAGES
            .iter()
            .any(|fragment| message.contains(fragment));

        if denied_code || denied_message {
            Self::PermissionDenied { message }
        } else {
            Self::Backend {
                code: code.unwrap_or("unknown").to_string(),
                message,
            }
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Address of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub key: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// The root content document, `siteContent/public`.
    pub fn root() -> Self {
        Self::new(ROOT_COLLECTION, ROOT_KEY)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { path: DocumentPath, data: Value },
    Delete { path: DocumentPath },
}

/// Writes applied atomically by [`ContentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: DocumentPath, data: Value) -> &mut Self {
        self.ops.push(WriteOp::Set { path, data });
        self
    }

    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Push-based stream of snapshots. The first item is the current state.
pub type SnapshotStream<T> = BoxStream<'static, Result<T, StoreError>>;

/// Document store with push subscriptions.
///
/// A watch stream yields the current snapshot immediately, then one
/// snapshot per change. An error item does not end the stream; the
/// subscription stays open for later changes.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend name for health output and logs.
    fn describe(&self) -> &'static str;

    /// Watch one document; `None` while it does not exist.
    fn watch_document(&self, path: &DocumentPath) -> SnapshotStream<Option<Value>>;

    /// Watch every document of a collection, ordered by key.
    fn watch_collection(&self, collection: &str) -> SnapshotStream<Vec<StoredDocument>>;

    /// Replace one document.
    async fn set_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError>;

    async fn list_collection(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    /// Apply every operation of `batch` or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UpsertCredentialsParams {
    pub email: String,
    pub token_prefix: String,
    pub hashed_secret: Vec<u8>,
    pub issued_at: OffsetDateTime,
}

#[async_trait]
pub trait PrincipalsRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PrincipalRecord>, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<PrincipalRecord>, RepoError>;

    /// Create the principal for `email` if needed and replace its token.
    async fn upsert_credentials(
        &self,
        params: UpsertCredentialsParams,
    ) -> Result<PrincipalRecord, RepoError>;

    async fn set_admin(&self, id: Uuid, admin: bool) -> Result<PrincipalRecord, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_detects_permission_denied_by_code_or_message() {
        assert!(StoreError::classify(Some("permission-denied"), "nope").is_permission_denied());
        assert!(
            StoreError::classify(Some("firestore/permission-denied"), "nope")
                .is_permission_denied()
        );
        assert!(
            StoreError::classify(None, "FirebaseError: Missing or insufficient permissions.")
                .is_permission_denied()
        );
        assert!(!StoreError::classify(Some("unavailable"), "offline").is_permission_denied());
    }

    #[test]
    fn root_path_renders_as_slash_path() {
        assert_eq!(DocumentPath::root().to_string(), "siteContent/public");
    }
}
