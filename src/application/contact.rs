//! Contact form intake.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{CONTACT_COLLECTION, ContentStore, DocumentPath, StoreError, WriteBatch};
use crate::domain::error::DomainError;

pub const REQUIRED_FIELDS_MESSAGE: &str = "name, email, and message are required.";

const DEFAULT_PROJECT: &str = "N/A";
const SUBMISSION_SOURCE: &str = "marquee";
const METRIC_CONTACT_REQUESTS: &str = "marquee_contact_requests_total";

#[derive(Debug, Error)]
pub enum ContactError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("failed to store contact request")]
    Store(#[source] StoreError),
    #[error("failed to encode contact request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to format submission time: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Body of a contact form post. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub project: Option<String>,
    pub message: Option<String>,
}

/// Stored shape of a contact request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub project: String,
    pub message: String,
    pub created_at: String,
    pub source: String,
}

impl ContactSubmission {
    /// Validate and timestamp the submission.
    pub fn into_request(self, now: OffsetDateTime) -> Result<ContactRequest, ContactError> {
        let required = |value: Option<String>| {
            value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let (Some(name), Some(email), Some(message)) = (
            required(self.name),
            required(self.email),
            required(self.message),
        ) else {
            return Err(DomainError::validation(REQUIRED_FIELDS_MESSAGE).into());
        };

        Ok(ContactRequest {
            name,
            email,
            project: required(self.project).unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            message,
            created_at: now.format(&Rfc3339)?,
            source: SUBMISSION_SOURCE.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct ContactService {
    store: Option<Arc<dyn ContentStore>>,
}

impl ContactService {
    pub fn new(store: Option<Arc<dyn ContentStore>>) -> Self {
        Self { store }
    }

    /// Record a submission. Returns the generated request id.
    ///
    /// Without a store the request is logged and accepted.
    pub async fn submit(&self, submission: ContactSubmission) -> Result<Uuid, ContactError> {
        let request = submission.into_request(OffsetDateTime::now_utc())?;
        let id = Uuid::new_v4();

        let Some(store) = self.store.as_ref() else {
            warn!(
                target = "marquee::contact",
                request_id = %id,
                project = %request.project,
                "Content store not configured; contact request not persisted"
            );
            counter!(METRIC_CONTACT_REQUESTS, "outcome" => "dropped").increment(1);
            return Ok(id);
        };

        let mut batch = WriteBatch::new();
        batch.set(
            DocumentPath::new(CONTACT_COLLECTION, id.to_string()),
            serde_json::to_value(&request)?,
        );

        if let Err(err) = store.commit(batch).await {
            counter!(METRIC_CONTACT_REQUESTS, "outcome" => "failed").increment(1);
            return Err(ContactError::Store(err));
        }

        counter!(METRIC_CONTACT_REQUESTS, "outcome" => "stored").increment(1);
        info!(
            target = "marquee::contact",
            request_id = %id,
            "Contact request stored"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn submission(name: &str, email: &str, message: &str) -> ContactSubmission {
        ContactSubmission {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            project: None,
            message: Some(message.to_string()),
        }
    }

    #[test]
    fn missing_or_blank_required_fields_are_rejected() {
        let now = datetime!(2026-03-01 12:00 UTC);
        for candidate in [
            submission("", "a@example.com", "Hi"),
            submission("Ana", "  ", "Hi"),
            ContactSubmission {
                message: None,
                ..submission("Ana", "a@example.com", "Hi")
            },
        ] {
            let err = candidate.into_request(now).expect_err("must be rejected");
            assert!(err.to_string().contains(REQUIRED_FIELDS_MESSAGE));
        }
    }

    #[test]
    fn project_defaults_and_timestamp_is_rfc3339() {
        let now = datetime!(2026-03-01 12:00 UTC);
        let request = submission(" Ana ", "a@example.com", "Build a site")
            .into_request(now)
            .expect("valid");

        assert_eq!(request.name, "Ana");
        assert_eq!(request.project, "N/A");
        assert_eq!(request.created_at, "2026-03-01T12:00:00Z");
        assert_eq!(request.source, "marquee");
    }

    #[tokio::test]
    async fn accepted_without_store() {
        let service = ContactService::new(None);
        service
            .submit(submission("Ana", "a@example.com", "Hello"))
            .await
            .expect("accepted");
    }
}
