use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::{admins::AdminError, sync::SyncError},
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Failure details attached to a response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    /// Capture `error` and its whole source chain.
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn report_collects_source_chain() {
        let error = SyncError::RootWrite(crate::application::repos::StoreError::unavailable(
            "connection reset",
        ));
        let report = ErrorReport::from_error("tests", StatusCode::BAD_GATEWAY, &error);

        assert_eq!(
            report.messages,
            vec![
                "failed to write siteContent/public".to_string(),
                "content store unavailable: connection reset".to_string(),
            ]
        );
    }

    #[test]
    fn infra_errors_convert_into_app_errors() {
        let error = AppError::from(InfraError::Io(io::Error::other("disk full")));
        assert_eq!(error.to_string(), "io error: disk full");
    }
}
