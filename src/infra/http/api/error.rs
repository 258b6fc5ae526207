use std::error::Error as StdError;

use crate::application::admins::AuthError;
use crate::application::contact::{ContactError, REQUIRED_FIELDS_MESSAGE};
use crate::application::error::ErrorReport;
use crate::application::repos::StoreError;
use crate::application::sync::SyncError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const STORE: &str = "store_error";
    pub const NOT_CONFIGURED: &str = "not_configured";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    chain: Vec<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            chain: Vec::new(),
        }
    }

    /// Keep the source chain of `error` for the response log. The innermost
    /// cause becomes the hint.
    fn caused_by(mut self, error: &dyn StdError) -> Self {
        let report = ErrorReport::from_error("infra::http::api", self.status, error);
        self.hint = report.messages.last().cloned();
        self.chain = report.messages;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Bearer token required",
            None,
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "Admin claim required",
            None,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn not_configured(message: &'static str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::NOT_CONFIGURED,
            message,
            None,
        )
    }

    pub fn store(message: &'static str, error: &StoreError) -> Self {
        let (status, code) = if error.is_permission_denied() {
            (StatusCode::FORBIDDEN, codes::PERMISSION_DENIED)
        } else {
            (StatusCode::BAD_GATEWAY, codes::STORE)
        };
        Self::new(status, code, message, None).caused_by(error)
    }

    pub fn internal(message: &'static str, error: &dyn StdError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            message,
            None,
        )
        .caused_by(error)
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing | AuthError::Invalid => Self::unauthorized(),
            AuthError::Forbidden => Self::forbidden(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match &err {
            SyncError::NotConfigured => Self::not_configured("Content store not configured"),
            SyncError::Closed => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::STORE,
                "Content synchronizer is shutting down",
                None,
            ),
            SyncError::RootWrite(source) | SyncError::WorkSync(source) => {
                Self::store("Failed to save content", source).caused_by(&err)
            }
            SyncError::Encode(_) => Self::internal("Failed to encode content", &err),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        match &err {
            ContactError::Invalid(_) => Self::bad_request(REQUIRED_FIELDS_MESSAGE, None),
            ContactError::Store(source) => {
                Self::store("Failed to store contact request", source).caused_by(&err)
            }
            ContactError::Encode(_) | ContactError::Timestamp(_) => {
                Self::internal("Failed to record contact request", &err)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!(
            "{}: {}",
            self.code,
            self.hint.as_deref().unwrap_or(self.message)
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        let mut report = ErrorReport::from_message("infra::http::api", self.status, detail);
        report.messages.extend(self.chain);
        report.attach(&mut response);
        response
    }
}
