use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::warn;

use super::error::ApiError;
use crate::application::admins::AuthError;
use super::state::ApiState;

const METRIC_RATE_LIMITED: &str = "marquee_rate_limited_total";
const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Require a bearer token whose principal holds the admin claim.
pub async fn admin_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(admins) = state.admins.as_ref() else {
        return ApiError::not_configured("Auth not configured").into_response();
    };

    let Some(token) = extract_token(request.headers().get(axum::http::header::AUTHORIZATION))
    else {
        return ApiError::from(AuthError::Missing).into_response();
    };

    let principal = match admins.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => return ApiError::from(err).into_response(),
    };

    if let Err(err) = principal.require_admin() {
        warn!(
            target = "marquee::http::auth",
            principal = %principal.id,
            "Admin route called without admin claim"
        );
        return ApiError::from(err).into_response();
    }

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

/// Per-client budget for the contact form.
pub async fn contact_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let client = client_key(&request);

    let (allowed, remaining) = state.rate_limiter.allow(&client, &path);
    if !allowed {
        counter!(METRIC_RATE_LIMITED, "route" => path.clone()).increment(1);
        warn!(
            target = "marquee::http::ratelimit",
            client = %client,
            path = %path,
            "Rate limit exceeded"
        );
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        RATE_LIMIT_LIMIT,
        HeaderValue::from(state.rate_limiter.limit()),
    );
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
    response
}

fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_requires_bearer_scheme() {
        let header = HeaderValue::from_static("Bearer mk_abc_secret");
        assert_eq!(
            extract_token(Some(&header)).as_deref(),
            Some("mk_abc_secret")
        );

        let basic = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert!(extract_token(Some(&basic)).is_none());
        assert!(extract_token(Some(&HeaderValue::from_static("Bearer  "))).is_none());
        assert!(extract_token(None).is_none());
    }
}
