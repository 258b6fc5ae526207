use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::application::admins::Principal;
use crate::application::contact::ContactSubmission;
use crate::domain::content::SiteContent;

use super::error::ApiError;
use super::models::*;
use super::state::ApiState;

const SERVICE_NAME: &str = "marquee";

pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME,
        store: state.content.backend(),
        status: state.content.snapshot().status,
    })
}

pub async fn get_content(State(state): State<ApiState>) -> Response {
    let view = state.content.snapshot();
    Json(ContentResponse::from(&view)).into_response()
}

pub async fn get_case_study(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.content.snapshot();
    match view.content.case_study(&slug) {
        Some(case_study) => Ok(Json(case_study.clone())),
        None => Err(ApiError::not_found("case study not found")),
    }
}

pub async fn submit_contact(
    State(state): State<ApiState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(submission) = payload.map_err(invalid_body)?;
    state.contact.submit(submission).await?;
    Ok((StatusCode::CREATED, Json(OkResponse { ok: true })))
}

pub async fn admin_status(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(AdminStatusResponse {
        ok: true,
        uid: principal.id,
    })
}

pub async fn save_content(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<SiteContent>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(draft) = payload.map_err(invalid_body)?;
    let outcome = state.content.save(draft).await?;

    info!(
        target = "marquee::http::admin",
        principal = %principal.id,
        warning = outcome.warning.is_some(),
        "Content saved via API"
    );

    Ok(Json(SaveResponse {
        ok: true,
        warning: outcome.warning,
        content: outcome.content,
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid JSON body", Some(rejection.body_text()))
}
