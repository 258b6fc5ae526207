pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    let contact_routes = Router::new()
        .route("/contact", post(handlers::submit_contact))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::contact_rate_limit,
        ));

    let admin_routes = Router::new()
        .route("/admin/status", get(handlers::admin_status))
        .route("/api/admin/content", put(handlers::save_content))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/content", get(handlers::get_content))
        .route("/api/content/work/{slug}", get(handlers::get_case_study))
        .merge(contact_routes)
        .merge(admin_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
