use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use marquee::application::admins::AdminService;
use marquee::application::contact::{ContactService, REQUIRED_FIELDS_MESSAGE};
use marquee::application::repos::{
    CONTACT_COLLECTION, ContentStore, DocumentPath, PrincipalsRepo, RepoError,
    UpsertCredentialsParams,
};
use marquee::application::sync::ContentSynchronizer;
use marquee::domain::fallback::fallback_content;
use marquee::domain::principals::{PrincipalLookup, PrincipalRecord};
use marquee::infra::http::{self, ApiRateLimiter, ApiState};
use marquee::infra::memory::MemoryContentStore;

#[derive(Default)]
struct InMemoryPrincipals {
    records: Mutex<Vec<PrincipalRecord>>,
}

impl InMemoryPrincipals {
    fn find(&self, predicate: impl Fn(&PrincipalRecord) -> bool) -> Option<PrincipalRecord> {
        self.records
            .lock()
            .expect("principals lock")
            .iter()
            .find(|record| predicate(record))
            .cloned()
    }
}

#[async_trait]
impl PrincipalsRepo for InMemoryPrincipals {
    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, RepoError> {
        Ok(self.find(|record| record.email == email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PrincipalRecord>, RepoError> {
        Ok(self.find(|record| record.id == id))
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<PrincipalRecord>, RepoError> {
        Ok(self.find(|record| record.token_prefix.as_deref() == Some(prefix)))
    }

    async fn upsert_credentials(
        &self,
        params: UpsertCredentialsParams,
    ) -> Result<PrincipalRecord, RepoError> {
        let mut records = self.records.lock().expect("principals lock");
        if let Some(record) = records.iter_mut().find(|record| record.email == params.email) {
            record.token_prefix = Some(params.token_prefix);
            record.hashed_secret = Some(params.hashed_secret);
            record.updated_at = params.issued_at;
            return Ok(record.clone());
        }

        let record = PrincipalRecord {
            id: Uuid::new_v4(),
            email: params.email,
            token_prefix: Some(params.token_prefix),
            hashed_secret: Some(params.hashed_secret),
            admin: false,
            created_at: params.issued_at,
            updated_at: params.issued_at,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn set_admin(&self, id: Uuid, admin: bool) -> Result<PrincipalRecord, RepoError> {
        let mut records = self.records.lock().expect("principals lock");
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(RepoError::NotFound)?;
        record.admin = admin;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }
}

struct Harness {
    router: Router,
    store: MemoryContentStore,
    admins: Arc<AdminService>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_rate_limit(10).await
    }

    async fn with_rate_limit(max_requests: u32) -> Self {
        let store = MemoryContentStore::new();
        let shared: Arc<dyn ContentStore> = Arc::new(store.clone());
        let content = Arc::new(ContentSynchronizer::connect(Arc::clone(&shared)));
        tokio::time::timeout(Duration::from_secs(2), content.loaded())
            .await
            .expect("content loaded");

        let admins = Arc::new(AdminService::new(Arc::new(InMemoryPrincipals::default())));
        let state = ApiState {
            content,
            contact: Arc::new(ContactService::new(Some(shared))),
            admins: Some(Arc::clone(&admins)),
            rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), max_requests)),
        };

        Self {
            router: http::build_router(state),
            store,
            admins,
        }
    }

    async fn token(&self, email: &str, admin: bool) -> String {
        let issued = self.admins.issue_token(email).await.expect("token issued");
        if admin {
            self.admins
                .grant_admin(PrincipalLookup::Email(email.to_string()))
                .await
                .expect("admin granted");
        }
        issued.token
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let mut request = builder
        .body(Body::from(body.to_string()))
        .expect("request");
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 40000))));
    request
}

#[tokio::test]
async fn health_reports_backend() {
    let harness = Harness::new().await;
    let (status, body) = harness.send(get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["service"], json!("marquee"));
    assert_eq!(body["store"], json!("memory"));
    assert_eq!(body["status"], json!("synced"));
}

#[tokio::test]
async fn content_view_is_served_with_status() {
    let harness = Harness::new().await;
    let (status, body) = harness.send(get("/api/content")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loading"], json!(false));
    assert_eq!(body["error"], Value::Null);
    assert_eq!(
        body["content"]["hero"]["title"],
        json!(fallback_content().hero.title)
    );
}

#[tokio::test]
async fn case_study_lookup_by_slug() {
    let harness = Harness::new().await;

    let (status, body) = harness
        .send(get("/api/content/work/moonshine-art-marketplace"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], json!("moonshine-art-marketplace"));

    let (status, body) = harness.send(get("/api/content/work/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn unknown_routes_use_error_envelope() {
    let harness = Harness::new().await;
    let (status, body) = harness.send(get("/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn contact_requires_name_email_and_message() {
    let harness = Harness::new().await;
    let (status, body) = harness
        .send(json_request(
            "POST",
            "/contact",
            &json!({ "name": "Ana", "email": "ana@example.com" }),
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], json!(REQUIRED_FIELDS_MESSAGE));
    assert!(harness.store.keys(CONTACT_COLLECTION).is_empty());
}

#[tokio::test]
async fn contact_is_stored_with_defaults() {
    let harness = Harness::new().await;
    let (status, body) = harness
        .send(json_request(
            "POST",
            "/contact",
            &json!({ "name": "Ana", "email": "ana@example.com", "message": "Hello" }),
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "ok": true }));

    let keys = harness.store.keys(CONTACT_COLLECTION);
    assert_eq!(keys.len(), 1);
    let stored = harness
        .store
        .document(&DocumentPath::new(CONTACT_COLLECTION, keys[0].clone()))
        .expect("stored request");
    assert_eq!(stored["project"], json!("N/A"));
    assert_eq!(stored["source"], json!("marquee"));
    assert!(stored["createdAt"].is_string());
}

#[tokio::test]
async fn contact_is_rate_limited_per_client() {
    let harness = Harness::with_rate_limit(2).await;
    let body = json!({ "name": "Ana", "email": "ana@example.com", "message": "Hello" });

    for _ in 0..2 {
        let (status, _) = harness
            .send(json_request("POST", "/contact", &body, None))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = harness
        .router
        .clone()
        .oneshot(json_request("POST", "/contact", &body, None))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("60")
    );
}

#[tokio::test]
async fn admin_routes_check_token_and_claim() {
    let harness = Harness::new().await;

    let (status, body) = harness
        .send(json_request("GET", "/admin/status", &json!({}), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("unauthorized"));

    let (status, _) = harness
        .send(json_request(
            "GET",
            "/admin/status",
            &json!({}),
            Some("mk_bogus_0123456789abcdef0123456789abcdef"),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let editor = harness.token("editor@example.com", false).await;
    let (status, body) = harness
        .send(json_request("GET", "/admin/status", &json!({}), Some(&editor)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("forbidden"));

    let owner = harness.token("owner@example.com", true).await;
    let (status, body) = harness
        .send(json_request("GET", "/admin/status", &json!({}), Some(&owner)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert!(body["uid"].is_string());
}

#[tokio::test]
async fn rotated_token_replaces_previous_one() {
    let harness = Harness::new().await;
    let first = harness.token("owner@example.com", true).await;
    let second = harness.token("owner@example.com", false).await;

    let (status, _) = harness
        .send(json_request("GET", "/admin/status", &json!({}), Some(&first)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = harness
        .send(json_request("GET", "/admin/status", &json!({}), Some(&second)))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_save_persists_content() {
    let harness = Harness::new().await;
    let owner = harness.token("owner@example.com", true).await;

    let mut draft = serde_json::to_value(fallback_content()).expect("encode");
    draft["hero"]["title"] = json!("Saved over the API");
    draft["work"]["caseStudies"] = json!([{ "name": "Harbor Analytics", "summary": "Dashboards" }]);

    let (status, body) = harness
        .send(json_request("PUT", "/api/admin/content", &draft, Some(&owner)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["warning"], Value::Null);
    assert_eq!(
        body["content"]["work"]["caseStudies"][0]["slug"],
        json!("harbor-analytics")
    );

    let root = harness
        .store
        .document(&DocumentPath::root())
        .expect("root written");
    assert_eq!(root["hero"]["title"], json!("Saved over the API"));
    assert_eq!(
        harness.store.keys("siteContent/public/work"),
        vec!["harbor-analytics".to_string()]
    );

    let (_, view) = harness.send(get("/api/content")).await;
    assert_eq!(view["content"]["hero"]["title"], json!("Saved over the API"));
}

#[tokio::test]
async fn admin_routes_report_missing_auth_backend() {
    let content = Arc::new(ContentSynchronizer::offline());
    let router = http::build_router(ApiState {
        content,
        contact: Arc::new(ContactService::new(None)),
        admins: None,
        rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), 5)),
    });

    let response = router
        .oneshot(get("/admin/status"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
