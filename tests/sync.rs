use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use marquee::application::repos::{ContentStore, DocumentPath, WORK_COLLECTION};
use marquee::application::sync::{
    ContentSynchronizer, ContentView, LOAD_ERROR_MESSAGE, SyncError, SyncStatus, WORK_SYNC_WARNING,
};
use marquee::domain::content::CaseStudy;
use marquee::domain::fallback::fallback_content;
use marquee::infra::memory::{Access, MemoryContentStore};

const WAIT: Duration = Duration::from_secs(2);

fn connect(store: &MemoryContentStore) -> ContentSynchronizer {
    let store: Arc<dyn ContentStore> = Arc::new(store.clone());
    ContentSynchronizer::connect(store)
}

async fn loaded(sync: &ContentSynchronizer) -> ContentView {
    timeout(WAIT, sync.loaded()).await.expect("sources settle")
}

async fn wait_for(sync: &ContentSynchronizer, predicate: impl Fn(&ContentView) -> bool) -> ContentView {
    let mut receiver = sync.subscribe();
    timeout(WAIT, receiver.wait_for(|view| predicate(view)))
        .await
        .expect("view update")
        .expect("synchronizer alive")
        .clone()
}

fn study(name: &str) -> CaseStudy {
    CaseStudy {
        name: name.to_string(),
        summary: format!("{name} summary"),
        ..CaseStudy::default()
    }
}

#[tokio::test]
async fn live_root_document_overrides_fallback_fields() {
    let store = MemoryContentStore::new();
    store.seed(
        DocumentPath::root(),
        json!({ "hero": { "title": "Live headline" }, "differentiators": ["Fast"] }),
    );

    let sync = connect(&store);
    let view = loaded(&sync).await;

    assert_eq!(view.status, SyncStatus::Synced);
    assert_eq!(view.error, None);
    assert_eq!(view.content.hero.title, "Live headline");
    assert_eq!(view.content.hero.subtitle, fallback_content().hero.subtitle);
    assert_eq!(view.content.differentiators, vec!["Fast".to_string()]);
    assert_eq!(
        view.content.work.case_studies,
        fallback_content().work.case_studies
    );
}

#[tokio::test]
async fn denied_reads_fall_back_silently() {
    let store = MemoryContentStore::new();
    store.set_read_access("siteContent", Access::Deny);
    store.set_read_access(WORK_COLLECTION, Access::Deny);

    let sync = connect(&store);
    let view = loaded(&sync).await;

    assert!(!view.loading);
    assert_eq!(view.status, SyncStatus::Degraded);
    assert_eq!(view.error, None);
    assert_eq!(view.content.as_ref(), fallback_content());
}

#[tokio::test]
async fn unreachable_source_surfaces_load_notice() {
    let store = MemoryContentStore::new();
    store.set_read_access(WORK_COLLECTION, Access::Unavailable);

    let sync = connect(&store);
    let view = loaded(&sync).await;

    assert_eq!(view.error.as_deref(), Some(LOAD_ERROR_MESSAGE));
    assert_eq!(
        view.content.work.case_studies,
        fallback_content().work.case_studies
    );

    store.set_read_access(WORK_COLLECTION, Access::Allow);
    let recovered = wait_for(&sync, |view| view.error.is_none()).await;
    assert_eq!(recovered.status, SyncStatus::Synced);
}

#[tokio::test]
async fn pushed_changes_reach_subscribers() {
    let store = MemoryContentStore::new();
    let sync = connect(&store);
    loaded(&sync).await;

    store.seed(
        DocumentPath::new(WORK_COLLECTION, "harbor"),
        json!({ "name": "Harbor", "summary": "Port dashboards" }),
    );

    let view = wait_for(&sync, |view| {
        view.content.work.case_studies.first().map(|study| study.slug.as_str()) == Some("harbor")
    })
    .await;
    assert_eq!(view.content.work.case_studies.len(), 1);
    assert_eq!(view.content.work.case_studies[0].impact, "Port dashboards");
}

#[tokio::test]
async fn save_splits_root_and_work_collection() {
    let store = MemoryContentStore::new();
    store.seed(
        DocumentPath::new(WORK_COLLECTION, "stale"),
        json!({ "name": "Stale" }),
    );
    let sync = connect(&store);
    loaded(&sync).await;

    let mut draft = fallback_content().clone();
    draft.work.case_studies = vec![study("Harbor Analytics"), study("Harbor Analytics")];

    let outcome = sync.save(draft).await.expect("saved");

    assert_eq!(outcome.warning, None);
    let slugs: Vec<_> = outcome
        .content
        .work
        .case_studies
        .iter()
        .map(|study| study.slug.clone())
        .collect();
    assert_eq!(slugs, vec!["harbor-analytics", "harbor-analytics-2"]);
    assert_eq!(store.keys(WORK_COLLECTION), slugs);

    let root = store.document(&DocumentPath::root()).expect("root written");
    assert!(root["work"].get("caseStudies").is_none());
    assert_eq!(root["hero"]["title"], json!(fallback_content().hero.title));

    assert_eq!(sync.snapshot().content.work.case_studies.len(), 2);
}

#[tokio::test]
async fn denied_work_write_still_saves_root_with_warning() {
    let store = MemoryContentStore::new();
    store.set_write_access(WORK_COLLECTION, Access::Deny);
    let sync = connect(&store);
    loaded(&sync).await;

    let mut draft = fallback_content().clone();
    draft.hero.title = "Edited".to_string();
    draft.work.case_studies = vec![study("Only")];

    let outcome = sync.save(draft).await.expect("partial save");

    assert_eq!(outcome.warning.as_deref(), Some(WORK_SYNC_WARNING));
    assert!(store.keys(WORK_COLLECTION).is_empty());
    let root = store.document(&DocumentPath::root()).expect("root written");
    assert_eq!(root["hero"]["title"], json!("Edited"));
    assert_eq!(sync.snapshot().content.work.case_studies[0].slug, "only");
    assert_eq!(sync.snapshot().content.hero.title, "Edited");
}

#[tokio::test]
async fn unreachable_work_collection_fails_the_save_after_root_write() {
    let store = MemoryContentStore::new();
    store.set_write_access(WORK_COLLECTION, Access::Unavailable);
    let sync = connect(&store);
    loaded(&sync).await;

    let mut draft = fallback_content().clone();
    draft.hero.title = "Edited".to_string();
    draft.work.case_studies = vec![study("Only")];

    let err = sync.save(draft).await.expect_err("work batch unreachable");

    assert!(matches!(err, SyncError::WorkSync(ref source) if !source.is_permission_denied()));
    let root = store.document(&DocumentPath::root()).expect("root written");
    assert_eq!(root["hero"]["title"], json!("Edited"));
    assert!(store.keys(WORK_COLLECTION).is_empty());
}

#[tokio::test]
async fn denied_root_write_fails_the_save() {
    let store = MemoryContentStore::new();
    store.set_write_access("siteContent", Access::Deny);
    let sync = connect(&store);
    loaded(&sync).await;

    let err = sync
        .save(fallback_content().clone())
        .await
        .expect_err("root write denied");

    assert!(matches!(err, SyncError::RootWrite(ref source) if source.is_permission_denied()));
    assert!(store.keys(WORK_COLLECTION).is_empty());
}

#[tokio::test]
async fn offline_synchronizer_serves_fallback_and_rejects_saves() {
    let sync = ContentSynchronizer::offline();
    let view = sync.snapshot();

    assert!(!view.loading);
    assert_eq!(view.status, SyncStatus::Uninitialized);
    assert_eq!(view.content.as_ref(), fallback_content());

    let err = sync
        .save(fallback_content().clone())
        .await
        .expect_err("no store");
    assert!(matches!(err, SyncError::NotConfigured));
}

#[tokio::test]
async fn shutdown_stops_view_updates() {
    let store = MemoryContentStore::new();
    let sync = connect(&store);
    loaded(&sync).await;

    sync.shutdown();
    sync.shutdown();

    store.seed(DocumentPath::root(), json!({ "hero": { "title": "Too late" } }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sync.snapshot().content.hero.title, fallback_content().hero.title);
    assert!(matches!(
        sync.save(fallback_content().clone()).await,
        Err(SyncError::Closed)
    ));
}
