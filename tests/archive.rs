use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use marquee::application::error::AppError;
use marquee::application::repos::{ContentStore, DocumentPath, WORK_COLLECTION};
use marquee::application::site::{export_content, import_content};
use marquee::application::sync::ContentSynchronizer;
use marquee::domain::fallback::fallback_content;
use marquee::infra::memory::MemoryContentStore;

async fn connected(store: &MemoryContentStore) -> ContentSynchronizer {
    let shared: Arc<dyn ContentStore> = Arc::new(store.clone());
    let sync = ContentSynchronizer::connect(shared);
    tokio::time::timeout(Duration::from_secs(2), sync.loaded())
        .await
        .expect("content loaded");
    sync
}

#[tokio::test]
async fn exported_archive_imports_into_another_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("site.toml");

    let source = MemoryContentStore::new();
    source.seed(
        DocumentPath::root(),
        json!({ "hero": { "title": "Archived headline" } }),
    );
    source.seed(
        DocumentPath::new(WORK_COLLECTION, "harbor"),
        json!({ "name": "Harbor", "summary": "Port dashboards" }),
    );
    let exporter = connected(&source).await;
    export_content(&exporter.snapshot(), &path)
        .await
        .expect("exported");

    let written = std::fs::read_to_string(&path).expect("archive on disk");
    assert!(written.contains("format = 1"));
    assert!(written.contains("Archived headline"));

    let target = MemoryContentStore::new();
    let importer = connected(&target).await;
    let outcome = import_content(&importer, &path).await.expect("imported");

    assert_eq!(outcome.warning, None);
    assert_eq!(outcome.content.hero.title, "Archived headline");
    assert_eq!(target.keys(WORK_COLLECTION), vec!["harbor".to_string()]);
    let root = target.document(&DocumentPath::root()).expect("root written");
    assert_eq!(root["hero"]["title"], json!("Archived headline"));
}

#[tokio::test]
async fn offline_export_writes_fallback_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fallback.toml");

    let sync = ContentSynchronizer::offline();
    export_content(&sync.snapshot(), &path)
        .await
        .expect("exported");

    let written = std::fs::read_to_string(&path).expect("archive on disk");
    assert!(written.contains(&fallback_content().hero.title));
}

#[tokio::test]
async fn unknown_archive_format_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("future.toml");
    std::fs::write(
        &path,
        "format = 99\nexported_at = \"2026-01-01T00:00:00Z\"\n\n[content]\n",
    )
    .expect("write archive");

    let store = MemoryContentStore::new();
    let sync = connected(&store).await;
    let err = import_content(&sync, &path).await.expect_err("rejected");

    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.document(&DocumentPath::root()).is_none());
}
