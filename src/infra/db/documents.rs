//! `ContentStore` over the `documents` table.
//!
//! Every write fires `pg_notify('marquee_documents', collection)` from a
//! trigger; watchers re-read their document or collection when the payload
//! names it. Notifications missed while the listener reconnects are covered
//! by an unconditional re-read after the reconnect.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, postgres::PgListener, types::Json};
use tracing::warn;

use crate::application::repos::{
    ContentStore, DocumentPath, SnapshotStream, StoreError, StoredDocument, WriteBatch, WriteOp,
};

use super::{PostgresRepositories, map_store_error};

const NOTIFY_CHANNEL: &str = "marquee_documents";
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    key: String,
    data: Json<Value>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        StoredDocument {
            key: row.key,
            data: row.data.0,
        }
    }
}

async fn fetch_document(pool: &PgPool, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT key, data FROM documents WHERE collection = $1 AND key = $2",
    )
    .bind(&path.collection)
    .bind(&path.key)
    .fetch_optional(pool)
    .await
    .map_err(map_store_error)?;

    Ok(row.map(|row| row.data.0))
}

async fn fetch_collection(pool: &PgPool, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT key, data FROM documents WHERE collection = $1 ORDER BY key",
    )
    .bind(collection)
    .fetch_all(pool)
    .await
    .map_err(map_store_error)?;

    Ok(rows.into_iter().map(StoredDocument::from).collect())
}

enum Wake {
    Changed(String),
    Reconnected,
    Failed(StoreError),
}

async fn listen(pool: &PgPool) -> Result<PgListener, StoreError> {
    let mut listener = PgListener::connect_with(pool)
        .await
        .map_err(map_store_error)?;
    listener
        .listen(NOTIFY_CHANNEL)
        .await
        .map_err(map_store_error)?;
    Ok(listener)
}

async fn next_wake(listener: &mut PgListener) -> Wake {
    match listener.try_recv().await {
        Ok(Some(notification)) => Wake::Changed(notification.payload().to_string()),
        Ok(None) => Wake::Reconnected,
        Err(err) => Wake::Failed(map_store_error(err)),
    }
}

#[async_trait]
impl ContentStore for PostgresRepositories {
    fn describe(&self) -> &'static str {
        "postgres"
    }

    fn watch_document(&self, path: &DocumentPath) -> SnapshotStream<Option<Value>> {
        let pool = self.pool.clone();
        let path = path.clone();

        Box::pin(stream! {
            let mut listener = loop {
                match listen(&pool).await {
                    Ok(listener) => break listener,
                    Err(err) => {
                        yield Err(err);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            };

            yield fetch_document(&pool, &path).await;
            loop {
                match next_wake(&mut listener).await {
                    Wake::Changed(collection) if collection == path.collection => {
                        yield fetch_document(&pool, &path).await;
                    }
                    Wake::Changed(_) => {}
                    Wake::Reconnected => {
                        warn!(
                            target = "marquee::store::postgres",
                            document = %path,
                            "Notification listener reconnected; re-reading"
                        );
                        yield fetch_document(&pool, &path).await;
                    }
                    Wake::Failed(err) => {
                        yield Err(err);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        })
    }

    fn watch_collection(&self, collection: &str) -> SnapshotStream<Vec<StoredDocument>> {
        let pool = self.pool.clone();
        let collection = collection.to_string();

        Box::pin(stream! {
            let mut listener = loop {
                match listen(&pool).await {
                    Ok(listener) => break listener,
                    Err(err) => {
                        yield Err(err);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            };

            yield fetch_collection(&pool, &collection).await;
            loop {
                match next_wake(&mut listener).await {
                    Wake::Changed(changed) if changed == collection => {
                        yield fetch_collection(&pool, &collection).await;
                    }
                    Wake::Changed(_) => {}
                    Wake::Reconnected => {
                        warn!(
                            target = "marquee::store::postgres",
                            collection = %collection,
                            "Notification listener reconnected; re-reading"
                        );
                        yield fetch_collection(&pool, &collection).await;
                    }
                    Wake::Failed(err) => {
                        yield Err(err);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        })
    }

    async fn set_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
        upsert(self.pool(), path, data).await
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        fetch_collection(self.pool(), collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_store_error)?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Set { path, data } => {
                    sqlx::query(UPSERT_SQL)
                        .bind(&path.collection)
                        .bind(&path.key)
                        .bind(Json(data))
                        .execute(tx.as_mut())
                        .await
                        .map_err(map_store_error)?;
                }
                WriteOp::Delete { path } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
                        .bind(&path.collection)
                        .bind(&path.key)
                        .execute(tx.as_mut())
                        .await
                        .map_err(map_store_error)?;
                }
            }
        }

        tx.commit().await.map_err(map_store_error)
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO documents (collection, key, data, updated_at)
    VALUES ($1, $2, $3, now())
    ON CONFLICT (collection, key)
    DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
"#;

async fn upsert(pool: &PgPool, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
    sqlx::query(UPSERT_SQL)
        .bind(&path.collection)
        .bind(&path.key)
        .bind(Json(data))
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(map_store_error)
}
