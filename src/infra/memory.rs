//! Process-local content store with push notifications.
//!
//! Backs the `memory` store backend and the test suites. Access rules can
//! deny or break reads and writes per collection to exercise the degraded
//! paths of the synchronizer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_stream::stream;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::application::repos::{
    ContentStore, DocumentPath, SnapshotStream, StoreError, StoredDocument, WriteBatch, WriteOp,
};
use crate::util::lock::mutex_lock;

const CHANGE_CAPACITY: usize = 64;
const LOCK_TARGET: &str = "infra::memory";

/// How the store answers an operation on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Allow,
    /// Fails with the permission-denied error class.
    Deny,
    /// Fails like an unreachable backend.
    Unavailable,
}

impl Access {
    fn check(self, collection: &str) -> Result<(), StoreError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny => Err(StoreError::classify(
                Some("permission-denied"),
                format!("Missing or insufficient permissions for `{collection}`"),
            )),
            Self::Unavailable => Err(StoreError::unavailable(format!(
                "`{collection}` is unreachable"
            ))),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    collections: BTreeMap<String, BTreeMap<String, Value>>,
    read_rules: HashMap<String, Access>,
    write_rules: HashMap<String, Access>,
}

impl Inner {
    fn read_access(&self, collection: &str) -> Result<(), StoreError> {
        self.read_rules
            .get(collection)
            .copied()
            .unwrap_or_default()
            .check(collection)
    }

    fn write_access(&self, collection: &str) -> Result<(), StoreError> {
        self.write_rules
            .get(collection)
            .copied()
            .unwrap_or_default()
            .check(collection)
    }

    fn document(&self, path: &DocumentPath) -> Option<Value> {
        self.collections
            .get(&path.collection)
            .and_then(|documents| documents.get(&path.key))
            .cloned()
    }

    fn list(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(key, data)| StoredDocument {
                        key: key.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::Set { path, data } => {
                self.collections
                    .entry(path.collection)
                    .or_default()
                    .insert(path.key, data);
            }
            WriteOp::Delete { path } => {
                if let Some(documents) = self.collections.get_mut(&path.collection) {
                    documents.remove(&path.key);
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct MemoryContentStore {
    inner: Arc<Mutex<Inner>>,
    changes: broadcast::Sender<String>,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            changes,
        }
    }

    pub fn set_read_access(&self, collection: &str, access: Access) {
        mutex_lock(&self.inner, LOCK_TARGET, "set_read_access")
            .read_rules
            .insert(collection.to_string(), access);
        self.notify(collection);
    }

    pub fn set_write_access(&self, collection: &str, access: Access) {
        mutex_lock(&self.inner, LOCK_TARGET, "set_write_access")
            .write_rules
            .insert(collection.to_string(), access);
    }

    /// Write a document, bypassing access rules.
    pub fn seed(&self, path: DocumentPath, data: Value) {
        let collection = path.collection.clone();
        mutex_lock(&self.inner, LOCK_TARGET, "seed").apply(WriteOp::Set { path, data });
        self.notify(&collection);
    }

    /// Read a document, bypassing access rules.
    pub fn document(&self, path: &DocumentPath) -> Option<Value> {
        mutex_lock(&self.inner, LOCK_TARGET, "document").document(path)
    }

    /// Keys of a collection in order, bypassing access rules.
    pub fn keys(&self, collection: &str) -> Vec<String> {
        mutex_lock(&self.inner, LOCK_TARGET, "keys")
            .list(collection)
            .into_iter()
            .map(|document| document.key)
            .collect()
    }

    fn notify(&self, collection: &str) {
        // No receivers simply means nobody is watching.
        let _ = self.changes.send(collection.to_string());
    }

    fn read_document(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        let inner = mutex_lock(&self.inner, LOCK_TARGET, "read_document");
        inner.read_access(&path.collection)?;
        Ok(inner.document(path))
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let inner = mutex_lock(&self.inner, LOCK_TARGET, "read_collection");
        inner.read_access(collection)?;
        Ok(inner.list(collection))
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn describe(&self) -> &'static str {
        "memory"
    }

    fn watch_document(&self, path: &DocumentPath) -> SnapshotStream<Option<Value>> {
        let store = self.clone();
        let path = path.clone();
        let mut changes = self.changes.subscribe();

        Box::pin(stream! {
            yield store.read_document(&path);
            loop {
                match changes.recv().await {
                    Ok(collection) if collection == path.collection => {
                        yield store.read_document(&path);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => yield store.read_document(&path),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn watch_collection(&self, collection: &str) -> SnapshotStream<Vec<StoredDocument>> {
        let store = self.clone();
        let collection = collection.to_string();
        let mut changes = self.changes.subscribe();

        Box::pin(stream! {
            yield store.read_collection(&collection);
            loop {
                match changes.recv().await {
                    Ok(changed) if changed == collection => {
                        yield store.read_collection(&collection);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => yield store.read_collection(&collection),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn set_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
        {
            let mut inner = mutex_lock(&self.inner, LOCK_TARGET, "set_document");
            inner.write_access(&path.collection)?;
            inner.apply(WriteOp::Set {
                path: path.clone(),
                data,
            });
        }
        self.notify(&path.collection);
        Ok(())
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        self.read_collection(collection)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut touched = HashSet::new();
        {
            let mut inner = mutex_lock(&self.inner, LOCK_TARGET, "commit");
            for op in batch.ops() {
                let collection = match op {
                    WriteOp::Set { path, .. } | WriteOp::Delete { path } => &path.collection,
                };
                inner.write_access(collection)?;
            }
            for op in batch.into_ops() {
                match &op {
                    WriteOp::Set { path, .. } | WriteOp::Delete { path } => {
                        touched.insert(path.collection.clone());
                    }
                }
                inner.apply(op);
            }
        }
        for collection in touched {
            self.notify(&collection);
        }
        Ok(())
    }
}
