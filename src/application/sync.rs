//! Live site content merged from the content store and bundled fallback.
//!
//! Two subscriptions feed one reducer: the root document and the case study
//! subcollection. Each notification updates the snapshot of its own source
//! and re-merges against the last known snapshot of the other, so the
//! published view never loses a source's latest value. Consumers read
//! immutable [`ContentView`] snapshots from a `watch` channel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::{StreamExt, stream::BoxStream};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

use crate::application::repos::{
    ContentStore, DocumentPath, StoreError, StoredDocument, WORK_COLLECTION, WriteBatch,
};
use crate::domain::content::{CaseStudy, SiteContent, Work};
use crate::domain::fallback::fallback_content;
use crate::domain::normalize;
use crate::util::lock::mutex_lock;

/// Shown to visitors while a source fails for a reason other than access.
pub const LOAD_ERROR_MESSAGE: &str = "Unable to load live content. Showing fallback instead.";

/// Returned from a save whose subcollection batch was denied.
pub const WORK_SYNC_WARNING: &str = "Saved siteContent/public, but syncing siteContent/public/work failed. Grant write access to the work collection to enable live case studies.";

const METRIC_SYNC_SNAPSHOTS: &str = "marquee_sync_snapshots_total";
const METRIC_SYNC_ERRORS: &str = "marquee_sync_errors_total";
const METRIC_CONTENT_SAVES: &str = "marquee_content_saves_total";

const LOCK_TARGET: &str = "application::sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// No store configured; fallback content only.
    Uninitialized,
    AwaitingFirstSnapshot,
    Synced,
    /// At least one source failed and is served from fallback.
    Degraded,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingFirstSnapshot => "awaiting-first-snapshot",
            Self::Synced => "synced",
            Self::Degraded => "degraded",
        }
    }
}

/// Read-only snapshot handed to consumers.
#[derive(Debug, Clone)]
pub struct ContentView {
    pub content: Arc<SiteContent>,
    /// True until both sources have delivered a snapshot or an error.
    pub loading: bool,
    pub error: Option<String>,
    pub status: SyncStatus,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The content as persisted, after slug assignment and normalization.
    pub content: SiteContent,
    pub warning: Option<String>,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("content store is not configured")]
    NotConfigured,
    #[error("content synchronizer has been shut down")]
    Closed,
    #[error("failed to write siteContent/public")]
    RootWrite(#[source] StoreError),
    #[error("failed to sync siteContent/public/work")]
    WorkSync(#[source] StoreError),
    #[error("failed to encode site content: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFailure {
    PermissionDenied,
    Other,
}

impl SourceFailure {
    fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Default)]
struct SourceState<T> {
    snapshot: T,
    settled: bool,
    failure: Option<SourceFailure>,
}

impl<T: Default> SourceState<T> {
    fn accept(&mut self, snapshot: T) {
        self.snapshot = snapshot;
        self.settled = true;
        self.failure = None;
    }

    fn fail(&mut self, error: &StoreError) -> SourceFailure {
        let failure = if error.is_permission_denied() {
            SourceFailure::PermissionDenied
        } else {
            SourceFailure::Other
        };
        self.snapshot = T::default();
        self.settled = true;
        self.failure = Some(failure);
        failure
    }
}

enum SourceEvent {
    Root(Result<Option<Value>, StoreError>),
    Work(Result<Vec<StoredDocument>, StoreError>),
}

#[derive(Debug, Default)]
struct SyncState {
    live: bool,
    closed: bool,
    root: SourceState<Option<Value>>,
    work: SourceState<Vec<CaseStudy>>,
}

impl SyncState {
    fn connected() -> Self {
        Self {
            live: true,
            ..Self::default()
        }
    }

    fn apply(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Root(Ok(document)) => {
                counter!(METRIC_SYNC_SNAPSHOTS, "source" => "root").increment(1);
                self.root.accept(document);
            }
            SourceEvent::Work(Ok(documents)) => {
                counter!(METRIC_SYNC_SNAPSHOTS, "source" => "work").increment(1);
                let studies = documents
                    .iter()
                    .filter_map(|document| {
                        normalize::case_study_document(&document.key, &document.data)
                    })
                    .collect();
                self.work.accept(studies);
            }
            SourceEvent::Root(Err(err)) => {
                let failure = self.root.fail(&err);
                record_failure("root", failure, &err);
            }
            SourceEvent::Work(Err(err)) => {
                let failure = self.work.fail(&err);
                record_failure("work", failure, &err);
            }
        }
    }

    fn loading(&self) -> bool {
        self.live && !(self.root.settled && self.work.settled)
    }

    fn status(&self) -> SyncStatus {
        if !self.live {
            SyncStatus::Uninitialized
        } else if self.loading() {
            SyncStatus::AwaitingFirstSnapshot
        } else if self.root.failure.is_some() || self.work.failure.is_some() {
            SyncStatus::Degraded
        } else {
            SyncStatus::Synced
        }
    }

    fn error(&self) -> Option<String> {
        [self.root.failure, self.work.failure]
            .contains(&Some(SourceFailure::Other))
            .then(|| LOAD_ERROR_MESSAGE.to_string())
    }

    fn view(&self, content: SiteContent) -> ContentView {
        ContentView {
            content: Arc::new(content),
            loading: self.loading(),
            error: self.error(),
            status: self.status(),
        }
    }

    fn merge(&self) -> ContentView {
        self.view(self.merged_content())
    }

    fn merged_content(&self) -> SiteContent {
        let fallback = fallback_content();
        let root = self.root.snapshot.as_ref().and_then(Value::as_object);
        let field = |name: &str| root.and_then(|document| document.get(name));
        let work = field("work");
        let work_field = |name: &str| work.and_then(|value| value.get(name));

        SiteContent {
            hero: normalize::hero(field("hero"), &fallback.hero),
            stats: normalize::stats(field("stats")),
            services: normalize::services(field("services")),
            differentiators: normalize::differentiators(field("differentiators")),
            projects: normalize::projects(field("projects")),
            work: Work {
                case_studies: self.case_studies(work_field("caseStudies")),
                service_packages: normalize::service_packages(work_field("servicePackages")),
                testimonials: normalize::testimonials(work_field("testimonials")),
            },
            process: normalize::process(field("process")),
            contact: normalize::contact(field("contact"), &fallback.contact),
        }
    }

    /// Subcollection first, then the list embedded in the root document,
    /// then the bundled case studies.
    fn case_studies(&self, embedded: Option<&Value>) -> Vec<CaseStudy> {
        if !self.work.snapshot.is_empty() {
            return self.work.snapshot.clone();
        }

        let embedded = normalize::embedded_case_studies(embedded);
        if !embedded.is_empty() {
            return embedded;
        }

        fallback_content().work.case_studies.clone()
    }
}

fn record_failure(source: &'static str, failure: SourceFailure, err: &StoreError) {
    counter!(METRIC_SYNC_ERRORS, "source" => source, "kind" => failure.as_str()).increment(1);
    match failure {
        SourceFailure::PermissionDenied => info!(
            target = "marquee::sync",
            source,
            error = %err,
            "Live content source is not readable; serving fallback"
        ),
        SourceFailure::Other => warn!(
            target = "marquee::sync",
            source,
            error = %err,
            "Live content source failed; serving fallback"
        ),
    }
}

struct Shared {
    state: Mutex<SyncState>,
    view: watch::Sender<ContentView>,
}

impl Shared {
    fn new(state: SyncState) -> Arc<Self> {
        let (view, _) = watch::channel(state.merge());
        Arc::new(Self {
            state: Mutex::new(state),
            view,
        })
    }

    /// Apply one notification. Returns false once the synchronizer is closed.
    fn apply(&self, event: SourceEvent) -> bool {
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "apply");
        if state.closed {
            return false;
        }
        state.apply(event);
        self.view.send_replace(state.merge());
        true
    }

    /// Adopt a saved draft as the current view without waiting for the echo.
    fn publish_saved(&self, root: Value, saved: &SiteContent) {
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "publish_saved");
        if state.closed {
            return;
        }
        state.root.accept(Some(root));
        state.work.accept(saved.work.case_studies.clone());
        self.view.send_replace(state.view(saved.clone()));
    }

    fn is_closed(&self) -> bool {
        mutex_lock(&self.state, LOCK_TARGET, "is_closed").closed
    }

    /// Mark closed. Returns false when already closed.
    fn close(&self) -> bool {
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "close");
        !std::mem::replace(&mut state.closed, true)
    }
}

/// Owns both subscriptions and the merged view.
pub struct ContentSynchronizer {
    store: Option<Arc<dyn ContentStore>>,
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ContentSynchronizer {
    /// Subscribe to the root document and the work collection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(store: Arc<dyn ContentStore>) -> Self {
        let shared = Shared::new(SyncState::connected());

        let root = store
            .watch_document(&DocumentPath::root())
            .map(SourceEvent::Root)
            .boxed();
        let work = store
            .watch_collection(WORK_COLLECTION)
            .map(SourceEvent::Work)
            .boxed();

        let tasks = vec![
            spawn_source(Arc::clone(&shared), root),
            spawn_source(Arc::clone(&shared), work),
        ];

        info!(
            target = "marquee::sync",
            backend = store.describe(),
            "Subscribed to site content"
        );

        Self {
            store: Some(store),
            shared,
            tasks: Mutex::new(tasks),
        }
    }

    /// Fallback content only; never loading, never subscribed.
    pub fn offline() -> Self {
        info!(
            target = "marquee::sync",
            "Content store not configured; serving bundled content"
        );
        Self {
            store: None,
            shared: Shared::new(SyncState::default()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_live(&self) -> bool {
        self.store.is_some()
    }

    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("none", |store| store.describe())
    }

    pub fn subscribe(&self) -> watch::Receiver<ContentView> {
        self.shared.view.subscribe()
    }

    pub fn snapshot(&self) -> ContentView {
        self.shared.view.borrow().clone()
    }

    /// Wait until both sources have settled.
    pub async fn loaded(&self) -> ContentView {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|view| !view.loading).await {
            Ok(view) => view.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Persist an editor draft.
    ///
    /// The root document is written first, without the case study list.
    /// Case studies are then upserted into the work collection by slug and
    /// documents missing from the draft are deleted, in one batch. A denied
    /// batch still counts as saved and yields a warning.
    pub async fn save(&self, mut draft: SiteContent) -> Result<SaveOutcome, SyncError> {
        let Some(store) = self.store.as_ref() else {
            return Err(SyncError::NotConfigured);
        };
        if self.shared.is_closed() {
            return Err(SyncError::Closed);
        }

        draft.work.case_studies = normalize::case_studies_for_save(&draft.work.case_studies);
        let root = root_payload(&draft)?;

        if let Err(err) = store.set_document(&DocumentPath::root(), root.clone()).await {
            counter!(METRIC_CONTENT_SAVES, "outcome" => "failed").increment(1);
            error!(
                target = "marquee::sync",
                error = %err,
                "Failed to write root content document"
            );
            return Err(SyncError::RootWrite(err));
        }

        let warning = match sync_work(store.as_ref(), &draft.work.case_studies).await {
            Ok(()) => None,
            Err(err) if err.is_permission_denied() => {
                warn!(
                    target = "marquee::sync",
                    error = %err,
                    "Work collection is not writable; case studies kept locally"
                );
                Some(WORK_SYNC_WARNING.to_string())
            }
            Err(err) => {
                counter!(METRIC_CONTENT_SAVES, "outcome" => "failed").increment(1);
                error!(
                    target = "marquee::sync",
                    error = %err,
                    "Failed to sync work collection"
                );
                return Err(SyncError::WorkSync(err));
            }
        };

        self.shared.publish_saved(root, &draft);

        let outcome = if warning.is_some() { "partial" } else { "saved" };
        counter!(METRIC_CONTENT_SAVES, "outcome" => outcome).increment(1);
        info!(
            target = "marquee::sync",
            case_studies = draft.work.case_studies.len(),
            outcome,
            "Saved site content"
        );

        Ok(SaveOutcome {
            content: draft,
            warning,
        })
    }

    /// Stop both subscriptions. Safe to call more than once; no view update
    /// is published after the first call returns.
    pub fn shutdown(&self) {
        if !self.shared.close() {
            return;
        }
        for task in mutex_lock(&self.tasks, LOCK_TARGET, "shutdown").drain(..) {
            task.abort();
        }
        info!(target = "marquee::sync", "Content subscriptions released");
    }
}

impl Drop for ContentSynchronizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_source(shared: Arc<Shared>, mut events: BoxStream<'static, SourceEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if !shared.apply(event) {
                break;
            }
        }
    })
}

/// Root document body: everything except `work.caseStudies`.
fn root_payload(draft: &SiteContent) -> Result<Value, SyncError> {
    let mut payload = serde_json::to_value(draft)?;
    if let Some(work) = payload.get_mut("work").and_then(Value::as_object_mut) {
        work.remove("caseStudies");
    }
    Ok(normalize::strip_absent(payload))
}

async fn sync_work(store: &dyn ContentStore, case_studies: &[CaseStudy]) -> Result<(), StoreError> {
    let existing = store.list_collection(WORK_COLLECTION).await?;
    let kept: HashSet<&str> = case_studies.iter().map(|study| study.slug.as_str()).collect();

    let mut batch = WriteBatch::new();
    for study in case_studies {
        let data = serde_json::to_value(study)
            .map_err(|err| StoreError::invalid_payload(err.to_string()))?;
        batch.set(
            DocumentPath::new(WORK_COLLECTION, &study.slug),
            normalize::strip_absent(data),
        );
    }
    for document in existing
        .iter()
        .filter(|document| !kept.contains(document.key.as_str()))
    {
        batch.delete(DocumentPath::new(WORK_COLLECTION, &document.key));
    }

    if batch.is_empty() {
        return Ok(());
    }
    store.commit(batch).await
}
