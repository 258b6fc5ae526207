use serde::Serialize;
use uuid::Uuid;

use crate::application::sync::{ContentView, SyncStatus};
use crate::domain::content::SiteContent;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub store: &'static str,
    pub status: SyncStatus,
}

/// Wire form of a [`ContentView`].
#[derive(Debug, Serialize)]
pub struct ContentResponse<'a> {
    pub content: &'a SiteContent,
    pub loading: bool,
    pub error: Option<&'a str>,
    pub status: SyncStatus,
}

impl<'a> From<&'a ContentView> for ContentResponse<'a> {
    fn from(view: &'a ContentView) -> Self {
        Self {
            content: view.content.as_ref(),
            loading: view.loading,
            error: view.error.as_deref(),
            status: view.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub ok: bool,
    pub uid: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub ok: bool,
    pub warning: Option<String>,
    pub content: SiteContent,
}
