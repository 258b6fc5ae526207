use std::sync::Arc;

use crate::application::admins::AdminService;
use crate::application::contact::ContactService;
use crate::application::sync::ContentSynchronizer;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub content: Arc<ContentSynchronizer>,
    pub contact: Arc<ContactService>,
    /// Absent when no principals store is configured; admin routes then
    /// answer `not_configured`.
    pub admins: Option<Arc<AdminService>>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}
