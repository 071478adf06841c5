use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::cache::Cache;
use crate::config::{AppConfig, ConfigError};
use crate::drive::{AttachmentService, ObjectStorage};
use crate::notifications::NotificationQueue;
use crate::search::{DocumentIndex, SearchSynchronizer};
use crate::store::Store;
use crate::tasks::aggregation::AggregationService;
use crate::tasks::lifecycle::TaskLifecycle;
use crate::tasks::time_tracking::TimeTracker;
use crate::users::AccountService;

/// Shared by every handler behind an `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub accounts: AccountService,
    pub lifecycle: TaskLifecycle,
    pub time_tracker: TimeTracker,
    pub aggregation: AggregationService,
    pub search: Arc<SearchSynchronizer>,
    pub attachments: AttachmentService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        cache: Arc<dyn Cache>,
        index: Arc<dyn DocumentIndex>,
        storage: Arc<dyn ObjectStorage>,
        notifications: NotificationQueue,
    ) -> Result<Self, ConfigError> {
        let search = Arc::new(SearchSynchronizer::new(index));
        let ttl = config.cache.top_logged_tasks_ttl();
        let tokens = TokenIssuer::new(&config.auth)?;
        Ok(Self {
            accounts: AccountService::new(store.clone(), tokens.clone()),
            tokens,
            lifecycle: TaskLifecycle::new(store.clone(), search.clone(), notifications),
            time_tracker: TimeTracker::new(store.clone()),
            aggregation: AggregationService::new(store.clone(), cache, ttl),
            attachments: AttachmentService::new(store.clone(), storage),
            search,
            store,
            config,
        })
    }
}
