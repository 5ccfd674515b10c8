use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use voxdesk_core::sync::{AgentProvider, SettingsStore, SyncGateway};

use crate::auth::Identity;
use crate::config::MissingConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub identity: Arc<dyn Identity>,
    pub store: Arc<dyn SettingsStore>,
    /// `Err` while provider credentials are not configured.
    pub provider: Result<Arc<dyn AgentProvider>, MissingConfig>,
    pub upstream_timeout: Duration,
}

impl AppState {
    pub fn gateway(&self) -> Result<SyncGateway, MissingConfig> {
        let provider = self.provider.clone()?;
        Ok(SyncGateway::new(self.store.clone(), provider).with_timeout(self.upstream_timeout))
    }
}
