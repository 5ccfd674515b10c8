use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;
use voxdesk_core::settings::AgentSettings;
use voxdesk_core::sync::{SettingsStore, StoreError, StoredSettings};

/// `user_agent_settings`, one row per user.
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    settings: Json<AgentSettings>,
    updated_at: DateTime<Utc>,
}

/// Connection-level failures are retryable; anything the database answered
/// with is a refusal.
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        other => StoreError::Rejected(other.to_string()),
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<StoredSettings>, StoreError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT settings, updated_at FROM user_agent_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|row| StoredSettings {
            settings: row.settings.0,
            updated_at: row.updated_at,
        }))
    }

    async fn upsert(&self, user_id: Uuid, settings: &AgentSettings) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_agent_settings (id, user_id, settings) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE \
             SET settings = EXCLUDED.settings, updated_at = NOW()",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(Json(settings))
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }
}
