//! Remote sync gateway: pushes settings to the voice-agent provider, then
//! persists them for the user, and loads the persisted baseline back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::settings::{AgentSettings, FieldKey};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

pub const PERSISTENCE_WARNING: &str = "Agent updated, but your settings could not be saved. \
     They may not be restored the next time you sign in.";

/// Which provider resource a failed call was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderResource {
    /// Voice and timing parameters (and the prompt in combined mode)
    Agent,
    /// The LLM backing the agent; carries the prompt in split mode
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// One update call carrying every field, prompt included.
    Combined,
    /// Agent and LLM are separate resources updated side by side.
    Split,
}

/// Body of the agent update call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPatch {
    pub voice_speed: f64,
    pub responsiveness: f64,
    pub interruption_sensitivity: f64,
    pub voice_temperature: f64,
    pub volume: f64,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_prompt: Option<String>,
}

impl AgentPatch {
    pub fn from_settings(settings: &AgentSettings, mode: ProviderMode) -> Self {
        Self {
            voice_speed: settings.voice_speed,
            responsiveness: settings.responsiveness,
            interruption_sensitivity: settings.interruption_sensitivity,
            voice_temperature: settings.voice_temperature,
            volume: settings.volume,
            language: settings.language.clone(),
            voice_id: Some(settings.voice_id.clone()).filter(|id| !id.is_empty()),
            general_prompt: match mode {
                ProviderMode::Combined => trimmed_prompt(settings),
                ProviderMode::Split => None,
            },
        }
    }
}

/// Body of the LLM update call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmPatch {
    pub general_prompt: String,
}

impl LlmPatch {
    /// `None` when there is no prompt to send.
    pub fn from_settings(settings: &AgentSettings) -> Option<Self> {
        trimmed_prompt(settings).map(|general_prompt| Self { general_prompt })
    }
}

fn trimmed_prompt(settings: &AgentSettings) -> Option<String> {
    let prompt = settings.prompt.trim();
    (!prompt.is_empty()).then(|| prompt.to_string())
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderCallError {
    /// The provider answered with a non-success status.
    #[error("provider rejected the update with status {status}")]
    Rejected { status: u16, payload: Value },
    /// No usable answer: connection failure, timeout, unreadable body.
    #[error("provider request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Connection, pool or timeout failure.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
    /// The store answered but refused the operation.
    #[error("settings store rejected the operation: {0}")]
    Rejected(String),
}

/// A persisted settings row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSettings {
    pub settings: AgentSettings,
    pub updated_at: DateTime<Utc>,
}

/// Persistence collaborator, keyed by user.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` for a user who never saved.
    async fn load(&self, user_id: Uuid) -> Result<Option<StoredSettings>, StoreError>;

    async fn upsert(&self, user_id: Uuid, settings: &AgentSettings) -> Result<(), StoreError>;
}

/// Voice-agent provider collaborator.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    fn mode(&self) -> ProviderMode;

    async fn update_agent(&self, patch: &AgentPatch) -> Result<Value, ProviderCallError>;

    /// Only called in [`ProviderMode::Split`].
    async fn update_llm(&self, patch: &LlmPatch) -> Result<Value, ProviderCallError>;
}

/// Result of one save attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Provider updated and settings persisted.
    Success { data: Value },
    /// Provider rejected the update; nothing was persisted.
    ProviderFailure {
        status: u16,
        payload: Value,
        resource: ProviderResource,
    },
    /// Provider updated, persisting failed. Not a hard failure.
    PersistedWithWarning { data: Value, warning: String },
    /// Transport failure or timeout talking to the provider.
    NetworkFailure { message: String },
    /// The server turned the request down before contacting the provider
    /// (authentication, configuration, validation). Only produced by remote
    /// gateways that talk to the API.
    Refused {
        status: u16,
        message: String,
        field: Option<FieldKey>,
    },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(
            self,
            SaveOutcome::Success { .. } | SaveOutcome::PersistedWithWarning { .. }
        )
    }
}

/// Read the persisted row for `user_id`, bounded by `timeout`.
pub async fn load_stored(
    store: &dyn SettingsStore,
    user_id: Uuid,
    timeout: Duration,
) -> Result<Option<StoredSettings>, StoreError> {
    let loaded = bounded(timeout, store.load(user_id), || {
        StoreError::Unavailable(format!("no answer within {}s", timeout.as_secs()))
    })
    .await?;

    if loaded.is_none() {
        tracing::debug!(user_id = %user_id, "No saved settings, using defaults");
    }
    Ok(loaded)
}

async fn bounded<T, E, F>(timeout: Duration, fut: F, on_timeout: impl FnOnce() -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or_else(|_| Err(on_timeout()))
}

/// Save/load orchestration over the two collaborators.
#[derive(Clone)]
pub struct SyncGateway {
    store: Arc<dyn SettingsStore>,
    provider: Arc<dyn AgentProvider>,
    timeout: Duration,
}

impl SyncGateway {
    pub fn new(store: Arc<dyn SettingsStore>, provider: Arc<dyn AgentProvider>) -> Self {
        Self {
            store,
            provider,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn load(&self, user_id: Uuid) -> Result<Option<AgentSettings>, StoreError> {
        Ok(load_stored(self.store.as_ref(), user_id, self.timeout)
            .await?
            .map(|stored| stored.settings))
    }

    /// Provider first; persistence only after the provider accepted.
    ///
    /// The prompt is trimmed once here, so the provider and the store receive
    /// the same document.
    pub async fn save(&self, user_id: Uuid, settings: &AgentSettings) -> SaveOutcome {
        let settings = &AgentSettings {
            prompt: settings.prompt.trim().to_string(),
            ..settings.clone()
        };
        let data = match self.push_to_provider(settings).await {
            Ok(data) => data,
            Err((resource, ProviderCallError::Rejected { status, payload })) => {
                tracing::warn!(
                    user_id = %user_id,
                    status,
                    resource = ?resource,
                    payload = %payload,
                    "Provider rejected settings update"
                );
                return SaveOutcome::ProviderFailure {
                    status,
                    payload,
                    resource,
                };
            }
            Err((resource, ProviderCallError::Transport(message))) => {
                tracing::error!(
                    user_id = %user_id,
                    resource = ?resource,
                    error = %message,
                    "Provider unreachable"
                );
                return SaveOutcome::NetworkFailure { message };
            }
        };

        let timeout = self.timeout;
        let persisted = bounded(timeout, self.store.upsert(user_id, settings), || {
            StoreError::Unavailable(format!("no answer within {}s", timeout.as_secs()))
        })
        .await;

        match persisted {
            Ok(()) => {
                tracing::info!(user_id = %user_id, "Agent settings updated and saved");
                SaveOutcome::Success { data }
            }
            Err(err) => {
                // The agent already runs the new settings; only durability is lost.
                tracing::warn!(
                    user_id = %user_id,
                    error = %err,
                    "Agent updated but settings were not persisted"
                );
                SaveOutcome::PersistedWithWarning {
                    data,
                    warning: PERSISTENCE_WARNING.to_string(),
                }
            }
        }
    }

    async fn push_to_provider(
        &self,
        settings: &AgentSettings,
    ) -> Result<Value, (ProviderResource, ProviderCallError)> {
        let mode = self.provider.mode();
        let agent_patch = AgentPatch::from_settings(settings, mode);
        let agent_call = self.call(self.provider.update_agent(&agent_patch));

        match mode {
            ProviderMode::Combined => agent_call.await.map_err(|e| (ProviderResource::Agent, e)),
            ProviderMode::Split => {
                let llm_patch = LlmPatch::from_settings(settings);
                let llm_call = async {
                    match &llm_patch {
                        Some(patch) => self.call(self.provider.update_llm(patch)).await,
                        None => Ok(Value::Null),
                    }
                };
                let (agent, llm) = tokio::join!(agent_call, llm_call);
                // Agent failure is reported first when both fail.
                let agent = agent.map_err(|e| (ProviderResource::Agent, e))?;
                let llm = llm.map_err(|e| (ProviderResource::Llm, e))?;
                Ok(json!({ "agent": agent, "llm": llm }))
            }
        }
    }

    async fn call<F>(&self, fut: F) -> Result<Value, ProviderCallError>
    where
        F: Future<Output = Result<Value, ProviderCallError>>,
    {
        let timeout = self.timeout;
        bounded(timeout, fut, || {
            ProviderCallError::Transport(format!("no answer within {}s", timeout.as_secs()))
        })
        .await
    }

    pub fn for_user(&self, user_id: Uuid) -> UserGateway {
        UserGateway {
            gateway: self.clone(),
            user_id,
        }
    }
}

/// A [`SyncGateway`] bound to one authenticated user.
#[derive(Clone)]
pub struct UserGateway {
    gateway: SyncGateway,
    user_id: Uuid,
}

impl UserGateway {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

#[async_trait]
impl crate::session::SettingsGateway for UserGateway {
    async fn load(&self) -> Result<Option<AgentSettings>, crate::session::GatewayError> {
        Ok(self.gateway.load(self.user_id).await?)
    }

    async fn save(&self, settings: &AgentSettings) -> SaveOutcome {
        self.gateway.save(self.user_id, settings).await
    }
}
