//! One editing session over a user's agent settings.
//!
//! The session owns two snapshots: `baseline` (last known persisted value) and
//! `working` (what the user is editing). They never alias; every transfer is a
//! clone. The session is driven from a single task, so all mutation goes
//! through `&mut self`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::diff;
use crate::normalize::{self, NormalizedError};
use crate::settings::{AgentSettings, FieldKey, SettingsEdit};
use crate::sync::{SaveOutcome, StoreError};
use crate::validate::{self, Violation};

pub const NETWORK_ERROR: &str = "Network error occurred. Please try again.";
pub const LOAD_ERROR: &str = "Could not load your saved settings; showing defaults.";

/// Field-attributed errors from the latest submission.
pub type FieldErrors = BTreeMap<FieldKey, String>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("not signed in")]
    Unauthorized,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Where the session loads its baseline from and sends saves to.
#[async_trait]
pub trait SettingsGateway: Send + Sync {
    /// `Ok(None)` when the user has nothing saved yet.
    async fn load(&self) -> Result<Option<AgentSettings>, GatewayError>;

    async fn save(&self, settings: &AgentSettings) -> SaveOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready { dirty: bool },
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// Saved settings were found and are now the baseline.
    Restored,
    /// Nothing saved yet; defaults are the baseline.
    Defaults,
    /// Loading failed; defaults are the baseline and a general error is set.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveReport {
    /// `load` has not completed.
    NotLoaded,
    /// Nothing to save.
    NotDirty,
    /// Rejected locally; no request was made.
    Invalid(Violation),
    Saved,
    /// Saved on the provider, persisting reported a problem.
    SavedWithWarning(String),
    /// Rejected remotely; the error is on the session as well.
    Rejected { status: u16, error: NormalizedError },
    NetworkError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("settings are not loaded yet")]
    NotLoaded,
    #[error("a save is in progress")]
    Busy,
}

pub struct SettingsSession<G> {
    gateway: G,
    loaded: bool,
    submitting: bool,
    baseline: AgentSettings,
    working: AgentSettings,
    field_errors: FieldErrors,
    general_error: Option<String>,
    warning: Option<String>,
}

impl<G: SettingsGateway> SettingsSession<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            loaded: false,
            submitting: false,
            baseline: AgentSettings::default(),
            working: AgentSettings::default(),
            field_errors: FieldErrors::new(),
            general_error: None,
            warning: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if !self.loaded {
            SessionState::Loading
        } else if self.submitting {
            SessionState::Submitting
        } else {
            SessionState::Ready {
                dirty: self.is_dirty(),
            }
        }
    }

    /// Fetch the baseline. Both snapshots start from the loaded value, or from
    /// the defaults when there is none.
    pub async fn load(&mut self) -> LoadReport {
        let (settings, report) = match self.gateway.load().await {
            Ok(Some(saved)) => (saved, LoadReport::Restored),
            Ok(None) => (AgentSettings::default(), LoadReport::Defaults),
            Err(err) => {
                tracing::warn!(error = %err, "Falling back to default settings");
                self.general_error = Some(LOAD_ERROR.to_string());
                (AgentSettings::default(), LoadReport::Failed(err.to_string()))
            }
        };
        self.baseline = settings.clone();
        self.working = settings;
        self.loaded = true;
        report
    }

    pub fn baseline(&self) -> &AgentSettings {
        &self.baseline
    }

    pub fn working(&self) -> &AgentSettings {
        &self.working
    }

    pub fn is_dirty(&self) -> bool {
        !diff::settings_equal(&self.baseline, &self.working)
    }

    /// Whether the save control should be enabled.
    pub fn can_save(&self) -> bool {
        self.loaded && !self.submitting && self.is_dirty() && validate::can_submit(&self.working)
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn general_error(&self) -> Option<&str> {
        self.general_error.as_deref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        if !self.loaded {
            return Err(SessionError::NotLoaded);
        }
        if self.submitting {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    pub fn edit(&mut self, edit: SettingsEdit) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.working.apply(edit);
        Ok(())
    }

    /// Replace the whole working snapshot, e.g. with a document read from disk.
    pub fn replace_working(&mut self, settings: AgentSettings) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.working = settings;
        Ok(())
    }

    /// Throw away edits. Returns whether there was anything to discard.
    pub fn discard(&mut self) -> bool {
        if !self.loaded || !self.is_dirty() {
            return false;
        }
        self.working = self.baseline.clone();
        self.field_errors.clear();
        self.general_error = None;
        true
    }

    /// Submit the working snapshot.
    ///
    /// Gated on the session being loaded, dirty and locally valid. Errors from
    /// the previous attempt are cleared before the gate so the UI only ever
    /// shows the outcome of the latest attempt.
    pub async fn save(&mut self) -> SaveReport {
        if !self.loaded {
            return SaveReport::NotLoaded;
        }
        if !self.is_dirty() {
            return SaveReport::NotDirty;
        }

        self.field_errors.clear();
        self.general_error = None;
        self.warning = None;

        if let Some(violation) = validate::validate(&self.working) {
            self.field_errors
                .insert(violation.field.into(), violation.message.clone());
            return SaveReport::Invalid(violation);
        }

        self.submitting = true;
        let submitted = self.working.clone();
        let outcome = self.gateway.save(&submitted).await;
        self.submitting = false;

        self.apply_outcome(outcome, submitted)
    }

    fn apply_outcome(&mut self, outcome: SaveOutcome, submitted: AgentSettings) -> SaveReport {
        match outcome {
            SaveOutcome::Success { .. } => {
                self.baseline = submitted;
                SaveReport::Saved
            }
            SaveOutcome::PersistedWithWarning { warning, .. } => {
                // The provider is the source of truth once it accepted.
                self.baseline = submitted;
                self.warning = Some(warning.clone());
                SaveReport::SavedWithWarning(warning)
            }
            SaveOutcome::ProviderFailure {
                status,
                payload,
                resource,
            } => {
                let error = normalize::normalize_for_resource(&payload, &submitted, resource);
                self.record(&error);
                SaveReport::Rejected { status, error }
            }
            SaveOutcome::Refused {
                status,
                message,
                field,
            } => {
                let error = NormalizedError { message, field };
                self.record(&error);
                SaveReport::Rejected { status, error }
            }
            SaveOutcome::NetworkFailure { message } => {
                tracing::warn!(error = %message, "Settings save failed in transit");
                self.general_error = Some(NETWORK_ERROR.to_string());
                SaveReport::NetworkError(message)
            }
        }
    }

    fn record(&mut self, error: &NormalizedError) {
        match error.field {
            Some(field) => {
                self.field_errors.insert(field, error.message.clone());
            }
            None => self.general_error = Some(error.message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::settings::SettingsField;
    use crate::sync::testing::{InMemoryStore, ScriptedProvider, rejected};
    use crate::sync::{ProviderMode, StoredSettings, SyncGateway, UserGateway};

    const PROMPT: &str = "You answer calls for a dental clinic.";

    fn saved() -> AgentSettings {
        AgentSettings {
            prompt: PROMPT.to_string(),
            ..AgentSettings::default()
        }
    }

    fn user_gateway(store: Arc<InMemoryStore>, provider: Arc<ScriptedProvider>) -> UserGateway {
        SyncGateway::new(store, provider).for_user(Uuid::now_v7())
    }

    fn store_with(user_id: Uuid, settings: AgentSettings) -> Arc<InMemoryStore> {
        let store = InMemoryStore::default();
        store.rows.lock().unwrap().insert(
            user_id,
            StoredSettings {
                settings,
                updated_at: chrono::Utc::now(),
            },
        );
        Arc::new(store)
    }

    async fn loaded_session(
        provider: ScriptedProvider,
    ) -> (SettingsSession<UserGateway>, Arc<ScriptedProvider>, Arc<InMemoryStore>) {
        let user_id = Uuid::now_v7();
        let store = store_with(user_id, saved());
        let provider = Arc::new(provider);
        let gateway = SyncGateway::new(store.clone(), provider.clone()).for_user(user_id);
        let mut session = SettingsSession::new(gateway);
        assert_eq!(session.load().await, LoadReport::Restored);
        (session, provider, store)
    }

    #[tokio::test]
    async fn first_time_user_starts_from_defaults() {
        let store = Arc::new(InMemoryStore::default());
        let provider = Arc::new(ScriptedProvider::accepting(ProviderMode::Combined));
        let mut session = SettingsSession::new(user_gateway(store, provider));
        assert_eq!(session.state(), SessionState::Loading);

        assert_eq!(session.load().await, LoadReport::Defaults);
        assert_eq!(session.state(), SessionState::Ready { dirty: false });
        assert_eq!(session.working(), &AgentSettings::default());
        assert_eq!(session.general_error(), None);
    }

    #[tokio::test]
    async fn load_failure_falls_back_to_defaults_with_error() {
        let store = Arc::new(InMemoryStore {
            fail_load: Some(StoreError::Unavailable("connection reset".to_string())),
            ..InMemoryStore::default()
        });
        let provider = Arc::new(ScriptedProvider::accepting(ProviderMode::Combined));
        let mut session = SettingsSession::new(user_gateway(store, provider));

        assert!(matches!(session.load().await, LoadReport::Failed(_)));
        assert_eq!(session.working(), &AgentSettings::default());
        assert_eq!(session.general_error(), Some(LOAD_ERROR));
    }

    #[tokio::test]
    async fn edits_before_load_are_refused() {
        let store = Arc::new(InMemoryStore::default());
        let provider = Arc::new(ScriptedProvider::accepting(ProviderMode::Combined));
        let mut session = SettingsSession::new(user_gateway(store, provider));

        assert_eq!(
            session.edit(SettingsEdit::Volume(1.5)),
            Err(SessionError::NotLoaded)
        );
        assert_eq!(session.save().await, SaveReport::NotLoaded);
    }

    #[tokio::test]
    async fn edits_toggle_dirty_and_trailing_space_does_not() {
        let (mut session, _, _) =
            loaded_session(ScriptedProvider::accepting(ProviderMode::Combined)).await;

        session
            .edit(SettingsEdit::Prompt(format!("{PROMPT}   ")))
            .expect("loaded session accepts edits");
        assert!(!session.is_dirty());
        assert!(!session.can_save());

        session.edit(SettingsEdit::VoiceSpeed(1.5)).expect("edit");
        assert_eq!(session.state(), SessionState::Ready { dirty: true });
        assert!(session.can_save());

        session.edit(SettingsEdit::VoiceSpeed(1.0)).expect("edit");
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn discard_restores_baseline_copy() {
        let (mut session, _, _) =
            loaded_session(ScriptedProvider::accepting(ProviderMode::Combined)).await;

        session
            .edit(SettingsEdit::Language("fr-FR".to_string()))
            .expect("edit");
        assert!(session.discard());
        assert_eq!(session.working().language, "en-US");
        assert!(!session.is_dirty());
        assert!(!session.discard());

        // editing after discard must not leak into the baseline
        session.edit(SettingsEdit::Volume(0.5)).expect("edit");
        assert_eq!(session.baseline().volume, 1.0);
    }

    #[tokio::test]
    async fn short_prompt_is_rejected_without_network_call() {
        let (mut session, provider, _) =
            loaded_session(ScriptedProvider::accepting(ProviderMode::Combined)).await;

        session
            .edit(SettingsEdit::Prompt("hello".to_string()))
            .expect("edit");
        let report = session.save().await;

        match report {
            SaveReport::Invalid(violation) => {
                assert_eq!(violation.message, "Prompt must be at least 10 characters");
            }
            other => panic!("unexpected report: {other:?}"),
        }
        assert_eq!(provider.calls(), 0);
        assert_eq!(
            session.field_errors().get(&FieldKey::Setting(SettingsField::Prompt)),
            Some(&"Prompt must be at least 10 characters".to_string())
        );
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn successful_save_moves_baseline_and_second_save_is_noop() {
        let (mut session, provider, store) =
            loaded_session(ScriptedProvider::accepting(ProviderMode::Combined)).await;

        session.edit(SettingsEdit::Volume(1.5)).expect("edit");
        assert_eq!(session.save().await, SaveReport::Saved);
        assert_eq!(session.baseline().volume, 1.5);
        assert_eq!(session.state(), SessionState::Ready { dirty: false });

        assert_eq!(session.save().await, SaveReport::NotDirty);
        assert_eq!(provider.agent_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_rejection_sets_field_error_and_stays_dirty() {
        let mut provider = ScriptedProvider::accepting(ProviderMode::Combined);
        provider.agent = Err(rejected(404, "voice_id 11labs-Ghost not found"));
        let (mut session, _, _) = loaded_session(provider).await;

        session
            .edit(SettingsEdit::VoiceId("11labs-Ghost".to_string()))
            .expect("edit");
        let report = session.save().await;

        assert!(matches!(report, SaveReport::Rejected { status: 404, .. }));
        let message = session
            .field_errors()
            .get(&FieldKey::Setting(SettingsField::VoiceId))
            .expect("voice field error");
        assert!(message.contains("11labs-Ghost"));
        assert!(session.is_dirty());
        assert_eq!(session.baseline().voice_id, "11labs-Adrian");
    }

    #[tokio::test]
    async fn llm_rejection_lands_on_prompt() {
        let mut provider = ScriptedProvider::accepting(ProviderMode::Split);
        provider.llm = Err(rejected(400, "too many tokens"));
        let (mut session, _, _) = loaded_session(provider).await;

        session.edit(SettingsEdit::Responsiveness(0.5)).expect("edit");
        session.save().await;

        assert_eq!(
            session.field_errors().get(&FieldKey::Setting(SettingsField::Prompt)),
            Some(&"Prompt error: too many tokens".to_string())
        );
    }

    #[tokio::test]
    async fn unattributed_rejection_becomes_general_error() {
        let mut provider = ScriptedProvider::accepting(ProviderMode::Combined);
        provider.agent = Err(crate::sync::ProviderCallError::Rejected {
            status: 500,
            payload: json!({"error": "Internal upstream error"}),
        });
        let (mut session, _, _) = loaded_session(provider).await;

        session.edit(SettingsEdit::Volume(0.2)).expect("edit");
        session.save().await;

        assert!(session.field_errors().is_empty());
        assert_eq!(session.general_error(), Some("Internal upstream error"));
    }

    #[tokio::test]
    async fn persistence_warning_still_moves_baseline() {
        let user_id = Uuid::now_v7();
        let store = Arc::new(InMemoryStore {
            fail_upsert: Some(StoreError::Rejected("row level security".to_string())),
            ..InMemoryStore::default()
        });
        let provider = Arc::new(ScriptedProvider::accepting(ProviderMode::Combined));
        let gateway = SyncGateway::new(store, provider).for_user(user_id);
        let mut session = SettingsSession::new(gateway);
        session.load().await;

        session
            .edit(SettingsEdit::Prompt(PROMPT.to_string()))
            .expect("edit");
        let report = session.save().await;

        assert!(matches!(report, SaveReport::SavedWithWarning(_)));
        assert!(!session.is_dirty());
        assert!(session.warning().is_some());
        assert_eq!(session.general_error(), None);
    }

    #[tokio::test]
    async fn unreachable_store_still_moves_baseline_with_warning() {
        let store = Arc::new(InMemoryStore {
            fail_upsert: Some(StoreError::Unavailable("pool timed out".to_string())),
            ..InMemoryStore::default()
        });
        let provider = Arc::new(ScriptedProvider::accepting(ProviderMode::Combined));
        let mut session = SettingsSession::new(user_gateway(store, provider.clone()));
        session.load().await;

        session
            .edit(SettingsEdit::Prompt(PROMPT.to_string()))
            .expect("edit");
        let report = session.save().await;

        assert_eq!(
            report,
            SaveReport::SavedWithWarning(crate::sync::PERSISTENCE_WARNING.to_string())
        );
        assert_eq!(provider.calls(), 1);
        assert!(!session.is_dirty());
        assert_eq!(session.baseline(), session.working());
        assert_eq!(session.warning(), Some(crate::sync::PERSISTENCE_WARNING));
        assert_eq!(session.general_error(), None);
    }

    #[tokio::test]
    async fn network_failure_keeps_edits_for_retry() {
        let mut provider = ScriptedProvider::accepting(ProviderMode::Combined);
        provider.agent = Err(crate::sync::ProviderCallError::Transport(
            "dns error".to_string(),
        ));
        let (mut session, _, _) = loaded_session(provider).await;

        session.edit(SettingsEdit::VoiceTemperature(1.5)).expect("edit");
        let report = session.save().await;

        assert_eq!(report, SaveReport::NetworkError("dns error".to_string()));
        assert_eq!(session.general_error(), Some(NETWORK_ERROR));
        assert!(session.is_dirty());
        assert_eq!(session.working().voice_temperature, 1.5);
    }

    #[tokio::test]
    async fn new_attempt_clears_previous_errors() {
        let mut provider = ScriptedProvider::accepting(ProviderMode::Combined);
        provider.agent = Err(rejected(422, "volume out of range"));
        let (mut session, _, _) = loaded_session(provider).await;

        session.edit(SettingsEdit::Volume(1.9)).expect("edit");
        session.save().await;
        assert_eq!(session.field_errors().len(), 1);

        session
            .edit(SettingsEdit::Prompt("tiny".to_string()))
            .expect("edit");
        session.save().await;
        let keys: Vec<_> = session.field_errors().keys().copied().collect();
        assert_eq!(keys, vec![FieldKey::Setting(SettingsField::Prompt)]);
    }
}
