//! JSON bodies shared by the API and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::normalize;
use crate::settings::{self, AgentSettings, FieldKey, NumericConstraint, PromptConstraint};
use crate::sync::{ProviderResource, SaveOutcome};

pub const UPDATE_SUCCESS: &str = "Agent configuration updated successfully";

/// Envelope returned by `POST /v1/agent/update`, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// User-facing error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Field the error is attributed to (`voice_id`, `prompt`, `auth`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Raw provider error payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Provider resource that rejected the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ProviderResource>,
    /// Set when the agent was updated but the settings were not persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Transport failure; resubmitting may succeed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SubmitResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            field: None,
            details: None,
            resource: None,
            warning: None,
            retryable: false,
            data: None,
        }
    }

    /// Refusal before the provider was contacted.
    pub fn refused(error: impl Into<String>, field: Option<FieldKey>) -> Self {
        Self {
            field: field.map(|key| key.to_string()),
            ..Self::failure(error)
        }
    }

    /// Status code and body for a gateway outcome. `submitted` are the settings
    /// that were sent; provider errors are normalized against them.
    pub fn from_outcome(outcome: SaveOutcome, submitted: &AgentSettings) -> (u16, Self) {
        match outcome {
            SaveOutcome::Success { data } => (
                200,
                Self {
                    success: true,
                    message: Some(UPDATE_SUCCESS.to_string()),
                    error: None,
                    data: Some(data),
                    ..Self::failure("")
                },
            ),
            SaveOutcome::PersistedWithWarning { data, warning } => (
                200,
                Self {
                    success: true,
                    message: Some(UPDATE_SUCCESS.to_string()),
                    error: None,
                    warning: Some(warning),
                    data: Some(data),
                    ..Self::failure("")
                },
            ),
            SaveOutcome::ProviderFailure {
                status,
                payload,
                resource,
            } => {
                let normalized = normalize::normalize_for_resource(&payload, submitted, resource);
                (
                    status,
                    Self {
                        field: normalized.field.map(|key| key.to_string()),
                        details: Some(payload),
                        resource: Some(resource),
                        ..Self::failure(normalized.message)
                    },
                )
            }
            SaveOutcome::NetworkFailure { message } => (
                500,
                Self {
                    retryable: true,
                    ..Self::failure(message)
                },
            ),
            SaveOutcome::Refused {
                status,
                message,
                field,
            } => (status, Self::refused(message, field)),
        }
    }

    /// Rebuild the gateway outcome on the client side. Provider failures are
    /// rebuilt from the raw payload so they normalize the same way locally.
    pub fn into_outcome(self, status: u16) -> SaveOutcome {
        if self.success {
            let data = self.data.unwrap_or(Value::Null);
            return match self.warning {
                Some(warning) => SaveOutcome::PersistedWithWarning { data, warning },
                None => SaveOutcome::Success { data },
            };
        }

        let message = self
            .error
            .unwrap_or_else(|| normalize::GENERIC_FAILURE.to_string());
        if let Some(resource) = self.resource {
            let payload = self
                .details
                .unwrap_or_else(|| json!({ "message": message }));
            return SaveOutcome::ProviderFailure {
                status,
                payload,
                resource,
            };
        }
        if self.retryable {
            return SaveOutcome::NetworkFailure { message };
        }
        SaveOutcome::Refused {
            status,
            message,
            field: self.field.and_then(|field| field.parse().ok()),
        }
    }
}

/// `GET /v1/settings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettingsResponse {
    /// `null` when nothing was saved yet
    pub settings: Option<AgentSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldConstraint {
    pub field: String,
    pub label: String,
    #[serde(flatten)]
    pub constraint: NumericConstraint,
}

/// `GET /v1/catalog`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogResponse {
    pub languages: Vec<CatalogOption>,
    pub voices: Vec<CatalogOption>,
    pub numeric: Vec<FieldConstraint>,
    pub prompt: PromptConstraint,
    pub defaults: AgentSettings,
}

impl CatalogResponse {
    pub fn current() -> Self {
        let options = |entries: &[settings::CatalogEntry]| {
            entries
                .iter()
                .map(|entry| CatalogOption {
                    value: entry.value.to_string(),
                    label: entry.label.to_string(),
                })
                .collect()
        };
        Self {
            languages: options(settings::LANGUAGES),
            voices: options(settings::VOICES),
            numeric: settings::SettingsField::ALL
                .into_iter()
                .filter_map(|field| {
                    field.constraint().map(|constraint| FieldConstraint {
                        field: field.as_str().to_string(),
                        label: field.label().to_string(),
                        constraint,
                    })
                })
                .collect(),
            prompt: settings::PROMPT,
            defaults: AgentSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsField;

    fn submitted() -> AgentSettings {
        AgentSettings {
            voice_id: "11labs-Ghost".to_string(),
            prompt: "Take messages for the front desk.".to_string(),
            ..AgentSettings::default()
        }
    }

    fn over_the_wire(outcome: SaveOutcome) -> (u16, SubmitResponse) {
        let (status, body) = SubmitResponse::from_outcome(outcome, &submitted());
        let text = serde_json::to_string(&body).expect("serializes");
        (status, serde_json::from_str(&text).expect("deserializes"))
    }

    #[test]
    fn provider_failure_keeps_upstream_status_and_field() {
        let payload = json!({"message": "voice_id 11labs-Ghost not found"});
        let (status, body) = over_the_wire(SaveOutcome::ProviderFailure {
            status: 404,
            payload: payload.clone(),
            resource: ProviderResource::Agent,
        });

        assert_eq!(status, 404);
        assert!(!body.success);
        assert_eq!(body.field.as_deref(), Some("voice_id"));
        assert!(body.error.as_deref().unwrap_or_default().contains("11labs-Ghost"));

        assert_eq!(
            body.into_outcome(status),
            SaveOutcome::ProviderFailure {
                status: 404,
                payload,
                resource: ProviderResource::Agent,
            }
        );
    }

    #[test]
    fn warning_survives_the_trip() {
        let (status, body) = over_the_wire(SaveOutcome::PersistedWithWarning {
            data: json!({"agent_id": "a"}),
            warning: "not persisted".to_string(),
        });
        assert_eq!(status, 200);
        assert!(body.success);
        assert!(matches!(
            body.into_outcome(status),
            SaveOutcome::PersistedWithWarning { .. }
        ));
    }

    #[test]
    fn network_failure_is_500_and_retryable() {
        let (status, body) = over_the_wire(SaveOutcome::NetworkFailure {
            message: "connection reset".to_string(),
        });
        assert_eq!(status, 500);
        assert!(body.retryable);
        assert!(matches!(
            body.into_outcome(status),
            SaveOutcome::NetworkFailure { .. }
        ));
    }

    #[test]
    fn refusal_keeps_field_attribution() {
        let body = SubmitResponse::refused(
            "Prompt must be at least 10 characters",
            Some(SettingsField::Prompt.into()),
        );
        let json = serde_json::to_value(&body).expect("serializes");
        assert_eq!(json["field"], "prompt");
        assert!(json.get("retryable").is_none());

        assert_eq!(
            body.into_outcome(400),
            SaveOutcome::Refused {
                status: 400,
                message: "Prompt must be at least 10 characters".to_string(),
                field: Some(SettingsField::Prompt.into()),
            }
        );
    }

    #[test]
    fn catalog_lists_every_numeric_field() {
        let catalog = CatalogResponse::current();
        assert_eq!(catalog.numeric.len(), 5);
        assert_eq!(catalog.languages.len(), 15);
        let json = serde_json::to_value(&catalog).expect("serializes");
        assert_eq!(json["numeric"][0]["field"], "voice_speed");
        assert_eq!(json["numeric"][0]["min"], 0.5);
    }
}
