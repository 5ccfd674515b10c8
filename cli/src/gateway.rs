//! The settings session driven against the Voxdesk API over HTTP.

use async_trait::async_trait;
use voxdesk_core::error::ApiError;
use voxdesk_core::session::{GatewayError, SettingsGateway};
use voxdesk_core::settings::AgentSettings;
use voxdesk_core::sync::SaveOutcome;
use voxdesk_core::wire::{SettingsResponse, SubmitResponse};

use crate::util::client;

pub struct HttpGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: client(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|err| err.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

/// Map an agent-update response onto a gateway outcome.
fn submit_outcome(status: u16, body: &str) -> SaveOutcome {
    match serde_json::from_str::<SubmitResponse>(body) {
        Ok(response) => response.into_outcome(status),
        Err(_) => SaveOutcome::Refused {
            status,
            message: format!("Unexpected response from server: {}", error_message(body)),
            field: None,
        },
    }
}

#[async_trait]
impl SettingsGateway for HttpGateway {
    async fn load(&self) -> Result<Option<AgentSettings>, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/v1/settings", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        match status {
            200..=299 => serde_json::from_str::<SettingsResponse>(&body)
                .map(|parsed| parsed.settings)
                .map_err(|e| GatewayError::Server {
                    status,
                    message: format!("Malformed settings response: {e}"),
                }),
            401 => Err(GatewayError::Unauthorized),
            _ => Err(GatewayError::Server {
                status,
                message: error_message(&body),
            }),
        }
    }

    async fn save(&self, settings: &AgentSettings) -> SaveOutcome {
        let sent = self
            .client
            .post(format!("{}/v1/agent/update", self.api_url))
            .bearer_auth(&self.api_key)
            .json(settings)
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(error = %e, "Agent update request failed");
                return SaveOutcome::NetworkFailure {
                    message: e.to_string(),
                };
            }
        };

        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(body) => submit_outcome(status, &body),
            Err(e) => SaveOutcome::NetworkFailure {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use voxdesk_core::settings::FieldKey;
    use voxdesk_core::sync::ProviderResource;

    use super::*;

    #[test]
    fn provider_failures_are_rebuilt_from_details() {
        let body = json!({
            "success": false,
            "error": "Voice \"11labs-Ghost\" is not available. Please select a different voice.",
            "field": "voice_id",
            "details": {"message": "voice_id 11labs-Ghost not found"},
            "resource": "agent"
        })
        .to_string();

        match submit_outcome(404, &body) {
            SaveOutcome::ProviderFailure {
                status,
                payload,
                resource,
            } => {
                assert_eq!(status, 404);
                assert_eq!(payload["message"], "voice_id 11labs-Ghost not found");
                assert_eq!(resource, ProviderResource::Agent);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn unauthorized_envelope_is_a_refusal() {
        let body = json!({"success": false, "error": "Unauthorized", "field": "auth"}).to_string();
        assert_eq!(
            submit_outcome(401, &body),
            SaveOutcome::Refused {
                status: 401,
                message: "Unauthorized".to_string(),
                field: Some(FieldKey::Auth),
            }
        );
    }

    #[test]
    fn non_json_answers_are_refusals() {
        let outcome = submit_outcome(502, "<html>Bad Gateway</html>");
        assert!(matches!(outcome, SaveOutcome::Refused { status: 502, .. }));
    }

    #[test]
    fn api_error_bodies_yield_their_message() {
        let body = json!({
            "error": "rate_limited",
            "message": "Too many requests. Retry after 3 seconds.",
            "request_id": "0190"
        })
        .to_string();
        assert_eq!(error_message(&body), "Too many requests. Retry after 3 seconds.");
    }
}
