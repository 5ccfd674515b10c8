//! Retell voice-agent provider over HTTP.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use voxdesk_core::sync::{AgentPatch, AgentProvider, LlmPatch, ProviderCallError, ProviderMode};

use crate::config::RetellConfig;

pub struct RetellProvider {
    client: reqwest::Client,
    config: RetellConfig,
}

impl RetellProvider {
    pub fn new(config: RetellConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn agent_url(&self) -> String {
        format!("{}/update-agent/{}", self.config.base_url, self.config.agent_id)
    }

    fn llm_url(&self) -> Option<String> {
        self.config
            .llm_id
            .as_ref()
            .map(|llm_id| format!("{}/update-retell-llm/{llm_id}", self.config.base_url))
    }

    async fn patch<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<Value, ProviderCallError> {
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderCallError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderCallError::Transport(err.to_string()))?;

        if status.is_success() {
            Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
        } else {
            tracing::debug!(status = status.as_u16(), url, "Retell returned an error");
            Err(ProviderCallError::Rejected {
                status: status.as_u16(),
                payload: error_payload(&text),
            })
        }
    }
}

/// Error bodies that are not JSON objects carry nothing the normalizer can use.
fn error_payload(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Default::default()),
    }
}

#[async_trait]
impl AgentProvider for RetellProvider {
    fn mode(&self) -> ProviderMode {
        if self.config.llm_id.is_some() {
            ProviderMode::Split
        } else {
            ProviderMode::Combined
        }
    }

    async fn update_agent(&self, patch: &AgentPatch) -> Result<Value, ProviderCallError> {
        self.patch(&self.agent_url(), patch).await
    }

    async fn update_llm(&self, patch: &LlmPatch) -> Result<Value, ProviderCallError> {
        let url = self
            .llm_url()
            .ok_or_else(|| ProviderCallError::Transport("no LLM configured".to_string()))?;
        self.patch(&url, patch).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(llm_id: Option<&str>) -> RetellConfig {
        RetellConfig {
            api_key: "key_test".to_string(),
            agent_id: "agent_abc".to_string(),
            llm_id: llm_id.map(str::to_string),
            base_url: "https://api.retellai.com".to_string(),
        }
    }

    #[test]
    fn llm_id_switches_to_split_mode() {
        let combined = RetellProvider::new(config(None));
        assert_eq!(combined.mode(), ProviderMode::Combined);
        assert_eq!(combined.llm_url(), None);

        let split = RetellProvider::new(config(Some("llm_xyz")));
        assert_eq!(split.mode(), ProviderMode::Split);
        assert_eq!(
            split.llm_url().as_deref(),
            Some("https://api.retellai.com/update-retell-llm/llm_xyz")
        );
        assert_eq!(
            split.agent_url(),
            "https://api.retellai.com/update-agent/agent_abc"
        );
    }

    #[test]
    fn error_bodies_are_kept_when_they_are_objects() {
        assert_eq!(
            error_payload(r#"{"message":"voice not found"}"#),
            json!({"message": "voice not found"})
        );
        assert_eq!(error_payload("<html>Bad Gateway</html>"), json!({}));
        assert_eq!(error_payload("\"just a string\""), json!({}));
        assert_eq!(error_payload(""), json!({}));
    }
}
