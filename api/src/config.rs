use std::time::Duration;

use voxdesk_core::sync::DEFAULT_UPSTREAM_TIMEOUT;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RETELL_BASE_URL: &str = "https://api.retellai.com";

/// Provider credentials absent from the environment. The server still starts;
/// the agent update endpoint answers 500 until they are set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissingConfig {
    #[error("Missing API key")]
    ApiKey,
    #[error("Missing Agent ID")]
    AgentId,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetellConfig {
    pub api_key: String,
    pub agent_id: String,
    /// Set when the prompt lives on a separate LLM resource.
    pub llm_id: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub upstream_timeout: Duration,
    pub retell: Result<RetellConfig, MissingConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;
        let port = match var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };
        let upstream_timeout = match var("VOXDESK_UPSTREAM_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "VOXDESK_UPSTREAM_TIMEOUT_SECS",
                        value,
                    });
                }
            },
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        let retell = match (var("RETELL_API_KEY"), var("RETELL_AGENT_ID")) {
            (None, _) => Err(MissingConfig::ApiKey),
            (Some(_), None) => Err(MissingConfig::AgentId),
            (Some(api_key), Some(agent_id)) => Ok(RetellConfig {
                api_key,
                agent_id,
                llm_id: var("RETELL_LLM_ID"),
                base_url: var("RETELL_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_RETELL_BASE_URL.to_string()),
            }),
        };

        Ok(Self {
            database_url,
            port,
            upstream_timeout,
            retell,
        })
    }
}
