use serde_json::json;
use voxdesk_core::auth::{key_prefix, looks_like_api_key};
use voxdesk_core::session::{GatewayError, SettingsGateway};

use crate::gateway::HttpGateway;
use crate::util::{
    EXIT_CONNECTION, EXIT_OK, EXIT_REJECTED, EXIT_SERVER, StoredCredentials, config_path,
    exit_error, print_json, save_credentials,
};

/// Check the key against the API, then store it.
pub async fn login(api_url: &str, api_key: &str) -> i32 {
    let api_key = api_key.trim();
    if !looks_like_api_key(api_key) {
        exit_error(
            "That does not look like a Voxdesk API key",
            Some("Keys start with 'vox_sk_' followed by 64 hex characters."),
            EXIT_REJECTED,
        );
    }

    if let Err(err) = HttpGateway::new(api_url, api_key).load().await {
        let code = match err {
            GatewayError::Unauthorized => EXIT_REJECTED,
            GatewayError::Transport(_) => EXIT_CONNECTION,
            GatewayError::Store(_) | GatewayError::Server { .. } => EXIT_SERVER,
        };
        exit_error(&format!("Login failed: {err}"), None, code);
    }

    let creds = StoredCredentials {
        api_url: api_url.to_string(),
        api_key: api_key.to_string(),
    };
    match save_credentials(&creds) {
        Ok(path) => {
            print_json(&json!({
                "status": "authenticated",
                "key_prefix": key_prefix(api_key),
                "config_path": path.to_string_lossy()
            }));
            EXIT_OK
        }
        Err(e) => exit_error(&format!("Failed to store credentials: {e}"), None, EXIT_SERVER),
    }
}

pub fn logout() -> i32 {
    let path = config_path();
    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            exit_error(&format!("Failed to remove credentials: {e}"), None, EXIT_SERVER);
        }
    }
    print_json(&json!({
        "status": "logged_out",
        "config_path": path.to_string_lossy()
    }));
    EXIT_OK
}
