use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Exit codes: 0=success, 1=rejected or invalid input, 2=server error,
/// 3=connection error
pub const EXIT_OK: i32 = 0;
pub const EXIT_REJECTED: i32 = 1;
pub const EXIT_SERVER: i32 = 2;
pub const EXIT_CONNECTION: i32 = 3;

/// Stored credentials for the CLI
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub api_url: String,
    pub api_key: String,
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

pub fn exit_error(message: &str, docs_hint: Option<&str>, code: i32) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
    );
    std::process::exit(code);
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxdesk")
        .join("config.json")
}

pub fn load_credentials() -> Option<StoredCredentials> {
    let data = std::fs::read_to_string(config_path()).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_credentials(creds: &StoredCredentials) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(creds)?;

    // Write with restricted permissions (0o600)
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&path)?;
    file.write_all(data.as_bytes())?;

    Ok(path)
}

/// Resolve the API key (priority order):
/// 1. `--api-key` / VOXDESK_API_KEY
/// 2. stored credentials from `voxdesk login`
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String, String> {
    if let Some(key) = explicit.map(str::trim).filter(|key| !key.is_empty()) {
        return Ok(key.to_string());
    }
    load_credentials()
        .map(|creds| creds.api_key)
        .ok_or_else(|| "No credentials found. Run `voxdesk login` or set VOXDESK_API_KEY.".to_string())
}

/// Send a request, print the JSON body and map the status to an exit code.
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    token: Option<&str>,
) -> i32 {
    let mut req = client().request(method, format!("{api_url}{path}"));
    if let Some(t) = token {
        req = req.bearer_auth(t);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": e.to_string(),
                "docs_hint": "Is the API server running? Check VOXDESK_API_URL."
            });
            eprintln!("{err:#}");
            return EXIT_CONNECTION;
        }
    };

    let status = resp.status().as_u16();
    let body: serde_json::Value = resp
        .json()
        .await
        .unwrap_or_else(|e| json!({"raw_error": format!("Failed to parse response as JSON: {e}")}));

    let code = exit_code_for_status(status);
    if code == EXIT_OK {
        print_json(&body);
    } else {
        eprintln!("{body:#}");
    }
    code
}

pub fn exit_code_for_status(status: u16) -> i32 {
    match status {
        200..=299 => EXIT_OK,
        400..=499 => EXIT_REJECTED,
        _ => EXIT_SERVER,
    }
}

/// Read a file, or stdin when `path` is "-".
pub fn read_text(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
    }
}

// Unix-specific imports for file permissions
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

// No-op on non-unix (won't compile for Windows without this)
#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
