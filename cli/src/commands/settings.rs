use clap::{Args, Subcommand};
use serde_json::{Value, json};
use voxdesk_core::diff::changed_fields;
use voxdesk_core::session::{LoadReport, SaveReport, SettingsGateway, SettingsSession};
use voxdesk_core::settings::{AgentSettings, SettingsEdit};
use voxdesk_core::validate::{validate, validate_catalog};
use voxdesk_core::wire::UPDATE_SUCCESS;

use crate::gateway::HttpGateway;
use crate::util::{
    EXIT_OK, EXIT_REJECTED, EXIT_SERVER, exit_error, print_json, read_text, resolve_api_key,
};

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show the saved agent settings (defaults when nothing is saved yet)
    Show,
    /// Edit settings and push them to the voice agent
    Set(SetArgs),
    /// Check a settings document without contacting the API
    Validate {
        /// JSON file with agent settings, or "-" for stdin
        #[arg(long)]
        file: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// New behavior prompt
    #[arg(long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,
    /// Read the prompt from a file ("-" for stdin)
    #[arg(long)]
    pub prompt_file: Option<String>,
    /// Language code (see `voxdesk catalog`)
    #[arg(long)]
    pub language: Option<String>,
    /// Voice identifier (see `voxdesk catalog`)
    #[arg(long)]
    pub voice: Option<String>,
    #[arg(long)]
    pub voice_speed: Option<f64>,
    #[arg(long)]
    pub responsiveness: Option<f64>,
    #[arg(long)]
    pub interruption_sensitivity: Option<f64>,
    #[arg(long)]
    pub voice_temperature: Option<f64>,
    #[arg(long)]
    pub volume: Option<f64>,
    /// Print the diff and validation result without saving
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(api_url: &str, api_key: Option<&str>, command: SettingsCommands) -> i32 {
    match command {
        SettingsCommands::Show => show(api_url, api_key).await,
        SettingsCommands::Set(args) => set(api_url, api_key, args).await,
        SettingsCommands::Validate { file } => {
            let text = read_text(&file).unwrap_or_else(|e| exit_error(&e, None, EXIT_REJECTED));
            emit(check_document(&text))
        }
    }
}

async fn open_session(api_url: &str, api_key: Option<&str>) -> SettingsSession<HttpGateway> {
    let api_key = resolve_api_key(api_key).unwrap_or_else(|e| exit_error(&e, None, EXIT_REJECTED));
    let mut session = SettingsSession::new(HttpGateway::new(api_url, &api_key));
    if let LoadReport::Failed(detail) = session.load().await {
        let message = session.general_error().unwrap_or("Failed to load settings");
        exit_error(&format!("{message} ({detail})"), None, EXIT_SERVER);
    }
    session
}

async fn show(api_url: &str, api_key: Option<&str>) -> i32 {
    let session = open_session(api_url, api_key).await;
    print_json(&json!({ "settings": session.working() }));
    EXIT_OK
}

async fn set(api_url: &str, api_key: Option<&str>, args: SetArgs) -> i32 {
    let prompt = match &args.prompt_file {
        Some(path) => Some(read_text(path).unwrap_or_else(|e| exit_error(&e, None, EXIT_REJECTED))),
        None => args.prompt.clone(),
    };
    let edits = edits_from(&args, prompt);
    if edits.is_empty() {
        exit_error(
            "Nothing to change",
            Some("Pass at least one setting, e.g. --voice 11labs-Aria"),
            EXIT_REJECTED,
        );
    }

    let mut session = open_session(api_url, api_key).await;
    emit(apply_edits(&mut session, edits, args.dry_run).await)
}

/// Turn the flags into edits, in form order.
fn edits_from(args: &SetArgs, prompt: Option<String>) -> Vec<SettingsEdit> {
    let numeric = [
        args.voice_speed.map(SettingsEdit::VoiceSpeed),
        args.responsiveness.map(SettingsEdit::Responsiveness),
        args.interruption_sensitivity
            .map(SettingsEdit::InterruptionSensitivity),
        args.voice_temperature.map(SettingsEdit::VoiceTemperature),
        args.volume.map(SettingsEdit::Volume),
    ];
    numeric
        .into_iter()
        .flatten()
        .chain(args.language.clone().map(SettingsEdit::Language))
        .chain(args.voice.clone().map(SettingsEdit::VoiceId))
        .chain(prompt.map(SettingsEdit::Prompt))
        .collect()
}

async fn apply_edits<G: SettingsGateway>(
    session: &mut SettingsSession<G>,
    edits: Vec<SettingsEdit>,
    dry_run: bool,
) -> (i32, Value) {
    for edit in edits {
        if let Err(e) = session.edit(edit) {
            return (EXIT_SERVER, json!({ "status": "error", "message": e.to_string() }));
        }
    }

    let changes = diff(session.baseline(), session.working());

    if dry_run {
        let violation = validate(session.working()).or_else(|| validate_catalog(session.working()));
        let code = if violation.is_some() { EXIT_REJECTED } else { EXIT_OK };
        let mut body = json!({ "status": "dry_run", "changes": changes });
        if let Some(violation) = violation {
            body["field"] = json!(violation.field.as_str());
            body["message"] = json!(violation.message);
        }
        return (code, body);
    }

    let (code, mut body) = describe(&session.save().await);
    body["changes"] = changes;
    (code, body)
}

fn diff(before: &AgentSettings, after: &AgentSettings) -> Value {
    changed_fields(before, after)
        .into_iter()
        .map(|field| {
            json!({
                "field": field.as_str(),
                "from": before.display_value(field),
                "to": after.display_value(field),
            })
        })
        .collect()
}

/// Exit code and printable body for a save attempt.
fn describe(report: &SaveReport) -> (i32, Value) {
    match report {
        SaveReport::Saved => (EXIT_OK, json!({ "status": "saved", "message": UPDATE_SUCCESS })),
        SaveReport::SavedWithWarning(warning) => (
            EXIT_OK,
            json!({ "status": "saved", "message": UPDATE_SUCCESS, "warning": warning }),
        ),
        SaveReport::NotDirty => (EXIT_OK, json!({ "status": "unchanged" })),
        SaveReport::Invalid(violation) => (
            EXIT_REJECTED,
            json!({
                "status": "invalid",
                "field": violation.field.as_str(),
                "message": violation.message,
            }),
        ),
        SaveReport::Rejected { status, error } => {
            let code = if *status < 500 { EXIT_REJECTED } else { EXIT_SERVER };
            (
                code,
                json!({
                    "status": "rejected",
                    "http_status": status,
                    "field": error.field.map(|f| f.as_str()),
                    "message": error.message,
                }),
            )
        }
        SaveReport::NetworkError(message) => (
            crate::util::EXIT_CONNECTION,
            json!({ "status": "network_error", "message": message }),
        ),
        SaveReport::NotLoaded => (
            EXIT_SERVER,
            json!({ "status": "error", "message": "Settings were not loaded" }),
        ),
    }
}

/// Offline check of a settings document.
fn check_document(text: &str) -> (i32, Value) {
    let settings: AgentSettings = match serde_json::from_str(text) {
        Ok(s) => s,
        Err(e) => {
            return (
                EXIT_REJECTED,
                json!({ "valid": false, "message": format!("Invalid settings JSON: {e}") }),
            );
        }
    };
    match validate(&settings).or_else(|| validate_catalog(&settings)) {
        None => (EXIT_OK, json!({ "valid": true, "settings": settings })),
        Some(violation) => (
            EXIT_REJECTED,
            json!({
                "valid": false,
                "field": violation.field.as_str(),
                "message": violation.message,
            }),
        ),
    }
}

fn emit((code, body): (i32, Value)) -> i32 {
    if code == EXIT_OK {
        print_json(&body);
    } else {
        eprintln!("{body:#}");
    }
    code
}
