mod commands;
mod gateway;
mod util;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::admin::AdminCommands;
use commands::settings::SettingsCommands;

#[derive(Parser)]
#[command(name = "voxdesk", version, about = "Voxdesk CLI: configure your voice receptionist agent")]
struct Cli {
    /// API base URL
    #[arg(long, env = "VOXDESK_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key (falls back to the credentials stored by `voxdesk login`)
    #[arg(long, env = "VOXDESK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Verify an API key and store it for later commands
    Login {
        #[arg(long)]
        api_key: String,
    },
    /// Remove stored credentials
    Logout,
    /// List supported languages, voices and setting ranges
    Catalog,
    /// Agent settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Bootstrap users and API keys (requires DATABASE_URL)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api_url = cli.api_url.trim_end_matches('/').to_string();

    let code = match cli.command {
        Commands::Health => commands::health::run(&api_url).await,
        Commands::Login { api_key } => commands::auth::login(&api_url, &api_key).await,
        Commands::Logout => commands::auth::logout(),
        Commands::Catalog => commands::catalog::run(),
        Commands::Settings { command } => {
            commands::settings::run(&api_url, cli.api_key.as_deref(), command).await
        }
        Commands::Admin { command } => commands::admin::run(command).await,
    };

    std::process::exit(code);
}
