use clap::Subcommand;
use serde_json::json;
use sqlx::PgPool;

use crate::util::{EXIT_CONNECTION, EXIT_OK, EXIT_REJECTED, EXIT_SERVER, exit_error, print_json};

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create a new user (requires DATABASE_URL)
    CreateUser {
        /// User email
        #[arg(long)]
        email: String,
    },
    /// Create an API key for a user (requires DATABASE_URL)
    CreateKey {
        /// User UUID
        #[arg(long)]
        user_id: String,
        /// Human-readable label (e.g. "front-desk-laptop")
        #[arg(long, default_value = "cli")]
        label: String,
        /// Expiration in days (default: never)
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
}

pub async fn run(command: AdminCommands) -> i32 {
    match command {
        AdminCommands::CreateUser { email } => create_user(&email).await,
        AdminCommands::CreateKey {
            user_id,
            label,
            expires_in_days,
        } => create_key(&user_id, &label, expires_in_days).await,
    }
}

async fn connect() -> PgPool {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => exit_error(
            "DATABASE_URL must be set for admin commands",
            Some("Admin commands connect directly to the database for bootstrapping"),
            EXIT_REJECTED,
        ),
    };

    match sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => exit_error(
            &format!("Failed to connect to database: {e}"),
            None,
            EXIT_CONNECTION,
        ),
    }
}

async fn create_user(email: &str) -> i32 {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        exit_error(&format!("Invalid email: {email}"), None, EXIT_REJECTED);
    }

    let pool = connect().await;
    let user_id = uuid::Uuid::now_v7();

    if let Err(e) = sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(user_id)
        .bind(&email)
        .execute(&pool)
        .await
    {
        exit_error(&format!("Failed to create user: {e}"), None, EXIT_SERVER);
    }

    print_json(&json!({
        "user_id": user_id,
        "email": email
    }));
    EXIT_OK
}

async fn create_key(user_id: &str, label: &str, expires_in_days: Option<i64>) -> i32 {
    let user_id = match uuid::Uuid::parse_str(user_id) {
        Ok(u) => u,
        Err(e) => exit_error(&format!("Invalid user UUID: {e}"), None, EXIT_REJECTED),
    };
    if matches!(expires_in_days, Some(days) if days <= 0) {
        exit_error("--expires-in-days must be positive", None, EXIT_REJECTED);
    }

    let pool = connect().await;

    let (full_key, key_hash) = voxdesk_core::auth::generate_api_key();
    let prefix = voxdesk_core::auth::key_prefix(&full_key);
    let key_id = uuid::Uuid::now_v7();
    let expires_at = expires_in_days.map(|d| chrono::Utc::now() + chrono::Duration::days(d));

    if let Err(e) = sqlx::query(
        "INSERT INTO api_keys (id, user_id, key_hash, key_prefix, label, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(key_id)
    .bind(user_id)
    .bind(&key_hash)
    .bind(&prefix)
    .bind(label)
    .bind(expires_at)
    .execute(&pool)
    .await
    {
        exit_error(&format!("Failed to create API key: {e}"), None, EXIT_SERVER);
    }

    print_json(&json!({
        "key_id": key_id,
        "api_key": full_key,
        "key_prefix": prefix,
        "label": label,
        "expires_at": expires_at,
        "warning": "Store this key securely. It will NOT be shown again."
    }));
    EXIT_OK
}
