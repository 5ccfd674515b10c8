use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use voxdesk_core::sync::AgentProvider;

mod auth;
mod config;
mod error;
mod extract;
mod middleware;
mod provider;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Voxdesk API",
        version = "0.1.0",
        description = "Configure a voice agent's prompt, language, voice and timing, and keep the settings per user."
    ),
    paths(
        routes::health::health_check,
        routes::settings::get_settings,
        routes::settings::put_settings,
        routes::agent::update_agent,
        routes::catalog::get_catalog,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::settings::SettingsSavedResponse,
        voxdesk_core::error::ApiError,
        voxdesk_core::settings::AgentSettings,
        voxdesk_core::settings::NumericConstraint,
        voxdesk_core::settings::PromptConstraint,
        voxdesk_core::sync::ProviderResource,
        voxdesk_core::wire::SubmitResponse,
        voxdesk_core::wire::SettingsResponse,
        voxdesk_core::wire::CatalogResponse,
        voxdesk_core::wire::CatalogOption,
        voxdesk_core::wire::FieldConstraint,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxdesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::ServerConfig::from_env().expect("invalid server configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let provider = match config.retell.clone() {
        Ok(retell) => {
            let provider = provider::RetellProvider::new(retell);
            tracing::info!(mode = ?provider.mode(), "Retell provider configured");
            Ok(Arc::new(provider) as Arc<dyn AgentProvider>)
        }
        Err(missing) => {
            tracing::warn!(missing = %missing, "Retell not configured; agent updates will fail");
            Err(missing)
        }
    };

    let app_state = state::AppState {
        db: pool.clone(),
        identity: Arc::new(auth::PgIdentity::new(pool.clone())),
        store: Arc::new(store::PgSettingsStore::new(pool)),
        provider,
        upstream_timeout: config.upstream_timeout,
    };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::catalog::router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::settings::read_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::settings::write_router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::agent::router().layer(middleware::rate_limit::write_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Voxdesk API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
