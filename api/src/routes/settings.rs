use axum::extract::State;
use axum::{
    Json, Router,
    routing::{get, put},
};
use serde::Serialize;
use voxdesk_core::settings::AgentSettings;
use voxdesk_core::sync::{StoreError, load_stored};
use voxdesk_core::validate;
use voxdesk_core::wire::SettingsResponse;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Reads and writes are separate routers so each gets its own rate limit.
pub fn read_router() -> Router<AppState> {
    Router::new().route("/v1/settings", get(get_settings))
}

pub fn write_router() -> Router<AppState> {
    Router::new().route("/v1/settings", put(put_settings))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SettingsSavedResponse {
    pub success: bool,
}

/// Load the caller's saved agent settings
///
/// `settings` is `null` for a user who has never saved; clients then start
/// from the defaults listed at `GET /v1/catalog`.
#[utoipa::path(
    get,
    path = "/v1/settings",
    responses(
        (status = 200, description = "Saved settings, or null", body = SettingsResponse),
        (status = 401, description = "Unauthorized", body = voxdesk_core::error::ApiError),
        (status = 500, description = "Store unavailable", body = voxdesk_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "settings"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<SettingsResponse>, AppError> {
    let stored = load_stored(state.store.as_ref(), auth.user_id, state.upstream_timeout).await?;

    Ok(Json(match stored {
        Some(stored) => SettingsResponse {
            settings: Some(stored.settings),
            updated_at: Some(stored.updated_at),
        },
        None => SettingsResponse {
            settings: None,
            updated_at: None,
        },
    }))
}

/// Save settings without pushing them to the voice agent
#[utoipa::path(
    put,
    path = "/v1/settings",
    request_body = AgentSettings,
    responses(
        (status = 200, description = "Settings saved", body = SettingsSavedResponse),
        (status = 400, description = "Validation failed", body = voxdesk_core::error::ApiError),
        (status = 401, description = "Unauthorized", body = voxdesk_core::error::ApiError),
        (status = 500, description = "Store unavailable", body = voxdesk_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "settings"
)]
pub async fn put_settings(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    AppJson(settings): AppJson<AgentSettings>,
) -> Result<Json<SettingsSavedResponse>, AppError> {
    if let Some(violation) =
        validate::validate(&settings).or_else(|| validate::validate_catalog(&settings))
    {
        return Err(AppError::from_violation(violation, &settings));
    }

    let timeout = state.upstream_timeout;
    tokio::time::timeout(timeout, state.store.upsert(auth.user_id, &settings))
        .await
        .unwrap_or_else(|_| {
            Err(StoreError::Unavailable(format!(
                "no answer within {}s",
                timeout.as_secs()
            )))
        })?;

    tracing::info!(user_id = %auth.user_id, "Settings saved without provider update");
    Ok(Json(SettingsSavedResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use voxdesk_core::sync::StoreError;

    use super::*;
    use crate::testing::{body_json, json_request, test_state, valid_settings};

    fn router() -> Router<AppState> {
        read_router().merge(write_router())
    }

    #[tokio::test]
    async fn reads_and_writes_are_routed_separately() {
        let (state, _) = test_state(None);
        let response = read_router()
            .with_state(state)
            .oneshot(json_request("PUT", "/v1/settings", Some(valid_settings())))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let (state, _) = test_state(None);
        let response = write_router()
            .with_state(state)
            .oneshot(json_request("GET", "/v1/settings", None))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn new_user_gets_null_settings() {
        let (state, _) = test_state(None);
        let response = router()
            .with_state(state)
            .oneshot(json_request("GET", "/v1/settings", None))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["settings"].is_null());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (state, fixture) = test_state(None);
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/v1/settings", Some(valid_settings())))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(fixture.store.rows.lock().unwrap().contains_key(&fixture.user_id));

        let response = app
            .oneshot(json_request("GET", "/v1/settings", None))
            .await
            .expect("request should succeed");
        let body = body_json(response).await;
        assert_eq!(body["settings"]["voice_id"], "11labs-Aria");
        assert!(body["updated_at"].is_string());
    }

    #[tokio::test]
    async fn out_of_range_put_is_400_with_field() {
        let (state, fixture) = test_state(None);
        let mut settings = valid_settings();
        settings["volume"] = json!(2.5);

        let response = router()
            .with_state(state)
            .oneshot(json_request("PUT", "/v1/settings", Some(settings)))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["field"], "volume");
        assert_eq!(body["message"], "Volume must be between 0 and 2");
        assert_eq!(body["received"], 2.5);
        assert!(fixture.store.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_voice_is_rejected_before_saving() {
        let (state, _) = test_state(None);
        let mut settings = valid_settings();
        settings["voice_id"] = json!("11labs-Ghost");

        let response = router()
            .with_state(state)
            .oneshot(json_request("PUT", "/v1/settings", Some(settings)))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["field"], "voice_id");
        assert_eq!(body["received"], "11labs-Ghost");
    }

    #[tokio::test]
    async fn store_outage_is_500() {
        let (state, fixture) = test_state(None);
        *fixture.store.fail_load.lock().unwrap() =
            Some(StoreError::Unavailable("connection refused".to_string()));

        let response = router()
            .with_state(state)
            .oneshot(json_request("GET", "/v1/settings", None))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "store_unavailable");
    }
}
