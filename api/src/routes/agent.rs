use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use voxdesk_core::settings::{AgentSettings, FieldKey};
use voxdesk_core::validate;
use voxdesk_core::wire::SubmitResponse;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

const PROMPT_PREVIEW_CHARS: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/agent/update", post(update_agent))
}

fn respond(status: StatusCode, body: SubmitResponse) -> Response {
    (status, Json(body)).into_response()
}

fn preview(prompt: &str) -> String {
    prompt.trim().chars().take(PROMPT_PREVIEW_CHARS).collect()
}

/// Push settings to the voice agent, then save them
///
/// Every outcome answers with the same envelope. Provider rejections keep the
/// provider's status code and carry the raw payload in `details`; a `warning`
/// on a 200 means the agent changed but the settings were not persisted.
#[utoipa::path(
    post,
    path = "/v1/agent/update",
    request_body = AgentSettings,
    responses(
        (status = 200, description = "Agent updated", body = SubmitResponse),
        (status = 400, description = "Settings failed validation", body = SubmitResponse),
        (status = 401, description = "Unauthorized", body = SubmitResponse),
        (status = 500, description = "Configuration missing or provider unreachable", body = SubmitResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "agent"
)]
pub async fn update_agent(
    State(state): State<AppState>,
    auth: Result<AuthenticatedUser, AppError>,
    body: Result<AppJson<AgentSettings>, AppError>,
) -> Response {
    let user = match auth {
        Ok(user) => user,
        Err(AppError::Unauthorized { .. }) => {
            return respond(
                StatusCode::UNAUTHORIZED,
                SubmitResponse::refused("Unauthorized", Some(FieldKey::Auth)),
            );
        }
        Err(other) => return other.into_response(),
    };

    let gateway = match state.gateway() {
        Ok(gateway) => gateway,
        Err(missing) => {
            tracing::error!(user_id = %user.user_id, missing = %missing, "Retell credentials not configured");
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                SubmitResponse::refused(format!("Server configuration error: {missing}"), None),
            );
        }
    };

    let settings = match body {
        Ok(AppJson(settings)) => settings,
        Err(AppError::Validation { message, field, .. }) => {
            return respond(
                StatusCode::BAD_REQUEST,
                SubmitResponse::refused(message, field.and_then(|f| f.parse().ok())),
            );
        }
        Err(other) => return other.into_response(),
    };

    if let Some(violation) =
        validate::validate(&settings).or_else(|| validate::validate_catalog(&settings))
    {
        tracing::info!(
            user_id = %user.user_id,
            field = %violation.field,
            "Agent update rejected by validation"
        );
        return respond(
            StatusCode::BAD_REQUEST,
            SubmitResponse::refused(violation.message, Some(violation.field.into())),
        );
    }

    tracing::info!(
        user_id = %user.user_id,
        language = %settings.language,
        voice_id = %settings.voice_id,
        prompt_len = settings.prompt.trim().chars().count(),
        prompt_preview = %preview(&settings.prompt),
        "Updating agent"
    );

    let outcome = gateway.save(user.user_id, &settings).await;
    let (status, body) = SubmitResponse::from_outcome(outcome, &settings);
    respond(
        StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
        body,
    )
}
