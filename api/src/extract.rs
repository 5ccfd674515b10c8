//! `AppJson<T>`: `axum::Json<T>` with rejections turned into structured 400s.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field = field_from_serde_message(&body_text).unwrap_or_else(|| "body".to_string());

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field),
        received: None,
        docs_hint: Some(
            "Send an AgentSettings JSON document; see /swagger-ui for the schema.".to_string(),
        ),
    }
}

const FIELD_MARKERS: [&str; 2] = ["missing field `", "unknown field `"];

fn field_from_serde_message(msg: &str) -> Option<String> {
    FIELD_MARKERS.iter().find_map(|marker| {
        let after = &msg[msg.find(marker)? + marker.len()..];
        let end = after.find('`')?;
        Some(after[..end].to_string())
    })
}
