use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use voxdesk_core::auth::{hash_token, looks_like_api_key};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
#[error("identity lookup failed: {0}")]
pub struct IdentityError(#[from] pub sqlx::Error);

/// Resolves a bearer token to the user it belongs to.
#[async_trait]
pub trait Identity: Send + Sync {
    /// `Ok(None)` for unknown, revoked or expired keys and inactive users.
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, IdentityError>;
}

/// API keys stored as SHA-256 digests in `api_keys`.
pub struct PgIdentity {
    pool: PgPool,
}

impl PgIdentity {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    id: Uuid,
    user_id: Uuid,
    expires_at: Option<chrono::DateTime<Utc>>,
}

#[async_trait]
impl Identity for PgIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, IdentityError> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT ak.id, ak.user_id, ak.expires_at \
             FROM api_keys ak \
             JOIN users u ON u.id = ak.user_id \
             WHERE ak.key_hash = $1 \
               AND ak.is_revoked = FALSE \
               AND u.is_active = TRUE",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if row.expires_at.is_some_and(|expires_at| Utc::now() > expires_at) {
            tracing::debug!(key_id = %row.id, "Rejected expired API key");
            return Ok(None);
        }

        // Fire-and-forget last_used_at update
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let _ = sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
                .bind(row.id)
                .execute(&pool)
                .await;
        });

        Ok(Some(row.user_id))
    }
}

/// Caller identity from the `Authorization: Bearer vox_sk_...` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

fn unauthorized(message: &str) -> AppError {
    AppError::Unauthorized {
        message: message.to_string(),
        docs_hint: Some(
            "Include 'Authorization: Bearer <api key>'. Keys are issued with \
             'voxdesk admin create-key'."
                .to_string(),
        ),
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| unauthorized("Authorization header must use Bearer scheme"))?;
        if !looks_like_api_key(token) {
            return Err(unauthorized("Invalid token format"));
        }

        match state.identity.resolve(token).await {
            Ok(Some(user_id)) => Ok(AuthenticatedUser { user_id }),
            Ok(None) => Err(unauthorized("Invalid or expired API key")),
            Err(err) => Err(AppError::Internal(err.to_string())),
        }
    }
}
