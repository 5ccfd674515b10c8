use axum::{Json, Router, routing::get};
use voxdesk_core::wire::CatalogResponse;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/catalog", get(get_catalog))
}

/// Supported languages, voices, numeric ranges and defaults
#[utoipa::path(
    get,
    path = "/v1/catalog",
    responses((status = 200, description = "Settings catalog", body = CatalogResponse)),
    tag = "settings"
)]
pub async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse::current())
}
