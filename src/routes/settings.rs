use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult, models::PublicSettings, response::ApiResponse,
    services::settings_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(public_settings))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Public storefront settings", body = ApiResponse<PublicSettings>),
        (status = 404, description = "Settings not configured"),
    ),
    tag = "Settings"
)]
pub async fn public_settings(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PublicSettings>>> {
    let resp = settings_service::public_settings(&state).await?;
    Ok(Json(resp))
}
