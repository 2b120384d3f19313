use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    dto::auth::Claims, entity::AdminUsers, error::AppError, state::AppState,
};

/// A caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// A caller whose user id is on the admin allowlist.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
}

pub async fn ensure_admin(state: &AppState, user: &AuthUser) -> Result<AdminUser, AppError> {
    let row = AdminUsers::find_by_id(user.user_id).one(&state.orm).await?;
    if row.is_none() {
        tracing::warn!(user_id = %user.user_id, "non-admin user rejected");
        return Err(AppError::Forbidden);
    }
    Ok(AdminUser {
        user_id: user.user_id,
    })
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;
    Ok(AuthUser { user_id })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_str = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        decode_token(token, &state.config.jwt_secret)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_admin(state, &user).await
    }
}
