use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{Claims, LoginRequest, LoginResponse},
    entity::{
        AdminUsers,
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
};

pub const TOKEN_TTL_HOURS: i64 = 24;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn issue_token(user_id: Uuid, secret: &str) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::internal("Failed to set expiration"))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::internal("Invalid password hash"))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let token = issue_token(user.id, &state.config.jwt_secret)?;
    let is_admin = AdminUsers::find_by_id(user.id)
        .one(&state.orm)
        .await?
        .is_some();

    audit::record(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::ok("Logged in", LoginResponse { token, is_admin }))
}
