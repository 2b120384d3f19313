use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    gateway::GatewayError,
    mailer::EmailError,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Payment processor error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Gateway(GatewayError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Email(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::OrmError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to return to the caller. Upstream processor and SMTP details
    /// stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Gateway(GatewayError::SessionNotFound(_)) => self.to_string(),
            AppError::Gateway(_) => "Payment processor error".to_string(),
            AppError::Email(_) => "Email delivery failed".to_string(),
            AppError::Internal(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let error = self.public_message();

        let body = ApiResponse {
            message: error.clone(),
            data: Some(ErrorData { error }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
