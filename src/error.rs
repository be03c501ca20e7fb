/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - mail / identity provider のエラーを統一的に変換
 *
 * Note
 * - gate の拒否 (401 challenge / login redirect) はここを通さない。
 *   応答形を固定するため middleware::gate が直接組み立てる。
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::identity::IdentityError;
use crate::services::mail::MailError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("not implemented: {feature}")]
    NotImplemented { feature: &'static str },
    #[error("Error sending message.")]
    MailDelivery,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "unauthorized".into(),
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::NotImplemented { feature } => (
                StatusCode::NOT_IMPLEMENTED,
                "NOT_IMPLEMENTED",
                format!("{feature} is not available in this deployment."),
            ),
            AppError::MailDelivery => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MAIL_DELIVERY_FAILED",
                "Error sending message.".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<MailError> for AppError {
    fn from(e: MailError) -> Self {
        tracing::error!(error = %e, "mail delivery failed");
        AppError::MailDelivery
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            // Tokens rejected by the provider: the caller's fault.
            IdentityError::Rejected { status, .. } if (400..500).contains(&status) => {
                AppError::Unauthorized
            }
            other => {
                tracing::error!(error = %other, "identity provider failure");
                AppError::Internal
            }
        }
    }
}
