// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid username/email or password")]
    InvalidCredentials,

    #[error("Invalid or missing authentication token")]
    InvalidToken,

    #[error("Account is deactivated")]
    InactiveAccount,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Email is already in use")]
    EmailAlreadyExists,

    #[error("Username is already in use")]
    UsernameAlreadyExists,

    #[error("{0}")]
    UniqueConstraintViolation(String),

    // Quando a fonte do PDF não está na pasta configurada
    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InactiveAccount | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::EmailAlreadyExists
            | AppError::UsernameAlreadyExists
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Converte violações de UNIQUE em `AppError::UniqueConstraintViolation`
/// com a mensagem informada; qualquer outro erro segue como erro de banco.
pub fn map_unique_violation(e: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(message.into());
        }
    }
    e.into()
}

/// Converte violações de chave estrangeira em `AppError::Conflict`
pub fn map_foreign_key_violation(e: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return AppError::Conflict(message.into());
        }
    }
    e.into()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Retorna todos os detalhes da validação, campo a campo
        if let AppError::ValidationError(errors) = &self {
            let mut details: HashMap<String, Vec<String>> = HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "success": false,
                "message": "One or more fields are invalid.",
                "errors": details,
            }));
            return (status, body).into_response();
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe fica no log, o cliente recebe mensagem genérica
            tracing::error!("🔥 Internal server error: {:?}", self);
            "An unexpected error occurred.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "success": false, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use validator::{ValidationError, ValidationErrors};

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_renders_envelope() {
        let response = AppError::NotFound("Invoice").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invoice not found");
    }

    #[tokio::test]
    async fn validation_errors_are_listed_per_field() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("Username is required.".into());
        errors.add("username", err);

        let response = AppError::ValidationError(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["errors"]["username"][0], "Username is required.");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response =
            AppError::InternalServerError(anyhow::anyhow!("connection reset")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "An unexpected error occurred.");
    }

    #[test]
    fn conflict_variants_map_to_409() {
        assert_eq!(AppError::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Conflict("Product is referenced by invoices".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::InactiveAccount.status_code(), StatusCode::FORBIDDEN);
    }
}
