// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::{User, UserRole};

// Login aceita username OU e-mail no mesmo campo
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "Username or email is required."))]
    #[schema(example = "admin")]
    pub login: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub current_password: String,

    #[validate(length(min = 6, message = "New password must have at least 6 characters."))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // ID do usuário
    pub role: UserRole,
    pub exp: usize,     // Expiração
    pub iat: usize,     // Emitido em
}
