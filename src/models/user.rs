// src/models/user.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_percentage;

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    SalesStaff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::SalesStaff => "sales_staff",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "ahmed.k")]
    pub username: String,
    #[schema(example = "ahmed@example.com")]
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    #[schema(example = "Ahmed Khan")]
    pub full_name: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub address: Option<String>,
    #[schema(example = "2.50")]
    pub commission_rate: Decimal,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 3, max = 50, message = "Username must have 3 to 50 characters."))]
    pub username: String,

    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,

    pub role: UserRole,

    #[validate(length(min = 1, message = "Full name is required."))]
    pub full_name: String,

    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub address: Option<String>,

    #[validate(custom(function = "validate_percentage"))]
    pub commission_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    #[validate(length(min = 1, message = "Full name cannot be empty."))]
    pub full_name: Option<String>,

    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub address: Option<String>,

    #[validate(custom(function = "validate_percentage"))]
    pub commission_rate: Option<Decimal>,

    pub is_active: Option<bool>,

    // Admin pode redefinir a senha de outro usuário
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- Atribuição de distribuidores a vendedores ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributorAssignment {
    pub id: Uuid,
    pub sales_staff_id: Uuid,
    pub distributor_id: Uuid,
    pub distributor_name: String,
    pub is_active: bool,
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub assigned_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignDistributorsPayload {
    #[validate(length(min = 1, message = "Select at least one distributor."))]
    pub distributor_ids: Vec<Uuid>,
}
