// src/models/distributor.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Distributor {
    pub id: Uuid,
    #[schema(example = "Al-Noor Traders")]
    pub name: String,
    pub address: Option<String>,
    #[schema(example = "Lahore")]
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    #[schema(example = "1234567-8")]
    pub ntn_number: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributorContact {
    pub id: Uuid,
    pub distributor_id: Uuid,
    pub name: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

// Vendedor atribuído, exibido no detalhe do distribuidor
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignedStaff {
    pub user_id: Uuid,
    pub full_name: String,
    pub username: String,
    #[schema(value_type = String, format = Date)]
    pub assigned_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributorDetail {
    #[serde(flatten)]
    pub distributor: Distributor,
    pub contacts: Vec<DistributorContact>,
    pub assigned_staff: Vec<AssignedStaff>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributorPayload {
    #[validate(length(min = 1, max = 200, message = "Distributor name is required."))]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub ntn_number: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    #[validate(length(min = 1, message = "Contact name is required."))]
    pub name: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DistributorFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
