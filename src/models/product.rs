// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{validate_percentage, validate_price};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "Cooking Oil 5L")]
    pub name: String,
    #[schema(example = "CO-5L")]
    pub code: String,
    pub description: Option<String>,
    #[schema(example = "2450.00")]
    pub price: Decimal,
    #[schema(example = "carton")]
    pub unit_of_measure: String,
    // Texto livre; casa com categories.name
    pub category: Option<String>,
    #[schema(example = "17.00")]
    pub tax_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 200, message = "Product name is required."))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Product code is required."))]
    pub code: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,

    pub unit_of_measure: Option<String>,
    pub category: Option<String>,

    #[validate(custom(function = "validate_percentage"))]
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, max = 200, message = "Product name cannot be empty."))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Product code cannot be empty."))]
    pub code: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,

    pub unit_of_measure: Option<String>,
    pub category: Option<String>,

    #[validate(custom(function = "validate_percentage"))]
    pub tax_rate: Option<Decimal>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- Categorias ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Edible Oils")]
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "Category name is required."))]
    pub name: String,
    pub description: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "Category name cannot be empty."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}
