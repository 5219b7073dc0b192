// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::invoice::InvoiceStatus;

// 1. Cards do topo
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_invoices: i64,
    pub total_sales: Decimal,       // Faturas emitidas (exceto rascunho/canceladas)
    pub total_collected: Decimal,
    pub outstanding_amount: Decimal,
    pub overdue_count: i64,
    pub overdue_amount: Decimal,
    pub month_sales: Decimal,
    pub month_collections: Decimal,
    pub active_distributors: i64,
    pub active_products: i64,
}

// 2. Quantidade e valor por status
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdownEntry {
    pub status: InvoiceStatus,
    pub count: i64,
    pub total_amount: Decimal,
}

// 3. Gráfico mensal de vendas x recebimentos
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesTrendEntry {
    #[schema(example = "2025-01")]
    pub month: String,
    pub invoice_count: i64,
    pub sales: Decimal,
    pub collections: Decimal,
}

// 4. Produtos mais vendidos (em valor)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProductEntry {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_code: String,
    pub total_quantity: Decimal,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopDistributorEntry {
    pub distributor_id: Uuid,
    pub distributor_name: String,
    pub invoice_count: i64,
    pub total_sales: Decimal,
    pub total_paid: Decimal,
    pub outstanding: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformanceEntry {
    pub user_id: Uuid,
    pub full_name: String,
    pub commission_rate: Decimal,
    pub assigned_distributors: i64,
    pub invoice_count: i64,
    pub total_sales: Decimal,
    pub total_collected: Decimal,
    // collected × commission_rate / 100, calculado no serviço
    #[sqlx(skip)]
    pub commission_earned: Decimal,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    pub limit: Option<i64>,
    pub months: Option<i64>,
}

impl DashboardQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(5).clamp(1, 50)
    }

    pub fn months(&self) -> i64 {
        self.months.unwrap_or(6).clamp(1, 24)
    }
}
