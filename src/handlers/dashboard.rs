// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::AdminOnly},
    models::{
        dashboard::{
            DashboardQuery, DashboardStats, SalesTrendEntry, StaffPerformanceEntry,
            StatusBreakdownEntry, TopDistributorEntry, TopProductEntry,
        },
        invoice::InvoiceSummary,
    },
};

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "Dashboard",
    responses((status = 200, description = "Indicadores gerais", body = DashboardStats)),
    security(("api_jwt" = []))
)]
pub async fn get_stats(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.dashboard_service.stats(&user).await?;
    Ok(ApiResponse::ok("Dashboard stats", stats))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/status-breakdown",
    tag = "Dashboard",
    responses((status = 200, description = "Faturas por status", body = [StatusBreakdownEntry])),
    security(("api_jwt" = []))
)]
pub async fn get_status_breakdown(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let rows = app_state.dashboard_service.status_breakdown(&user).await?;
    Ok(ApiResponse::ok("Invoice status breakdown", rows))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/sales-trend",
    tag = "Dashboard",
    params(DashboardQuery),
    responses((status = 200, description = "Vendas e recebimentos por mês", body = [SalesTrendEntry])),
    security(("api_jwt" = []))
)]
pub async fn get_sales_trend(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = app_state
        .dashboard_service
        .sales_trend(&user, query.months())
        .await?;
    Ok(ApiResponse::ok("Sales trend", rows))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/top-products",
    tag = "Dashboard",
    params(DashboardQuery),
    responses((status = 200, description = "Produtos mais vendidos", body = [TopProductEntry])),
    security(("api_jwt" = []))
)]
pub async fn get_top_products(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = app_state
        .dashboard_service
        .top_products(&user, query.limit())
        .await?;
    Ok(ApiResponse::ok("Top products", rows))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/top-distributors",
    tag = "Dashboard",
    params(DashboardQuery),
    responses((status = 200, description = "Distribuidores com maior faturamento", body = [TopDistributorEntry])),
    security(("api_jwt" = []))
)]
pub async fn get_top_distributors(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = app_state
        .dashboard_service
        .top_distributors(&user, query.limit())
        .await?;
    Ok(ApiResponse::ok("Top distributors", rows))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/recent-invoices",
    tag = "Dashboard",
    params(DashboardQuery),
    responses((status = 200, description = "Últimas faturas", body = [InvoiceSummary])),
    security(("api_jwt" = []))
)]
pub async fn get_recent_invoices(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = app_state
        .invoice_service
        .recent(&user, query.limit())
        .await?;
    Ok(ApiResponse::ok("Recent invoices", rows))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/staff-performance",
    tag = "Dashboard",
    responses((status = 200, description = "Desempenho e comissão por vendedor", body = [StaffPerformanceEntry])),
    security(("api_jwt" = []))
)]
pub async fn get_staff_performance(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
) -> Result<impl IntoResponse, AppError> {
    let rows = app_state.dashboard_service.staff_performance().await?;
    Ok(ApiResponse::ok("Staff performance", rows))
}
