// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::AdminOnly},
    models::invoice::{
        CreateInvoicePayload, Invoice, InvoiceDetail, InvoiceFilter, UpdateInvoicePayload,
        UpdateStatusPayload,
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkOverdueResult {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    params(InvoiceFilter),
    responses((status = 200, description = "Lista paginada de faturas")),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<InvoiceFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.invoice_service.list(&user, &filter).await?;
    Ok(ApiResponse::ok("Invoices retrieved", page))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com itens e pagamentos", body = InvoiceDetail),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.invoice_service.detail(&user, id).await?;
    Ok(ApiResponse::ok("Invoice retrieved", detail))
}

#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = CreateInvoicePayload,
    responses(
        (status = 201, description = "Fatura criada", body = InvoiceDetail),
        (status = 400, description = "Itens inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let detail = app_state.invoice_service.create(&user, &payload).await?;
    Ok(ApiResponse::created("Invoice created", detail))
}

#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    request_body = UpdateInvoicePayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Rascunho atualizado", body = InvoiceDetail),
        (status = 400, description = "Fatura não está em rascunho")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let detail = app_state.invoice_service.update(&user, id, &payload).await?;
    Ok(ApiResponse::ok("Invoice updated", detail))
}

#[utoipa::path(
    patch,
    path = "/api/invoices/{id}/status",
    tag = "Invoices",
    request_body = UpdateStatusPayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Status alterado", body = Invoice),
        (status = 400, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state
        .invoice_service
        .change_status(&user, id, payload.status)
        .await?;
    Ok(ApiResponse::ok("Invoice status updated", invoice))
}

#[utoipa::path(
    delete,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura cancelada", body = Invoice),
        (status = 400, description = "Fatura com pagamentos não pode ser cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_invoice(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.cancel(&user, id).await?;
    Ok(ApiResponse::ok("Invoice cancelled", invoice))
}

#[utoipa::path(
    post,
    path = "/api/invoices/mark-overdue",
    tag = "Invoices",
    responses((status = 200, description = "Faturas vencidas atualizadas", body = MarkOverdueResult)),
    security(("api_jwt" = []))
)]
pub async fn mark_overdue(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state.invoice_service.mark_overdue().await?;
    Ok(ApiResponse::ok(
        format!("{updated} invoice(s) marked as overdue"),
        MarkOverdueResult { updated },
    ))
}
