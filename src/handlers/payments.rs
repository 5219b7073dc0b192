// src/handlers/payments.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::AdminOnly},
    models::{
        invoice::Invoice,
        payment::{CreatePaymentPayload, PaymentFilter, PaymentReceipt, PaymentSummary},
    },
};

#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payments",
    params(PaymentFilter),
    responses((status = 200, description = "Lista paginada de pagamentos")),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<PaymentFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.payment_service.list(&user, &filter).await?;
    Ok(ApiResponse::ok("Payments retrieved", page))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    responses(
        (status = 200, description = "Pagamento", body = PaymentSummary),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payment(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state.payment_service.get(&user, id).await?;
    Ok(ApiResponse::ok("Payment retrieved", payment))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    request_body = CreatePaymentPayload,
    responses(
        (status = 201, description = "Pagamento registrado; fatura atualizada", body = PaymentReceipt),
        (status = 400, description = "Valor acima do saldo ou fatura não aceita pagamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_payment(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let receipt = app_state.payment_service.record(&user, &payload).await?;
    Ok(ApiResponse::created("Payment recorded", receipt))
}

#[utoipa::path(
    delete,
    path = "/api/payments/{id}",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    responses((status = 200, description = "Pagamento excluído; fatura recalculada", body = Invoice)),
    security(("api_jwt" = []))
)]
pub async fn delete_payment(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.payment_service.delete(id).await?;
    Ok(ApiResponse::ok("Payment deleted", invoice))
}
