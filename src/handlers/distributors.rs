// src/handlers/distributors.rs

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
    models::distributor::{
        ContactPayload, Distributor, DistributorContact, DistributorDetail, DistributorFilter,
        DistributorPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/distributors",
    tag = "Distributors",
    params(DistributorFilter),
    responses((status = 200, description = "Lista paginada (vendedor vê só os seus)")),
    security(("api_jwt" = []))
)]
pub async fn list_distributors(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<DistributorFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.distributor_service.list(&user, &filter).await?;
    Ok(ApiResponse::ok("Distributors retrieved", page))
}

#[utoipa::path(
    get,
    path = "/api/distributors/{id}",
    tag = "Distributors",
    params(("id" = Uuid, Path, description = "ID do distribuidor")),
    responses(
        (status = 200, description = "Distribuidor com contatos e vendedores", body = DistributorDetail),
        (status = 403, description = "Fora da carteira do vendedor"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_distributor(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.distributor_service.detail(&user, id).await?;
    Ok(ApiResponse::ok("Distributor retrieved", detail))
}

#[utoipa::path(
    post,
    path = "/api/distributors",
    tag = "Distributors",
    request_body = DistributorPayload,
    responses((status = 201, description = "Distribuidor criado", body = Distributor)),
    security(("api_jwt" = []))
)]
pub async fn create_distributor(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: AdminOnly,
    Json(payload): Json<DistributorPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let distributor = app_state.distributor_service.create(&user, &payload).await?;
    Ok(ApiResponse::created("Distributor created", distributor))
}

#[utoipa::path(
    put,
    path = "/api/distributors/{id}",
    tag = "Distributors",
    request_body = DistributorPayload,
    params(("id" = Uuid, Path, description = "ID do distribuidor")),
    responses((status = 200, description = "Distribuidor atualizado", body = Distributor)),
    security(("api_jwt" = []))
)]
pub async fn update_distributor(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<DistributorPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let distributor = app_state.distributor_service.update(id, &payload).await?;
    Ok(ApiResponse::ok("Distributor updated", distributor))
}

#[utoipa::path(
    delete,
    path = "/api/distributors/{id}",
    tag = "Distributors",
    params(("id" = Uuid, Path, description = "ID do distribuidor")),
    responses((status = 200, description = "Distribuidor desativado")),
    security(("api_jwt" = []))
)]
pub async fn delete_distributor(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.distributor_service.deactivate(id).await?;
    Ok(ApiResponse::message("Distributor deactivated"))
}

// ---
// Contatos
// ---

#[utoipa::path(
    get,
    path = "/api/distributors/{id}/contacts",
    tag = "Distributors",
    params(("id" = Uuid, Path, description = "ID do distribuidor")),
    responses((status = 200, description = "Contatos", body = [DistributorContact])),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let contacts = app_state.distributor_service.contacts(&user, id).await?;
    Ok(ApiResponse::ok("Contacts retrieved", contacts))
}

#[utoipa::path(
    post,
    path = "/api/distributors/{id}/contacts",
    tag = "Distributors",
    request_body = ContactPayload,
    params(("id" = Uuid, Path, description = "ID do distribuidor")),
    responses((status = 201, description = "Contato criado", body = DistributorContact)),
    security(("api_jwt" = []))
)]
pub async fn create_contact(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let contact = app_state.distributor_service.add_contact(id, &payload).await?;
    Ok(ApiResponse::created("Contact created", contact))
}

#[utoipa::path(
    put,
    path = "/api/distributors/{id}/contacts/{contact_id}",
    tag = "Distributors",
    request_body = ContactPayload,
    params(
        ("id" = Uuid, Path, description = "ID do distribuidor"),
        ("contact_id" = Uuid, Path, description = "ID do contato")
    ),
    responses((status = 200, description = "Contato atualizado", body = DistributorContact)),
    security(("api_jwt" = []))
)]
pub async fn update_contact(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path((id, contact_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let contact = app_state
        .distributor_service
        .update_contact(id, contact_id, &payload)
        .await?;
    Ok(ApiResponse::ok("Contact updated", contact))
}

#[utoipa::path(
    delete,
    path = "/api/distributors/{id}/contacts/{contact_id}",
    tag = "Distributors",
    params(
        ("id" = Uuid, Path, description = "ID do distribuidor"),
        ("contact_id" = Uuid, Path, description = "ID do contato")
    ),
    responses((status = 200, description = "Contato excluído")),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path((id, contact_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state.distributor_service.delete_contact(id, contact_id).await?;
    Ok(ApiResponse::message("Contact deleted"))
}
