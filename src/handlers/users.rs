// src/handlers/users.rs

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
    models::user::{
        AssignDistributorsPayload, CreateUserPayload, DistributorAssignment, UpdateUserPayload,
        User, UserFilter,
    },
};

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(UserFilter),
    responses((status = 200, description = "Lista paginada de usuários")),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Query(filter): Query<UserFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.user_service.list(&filter).await?;
    Ok(ApiResponse::ok("Users retrieved", page))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário", body = User),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state.user_service.get(id).await?;
    Ok(ApiResponse::ok("User retrieved", user))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 409, description = "Username ou e-mail já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = app_state.user_service.create(&payload).await?;
    Ok(ApiResponse::created("User created", user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    request_body = UpdateUserPayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses((status = 200, description = "Usuário atualizado", body = User)),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = app_state.user_service.update(&actor, id, &payload).await?;
    Ok(ApiResponse::ok("User updated", user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário desativado"),
        (status = 400, description = "Não é possível desativar a própria conta")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.user_service.deactivate(&actor, id).await?;
    Ok(ApiResponse::message("User deactivated"))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/distributors",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do vendedor")),
    responses((status = 200, description = "Distribuidores atribuídos", body = [DistributorAssignment])),
    security(("api_jwt" = []))
)]
pub async fn list_assignments(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = app_state.user_service.assignments(id).await?;
    Ok(ApiResponse::ok("Assignments retrieved", assignments))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/distributors",
    tag = "Users",
    request_body = AssignDistributorsPayload,
    params(("id" = Uuid, Path, description = "ID do vendedor")),
    responses((status = 200, description = "Distribuidores atribuídos", body = [DistributorAssignment])),
    security(("api_jwt" = []))
)]
pub async fn assign_distributors(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDistributorsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let assignments = app_state
        .user_service
        .assign_distributors(id, &payload.distributor_ids)
        .await?;
    Ok(ApiResponse::ok("Distributors assigned", assignments))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/distributors/{distributor_id}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "ID do vendedor"),
        ("distributor_id" = Uuid, Path, description = "ID do distribuidor")
    ),
    responses((status = 200, description = "Atribuição desativada")),
    security(("api_jwt" = []))
)]
pub async fn unassign_distributor(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path((id, distributor_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .user_service
        .unassign_distributor(id, distributor_id)
        .await?;
    Ok(ApiResponse::message("Distributor unassigned"))
}
