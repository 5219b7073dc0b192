// src/handlers/products.rs

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
    middleware::rbac::AdminOnly,
    models::product::{
        Category, CategoryWithCount, CreateCategoryPayload, CreateProductPayload, Product,
        ProductFilter, UpdateCategoryPayload, UpdateProductPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(ProductFilter),
    responses((status = 200, description = "Lista paginada de produtos")),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.product_service.list(&filter).await?;
    Ok(ApiResponse::ok("Products retrieved", page))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.product_service.get(id).await?;
    Ok(ApiResponse::ok("Product retrieved", product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = app_state.product_service.create(&payload).await?;
    Ok(ApiResponse::created("Product created", product))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses((status = 200, description = "Produto atualizado", body = Product)),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = app_state.product_service.update(id, &payload).await?;
    Ok(ApiResponse::ok("Product updated", product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses((status = 200, description = "Produto desativado")),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.product_service.deactivate(id).await?;
    Ok(ApiResponse::message("Product deactivated"))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/permanent",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto excluído"),
        (status = 409, description = "Produto usado em faturas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product_permanently(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.product_service.delete_permanently(id).await?;
    Ok(ApiResponse::message("Product permanently deleted"))
}

// ---
// Categorias
// ---

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Categories",
    responses((status = 200, description = "Categorias com contagem de produtos", body = [CategoryWithCount])),
    security(("api_jwt" = []))
)]
pub async fn list_categories(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = app_state.product_service.categories().await?;
    Ok(ApiResponse::ok("Categories retrieved", categories))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Categories",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = Category),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = app_state.product_service.create_category(&payload).await?;
    Ok(ApiResponse::created("Category created", category))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Categories",
    request_body = UpdateCategoryPayload,
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses((status = 200, description = "Categoria atualizada (renomeia produtos)", body = Category)),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = app_state.product_service.update_category(id, &payload).await?;
    Ok(ApiResponse::ok("Category updated", category))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Categories",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses(
        (status = 200, description = "Categoria excluída"),
        (status = 409, description = "Categoria em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    _guard: AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.product_service.delete_category(id).await?;
    Ok(ApiResponse::message("Category deleted"))
}
