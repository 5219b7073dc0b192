// src/db/product_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{map_foreign_key_violation, map_unique_violation, AppError},
    models::product::{
        Category, CategoryWithCount, CreateCategoryPayload, CreateProductPayload, Product,
        ProductFilter, UpdateCategoryPayload, UpdateProductPayload,
    },
};

const PRODUCT_COLUMNS: &str = "id, name, code, description, price, unit_of_measure, category, \
     tax_rate, is_active, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, description, display_order, is_active, created_at, updated_at";

const DUPLICATE_CODE: &str = "A product with this code already exists.";
const DUPLICATE_CATEGORY: &str = "A category with this name already exists.";
pub const PRODUCT_IN_USE: &str = "Product is used in invoices and cannot be deleted. Deactivate it instead.";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &ProductFilter, limit: i64, offset: i64) -> Result<(Vec<Product>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE 1=1");
        push_product_filters(&mut count_qb, filter);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"));
        push_product_filters(&mut qb, filter);
        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok((products, total))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Busca vários produtos de uma vez (itens de fatura)
    pub async fn find_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    pub async fn create(&self, payload: &CreateProductPayload) -> Result<Product, AppError> {
        let sql = format!(
            r#"
            INSERT INTO products (name, code, description, price, unit_of_measure, category, tax_rate)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'pcs'), $6, COALESCE($7, 0))
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(payload.name.trim())
            .bind(payload.code.trim())
            .bind(&payload.description)
            .bind(payload.price)
            .bind(&payload.unit_of_measure)
            .bind(&payload.category)
            .bind(payload.tax_rate)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_CODE))
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateProductPayload) -> Result<Option<Product>, AppError> {
        let sql = format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                unit_of_measure = COALESCE($6, unit_of_measure),
                category = COALESCE($7, category),
                tax_rate = COALESCE($8, tax_rate),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(payload.name.as_deref().map(str::trim))
            .bind(payload.code.as_deref().map(str::trim))
            .bind(&payload.description)
            .bind(payload.price)
            .bind(&payload.unit_of_measure)
            .bind(&payload.category)
            .bind(payload.tax_rate)
            .bind(payload.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_CODE))
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_referenced_by_invoices<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM invoice_items WHERE product_id = $1)")
                .bind(id)
                .fetch_one(executor)
                .await?;
        Ok(referenced)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Um item de fatura pode ter sido gravado depois da checagem do serviço
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_foreign_key_violation(e, PRODUCT_IN_USE))?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.description, c.display_order, c.is_active, c.created_at, c.updated_at,
                   COUNT(p.id) AS product_count
            FROM categories c
            LEFT JOIN products p ON p.category = c.name
            GROUP BY c.id
            ORDER BY c.display_order ASC, c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn find_category<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(category)
    }

    pub async fn create_category(&self, payload: &CreateCategoryPayload) -> Result<Category, AppError> {
        let sql = format!(
            r#"
            INSERT INTO categories (name, description, display_order)
            VALUES ($1, $2, COALESCE($3, 0))
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(payload.name.trim())
            .bind(&payload.description)
            .bind(payload.display_order)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_CATEGORY))
    }

    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateCategoryPayload,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                display_order = COALESCE($4, display_order),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(payload.name.as_deref().map(str::trim))
            .bind(&payload.description)
            .bind(payload.display_order)
            .bind(payload.is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_CATEGORY))
    }

    /// Propaga a renomeação da categoria para os produtos (ligação só por texto)
    pub async fn rename_product_category<'e, E>(&self, executor: E, old_name: &str, new_name: &str) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE products SET category = $2, updated_at = NOW() WHERE category = $1")
            .bind(old_name)
            .bind(new_name)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_products_in_category<'e, E>(&self, executor: E, name: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category = $1")
            .bind(name)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_category<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR code ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND category = ").push_bind(category.to_string());
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}
