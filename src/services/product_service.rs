// src/services/product_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{PageParams, Paginated},
    },
    db::{product_repo::PRODUCT_IN_USE, ProductRepository},
    models::product::{
        Category, CategoryWithCount, CreateCategoryPayload, CreateProductPayload, Product,
        ProductFilter, UpdateCategoryPayload, UpdateProductPayload,
    },
};

#[derive(Clone)]
pub struct ProductService {
    repo: ProductRepository,
    pool: PgPool,
}

impl ProductService {
    pub fn new(repo: ProductRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Paginated<Product>, AppError> {
        let params = PageParams::new(filter.page, filter.limit);
        let (products, total) = self
            .repo
            .list(filter, params.limit(), params.offset())
            .await?;
        Ok(Paginated::new(products, &params, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    pub async fn create(&self, payload: &CreateProductPayload) -> Result<Product, AppError> {
        let product = self.repo.create(payload).await?;
        tracing::info!("📦 Produto criado: {} ({})", product.name, product.code);
        Ok(product)
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateProductPayload) -> Result<Product, AppError> {
        self.repo
            .update(id, payload)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.deactivate(id).await? {
            return Err(AppError::NotFound("Product"));
        }
        Ok(())
    }

    /// Exclusão física, bloqueada enquanto houver itens de fatura apontando para o produto
    pub async fn delete_permanently(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        if self.repo.is_referenced_by_invoices(&mut *tx, id).await? {
            return Err(AppError::Conflict(PRODUCT_IN_USE.to_string()));
        }

        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Produto excluído: {}", product.code);
        Ok(())
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn categories(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        self.repo.list_categories().await
    }

    pub async fn create_category(&self, payload: &CreateCategoryPayload) -> Result<Category, AppError> {
        self.repo.create_category(payload).await
    }

    /// Renomear a categoria renomeia também `products.category`, na mesma transação
    pub async fn update_category(&self, id: Uuid, payload: &UpdateCategoryPayload) -> Result<Category, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .repo
            .find_category(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        let updated = self
            .repo
            .update_category(&mut *tx, id, payload)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        if updated.name != current.name {
            let moved = self
                .repo
                .rename_product_category(&mut *tx, &current.name, &updated.name)
                .await?;
            tracing::info!(
                "🏷️ Categoria '{}' renomeada para '{}' ({} produto(s))",
                current.name,
                updated.name,
                moved
            );
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let category = self
            .repo
            .find_category(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        let in_use = self
            .repo
            .count_products_in_category(&mut *tx, &category.name)
            .await?;
        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Category is used by {in_use} product(s) and cannot be deleted."
            )));
        }

        self.repo.delete_category(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::test_support,
        models::invoice::{CreateInvoicePayload, InvoiceItemPayload},
    };
    use rust_decimal_macros::dec;

    async fn invoice_with(pool: &PgPool, product: &Product) {
        let admin = test_support::admin(pool).await;
        let dist = test_support::distributor(pool, admin.id).await;
        test_support::state(pool)
            .invoice_service
            .create(
                &admin,
                &CreateInvoicePayload {
                    distributor_id: dist.id,
                    sales_staff_id: None,
                    invoice_date: None,
                    due_date: None,
                    notes: None,
                    send: false,
                    items: vec![InvoiceItemPayload {
                        product_id: product.id,
                        quantity: dec!(1),
                        unit_price: None,
                        discount_percent: None,
                        tax_rate: None,
                    }],
                },
            )
            .await
            .unwrap();
    }

    async fn category(service: &ProductService, name: &str) -> Category {
        service
            .create_category(&CreateCategoryPayload {
                name: name.to_string(),
                description: None,
                display_order: None,
            })
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn renaming_category_moves_its_products(pool: PgPool) {
        let service = test_support::state(&pool).product_service;
        let oils = category(&service, "Oils").await;
        let ghee = test_support::product(&pool, "GH-1KG", dec!(850), Some("Oils")).await;
        let flour = test_support::product(&pool, "FL-10KG", dec!(1200), Some("Flour")).await;

        let renamed = service
            .update_category(
                oils.id,
                &UpdateCategoryPayload {
                    name: Some("Edible Oils".into()),
                    description: None,
                    display_order: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Edible Oils");

        assert_eq!(service.get(ghee.id).await.unwrap().category.as_deref(), Some("Edible Oils"));
        assert_eq!(service.get(flour.id).await.unwrap().category.as_deref(), Some("Flour"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn category_in_use_cannot_be_deleted(pool: PgPool) {
        let service = test_support::state(&pool).product_service;
        let oils = category(&service, "Oils").await;
        let ghee = test_support::product(&pool, "GH-1KG", dec!(850), Some("Oils")).await;

        let err = service.delete_category(oils.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        sqlx::query("UPDATE products SET category = NULL WHERE id = $1")
            .bind(ghee.id)
            .execute(&pool)
            .await
            .unwrap();
        service.delete_category(oils.id).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn invoiced_product_cannot_be_deleted(pool: PgPool) {
        let service = test_support::state(&pool).product_service;
        let ghee = test_support::product(&pool, "GH-1KG", dec!(850), None).await;
        invoice_with(&pool, &ghee).await;

        let err = service.delete_permanently(ghee.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let unused = test_support::product(&pool, "FL-10KG", dec!(1200), None).await;
        service.delete_permanently(unused.id).await.unwrap();
        assert!(matches!(service.get(unused.id).await, Err(AppError::NotFound("Product"))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn foreign_key_violation_on_delete_is_a_conflict(pool: PgPool) {
        let ghee = test_support::product(&pool, "GH-1KG", dec!(850), None).await;
        invoice_with(&pool, &ghee).await;

        // Sem a checagem prévia, quem barra é a FK de invoice_items
        let err = ProductRepository::new(pool.clone())
            .delete(&pool, ghee.id)
            .await
            .unwrap_err();
        match err {
            AppError::Conflict(message) => assert_eq!(message, PRODUCT_IN_USE),
            other => panic!("esperado Conflict, veio {other:?}"),
        }
    }
}
