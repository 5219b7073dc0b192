// src/services/distributor_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{ensure_distributor_access, staff_scope},
        error::AppError,
        pagination::{PageParams, Paginated},
    },
    db::DistributorRepository,
    models::{
        distributor::{
            ContactPayload, Distributor, DistributorContact, DistributorDetail, DistributorFilter,
            DistributorPayload,
        },
        user::User,
    },
};

#[derive(Clone)]
pub struct DistributorService {
    repo: DistributorRepository,
    pool: PgPool,
}

impl DistributorService {
    pub fn new(repo: DistributorRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list(&self, user: &User, filter: &DistributorFilter) -> Result<Paginated<Distributor>, AppError> {
        let params = PageParams::new(filter.page, filter.limit);
        let (distributors, total) = self
            .repo
            .list(filter, staff_scope(user), params.limit(), params.offset())
            .await?;
        Ok(Paginated::new(distributors, &params, total))
    }

    /// Busca respeitando o escopo do vendedor
    pub async fn get_visible(&self, user: &User, id: Uuid) -> Result<Distributor, AppError> {
        let distributor = self
            .repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Distributor"))?;
        ensure_distributor_access(&self.pool, user, id).await?;
        Ok(distributor)
    }

    pub async fn detail(&self, user: &User, id: Uuid) -> Result<DistributorDetail, AppError> {
        let distributor = self.get_visible(user, id).await?;
        let contacts = self.repo.list_contacts(id).await?;
        let assigned_staff = self.repo.assigned_staff(id).await?;

        Ok(DistributorDetail {
            distributor,
            contacts,
            assigned_staff,
        })
    }

    pub async fn create(&self, user: &User, payload: &DistributorPayload) -> Result<Distributor, AppError> {
        let distributor = self.repo.create(payload, user.id).await?;
        tracing::info!("🏪 Distribuidor criado: {}", distributor.name);
        Ok(distributor)
    }

    pub async fn update(&self, id: Uuid, payload: &DistributorPayload) -> Result<Distributor, AppError> {
        self.repo
            .update(id, payload)
            .await?
            .ok_or(AppError::NotFound("Distributor"))
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.deactivate(id).await? {
            return Err(AppError::NotFound("Distributor"));
        }
        tracing::info!("🚫 Distribuidor desativado: {}", id);
        Ok(())
    }

    // =========================================================================
    //  CONTATOS
    // =========================================================================

    pub async fn contacts(&self, user: &User, distributor_id: Uuid) -> Result<Vec<DistributorContact>, AppError> {
        self.get_visible(user, distributor_id).await?;
        self.repo.list_contacts(distributor_id).await
    }

    pub async fn add_contact(&self, distributor_id: Uuid, payload: &ContactPayload) -> Result<DistributorContact, AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_by_id(&mut *tx, distributor_id)
            .await?
            .ok_or(AppError::NotFound("Distributor"))?;
        if payload.is_primary {
            self.repo.clear_primary_contact(&mut *tx, distributor_id).await?;
        }
        let contact = self.repo.create_contact(&mut *tx, distributor_id, payload).await?;

        tx.commit().await?;
        Ok(contact)
    }

    pub async fn update_contact(
        &self,
        distributor_id: Uuid,
        contact_id: Uuid,
        payload: &ContactPayload,
    ) -> Result<DistributorContact, AppError> {
        let mut tx = self.pool.begin().await?;

        if payload.is_primary {
            self.repo.clear_primary_contact(&mut *tx, distributor_id).await?;
        }
        let contact = self
            .repo
            .update_contact(&mut *tx, distributor_id, contact_id, payload)
            .await?
            .ok_or(AppError::NotFound("Contact"))?;

        tx.commit().await?;
        Ok(contact)
    }

    pub async fn delete_contact(&self, distributor_id: Uuid, contact_id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_contact(distributor_id, contact_id).await? {
            return Err(AppError::NotFound("Contact"));
        }
        Ok(())
    }
}
