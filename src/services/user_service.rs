// src/services/user_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{PageParams, Paginated},
    },
    db::{
        user_repo::{NewUser, UserChanges},
        DistributorRepository, UserRepository,
    },
    models::user::{CreateUserPayload, DistributorAssignment, UpdateUserPayload, User, UserFilter},
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    distributor_repo: DistributorRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(user_repo: UserRepository, distributor_repo: DistributorRepository, pool: PgPool) -> Self {
        Self {
            user_repo,
            distributor_repo,
            pool,
        }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Paginated<User>, AppError> {
        let params = PageParams::new(filter.page, filter.limit);
        let (users, total) = self
            .user_repo
            .list(filter, params.limit(), params.offset())
            .await?;
        Ok(Paginated::new(users, &params, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn create(&self, payload: &CreateUserPayload) -> Result<User, AppError> {
        let password_hash = hash_password(&payload.password).await?;

        let user = self
            .user_repo
            .create(
                &self.pool,
                &NewUser {
                    username: payload.username.trim(),
                    email: payload.email.trim(),
                    password_hash: &password_hash,
                    role: payload.role,
                    full_name: payload.full_name.trim(),
                    phone: payload.phone.as_deref(),
                    whatsapp: payload.whatsapp.as_deref(),
                    address: payload.address.as_deref(),
                    commission_rate: payload.commission_rate.unwrap_or(Decimal::ZERO),
                },
            )
            .await?;

        tracing::info!("👤 Usuário criado: {} ({})", user.username, user.role.as_str());
        Ok(user)
    }

    pub async fn update(&self, actor: &User, id: Uuid, payload: &UpdateUserPayload) -> Result<User, AppError> {
        // Admin não pode se desativar nem perder o próprio papel de admin
        if actor.id == id {
            if payload.is_active == Some(false) {
                return Err(AppError::BadRequest("You cannot deactivate your own account.".to_string()));
            }
            if payload.role.is_some_and(|role| role != actor.role) {
                return Err(AppError::BadRequest("You cannot change your own role.".to_string()));
            }
        }

        let password_hash = match payload.password.as_deref() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let changes = UserChanges {
            email: payload.email.as_deref().map(str::trim),
            role: payload.role,
            full_name: payload.full_name.as_deref().map(str::trim),
            phone: payload.phone.as_deref(),
            whatsapp: payload.whatsapp.as_deref(),
            address: payload.address.as_deref(),
            commission_rate: payload.commission_rate,
            is_active: payload.is_active,
            password_hash: password_hash.as_deref(),
        };

        self.user_repo
            .update(&self.pool, id, &changes)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Exclusão lógica: apenas desativa
    pub async fn deactivate(&self, actor: &User, id: Uuid) -> Result<(), AppError> {
        if actor.id == id {
            return Err(AppError::BadRequest("You cannot deactivate your own account.".to_string()));
        }

        let changes = UserChanges {
            is_active: Some(false),
            ..Default::default()
        };
        let user = self
            .user_repo
            .update(&self.pool, id, &changes)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        tracing::info!("🚫 Usuário desativado: {}", user.username);
        Ok(())
    }

    // =========================================================================
    //  ATRIBUIÇÕES
    // =========================================================================

    pub async fn assignments(&self, user_id: Uuid) -> Result<Vec<DistributorAssignment>, AppError> {
        self.get(user_id).await?;
        self.user_repo.list_assignments(&self.pool, user_id).await
    }

    /// Atribui vários distribuidores de uma vez, tudo ou nada
    pub async fn assign_distributors(&self, user_id: Uuid, distributor_ids: &[Uuid]) -> Result<Vec<DistributorAssignment>, AppError> {
        let mut tx = self.pool.begin().await?;

        let user = self
            .user_repo
            .find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        if user.is_admin() {
            return Err(AppError::BadRequest(
                "Distributors can only be assigned to sales staff.".to_string(),
            ));
        }

        for distributor_id in distributor_ids {
            self.distributor_repo
                .find_by_id(&mut *tx, *distributor_id)
                .await?
                .ok_or(AppError::NotFound("Distributor"))?;
            self.user_repo
                .upsert_assignment(&mut *tx, user_id, *distributor_id)
                .await?;
        }

        let assignments = self.user_repo.list_assignments(&mut *tx, user_id).await?;
        tx.commit().await?;

        tracing::info!("🔗 {} distribuidor(es) atribuído(s) a {}", distributor_ids.len(), user.username);
        Ok(assignments)
    }

    pub async fn unassign_distributor(&self, user_id: Uuid, distributor_id: Uuid) -> Result<(), AppError> {
        if !self.user_repo.deactivate_assignment(user_id, distributor_id).await? {
            return Err(AppError::NotFound("Assignment"));
        }
        Ok(())
    }
}
