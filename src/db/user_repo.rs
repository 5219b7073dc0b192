// src/db/user_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::user::{DistributorAssignment, User, UserFilter, UserRole},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, full_name, phone, whatsapp, \
     address, commission_rate, is_active, last_login_at, created_at, updated_at";

// Dados já validados/hasheados para inserir um usuário
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: UserRole,
    pub full_name: &'a str,
    pub phone: Option<&'a str>,
    pub whatsapp: Option<&'a str>,
    pub address: Option<&'a str>,
    pub commission_rate: Decimal,
}

#[derive(Default)]
pub struct UserChanges<'a> {
    pub email: Option<&'a str>,
    pub role: Option<UserRole>,
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub whatsapp: Option<&'a str>,
    pub address: Option<&'a str>,
    pub commission_rate: Option<Decimal>,
    pub is_active: Option<bool>,
    pub password_hash: Option<&'a str>,
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca por username OU e-mail (login)
    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn count_admins(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list(&self, filter: &UserFilter, limit: i64, offset: i64) -> Result<(Vec<User>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE 1=1");
        push_user_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1"));
        push_user_filters(&mut qb, filter);
        qb.push(" ORDER BY full_name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok((users, total))
    }

    // Cria um novo usuário, traduzindo violações de UNIQUE pelo nome da constraint
    pub async fn create<'e, E>(&self, executor: E, new_user: &NewUser<'_>) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO users (
                username, email, password_hash, role, full_name,
                phone, whatsapp, address, commission_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new_user.username)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.role)
            .bind(new_user.full_name)
            .bind(new_user.phone)
            .bind(new_user.whatsapp)
            .bind(new_user.address)
            .bind(new_user.commission_rate)
            .fetch_one(executor)
            .await
            .map_err(map_user_unique_violation)
    }

    // Atualização parcial: campos ausentes mantêm o valor atual (COALESCE)
    pub async fn update<'e, E>(&self, executor: E, id: Uuid, changes: &UserChanges<'_>) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                role = COALESCE($3, role),
                full_name = COALESCE($4, full_name),
                phone = COALESCE($5, phone),
                whatsapp = COALESCE($6, whatsapp),
                address = COALESCE($7, address),
                commission_rate = COALESCE($8, commission_rate),
                is_active = COALESCE($9, is_active),
                password_hash = COALESCE($10, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.role)
            .bind(changes.full_name)
            .bind(changes.phone)
            .bind(changes.whatsapp)
            .bind(changes.address)
            .bind(changes.commission_rate)
            .bind(changes.is_active)
            .bind(changes.password_hash)
            .fetch_optional(executor)
            .await
            .map_err(map_user_unique_violation)
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  ATRIBUIÇÕES (sales_staff_distributors)
    // =========================================================================

    pub async fn list_assignments<'e, E>(&self, executor: E, sales_staff_id: Uuid) -> Result<Vec<DistributorAssignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignments = sqlx::query_as::<_, DistributorAssignment>(
            r#"
            SELECT ssd.id, ssd.sales_staff_id, ssd.distributor_id,
                   d.name AS distributor_name, ssd.is_active, ssd.assigned_date
            FROM sales_staff_distributors ssd
            JOIN distributors d ON d.id = ssd.distributor_id
            WHERE ssd.sales_staff_id = $1
            ORDER BY ssd.is_active DESC, d.name ASC
            "#,
        )
        .bind(sales_staff_id)
        .fetch_all(executor)
        .await?;
        Ok(assignments)
    }

    /// Atribui (ou reativa) a ligação vendedor ↔ distribuidor
    pub async fn upsert_assignment<'e, E>(&self, executor: E, sales_staff_id: Uuid, distributor_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO sales_staff_distributors (sales_staff_id, distributor_id)
            VALUES ($1, $2)
            ON CONFLICT (sales_staff_id, distributor_id)
            DO UPDATE SET is_active = TRUE, assigned_date = CURRENT_DATE
            "#,
        )
        .bind(sales_staff_id)
        .bind(distributor_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn deactivate_assignment(&self, sales_staff_id: Uuid, distributor_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sales_staff_distributors SET is_active = FALSE
            WHERE sales_staff_id = $1 AND distributor_id = $2 AND is_active
            "#,
        )
        .bind(sales_staff_id)
        .bind(distributor_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

fn map_user_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => AppError::EmailAlreadyExists,
                Some("users_username_key") => AppError::UsernameAlreadyExists,
                Some(other) => AppError::UniqueConstraintViolation(other.to_string()),
                None => AppError::UniqueConstraintViolation("Duplicate user".to_string()),
            };
        }
    }
    e.into()
}
