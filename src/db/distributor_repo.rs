// src/db/distributor_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::push_staff_scope, error::AppError},
    models::distributor::{
        AssignedStaff, ContactPayload, Distributor, DistributorContact, DistributorFilter,
        DistributorPayload,
    },
};

const DISTRIBUTOR_COLUMNS: &str = "id, name, address, city, region, postal_code, ntn_number, \
     contact_person, phone, whatsapp, email, is_active, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct DistributorRepository {
    pool: PgPool,
}

impl DistributorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lista paginada; `scope` restringe aos distribuidores do vendedor
    pub async fn list(
        &self,
        filter: &DistributorFilter,
        scope: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Distributor>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM distributors d WHERE 1=1");
        push_distributor_filters(&mut count_qb, filter, scope);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {DISTRIBUTOR_COLUMNS} FROM distributors d WHERE 1=1"
        ));
        push_distributor_filters(&mut qb, filter, scope);
        qb.push(" ORDER BY d.name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let distributors = qb.build_query_as::<Distributor>().fetch_all(&self.pool).await?;
        Ok((distributors, total))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Distributor>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {DISTRIBUTOR_COLUMNS} FROM distributors WHERE id = $1");
        let distributor = sqlx::query_as::<_, Distributor>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(distributor)
    }

    pub async fn create(&self, payload: &DistributorPayload, created_by: Uuid) -> Result<Distributor, AppError> {
        let sql = format!(
            r#"
            INSERT INTO distributors (
                name, address, city, region, postal_code, ntn_number,
                contact_person, phone, whatsapp, email, is_active, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, TRUE), $12)
            RETURNING {DISTRIBUTOR_COLUMNS}
            "#
        );
        let distributor = sqlx::query_as::<_, Distributor>(&sql)
            .bind(payload.name.trim())
            .bind(&payload.address)
            .bind(&payload.city)
            .bind(&payload.region)
            .bind(&payload.postal_code)
            .bind(&payload.ntn_number)
            .bind(&payload.contact_person)
            .bind(&payload.phone)
            .bind(&payload.whatsapp)
            .bind(&payload.email)
            .bind(payload.is_active)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(distributor)
    }

    // PUT substitui o cadastro inteiro; só is_active é opcional
    pub async fn update(&self, id: Uuid, payload: &DistributorPayload) -> Result<Option<Distributor>, AppError> {
        let sql = format!(
            r#"
            UPDATE distributors SET
                name = $2, address = $3, city = $4, region = $5, postal_code = $6,
                ntn_number = $7, contact_person = $8, phone = $9, whatsapp = $10,
                email = $11, is_active = COALESCE($12, is_active), updated_at = NOW()
            WHERE id = $1
            RETURNING {DISTRIBUTOR_COLUMNS}
            "#
        );
        let distributor = sqlx::query_as::<_, Distributor>(&sql)
            .bind(id)
            .bind(payload.name.trim())
            .bind(&payload.address)
            .bind(&payload.city)
            .bind(&payload.region)
            .bind(&payload.postal_code)
            .bind(&payload.ntn_number)
            .bind(&payload.contact_person)
            .bind(&payload.phone)
            .bind(&payload.whatsapp)
            .bind(&payload.email)
            .bind(payload.is_active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(distributor)
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE distributors SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn assigned_staff(&self, distributor_id: Uuid) -> Result<Vec<AssignedStaff>, AppError> {
        let staff = sqlx::query_as::<_, AssignedStaff>(
            r#"
            SELECT u.id AS user_id, u.full_name, u.username, ssd.assigned_date
            FROM sales_staff_distributors ssd
            JOIN users u ON u.id = ssd.sales_staff_id
            WHERE ssd.distributor_id = $1 AND ssd.is_active
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(distributor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(staff)
    }

    // =========================================================================
    //  CONTATOS
    // =========================================================================

    pub async fn list_contacts(&self, distributor_id: Uuid) -> Result<Vec<DistributorContact>, AppError> {
        let contacts = sqlx::query_as::<_, DistributorContact>(
            r#"
            SELECT id, distributor_id, name, designation, phone, whatsapp, email, is_primary, created_at
            FROM distributor_contacts
            WHERE distributor_id = $1
            ORDER BY is_primary DESC, name ASC
            "#,
        )
        .bind(distributor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    /// Só um contato principal por distribuidor: os demais perdem a marca
    pub async fn clear_primary_contact<'e, E>(&self, executor: E, distributor_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE distributor_contacts SET is_primary = FALSE WHERE distributor_id = $1 AND is_primary")
            .bind(distributor_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn create_contact<'e, E>(
        &self,
        executor: E,
        distributor_id: Uuid,
        payload: &ContactPayload,
    ) -> Result<DistributorContact, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, DistributorContact>(
            r#"
            INSERT INTO distributor_contacts (distributor_id, name, designation, phone, whatsapp, email, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, distributor_id, name, designation, phone, whatsapp, email, is_primary, created_at
            "#,
        )
        .bind(distributor_id)
        .bind(payload.name.trim())
        .bind(&payload.designation)
        .bind(&payload.phone)
        .bind(&payload.whatsapp)
        .bind(&payload.email)
        .bind(payload.is_primary)
        .fetch_one(executor)
        .await?;
        Ok(contact)
    }

    pub async fn update_contact<'e, E>(
        &self,
        executor: E,
        distributor_id: Uuid,
        contact_id: Uuid,
        payload: &ContactPayload,
    ) -> Result<Option<DistributorContact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, DistributorContact>(
            r#"
            UPDATE distributor_contacts SET
                name = $3, designation = $4, phone = $5, whatsapp = $6, email = $7, is_primary = $8
            WHERE id = $2 AND distributor_id = $1
            RETURNING id, distributor_id, name, designation, phone, whatsapp, email, is_primary, created_at
            "#,
        )
        .bind(distributor_id)
        .bind(contact_id)
        .bind(payload.name.trim())
        .bind(&payload.designation)
        .bind(&payload.phone)
        .bind(&payload.whatsapp)
        .bind(&payload.email)
        .bind(payload.is_primary)
        .fetch_optional(executor)
        .await?;
        Ok(contact)
    }

    pub async fn delete_contact(&self, distributor_id: Uuid, contact_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM distributor_contacts WHERE id = $2 AND distributor_id = $1")
            .bind(distributor_id)
            .bind(contact_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_distributor_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &DistributorFilter, scope: Option<Uuid>) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (d.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR d.city ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR d.contact_person ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND d.is_active = ").push_bind(is_active);
    }
    push_staff_scope(qb, "d.id", scope);
}
