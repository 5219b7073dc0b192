// src/common/db_utils.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::user::User;

// ---
// Escopo de acesso: vendedor só enxerga os distribuidores atribuídos a ele
// ---

/// `Some(user_id)` para vendedores, `None` para admin (sem restrição).
pub fn staff_scope(user: &User) -> Option<Uuid> {
    if user.is_admin() { None } else { Some(user.id) }
}

/// Acrescenta `AND <column> IN (distribuidores ativos do vendedor)` quando há escopo.
pub fn push_staff_scope(qb: &mut QueryBuilder<'_, Postgres>, distributor_column: &str, scope: Option<Uuid>) {
    if let Some(staff_id) = scope {
        qb.push(" AND ")
            .push(distributor_column)
            .push(
                " IN (SELECT distributor_id FROM sales_staff_distributors \
                 WHERE is_active AND sales_staff_id = ",
            )
            .push_bind(staff_id)
            .push(")");
    }
}

pub async fn is_assigned<'e, E>(executor: E, staff_id: Uuid, distributor_id: Uuid) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let assigned: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM sales_staff_distributors
            WHERE sales_staff_id = $1 AND distributor_id = $2 AND is_active
        )
        "#,
    )
    .bind(staff_id)
    .bind(distributor_id)
    .fetch_one(executor)
    .await?;
    Ok(assigned)
}

/// Falha com 403 quando o vendedor tenta acessar distribuidor fora da carteira.
pub async fn ensure_distributor_access<'e, E>(executor: E, user: &User, distributor_id: Uuid) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    if let Some(staff_id) = staff_scope(user) {
        if !is_assigned(executor, staff_id, distributor_id).await? {
            return Err(AppError::Forbidden(
                "You do not have access to this distributor.".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn user_with_role(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "tester".into(),
            email: "tester@example.com".into(),
            password_hash: String::new(),
            role,
            full_name: "Test User".into(),
            phone: None,
            whatsapp: None,
            address: None,
            commission_rate: Decimal::ZERO,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_has_no_scope() {
        assert_eq!(staff_scope(&user_with_role(UserRole::Admin)), None);
    }

    #[test]
    fn sales_staff_is_scoped_to_self() {
        let staff = user_with_role(UserRole::SalesStaff);
        assert_eq!(staff_scope(&staff), Some(staff.id));
    }

    #[test]
    fn scope_clause_is_only_added_for_staff() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM invoices i WHERE 1=1");
        push_staff_scope(&mut qb, "i.distributor_id", None);
        assert_eq!(qb.sql(), "SELECT * FROM invoices i WHERE 1=1");

        push_staff_scope(&mut qb, "i.distributor_id", Some(Uuid::new_v4()));
        assert!(qb.sql().contains("i.distributor_id IN (SELECT distributor_id FROM sales_staff_distributors"));
        assert!(qb.sql().ends_with("sales_staff_id = $1)"));
    }
}
