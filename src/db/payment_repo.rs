// src/db/payment_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::push_staff_scope, error::AppError},
    models::payment::{Payment, PaymentFilter, PaymentMethod, PaymentSummary},
};

const PAYMENT_COLUMNS: &str = "p.id, p.invoice_id, p.payment_date, p.amount, p.payment_method, \
     p.check_number, p.check_date, p.bank_name, p.reference_number, p.collected_by, p.notes, p.created_at";

pub struct NewPayment<'a> {
    pub invoice_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub check_number: Option<&'a str>,
    pub check_date: Option<NaiveDate>,
    pub bank_name: Option<&'a str>,
    pub reference_number: Option<&'a str>,
    pub collected_by: Uuid,
    pub notes: Option<&'a str>,
}

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &PaymentFilter,
        scope: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PaymentSummary>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM payments p JOIN invoices i ON i.id = p.invoice_id WHERE 1=1",
        );
        push_payment_filters(&mut count_qb, filter, scope);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(summary_select());
        qb.push(" WHERE 1=1");
        push_payment_filters(&mut qb, filter, scope);
        qb.push(" ORDER BY p.payment_date DESC, p.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let payments = qb.build_query_as::<PaymentSummary>().fetch_all(&self.pool).await?;
        Ok((payments, total))
    }

    pub async fn find_summary(&self, id: Uuid) -> Result<Option<PaymentSummary>, AppError> {
        let sql = format!("{} WHERE p.id = $1", summary_select());
        let payment = sqlx::query_as::<_, PaymentSummary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn list_for_invoice<'e, E>(&self, executor: E, invoice_id: Uuid) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments p WHERE p.invoice_id = $1 ORDER BY p.payment_date ASC, p.created_at ASC"
        );
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_all(executor)
            .await?;
        Ok(payments)
    }

    // O trigger trg_payments_sync_invoice recalcula paid_amount/status da fatura
    pub async fn insert<'e, E>(&self, executor: E, new_payment: &NewPayment<'_>) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO payments AS p (
                invoice_id, payment_date, amount, payment_method, check_number,
                check_date, bank_name, reference_number, collected_by, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(new_payment.invoice_id)
            .bind(new_payment.payment_date)
            .bind(new_payment.amount)
            .bind(new_payment.payment_method)
            .bind(new_payment.check_number)
            .bind(new_payment.check_date)
            .bind(new_payment.bank_name)
            .bind(new_payment.reference_number)
            .bind(new_payment.collected_by)
            .bind(new_payment.notes)
            .fetch_one(executor)
            .await?;
        Ok(payment)
    }

    /// Exclusão física; devolve o invoice_id para recarregar a fatura
    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM payments WHERE id = $1 RETURNING invoice_id")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(invoice_id)
    }
}

fn summary_select() -> String {
    format!(
        "SELECT {PAYMENT_COLUMNS}, i.invoice_number, i.distributor_id, d.name AS distributor_name, \
         u.full_name AS collected_by_name \
         FROM payments p \
         JOIN invoices i ON i.id = p.invoice_id \
         JOIN distributors d ON d.id = i.distributor_id \
         LEFT JOIN users u ON u.id = p.collected_by"
    )
}

fn push_payment_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PaymentFilter, scope: Option<Uuid>) {
    if let Some(invoice_id) = filter.invoice_id {
        qb.push(" AND p.invoice_id = ").push_bind(invoice_id);
    }
    if let Some(distributor_id) = filter.distributor_id {
        qb.push(" AND i.distributor_id = ").push_bind(distributor_id);
    }
    if let Some(method) = filter.payment_method {
        qb.push(" AND p.payment_method = ").push_bind(method);
    }
    if let Some(from) = filter.from {
        qb.push(" AND p.payment_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND p.payment_date <= ").push_bind(to);
    }
    push_staff_scope(qb, "i.distributor_id", scope);
}
