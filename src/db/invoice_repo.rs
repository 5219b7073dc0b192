// src/db/invoice_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::push_staff_scope, error::AppError},
    models::invoice::{Invoice, InvoiceFilter, InvoiceItem, InvoiceItemDetail, InvoiceStatus, InvoiceSummary},
    services::pricing::InvoiceTotals,
};

const INVOICE_COLUMNS: &str = "i.id, i.invoice_number, i.distributor_id, i.sales_staff_id, i.invoice_date, \
     i.due_date, i.subtotal, i.tax_amount, i.discount_amount, i.total_amount, i.paid_amount, i.status, \
     i.notes, i.created_by, i.created_at, i.updated_at";

// Chave fixa do advisory lock que serializa a numeração de faturas
const INVOICE_NUMBER_LOCK_KEY: i64 = 0x494E_565F_4E55_4D;

pub struct NewInvoice<'a> {
    pub invoice_number: &'a str,
    pub distributor_id: Uuid,
    pub sales_staff_id: Option<Uuid>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub totals: InvoiceTotals,
    pub status: InvoiceStatus,
    pub notes: Option<&'a str>,
    pub created_by: Uuid,
}

/// Linha já precificada, pronta para gravar
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_rate: Decimal,
    pub line_total: Decimal,
}

pub struct InvoiceHeaderChanges<'a> {
    pub distributor_id: Uuid,
    pub sales_staff_id: Option<Uuid>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<&'a str>,
    pub totals: InvoiceTotals,
}

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &InvoiceFilter,
        scope: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<InvoiceSummary>, i64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM invoices i JOIN distributors d ON d.id = i.distributor_id WHERE 1=1",
        );
        push_invoice_filters(&mut count_qb, filter, scope);
        let total = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(summary_select());
        qb.push(" WHERE 1=1");
        push_invoice_filters(&mut qb, filter, scope);
        qb.push(" ORDER BY i.invoice_date DESC, i.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let invoices = qb.build_query_as::<InvoiceSummary>().fetch_all(&self.pool).await?;
        Ok((invoices, total))
    }

    pub async fn find_summary<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<InvoiceSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{} WHERE i.id = $1", summary_select());
        let invoice = sqlx::query_as::<_, InvoiceSummary>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(invoice)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = $1");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(invoice)
    }

    /// Trava a linha da fatura até o fim da transação (pagamentos, status, edição)
    pub async fn lock_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = $1 FOR UPDATE");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(invoice)
    }

    pub async fn items<'e, E>(&self, executor: E, invoice_id: Uuid) -> Result<Vec<InvoiceItemDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, InvoiceItemDetail>(
            r#"
            SELECT ii.id, ii.invoice_id, ii.product_id, ii.quantity, ii.unit_price,
                   ii.discount_percent, ii.tax_rate, ii.line_total, ii.created_at,
                   p.name AS product_name, p.code AS product_code, p.unit_of_measure
            FROM invoice_items ii
            JOIN products p ON p.id = ii.product_id
            WHERE ii.invoice_id = $1
            ORDER BY ii.created_at ASC, ii.id ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    // =========================================================================
    //  NUMERAÇÃO
    // =========================================================================

    /// Advisory lock liberado no commit/rollback da transação
    pub async fn lock_numbering<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(INVOICE_NUMBER_LOCK_KEY)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Maior sequência já usada com o prefixo (ex.: `INV-202501-`), 0 se nenhuma
    pub async fn max_sequence<'e, E>(&self, executor: E, prefix: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let max: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(CAST(SUBSTRING(invoice_number FROM LENGTH($1) + 1) AS BIGINT)), 0)
            FROM invoices
            WHERE invoice_number LIKE $1 || '%'
              AND SUBSTRING(invoice_number FROM LENGTH($1) + 1) ~ '^[0-9]+$'
            "#,
        )
        .bind(prefix)
        .fetch_one(executor)
        .await?;
        Ok(max)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn insert<'e, E>(&self, executor: E, new_invoice: &NewInvoice<'_>) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO invoices AS i (
                invoice_number, distributor_id, sales_staff_id, invoice_date, due_date,
                subtotal, tax_amount, discount_amount, total_amount, status, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(new_invoice.invoice_number)
            .bind(new_invoice.distributor_id)
            .bind(new_invoice.sales_staff_id)
            .bind(new_invoice.invoice_date)
            .bind(new_invoice.due_date)
            .bind(new_invoice.totals.subtotal)
            .bind(new_invoice.totals.tax_amount)
            .bind(new_invoice.totals.discount_amount)
            .bind(new_invoice.totals.total_amount)
            .bind(new_invoice.status)
            .bind(new_invoice.notes)
            .bind(new_invoice.created_by)
            .fetch_one(executor)
            .await?;
        Ok(invoice)
    }

    pub async fn insert_items<'e, E>(&self, executor: E, invoice_id: Uuid, items: &[NewInvoiceItem]) -> Result<Vec<InvoiceItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO invoice_items (invoice_id, product_id, quantity, unit_price, discount_percent, tax_rate, line_total) ",
        );
        qb.push_values(items, |mut row, item| {
            row.push_bind(invoice_id)
                .push_bind(item.product_id)
                .push_bind(item.quantity)
                .push_bind(item.unit_price)
                .push_bind(item.discount_percent)
                .push_bind(item.tax_rate)
                .push_bind(item.line_total);
        });
        qb.push(
            " RETURNING id, invoice_id, product_id, quantity, unit_price, discount_percent, tax_rate, line_total, created_at",
        );
        let inserted = qb.build_query_as::<InvoiceItem>().fetch_all(executor).await?;
        Ok(inserted)
    }

    pub async fn delete_items<'e, E>(&self, executor: E, invoice_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // Cabeçalho + totais recalculados (edição de rascunho). paid_amount nunca é tocado aqui.
    pub async fn update_header<'e, E>(&self, executor: E, id: Uuid, changes: &InvoiceHeaderChanges<'_>) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE invoices AS i SET
                distributor_id = $2, sales_staff_id = $3, invoice_date = $4, due_date = $5,
                notes = $6, subtotal = $7, tax_amount = $8, discount_amount = $9,
                total_amount = $10, updated_at = NOW()
            WHERE i.id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .bind(changes.distributor_id)
            .bind(changes.sales_staff_id)
            .bind(changes.invoice_date)
            .bind(changes.due_date)
            .bind(changes.notes)
            .bind(changes.totals.subtotal)
            .bind(changes.totals.tax_amount)
            .bind(changes.totals.discount_amount)
            .bind(changes.totals.total_amount)
            .fetch_one(executor)
            .await?;
        Ok(invoice)
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: InvoiceStatus) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE invoices AS i SET status = $2, updated_at = NOW() WHERE i.id = $1 RETURNING {INVOICE_COLUMNS}"
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(invoice)
    }

    /// Vencidas em aberto viram `overdue`; retorna quantas mudaram
    pub async fn mark_overdue(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = 'overdue', updated_at = NOW()
            WHERE status IN ('sent', 'partial_paid')
              AND due_date IS NOT NULL
              AND due_date < CURRENT_DATE
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn summary_select() -> String {
    format!(
        "SELECT {INVOICE_COLUMNS}, d.name AS distributor_name, u.full_name AS sales_staff_name \
         FROM invoices i \
         JOIN distributors d ON d.id = i.distributor_id \
         LEFT JOIN users u ON u.id = i.sales_staff_id"
    )
}

fn push_invoice_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InvoiceFilter, scope: Option<Uuid>) {
    if let Some(status) = filter.status {
        qb.push(" AND i.status = ").push_bind(status);
    }
    if let Some(distributor_id) = filter.distributor_id {
        qb.push(" AND i.distributor_id = ").push_bind(distributor_id);
    }
    if let Some(sales_staff_id) = filter.sales_staff_id {
        qb.push(" AND i.sales_staff_id = ").push_bind(sales_staff_id);
    }
    if let Some(from) = filter.from {
        qb.push(" AND i.invoice_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND i.invoice_date <= ").push_bind(to);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (i.invoice_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR d.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    push_staff_scope(qb, "i.distributor_id", scope);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_bind_in_order_and_scope_comes_last() {
        let filter = InvoiceFilter {
            status: Some(InvoiceStatus::Overdue),
            search: Some("  INV-2025 ".into()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM invoices i WHERE 1=1");
        push_invoice_filters(&mut qb, &filter, Some(Uuid::new_v4()));

        let sql = qb.sql();
        assert!(sql.contains("i.status = $1"));
        assert!(sql.contains("i.invoice_number ILIKE $2 OR d.name ILIKE $3"));
        assert!(sql.contains("sales_staff_id = $4"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = InvoiceFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM invoices i WHERE 1=1");
        push_invoice_filters(&mut qb, &filter, None);
        assert_eq!(qb.sql(), "SELECT 1 FROM invoices i WHERE 1=1");
    }
}
