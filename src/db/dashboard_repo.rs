// src/db/dashboard_repo.rs

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::push_staff_scope, error::AppError},
    models::dashboard::{
        DashboardStats, SalesTrendEntry, StaffPerformanceEntry, StatusBreakdownEntry,
        TopDistributorEntry, TopProductEntry,
    },
};

// Faturas que contam como venda
const BILLED: &str = "i.status NOT IN ('draft', 'cancelled')";

#[derive(FromRow)]
struct InvoiceTotalsRow {
    total_invoices: i64,
    total_sales: Decimal,
    outstanding_amount: Decimal,
    overdue_count: i64,
    overdue_amount: Decimal,
    month_sales: Decimal,
}

#[derive(FromRow)]
struct CollectionsRow {
    total_collected: Decimal,
    month_collections: Decimal,
}

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Cards do topo
    pub async fn stats(&self, scope: Option<Uuid>) -> Result<DashboardStats, AppError> {
        // REPEATABLE READ: todas as consultas abaixo leem o mesmo snapshot
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE i.status <> 'cancelled') AS total_invoices,
                COALESCE(SUM(i.total_amount) FILTER (WHERE {BILLED}), 0) AS total_sales,
                COALESCE(SUM(i.total_amount - i.paid_amount)
                    FILTER (WHERE i.status IN ('sent', 'partial_paid', 'overdue')), 0) AS outstanding_amount,
                COUNT(*) FILTER (WHERE i.status = 'overdue') AS overdue_count,
                COALESCE(SUM(i.total_amount - i.paid_amount) FILTER (WHERE i.status = 'overdue'), 0) AS overdue_amount,
                COALESCE(SUM(i.total_amount) FILTER (
                    WHERE {BILLED}
                      AND date_trunc('month', i.invoice_date) = date_trunc('month', CURRENT_DATE)
                ), 0) AS month_sales
            FROM invoices i
            WHERE 1=1
            "#
        ));
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        let invoices = qb.build_query_as::<InvoiceTotalsRow>().fetch_one(&mut *tx).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                COALESCE(SUM(p.amount), 0) AS total_collected,
                COALESCE(SUM(p.amount) FILTER (
                    WHERE date_trunc('month', p.payment_date) = date_trunc('month', CURRENT_DATE)
                ), 0) AS month_collections
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE 1=1
            "#,
        );
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        let collections = qb.build_query_as::<CollectionsRow>().fetch_one(&mut *tx).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM distributors d WHERE d.is_active");
        push_staff_scope(&mut qb, "d.id", scope);
        let active_distributors = qb.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        let active_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DashboardStats {
            total_invoices: invoices.total_invoices,
            total_sales: invoices.total_sales,
            total_collected: collections.total_collected,
            outstanding_amount: invoices.outstanding_amount,
            overdue_count: invoices.overdue_count,
            overdue_amount: invoices.overdue_amount,
            month_sales: invoices.month_sales,
            month_collections: collections.month_collections,
            active_distributors,
            active_products,
        })
    }

    // 2. Quantidade e valor por status
    pub async fn status_breakdown(&self, scope: Option<Uuid>) -> Result<Vec<StatusBreakdownEntry>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT i.status, COUNT(*) AS count, COALESCE(SUM(i.total_amount), 0) AS total_amount \
             FROM invoices i WHERE 1=1",
        );
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        qb.push(" GROUP BY i.status ORDER BY i.status");

        let rows = qb.build_query_as::<StatusBreakdownEntry>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // 3. Últimos N meses, incluindo meses sem movimento
    pub async fn sales_trend(&self, months: i64, scope: Option<Uuid>) -> Result<Vec<SalesTrendEntry>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "WITH months AS ( \
                SELECT generate_series( \
                    date_trunc('month', CURRENT_DATE) - make_interval(months => ",
        );
        qb.push_bind((months - 1) as i32);
        qb.push(format!(
            "), date_trunc('month', CURRENT_DATE), INTERVAL '1 month')::date AS month_start \
             ) \
             SELECT to_char(m.month_start, 'YYYY-MM') AS month, \
                    COALESCE(s.invoice_count, 0) AS invoice_count, \
                    COALESCE(s.sales, 0) AS sales, \
                    COALESCE(c.collections, 0) AS collections \
             FROM months m \
             LEFT JOIN ( \
                SELECT date_trunc('month', i.invoice_date)::date AS month_start, \
                       COUNT(*) AS invoice_count, SUM(i.total_amount) AS sales \
                FROM invoices i WHERE {BILLED}"
        ));
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        qb.push(
            " GROUP BY 1) s ON s.month_start = m.month_start \
             LEFT JOIN ( \
                SELECT date_trunc('month', p.payment_date)::date AS month_start, \
                       SUM(p.amount) AS collections \
                FROM payments p JOIN invoices i ON i.id = p.invoice_id WHERE 1=1",
        );
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        qb.push(" GROUP BY 1) c ON c.month_start = m.month_start ORDER BY m.month_start ASC");

        let rows = qb.build_query_as::<SalesTrendEntry>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // 4. Produtos mais vendidos (em valor)
    pub async fn top_products(&self, limit: i64, scope: Option<Uuid>) -> Result<Vec<TopProductEntry>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT p.id AS product_id, p.name AS product_name, p.code AS product_code, \
                    SUM(ii.quantity) AS total_quantity, SUM(ii.line_total) AS total_revenue \
             FROM invoice_items ii \
             JOIN invoices i ON i.id = ii.invoice_id \
             JOIN products p ON p.id = ii.product_id \
             WHERE {BILLED}"
        ));
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        qb.push(" GROUP BY p.id, p.name, p.code ORDER BY total_revenue DESC LIMIT ")
            .push_bind(limit);

        let rows = qb.build_query_as::<TopProductEntry>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // 5. Distribuidores com maior faturamento
    pub async fn top_distributors(&self, limit: i64, scope: Option<Uuid>) -> Result<Vec<TopDistributorEntry>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT d.id AS distributor_id, d.name AS distributor_name, \
                    COUNT(i.id) AS invoice_count, \
                    COALESCE(SUM(i.total_amount), 0) AS total_sales, \
                    COALESCE(SUM(i.paid_amount), 0) AS total_paid, \
                    COALESCE(SUM(i.total_amount - i.paid_amount), 0) AS outstanding \
             FROM invoices i \
             JOIN distributors d ON d.id = i.distributor_id \
             WHERE {BILLED}"
        ));
        push_staff_scope(&mut qb, "i.distributor_id", scope);
        qb.push(" GROUP BY d.id, d.name ORDER BY total_sales DESC LIMIT ")
            .push_bind(limit);

        let rows = qb.build_query_as::<TopDistributorEntry>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // 6. Desempenho por vendedor (admin). Recebido = pagamentos das faturas do vendedor.
    pub async fn staff_performance(&self) -> Result<Vec<StaffPerformanceEntry>, AppError> {
        let rows = sqlx::query_as::<_, StaffPerformanceEntry>(
            r#"
            SELECT u.id AS user_id, u.full_name, u.commission_rate,
                   (SELECT COUNT(*) FROM sales_staff_distributors ssd
                     WHERE ssd.sales_staff_id = u.id AND ssd.is_active) AS assigned_distributors,
                   COALESCE(inv.invoice_count, 0) AS invoice_count,
                   COALESCE(inv.total_sales, 0) AS total_sales,
                   COALESCE(pay.total_collected, 0) AS total_collected
            FROM users u
            LEFT JOIN (
                SELECT sales_staff_id, COUNT(*) AS invoice_count, SUM(total_amount) AS total_sales
                FROM invoices
                WHERE status NOT IN ('draft', 'cancelled')
                GROUP BY sales_staff_id
            ) inv ON inv.sales_staff_id = u.id
            LEFT JOIN (
                SELECT i.sales_staff_id, SUM(p.amount) AS total_collected
                FROM payments p
                JOIN invoices i ON i.id = p.invoice_id
                GROUP BY i.sales_staff_id
            ) pay ON pay.sales_staff_id = u.id
            WHERE u.role = 'sales_staff' AND u.is_active
            ORDER BY total_sales DESC, u.full_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
