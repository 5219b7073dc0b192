// src/services/dashboard_service.rs

use rust_decimal::Decimal;

use crate::{
    common::{db_utils::staff_scope, error::AppError},
    db::DashboardRepository,
    models::{
        dashboard::{
            DashboardStats, SalesTrendEntry, StaffPerformanceEntry, StatusBreakdownEntry,
            TopDistributorEntry, TopProductEntry,
        },
        user::User,
    },
    services::pricing::round_money,
};

/// Comissão sobre o valor recebido
pub fn commission(collected: Decimal, commission_rate: Decimal) -> Decimal {
    round_money(collected * commission_rate / Decimal::ONE_HUNDRED)
}

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn stats(&self, user: &User) -> Result<DashboardStats, AppError> {
        self.repo.stats(staff_scope(user)).await
    }

    pub async fn status_breakdown(&self, user: &User) -> Result<Vec<StatusBreakdownEntry>, AppError> {
        self.repo.status_breakdown(staff_scope(user)).await
    }

    pub async fn sales_trend(&self, user: &User, months: i64) -> Result<Vec<SalesTrendEntry>, AppError> {
        self.repo.sales_trend(months, staff_scope(user)).await
    }

    pub async fn top_products(&self, user: &User, limit: i64) -> Result<Vec<TopProductEntry>, AppError> {
        self.repo.top_products(limit, staff_scope(user)).await
    }

    pub async fn top_distributors(&self, user: &User, limit: i64) -> Result<Vec<TopDistributorEntry>, AppError> {
        self.repo.top_distributors(limit, staff_scope(user)).await
    }

    pub async fn staff_performance(&self) -> Result<Vec<StaffPerformanceEntry>, AppError> {
        let mut rows = self.repo.staff_performance().await?;
        for row in &mut rows {
            row.commission_earned = commission(row.total_collected, row.commission_rate);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::test_support,
        models::{
            invoice::{CreateInvoicePayload, InvoiceItemPayload},
            payment::{CreatePaymentPayload, PaymentMethod},
        },
    };
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    #[test]
    fn commission_is_a_percentage_of_collections() {
        assert_eq!(commission(dec!(150000), dec!(2.5)), dec!(3750.00));
        assert_eq!(commission(dec!(0), dec!(5)), dec!(0));
        assert_eq!(commission(dec!(1000), dec!(0)), dec!(0));
    }

    #[test]
    fn commission_rounds_to_cents() {
        // 333.33 × 1.25% = 4.1666...
        assert_eq!(commission(dec!(333.33), dec!(1.25)), dec!(4.17));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn stats_cards_agree_with_each_other(pool: PgPool) {
        let state = test_support::state(&pool);
        let admin = test_support::admin(&pool).await;
        let dist = test_support::distributor(&pool, admin.id).await;
        let rice = test_support::product(&pool, "RC-25KG", dec!(100), None).await;

        let detail = state
            .invoice_service
            .create(
                &admin,
                &CreateInvoicePayload {
                    distributor_id: dist.id,
                    sales_staff_id: None,
                    invoice_date: None,
                    due_date: None,
                    notes: None,
                    send: true,
                    items: vec![InvoiceItemPayload {
                        product_id: rice.id,
                        quantity: dec!(10),
                        unit_price: None,
                        discount_percent: None,
                        tax_rate: None,
                    }],
                },
            )
            .await
            .unwrap();
        state
            .payment_service
            .record(
                &admin,
                &CreatePaymentPayload {
                    invoice_id: detail.invoice.invoice.id,
                    payment_date: None,
                    amount: dec!(400),
                    payment_method: PaymentMethod::Cash,
                    check_number: None,
                    check_date: None,
                    bank_name: None,
                    reference_number: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let stats = state.dashboard_service.stats(&admin).await.unwrap();
        assert_eq!(stats.total_invoices, 1);
        assert_eq!(stats.total_sales, dec!(1000));
        assert_eq!(stats.total_collected, dec!(400));
        assert_eq!(stats.outstanding_amount, dec!(600));
        assert_eq!(stats.total_sales, stats.total_collected + stats.outstanding_amount);
        assert_eq!(stats.active_distributors, 1);
        assert_eq!(stats.active_products, 1);
    }
}
