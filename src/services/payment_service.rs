// src/services/payment_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{ensure_distributor_access, staff_scope},
        error::AppError,
        pagination::{PageParams, Paginated},
    },
    db::{payment_repo::NewPayment, InvoiceRepository, PaymentRepository},
    models::{
        invoice::Invoice,
        payment::{CreatePaymentPayload, PaymentFilter, PaymentReceipt, PaymentSummary},
        user::User,
    },
};

/// Regras de aceitação de um pagamento contra a fatura (já travada)
pub fn check_payment_allowed(invoice: &Invoice, amount: Decimal) -> Result<(), AppError> {
    if !invoice.status.accepts_payments() {
        return Err(AppError::BadRequest(format!(
            "Payments cannot be recorded for {} invoices.",
            invoice.status.as_str()
        )));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("Payment amount must be greater than zero.".to_string()));
    }
    let balance = invoice.balance_due();
    if amount > balance {
        return Err(AppError::BadRequest(format!(
            "Payment amount {amount} exceeds the outstanding balance of {balance}."
        )));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct PaymentService {
    payment_repo: PaymentRepository,
    invoice_repo: InvoiceRepository,
    pool: PgPool,
}

impl PaymentService {
    pub fn new(payment_repo: PaymentRepository, invoice_repo: InvoiceRepository, pool: PgPool) -> Self {
        Self {
            payment_repo,
            invoice_repo,
            pool,
        }
    }

    pub async fn list(&self, user: &User, filter: &PaymentFilter) -> Result<Paginated<PaymentSummary>, AppError> {
        let params = PageParams::new(filter.page, filter.limit);
        let (payments, total) = self
            .payment_repo
            .list(filter, staff_scope(user), params.limit(), params.offset())
            .await?;
        Ok(Paginated::new(payments, &params, total))
    }

    pub async fn get(&self, user: &User, id: Uuid) -> Result<PaymentSummary, AppError> {
        let payment = self
            .payment_repo
            .find_summary(id)
            .await?
            .ok_or(AppError::NotFound("Payment"))?;
        ensure_distributor_access(&self.pool, user, payment.distributor_id).await?;
        Ok(payment)
    }

    /// Registra o pagamento com a fatura travada (FOR UPDATE) para que o saldo
    /// verificado seja o mesmo no momento do INSERT. O trigger atualiza a fatura.
    pub async fn record(&self, user: &User, payload: &CreatePaymentPayload) -> Result<PaymentReceipt, AppError> {
        let mut tx = self.pool.begin().await?;

        let invoice = self
            .invoice_repo
            .lock_for_update(&mut *tx, payload.invoice_id)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;
        ensure_distributor_access(&mut *tx, user, invoice.distributor_id).await?;
        check_payment_allowed(&invoice, payload.amount)?;

        let payment = self
            .payment_repo
            .insert(
                &mut *tx,
                &NewPayment {
                    invoice_id: invoice.id,
                    payment_date: payload.payment_date.unwrap_or_else(|| Utc::now().date_naive()),
                    amount: payload.amount,
                    payment_method: payload.payment_method,
                    check_number: non_blank(&payload.check_number),
                    check_date: payload.check_date,
                    bank_name: non_blank(&payload.bank_name),
                    reference_number: non_blank(&payload.reference_number),
                    collected_by: user.id,
                    notes: payload.notes.as_deref(),
                },
            )
            .await?;

        // Lido depois do trigger, dentro da mesma transação
        let invoice = self
            .invoice_repo
            .find_by_id(&mut *tx, invoice.id)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;

        tx.commit().await?;

        tracing::info!(
            "💰 Pagamento de {} ({}) na fatura {} -> {}",
            payment.amount,
            payment.payment_method.label(),
            invoice.invoice_number,
            invoice.status.as_str()
        );
        Ok(PaymentReceipt { payment, invoice })
    }

    /// Exclusão física (admin); devolve a fatura recalculada pelo trigger
    pub async fn delete(&self, id: Uuid) -> Result<Invoice, AppError> {
        let mut tx = self.pool.begin().await?;

        let invoice_id = self
            .payment_repo
            .delete(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Payment"))?;
        let invoice = self
            .invoice_repo
            .find_by_id(&mut *tx, invoice_id)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;

        tx.commit().await?;

        tracing::info!("🗑️ Pagamento {} excluído da fatura {}", id, invoice.invoice_number);
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support;
    use crate::models::{
        invoice::{CreateInvoicePayload, InvoiceItemPayload, InvoiceStatus},
        payment::PaymentMethod,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn invoice(status: InvoiceStatus, total: Decimal, paid: Decimal) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: "INV-202501-0001".into(),
            distributor_id: Uuid::new_v4(),
            sales_staff_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            due_date: None,
            subtotal: total,
            tax_amount: dec!(0),
            discount_amount: dec!(0),
            total_amount: total,
            paid_amount: paid,
            status,
            notes: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payment_up_to_balance_is_accepted() {
        let inv = invoice(InvoiceStatus::PartialPaid, dec!(1000), dec!(400));
        assert!(check_payment_allowed(&inv, dec!(600)).is_ok());
        assert!(check_payment_allowed(&inv, dec!(0.01)).is_ok());
    }

    #[test]
    fn overpayment_is_rejected() {
        let inv = invoice(InvoiceStatus::Sent, dec!(1000), dec!(400));
        let err = check_payment_allowed(&inv, dec!(600.01)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn zero_or_negative_amount_is_rejected() {
        let inv = invoice(InvoiceStatus::Sent, dec!(1000), dec!(0));
        assert!(check_payment_allowed(&inv, dec!(0)).is_err());
        assert!(check_payment_allowed(&inv, dec!(-5)).is_err());
    }

    #[test]
    fn closed_or_unsent_invoices_refuse_payments() {
        for status in [InvoiceStatus::Draft, InvoiceStatus::Paid, InvoiceStatus::Cancelled] {
            let inv = invoice(status, dec!(1000), dec!(0));
            assert!(check_payment_allowed(&inv, dec!(10)).is_err(), "{status:?}");
        }
        let overdue = invoice(InvoiceStatus::Overdue, dec!(1000), dec!(0));
        assert!(check_payment_allowed(&overdue, dec!(10)).is_ok());
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        assert_eq!(non_blank(&Some("  ".into())), None);
        assert_eq!(non_blank(&Some(" 004512 ".into())), Some("004512"));
        assert_eq!(non_blank(&None), None);
    }

    // --- com banco: o trigger mantém paid_amount/status ---

    fn cash(invoice_id: Uuid, amount: Decimal) -> CreatePaymentPayload {
        CreatePaymentPayload {
            invoice_id,
            payment_date: None,
            amount,
            payment_method: PaymentMethod::Cash,
            check_number: None,
            check_date: None,
            bank_name: None,
            reference_number: None,
            notes: None,
        }
    }

    // Fatura enviada de 1000,00 (10 × 100, sem imposto)
    async fn sent_invoice(pool: &PgPool, due_date: Option<NaiveDate>) -> (User, Invoice) {
        let admin = test_support::admin(pool).await;
        let dist = test_support::distributor(pool, admin.id).await;
        let rice = test_support::product(pool, "RC-25KG", dec!(100), None).await;

        let detail = test_support::state(pool)
            .invoice_service
            .create(
                &admin,
                &CreateInvoicePayload {
                    distributor_id: dist.id,
                    sales_staff_id: None,
                    invoice_date: NaiveDate::from_ymd_opt(2025, 1, 10),
                    due_date,
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
        (admin, detail.invoice.invoice)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn payments_drive_partial_then_paid(pool: PgPool) {
        let (admin, invoice) = sent_invoice(&pool, None).await;
        let service = test_support::state(&pool).payment_service;
        assert_eq!(invoice.status, InvoiceStatus::Sent);

        let first = service.record(&admin, &cash(invoice.id, dec!(400))).await.unwrap();
        assert_eq!(first.invoice.paid_amount, dec!(400));
        assert_eq!(first.invoice.status, InvoiceStatus::PartialPaid);

        let second = service.record(&admin, &cash(invoice.id, dec!(600))).await.unwrap();
        assert_eq!(second.invoice.paid_amount, dec!(1000));
        assert_eq!(second.invoice.status, InvoiceStatus::Paid);

        // Fatura quitada não aceita mais nada
        let err = service.record(&admin, &cash(invoice.id, dec!(1))).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Estornar tudo devolve a fatura para "sent"
        let after_one = service.delete(second.payment.id).await.unwrap();
        assert_eq!(after_one.status, InvoiceStatus::PartialPaid);
        let after_all = service.delete(first.payment.id).await.unwrap();
        assert_eq!(after_all.paid_amount, dec!(0));
        assert_eq!(after_all.status, InvoiceStatus::Sent);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn past_due_invoice_stays_overdue_around_payments(pool: PgPool) {
        let (admin, invoice) = sent_invoice(&pool, NaiveDate::from_ymd_opt(2025, 1, 31)).await;
        let service = test_support::state(&pool).payment_service;

        let receipt = service.record(&admin, &cash(invoice.id, dec!(100))).await.unwrap();
        assert_eq!(receipt.invoice.status, InvoiceStatus::Overdue);

        let reverted = service.delete(receipt.payment.id).await.unwrap();
        assert_eq!(reverted.paid_amount, dec!(0));
        assert_eq!(reverted.status, InvoiceStatus::Overdue);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn overpayment_is_refused_and_nothing_is_stored(pool: PgPool) {
        let (admin, invoice) = sent_invoice(&pool, None).await;
        let service = test_support::state(&pool).payment_service;

        let err = service
            .record(&admin, &cash(invoice.id, dec!(1000.01)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = $1")
            .bind(invoice.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 0);
    }
}
