// src/services/invoice_service.rs

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{ensure_distributor_access, staff_scope},
        error::AppError,
        pagination::{PageParams, Paginated},
        validation::MAX_MONEY,
    },
    db::{
        invoice_repo::{InvoiceHeaderChanges, NewInvoice, NewInvoiceItem},
        DistributorRepository, InvoiceRepository, PaymentRepository, ProductRepository, UserRepository,
    },
    models::{
        invoice::{
            CreateInvoicePayload, Invoice, InvoiceDetail, InvoiceFilter, InvoiceItemPayload,
            InvoiceStatus, InvoiceSummary, UpdateInvoicePayload,
        },
        product::Product,
        user::User,
    },
    services::pricing::{self, InvoiceTotals, LineInput},
};

pub fn invoice_number_prefix(invoice_date: NaiveDate) -> String {
    format!("INV-{}-", invoice_date.format("%Y%m"))
}

/// `INV-YYYYMM-NNNN`; a sequência cresce além de 4 dígitos sem truncar
pub fn format_invoice_number(invoice_date: NaiveDate, sequence: i64) -> String {
    format!("{}{:04}", invoice_number_prefix(invoice_date), sequence)
}

/// Resolve preço/alíquota de cada item (payload ou cadastro do produto) e calcula os totais.
pub fn price_items(
    items: &[InvoiceItemPayload],
    products: &HashMap<Uuid, Product>,
) -> Result<(Vec<NewInvoiceItem>, InvoiceTotals), AppError> {
    let mut priced = Vec::with_capacity(items.len());
    let mut amounts = Vec::with_capacity(items.len());

    for item in items {
        let product = products
            .get(&item.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::BadRequest(format!("Product {} not found or inactive.", item.product_id)))?;

        let input = LineInput {
            quantity: item.quantity,
            unit_price: item.unit_price.unwrap_or(product.price),
            discount_percent: item.discount_percent.unwrap_or(Decimal::ZERO),
            tax_rate: item.tax_rate.unwrap_or(product.tax_rate),
        };
        let line = pricing::line_amounts(&input).ok_or_else(amount_out_of_range)?;

        priced.push(NewInvoiceItem {
            product_id: item.product_id,
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount_percent: input.discount_percent,
            tax_rate: input.tax_rate,
            line_total: line.line_total,
        });
        amounts.push(line);
    }

    let totals = pricing::invoice_totals(&amounts).ok_or_else(amount_out_of_range)?;
    // As colunas são NUMERIC(14, 2)
    if totals.subtotal > MAX_MONEY || totals.total_amount > MAX_MONEY {
        return Err(amount_out_of_range());
    }

    Ok((priced, totals))
}

fn amount_out_of_range() -> AppError {
    AppError::BadRequest("Invoice amounts exceed the maximum supported value.".to_string())
}

fn check_dates(invoice_date: NaiveDate, due_date: Option<NaiveDate>) -> Result<(), AppError> {
    match due_date {
        Some(due) if due < invoice_date => Err(AppError::BadRequest(
            "Due date cannot be earlier than the invoice date.".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct InvoiceService {
    invoice_repo: InvoiceRepository,
    product_repo: ProductRepository,
    distributor_repo: DistributorRepository,
    payment_repo: PaymentRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl InvoiceService {
    pub fn new(
        invoice_repo: InvoiceRepository,
        product_repo: ProductRepository,
        distributor_repo: DistributorRepository,
        payment_repo: PaymentRepository,
        user_repo: UserRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            invoice_repo,
            product_repo,
            distributor_repo,
            payment_repo,
            user_repo,
            pool,
        }
    }

    pub async fn list(&self, user: &User, filter: &InvoiceFilter) -> Result<Paginated<InvoiceSummary>, AppError> {
        let params = PageParams::new(filter.page, filter.limit);
        let (invoices, total) = self
            .invoice_repo
            .list(filter, staff_scope(user), params.limit(), params.offset())
            .await?;
        Ok(Paginated::new(invoices, &params, total))
    }

    pub async fn recent(&self, user: &User, limit: i64) -> Result<Vec<InvoiceSummary>, AppError> {
        let (invoices, _) = self
            .invoice_repo
            .list(&InvoiceFilter::default(), staff_scope(user), limit, 0)
            .await?;
        Ok(invoices)
    }

    /// Fatura completa: itens com nome/código do produto e pagamentos
    pub async fn detail(&self, user: &User, id: Uuid) -> Result<InvoiceDetail, AppError> {
        let summary = self
            .invoice_repo
            .find_summary(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;
        ensure_distributor_access(&self.pool, user, summary.invoice.distributor_id).await?;

        let items = self.invoice_repo.items(&self.pool, id).await?;
        let payments = self.payment_repo.list_for_invoice(&self.pool, id).await?;
        let distributor = self
            .distributor_repo
            .find_by_id(&self.pool, summary.invoice.distributor_id)
            .await?;

        Ok(InvoiceDetail {
            balance_due: summary.invoice.balance_due(),
            distributor_ntn: distributor.as_ref().and_then(|d| d.ntn_number.clone()),
            distributor_address: distributor.and_then(|d| d.address),
            invoice: summary,
            items,
            payments,
        })
    }

    pub async fn create(&self, user: &User, payload: &CreateInvoicePayload) -> Result<InvoiceDetail, AppError> {
        let invoice_date = payload.invoice_date.unwrap_or_else(|| Utc::now().date_naive());
        check_dates(invoice_date, payload.due_date)?;

        let mut tx = self.pool.begin().await?;

        self.ensure_billable_distributor(&mut *tx, user, payload.distributor_id).await?;
        let sales_staff_id = self.resolve_sales_staff(&mut *tx, user, payload.sales_staff_id).await?;

        let products = self.load_products(&mut tx, &payload.items).await?;
        let (items, totals) = price_items(&payload.items, &products)?;

        // Numeração serializada até o commit
        self.invoice_repo.lock_numbering(&mut *tx).await?;
        let prefix = invoice_number_prefix(invoice_date);
        let sequence = self.invoice_repo.max_sequence(&mut *tx, &prefix).await? + 1;
        let invoice_number = format_invoice_number(invoice_date, sequence);

        let status = if payload.send {
            InvoiceStatus::Sent
        } else {
            InvoiceStatus::Draft
        };

        let invoice = self
            .invoice_repo
            .insert(
                &mut *tx,
                &NewInvoice {
                    invoice_number: &invoice_number,
                    distributor_id: payload.distributor_id,
                    sales_staff_id,
                    invoice_date,
                    due_date: payload.due_date,
                    totals,
                    status,
                    notes: payload.notes.as_deref(),
                    created_by: user.id,
                },
            )
            .await?;
        self.invoice_repo.insert_items(&mut *tx, invoice.id, &items).await?;

        tx.commit().await?;

        tracing::info!(
            "🧾 Fatura {} criada ({} item(ns), total {})",
            invoice.invoice_number,
            items.len(),
            invoice.total_amount
        );
        self.detail(user, invoice.id).await
    }

    /// Edição só em rascunho: cabeçalho, itens (se enviados) e totais numa transação
    pub async fn update(&self, user: &User, id: Uuid, payload: &UpdateInvoicePayload) -> Result<InvoiceDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.lock_visible(&mut tx, user, id).await?;
        if current.status != InvoiceStatus::Draft {
            return Err(AppError::BadRequest("Only draft invoices can be edited.".to_string()));
        }

        let distributor_id = payload.distributor_id.unwrap_or(current.distributor_id);
        if distributor_id != current.distributor_id {
            self.ensure_billable_distributor(&mut *tx, user, distributor_id).await?;
        }

        let sales_staff_id = match payload.sales_staff_id {
            Some(requested) => self.resolve_sales_staff(&mut *tx, user, Some(requested)).await?,
            None => current.sales_staff_id,
        };

        let invoice_date = payload.invoice_date.unwrap_or(current.invoice_date);
        // `Some(None)` limpa o vencimento
        let due_date = payload.due_date.unwrap_or(current.due_date);
        check_dates(invoice_date, due_date)?;

        let totals = match &payload.items {
            Some(new_items) => {
                let products = self.load_products(&mut tx, new_items).await?;
                let (items, totals) = price_items(new_items, &products)?;
                self.invoice_repo.delete_items(&mut *tx, id).await?;
                self.invoice_repo.insert_items(&mut *tx, id, &items).await?;
                totals
            }
            None => InvoiceTotals {
                subtotal: current.subtotal,
                discount_amount: current.discount_amount,
                tax_amount: current.tax_amount,
                total_amount: current.total_amount,
            },
        };

        let notes = payload.notes.as_deref().or(current.notes.as_deref());
        self.invoice_repo
            .update_header(
                &mut *tx,
                id,
                &InvoiceHeaderChanges {
                    distributor_id,
                    sales_staff_id,
                    invoice_date,
                    due_date,
                    notes,
                    totals,
                },
            )
            .await?;

        tx.commit().await?;
        self.detail(user, id).await
    }

    /// Transição manual de status (ver `InvoiceStatus::can_transition_to`)
    pub async fn change_status(&self, user: &User, id: Uuid, next: InvoiceStatus) -> Result<Invoice, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.lock_visible(&mut tx, user, id).await?;
        if !current.status.can_transition_to(next, current.paid_amount) {
            let reason = if next == InvoiceStatus::Cancelled && !current.paid_amount.is_zero() {
                "Invoices with payments cannot be cancelled.".to_string()
            } else {
                format!(
                    "Cannot change invoice status from {} to {}.",
                    current.status.as_str(),
                    next.as_str()
                )
            };
            return Err(AppError::BadRequest(reason));
        }

        let invoice = self.invoice_repo.set_status(&mut *tx, id, next).await?;
        tx.commit().await?;

        tracing::info!(
            "🔄 Fatura {}: {} -> {}",
            invoice.invoice_number,
            current.status.as_str(),
            next.as_str()
        );
        Ok(invoice)
    }

    pub async fn cancel(&self, user: &User, id: Uuid) -> Result<Invoice, AppError> {
        self.change_status(user, id, InvoiceStatus::Cancelled).await
    }

    pub async fn mark_overdue(&self) -> Result<u64, AppError> {
        let updated = self.invoice_repo.mark_overdue().await?;
        if updated > 0 {
            tracing::info!("⏰ {} fatura(s) marcada(s) como vencida(s)", updated);
        }
        Ok(updated)
    }

    // --- auxiliares ---

    async fn lock_visible(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user: &User,
        id: Uuid,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .invoice_repo
            .lock_for_update(&mut **tx, id)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;
        ensure_distributor_access(&mut **tx, user, invoice.distributor_id).await?;
        Ok(invoice)
    }

    async fn load_products(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        items: &[InvoiceItemPayload],
    ) -> Result<HashMap<Uuid, Product>, AppError> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = self.product_repo.find_many(&mut **tx, &ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    // Roda na conexão da transação em curso
    async fn ensure_billable_distributor(
        &self,
        conn: &mut PgConnection,
        user: &User,
        distributor_id: Uuid,
    ) -> Result<(), AppError> {
        let distributor = self
            .distributor_repo
            .find_by_id(&mut *conn, distributor_id)
            .await?
            .ok_or(AppError::NotFound("Distributor"))?;
        if !distributor.is_active {
            return Err(AppError::BadRequest("Distributor is inactive.".to_string()));
        }
        ensure_distributor_access(&mut *conn, user, distributor_id).await
    }

    // Vendedor sempre fatura em nome próprio; admin pode indicar um usuário ativo
    async fn resolve_sales_staff(
        &self,
        conn: &mut PgConnection,
        user: &User,
        requested: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        if !user.is_admin() {
            return Ok(Some(user.id));
        }
        let Some(staff_id) = requested else {
            return Ok(None);
        };
        let staff = self
            .user_repo
            .find_by_id(&mut *conn, staff_id)
            .await?
            .ok_or(AppError::NotFound("Sales staff"))?;
        if !staff.is_active {
            return Err(AppError::BadRequest("Sales staff user is inactive.".to_string()));
        }
        Ok(Some(staff.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, tax_rate: Decimal, is_active: bool) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Cooking Oil 5L".into(),
            code: "CO-5L".into(),
            description: None,
            price,
            unit_of_measure: "carton".into(),
            category: Some("Edible Oils".into()),
            tax_rate,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product_id: Uuid, quantity: Decimal) -> InvoiceItemPayload {
        InvoiceItemPayload {
            product_id,
            quantity,
            unit_price: None,
            discount_percent: None,
            tax_rate: None,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<Uuid, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn invoice_number_uses_month_and_padded_sequence() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(invoice_number_prefix(date), "INV-202501-");
        assert_eq!(format_invoice_number(date, 1), "INV-202501-0001");
        assert_eq!(format_invoice_number(date, 42), "INV-202501-0042");
        assert_eq!(format_invoice_number(date, 12345), "INV-202501-12345");
    }

    #[test]
    fn items_default_to_product_price_and_tax() {
        let oil = product(dec!(100), dec!(17), true);
        let products = catalog(vec![oil.clone()]);

        let (items, totals) = price_items(&[item(oil.id, dec!(10))], &products).unwrap();
        assert_eq!(items[0].unit_price, dec!(100));
        assert_eq!(items[0].tax_rate, dec!(17));
        assert_eq!(items[0].discount_percent, dec!(0));
        assert_eq!(items[0].line_total, dec!(1170));
        assert_eq!(totals.total_amount, dec!(1170));
    }

    #[test]
    fn item_overrides_win_over_catalog() {
        let oil = product(dec!(100), dec!(17), true);
        let products = catalog(vec![oil.clone()]);
        let mut line = item(oil.id, dec!(10));
        line.unit_price = Some(dec!(90));
        line.discount_percent = Some(dec!(10));
        line.tax_rate = Some(dec!(0));

        let (items, totals) = price_items(&[line], &products).unwrap();
        assert_eq!(items[0].line_total, dec!(810));
        assert_eq!(totals.subtotal, dec!(900));
        assert_eq!(totals.discount_amount, dec!(90));
        assert_eq!(totals.tax_amount, dec!(0));
    }

    #[test]
    fn unknown_or_inactive_products_are_rejected() {
        let retired = product(dec!(50), dec!(0), false);
        let products = catalog(vec![retired.clone()]);

        let err = price_items(&[item(retired.id, dec!(1))], &products).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = price_items(&[item(Uuid::new_v4(), dec!(1))], &products).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn amounts_beyond_money_columns_are_bad_requests() {
        let oil = product(dec!(100), dec!(0), true);
        let products = catalog(vec![oil.clone()]);

        // Estoura o próprio Decimal
        let mut huge = item(oil.id, dec!(100000000000000000000));
        huge.unit_price = Some(dec!(100000000000000000000));
        let err = price_items(&[huge], &products).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Cabe no Decimal, mas não em NUMERIC(14, 2)
        let mut wide = item(oil.id, dec!(9999999999.99));
        wide.unit_price = Some(dec!(999999999999.99));
        let err = price_items(&[wide], &products).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn due_date_cannot_precede_invoice_date() {
        let invoice_date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(check_dates(invoice_date, None).is_ok());
        assert!(check_dates(invoice_date, NaiveDate::from_ymd_opt(2025, 3, 10)).is_ok());
        assert!(check_dates(invoice_date, NaiveDate::from_ymd_opt(2025, 3, 9)).is_err());
    }

    // --- com banco ---

    fn new_invoice(distributor_id: Uuid, product_id: Uuid, invoice_date: NaiveDate) -> CreateInvoicePayload {
        CreateInvoicePayload {
            distributor_id,
            sales_staff_id: None,
            invoice_date: Some(invoice_date),
            due_date: None,
            notes: None,
            send: false,
            items: vec![item(product_id, dec!(2))],
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn numbering_restarts_every_month(pool: PgPool) {
        let admin = test_support::admin(&pool).await;
        let dist = test_support::distributor(&pool, admin.id).await;
        let oil = test_support::product(&pool, "CO-5L", dec!(100), None).await;
        let service = test_support::state(&pool).invoice_service;

        let jan = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let feb = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();

        let first = service.create(&admin, &new_invoice(dist.id, oil.id, jan)).await.unwrap();
        let second = service.create(&admin, &new_invoice(dist.id, oil.id, jan)).await.unwrap();
        let next_month = service.create(&admin, &new_invoice(dist.id, oil.id, feb)).await.unwrap();

        assert_eq!(first.invoice.invoice.invoice_number, "INV-202501-0001");
        assert_eq!(second.invoice.invoice.invoice_number, "INV-202501-0002");
        assert_eq!(next_month.invoice.invoice.invoice_number, "INV-202502-0001");
        assert_eq!(first.invoice.invoice.total_amount, dec!(200));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_can_clear_or_keep_due_date(pool: PgPool) {
        let admin = test_support::admin(&pool).await;
        let dist = test_support::distributor(&pool, admin.id).await;
        let oil = test_support::product(&pool, "CO-5L", dec!(100), None).await;
        let service = test_support::state(&pool).invoice_service;

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let mut payload = new_invoice(dist.id, oil.id, date);
        payload.due_date = NaiveDate::from_ymd_opt(2025, 2, 9);
        let created = service.create(&admin, &payload).await.unwrap();
        let id = created.invoice.invoice.id;

        let keep: UpdateInvoicePayload = serde_json::from_str(r#"{"notes":"revisada"}"#).unwrap();
        let kept = service.update(&admin, id, &keep).await.unwrap();
        assert_eq!(kept.invoice.invoice.due_date, NaiveDate::from_ymd_opt(2025, 2, 9));

        let clear: UpdateInvoicePayload = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        let cleared = service.update(&admin, id, &clear).await.unwrap();
        assert_eq!(cleared.invoice.invoice.due_date, None);
        assert_eq!(cleared.invoice.invoice.notes.as_deref(), Some("revisada"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_switches_distributor_inside_the_lock(pool: PgPool) {
        let admin = test_support::admin(&pool).await;
        let first = test_support::distributor(&pool, admin.id).await;
        let second = test_support::distributor(&pool, admin.id).await;
        let oil = test_support::product(&pool, "CO-5L", dec!(100), None).await;
        let service = test_support::state(&pool).invoice_service;

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let created = service.create(&admin, &new_invoice(first.id, oil.id, date)).await.unwrap();

        let change: UpdateInvoicePayload =
            serde_json::from_value(serde_json::json!({ "distributorId": second.id })).unwrap();
        let updated = service
            .update(&admin, created.invoice.invoice.id, &change)
            .await
            .unwrap();
        assert_eq!(updated.invoice.invoice.distributor_id, second.id);

        let missing: UpdateInvoicePayload =
            serde_json::from_value(serde_json::json!({ "distributorId": Uuid::new_v4() })).unwrap();
        let err = service
            .update(&admin, created.invoice.invoice.id, &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Distributor")));
    }
}
