// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{validate_percentage, validate_price, validate_quantity};
use crate::models::payment::Payment;

// Mapeia o CREATE TYPE invoice_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartialPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::PartialPaid => "partial_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Aceita pagamentos apenas depois de enviada e enquanto houver saldo
    pub fn accepts_payments(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartialPaid | InvoiceStatus::Overdue
        )
    }

    /// Transições manuais. `partial_paid` e `paid` só chegam pelo trigger de pagamentos;
    /// cancelamento exige fatura sem nenhum valor pago.
    pub fn can_transition_to(&self, next: InvoiceStatus, paid_amount: Decimal) -> bool {
        use InvoiceStatus::*;
        match (*self, next) {
            (Draft, Sent) => true,
            (Draft, Cancelled) => true,
            (Sent, Cancelled) | (Overdue, Cancelled) => paid_amount.is_zero(),
            (Sent, Overdue) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    #[schema(example = "INV-202501-0001")]
    pub invoice_number: String,
    pub distributor_id: Uuid,
    pub sales_staff_id: Option<Uuid>,
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub invoice_date: NaiveDate,
    #[schema(value_type = Option<String>, format = Date, example = "2025-02-14")]
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn balance_due(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }
}

// Linha da listagem: fatura + nomes para exibição
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub invoice: Invoice,
    pub distributor_name: String,
    pub sales_staff_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_rate: Decimal,
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub item: InvoiceItem,
    pub product_name: String,
    pub product_code: String,
    pub unit_of_measure: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: InvoiceSummary,
    pub balance_due: Decimal,
    pub distributor_ntn: Option<String>,
    pub distributor_address: Option<String>,
    pub items: Vec<InvoiceItemDetail>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemPayload {
    pub product_id: Uuid,

    #[validate(custom(function = "validate_quantity"))]
    #[schema(example = "10")]
    pub quantity: Decimal,

    // Quando omitido, usa o preço atual do produto
    #[validate(custom(function = "validate_price"))]
    pub unit_price: Option<Decimal>,

    #[validate(custom(function = "validate_percentage"))]
    pub discount_percent: Option<Decimal>,

    // Quando omitido, usa a alíquota do produto
    #[validate(custom(function = "validate_percentage"))]
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    pub distributor_id: Uuid,

    // Só o admin escolhe; vendedor sempre fatura em nome próprio
    pub sales_staff_id: Option<Uuid>,

    #[schema(value_type = Option<String>, format = Date)]
    pub invoice_date: Option<NaiveDate>,

    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,

    pub notes: Option<String>,

    // Cria já como "sent" quando verdadeiro
    #[serde(default)]
    pub send: bool,

    #[validate(length(min = 1, message = "Invoice must have at least one item."), nested)]
    pub items: Vec<InvoiceItemPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoicePayload {
    pub distributor_id: Option<Uuid>,
    pub sales_staff_id: Option<Uuid>,

    #[schema(value_type = Option<String>, format = Date)]
    pub invoice_date: Option<NaiveDate>,

    // Ausente mantém, `null` limpa, valor substitui
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<Option<NaiveDate>>,

    pub notes: Option<String>,

    // Se presente, substitui todos os itens
    #[validate(length(min = 1, message = "Invoice must have at least one item."), nested)]
    pub items: Option<Vec<InvoiceItemPayload>>,
}

// Distingue campo ausente de `null` explícito
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: InvoiceStatus,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub distributor_id: Option<Uuid>,
    pub sales_staff_id: Option<Uuid>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use InvoiceStatus::*;

    #[test]
    fn draft_can_be_sent_or_cancelled() {
        assert!(Draft.can_transition_to(Sent, dec!(0)));
        assert!(Draft.can_transition_to(Cancelled, dec!(0)));
        assert!(!Draft.can_transition_to(Paid, dec!(0)));
    }

    #[test]
    fn cancellation_requires_zero_payments() {
        assert!(Sent.can_transition_to(Cancelled, dec!(0)));
        assert!(!Sent.can_transition_to(Cancelled, dec!(150.00)));
        assert!(!PartialPaid.can_transition_to(Cancelled, dec!(0)));
        assert!(Overdue.can_transition_to(Cancelled, dec!(0)));
    }

    #[test]
    fn payment_driven_statuses_are_not_manual() {
        assert!(!Sent.can_transition_to(PartialPaid, dec!(10)));
        assert!(!Sent.can_transition_to(Paid, dec!(10)));
        assert!(!Overdue.can_transition_to(Paid, dec!(10)));
    }

    #[test]
    fn terminal_statuses_do_not_move() {
        for next in [Draft, Sent, PartialPaid, Overdue, Cancelled] {
            assert!(!Paid.can_transition_to(next, dec!(0)));
        }
        for next in [Draft, Sent, PartialPaid, Paid, Overdue] {
            assert!(!Cancelled.can_transition_to(next, dec!(0)));
        }
    }

    #[test]
    fn only_open_invoices_accept_payments() {
        assert!(Sent.accepts_payments());
        assert!(PartialPaid.accepts_payments());
        assert!(Overdue.accepts_payments());
        assert!(!Draft.accepts_payments());
        assert!(!Paid.accepts_payments());
        assert!(!Cancelled.accepts_payments());
    }

    fn item_json() -> serde_json::Value {
        serde_json::json!({
            "productId": "00000000-0000-0000-0000-000000000001",
            "quantity": 2
        })
    }

    #[test]
    fn invoice_without_items_fails_validation() {
        let payload: CreateInvoicePayload = serde_json::from_value(serde_json::json!({
            "distributorId": "00000000-0000-0000-0000-000000000002",
            "items": []
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn nested_item_errors_are_reported() {
        let mut bad_item = item_json();
        bad_item["quantity"] = serde_json::json!(0.004);
        let payload: CreateInvoicePayload = serde_json::from_value(serde_json::json!({
            "distributorId": "00000000-0000-0000-0000-000000000002",
            "items": [item_json(), bad_item]
        }))
        .unwrap();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn oversized_unit_price_is_rejected() {
        let mut item = item_json();
        item["unitPrice"] = serde_json::json!(1e20);
        let payload: InvoiceItemPayload = serde_json::from_value(item).unwrap();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn update_due_date_distinguishes_absent_from_null() {
        let absent: UpdateInvoicePayload = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: UpdateInvoicePayload = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateInvoicePayload =
            serde_json::from_str(r#"{"dueDate":"2025-03-01"}"#).unwrap();
        assert_eq!(set.due_date, Some(NaiveDate::from_ymd_opt(2025, 3, 1)));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&PartialPaid).unwrap(), "\"partial_paid\"");
        assert_eq!(PartialPaid.as_str(), "partial_paid");
    }
}
