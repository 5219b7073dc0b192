// src/models/payment.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::validate_amount;
use crate::models::invoice::Invoice;

// Mapeia o CREATE TYPE payment_method do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    BankTransfer,
    Online,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Check => "Check",
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::Online => "Online",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    #[schema(value_type = String, format = Date)]
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub check_number: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub check_date: Option<NaiveDate>,
    pub bank_name: Option<String>,
    pub reference_number: Option<String>,
    pub collected_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub payment: Payment,
    pub invoice_number: String,
    pub distributor_id: Uuid,
    pub distributor_name: String,
    pub collected_by_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment: Payment,
    // Fatura já com paid_amount/status recalculados pelo trigger
    pub invoice: Invoice,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_method_details"))]
pub struct CreatePaymentPayload {
    pub invoice_id: Uuid,

    #[schema(value_type = Option<String>, format = Date)]
    pub payment_date: Option<NaiveDate>,

    #[validate(custom(function = "validate_amount"))]
    #[schema(example = "5000.00")]
    pub amount: Decimal,

    pub payment_method: PaymentMethod,

    pub check_number: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub check_date: Option<NaiveDate>,
    pub bank_name: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

// Cheque exige número; transferência exige banco ou referência
fn validate_method_details(payload: &CreatePaymentPayload) -> Result<(), ValidationError> {
    match payload.payment_method {
        PaymentMethod::Check if is_blank(&payload.check_number) => {
            let mut err = ValidationError::new("check_number_required");
            err.message = Some("Check number is required for check payments.".into());
            Err(err)
        }
        PaymentMethod::BankTransfer
            if is_blank(&payload.reference_number) && is_blank(&payload.bank_name) =>
        {
            let mut err = ValidationError::new("bank_reference_required");
            err.message = Some("Bank name or reference number is required for bank transfers.".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaymentFilter {
    pub invoice_id: Option<Uuid>,
    pub distributor_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payload(method: PaymentMethod) -> CreatePaymentPayload {
        CreatePaymentPayload {
            invoice_id: Uuid::new_v4(),
            payment_date: None,
            amount: dec!(100),
            payment_method: method,
            check_number: None,
            check_date: None,
            bank_name: None,
            reference_number: None,
            notes: None,
        }
    }

    #[test]
    fn cash_needs_no_details() {
        assert!(payload(PaymentMethod::Cash).validate().is_ok());
    }

    #[test]
    fn check_requires_check_number() {
        let mut p = payload(PaymentMethod::Check);
        assert!(p.validate().is_err());

        p.check_number = Some("  ".into());
        assert!(p.validate().is_err());

        p.check_number = Some("004512".into());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn bank_transfer_requires_bank_or_reference() {
        let mut p = payload(PaymentMethod::BankTransfer);
        assert!(p.validate().is_err());

        p.reference_number = Some("FT2501150042".into());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn amount_must_be_positive() {
        let mut p = payload(PaymentMethod::Online);
        p.amount = dec!(0);
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));
    }

    #[test]
    fn fractional_cent_amount_is_rejected() {
        let mut p = payload(PaymentMethod::Cash);
        p.amount = dec!(0.004);
        assert!(p.validate().unwrap_err().field_errors().contains_key("amount"));

        p.amount = dec!(50.004);
        assert!(p.validate().is_err());

        p.amount = dec!(50.01);
        assert!(p.validate().is_ok());
    }
}
