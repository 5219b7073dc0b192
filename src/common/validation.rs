// src/common/validation.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use validator::ValidationError;

/// Maior valor de uma coluna NUMERIC(14, 2) (preços, totais, pagamentos)
pub const MAX_MONEY: Decimal = dec!(999999999999.99);

/// Maior valor de uma coluna NUMERIC(12, 2) (quantidades)
pub const MAX_QUANTITY: Decimal = dec!(9999999999.99);

fn range_error(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    err
}

// O banco guarda 2 casas; mais que isso seria arredondado em silêncio
fn check_cents(val: &Decimal) -> Result<(), ValidationError> {
    if val.normalize().scale() > 2 {
        let mut err = ValidationError::new("scale");
        err.add_param("max_decimal_places".into(), &2);
        err.message = Some("Value cannot have more than 2 decimal places.".into());
        return Err(err);
    }
    Ok(())
}

/// Preço unitário: zero ou mais
pub fn validate_price(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        return Err(range_error("Value cannot be negative."));
    }
    if *val > MAX_MONEY {
        return Err(range_error("Value exceeds the maximum supported amount."));
    }
    check_cents(val)
}

/// Valor de pagamento: estritamente positivo
pub fn validate_amount(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(range_error("Value must be greater than zero."));
    }
    if *val > MAX_MONEY {
        return Err(range_error("Value exceeds the maximum supported amount."));
    }
    check_cents(val)
}

pub fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(range_error("Quantity must be greater than zero."));
    }
    if *val > MAX_QUANTITY {
        return Err(range_error("Quantity exceeds the maximum supported value."));
    }
    check_cents(val)
}

/// Percentuais (desconto, imposto, comissão) ficam entre 0 e 100
pub fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &100.0);
        err.message = Some("Percentage must be between 0 and 100.".into());
        return Err(err);
    }
    check_cents(val)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_bounds_are_inclusive() {
        assert!(validate_percentage(&dec!(0)).is_ok());
        assert!(validate_percentage(&dec!(100)).is_ok());
        assert!(validate_percentage(&dec!(12.5)).is_ok());
        assert!(validate_percentage(&dec!(100.01)).is_err());
        assert!(validate_percentage(&dec!(-1)).is_err());
        assert!(validate_percentage(&dec!(12.345)).is_err());
    }

    #[test]
    fn amount_rejects_zero_and_sub_cent_values() {
        assert!(validate_amount(&dec!(0)).is_err());
        assert!(validate_amount(&dec!(0.004)).is_err());
        assert!(validate_amount(&dec!(50.004)).is_err());
        assert!(validate_amount(&dec!(0.01)).is_ok());
        // Zeros à direita não contam como casas extras
        assert!(validate_amount(&dec!(50.000)).is_ok());
    }

    #[test]
    fn price_accepts_zero_but_not_negative_or_oversized() {
        assert!(validate_price(&dec!(0)).is_ok());
        assert!(validate_price(&dec!(-0.5)).is_err());
        assert!(validate_price(&MAX_MONEY).is_ok());
        assert!(validate_price(&dec!(1000000000000)).is_err());
        assert!(validate_price(&dec!(100000000000000000000)).is_err());
    }

    #[test]
    fn quantity_must_fit_its_column() {
        assert!(validate_quantity(&dec!(0.004)).is_err());
        assert!(validate_quantity(&dec!(2.5)).is_ok());
        assert!(validate_quantity(&MAX_QUANTITY).is_ok());
        assert!(validate_quantity(&dec!(10000000000)).is_err());
    }
}
