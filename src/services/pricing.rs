// src/services/pricing.rs

//! Cálculo de totais de fatura. Único lugar onde a aritmética de linha vive:
//! criação e edição de faturas passam por aqui.

use rust_decimal::{Decimal, RoundingStrategy};

/// Valores já resolvidos de uma linha (preço/alíquota do produto aplicados)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInput {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub gross: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `(unit_price × quantity × (1 − discount%)) × (1 + tax%)`, decomposto em partes
/// arredondadas para que a soma das partes feche com o total da linha.
/// `None` quando algum passo estoura a faixa do `Decimal`.
pub fn line_amounts(input: &LineInput) -> Option<LineAmounts> {
    let gross = round_money(input.unit_price.checked_mul(input.quantity)?);
    let discount = round_money(
        gross
            .checked_mul(input.discount_percent)?
            .checked_div(Decimal::ONE_HUNDRED)?,
    );
    let net = gross.checked_sub(discount)?;
    let tax = round_money(
        net.checked_mul(input.tax_rate)?
            .checked_div(Decimal::ONE_HUNDRED)?,
    );

    Some(LineAmounts {
        gross,
        discount,
        tax,
        line_total: net.checked_add(tax)?,
    })
}

pub fn invoice_totals<'a, I>(lines: I) -> Option<InvoiceTotals>
where
    I: IntoIterator<Item = &'a LineAmounts>,
{
    lines
        .into_iter()
        .try_fold(InvoiceTotals::default(), |acc, line| {
            Some(InvoiceTotals {
                subtotal: acc.subtotal.checked_add(line.gross)?,
                discount_amount: acc.discount_amount.checked_add(line.discount)?,
                tax_amount: acc.tax_amount.checked_add(line.tax)?,
                total_amount: acc.total_amount.checked_add(line.line_total)?,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: Decimal, unit_price: Decimal, discount: Decimal, tax: Decimal) -> LineInput {
        LineInput {
            quantity,
            unit_price,
            discount_percent: discount,
            tax_rate: tax,
        }
    }

    fn amounts_of(input: LineInput) -> LineAmounts {
        line_amounts(&input).unwrap()
    }

    #[test]
    fn plain_line_is_price_times_quantity() {
        let amounts = amounts_of(line(dec!(3), dec!(150.00), dec!(0), dec!(0)));
        assert_eq!(amounts.gross, dec!(450.00));
        assert_eq!(amounts.discount, dec!(0));
        assert_eq!(amounts.tax, dec!(0));
        assert_eq!(amounts.line_total, dec!(450.00));
    }

    #[test]
    fn discount_applies_before_tax() {
        // 10 × 100 = 1000; -10% = 900; +17% = 1053
        let amounts = amounts_of(line(dec!(10), dec!(100), dec!(10), dec!(17)));
        assert_eq!(amounts.gross, dec!(1000));
        assert_eq!(amounts.discount, dec!(100));
        assert_eq!(amounts.tax, dec!(153));
        assert_eq!(amounts.line_total, dec!(1053));
    }

    #[test]
    fn parts_are_rounded_to_cents() {
        // 3 × 33.33 = 99.99; 5% = 4.9995 -> 5.00; net 94.99; 16% = 15.1984 -> 15.20
        let amounts = amounts_of(line(dec!(3), dec!(33.33), dec!(5), dec!(16)));
        assert_eq!(amounts.discount, dec!(5.00));
        assert_eq!(amounts.tax, dec!(15.20));
        assert_eq!(amounts.line_total, dec!(110.19));
        assert_eq!(
            amounts.gross - amounts.discount + amounts.tax,
            amounts.line_total
        );
    }

    #[test]
    fn full_discount_zeroes_the_line() {
        let amounts = amounts_of(line(dec!(2), dec!(99.50), dec!(100), dec!(17)));
        assert_eq!(amounts.line_total, dec!(0));
        assert_eq!(amounts.tax, dec!(0));
    }

    #[test]
    fn invoice_totals_sum_the_lines() {
        let lines = [
            amounts_of(line(dec!(10), dec!(100), dec!(10), dec!(17))),
            amounts_of(line(dec!(1), dec!(250), dec!(0), dec!(0))),
        ];
        let totals = invoice_totals(&lines).unwrap();
        assert_eq!(totals.subtotal, dec!(1250));
        assert_eq!(totals.discount_amount, dec!(100));
        assert_eq!(totals.tax_amount, dec!(153));
        assert_eq!(totals.total_amount, dec!(1303));
        assert_eq!(
            totals.subtotal - totals.discount_amount + totals.tax_amount,
            totals.total_amount
        );
    }

    #[test]
    fn empty_invoice_totals_are_zero() {
        let totals = invoice_totals(&[]);
        assert_eq!(totals, Some(InvoiceTotals::default()));
    }

    #[test]
    fn huge_quantity_times_price_overflows_to_none() {
        let input = line(dec!(100000000000000000000), dec!(100000000000000000000), dec!(0), dec!(0));
        assert_eq!(line_amounts(&input), None);
    }

    #[test]
    fn overflowing_sum_of_lines_is_none() {
        let big = amounts_of(line(dec!(1), Decimal::MAX, dec!(0), dec!(0)));
        assert_eq!(invoice_totals(&[big, big]), None);
    }
}
