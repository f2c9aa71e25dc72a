//! Line amounts and invoice totals.
//!
//! Amounts are stored with three decimals (the millime for TND), so every
//! computed value is rounded half away from zero to [`MONEY_SCALE`].

use rust_decimal::{Decimal, RoundingStrategy};

use crate::business::{RATE_SCALE, fits_scale, rate_in_range};
use crate::invoice::error::InvoiceError;
use crate::invoice::types::{InvoiceTotals, LineItemInput};

/// Decimal places kept on stored amounts.
pub const MONEY_SCALE: u32 = 3;

/// Smallest accepted quantity.
pub const MIN_QUANTITY: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds an amount to the stored precision.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `quantity * unit_price`, rounded.
#[must_use]
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round_money(quantity * unit_price)
}

/// Computes totals from the current line amounts.
///
/// A missing tax rate means no tax.
#[must_use]
pub fn compute_totals<I>(amounts: I, tax_rate: Option<Decimal>) -> InvoiceTotals
where
    I: IntoIterator<Item = Decimal>,
{
    let subtotal = round_money(amounts.into_iter().sum());
    let tax = tax_rate.map_or(Decimal::ZERO, |rate| round_money(subtotal * rate / HUNDRED));

    InvoiceTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Computes totals directly from submitted line items.
#[must_use]
pub fn totals_for_items(items: &[LineItemInput], tax_rate: Option<Decimal>) -> InvoiceTotals {
    compute_totals(
        items.iter().map(|i| line_amount(i.quantity, i.unit_price)),
        tax_rate,
    )
}

/// Validates a single line item.
///
/// # Errors
///
/// Returns an error for an empty description, a quantity below 0.001 or a
/// negative unit price.
pub fn validate_item(item: &LineItemInput) -> Result<(), InvoiceError> {
    if item.description.trim().is_empty() {
        return Err(InvoiceError::MissingDescription);
    }
    validate_quantity(item.quantity)?;
    validate_unit_price(item.unit_price)
}

fn ensure_scale(field: &'static str, value: Decimal, max_scale: u32) -> Result<(), InvoiceError> {
    if fits_scale(value, max_scale) {
        Ok(())
    } else {
        Err(InvoiceError::TooPrecise {
            field,
            max_scale,
            value,
        })
    }
}

/// # Errors
///
/// Returns `InvoiceError::InvalidQuantity` below 0.001 and
/// `InvoiceError::TooPrecise` beyond three decimals.
pub fn validate_quantity(quantity: Decimal) -> Result<(), InvoiceError> {
    if quantity < MIN_QUANTITY {
        return Err(InvoiceError::InvalidQuantity(quantity));
    }
    ensure_scale("quantity", quantity, MONEY_SCALE)
}

/// # Errors
///
/// Returns `InvoiceError::NegativeUnitPrice` for negative prices and
/// `InvoiceError::TooPrecise` beyond three decimals.
pub fn validate_unit_price(unit_price: Decimal) -> Result<(), InvoiceError> {
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(InvoiceError::NegativeUnitPrice(unit_price));
    }
    ensure_scale("unit_price", unit_price, MONEY_SCALE)
}

/// Validates the full item list of a new or replaced invoice.
///
/// # Errors
///
/// Returns `InvoiceError::NoItems` for an empty list, or the first item error.
pub fn validate_items(items: &[LineItemInput]) -> Result<(), InvoiceError> {
    if items.is_empty() {
        return Err(InvoiceError::NoItems);
    }
    items.iter().try_for_each(validate_item)
}

/// # Errors
///
/// Returns `InvoiceError::InvalidTaxRate` outside `0..=100` and
/// `InvoiceError::TooPrecise` beyond two decimals.
pub fn validate_tax_rate(rate: Decimal) -> Result<(), InvoiceError> {
    if !rate_in_range(rate) {
        return Err(InvoiceError::InvalidTaxRate(rate));
    }
    ensure_scale("tax_rate", rate, RATE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, unit_price: Decimal) -> LineItemInput {
        LineItemInput {
            description: "Prestation".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_two_items_at_nineteen_percent() {
        let totals = totals_for_items(
            &[item(dec!(2), dec!(10)), item(dec!(1), dec!(5))],
            Some(dec!(19)),
        );
        assert_eq!(totals.subtotal, dec!(25));
        assert_eq!(totals.tax, dec!(4.75));
        assert_eq!(totals.total, dec!(29.75));
    }

    #[test]
    fn test_no_tax_rate_means_zero_tax() {
        let totals = compute_totals([dec!(12.500), dec!(7.5)], None);
        assert_eq!(totals.subtotal, dec!(20));
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, dec!(20));
    }

    #[test]
    fn test_tax_rounds_to_millimes() {
        // 10.005 * 7% = 0.70035
        let totals = compute_totals([dec!(10.005)], Some(dec!(7)));
        assert_eq!(totals.tax, dec!(0.700));
        assert_eq!(totals.total, dec!(10.705));
    }

    #[test]
    fn test_line_amount_rounding() {
        assert_eq!(line_amount(dec!(0.333), dec!(1.5)), dec!(0.500));
        assert_eq!(line_amount(dec!(3), dec!(0.3335)), dec!(1.001));
    }

    #[test]
    fn test_validate_items() {
        assert!(matches!(validate_items(&[]), Err(InvoiceError::NoItems)));
        assert!(matches!(
            validate_items(&[item(dec!(0), dec!(1))]),
            Err(InvoiceError::InvalidQuantity(_))
        ));
        assert!(matches!(
            validate_items(&[item(dec!(1), dec!(-0.001))]),
            Err(InvoiceError::NegativeUnitPrice(_))
        ));
        assert!(validate_items(&[item(dec!(0.001), dec!(0))]).is_ok());
    }

    #[test]
    fn test_inputs_beyond_stored_scale_are_rejected() {
        assert!(matches!(
            validate_item(&item(dec!(1.0005), dec!(10))),
            Err(InvoiceError::TooPrecise { field: "quantity", max_scale: 3, .. })
        ));
        assert!(matches!(
            validate_item(&item(dec!(1), dec!(10.0049))),
            Err(InvoiceError::TooPrecise { field: "unit_price", max_scale: 3, .. })
        ));
        assert!(matches!(
            validate_tax_rate(dec!(19.125)),
            Err(InvoiceError::TooPrecise { field: "tax_rate", max_scale: 2, .. })
        ));
        assert!(validate_item(&item(dec!(1.500000), dec!(10.250))).is_ok());
        assert!(validate_tax_rate(dec!(19.50)).is_ok());
    }

    #[test]
    fn test_accepted_inputs_survive_storage_unchanged() {
        let items = [item(dec!(2.5), dec!(4.002)), item(dec!(1), dec!(0.999))];
        let rate = dec!(19.13);
        validate_items(&items).unwrap();
        validate_tax_rate(rate).unwrap();

        let stored = |value: Decimal, scale: u32| {
            value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
        };
        for line in &items {
            assert_eq!(stored(line.quantity, 3), line.quantity);
            assert_eq!(stored(line.unit_price, 3), line.unit_price);
        }
        assert_eq!(stored(rate, 2), rate);

        let totals = totals_for_items(&items, Some(rate));
        assert_eq!(totals.tax, round_money(totals.subtotal * rate / dec!(100)));
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    #[test]
    fn test_validate_tax_rate_bounds() {
        assert!(validate_tax_rate(dec!(0)).is_ok());
        assert!(validate_tax_rate(dec!(100)).is_ok());
        assert!(validate_tax_rate(dec!(100.01)).is_err());
        assert!(validate_tax_rate(dec!(-1)).is_err());
    }
}
