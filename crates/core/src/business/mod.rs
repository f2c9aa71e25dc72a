//! Business registry rules.
//!
//! Validation for business records and their tax configuration: Matricule
//! Fiscal format, tax-rate bounds and the defaults a new business starts with.

use rust_decimal::Decimal;
use thiserror::Error;

use factura_shared::AppError;

/// Currency assigned when registration does not name one.
pub const DEFAULT_CURRENCY: &str = "TND";

/// Invoice prefix stored in new business settings.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV-";

/// Payment terms in days stored in new business settings.
pub const DEFAULT_PAYMENT_TERMS: i32 = 30;

/// Decimal places stored on tax-rate percentages.
pub const RATE_SCALE: u32 = 2;

/// Errors raised by business validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusinessError {
    /// Tax id does not follow `NNNNNNN/X/A/E/NNN`.
    #[error("Invalid Matricule Fiscal format (expected NNNNNNN/X/A/E/NNN)")]
    InvalidTaxId,

    /// Tax rate outside 0..=100.
    #[error("Tax rate must be between 0 and 100, got {0}")]
    RateOutOfRange(Decimal),

    /// Tax rate has more decimals than are stored.
    #[error("Tax rate allows at most 2 decimals, got {0}")]
    RateTooPrecise(Decimal),

    /// Currency is not a three-letter code.
    #[error("Currency must be a 3-letter code")]
    InvalidCurrency,

    /// Payment terms are negative.
    #[error("Payment terms must not be negative")]
    NegativePaymentTerms,
}

impl From<BusinessError> for AppError {
    fn from(err: BusinessError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Returns true when `rate` is a percentage in `0..=100`.
#[must_use]
pub fn rate_in_range(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED
}

/// Returns true when `value` needs at most `scale` decimals.
///
/// Trailing zeros do not count, so `19.500` fits a scale of 2.
#[must_use]
pub fn fits_scale(value: Decimal, scale: u32) -> bool {
    value.normalize().scale() <= scale
}

/// Checks a tax-rate percentage.
///
/// # Errors
///
/// Returns `BusinessError::RateOutOfRange` outside `0..=100` and
/// `BusinessError::RateTooPrecise` beyond [`RATE_SCALE`] decimals.
pub fn validate_rate(rate: Decimal) -> Result<(), BusinessError> {
    if !rate_in_range(rate) {
        Err(BusinessError::RateOutOfRange(rate))
    } else if !fits_scale(rate, RATE_SCALE) {
        Err(BusinessError::RateTooPrecise(rate))
    } else {
        Ok(())
    }
}

/// Validates a Tunisian Matricule Fiscal.
///
/// The expected shape is seven digits, then a control letter, a VAT code
/// letter, a category letter and a three-digit establishment number, all
/// separated by `/` (for example `1234567/A/B/M/000`).
///
/// # Errors
///
/// Returns `BusinessError::InvalidTaxId` when the value does not match.
pub fn validate_tax_id(tax_id: &str) -> Result<(), BusinessError> {
    let tax_id = tax_id.trim();
    let length = tax_id.chars().count();
    if !(7..=20).contains(&length) {
        return Err(BusinessError::InvalidTaxId);
    }

    let parts: Vec<&str> = tax_id.split('/').collect();
    let [registry, control, vat, category, establishment] = parts.as_slice() else {
        return Err(BusinessError::InvalidTaxId);
    };

    let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
    let letter = |s: &str| s.len() == 1 && s.chars().all(|c| c.is_ascii_uppercase());

    if digits(registry, 7)
        && letter(control)
        && letter(vat)
        && letter(category)
        && digits(establishment, 3)
    {
        Ok(())
    } else {
        Err(BusinessError::InvalidTaxId)
    }
}

/// Validates and normalises a currency code to upper case.
///
/// # Errors
///
/// Returns `BusinessError::InvalidCurrency` unless three ASCII letters.
pub fn normalize_currency(currency: &str) -> Result<String, BusinessError> {
    let currency = currency.trim();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(currency.to_ascii_uppercase())
    } else {
        Err(BusinessError::InvalidCurrency)
    }
}

/// Checks payment terms.
///
/// # Errors
///
/// Returns `BusinessError::NegativePaymentTerms` when `days < 0`.
pub const fn validate_payment_terms(days: i32) -> Result<(), BusinessError> {
    if days < 0 {
        Err(BusinessError::NegativePaymentTerms)
    } else {
        Ok(())
    }
}
