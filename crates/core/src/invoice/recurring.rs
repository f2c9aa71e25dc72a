//! Recurring schedule date math.
//!
//! Only `next_generation_date` is maintained; nothing generates invoices
//! automatically when the date arrives.

use chrono::{Months, NaiveDate};

use crate::invoice::error::InvoiceError;
use crate::invoice::types::RecurringFrequency;

/// Checks that a schedule does not end before it starts.
///
/// # Errors
///
/// Returns `InvoiceError::InvalidSchedule` when `end < start`.
pub fn validate_schedule(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), InvoiceError> {
    match end {
        Some(end) if end < start => Err(InvoiceError::InvalidSchedule { start, end }),
        _ => Ok(()),
    }
}

/// Computes the next generation date: `start + 1/3/12 months`.
///
/// Month-end dates clamp (Jan 31 + 1 month is Feb 28/29). Returns `Ok(None)`
/// when the next date would fall after `end`.
///
/// # Errors
///
/// Returns `InvoiceError::DateOutOfRange` if the date overflows the calendar.
pub fn next_generation_date(
    start: NaiveDate,
    frequency: RecurringFrequency,
    end: Option<NaiveDate>,
) -> Result<Option<NaiveDate>, InvoiceError> {
    let next = start
        .checked_add_months(Months::new(frequency.months()))
        .ok_or(InvoiceError::DateOutOfRange)?;

    Ok(match end {
        Some(end) if next > end => None,
        _ => Some(next),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(RecurringFrequency::Monthly, date(2026, 2, 15))]
    #[case(RecurringFrequency::Quarterly, date(2026, 4, 15))]
    #[case(RecurringFrequency::Yearly, date(2027, 1, 15))]
    fn test_next_date_by_frequency(#[case] frequency: RecurringFrequency, #[case] expected: NaiveDate) {
        let next = next_generation_date(date(2026, 1, 15), frequency, None).unwrap();
        assert_eq!(next, Some(expected));
    }

    #[test]
    fn test_month_end_clamps() {
        let next =
            next_generation_date(date(2026, 1, 31), RecurringFrequency::Monthly, None).unwrap();
        assert_eq!(next, Some(date(2026, 2, 28)));

        let leap =
            next_generation_date(date(2028, 1, 31), RecurringFrequency::Monthly, None).unwrap();
        assert_eq!(leap, Some(date(2028, 2, 29)));
    }

    #[test]
    fn test_past_end_date_yields_none() {
        let next = next_generation_date(
            date(2026, 1, 1),
            RecurringFrequency::Yearly,
            Some(date(2026, 6, 30)),
        )
        .unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn test_end_date_inclusive() {
        let next = next_generation_date(
            date(2026, 1, 1),
            RecurringFrequency::Monthly,
            Some(date(2026, 2, 1)),
        )
        .unwrap();
        assert_eq!(next, Some(date(2026, 2, 1)));
    }

    #[test]
    fn test_validate_schedule() {
        assert!(validate_schedule(date(2026, 1, 1), None).is_ok());
        assert!(validate_schedule(date(2026, 1, 1), Some(date(2026, 1, 1))).is_ok());
        assert!(matches!(
            validate_schedule(date(2026, 2, 1), Some(date(2026, 1, 1))),
            Err(InvoiceError::InvalidSchedule { .. })
        ));
    }
}
