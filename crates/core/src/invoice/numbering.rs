//! Invoice number allocation: `INV-<year>-<seq>`.
//!
//! The sequence restarts every calendar year and is zero-padded to three
//! digits; it keeps growing past 999 without truncation.

/// Fixed head of every generated number.
pub const NUMBER_HEAD: &str = "INV-";

/// Returns the prefix shared by all numbers of `year`, e.g. `INV-2026-`.
#[must_use]
pub fn year_prefix(year: i32) -> String {
    format!("{NUMBER_HEAD}{year}-")
}

/// Formats a number from its year and sequence.
#[must_use]
pub fn format_number(year: i32, sequence: u32) -> String {
    format!("{}{sequence:03}", year_prefix(year))
}

/// Extracts the sequence of `number` if it belongs to `year`.
///
/// Manually entered numbers that don't follow the pattern yield `None`.
#[must_use]
pub fn parse_sequence(number: &str, year: i32) -> Option<u32> {
    let rest = number.strip_prefix(&year_prefix(year))?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Allocates the next number for `year` given the business's existing numbers.
///
/// Takes the maximum existing sequence of that year and adds one, so gaps left
/// by deleted drafts are never reused below the maximum.
#[must_use]
pub fn next_number<'a, I>(existing: I, year: i32) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let last = existing
        .into_iter()
        .filter_map(|n| parse_sequence(n, year))
        .max()
        .unwrap_or(0);
    format_number(year, last.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_first_number_of_year() {
        assert_eq!(next_number(std::iter::empty(), 2026), "INV-2026-001");
    }

    #[test]
    fn test_next_uses_maximum_not_latest() {
        let existing = ["INV-2026-002", "INV-2026-010", "INV-2026-007"];
        assert_eq!(next_number(existing, 2026), "INV-2026-011");
    }

    #[test]
    fn test_other_years_and_manual_numbers_ignored() {
        let existing = ["INV-2025-120", "CUSTOM-9", "INV-2026-abc", "INV-2026-004"];
        assert_eq!(next_number(existing, 2026), "INV-2026-005");
    }

    #[test]
    fn test_sequence_grows_past_three_digits() {
        assert_eq!(next_number(["INV-2026-999"], 2026), "INV-2026-1000");
    }

    #[rstest]
    #[case("INV-2026-001", Some(1))]
    #[case("INV-2026-042", Some(42))]
    #[case("INV-2026-", None)]
    #[case("INV-2026--1", None)]
    #[case("INV-2027-001", None)]
    fn test_parse_sequence(#[case] number: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_sequence(number, 2026), expected);
    }
}
