//! Property-based tests for invoice totals and numbering.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::invoice::numbering::{next_number, parse_sequence, year_prefix};
use crate::invoice::totals::{compute_totals, line_amount, round_money, totals_for_items};
use crate::invoice::types::LineItemInput;

/// Quantities from 0.001 to 1000.000.
fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 3))
}

/// Unit prices from 0.000 to 100000.000.
fn arb_unit_price() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000_000).prop_map(|n| Decimal::new(n, 3))
}

/// Tax rates from 0.00 to 100.00, or none.
fn arb_tax_rate() -> impl Strategy<Value = Option<Decimal>> {
    prop_oneof![
        Just(None),
        (0i64..=10_000).prop_map(|n| Some(Decimal::new(n, 2))),
    ]
}

fn arb_items() -> impl Strategy<Value = Vec<LineItemInput>> {
    prop::collection::vec(
        (arb_quantity(), arb_unit_price()).prop_map(|(quantity, unit_price)| LineItemInput {
            description: "item".to_string(),
            quantity,
            unit_price,
        }),
        1..20,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// total == subtotal + tax for every item set.
    #[test]
    fn prop_total_is_subtotal_plus_tax(items in arb_items(), rate in arb_tax_rate()) {
        let totals = totals_for_items(&items, rate);
        prop_assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    /// tax == round(subtotal * rate / 100), and zero without a rate.
    #[test]
    fn prop_tax_follows_rate(items in arb_items(), rate in arb_tax_rate()) {
        let totals = totals_for_items(&items, rate);
        let expected = rate.map_or(Decimal::ZERO, |r| round_money(totals.subtotal * r / Decimal::ONE_HUNDRED));
        prop_assert_eq!(totals.tax, expected);
    }

    /// Recomputing from stored line amounts gives the same totals as from input.
    #[test]
    fn prop_recompute_from_amounts_is_stable(items in arb_items(), rate in arb_tax_rate()) {
        let from_items = totals_for_items(&items, rate);
        let amounts: Vec<Decimal> = items.iter().map(|i| line_amount(i.quantity, i.unit_price)).collect();
        prop_assert_eq!(compute_totals(amounts, rate), from_items);
    }

    /// Removing an item never increases the subtotal.
    #[test]
    fn prop_removing_item_does_not_increase_subtotal(items in arb_items(), rate in arb_tax_rate()) {
        let all = totals_for_items(&items, rate);
        let fewer = totals_for_items(&items[1..], rate);
        prop_assert!(fewer.subtotal <= all.subtotal);
    }

    /// Successive allocations in one year strictly increase and share the prefix.
    #[test]
    fn prop_numbers_strictly_increase(year in 2000i32..2100, count in 1usize..40) {
        let mut issued: Vec<String> = Vec::new();
        for _ in 0..count {
            let next = next_number(issued.iter().map(String::as_str), year);
            prop_assert!(next.starts_with(&year_prefix(year)));
            if let Some(last) = issued.last() {
                prop_assert!(parse_sequence(&next, year) > parse_sequence(last, year));
            }
            issued.push(next);
        }
    }
}
