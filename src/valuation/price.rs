use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Amounts above this are not real sale prices and are dropped like unparsable ones.
const MAX_AMOUNT_DOLLARS: u64 = 1_000_000_000;

fn plausible(amount: &Decimal) -> bool {
    !amount.is_sign_negative() && *amount <= Decimal::from(MAX_AMOUNT_DOLLARS)
}

/// Parses a marketplace price label into an amount.
///
/// `"$15.50"` → 15.50, `"$15.50 to $20.00"` → 15.50 (lower bound only),
/// `"US $1,299.99"` → 1299.99. Anything that does not leave a non-negative
/// decimal of at most a billion behind (e.g. `"free"`) yields `None`.
pub fn parse_price_label(label: &str) -> Option<Decimal> {
    let lower_bound = label.split(" to ").next().unwrap_or_default();
    let numeric: String = lower_bound
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.')
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    if numeric.is_empty() {
        return None;
    }
    Decimal::from_str(&numeric).ok().filter(plausible)
}

/// Parses the raw numeric strings of a structured API response.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok().filter(plausible)
}

/// Arithmetic mean rounded half-away-from-zero to two decimal places.
/// `None` for an empty slice or a sum that overflows.
pub fn rounded_mean(amounts: &[Decimal]) -> Option<Decimal> {
    if amounts.is_empty() {
        return None;
    }
    let total = amounts
        .iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))?;
    let mean = total.checked_div(Decimal::from(amounts.len()))?;
    Some(mean.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn plain_dollar_amount() {
        assert_eq!(parse_price_label("$15.50"), Some(dec("15.50")));
        assert_eq!(parse_price_label("  $7 "), Some(dec("7")));
    }

    #[test]
    fn range_keeps_lower_bound() {
        assert_eq!(parse_price_label("$15.50 to $20.00"), Some(dec("15.50")));
    }

    #[test]
    fn currency_codes_and_separators_are_stripped() {
        assert_eq!(parse_price_label("US $1,299.99"), Some(dec("1299.99")));
        assert_eq!(parse_price_label("£12.00"), Some(dec("12.00")));
        assert_eq!(parse_price_label("EUR 9.95"), Some(dec("9.95")));
    }

    #[test]
    fn unparsable_labels_are_rejected() {
        assert_eq!(parse_price_label("free"), None);
        assert_eq!(parse_price_label(""), None);
        assert_eq!(parse_price_label("$"), None);
        assert_eq!(parse_price_label("$1.2.3"), None);
    }

    #[test]
    fn raw_amounts() {
        assert_eq!(parse_amount(" 19.99 "), Some(dec("19.99")));
        assert_eq!(parse_amount("-1.00"), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn mean_of_empty_sequence_is_absent() {
        assert_eq!(rounded_mean(&[]), None);
    }

    #[test]
    fn mean_is_rounded_to_cents() {
        let amounts = [dec("10.00"), dec("10.00"), dec("10.01")];
        assert_eq!(rounded_mean(&amounts), Some(dec("10.00")));
        let amounts = [dec("15.50"), dec("20.00")];
        assert_eq!(rounded_mean(&amounts), Some(dec("17.75")));
        let amounts = [dec("0.005")];
        assert_eq!(rounded_mean(&amounts), Some(dec("0.01")));
    }

    #[test]
    fn implausibly_large_amounts_are_rejected() {
        assert_eq!(parse_price_label("$79228162514264337593543950335"), None);
        assert_eq!(parse_price_label("$1,000,000,000.01"), None);
        assert_eq!(parse_amount("79228162514264337593543950335"), None);
        assert_eq!(
            parse_price_label("$1,000,000,000.00"),
            Some(dec("1000000000.00"))
        );
    }

    #[test]
    fn overflowing_sum_has_no_mean() {
        assert_eq!(rounded_mean(&[Decimal::MAX, Decimal::MAX]), None);
    }
}
