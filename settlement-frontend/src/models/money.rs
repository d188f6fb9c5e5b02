//! Money arithmetic and display.
//!
//! Amounts are `Decimal` end to end. Anything that leaves the process (a
//! payload field, a rendered total) is rounded to two places first.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};

/// Round to cents, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `value + bonus`, each rounded before and the sum rounded after.
pub fn rounded_sum(value: Decimal, bonus: Decimal) -> Decimal {
    round2(round2(value) + round2(bonus))
}

/// Colombian peso display: `$ 1.234.568`. No decimals, `.` groups thousands.
pub fn format_currency(value: Decimal) -> String {
    let whole = value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .abs()
        .trunc()
        .to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if value.is_sign_negative() && !grouped.chars().all(|c| c == '0') {
        format!("-$ {}", grouped)
    } else {
        format!("$ {}", grouped)
    }
}

/// Accepts a number, a numeric string or `null` (read as zero).
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(d("10.005")), d("10.01"));
        assert_eq!(round2(d("-10.005")), d("-10.01"));
        assert_eq!(round2(d("10.004")), d("10.00"));
    }

    #[test]
    fn rounding_is_idempotent_and_keeps_zero() {
        assert_eq!(round2(d("12345.678")), d("12345.68"));
        assert_eq!(round2(Decimal::ZERO), Decimal::ZERO);
        for raw in ["12345.678", "0.005", "-7.125", "85000", "0.1"] {
            let once = round2(d(raw));
            assert_eq!(round2(once), once, "{}", raw);
        }
    }

    #[test]
    fn rounded_sum_rounds_each_term() {
        assert_eq!(rounded_sum(d("0.005"), d("0.005")), d("0.02"));
        assert_eq!(rounded_sum(d("100000"), d("0")), d("100000"));
    }

    #[test]
    fn currency_groups_thousands_without_decimals() {
        assert_eq!(format_currency(d("1234567.8")), "$ 1.234.568");
        assert_eq!(format_currency(d("999")), "$ 999");
        assert_eq!(format_currency(d("1000")), "$ 1.000");
        assert_eq!(format_currency(Decimal::ZERO), "$ 0");
        assert_eq!(format_currency(d("-25000")), "-$ 25.000");
    }

    #[test]
    fn lenient_decimal_reads_strings_numbers_and_null() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(deserialize_with = "lenient_decimal")]
            amount: Decimal,
        }

        let from_string: Row = serde_json::from_str(r#"{"amount": "12.50"}"#).unwrap();
        let from_number: Row = serde_json::from_str(r#"{"amount": 12.5}"#).unwrap();
        let from_null: Row = serde_json::from_str(r#"{"amount": null}"#).unwrap();
        assert_eq!(from_string.amount, d("12.50"));
        assert_eq!(from_number.amount, d("12.5"));
        assert_eq!(from_null.amount, Decimal::ZERO);
    }
}
