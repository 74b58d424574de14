//! Value formatting for rendered documents: US currency, long dates, placeholders.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::value::{FieldValue, Row, ValueMap, present, text_of};

/// Shown wherever an optional value was left empty.
pub const NOT_SPECIFIED: &str = "[not specified]";
/// Fallback for a required date that is missing (draft renders).
pub const DATE_TBD: &str = "[date to be confirmed]";
/// Fallback for a required name that is missing.
pub const NAME_TBD: &str = "[name to be confirmed]";
/// Fallback for a required amount that is missing.
pub const AMOUNT_TBD: &str = "[amount to be confirmed]";

/// `$1,234.50`: two decimals, comma-grouped thousands.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}${}.{frac}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `2026-01-05` → `January 5, 2026`. `None` if the text is not an ISO date.
pub fn format_long_date(iso: &str) -> Option<String> {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%B %-d, %Y").to_string())
}

/// Decimal amount of a captured value, keeping text exact where possible.
pub fn parse_amount(value: &FieldValue) -> Option<Decimal> {
    match value {
        FieldValue::Text(s) => Decimal::from_str(s.trim())
            .ok()
            .or_else(|| value.as_number().and_then(|n| Decimal::try_from(n).ok())),
        FieldValue::Number(n) => Decimal::try_from(*n).ok(),
        FieldValue::Rows(_) => None,
    }
}

/// Read-only accessor used by templates.
///
/// Every getter is total: absent or unparseable values fall back to a
/// placeholder (or to the raw text for dates that are not ISO formatted).
pub(crate) struct Fields<'a> {
    values: &'a ValueMap,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(values: &'a ValueMap) -> Self {
        Self { values }
    }

    pub(crate) fn text(&self, key: &str) -> Option<String> {
        text_of(self.values, key)
    }

    pub(crate) fn text_or(&self, key: &str, fallback: &str) -> String {
        self.text(key).unwrap_or_else(|| fallback.to_string())
    }

    pub(crate) fn optional(&self, key: &str) -> String {
        self.text_or(key, NOT_SPECIFIED)
    }

    pub(crate) fn name(&self, key: &str) -> String {
        self.text_or(key, NAME_TBD)
    }

    pub(crate) fn date_or(&self, key: &str, fallback: &str) -> String {
        match self.text(key) {
            Some(raw) => format_long_date(&raw).unwrap_or(raw),
            None => fallback.to_string(),
        }
    }

    pub(crate) fn currency(&self, key: &str) -> Option<String> {
        present(self.values, key)
            .and_then(parse_amount)
            .map(format_currency)
    }

    pub(crate) fn currency_or(&self, key: &str, fallback: &str) -> String {
        self.currency(key).unwrap_or_else(|| fallback.to_string())
    }

    /// Whole numbers without a trailing `.0`.
    pub(crate) fn number(&self, key: &str) -> Option<String> {
        let n = present(self.values, key)?.as_number()?;
        if n.fract() == 0.0 && n.abs() < 1e15 {
            Some(format!("{}", n as i64))
        } else {
            Some(n.to_string())
        }
    }

    pub(crate) fn rows(&self, key: &str) -> &'a [Row] {
        self.values
            .get(key)
            .and_then(FieldValue::rows)
            .unwrap_or_default()
    }
}

/// Trimmed, non-empty cell of a repeatable row.
pub(crate) fn cell<'r>(row: &'r Row, key: &str) -> Option<&'r str> {
    row.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> String {
        format_currency(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn currency_grouping_and_decimals() {
        assert_eq!(amount("0"), "$0.00");
        assert_eq!(amount("5"), "$5.00");
        assert_eq!(amount("999.9"), "$999.90");
        assert_eq!(amount("1000"), "$1,000.00");
        assert_eq!(amount("1234567.891"), "$1,234,567.89");
        assert_eq!(amount("-2500.5"), "-$2,500.50");
    }

    #[test]
    fn currency_rounds_half_away_from_zero() {
        assert_eq!(amount("0.005"), "$0.01");
        assert_eq!(amount("-0.001"), "$0.00");
    }

    #[test]
    fn long_dates() {
        assert_eq!(format_long_date("2026-01-05").as_deref(), Some("January 5, 2026"));
        assert_eq!(format_long_date(" 2025-12-31 ").as_deref(), Some("December 31, 2025"));
        assert_eq!(format_long_date("05/01/2026"), None);
    }

    #[test]
    fn amounts_from_text_and_numbers() {
        assert_eq!(
            parse_amount(&FieldValue::text("18000.50")),
            Some(Decimal::new(1800050, 2))
        );
        assert_eq!(parse_amount(&FieldValue::Number(250.0)), Some(Decimal::from(250)));
        assert_eq!(parse_amount(&FieldValue::text("lots")), None);
    }

    #[test]
    fn accessor_fallbacks() {
        let mut values = ValueMap::new();
        values.insert("when".into(), FieldValue::text("2026-02-03"));
        values.insert("odd".into(), FieldValue::text("next spring"));
        values.insert("hours".into(), FieldValue::text("10"));
        values.insert("fee".into(), FieldValue::text("1500"));
        let fields = Fields::new(&values);

        assert_eq!(fields.date_or("when", DATE_TBD), "February 3, 2026");
        assert_eq!(fields.date_or("odd", DATE_TBD), "next spring");
        assert_eq!(fields.date_or("missing", DATE_TBD), DATE_TBD);
        assert_eq!(fields.optional("missing"), NOT_SPECIFIED);
        assert_eq!(fields.number("hours").as_deref(), Some("10"));
        assert_eq!(fields.currency_or("fee", AMOUNT_TBD), "$1,500.00");
        assert_eq!(fields.currency_or("missing", AMOUNT_TBD), AMOUNT_TBD);
        assert!(fields.rows("missing").is_empty());
    }
}
