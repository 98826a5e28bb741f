use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid amount: '{raw}'")]
pub struct AmountError {
    pub raw: String,
}

/// Normalize a statement amount into a decimal.
///
/// Accepts both `1234.56` and `1.234,56` styles: whitespace and a leading `+`
/// are dropped, commas become points, and when more than one point remains
/// every point but the last is treated as a thousands separator.
pub fn normalize_amount(raw: &str) -> Result<Decimal, AmountError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let unsigned = compact.strip_prefix('+').unwrap_or(&compact);
    let dotted = unsigned.replace(',', ".");

    let canonical = match dotted.rfind('.') {
        Some(last) if dotted.matches('.').count() > 1 => {
            let (int_part, frac) = dotted.split_at(last);
            format!("{}{}", int_part.replace('.', ""), frac)
        }
        _ => dotted,
    };

    Decimal::from_str(&canonical).map_err(|_| AmountError {
        raw: raw.to_string(),
    })
}

/// Encode an amount the way statement files carry it: two decimals, comma as
/// the decimal separator, no thousands grouping.
pub fn encode_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2)).replace('.', ",")
}

/// Lossy conversion for spreadsheet cells, which only hold `f64`.
pub fn amount_to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}
