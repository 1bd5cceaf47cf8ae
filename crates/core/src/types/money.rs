//! Parsing helpers for gateway-formatted money strings.
//!
//! The gateway returns all monetary values as currency-formatted strings
//! (e.g. `"$1,234.56"`). Those strings are opaque to the client and are never
//! recomputed or sent back; the only client-side arithmetic is the
//! display-only unit-price derivation (line total divided by quantity).

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from parsing a gateway money string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The string contained no numeric content after stripping formatting.
    #[error("not a monetary amount: {0:?}")]
    NotNumeric(String),

    /// Division by a zero quantity.
    #[error("cannot derive unit price for zero quantity")]
    ZeroQuantity,
}

/// Parse a currency-formatted string into a decimal amount.
///
/// Strips every character except digits, `.` and `-` before parsing, so
/// currency symbols, thousands separators, and HTML entities all fall away.
///
/// # Errors
///
/// Returns [`MoneyError::NotNumeric`] if nothing parseable remains.
pub fn parse_amount(formatted: &str) -> Result<Decimal, MoneyError> {
    let stripped: String = formatted
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    stripped
        .parse::<Decimal>()
        .map_err(|_| MoneyError::NotNumeric(formatted.to_string()))
}

/// Derive a display-only unit price from a line total and quantity.
///
/// This is the client's only money arithmetic. The result is never sent back
/// to the gateway.
///
/// # Errors
///
/// Returns an error if the total does not parse or the quantity is zero.
pub fn unit_price(line_total: &str, quantity: u32) -> Result<Decimal, MoneyError> {
    if quantity == 0 {
        return Err(MoneyError::ZeroQuantity);
    }
    let total = parse_amount(line_total)?;
    Ok((total / Decimal::from(quantity)).round_dp(2))
}

/// Format a decimal amount for display with a currency symbol.
#[must_use]
pub fn format_amount(amount: Decimal, symbol: &str) -> String {
    format!("{symbol}{:.2}", amount.round_dp(2))
}
