use thiserror::Error;

use crate::Balance;

/// Decimal places of the native fee unit.
pub const NATIVE_DECIMALS: u32 = 18;

const ONE: Balance = 10u128.pow(NATIVE_DECIMALS);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("amount is not a plain decimal number")]
    Malformed,
    #[error("amount has more than {NATIVE_DECIMALS} decimal places")]
    TooPrecise,
    #[error("amount is out of range")]
    Overflow,
}

/// Parses a decimal string such as `"0.01"` into raw 18-decimal units.
pub fn parse_native(input: &str) -> Result<Balance, ParseAmountError> {
    let input = input.trim();
    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(ParseAmountError::Malformed);
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseAmountError::Malformed);
    }
    if frac.len() > NATIVE_DECIMALS as usize {
        return Err(ParseAmountError::TooPrecise);
    }
    let whole: Balance = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow)?
    };
    let mut value = whole.checked_mul(ONE).ok_or(ParseAmountError::Overflow)?;
    if !frac.is_empty() {
        let scale = 10u128.pow(NATIVE_DECIMALS - frac.len() as u32);
        let frac: Balance = frac.parse().map_err(|_| ParseAmountError::Overflow)?;
        value = value
            .checked_add(frac * scale)
            .ok_or(ParseAmountError::Overflow)?;
    }
    Ok(value)
}

/// Renders raw units as a trimmed decimal string: `10_u128.pow(16)` → `"0.01"`.
pub fn format_native(value: Balance) -> String {
    let whole = value / ONE;
    let frac = value % ONE;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:018}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
