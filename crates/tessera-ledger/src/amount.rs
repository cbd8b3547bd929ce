//! Decimal amount decoding.
//!
//! The oracle renders integers as decimal ASCII. Every byte must be an ASCII
//! digit; signs, whitespace and separators are rejected. Leading zeros are
//! allowed (`"042"` is 42).

use crate::{LedgerError, Result};

/// Decode a released sale amount.
///
/// # Errors
///
/// - [`LedgerError::MalformedAmount`] on an empty string, a non-digit byte,
///   or a value above `u32::MAX`
pub fn parse_decimal_amount(bytes: &[u8]) -> Result<u32> {
    let value = parse_decimal(bytes)?;
    u32::try_from(value)
        .map_err(|_| LedgerError::MalformedAmount(format!("{value} exceeds u32 range")))
}

/// Decode a released running total.
pub fn parse_decimal_total(bytes: &[u8]) -> Result<u64> {
    parse_decimal(bytes)
}

fn parse_decimal(bytes: &[u8]) -> Result<u64> {
    if bytes.is_empty() {
        return Err(LedgerError::MalformedAmount("empty amount".into()));
    }
    bytes.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(LedgerError::MalformedAmount(format!(
                "non-digit byte 0x{b:02x}"
            )));
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or_else(|| LedgerError::MalformedAmount("amount overflows u64".into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zeros() {
        assert_eq!(parse_decimal_amount(b"042").expect("parse"), 42);
        assert_eq!(parse_decimal_amount(b"0").expect("parse"), 0);
    }

    #[test]
    fn test_non_digit_rejected() {
        for bad in [&b"12a"[..], b"-1", b" 1", b"1_000", b"+5"] {
            assert!(
                matches!(parse_decimal_amount(bad), Err(LedgerError::MalformedAmount(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_rejected() {
        assert!(parse_decimal_amount(b"").is_err());
    }

    #[test]
    fn test_u32_bounds() {
        assert_eq!(parse_decimal_amount(b"4294967295").expect("parse"), u32::MAX);
        assert!(parse_decimal_amount(b"4294967296").is_err());
        assert_eq!(
            parse_decimal_total(b"4294967296").expect("parse"),
            4_294_967_296
        );
    }

    #[test]
    fn test_u64_overflow() {
        assert!(parse_decimal_total(b"18446744073709551616").is_err());
    }
}
