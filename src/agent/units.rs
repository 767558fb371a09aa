//! Token amount handling and base-unit conversion.
//!
//! Amounts are kept as the exact digits the model produced. Conversion to
//! base units shifts those digits and drops whatever falls past the twelfth
//! fractional place.

use num_bigint::BigUint;
use rust_decimal::Decimal;

/// Fractional digits between a human token amount and its base unit.
pub const BASE_UNIT_DECIMALS: u32 = 12;

/// Largest accepted integer part, in decimal digits.
const MAX_INTEGER_DIGITS: i64 = 1024;

/// A non-negative native-token amount in human units.
///
/// Stored as `mantissa * 10^exponent` with trailing zeros folded into the
/// exponent, so equal values compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    mantissa: BigUint,
    exponent: i64,
}

impl TokenAmount {
    /// Returns `None` for negative values.
    pub fn new(value: Decimal) -> Option<Self> {
        Self::parse(&value.to_string()).ok()
    }

    /// Parse plain (`"0.1"`) or scientific (`"1e-3"`) decimal text.
    ///
    /// Accepts any number of fractional digits; nothing is rounded here.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let invalid = || format!("'{}' is not a decimal number", trimmed);

        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (number, exponent) = match unsigned.find(['e', 'E']) {
            Some(idx) => (&unsigned[..idx], parse_exponent(&unsigned[idx + 1..]).ok_or_else(invalid)?),
            None => (unsigned, 0),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }

        let digits = format!("{whole}{fraction}");
        let significant = digits.trim_start_matches('0');
        let trimmed_digits = significant.trim_end_matches('0');
        if trimmed_digits.is_empty() {
            return Ok(Self::zero());
        }
        if negative {
            return Err(format!("'{}' is negative", trimmed));
        }

        let dropped_zeros = (significant.len() - trimmed_digits.len()) as i64;
        let exponent = exponent
            .checked_sub(fraction.len() as i64)
            .and_then(|e| e.checked_add(dropped_zeros))
            .ok_or_else(|| format!("'{}' is out of range", trimmed))?;

        let integer_digits = (trimmed_digits.len() as i64).saturating_add(exponent);
        if integer_digits > MAX_INTEGER_DIGITS {
            return Err(format!("'{}' is too large", trimmed));
        }

        let mantissa = BigUint::parse_bytes(trimmed_digits.as_bytes(), 10).ok_or_else(invalid)?;
        Ok(Self { mantissa, exponent })
    }

    fn zero() -> Self {
        Self {
            mantissa: BigUint::from(0u32),
            exponent: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.bits() == 0
    }
}

/// Signed decimal exponent digits; `None` when malformed or out of `i64`.
fn parse_exponent(raw: &str) -> Option<i64> {
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude: i64 = digits.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.mantissa.to_str_radix(10);
        if self.exponent >= 0 {
            return write!(f, "{}{}", digits, "0".repeat(self.exponent as usize));
        }
        let places = self.exponent.unsigned_abs() as usize;
        if digits.len() > places {
            let (whole, fraction) = digits.split_at(digits.len() - places);
            write!(f, "{}.{}", whole, fraction)
        } else {
            write!(f, "0.{}{}", "0".repeat(places - digits.len()), digits)
        }
    }
}

/// Convert a human amount into integer base units (x 10^12).
///
/// Digits beyond the twelfth fractional place are truncated, never rounded.
pub fn to_base_units(amount: &TokenAmount) -> BigUint {
    let shift = amount.exponent.saturating_add(i64::from(BASE_UNIT_DECIMALS));
    let places = shift.unsigned_abs();
    let ten = BigUint::from(10u32);

    if shift >= 0 {
        // Bounded by MAX_INTEGER_DIGITS at parse time.
        let places = u32::try_from(places).unwrap_or(u32::MAX);
        return &amount.mantissa * ten.pow(places);
    }
    // 10^places exceeds a mantissa of fewer bits.
    match u32::try_from(places) {
        Ok(places) if u64::from(places) <= amount.mantissa.bits() => &amount.mantissa / ten.pow(places),
        _ => BigUint::from(0u32),
    }
}

/// Render base units as a human decimal string, trimming trailing zeros.
pub fn from_base_units(base: &BigUint) -> String {
    let digits = base.to_str_radix(10);
    let decimals = BASE_UNIT_DECIMALS as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base(raw: &str) -> String {
        to_base_units(&TokenAmount::parse(raw).unwrap()).to_str_radix(10)
    }

    #[test]
    fn converts_reference_amounts() {
        assert_eq!(
            to_base_units(&TokenAmount::new(dec!(0.1)).unwrap()),
            BigUint::from(100_000_000_000u64)
        );
        assert_eq!(base("1"), "1000000000000");
        assert_eq!(base("0"), "0");
    }

    #[test]
    fn truncates_past_twelve_decimals() {
        assert_eq!(base("0.0000000000019"), "1");
        assert_eq!(base("0.0000000000009"), "0");
        assert_eq!(base("0.99999999999999999999999999999"), "999999999999");
    }

    #[test]
    fn exact_for_long_amounts() {
        assert_eq!(base("12345678.123456789012"), "12345678123456789012");
        assert_eq!(base("12345678.1234567890129"), "12345678123456789012");
    }

    #[test]
    fn large_amounts_do_not_overflow() {
        assert_eq!(
            base("79228162514264337593543950335"),
            "79228162514264337593543950335000000000000"
        );
        assert_eq!(base("1e29"), format!("1{}", "0".repeat(41)));
    }

    #[test]
    fn tiny_exponents_truncate_to_zero() {
        assert_eq!(base("1e-30"), "0");
        assert_eq!(base("5e-9223372036854775807"), "0");
        assert_eq!(base("1.5E-12"), "1");
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(TokenAmount::new(dec!(-0.5)).is_none());
        assert!(TokenAmount::parse("-1").is_err());
        assert!(TokenAmount::parse("-0").unwrap().is_zero());
    }

    #[test]
    fn parses_plain_and_scientific_text() {
        assert_eq!(TokenAmount::parse(" 2.5 ").unwrap(), TokenAmount::new(dec!(2.5)).unwrap());
        assert_eq!(TokenAmount::parse("1e-3").unwrap(), TokenAmount::new(dec!(0.001)).unwrap());
        assert_eq!(TokenAmount::parse("0.10").unwrap(), TokenAmount::parse("1e-1").unwrap());
    }

    #[test]
    fn rejects_malformed_text() {
        for raw in ["ten", "", ".", "1_000", "1,5", "1e", "1e+-5", "0x10", "1.2.3", "--1"] {
            assert!(TokenAmount::parse(raw).is_err(), "{raw:?} should be rejected");
        }
        assert!(TokenAmount::parse("1e2000").is_err());
    }

    #[test]
    fn displays_exact_value() {
        assert_eq!(TokenAmount::parse("0.10").unwrap().to_string(), "0.1");
        assert_eq!(TokenAmount::parse("2.5e3").unwrap().to_string(), "2500");
        assert_eq!(TokenAmount::parse("1e-13").unwrap().to_string(), "0.0000000000001");
    }

    #[test]
    fn formats_base_units_back_to_decimal() {
        assert_eq!(from_base_units(&BigUint::from(100_000_000_000u64)), "0.1");
        assert_eq!(from_base_units(&BigUint::from(1_000_000_000_000u64)), "1");
        assert_eq!(from_base_units(&BigUint::from(1_500_000_000_001u64)), "1.500000000001");
        assert_eq!(from_base_units(&BigUint::from(0u32)), "0");
    }
}
