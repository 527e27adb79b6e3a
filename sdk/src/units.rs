//! Human-decimal ↔ base-unit conversion.
//!
//! Only integers produced by [`to_base_units`] (or read raw from chain) may
//! feed instruction arguments.  [`to_human`] and [`to_ui_amount`] are for
//! display; the float path in particular loses precision.
//!
//! Every conversion floors: a fractional base unit is dropped, never rounded
//! up.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `10^decimals` as `u128`, or `MathOverflow` past `10^38`.
pub fn pow10(decimals: u8) -> Result<u128> {
    10u128.checked_pow(decimals as u32).ok_or(Error::MathOverflow)
}

/// Parse a human decimal string (`"12"`, `"0.5"`, `"3."`, `".25"`) into base units.
///
/// Digits past `decimals` are truncated.  Signs, exponents, `NaN`, `inf` and
/// anything else that is not plain decimal notation are rejected with
/// [`Error::InvalidAmount`], as is a value that does not fit in `u64`.
/// Any `decimals` is accepted, so every string [`to_human`] renders parses back.
pub fn to_base_units(human: &str, decimals: u8) -> Result<u64> {
    let s = human.trim();
    if s.starts_with('-') {
        return Err(Error::InvalidAmount(format!("'{human}' is negative")));
    }
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(Error::InvalidAmount(format!("'{human}' is not a plain decimal number")));
    }

    let too_large = || Error::InvalidAmount(format!("'{human}' exceeds the u64 base-unit range"));

    // Exactly `decimals` fractional digits: extra ones floored, missing ones zero.
    let frac_digits = frac_part
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(decimals as usize);

    let mut total: u64 = 0;
    for b in int_part.bytes().chain(frac_digits) {
        total = total
            .checked_mul(10)
            .and_then(|t| t.checked_add((b - b'0') as u64))
            .ok_or_else(too_large)?;
    }
    Ok(total)
}

/// Convert a float amount to base units through its shortest decimal rendering.
///
/// Non-finite or negative input fails with [`Error::InvalidAmount`].
pub fn to_base_units_f64(human: f64, decimals: u8) -> Result<u64> {
    if !human.is_finite() {
        return Err(Error::InvalidAmount(format!("{human} is not finite")));
    }
    if human < 0.0 {
        return Err(Error::InvalidAmount(format!("{human} is negative")));
    }
    // `Display` for f64 never uses exponent notation.
    to_base_units(&format!("{human}"), decimals)
}

/// Render base units as an exact decimal string, trailing zeros trimmed.
pub fn to_human(base_units: u64, decimals: u8) -> String {
    let digits = base_units.to_string();
    let d = decimals as usize;
    if d == 0 {
        return digits;
    }
    let padded = if digits.len() <= d {
        format!("{}{}", "0".repeat(d - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, frac) = padded.split_at(padded.len() - d);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

/// Display-only float value.  Never feed this back into a transaction.
pub fn to_ui_amount(base_units: u64, decimals: u8) -> f64 {
    base_units as f64 / 10f64.powi(decimals as i32)
}

/// Move `amount` from `from` decimals to `to` decimals.
///
/// Scaling up is exact (`MathOverflow` if it leaves `u64`); scaling down
/// floors and is therefore lossy.
pub fn rescale(amount: u64, from: u8, to: u8) -> Result<u64> {
    if amount == 0 {
        return Ok(0);
    }
    if to >= from {
        let factor = pow10(to - from)?;
        let scaled = (amount as u128).checked_mul(factor).ok_or(Error::MathOverflow)?;
        u64::try_from(scaled).map_err(|_| Error::MathOverflow)
    } else {
        // Past 10^38 every u64 floors to zero.
        Ok(pow10(from - to).map_or(0, |factor| ((amount as u128) / factor) as u64))
    }
}

// ─── TokenAmount ──────────────────────────────────────────────────────────────

/// A fixed-point token amount: `base_units / 10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub base_units: u64,
    pub decimals:   u8,
}

impl TokenAmount {
    pub fn new(base_units: u64, decimals: u8) -> Self {
        Self { base_units, decimals }
    }

    pub fn from_human(human: &str, decimals: u8) -> Result<Self> {
        Ok(Self::new(to_base_units(human, decimals)?, decimals))
    }

    pub fn to_human(&self) -> String {
        to_human(self.base_units, self.decimals)
    }

    pub fn ui_amount(&self) -> f64 {
        to_ui_amount(self.base_units, self.decimals)
    }

    pub fn rescale(&self, decimals: u8) -> Result<Self> {
        Ok(Self::new(rescale(self.base_units, self.decimals, decimals)?, decimals))
    }

    /// Add `other`, rescaled into `self`'s decimals first.
    pub fn checked_add(&self, other: &TokenAmount) -> Result<Self> {
        let rhs = other.rescale(self.decimals)?;
        let sum = self.base_units.checked_add(rhs.base_units).ok_or(Error::MathOverflow)?;
        Ok(Self::new(sum, self.decimals))
    }

    /// Subtract `other`, rescaled into `self`'s decimals first.
    pub fn checked_sub(&self, other: &TokenAmount) -> Result<Self> {
        let rhs = other.rescale(self.decimals)?;
        let diff = self.base_units.checked_sub(rhs.base_units).ok_or(Error::MathOverflow)?;
        Ok(Self::new(diff, self.decimals))
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_human())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(to_base_units("3", 6).unwrap(), 3_000_000);
        assert_eq!(to_base_units("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(to_base_units(".25", 2).unwrap(), 25);
        assert_eq!(to_base_units("7.", 0).unwrap(), 7);
        assert_eq!(to_base_units(" 0.000001 ", 6).unwrap(), 1);
    }

    #[test]
    fn floors_extra_fractional_digits() {
        assert_eq!(to_base_units("1.9999999", 6).unwrap(), 1_999_999);
        assert_eq!(to_base_units("0.0000009", 6).unwrap(), 0);
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        for bad in ["", ".", "-1", "1e3", "NaN", "inf", "1.2.3", "+4", "12a"] {
            assert!(
                matches!(to_base_units(bad, 6), Err(Error::InvalidAmount(_))),
                "expected InvalidAmount for {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_values_beyond_u64() {
        assert!(matches!(to_base_units("18446744073709551616", 0), Err(Error::InvalidAmount(_))));
        assert!(matches!(to_base_units("18446744073709.551616", 6), Err(Error::InvalidAmount(_))));
        assert_eq!(to_base_units("18446744073709551615", 0).unwrap(), u64::MAX);
    }

    #[test]
    fn float_input_rejects_non_finite_and_negative() {
        assert!(matches!(to_base_units_f64(f64::NAN, 6), Err(Error::InvalidAmount(_))));
        assert!(matches!(to_base_units_f64(f64::INFINITY, 6), Err(Error::InvalidAmount(_))));
        assert!(matches!(to_base_units_f64(-0.5, 6), Err(Error::InvalidAmount(_))));
        assert_eq!(to_base_units_f64(2.5, 6).unwrap(), 2_500_000);
        assert_eq!(to_base_units_f64(0.1, 9).unwrap(), 100_000_000);
    }

    #[test]
    fn renders_exact_decimal_strings() {
        assert_eq!(to_human(1_500_000, 6), "1.5");
        assert_eq!(to_human(3_000_000, 6), "3");
        assert_eq!(to_human(1, 6), "0.000001");
        assert_eq!(to_human(0, 6), "0");
        assert_eq!(to_human(42, 0), "42");
    }

    #[test]
    fn human_round_trip_never_inflates() {
        let samples = [0u64, 1, 9, 10, 999_999, 1_000_000, 123_456_789, u64::MAX];
        for d in [0u8, 1, 6, 9, 12] {
            for &b in &samples {
                let back = to_base_units(&to_human(b, d), d).unwrap();
                assert!(back <= b);
                assert_eq!(back, b);
            }
        }
    }

    #[test]
    fn large_decimal_counts_parse_back() {
        assert_eq!(to_base_units("0", 39).unwrap(), 0);
        assert_eq!(to_base_units("0", 255).unwrap(), 0);
        assert_eq!(to_base_units(&to_human(5, 40), 40).unwrap(), 5);
        for d in [19u8, 20, 38, 39, 64, 255] {
            for b in [0u64, 1, 987_654_321, u64::MAX] {
                assert_eq!(to_base_units(&to_human(b, d), d).unwrap(), b, "{b} at {d} decimals");
            }
        }
        assert!(matches!(to_base_units("1", 40), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn rescale_up_is_exact_and_down_floors() {
        assert_eq!(rescale(1_234_567, 6, 9).unwrap(), 1_234_567_000);
        assert_eq!(rescale(1_234_567_899, 9, 6).unwrap(), 1_234_567);
        assert_eq!(rescale(5, 6, 6).unwrap(), 5);
        assert!(matches!(rescale(u64::MAX, 0, 1), Err(Error::MathOverflow)));
        assert_eq!(rescale(u64::MAX, 60, 0).unwrap(), 0);
        assert_eq!(rescale(0, 0, 60).unwrap(), 0);
    }

    #[test]
    fn token_amounts_with_different_decimals_add_after_rescaling() {
        let usdc = TokenAmount::from_human("1.5", 6).unwrap();
        let sol_scaled = TokenAmount::new(250_000_000, 9); // 0.25
        let sum = usdc.checked_add(&sol_scaled).unwrap();
        assert_eq!(sum, TokenAmount::new(1_750_000, 6));
        assert_eq!(sum.to_string(), "1.75");

        let diff = usdc.checked_sub(&sol_scaled).unwrap();
        assert_eq!(diff.base_units, 1_250_000);
        assert!(matches!(sol_scaled.checked_sub(&usdc.rescale(9).unwrap()), Err(Error::MathOverflow)));
    }
}
