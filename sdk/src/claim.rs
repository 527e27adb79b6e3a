//! Daily-claim preview math: elapsed days, reserve ceiling, user/fee split.
//!
//! The program enforces the real payout; these functions produce the preview
//! the client shows before submitting and decide whether a submission makes
//! sense at all (`NothingToClaim` / `ReserveEmpty` block it locally).

use serde::Serialize;

use crate::error::{Error, Result};
use crate::units::{to_base_units, to_base_units_f64};

// ─── Constants ────────────────────────────────────────────────────────────────

pub const SECONDS_PER_DAY: i64 = 86_400;

/// The fee is `floor(gross / FEE_DIVISOR)`; the user receives the remainder,
/// so `user + fee == gross` exactly.
pub const FEE_DIVISOR: u64 = 3;

// ─── Payout split ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayoutSplit {
    pub user: u64,
    pub fee:  u64,
}

/// Split `gross` into a 2/3 user share and a 1/3 fee share with no leakage.
pub fn split_payout(gross: u64) -> PayoutSplit {
    let fee = gross / FEE_DIVISOR;
    PayoutSplit { user: gross - fee, fee }
}

// ─── Elapsed time ─────────────────────────────────────────────────────────────

/// Whole periods of `period_secs` between `last` and `now`, floored at zero.
pub fn elapsed_periods(now: i64, last: i64, period_secs: i64) -> u64 {
    if period_secs <= 0 || now <= last {
        return 0;
    }
    ((now as i128 - last as i128) / period_secs as i128) as u64
}

/// Whole days since the last claim.
pub fn elapsed_days(now: i64, last_claim: i64) -> u64 {
    elapsed_periods(now, last_claim, SECONDS_PER_DAY)
}

/// Seconds until the next whole day completes (countdown display).
pub fn seconds_until_next_claim(now: i64, last_claim: i64) -> i64 {
    if now < last_claim {
        return SECONDS_PER_DAY + (last_claim - now);
    }
    let into_day = (now - last_claim) % SECONDS_PER_DAY;
    SECONDS_PER_DAY - into_day
}

// ─── Claim preview ────────────────────────────────────────────────────────────

/// Full breakdown of a prospective claim, all amounts in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimQuote {
    pub per_day_base_units:  u64,
    pub max_days_by_reserve: u64,
    pub payable_days:        u64,
    pub gross_base_units:    u64,
    pub user_base_units:     u64,
    pub fee_base_units:      u64,
}

/// How many whole days of `per_day` the reserve can cover.  Zero if `per_day` is zero.
pub fn max_days_by_reserve(reserve_base_units: u64, per_day_base_units: u64) -> u64 {
    if per_day_base_units == 0 {
        return 0;
    }
    reserve_base_units / per_day_base_units
}

/// Preview a claim from a human per-day rate (e.g. `"3"` USD per day).
///
/// * `ReserveEmpty` when the reserve is zero, whatever the elapsed days.
/// * `NothingToClaim` when no day is payable (none elapsed, rate rounds to
///   zero, or the reserve covers less than one day).
pub fn compute_claim(
    per_day_rate_human: &str,
    elapsed_days:       u64,
    reserve_base_units: u64,
    decimals:           u8,
) -> Result<ClaimQuote> {
    let per_day = to_base_units(per_day_rate_human, decimals)?;
    compute_claim_base(per_day, elapsed_days, reserve_base_units)
}

/// Same as [`compute_claim`] with the per-day amount already in base units.
pub fn compute_claim_base(
    per_day_base_units: u64,
    elapsed_days:       u64,
    reserve_base_units: u64,
) -> Result<ClaimQuote> {
    if reserve_base_units == 0 {
        return Err(Error::ReserveEmpty);
    }
    let max_days = max_days_by_reserve(reserve_base_units, per_day_base_units);
    let payable_days = elapsed_days.min(max_days);
    if payable_days == 0 {
        return Err(Error::NothingToClaim);
    }

    // payable_days <= reserve / per_day, so the product is <= reserve.
    let gross = per_day_base_units
        .checked_mul(payable_days)
        .ok_or(Error::MathOverflow)?;
    let split = split_payout(gross);

    Ok(ClaimQuote {
        per_day_base_units,
        max_days_by_reserve: max_days,
        payable_days,
        gross_base_units: gross,
        user_base_units:  split.user,
        fee_base_units:   split.fee,
    })
}

// ─── Investment rule ──────────────────────────────────────────────────────────

/// Daily DLAN accrual, in base units, for `usd_invested` at the configured
/// `dlan_per_usd_per_day` rate.  Floors like every other conversion.
pub fn invest_daily_rate(usd_invested: &str, dlan_per_usd_per_day: f64, dlan_decimals: u8) -> Result<u64> {
    // Work in 6-decimal USD so the product stays integral until the final floor.
    const USD_SCALE: u8 = 6;
    let usd_micro = to_base_units(usd_invested, USD_SCALE)? as u128;
    let rate = to_base_units_f64(dlan_per_usd_per_day, dlan_decimals)? as u128;
    let daily = usd_micro
        .checked_mul(rate)
        .ok_or(Error::MathOverflow)?
        / 10u128.pow(USD_SCALE as u32);
    u64::try_from(daily).map_err(|_| Error::MathOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_caps_payable_days() {
        let q = compute_claim("3", 5, 10_000_000, 6).unwrap();
        assert_eq!(q.per_day_base_units, 3_000_000);
        assert_eq!(q.max_days_by_reserve, 3);
        assert_eq!(q.payable_days, 3);
        assert_eq!(q.gross_base_units, 9_000_000);
        assert_eq!(q.fee_base_units, 3_000_000);
        assert_eq!(q.user_base_units, 6_000_000);
    }

    #[test]
    fn zero_elapsed_days_is_nothing_to_claim() {
        assert!(matches!(compute_claim("3", 0, 10_000_000, 6), Err(Error::NothingToClaim)));
    }

    #[test]
    fn empty_reserve_wins_over_elapsed_days() {
        for days in [0, 1, 5, 10_000] {
            assert!(matches!(compute_claim("3", days, 0, 6), Err(Error::ReserveEmpty)));
        }
    }

    #[test]
    fn zero_rate_disallows_claim() {
        assert!(matches!(compute_claim("0", 5, 10_000_000, 6), Err(Error::NothingToClaim)));
        assert!(matches!(compute_claim("0.0000001", 5, 10_000_000, 6), Err(Error::NothingToClaim)));
    }

    #[test]
    fn reserve_below_one_day_is_nothing_to_claim() {
        assert!(matches!(compute_claim("3", 5, 2_999_999, 6), Err(Error::NothingToClaim)));
    }

    #[test]
    fn invalid_rate_is_invalid_amount() {
        assert!(matches!(compute_claim("-3", 5, 10_000_000, 6), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn split_never_leaks() {
        for gross in [0u64, 1, 2, 3, 4, 5, 100, 9_999_999, u64::MAX - 1, u64::MAX] {
            let s = split_payout(gross);
            assert_eq!(s.user + s.fee, gross);
            assert_eq!(s.fee, gross / 3);
            assert!(s.user >= s.fee);
        }
    }

    #[test]
    fn payable_days_never_exceed_reserve_ceiling() {
        for per_day in [1u64, 7, 3_000_000] {
            for reserve in [1u64, 6, 20, 10_000_000] {
                for elapsed in [1u64, 2, 100] {
                    if let Ok(q) = compute_claim_base(per_day, elapsed, reserve) {
                        assert!(q.payable_days <= reserve / per_day);
                        assert!(q.gross_base_units <= reserve);
                        assert_eq!(q.user_base_units + q.fee_base_units, q.gross_base_units);
                    }
                }
            }
        }
    }

    #[test]
    fn elapsed_days_floors_and_clamps() {
        assert_eq!(elapsed_days(1_000, 1_000), 0);
        assert_eq!(elapsed_days(1_000 + SECONDS_PER_DAY - 1, 1_000), 0);
        assert_eq!(elapsed_days(1_000 + SECONDS_PER_DAY, 1_000), 1);
        assert_eq!(elapsed_days(1_000 + 5 * SECONDS_PER_DAY + 17, 1_000), 5);
        assert_eq!(elapsed_days(0, 1_000), 0);
        assert_eq!(elapsed_periods(100, 0, 0), 0);
    }

    #[test]
    fn countdown_to_next_day() {
        assert_eq!(seconds_until_next_claim(1_000, 1_000), SECONDS_PER_DAY);
        assert_eq!(seconds_until_next_claim(1_000 + 400, 1_000), SECONDS_PER_DAY - 400);
        assert_eq!(seconds_until_next_claim(1_000 + SECONDS_PER_DAY + 10, 1_000), SECONDS_PER_DAY - 10);
    }

    #[test]
    fn invest_rate_scales_by_usd() {
        // 10 USD at 120 DLAN per USD per day, 6-decimal DLAN.
        assert_eq!(invest_daily_rate("10", 120.0, 6).unwrap(), 1_200_000_000);
        assert_eq!(invest_daily_rate("0.5", 120.0, 6).unwrap(), 60_000_000);
        assert!(matches!(invest_daily_rate("10", f64::NAN, 6), Err(Error::InvalidAmount(_))));
    }
}
