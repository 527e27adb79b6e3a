//! On-chain account deserialization.
//!
//! Only the fields the client needs are read; byte offsets mirror the
//! account layouts exactly.

use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

// ─── SPL token account ────────────────────────────────────────────────────────

/// Read the `amount` field from a packed SPL token account.
///
/// Token account layout: `mint(32) owner(32) amount(8) …`
pub fn parse_token_amount(data: &[u8]) -> Result<u64> {
    if data.len() < 72 {
        return Err(Error::ParseError {
            offset: 64,
            reason: format!("Token account is {} bytes; need at least 72", data.len()),
        });
    }
    read_u64(data, 64)
}

// ─── Clock sysvar ─────────────────────────────────────────────────────────────

/// Read `unix_timestamp` from the Clock sysvar.
///
/// Layout: `slot(8) epoch_start_timestamp(8) epoch(8) leader_schedule_epoch(8)
/// unix_timestamp(8)` = 40 bytes.
pub fn parse_clock_unix_timestamp(data: &[u8]) -> Result<i64> {
    if data.len() < 40 {
        return Err(Error::ParseError {
            offset: 32,
            reason: format!("Clock sysvar is {} bytes; expected 40", data.len()),
        });
    }
    read_i64(data, 32)
}

// ─── Claim timers ─────────────────────────────────────────────────────────────

/// The leading fields shared by the `user` and `vip` state accounts.
///
/// Layout (after 8-byte Anchor discriminator):
/// ```text
/// owner(32)  last_claim_ts(8)  …
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimTimer {
    pub owner:         Pubkey,
    pub last_claim_ts: i64,
}

pub fn parse_claim_timer(data: &[u8]) -> Result<ClaimTimer> {
    const EXPECTED: usize = 48;
    if data.len() < EXPECTED {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!("Claim state account is {} bytes; expected at least {}", data.len(), EXPECTED),
        });
    }
    Ok(ClaimTimer {
        owner:         read_pubkey(data, 8)?,
        last_claim_ts: read_i64(data, 40)?,
    })
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

fn slice<const N: usize>(data: &[u8], offset: usize, what: &str) -> Result<[u8; N]> {
    data.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError {
            offset,
            reason: format!("slice too short for {what} ({N} bytes)"),
        })
}

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    Ok(Pubkey::from(slice::<32>(data, offset, "Pubkey")?))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(slice::<8>(data, offset, "u64")?))
}

pub(crate) fn read_i64(data: &[u8], offset: usize) -> Result<i64> {
    Ok(i64::from_le_bytes(slice::<8>(data, offset, "i64")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_amount_reads_offset_64() {
        let mut data = vec![0u8; 165];
        data[64..72].copy_from_slice(&10_000_000u64.to_le_bytes());
        assert_eq!(parse_token_amount(&data).unwrap(), 10_000_000);
        assert!(matches!(parse_token_amount(&data[..71]), Err(Error::ParseError { .. })));
    }

    #[test]
    fn clock_timestamp_reads_offset_32() {
        let mut data = vec![0u8; 40];
        data[32..40].copy_from_slice(&1_760_000_000i64.to_le_bytes());
        assert_eq!(parse_clock_unix_timestamp(&data).unwrap(), 1_760_000_000);
    }

    #[test]
    fn claim_timer_layout() {
        let owner = Pubkey::new_unique();
        let mut data = vec![0u8; 8];
        data.extend_from_slice(owner.as_ref());
        data.extend_from_slice(&1_700_000_123i64.to_le_bytes());
        data.push(254); // bump

        let t = parse_claim_timer(&data).unwrap();
        assert_eq!(t.owner, owner);
        assert_eq!(t.last_claim_ts, 1_700_000_123);
        assert!(parse_claim_timer(&data[..47]).is_err());
    }
}
