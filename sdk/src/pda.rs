//! Program-derived address helpers.
//!
//! Seeds mirror the DLAN program's account constraints byte for byte.  A
//! mismatch in seed order or encoding does not fail: it silently yields a
//! different address, so every named helper here is pinned by a test against
//! the literal seed list.

use solana_sdk::{pubkey, pubkey::Pubkey};
use tracing::debug;

use crate::error::{Error, Result};

// ─── Well-known program IDs ───────────────────────────────────────────────────

pub const SPL_TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ATA_PROGRAM_ID:       Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const SYSTEM_PROGRAM_ID:    Pubkey = pubkey!("11111111111111111111111111111111");

// ─── Scheme limits ────────────────────────────────────────────────────────────

/// Maximum length of a single seed component.
pub const MAX_SEED_LEN: usize = 32;
/// Maximum number of seed components, bump included.
pub const MAX_SEEDS: usize = 16;

// ─── PDA seeds ────────────────────────────────────────────────────────────────

pub const POOL_SEED:           &[u8] = b"pool";
pub const TREASURY_SEED:       &[u8] = b"treasury";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint_authority";
pub const USER_SEED:           &[u8] = b"user";
pub const VIP_SEED:            &[u8] = b"vip";
pub const PROFILE_SEED:        &[u8] = b"profile";
pub const POST_SEED:           &[u8] = b"post";
pub const CONTACT_SEED:        &[u8] = b"contact";
pub const SOCIAL_CONFIG_SEED:  &[u8] = b"social_config";

// ─── Generic derivation ───────────────────────────────────────────────────────

/// Derive a program address from an ordered seed list.
///
/// Fails with [`Error::InvalidSeed`] when a component exceeds
/// [`MAX_SEED_LEN`], when there is no room left for the bump seed, or when no
/// bump produces an off-curve address.
pub fn derive(program_id: &Pubkey, seeds: &[&[u8]]) -> Result<(Pubkey, u8)> {
    if seeds.len() >= MAX_SEEDS {
        return Err(Error::InvalidSeed(format!(
            "{} seed components; at most {} allowed (one slot is reserved for the bump)",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some((i, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(Error::InvalidSeed(format!(
            "seed #{i} is {} bytes; maximum is {MAX_SEED_LEN}",
            seed.len()
        )));
    }
    let found = Pubkey::try_find_program_address(seeds, program_id)
        .ok_or_else(|| Error::InvalidSeed("no bump yields an off-curve address".into()))?;
    debug!(program = %program_id, address = %found.0, bump = found.1, "derived program address");
    Ok(found)
}

/// Named seeds are all well inside the scheme limits.
fn find(program_id: &Pubkey, seeds: &[&[u8]]) -> (Pubkey, u8) {
    Pubkey::find_program_address(seeds, program_id)
}

// ─── Named derivations ────────────────────────────────────────────────────────

/// Global staking pool state.
pub fn derive_pool(program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[POOL_SEED])
}

/// Treasury PDA; its token accounts hold the claim reserve.
pub fn derive_treasury(program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[TREASURY_SEED])
}

/// Mint authority, scoped to a pool.
pub fn derive_mint_authority(pool: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[MINT_AUTHORITY_SEED, pool.as_ref()])
}

/// Per-wallet staking / investment state.
pub fn derive_user_state(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[USER_SEED, owner.as_ref()])
}

/// Per-wallet VIP claim timer.
pub fn derive_vip_state(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[VIP_SEED, owner.as_ref()])
}

pub fn derive_profile(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[PROFILE_SEED, owner.as_ref()])
}

/// Post number `index` of `author`; the index is encoded as 8 bytes little-endian.
pub fn derive_post(author: &Pubkey, index: u64, program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[POST_SEED, author.as_ref(), &index.to_le_bytes()])
}

/// Contact request from `a` to `b`.  Order matters: `(a, b) != (b, a)`.
pub fn derive_contact(a: &Pubkey, b: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[CONTACT_SEED, a.as_ref(), b.as_ref()])
}

pub fn derive_social_config(program_id: &Pubkey) -> (Pubkey, u8) {
    find(program_id, &[SOCIAL_CONFIG_SEED])
}

/// Derive the Associated Token Account for a wallet + mint.
pub fn derive_ata(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), SPL_TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )
    .0
}
