//! Parameter and result types for [`crate::DlanClient`].

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::claim::ClaimQuote;
use crate::vip::b58;

/// Which on-chain timer a split claim reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// Investment accrual, timed by the `user` PDA.
    Invest,
    /// VIP tier button, timed by the `vip` PDA.
    Vip,
}

/// Live inputs and result of a claim preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimPreview {
    pub kind:               ClaimKind,
    #[serde(serialize_with = "b58::serialize")]
    pub owner:              Pubkey,
    pub chain_time:         i64,
    /// `None` before the first claim.
    pub last_claim_ts:      Option<i64>,
    pub elapsed_days:       u64,
    pub reserve_base_units: u64,
    pub next_claim_in_secs: i64,
    pub quote:              ClaimQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReserveSnapshot {
    pub reserve_base_units: u64,
    pub chain_time:         i64,
}

/// Result of any single-instruction submission.
#[derive(Debug, Clone, Serialize)]
pub struct TxResult {
    pub signature:   String,
    pub instruction: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StakeResult {
    pub signature:  String,
    #[serde(serialize_with = "b58::serialize")]
    pub user_state: Pubkey,
    /// USD base units moved into the treasury.
    pub amount:     u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResult {
    pub signature:     String,
    #[serde(serialize_with = "b58::serialize")]
    pub fee_recipient: Pubkey,
    /// What the client expected the program to pay; display only.
    pub preview:       ClaimPreview,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResult {
    pub signature: String,
    #[serde(serialize_with = "b58::serialize")]
    pub post:      Pubkey,
    pub index:     u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapResult {
    pub signature:      String,
    #[serde(serialize_with = "b58::serialize")]
    pub input_mint:     Pubkey,
    #[serde(serialize_with = "b58::serialize")]
    pub output_mint:    Pubkey,
    pub in_amount:      u64,
    pub out_amount:     u64,
    pub min_amount_out: u64,
}
