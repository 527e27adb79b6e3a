//! DLAN Rust SDK
//!
//! Client for the DLAN staking, claim and social program on Solana.
//! Derives every PDA, converts human amounts to exact base units, previews
//! split claims against the live reserve, and submits one signed
//! transaction per action.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dlan_sdk::{ClaimKind, DlanClient};
//! use solana_sdk::{pubkey::Pubkey, signature::{Keypair, Signer}};
//! use std::str::FromStr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let program = Pubkey::from_str("11111111111111111111111111111111")?; // your deployment
//!     let mint    = Pubkey::new_unique();
//!     let client  = DlanClient::devnet(program, mint);
//!     let wallet  = Keypair::new(); // use a funded keypair
//!
//!     // 1. Preview what a 3 DLAN/day button would pay right now
//!     let preview = client.preview_claim(&wallet.pubkey(), ClaimKind::Vip, 3_000_000).await?;
//!     println!("payable days: {}  you get: {}", preview.quote.payable_days, preview.quote.user_base_units);
//!
//!     // 2. Claim it
//!     let result = client.vip_claim_split_timed(&wallet, "3").await?;
//!     println!("Claimed! tx: {}", result.signature);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`DlanClient::stake`] | Stake USD into the pool |
//! | [`DlanClient::stake_and_mint_priced`] | Invest USD at the vip.json rate |
//! | [`DlanClient::invest_claim_split`] | Claim investment accrual (fee split) |
//! | [`DlanClient::vip_claim_split_timed`] | Claim a VIP tier button (fee split) |
//! | [`DlanClient::preview_claim`] | Live claim breakdown, no transaction |
//! | [`DlanClient::swap`] | Jupiter quote, sign and send |
//! | [`DlanClient::watch_reserve`] | Background reserve refresh |
//! | [`DlanClient::create_post`] | Social post by index |

pub mod claim;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod instructions;
pub mod pda;
pub mod poll;
pub mod quote;
pub mod secret;
pub mod state;
pub mod types;
pub mod units;
pub mod vip;

pub use client::DlanClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use types::*;
