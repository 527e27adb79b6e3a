//! Client configuration.
//!
//! Deployment addresses (program, DLAN mint) have no defaults: every
//! environment names its own explicitly.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey, pubkey::Pubkey};

use crate::error::{Error, Result};
use crate::instructions::Mints;
use crate::quote::DEFAULT_JUPITER_URL;
use crate::vip::{b58, b58_opt};

pub const DEVNET_RPC:  &str = "https://api.devnet.solana.com";
pub const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";

/// Mainnet USDC.
pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_DLAN_DECIMALS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(with = "b58")]
    pub program_id: Pubkey,

    #[serde(with = "b58")]
    pub dlan_mint: Pubkey,

    #[serde(default = "default_dlan_decimals")]
    pub dlan_decimals: u8,

    #[serde(default = "default_usdc_mint", with = "b58")]
    pub usdc_mint: Pubkey,

    #[serde(default = "default_usdc_decimals")]
    pub usdc_decimals: u8,

    /// Fallback fee recipient when vip.json names none.
    #[serde(default, with = "b58_opt")]
    pub fee_recipient: Option<Pubkey>,

    #[serde(default = "default_jupiter_url")]
    pub jupiter_url: String,

    #[serde(default)]
    pub vip_config_url: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Hex SHA-256 of the secret-mode answer; see [`crate::secret::answer_hash`].
    #[serde(default)]
    pub secret_answer_hash: Option<String>,
}

fn default_rpc_url() -> String {
    MAINNET_RPC.to_string()
}
fn default_dlan_decimals() -> u8 {
    DEFAULT_DLAN_DECIMALS
}
fn default_usdc_mint() -> Pubkey {
    USDC_MINT
}
fn default_usdc_decimals() -> u8 {
    6
}
fn default_jupiter_url() -> String {
    DEFAULT_JUPITER_URL.to_string()
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl ClientConfig {
    /// Minimal config; everything else takes its default.
    pub fn new(rpc_url: impl Into<String>, program_id: Pubkey, dlan_mint: Pubkey) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            program_id,
            dlan_mint,
            dlan_decimals:      default_dlan_decimals(),
            usdc_mint:          USDC_MINT,
            usdc_decimals:      default_usdc_decimals(),
            fee_recipient:      None,
            jupiter_url:        default_jupiter_url(),
            vip_config_url:     None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            secret_answer_hash: None,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidArgument(format!("config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
            .map_err(|e| Error::InvalidArgument(format!("{}: {e}", path.display())))
    }

    pub fn mints(&self) -> Mints {
        Mints { dlan: self.dlan_mint, usd: self.usdc_mint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_document_takes_defaults() {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let doc = json!({ "program_id": program.to_string(), "dlan_mint": mint.to_string() });
        let cfg = ClientConfig::from_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(cfg, ClientConfig::new(MAINNET_RPC, program, mint));
        assert_eq!(cfg.poll_interval_secs, 30);
        assert_eq!(cfg.mints().usd, USDC_MINT);
    }

    #[test]
    fn program_id_is_required() {
        let doc = json!({ "dlan_mint": Pubkey::new_unique().to_string() });
        assert!(matches!(
            ClientConfig::from_json(doc.to_string().as_bytes()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dlan.json");
        let mut cfg = ClientConfig::new(DEVNET_RPC, Pubkey::new_unique(), Pubkey::new_unique());
        cfg.fee_recipient = Some(Pubkey::new_unique());
        cfg.vip_config_url = Some("https://example.org/vip.json".into());
        std::fs::write(&path, serde_json::to_vec(&cfg).unwrap()).unwrap();
        assert_eq!(ClientConfig::from_file(&path).unwrap(), cfg);
    }
}
