//! Advisory `vip.json` configuration.
//!
//! ```json
//! {
//!   "invest_usd_per_dlan_rule": { "dlan_per_usd_per_day": 120 },
//!   "invest_fee_recipient": "<base58>",
//!   "tiers": [ { "wallet": "<base58>", "buttons": [3, 5, 10], "fee_recipient": "<base58>" } ]
//! }
//! ```
//!
//! The document is read-only and advisory.  The display loaders never fail:
//! a missing, unreachable or malformed document yields [`VipConfig::default`].
//! [`try_load_vip_config`] is the strict variant for values that get signed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::units::to_base_units_f64;

/// Fallback investment rate when the document is unavailable.
pub const DEFAULT_DLAN_PER_USD_PER_DAY: f64 = 120.0;

// ─── Document ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VipConfig {
    #[serde(default)]
    pub invest_usd_per_dlan_rule: InvestRule,
    #[serde(default, with = "b58_opt")]
    pub invest_fee_recipient: Option<Pubkey>,
    #[serde(default)]
    pub tiers: Vec<VipTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestRule {
    #[serde(default = "default_rate")]
    pub dlan_per_usd_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VipTier {
    #[serde(with = "b58")]
    pub wallet: Pubkey,
    /// Fixed daily claim amounts (human units) this wallet may choose from.
    #[serde(default)]
    pub buttons: Vec<f64>,
    #[serde(default, with = "b58_opt")]
    pub fee_recipient: Option<Pubkey>,
}

fn default_rate() -> f64 {
    DEFAULT_DLAN_PER_USD_PER_DAY
}

impl Default for InvestRule {
    fn default() -> Self {
        Self { dlan_per_usd_per_day: DEFAULT_DLAN_PER_USD_PER_DAY }
    }
}

impl Default for VipConfig {
    fn default() -> Self {
        Self {
            invest_usd_per_dlan_rule: InvestRule::default(),
            invest_fee_recipient:     None,
            tiers:                    Vec::new(),
        }
    }
}

impl VipConfig {
    /// The tier entry for `wallet`, if it is listed.
    pub fn tier_for(&self, wallet: &Pubkey) -> Option<&VipTier> {
        self.tiers.iter().find(|t| t.wallet == *wallet)
    }

    /// Tier override first, then the global investment fee recipient.
    pub fn fee_recipient_for(&self, wallet: &Pubkey) -> Option<Pubkey> {
        self.tier_for(wallet)
            .and_then(|t| t.fee_recipient)
            .or(self.invest_fee_recipient)
    }

    fn validate(&self) -> Result<()> {
        let rate = self.invest_usd_per_dlan_rule.dlan_per_usd_per_day;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::ConfigUnavailable(format!(
                "dlan_per_usd_per_day must be a positive number, got {rate}"
            )));
        }
        for tier in &self.tiers {
            if let Some(bad) = tier.buttons.iter().find(|b| !b.is_finite() || **b <= 0.0) {
                return Err(Error::ConfigUnavailable(format!(
                    "tier {} has invalid button amount {bad}",
                    tier.wallet
                )));
            }
        }
        Ok(())
    }
}

impl VipTier {
    /// Button amounts converted to base units, in document order.
    pub fn button_base_units(&self, decimals: u8) -> Result<Vec<u64>> {
        self.buttons
            .iter()
            .map(|b| to_base_units_f64(*b, decimals))
            .collect()
    }

    /// Whether `per_day_base_units` is one of this tier's buttons.
    pub fn allows(&self, per_day_base_units: u64, decimals: u8) -> bool {
        self.button_base_units(decimals)
            .map(|v| v.contains(&per_day_base_units))
            .unwrap_or(false)
    }
}

// ─── Loading ──────────────────────────────────────────────────────────────────

/// Strict parse; `ConfigUnavailable` on any malformed input.
pub fn try_parse_vip_config(bytes: &[u8]) -> Result<VipConfig> {
    let cfg: VipConfig = serde_json::from_slice(bytes)
        .map_err(|e| Error::ConfigUnavailable(format!("vip.json: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Lenient parse; falls back to the default document.
pub fn parse_vip_config(bytes: &[u8]) -> VipConfig {
    try_parse_vip_config(bytes).unwrap_or_else(|e| {
        warn!(error = %e, "vip.json rejected; using defaults");
        VipConfig::default()
    })
}

/// Fetch `vip.json` over HTTP; never fails.
pub async fn load_vip_config(http: &reqwest::Client, url: &str) -> VipConfig {
    match try_load_vip_config(http, url).await {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(url, error = %e, "vip.json unavailable; using defaults");
            VipConfig::default()
        }
    }
}

/// Fetch `vip.json` over HTTP with no fallback.
///
/// Transport errors, non-2xx statuses and malformed bodies are all
/// [`Error::ConfigUnavailable`].  Use this where a value from the document
/// ends up in an instruction argument.
pub async fn try_load_vip_config(http: &reqwest::Client, url: &str) -> Result<VipConfig> {
    let unavailable = |e: reqwest::Error| Error::ConfigUnavailable(format!("GET {url}: {e}"));
    let response = http.get(url).send().await.map_err(unavailable)?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::ConfigUnavailable(format!("GET {url} returned {status}")));
    }
    let body = response.bytes().await.map_err(unavailable)?;
    let cfg = try_parse_vip_config(&body)?;
    debug!(url, tiers = cfg.tiers.len(), "loaded vip.json");
    Ok(cfg)
}

/// Read `vip.json` from disk; never fails.
pub fn load_vip_config_file(path: impl AsRef<Path>) -> VipConfig {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => parse_vip_config(&bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "vip.json unreadable; using defaults");
            VipConfig::default()
        }
    }
}

// ─── Base58 serde adapters ────────────────────────────────────────────────────

pub(crate) mod b58 {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(d)?;
        Pubkey::from_str(raw.trim()).map_err(|e| D::Error::custom(format!("'{raw}': {e}")))
    }
}

pub(crate) mod b58_opt {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Option<Pubkey>, s: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(k) => s.serialize_str(&k.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Pubkey>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => Pubkey::from_str(raw.trim())
                .map(Some)
                .map_err(|e| D::Error::custom(format!("'{raw}': {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn sample(wallet: &Pubkey, fee: &Pubkey, global: &Pubkey) -> serde_json::Value {
        json!({
            "invest_usd_per_dlan_rule": { "dlan_per_usd_per_day": 150 },
            "invest_fee_recipient": global.to_string(),
            "tiers": [
                { "wallet": wallet.to_string(), "buttons": [3, 5.5], "fee_recipient": fee.to_string() },
                { "wallet": Pubkey::new_unique().to_string(), "buttons": [10] }
            ]
        })
    }

    #[test]
    fn parses_full_document() {
        let (wallet, fee, global) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let cfg = try_parse_vip_config(sample(&wallet, &fee, &global).to_string().as_bytes()).unwrap();

        assert_eq!(cfg.invest_usd_per_dlan_rule.dlan_per_usd_per_day, 150.0);
        let tier = cfg.tier_for(&wallet).unwrap();
        assert_eq!(tier.button_base_units(6).unwrap(), vec![3_000_000, 5_500_000]);
        assert!(tier.allows(5_500_000, 6));
        assert!(!tier.allows(4_000_000, 6));
        assert_eq!(cfg.fee_recipient_for(&wallet), Some(fee));

        let stranger = Pubkey::new_unique();
        assert!(cfg.tier_for(&stranger).is_none());
        assert_eq!(cfg.fee_recipient_for(&stranger), Some(global));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = try_parse_vip_config(b"{}").unwrap();
        assert_eq!(cfg, VipConfig::default());
        assert_eq!(cfg.invest_usd_per_dlan_rule.dlan_per_usd_per_day, 120.0);
    }

    #[test]
    fn malformed_documents_fall_back() {
        let bad_inputs: [&[u8]; 4] = [
            b"not json",
            br#"{"tiers":[{"wallet":"not-a-key","buttons":[1]}]}"#,
            br#"{"invest_usd_per_dlan_rule":{"dlan_per_usd_per_day":-4}}"#,
            br#"{"tiers":[{"wallet":"11111111111111111111111111111111","buttons":[0]}]}"#,
        ];
        for bytes in bad_inputs {
            assert!(matches!(try_parse_vip_config(bytes), Err(Error::ConfigUnavailable(_))));
            assert_eq!(parse_vip_config(bytes), VipConfig::default());
        }
    }

    #[tokio::test]
    async fn http_load_returns_document() {
        let (wallet, fee, global) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/vip.json");
                then.status(200).json_body(sample(&wallet, &fee, &global));
            })
            .await;

        let cfg = load_vip_config(&reqwest::Client::new(), &server.url("/vip.json")).await;
        mock.assert_async().await;
        assert!(cfg.tier_for(&wallet).is_some());
    }

    #[tokio::test]
    async fn http_failure_yields_default() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/vip.json");
                then.status(500).body("boom");
            })
            .await;

        let cfg = load_vip_config(&reqwest::Client::new(), &server.url("/vip.json")).await;
        assert_eq!(cfg, VipConfig::default());
    }

    #[tokio::test]
    async fn unreachable_host_yields_default() {
        // Port 9 (discard) on localhost refuses connections.
        let cfg = load_vip_config(&reqwest::Client::new(), "http://127.0.0.1:9/vip.json").await;
        assert_eq!(cfg, VipConfig::default());
    }

    #[tokio::test]
    async fn strict_load_reports_every_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/down.json");
                then.status(503);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/garbled.json");
                then.status(200).body("{\"tiers\": 7}");
            })
            .await;

        let http = reqwest::Client::new();
        for url in [
            server.url("/down.json"),
            server.url("/garbled.json"),
            "http://127.0.0.1:9/vip.json".to_string(),
        ] {
            let err = try_load_vip_config(&http, &url).await.unwrap_err();
            assert!(matches!(err, Error::ConfigUnavailable(_)), "{url}: {err:?}");
        }
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_vip_config_file(dir.path().join("absent.json")), VipConfig::default());
    }
}
