//! Jupiter aggregator client: swap quotes and signable swap transactions.
//!
//! Only the shape this crate needs from the HTTP API is modelled; the raw
//! quote JSON is kept and echoed back verbatim to `/swap`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_JUPITER_URL: &str = "https://quote-api.jup.ag/v6";

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint:   Pubkey,
    pub output_mint:  Pubkey,
    /// Input amount in base units of `input_mint`.
    pub amount:       u64,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub in_amount:              u64,
    pub out_amount:             u64,
    /// Minimum output after slippage.
    pub other_amount_threshold: u64,
    pub price_impact_pct:       f64,
    /// `routePlan` hops as returned by the aggregator.
    pub route:                  Vec<Value>,
    /// Full quote document, required verbatim by `/swap`.
    pub raw:                    Value,
}

#[derive(Debug, Clone)]
pub struct SwapTransaction {
    /// Serialized, unsigned versioned transaction.
    pub blob:                    Vec<u8>,
    pub last_valid_block_height: Option<u64>,
}

impl SwapTransaction {
    /// Deserialize the blob for signing.
    pub fn to_versioned(&self) -> Result<VersionedTransaction> {
        bincode::deserialize(&self.blob)
            .map_err(|e| Error::QuoteUnavailable(format!("swap transaction is not decodable: {e}")))
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JupiterClient {
    http:     reqwest::Client,
    base_url: String,
}

impl Default for JupiterClient {
    fn default() -> Self {
        Self::new(DEFAULT_JUPITER_URL)
    }
}

impl JupiterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET /quote`.  Any non-success status, missing route or zero output is
    /// `QuoteUnavailable`.
    pub async fn get_quote(&self, req: &QuoteRequest) -> Result<Quote> {
        if req.amount == 0 {
            return Err(Error::InvalidAmount("quote amount must be > 0".into()));
        }
        let url = format!("{}/quote", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("inputMint",   req.input_mint.to_string()),
                ("outputMint",  req.output_mint.to_string()),
                ("amount",      req.amount.to_string()),
                ("slippageBps", req.slippage_bps.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::QuoteUnavailable(format!("GET {url}: {e}")))?;

        let raw = read_json(response, &url).await?;
        let quote = parse_quote(raw)?;
        debug!(
            input = %req.input_mint, output = %req.output_mint,
            in_amount = quote.in_amount, out_amount = quote.out_amount,
            hops = quote.route.len(), "quote received"
        );
        Ok(quote)
    }

    /// `POST /swap` for a previously fetched quote.
    pub async fn build_swap_transaction(&self, quote: &Quote, user: &Pubkey) -> Result<SwapTransaction> {
        let url = format!("{}/swap", self.base_url);
        let body = json!({
            "quoteResponse":    quote.raw,
            "userPublicKey":    user.to_string(),
            "wrapAndUnwrapSol": true,
        });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::QuoteUnavailable(format!("POST {url}: {e}")))?;

        let raw = read_json(response, &url).await?;
        let encoded = raw["swapTransaction"]
            .as_str()
            .ok_or_else(|| Error::QuoteUnavailable("swap response has no swapTransaction".into()))?;
        let blob = STANDARD
            .decode(encoded)
            .map_err(|e| Error::QuoteUnavailable(format!("swapTransaction is not base64: {e}")))?;

        Ok(SwapTransaction {
            blob,
            last_valid_block_height: raw["lastValidBlockHeight"].as_u64(),
        })
    }
}

// ─── Parsing ──────────────────────────────────────────────────────────────────

async fn read_json(response: reqwest::Response, url: &str) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::QuoteUnavailable(format!("read body from {url}: {e}")))?;
    if !status.is_success() {
        return Err(Error::QuoteUnavailable(format!("{url} returned {status}: {body}")));
    }
    serde_json::from_str(&body)
        .map_err(|e| Error::QuoteUnavailable(format!("{url} returned invalid JSON: {e}")))
}

/// Amounts arrive as decimal strings; accept bare numbers too.
fn amount_field(raw: &Value, key: &str) -> Result<u64> {
    let v = &raw[key];
    v.as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .or_else(|| v.as_u64())
        .ok_or_else(|| Error::QuoteUnavailable(format!("quote field `{key}` missing or not an integer")))
}

fn parse_quote(raw: Value) -> Result<Quote> {
    let route = match raw.get("routePlan").and_then(Value::as_array) {
        Some(hops) if !hops.is_empty() => hops.clone(),
        _ => return Err(Error::QuoteUnavailable("no route for this pair".into())),
    };
    let out_amount = amount_field(&raw, "outAmount")?;
    if out_amount == 0 {
        return Err(Error::QuoteUnavailable("route yields zero output".into()));
    }
    let in_amount = amount_field(&raw, "inAmount")?;
    let other_amount_threshold = amount_field(&raw, "otherAmountThreshold").unwrap_or(out_amount);
    let price_impact_pct = raw["priceImpactPct"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| raw["priceImpactPct"].as_f64())
        .unwrap_or(0.0);

    Ok(Quote { in_amount, out_amount, other_amount_threshold, price_impact_pct, route, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn sol() -> Pubkey {
        Pubkey::new_from_array([1u8; 32])
    }
    fn usdc() -> Pubkey {
        Pubkey::new_from_array([2u8; 32])
    }

    fn request(amount: u64) -> QuoteRequest {
        QuoteRequest { input_mint: sol(), output_mint: usdc(), amount, slippage_bps: 50 }
    }

    fn quote_body() -> Value {
        json!({
            "inputMint": sol().to_string(),
            "inAmount": "1000000000",
            "outputMint": usdc().to_string(),
            "outAmount": "185000000",
            "otherAmountThreshold": "184075000",
            "priceImpactPct": "0.0012",
            "routePlan": [ { "swapInfo": { "label": "Whirlpool" }, "percent": 100 } ]
        })
    }

    #[tokio::test]
    async fn quote_sends_query_and_parses_amounts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/quote")
                    .query_param("inputMint", sol().to_string().as_str())
                    .query_param("outputMint", usdc().to_string().as_str())
                    .query_param("amount", "1000000000")
                    .query_param("slippageBps", "50");
                then.status(200).json_body(quote_body());
            })
            .await;

        let client = JupiterClient::new(server.base_url());
        let q = client.get_quote(&request(1_000_000_000)).await.unwrap();
        mock.assert_async().await;

        assert_eq!(q.in_amount, 1_000_000_000);
        assert_eq!(q.out_amount, 185_000_000);
        assert_eq!(q.other_amount_threshold, 184_075_000);
        assert_eq!(q.route.len(), 1);
        assert!((q.price_impact_pct - 0.0012).abs() < 1e-12);
    }

    #[tokio::test]
    async fn error_status_is_quote_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/quote");
                then.status(400).json_body(json!({ "error": "Could not find any route" }));
            })
            .await;

        let err = JupiterClient::new(server.base_url())
            .get_quote(&request(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuoteUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_route_is_quote_unavailable() {
        let mut body = quote_body();
        body.as_object_mut().unwrap().remove("routePlan");
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/quote");
                then.status(200).json_body(body);
            })
            .await;

        let err = JupiterClient::new(server.base_url())
            .get_quote(&request(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuoteUnavailable(_)));
    }

    #[test]
    fn zero_output_and_empty_route_are_rejected() {
        let mut zero = quote_body();
        zero["outAmount"] = json!("0");
        assert!(matches!(parse_quote(zero), Err(Error::QuoteUnavailable(_))));

        let mut empty = quote_body();
        empty["routePlan"] = json!([]);
        assert!(matches!(parse_quote(empty), Err(Error::QuoteUnavailable(_))));
    }

    #[tokio::test]
    async fn zero_amount_never_hits_the_network() {
        let err = JupiterClient::new("http://127.0.0.1:9").get_quote(&request(0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn swap_posts_quote_and_decodes_blob() {
        let user = Pubkey::new_from_array([3u8; 32]);
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/swap")
                    .json_body_partial(
                        json!({ "userPublicKey": user.to_string(), "wrapAndUnwrapSol": true }).to_string(),
                    );
                then.status(200).json_body(json!({
                    "swapTransaction": STANDARD.encode([1u8, 2, 3, 4]),
                    "lastValidBlockHeight": 279_000_000u64
                }));
            })
            .await;

        let client = JupiterClient::new(server.base_url());
        let quote = parse_quote(quote_body()).unwrap();
        let tx = client.build_swap_transaction(&quote, &user).await.unwrap();
        mock.assert_async().await;

        assert_eq!(tx.blob, vec![1, 2, 3, 4]);
        assert_eq!(tx.last_valid_block_height, Some(279_000_000));
        assert!(matches!(tx.to_versioned(), Err(Error::QuoteUnavailable(_))));
    }

    #[tokio::test]
    async fn swap_without_transaction_is_quote_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/swap");
                then.status(200).json_body(json!({ "error": "stale quote" }));
            })
            .await;

        let quote = parse_quote(quote_body()).unwrap();
        let err = JupiterClient::new(server.base_url())
            .build_swap_transaction(&quote, &Pubkey::new_unique())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuoteUnavailable(_)));
    }
}
