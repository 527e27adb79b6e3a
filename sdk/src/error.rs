//! SDK error type.

/// All errors returned by the DLAN SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── RPC / network ────────────────────────────────────────────────────────
    /// A Solana JSON-RPC read failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    /// An HTTP collaborator (quote API, config host) could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ── Derivation ───────────────────────────────────────────────────────────
    /// Seed list violates the program-address scheme (length, count, no bump).
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    // ── Amounts ──────────────────────────────────────────────────────────────
    /// Negative, non-finite, non-numeric or out-of-range amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Integer overflow in amount math")]
    MathOverflow,

    // ── Claims ───────────────────────────────────────────────────────────────
    /// No whole day has elapsed, or the per-day amount rounds to zero.
    #[error("Nothing to claim yet — no payable days")]
    NothingToClaim,

    /// The shared custody account holds no tokens.
    #[error("Reserve is empty — claims are paused until it is refilled")]
    ReserveEmpty,

    // ── Quotes ───────────────────────────────────────────────────────────────
    /// The aggregator returned an error status or an unusable route.
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    // ── Submission ───────────────────────────────────────────────────────────
    /// The signer declined (or failed) to sign the transaction.
    #[error("Submission rejected by signer: {0}")]
    SubmissionRejected(String),

    /// The RPC node refused or failed to confirm the transaction.
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// Another submission for the same action is still outstanding.
    #[error("A `{0}` submission is already in flight")]
    InFlight(String),

    // ── Configuration ────────────────────────────────────────────────────────
    /// Advisory configuration could not be fetched or parsed.
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    // ── Account parsing ──────────────────────────────────────────────────────
    /// Raw account bytes could not be deserialized.
    #[error("Account parse error at offset {offset}: {reason}")]
    ParseError { offset: usize, reason: String },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ── Local storage ────────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
