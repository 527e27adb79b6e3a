use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use dlan_sdk::{
    claim::{compute_claim, seconds_until_next_claim},
    config::{ClientConfig, DEFAULT_DLAN_DECIMALS, MAINNET_RPC, USDC_MINT},
    pda,
    quote::{JupiterClient, QuoteRequest, DEFAULT_JUPITER_URL},
    secret::{GateState, SecretGate},
    units::{to_base_units, to_human},
    vip::{load_vip_config, load_vip_config_file, VipConfig},
    ClaimKind, ClaimPreview, DlanClient,
};
use serde_json::{json, Value};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, Level};

// ─── Token symbol registry (mainnet-beta) ────────────────────────────────────

/// `(symbol, mint, decimals)`; `DLAN` resolves through configuration.
const KNOWN_TOKENS: &[(&str, &str, u8)] = &[
    ("SOL",  "So11111111111111111111111111111111111111112",  9),
    ("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6),
    ("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", 6),
];

const DEFAULT_SECRET_FILE: &str = "~/.config/dlan/secret";

// ─── Version banner ───────────────────────────────────────────────────────────

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  DLAN  v{ver}  ·  staking, claims and social on Solana");
    println!("  {}", "─".repeat(62));
    println!("  Config    --config <file> or DLAN_PROGRAM_ID + DLAN_MINT");
    println!("  Claims    fee split 1/3 to the fee recipient, capped by treasury reserve");
    println!("  Swaps     Jupiter v6 aggregator");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name        = "dlan",
    version     = env!("CARGO_PKG_VERSION"),
    author      = "DLAN",
    about       = "DLAN client — stake, claim, swap and post against the DLAN program on Solana.",
    after_help  = "\
ENVIRONMENT:
  DLAN_RPC_URL      Solana JSON-RPC endpoint  [default: https://api.mainnet-beta.solana.com]
  DLAN_KEYPAIR      Path to Ed25519 keypair JSON  [default: ~/.config/solana/id.json]
  DLAN_CONFIG       Client config JSON (program_id, dlan_mint, vip_config_url, ...)
  DLAN_PROGRAM_ID   DLAN program address (overrides the config file)
  DLAN_MINT         DLAN mint address (overrides the config file)

QUICK START:
  dlan derive vip --owner <WALLET>
  dlan to-base 12.5 --decimals 6
  dlan claim-preview --per-day 3 --days 5 --reserve 10
  dlan claim-preview --owner <WALLET> --kind vip --per-day 3
  dlan vip-claim 3
  dlan quote --in SOL --out USDC --amount 0.1"
)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(long, global = true, value_name = "URL", env = "DLAN_RPC_URL")]
    rpc_url: Option<String>,

    /// Path to the wallet's Ed25519 keypair JSON file
    #[arg(
        long,
        global     = true,
        value_name = "PATH",
        default_value = "~/.config/solana/id.json",
        env = "DLAN_KEYPAIR"
    )]
    keypair: String,

    /// Client configuration JSON file
    #[arg(long, global = true, value_name = "PATH", env = "DLAN_CONFIG")]
    config: Option<PathBuf>,

    /// DLAN program address
    #[arg(long, global = true, value_name = "PUBKEY", env = "DLAN_PROGRAM_ID")]
    program_id: Option<String>,

    /// DLAN mint address
    #[arg(long, global = true, value_name = "PUBKEY", env = "DLAN_MINT")]
    mint: Option<String>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log RPC reads and derivations to stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PdaKind {
    Pool,
    Treasury,
    MintAuthority,
    User,
    Vip,
    Profile,
    Post,
    Contact,
    SocialConfig,
    Ata,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Invest,
    Vip,
}

impl From<KindArg> for ClaimKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Invest => ClaimKind::Invest,
            KindArg::Vip => ClaimKind::Vip,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a program address (offline)
    #[command(
        after_help = "\
EXAMPLES:
  dlan derive pool
  dlan derive vip --owner <WALLET>
  dlan derive post --owner <AUTHOR> --index 7
  dlan derive contact --owner <REQUESTER> --other <TARGET>
  dlan derive ata --owner <WALLET>            # DLAN token account"
    )]
    Derive {
        #[arg(value_enum)]
        kind: PdaKind,

        /// Owner, author, requester or wallet, depending on the kind
        #[arg(long, value_name = "PUBKEY")]
        owner: Option<String>,

        /// Contact target, or the mint for `ata` (defaults to the DLAN mint)
        #[arg(long, value_name = "PUBKEY")]
        other: Option<String>,

        /// Post index
        #[arg(long, value_name = "N")]
        index: Option<u64>,
    },

    /// Convert a human amount to base units (offline)
    ToBase {
        amount: String,
        #[arg(long, default_value_t = 6)]
        decimals: u8,
    },

    /// Convert base units to a human amount (offline)
    ToHuman {
        amount: u64,
        #[arg(long, default_value_t = 6)]
        decimals: u8,
    },

    /// Preview a split claim
    ///
    /// Offline with --days and --reserve, or live against chain state with --owner.
    #[command(
        after_help = "\
EXAMPLES:
  dlan claim-preview --per-day 3 --days 5 --reserve 10
  dlan claim-preview --owner <WALLET> --kind vip --per-day 3
  dlan claim-preview --owner <WALLET> --kind invest --usd 100

NOTES:
  Payable days are capped by the treasury reserve. The fee recipient takes
  floor(gross / 3); the user takes the rest."
    )]
    ClaimPreview {
        /// DLAN per day (human)
        #[arg(long, value_name = "AMOUNT")]
        per_day: Option<String>,

        /// Invested USD; derives --per-day from the vip.json rate
        #[arg(long, value_name = "USD", conflicts_with = "per_day")]
        usd: Option<String>,

        /// Elapsed whole days (offline)
        #[arg(long)]
        days: Option<u64>,

        /// Treasury reserve in DLAN (offline)
        #[arg(long, value_name = "AMOUNT")]
        reserve: Option<String>,

        /// Read timer and reserve from chain for this wallet
        #[arg(long, value_name = "PUBKEY")]
        owner: Option<String>,

        #[arg(long, value_enum, default_value = "vip")]
        kind: KindArg,
    },

    /// Fetch a Jupiter quote (no transaction)
    Quote {
        /// Input token: SOL, USDC, USDT, DLAN or a mint address
        #[arg(long = "in", value_name = "TOKEN")]
        token_in: String,

        #[arg(long = "out", value_name = "TOKEN")]
        token_out: String,

        /// Human amount of the input token
        #[arg(long, value_name = "AMOUNT")]
        amount: String,

        /// Input token decimals; required for unknown mints
        #[arg(long)]
        decimals: Option<u8>,

        #[arg(long, value_name = "BPS", default_value_t = 50)]
        slippage_bps: u16,
    },

    /// Swap through Jupiter: quote, sign and send
    Swap {
        #[arg(long = "in", value_name = "TOKEN")]
        token_in: String,

        #[arg(long = "out", value_name = "TOKEN")]
        token_out: String,

        #[arg(long, value_name = "AMOUNT")]
        amount: String,

        #[arg(long)]
        decimals: Option<u8>,

        #[arg(long, value_name = "BPS", default_value_t = 50)]
        slippage_bps: u16,
    },

    /// Show the vip.json tiers and the wallet's buttons
    Vip {
        /// Read vip.json from a local file instead of the configured URL
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Wallet to look up (defaults to the keypair's)
        #[arg(long, value_name = "PUBKEY")]
        wallet: Option<String>,
    },

    /// Create the pool, treasury and mint authority (admin)
    InitPool,

    /// Stake USD into the pool
    Stake {
        /// Human USD amount
        amount: String,
    },

    /// Mint accrued staking rewards
    Claim,

    /// Invest USD and mint DLAN at the vip.json rate
    StakeAndMint {
        /// Human USD amount
        usd: String,
    },

    /// Claim investment accrual with the fee split
    InvestClaim {
        /// Human USD amount invested
        usd: String,
    },

    /// Claim a VIP tier button with the fee split
    VipClaim {
        /// Button amount in DLAN per day, e.g. 3
        amount: String,
    },

    /// Create the social config account (admin)
    InitSocial,

    /// Create the wallet's social profile
    InitProfile {
        handle: String,
    },

    /// Publish a post at an index
    Post {
        #[arg(long)]
        index: u64,
        content: String,
    },

    /// Ask another profile for contact
    RequestContact {
        target: String,
    },

    /// Accept or reject a contact request
    RespondContact {
        requester: String,
        /// Reject instead of accepting
        #[arg(long, default_value_t = false)]
        reject: bool,
    },

    /// Recompute the wallet's social level
    RecomputeLevel,

    /// Print the treasury reserve on an interval until interrupted
    WatchReserve {
        /// Seconds between refreshes (defaults to the config's poll interval)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Stop after this many updates
        #[arg(long, value_name = "N")]
        count: Option<u32>,
    },

    /// Unlock (or re-lock) secret mode
    Unlock {
        answer: Option<String>,

        /// Hex SHA-256 of the expected answer (defaults to the config's)
        #[arg(long, value_name = "HEX")]
        hash: Option<String>,

        #[arg(long, value_name = "PATH", default_value = DEFAULT_SECRET_FILE)]
        state_file: String,

        /// Return to the locked state
        #[arg(long, default_value_t = false, conflicts_with = "answer")]
        lock: bool,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Derive { kind, owner, other, index } => {
            cmd_derive(&cli, *kind, owner.as_deref(), other.as_deref(), *index)
        }
        Commands::ToBase { amount, decimals } => cmd_to_base(amount, *decimals, cli.json),
        Commands::ToHuman { amount, decimals } => cmd_to_human(*amount, *decimals, cli.json),
        Commands::ClaimPreview { per_day, usd, days, reserve, owner, kind } => {
            cmd_claim_preview(
                &cli,
                per_day.as_deref(), usd.as_deref(),
                *days, reserve.as_deref(), owner.as_deref(), (*kind).into(),
            )
            .await
        }
        Commands::Quote { token_in, token_out, amount, decimals, slippage_bps } => {
            cmd_quote(&cli, token_in, token_out, amount, *decimals, *slippage_bps).await
        }
        Commands::Swap { token_in, token_out, amount, decimals, slippage_bps } => {
            cmd_swap(&cli, token_in, token_out, amount, *decimals, *slippage_bps).await
        }
        Commands::Vip { file, wallet } => cmd_vip(&cli, file.as_deref(), wallet.as_deref()).await,
        Commands::InitPool => {
            let (client, payer) = connect(&cli)?;
            let r = client.initialize_pool(&payer).await.context("initialize_pool failed")?;
            emit_tx(cli.json, "init-pool", &r.signature, json!({ "pool": pda::derive_pool(client.program_id()).0.to_string() }))
        }
        Commands::Stake { amount } => {
            let (client, payer) = connect(&cli)?;
            let r = client.stake(&payer, amount).await.context("stake failed")?;
            emit_tx(cli.json, "stake", &r.signature, json!({
                "user_state": r.user_state.to_string(),
                "amount":     r.amount,
            }))
        }
        Commands::Claim => {
            let (client, payer) = connect(&cli)?;
            let r = client.claim(&payer).await.context("claim failed")?;
            emit_tx(cli.json, "claim", &r.signature, json!({}))
        }
        Commands::StakeAndMint { usd } => {
            let (client, payer) = connect(&cli)?;
            let r = client.stake_and_mint_priced(&payer, usd).await.context("stake_and_mint_priced failed")?;
            emit_tx(cli.json, "stake-and-mint", &r.signature, json!({
                "user_state": r.user_state.to_string(),
                "usd_amount": r.amount,
            }))
        }
        Commands::InvestClaim { usd } => {
            let (client, payer) = connect(&cli)?;
            let r = client.invest_claim_split(&payer, usd).await.context("invest_claim_split failed")?;
            print_claim(cli.json, "invest-claim", &r.signature, &r.fee_recipient, &r.preview, client.config().dlan_decimals)
        }
        Commands::VipClaim { amount } => {
            let (client, payer) = connect(&cli)?;
            let r = client.vip_claim_split_timed(&payer, amount).await.context("vip_claim_split_timed failed")?;
            print_claim(cli.json, "vip-claim", &r.signature, &r.fee_recipient, &r.preview, client.config().dlan_decimals)
        }
        Commands::InitSocial => {
            let (client, payer) = connect(&cli)?;
            let r = client.init_social_config(&payer).await.context("init_social_config failed")?;
            emit_tx(cli.json, "init-social", &r.signature, json!({}))
        }
        Commands::InitProfile { handle } => {
            let (client, payer) = connect(&cli)?;
            let r = client.init_profile(&payer, handle).await.context("init_profile failed")?;
            emit_tx(cli.json, "init-profile", &r.signature, json!({
                "profile": pda::derive_profile(&payer.pubkey(), client.program_id()).0.to_string(),
            }))
        }
        Commands::Post { index, content } => {
            let (client, payer) = connect(&cli)?;
            let r = client.create_post(&payer, *index, content).await.context("create_post failed")?;
            emit_tx(cli.json, "post", &r.signature, json!({ "post": r.post.to_string(), "index": r.index }))
        }
        Commands::RequestContact { target } => {
            let target = parse_pubkey(target, "target")?;
            let (client, payer) = connect(&cli)?;
            let r = client.request_contact(&payer, &target).await.context("request_contact failed")?;
            emit_tx(cli.json, "request-contact", &r.signature, json!({
                "contact": pda::derive_contact(&payer.pubkey(), &target, client.program_id()).0.to_string(),
            }))
        }
        Commands::RespondContact { requester, reject } => {
            let requester = parse_pubkey(requester, "requester")?;
            let (client, payer) = connect(&cli)?;
            let r = client
                .respond_contact(&payer, &requester, !reject)
                .await
                .context("respond_contact failed")?;
            emit_tx(cli.json, "respond-contact", &r.signature, json!({ "accepted": !reject }))
        }
        Commands::RecomputeLevel => {
            let (client, payer) = connect(&cli)?;
            let r = client.recompute_level(&payer).await.context("recompute_level failed")?;
            emit_tx(cli.json, "recompute-level", &r.signature, json!({}))
        }
        Commands::WatchReserve { interval, count } => cmd_watch_reserve(&cli, *interval, *count).await,
        Commands::Unlock { answer, hash, state_file, lock } => {
            cmd_unlock(&cli, answer.as_deref(), hash.as_deref(), state_file, *lock)
        }
    }
}

// ─── derive ───────────────────────────────────────────────────────────────────

fn cmd_derive(
    cli: &Cli,
    kind: PdaKind,
    owner: Option<&str>,
    other: Option<&str>,
    index: Option<u64>,
) -> Result<()> {
    let owner_key = || -> Result<Pubkey> {
        parse_pubkey(owner.ok_or_else(|| anyhow!("--owner is required for this kind"))?, "--owner")
    };

    let found = |name: &'static str, (address, bump): (Pubkey, u8)| (name, address, Some(bump));
    let (name, address, bump) = match kind {
        PdaKind::Pool => found("pool", pda::derive_pool(&program_id(cli)?)),
        PdaKind::Treasury => found("treasury", pda::derive_treasury(&program_id(cli)?)),
        PdaKind::MintAuthority => {
            let program = program_id(cli)?;
            let (pool, _) = pda::derive_pool(&program);
            found("mint_authority", pda::derive_mint_authority(&pool, &program))
        }
        PdaKind::User => found("user", pda::derive_user_state(&owner_key()?, &program_id(cli)?)),
        PdaKind::Vip => found("vip", pda::derive_vip_state(&owner_key()?, &program_id(cli)?)),
        PdaKind::Profile => found("profile", pda::derive_profile(&owner_key()?, &program_id(cli)?)),
        PdaKind::Post => {
            let index = index.ok_or_else(|| anyhow!("--index is required for post"))?;
            found("post", pda::derive_post(&owner_key()?, index, &program_id(cli)?))
        }
        PdaKind::Contact => {
            let target = parse_pubkey(
                other.ok_or_else(|| anyhow!("--other is required for contact"))?,
                "--other",
            )?;
            found("contact", pda::derive_contact(&owner_key()?, &target, &program_id(cli)?))
        }
        PdaKind::SocialConfig => found("social_config", pda::derive_social_config(&program_id(cli)?)),
        PdaKind::Ata => {
            let wallet = owner_key()?;
            let mint = match other {
                Some(m) => parse_pubkey(m, "--other")?,
                None => client_config(cli)?.dlan_mint,
            };
            ("ata", pda::derive_ata(&wallet, &mint), None)
        }
    };

    if cli.json {
        println!("{}", json!({ "kind": name, "address": address.to_string(), "bump": bump }));
    } else {
        println!("  {name:<16} {address}");
        if let Some(b) = bump {
            println!("  {:<16} {b}", "bump");
        }
    }
    Ok(())
}

// ─── to-base / to-human ───────────────────────────────────────────────────────

fn cmd_to_base(amount: &str, decimals: u8, json_output: bool) -> Result<()> {
    let base = to_base_units(amount, decimals)?;
    if json_output {
        println!("{}", json!({ "human": amount, "decimals": decimals, "base_units": base }));
    } else {
        println!("{base}");
    }
    Ok(())
}

fn cmd_to_human(amount: u64, decimals: u8, json_output: bool) -> Result<()> {
    let human = to_human(amount, decimals);
    if json_output {
        println!("{}", json!({ "base_units": amount, "decimals": decimals, "human": human }));
    } else {
        println!("{human}");
    }
    Ok(())
}

// ─── claim-preview ────────────────────────────────────────────────────────────

async fn cmd_claim_preview(
    cli: &Cli,
    per_day: Option<&str>,
    usd: Option<&str>,
    days: Option<u64>,
    reserve: Option<&str>,
    owner: Option<&str>,
    kind: ClaimKind,
) -> Result<()> {
    match owner {
        Some(owner) => {
            let owner = parse_pubkey(owner, "--owner")?;
            let client = DlanClient::new(client_config(cli)?);
            let decimals = client.config().dlan_decimals;
            let per_day = match (per_day, usd) {
                (Some(p), _) => to_base_units(p, decimals)?,
                (None, Some(u)) => {
                    let vip = client.vip_config().await;
                    dlan_sdk::claim::invest_daily_rate(u, vip.invest_usd_per_dlan_rule.dlan_per_usd_per_day, decimals)?
                }
                (None, None) => bail!("--per-day or --usd is required"),
            };
            let preview = client
                .preview_claim(&owner, kind, per_day)
                .await
                .context("claim preview failed")?;
            print_preview(cli.json, &preview, decimals)
        }
        None => {
            let decimals = offline_decimals(cli)?;
            let per_day = per_day.ok_or_else(|| anyhow!("--per-day is required offline"))?;
            let days = days.ok_or_else(|| anyhow!("--days is required offline (or pass --owner)"))?;
            let reserve = reserve.ok_or_else(|| anyhow!("--reserve is required offline (or pass --owner)"))?;
            let reserve = to_base_units(reserve, decimals).context("--reserve")?;
            let q = compute_claim(per_day, days, reserve, decimals)?;

            if cli.json {
                println!("{}", serde_json::to_string(&q)?);
            } else {
                println!("─── Claim Preview ────────────────────────────────────────────────");
                println!("  Per day          {:>20}", to_human(q.per_day_base_units, decimals));
                println!("  Elapsed days     {:>20}", days);
                println!("  Reserve allows   {:>20}  days", q.max_days_by_reserve);
                println!("  Payable days     {:>20}", q.payable_days);
                println!();
                println!("  Gross            {:>20}", to_human(q.gross_base_units, decimals));
                println!("  You receive      {:>20}", to_human(q.user_base_units, decimals));
                println!("  Fee (1/3)        {:>20}", to_human(q.fee_base_units, decimals));
            }
            Ok(())
        }
    }
}

fn print_preview(json_output: bool, p: &ClaimPreview, decimals: u8) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string(p)?);
        return Ok(());
    }
    let q = &p.quote;
    println!("─── Claim Preview ────────────────────────────────────────────────");
    println!("  Owner            {}", p.owner);
    println!("  Chain time       {}", p.chain_time);
    match p.last_claim_ts {
        Some(ts) => println!("  Last claim       {ts}  (next in {}s)", seconds_until_next_claim(p.chain_time, ts)),
        None => println!("  Last claim       never"),
    }
    println!("  Reserve          {:>20}", to_human(p.reserve_base_units, decimals));
    println!("  Elapsed days     {:>20}", p.elapsed_days);
    println!("  Payable days     {:>20}", q.payable_days);
    println!();
    println!("  Gross            {:>20}", to_human(q.gross_base_units, decimals));
    println!("  You receive      {:>20}", to_human(q.user_base_units, decimals));
    println!("  Fee (1/3)        {:>20}", to_human(q.fee_base_units, decimals));
    Ok(())
}

fn print_claim(
    json_output: bool,
    command: &str,
    signature: &str,
    fee_recipient: &Pubkey,
    preview: &ClaimPreview,
    decimals: u8,
) -> Result<()> {
    if json_output {
        println!("{}", json!({
            "status":        "ok",
            "command":       command,
            "tx":            signature,
            "fee_recipient": fee_recipient.to_string(),
            "preview":       serde_json::to_value(preview)?,
        }));
    } else {
        print_preview(false, preview, decimals)?;
        println!("  Fee recipient    {fee_recipient}");
        println!();
        println!("  Transaction      {signature}");
    }
    Ok(())
}

// ─── quote / swap ─────────────────────────────────────────────────────────────

async fn cmd_quote(
    cli: &Cli,
    token_in: &str,
    token_out: &str,
    amount: &str,
    decimals: Option<u8>,
    slippage_bps: u16,
) -> Result<()> {
    let config = client_config(cli).ok();
    let request = quote_request(config.as_ref(), token_in, token_out, amount, decimals, slippage_bps)?;
    let url = config.map(|c| c.jupiter_url).unwrap_or_else(|| DEFAULT_JUPITER_URL.to_string());

    let quote = JupiterClient::new(url).get_quote(&request).await.context("quote failed")?;
    if cli.json {
        println!("{}", json!({
            "input_mint":             request.input_mint.to_string(),
            "output_mint":            request.output_mint.to_string(),
            "in_amount":              quote.in_amount,
            "out_amount":             quote.out_amount,
            "other_amount_threshold": quote.other_amount_threshold,
            "price_impact_pct":       quote.price_impact_pct,
            "route_hops":             quote.route.len(),
        }));
    } else {
        println!("─── Jupiter Quote ────────────────────────────────────────────────");
        println!("  Sell             {:>20}  {token_in}", quote.in_amount);
        println!("  Receive (est.)   {:>20}  {token_out}", quote.out_amount);
        println!("  Min accepted     {:>20}  ({} bps slippage)", quote.other_amount_threshold, slippage_bps);
        println!("  Price impact     {:>19.4}%", quote.price_impact_pct);
        println!("  Route hops       {:>20}", quote.route.len());
    }
    Ok(())
}

async fn cmd_swap(
    cli: &Cli,
    token_in: &str,
    token_out: &str,
    amount: &str,
    decimals: Option<u8>,
    slippage_bps: u16,
) -> Result<()> {
    let (client, payer) = connect(cli)?;
    let request = quote_request(Some(client.config()), token_in, token_out, amount, decimals, slippage_bps)?;
    let r = client.swap(&payer, request).await.context("swap failed")?;

    if cli.json {
        println!("{}", json!({
            "status":         "ok",
            "command":        "swap",
            "tx":             r.signature,
            "input_mint":     r.input_mint.to_string(),
            "output_mint":    r.output_mint.to_string(),
            "in_amount":      r.in_amount,
            "out_amount":     r.out_amount,
            "min_amount_out": r.min_amount_out,
        }));
    } else {
        println!("─── Swap Executed ────────────────────────────────────────────────");
        println!("  Sold             {:>20}  {token_in}", r.in_amount);
        println!("  Received (est.)  {:>20}  {token_out}", r.out_amount);
        println!("  Min accepted     {:>20}  {token_out}", r.min_amount_out);
        println!("  Transaction      {}", r.signature);
    }
    Ok(())
}

fn quote_request(
    config: Option<&ClientConfig>,
    token_in: &str,
    token_out: &str,
    amount: &str,
    decimals: Option<u8>,
    slippage_bps: u16,
) -> Result<QuoteRequest> {
    let (input_mint, known_decimals) = resolve_mint(config, token_in).context("--in")?;
    let (output_mint, _) = resolve_mint(config, token_out).context("--out")?;
    if input_mint == output_mint {
        bail!("--in and --out must be different tokens.");
    }
    let decimals = decimals.or(known_decimals).ok_or_else(|| {
        anyhow!("--decimals is required for unknown input mint {input_mint}")
    })?;
    let amount = to_base_units(amount, decimals).context("--amount")?;
    if amount == 0 {
        bail!("--amount must be > 0");
    }
    Ok(QuoteRequest { input_mint, output_mint, amount, slippage_bps })
}

// ─── vip ──────────────────────────────────────────────────────────────────────

async fn cmd_vip(cli: &Cli, file: Option<&Path>, wallet: Option<&str>) -> Result<()> {
    let vip: VipConfig = match file {
        Some(path) => load_vip_config_file(path),
        None => match optional_config(cli)?.and_then(|c| c.vip_config_url) {
            Some(url) => load_vip_config(&reqwest::Client::new(), &url).await,
            None => VipConfig::default(),
        },
    };
    let wallet = match wallet {
        Some(w) => Some(parse_pubkey(w, "--wallet")?),
        None => load_keypair(&cli.keypair).ok().map(|k| k.pubkey()),
    };
    let tier = wallet.and_then(|w| vip.tier_for(&w));

    if cli.json {
        println!("{}", json!({
            "config": serde_json::to_value(&vip)?,
            "wallet": wallet.map(|w| w.to_string()),
            "buttons": tier.map(|t| t.buttons.clone()),
            "fee_recipient": wallet.and_then(|w| vip.fee_recipient_for(&w)).map(|k| k.to_string()),
        }));
    } else {
        println!("─── VIP Config ───────────────────────────────────────────────────");
        println!("  Invest rate      {} DLAN per USD per day", vip.invest_usd_per_dlan_rule.dlan_per_usd_per_day);
        println!("  Tiers            {}", vip.tiers.len());
        if let Some(w) = wallet {
            println!("  Wallet           {w}");
            match tier {
                Some(t) => println!("  Buttons          {:?}", t.buttons),
                None => println!("  Buttons          none (not a tier member)"),
            }
            if let Some(fee) = vip.fee_recipient_for(&w) {
                println!("  Fee recipient    {fee}");
            }
        }
    }
    Ok(())
}

// ─── watch-reserve ────────────────────────────────────────────────────────────

async fn cmd_watch_reserve(cli: &Cli, interval: Option<u64>, count: Option<u32>) -> Result<()> {
    let config = client_config(cli)?;
    let secs = interval.unwrap_or(config.poll_interval_secs).max(1);
    let decimals = config.dlan_decimals;
    let client = DlanClient::new(config);

    let poller = client.watch_reserve(Duration::from_secs(secs));
    let mut rx = poller.subscribe();
    let mut seen = 0u32;
    while count.map_or(true, |n| seen < n) {
        rx.changed().await.context("reserve poller stopped")?;
        let Some(snap) = *rx.borrow_and_update() else { continue };
        seen += 1;
        if cli.json {
            println!("{}", serde_json::to_string(&snap)?);
        } else {
            println!("  {}  reserve {}", snap.chain_time, to_human(snap.reserve_base_units, decimals));
        }
    }
    poller.stop();
    Ok(())
}

// ─── unlock ───────────────────────────────────────────────────────────────────

fn cmd_unlock(
    cli: &Cli,
    answer: Option<&str>,
    hash: Option<&str>,
    state_file: &str,
    lock: bool,
) -> Result<()> {
    let expected = match hash {
        Some(h) => h.to_string(),
        None => optional_config(cli)?
            .and_then(|c| c.secret_answer_hash)
            .ok_or_else(|| anyhow!("--hash or secret_answer_hash in --config is required"))?,
    };
    let mut gate = SecretGate::load(expand_home(state_file), expected)?;

    if lock {
        gate.lock()?;
    } else if let Some(answer) = answer {
        if !gate.try_unlock(answer)? {
            bail!("Wrong answer. Secret mode stays locked.");
        }
    }

    let state = match gate.state() {
        GateState::Locked => "locked",
        GateState::Unlocked => "unlocked",
    };
    if cli.json {
        println!("{}", json!({ "state": state }));
    } else {
        println!("  Secret mode      {state}");
    }
    Ok(())
}

// ─── Shared utilities ─────────────────────────────────────────────────────────

fn emit_tx(json_output: bool, command: &str, signature: &str, extra: Value) -> Result<()> {
    if json_output {
        let mut out = json!({ "status": "ok", "command": command, "tx": signature });
        if let (Some(map), Value::Object(more)) = (out.as_object_mut(), extra) {
            map.extend(more);
        }
        println!("{out}");
    } else {
        if let Value::Object(fields) = &extra {
            for (k, v) in fields {
                let v = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                println!("  {k:<16} {v}");
            }
        }
        println!("  Transaction      {signature}");
    }
    Ok(())
}

/// The `--config` file, if one was given.
fn optional_config(cli: &Cli) -> Result<Option<ClientConfig>> {
    cli.config
        .as_ref()
        .map(|p| {
            let path = expand_home(&p.to_string_lossy());
            debug!(path = %path, "loading config");
            ClientConfig::from_file(&path).with_context(|| format!("--config {path}"))
        })
        .transpose()
}

/// DLAN decimals for offline math: `--config` if given, else the default.
fn offline_decimals(cli: &Cli) -> Result<u8> {
    Ok(optional_config(cli)?.map_or(DEFAULT_DLAN_DECIMALS, |c| c.dlan_decimals))
}

fn program_id(cli: &Cli) -> Result<Pubkey> {
    if let Some(p) = &cli.program_id {
        return parse_pubkey(p, "--program-id");
    }
    optional_config(cli)?
        .map(|c| c.program_id)
        .ok_or_else(|| anyhow!("No program address. Pass --program-id, set DLAN_PROGRAM_ID, or use --config."))
}

/// Config file (if any) with explicit flags layered on top.
fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match optional_config(cli)? {
        Some(c) => c,
        None => {
            let mint = cli.mint.as_deref().ok_or_else(|| {
                anyhow!("No DLAN mint. Pass --mint, set DLAN_MINT, or use --config.")
            })?;
            ClientConfig::new(MAINNET_RPC, program_id(cli)?, parse_pubkey(mint, "--mint")?)
        }
    };
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(p) = &cli.program_id {
        config.program_id = parse_pubkey(p, "--program-id")?;
    }
    if let Some(m) = &cli.mint {
        config.dlan_mint = parse_pubkey(m, "--mint")?;
    }
    Ok(config)
}

fn connect(cli: &Cli) -> Result<(DlanClient, Keypair)> {
    let config = client_config(cli)?;
    let payer = load_keypair(&cli.keypair)?;
    debug!(rpc = %config.rpc_url, wallet = %payer.pubkey(), "connecting");
    Ok((DlanClient::new(config), payer))
}

/// Resolve a symbol or base-58 mint; returns known decimals when available.
fn resolve_mint(config: Option<&ClientConfig>, symbol_or_address: &str) -> Result<(Pubkey, Option<u8>)> {
    let upper = symbol_or_address.to_uppercase();
    if upper == "DLAN" {
        let c = config.ok_or_else(|| anyhow!("DLAN needs --config or --mint to resolve"))?;
        return Ok((c.dlan_mint, Some(c.dlan_decimals)));
    }
    for (sym, addr, decimals) in KNOWN_TOKENS {
        if upper == *sym {
            return Ok((Pubkey::from_str(addr)?, Some(*decimals)));
        }
    }
    let mint = Pubkey::from_str(symbol_or_address).map_err(|_| anyhow!(
        "Unknown token '{}'. Use DLAN, a built-in symbol ({}) or a base-58 mint address.",
        symbol_or_address,
        KNOWN_TOKENS.iter().map(|(s, _, _)| *s).collect::<Vec<_>>().join(", ")
    ))?;
    let decimals = (mint == USDC_MINT).then_some(6);
    Ok((mint, decimals))
}

fn parse_pubkey(s: &str, what: &str) -> Result<Pubkey> {
    Pubkey::from_str(s).map_err(|_| anyhow!("{what}: '{s}' is not a base-58 public key"))
}

/// Expand `~/` to `$HOME/` in file paths.
fn expand_home(path: &str) -> String {
    if path.starts_with("~/") {
        format!("{}{}", std::env::var("HOME").unwrap_or_default(), &path[1..])
    } else {
        path.to_string()
    }
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded).map_err(|e| anyhow!(
        "Cannot load keypair from '{}': {}\n  \
         Set DLAN_KEYPAIR or pass --keypair to specify a different path.",
        expanded, e
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dlan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_config_without_file() {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let cli = parse(&[
            "--program-id", &program.to_string(),
            "--mint", &mint.to_string(),
            "--rpc-url", "http://localhost:8899",
            "claim",
        ]);
        let cfg = client_config(&cli).unwrap();
        assert_eq!(cfg.program_id, program);
        assert_eq!(cfg.dlan_mint, mint);
        assert_eq!(cfg.rpc_url, "http://localhost:8899");
    }

    #[test]
    fn missing_addresses_are_reported() {
        let mut cli = parse(&["derive", "pool"]);
        // DLAN_PROGRAM_ID / DLAN_CONFIG from the environment must not leak in.
        cli.program_id = None;
        cli.config = None;
        let err = program_id(&cli).unwrap_err();
        assert!(err.to_string().contains("--program-id"), "{err}");
    }

    #[test]
    fn offline_preview_uses_config_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dlan.json");
        let doc = json!({
            "program_id": Pubkey::new_unique().to_string(),
            "dlan_mint": Pubkey::new_unique().to_string(),
            "dlan_decimals": 9
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        let mut cli = parse(&["claim-preview", "--per-day", "3", "--days", "1", "--reserve", "10"]);
        cli.config = None;
        assert_eq!(offline_decimals(&cli).unwrap(), DEFAULT_DLAN_DECIMALS);
        cli.config = Some(path);
        assert_eq!(offline_decimals(&cli).unwrap(), 9);
    }

    #[test]
    fn symbols_resolve_with_decimals() {
        let (sol, d) = resolve_mint(None, "sol").unwrap();
        assert_eq!(sol.to_string(), "So11111111111111111111111111111111111111112");
        assert_eq!(d, Some(9));
        assert!(resolve_mint(None, "DLAN").is_err());
        assert!(resolve_mint(None, "nope").is_err());
    }

    #[test]
    fn quote_request_converts_human_amounts() {
        let req = quote_request(None, "SOL", "USDC", "0.25", None, 50).unwrap();
        assert_eq!(req.amount, 250_000_000);
        assert_eq!(req.output_mint, USDC_MINT);
        assert!(quote_request(None, "SOL", "SOL", "1", None, 50).is_err());
        assert!(quote_request(None, "SOL", "USDC", "0", None, 50).is_err());
        assert!(quote_request(None, &Pubkey::new_unique().to_string(), "USDC", "1", None, 50).is_err());
    }

    #[test]
    fn home_expansion_only_touches_tilde_prefix() {
        assert_eq!(expand_home("/tmp/x"), "/tmp/x");
        assert!(!expand_home("~/x").starts_with('~'));
    }
}
