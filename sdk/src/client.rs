//! [`DlanClient`]: the main entry point for wallet-driven integrations.

use std::time::Duration;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Signature, Signer},
    sysvar,
    transaction::{Transaction, VersionedTransaction},
};
use tracing::{debug, info, warn};

use crate::{
    claim::{compute_claim_base, elapsed_days, invest_daily_rate, seconds_until_next_claim},
    config::{ClientConfig, DEVNET_RPC, MAINNET_RPC},
    error::{Error, Result},
    guard::{InFlightGuard, InFlightTicket},
    instructions::{
        claim_ix, create_post_ix, init_profile_ix, init_social_config_ix, initialize_pool_ix,
        invest_claim_split_ix, recompute_level_ix, request_contact_ix, respond_contact_ix,
        stake_and_mint_priced_ix, stake_ix, vip_claim_split_timed_ix, ProgramInstruction,
    },
    pda::{derive_ata, derive_post, derive_treasury, derive_user_state, derive_vip_state},
    poll::Poller,
    quote::{JupiterClient, QuoteRequest},
    state::{parse_claim_timer, parse_clock_unix_timestamp, parse_token_amount, ClaimTimer},
    types::{
        ClaimKind, ClaimPreview, ClaimResult, PostResult, ReserveSnapshot, StakeResult, SwapResult,
        TxResult,
    },
    units::{to_base_units, to_base_units_f64},
    vip::{load_vip_config, try_load_vip_config, VipConfig},
};

/// Longest profile handle the client will submit.
pub const MAX_HANDLE_LEN: usize = 32;
/// Longest post body the client will submit.
pub const MAX_POST_LEN: usize = 280;

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async DLAN client for Solana.
///
/// Every write derives its accounts, converts amounts to base units, then
/// submits exactly one transaction through [`DlanClient::submit`].  Nothing
/// is retried and no local state changes unless a signature comes back.
#[derive(Debug, Clone)]
pub struct DlanClient {
    config:  ClientConfig,
    http:    reqwest::Client,
    jupiter: JupiterClient,
    guard:   InFlightGuard,
}

impl DlanClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = reqwest::Client::new();
        let jupiter = JupiterClient::with_http(http.clone(), config.jupiter_url.clone());
        Self { config, http, jupiter, guard: InFlightGuard::new() }
    }

    /// Pre-configured client for Solana devnet.
    pub fn devnet(program_id: Pubkey, dlan_mint: Pubkey) -> Self {
        Self::new(ClientConfig::new(DEVNET_RPC, program_id, dlan_mint))
    }

    /// Pre-configured client for Solana mainnet-beta.
    pub fn mainnet(program_id: Pubkey, dlan_mint: Pubkey) -> Self {
        Self::new(ClientConfig::new(MAINNET_RPC, program_id, dlan_mint))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.config.program_id
    }

    pub fn guard(&self) -> &InFlightGuard {
        &self.guard
    }

    pub fn jupiter(&self) -> &JupiterClient {
        &self.jupiter
    }

    // ── Read operations ───────────────────────────────────────────────────────

    /// Current cluster time from the Clock sysvar.
    pub async fn chain_time(&self) -> Result<i64> {
        let data = self.rpc().get_account_data(&sysvar::clock::ID).await?;
        parse_clock_unix_timestamp(&data)
    }

    /// DLAN held by the treasury's token account; zero if it does not exist yet.
    pub async fn reserve_balance(&self) -> Result<u64> {
        let (treasury, _) = derive_treasury(&self.config.program_id);
        let vault = derive_ata(&treasury, &self.config.dlan_mint);
        match self.fetch_optional(&vault).await? {
            Some(data) => parse_token_amount(&data),
            None => Ok(0),
        }
    }

    pub async fn reserve_snapshot(&self) -> Result<ReserveSnapshot> {
        Ok(ReserveSnapshot {
            reserve_base_units: self.reserve_balance().await?,
            chain_time:         self.chain_time().await?,
        })
    }

    /// The claim timer for `owner`, or `None` before the first claim.
    pub async fn claim_timer(&self, owner: &Pubkey, kind: ClaimKind) -> Result<Option<ClaimTimer>> {
        let address = self.timer_address(owner, kind);
        match self.fetch_optional(&address).await? {
            Some(data) => Ok(Some(parse_claim_timer(&data)?)),
            None => Ok(None),
        }
    }

    /// Preview a split claim of `per_day_base_units` DLAN per day.
    ///
    /// Before the first claim there is no timer; one day is treated as payable.
    pub async fn preview_claim(
        &self,
        owner:              &Pubkey,
        kind:               ClaimKind,
        per_day_base_units: u64,
    ) -> Result<ClaimPreview> {
        let now = self.chain_time().await?;
        let reserve = self.reserve_balance().await?;
        let last = self.claim_timer(owner, kind).await?.map(|t| t.last_claim_ts);

        let (days, next_in) = match last {
            Some(ts) => (elapsed_days(now, ts), seconds_until_next_claim(now, ts)),
            None => (1, 0),
        };
        let quote = compute_claim_base(per_day_base_units, days, reserve)?;
        debug!(%owner, ?kind, days, reserve, payable = quote.payable_days, "claim preview");

        Ok(ClaimPreview {
            kind,
            owner: *owner,
            chain_time: now,
            last_claim_ts: last,
            elapsed_days: days,
            reserve_base_units: reserve,
            next_claim_in_secs: next_in,
            quote,
        })
    }

    /// The advisory vip.json document, or the default when none is configured
    /// or it cannot be loaded.
    pub async fn vip_config(&self) -> VipConfig {
        match &self.config.vip_config_url {
            Some(url) => load_vip_config(&self.http, url).await,
            None => VipConfig::default(),
        }
    }

    /// Refresh the reserve and chain time every `interval` until dropped.
    pub fn watch_reserve(&self, interval: Duration) -> Poller<ReserveSnapshot> {
        let client = self.clone();
        Poller::spawn(interval, move || {
            let client = client.clone();
            async move { client.reserve_snapshot().await }
        })
    }

    // ── Staking ───────────────────────────────────────────────────────────────

    /// Create the pool, treasury and mint authority (admin only).
    pub async fn initialize_pool(&self, admin: &dyn Signer) -> Result<TxResult> {
        let ix = initialize_pool_ix(&self.config.program_id, &admin.pubkey(), &self.config.mints());
        self.submit_one(ProgramInstruction::InitializePool, ix, admin).await
    }

    /// Stake a human USD amount, e.g. `"25.5"`.
    pub async fn stake(&self, user: &dyn Signer, amount_human: &str) -> Result<StakeResult> {
        let amount = self.positive_amount(amount_human, self.config.usdc_decimals)?;
        let owner = user.pubkey();
        let ix = stake_ix(&self.config.program_id, &owner, &self.config.mints(), amount);
        let sig = self.submit(&action_key(ProgramInstruction::Stake, &owner), &[ix], user).await?;
        Ok(StakeResult {
            signature:  sig.to_string(),
            user_state: derive_user_state(&owner, &self.config.program_id).0,
            amount,
        })
    }

    /// Mint accrued staking rewards.
    pub async fn claim(&self, user: &dyn Signer) -> Result<TxResult> {
        let ix = claim_ix(&self.config.program_id, &user.pubkey(), &self.config.mints());
        self.submit_one(ProgramInstruction::Claim, ix, user).await
    }

    /// Stake `usd_human` and mint DLAN at the vip.json investment rate.
    ///
    /// The rate is signed into the instruction, so vip.json must load: a
    /// missing URL or an unusable document is `ConfigUnavailable` and nothing
    /// is sent.
    pub async fn stake_and_mint_priced(&self, user: &dyn Signer, usd_human: &str) -> Result<StakeResult> {
        let amount = self.positive_amount(usd_human, self.config.usdc_decimals)?;
        let owner = user.pubkey();
        let ticket = self.guard.try_acquire(action_key(ProgramInstruction::StakeAndMintPriced, &owner))?;

        let vip = self.required_vip_config().await?;
        let rate = to_base_units_f64(
            vip.invest_usd_per_dlan_rule.dlan_per_usd_per_day,
            self.config.dlan_decimals,
        )?;
        let ix = stake_and_mint_priced_ix(&self.config.program_id, &owner, &self.config.mints(), amount, rate);
        let sig = self.submit_held(&ticket, &[ix], user).await?;
        Ok(StakeResult {
            signature:  sig.to_string(),
            user_state: derive_user_state(&owner, &self.config.program_id).0,
            amount,
        })
    }

    // ── Split claims ──────────────────────────────────────────────────────────

    /// Claim investment accrual for `invested_usd` (human USD), previewed first.
    pub async fn invest_claim_split(&self, user: &dyn Signer, invested_usd: &str) -> Result<ClaimResult> {
        let owner = user.pubkey();
        let ticket = self.guard.try_acquire(action_key(ProgramInstruction::InvestClaimSplit, &owner))?;

        let vip = self.vip_config().await;
        let per_day = invest_daily_rate(
            invested_usd,
            vip.invest_usd_per_dlan_rule.dlan_per_usd_per_day,
            self.config.dlan_decimals,
        )?;
        let fee_recipient = self.fee_recipient(&vip, &owner)?;
        let preview = self.preview_claim(&owner, ClaimKind::Invest, per_day).await?;

        let ix = invest_claim_split_ix(&self.config.program_id, &owner, &fee_recipient, &self.config.mints());
        let sig = self.submit_held(&ticket, &[ix], user).await?;
        Ok(ClaimResult { signature: sig.to_string(), fee_recipient, preview })
    }

    /// Claim a VIP tier button worth `button_human` DLAN per day.
    ///
    /// The wallet must be listed in vip.json and the amount must be one of its
    /// buttons; an empty claim is refused before any transaction is built.
    pub async fn vip_claim_split_timed(&self, user: &dyn Signer, button_human: &str) -> Result<ClaimResult> {
        let owner = user.pubkey();
        let decimals = self.config.dlan_decimals;
        let per_day = self.positive_amount(button_human, decimals)?;
        let ticket = self.guard.try_acquire(action_key(ProgramInstruction::VipClaimSplitTimed, &owner))?;

        let vip = self.vip_config().await;
        let tier = vip
            .tier_for(&owner)
            .ok_or_else(|| Error::InvalidArgument(format!("{owner} is not a VIP tier member")))?;
        if !tier.allows(per_day, decimals) {
            return Err(Error::InvalidArgument(format!(
                "{button_human} per day is not offered to {owner}; options: {:?}",
                tier.buttons
            )));
        }
        let fee_recipient = self.fee_recipient(&vip, &owner)?;
        let preview = self.preview_claim(&owner, ClaimKind::Vip, per_day).await?;

        let ix = vip_claim_split_timed_ix(
            &self.config.program_id, &owner, &fee_recipient, &self.config.mints(), per_day,
        );
        let sig = self.submit_held(&ticket, &[ix], user).await?;
        Ok(ClaimResult { signature: sig.to_string(), fee_recipient, preview })
    }

    // ── Social ────────────────────────────────────────────────────────────────

    pub async fn init_social_config(&self, admin: &dyn Signer) -> Result<TxResult> {
        let ix = init_social_config_ix(&self.config.program_id, &admin.pubkey());
        self.submit_one(ProgramInstruction::InitSocialConfig, ix, admin).await
    }

    pub async fn init_profile(&self, owner: &dyn Signer, handle: &str) -> Result<TxResult> {
        let handle = handle.trim();
        if handle.is_empty() || handle.len() > MAX_HANDLE_LEN {
            return Err(Error::InvalidArgument(format!(
                "handle must be 1–{MAX_HANDLE_LEN} bytes, got {}",
                handle.len()
            )));
        }
        let ix = init_profile_ix(&self.config.program_id, &owner.pubkey(), handle);
        self.submit_one(ProgramInstruction::InitProfile, ix, owner).await
    }

    pub async fn create_post(&self, author: &dyn Signer, index: u64, content: &str) -> Result<PostResult> {
        if content.trim().is_empty() || content.len() > MAX_POST_LEN {
            return Err(Error::InvalidArgument(format!(
                "post must be 1–{MAX_POST_LEN} bytes, got {}",
                content.len()
            )));
        }
        let key = author.pubkey();
        let ix = create_post_ix(&self.config.program_id, &key, index, content);
        let sig = self.submit(&action_key(ProgramInstruction::CreatePost, &key), &[ix], author).await?;
        Ok(PostResult {
            signature: sig.to_string(),
            post:      derive_post(&key, index, &self.config.program_id).0,
            index,
        })
    }

    pub async fn request_contact(&self, requester: &dyn Signer, target: &Pubkey) -> Result<TxResult> {
        if *target == requester.pubkey() {
            return Err(Error::InvalidArgument("cannot request contact with yourself".into()));
        }
        let ix = request_contact_ix(&self.config.program_id, &requester.pubkey(), target);
        self.submit_one(ProgramInstruction::RequestContact, ix, requester).await
    }

    pub async fn respond_contact(
        &self,
        responder: &dyn Signer,
        requester: &Pubkey,
        accept:    bool,
    ) -> Result<TxResult> {
        let ix = respond_contact_ix(&self.config.program_id, &responder.pubkey(), requester, accept);
        self.submit_one(ProgramInstruction::RespondContact, ix, responder).await
    }

    pub async fn recompute_level(&self, owner: &dyn Signer) -> Result<TxResult> {
        let ix = recompute_level_ix(&self.config.program_id, &owner.pubkey());
        self.submit_one(ProgramInstruction::RecomputeLevel, ix, owner).await
    }

    // ── Swaps ─────────────────────────────────────────────────────────────────

    /// Quote, build, sign and send a Jupiter swap.
    pub async fn swap(&self, user: &dyn Signer, request: QuoteRequest) -> Result<SwapResult> {
        let owner = user.pubkey();
        let key = format!("swap:{owner}");
        let _ticket = self.guard.try_acquire(key.as_str())?;

        let quote = self.jupiter.get_quote(&request).await?;
        let built = self.jupiter.build_swap_transaction(&quote, &owner).await?;
        let unsigned = built.to_versioned()?;

        let signers: Vec<&dyn Signer> = vec![user];
        let tx = VersionedTransaction::try_new(unsigned.message, &signers).map_err(|e| {
            warn!(action = %key, error = %e, "signer rejected swap");
            Error::SubmissionRejected(e.to_string())
        })?;
        let sig = self
            .rpc()
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| Error::SubmissionFailed(e.to_string()))?;
        info!(action = %key, %sig, out_amount = quote.out_amount, "swap confirmed");

        Ok(SwapResult {
            signature:      sig.to_string(),
            input_mint:     request.input_mint,
            output_mint:    request.output_mint,
            in_amount:      quote.in_amount,
            out_amount:     quote.out_amount,
            min_amount_out: quote.other_amount_threshold,
        })
    }

    // ── Submission ────────────────────────────────────────────────────────────

    /// Sign and send one transaction for `action_key`, waiting for confirmation.
    ///
    /// * A concurrent call with the same key fails with `InFlight`.
    /// * A signer error (declined, wrong key, missing signer) is `SubmissionRejected`.
    /// * Blockhash, send or confirmation failures are `SubmissionFailed`.
    pub async fn submit(
        &self,
        action_key:   &str,
        instructions: &[Instruction],
        signer:       &dyn Signer,
    ) -> Result<Signature> {
        let ticket = self.guard.try_acquire(action_key)?;
        self.submit_held(&ticket, instructions, signer).await
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// [`DlanClient::submit`] for an action that already holds its key, so the
    /// reads it did beforehand are covered by the same ticket.
    async fn submit_held(
        &self,
        ticket:       &InFlightTicket,
        instructions: &[Instruction],
        signer:       &dyn Signer,
    ) -> Result<Signature> {
        let action_key = ticket.key();
        let rpc = self.rpc();

        let blockhash = rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::SubmissionFailed(format!("fetch blockhash: {e}")))?;
        let mut tx = Transaction::new_with_payer(instructions, Some(&signer.pubkey()));
        let signers: Vec<&dyn Signer> = vec![signer];
        tx.try_sign(&signers, blockhash).map_err(|e| {
            warn!(action = action_key, error = %e, "signer rejected transaction");
            Error::SubmissionRejected(e.to_string())
        })?;

        let sig = rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| Error::SubmissionFailed(e.to_string()))?;
        info!(action = action_key, %sig, "transaction confirmed");
        Ok(sig)
    }

    fn rpc(&self) -> RpcClient {
        RpcClient::new_with_commitment(self.config.rpc_url.clone(), CommitmentConfig::confirmed())
    }

    async fn submit_one(
        &self,
        kind:   ProgramInstruction,
        ix:     Instruction,
        signer: &dyn Signer,
    ) -> Result<TxResult> {
        let sig = self.submit(&action_key(kind, &signer.pubkey()), &[ix], signer).await?;
        Ok(TxResult { signature: sig.to_string(), instruction: kind.idl_name() })
    }

    /// Account data, or `None` if the account does not exist.
    async fn fetch_optional(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let rpc = self.rpc();
        let response = rpc.get_account_with_commitment(address, rpc.commitment()).await?;
        Ok(response.value.map(|acc| acc.data))
    }

    fn timer_address(&self, owner: &Pubkey, kind: ClaimKind) -> Pubkey {
        match kind {
            ClaimKind::Invest => derive_user_state(owner, &self.config.program_id).0,
            ClaimKind::Vip => derive_vip_state(owner, &self.config.program_id).0,
        }
    }

    fn positive_amount(&self, human: &str, decimals: u8) -> Result<u64> {
        let amount = to_base_units(human, decimals)?;
        if amount == 0 {
            return Err(Error::InvalidAmount(format!("'{human}' rounds to zero base units")));
        }
        Ok(amount)
    }

    /// vip.json for values that end up in an instruction; no fallback.
    async fn required_vip_config(&self) -> Result<VipConfig> {
        let url = self
            .config
            .vip_config_url
            .as_deref()
            .ok_or_else(|| Error::ConfigUnavailable("vip_config_url is not set".into()))?;
        try_load_vip_config(&self.http, url).await
    }

    fn fee_recipient(&self, vip: &VipConfig, owner: &Pubkey) -> Result<Pubkey> {
        vip.fee_recipient_for(owner)
            .or(self.config.fee_recipient)
            .ok_or_else(|| Error::InvalidArgument("no fee recipient in vip.json or config".into()))
    }
}

/// In-flight key: one outstanding submission per instruction per wallet.
pub fn action_key(kind: ProgramInstruction, wallet: &Pubkey) -> String {
    format!("{}:{wallet}", kind.idl_name())
}
