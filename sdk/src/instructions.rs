//! Low-level Anchor instruction builders.
//!
//! Each function constructs a [`solana_sdk::instruction::Instruction`] ready
//! for signing and submission.  Account order mirrors the program's
//! `#[derive(Accounts)]` structs exactly.
//!
//! Anchor instruction discriminators: `sha256("global:{snake_name}")[..8]`.
//! Arguments follow in Borsh encoding: integers little-endian, `bool` as one
//! byte, byte strings as `u32` length + bytes.

use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    sysvar,
};

use crate::pda::{
    derive_ata, derive_contact, derive_mint_authority, derive_pool, derive_post, derive_profile,
    derive_social_config, derive_treasury, derive_user_state, derive_vip_state, ATA_PROGRAM_ID,
    SPL_TOKEN_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};

// ─── Instruction catalogue ────────────────────────────────────────────────────

/// Every program instruction this client can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramInstruction {
    InitializePool,
    Stake,
    Claim,
    StakeAndMintPriced,
    InvestClaimSplit,
    VipClaimSplitTimed,
    InitSocialConfig,
    InitProfile,
    CreatePost,
    RequestContact,
    RespondContact,
    RecomputeLevel,
}

impl ProgramInstruction {
    pub const ALL: [ProgramInstruction; 12] = [
        Self::InitializePool,
        Self::Stake,
        Self::Claim,
        Self::StakeAndMintPriced,
        Self::InvestClaimSplit,
        Self::VipClaimSplitTimed,
        Self::InitSocialConfig,
        Self::InitProfile,
        Self::CreatePost,
        Self::RequestContact,
        Self::RespondContact,
        Self::RecomputeLevel,
    ];

    /// Name as it appears in the IDL.
    pub fn idl_name(&self) -> &'static str {
        match self {
            Self::InitializePool     => "initializePool",
            Self::Stake              => "stake",
            Self::Claim              => "claim",
            Self::StakeAndMintPriced => "stakeAndMintPriced",
            Self::InvestClaimSplit   => "investClaimSplit",
            Self::VipClaimSplitTimed => "vipClaimSplitTimed",
            Self::InitSocialConfig   => "initSocialConfig",
            Self::InitProfile        => "initProfile",
            Self::CreatePost         => "createPost",
            Self::RequestContact     => "requestContact",
            Self::RespondContact     => "respondContact",
            Self::RecomputeLevel     => "recomputeLevel",
        }
    }

    /// Rust method name on the program, used for the discriminator preimage.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::InitializePool     => "initialize_pool",
            Self::Stake              => "stake",
            Self::Claim              => "claim",
            Self::StakeAndMintPriced => "stake_and_mint_priced",
            Self::InvestClaimSplit   => "invest_claim_split",
            Self::VipClaimSplitTimed => "vip_claim_split_timed",
            Self::InitSocialConfig   => "init_social_config",
            Self::InitProfile        => "init_profile",
            Self::CreatePost         => "create_post",
            Self::RequestContact     => "request_contact",
            Self::RespondContact     => "respond_contact",
            Self::RecomputeLevel     => "recompute_level",
        }
    }

    pub fn from_idl_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ix| ix.idl_name() == name || ix.method_name() == name)
    }

    pub fn discriminator(&self) -> [u8; 8] {
        disc(self.method_name())
    }
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

fn disc(name: &str) -> [u8; 8] {
    let h = hash(format!("global:{name}").as_bytes());
    let mut d = [0u8; 8];
    d.copy_from_slice(&h.to_bytes()[..8]);
    d
}

fn push_bytes(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
}

/// Mint and token context shared by the staking instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mints {
    /// The DLAN reward token (minted by the pool's mint authority).
    pub dlan: Pubkey,
    /// The stable token users stake / invest (USDC).
    pub usd:  Pubkey,
}

// ─── initialize_pool ─────────────────────────────────────────────────────────

/// Build the `initialize_pool` instruction (admin only).
pub fn initialize_pool_ix(program_id: &Pubkey, admin: &Pubkey, mints: &Mints) -> Instruction {
    let (pool, _)           = derive_pool(program_id);
    let (treasury, _)       = derive_treasury(program_id);
    let (mint_authority, _) = derive_mint_authority(&pool, program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin,                  true),   // mut + signer
            AccountMeta::new(pool,                    false),  // mut PDA (init)
            AccountMeta::new(treasury,                false),  // mut PDA (init)
            AccountMeta::new_readonly(mint_authority, false),
            AccountMeta::new(mints.dlan,              false),  // mut (authority handover)
            AccountMeta::new_readonly(mints.usd,      false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,    false),
            AccountMeta::new_readonly(sysvar::rent::ID,     false),
        ],
        data: ProgramInstruction::InitializePool.discriminator().to_vec(),
    }
}

// ─── stake ────────────────────────────────────────────────────────────────────

/// Build the `stake` instruction: move `amount` USD base units into the treasury.
pub fn stake_ix(program_id: &Pubkey, user: &Pubkey, mints: &Mints, amount: u64) -> Instruction {
    let (pool, _)       = derive_pool(program_id);
    let (treasury, _)   = derive_treasury(program_id);
    let (user_state, _) = derive_user_state(user, program_id);

    let mut data = ProgramInstruction::Stake.discriminator().to_vec();
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*user,                                 true),
            AccountMeta::new(pool,                                  false),
            AccountMeta::new(user_state,                            false),  // init_if_needed
            AccountMeta::new(derive_ata(user, &mints.usd),          false),
            AccountMeta::new_readonly(treasury,                     false),
            AccountMeta::new(derive_ata(&treasury, &mints.usd),     false),
            AccountMeta::new_readonly(mints.usd,                    false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID,         false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,            false),
        ],
        data,
    }
}

// ─── claim ────────────────────────────────────────────────────────────────────

/// Build the `claim` instruction: mint accrued staking rewards to the user.
pub fn claim_ix(program_id: &Pubkey, user: &Pubkey, mints: &Mints) -> Instruction {
    let (pool, _)           = derive_pool(program_id);
    let (user_state, _)     = derive_user_state(user, program_id);
    let (mint_authority, _) = derive_mint_authority(&pool, program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*user,                          true),
            AccountMeta::new(pool,                           false),
            AccountMeta::new(user_state,                     false),
            AccountMeta::new_readonly(mint_authority,        false),
            AccountMeta::new(mints.dlan,                     false),  // mut (supply)
            AccountMeta::new(derive_ata(user, &mints.dlan),  false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID,  false),
        ],
        data: ProgramInstruction::Claim.discriminator().to_vec(),
    }
}

// ─── stake_and_mint_priced ────────────────────────────────────────────────────

/// Build `stake_and_mint_priced`: stake `usd_amount` and mint DLAN at
/// `dlan_per_usd_per_day` (DLAN base units per whole USD per day).
pub fn stake_and_mint_priced_ix(
    program_id:           &Pubkey,
    user:                 &Pubkey,
    mints:                &Mints,
    usd_amount:           u64,
    dlan_per_usd_per_day: u64,
) -> Instruction {
    let (pool, _)           = derive_pool(program_id);
    let (treasury, _)       = derive_treasury(program_id);
    let (user_state, _)     = derive_user_state(user, program_id);
    let (mint_authority, _) = derive_mint_authority(&pool, program_id);

    let mut data = ProgramInstruction::StakeAndMintPriced.discriminator().to_vec();
    data.extend_from_slice(&usd_amount.to_le_bytes());
    data.extend_from_slice(&dlan_per_usd_per_day.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*user,                              true),
            AccountMeta::new(pool,                               false),
            AccountMeta::new(user_state,                         false),
            AccountMeta::new(derive_ata(user, &mints.usd),       false),
            AccountMeta::new_readonly(treasury,                  false),
            AccountMeta::new(derive_ata(&treasury, &mints.usd),  false),
            AccountMeta::new_readonly(mint_authority,            false),
            AccountMeta::new(mints.dlan,                         false),
            AccountMeta::new(derive_ata(user, &mints.dlan),      false),  // init_if_needed
            AccountMeta::new_readonly(mints.usd,                 false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID,      false),
            AccountMeta::new_readonly(ATA_PROGRAM_ID,            false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,         false),
        ],
        data,
    }
}

// ─── invest_claim_split ───────────────────────────────────────────────────────

/// Build `invest_claim_split`: pay accrued investment days from the treasury
/// reserve, split between the user and `fee_recipient`.
pub fn invest_claim_split_ix(
    program_id:    &Pubkey,
    user:          &Pubkey,
    fee_recipient: &Pubkey,
    mints:         &Mints,
) -> Instruction {
    let (pool, _)       = derive_pool(program_id);
    let (treasury, _)   = derive_treasury(program_id);
    let (user_state, _) = derive_user_state(user, program_id);

    Instruction {
        program_id: *program_id,
        accounts: claim_split_accounts(user, fee_recipient, mints, pool, treasury, user_state),
        data: ProgramInstruction::InvestClaimSplit.discriminator().to_vec(),
    }
}

// ─── vip_claim_split_timed ────────────────────────────────────────────────────

/// Build `vip_claim_split_timed` for a tier button worth `per_day_amount`
/// DLAN base units per day.
pub fn vip_claim_split_timed_ix(
    program_id:     &Pubkey,
    user:           &Pubkey,
    fee_recipient:  &Pubkey,
    mints:          &Mints,
    per_day_amount: u64,
) -> Instruction {
    let (pool, _)      = derive_pool(program_id);
    let (treasury, _)  = derive_treasury(program_id);
    let (vip_state, _) = derive_vip_state(user, program_id);

    let mut data = ProgramInstruction::VipClaimSplitTimed.discriminator().to_vec();
    data.extend_from_slice(&per_day_amount.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: claim_split_accounts(user, fee_recipient, mints, pool, treasury, vip_state),
        data,
    }
}

/// Shared account list of the two split-claim instructions.
fn claim_split_accounts(
    user:          &Pubkey,
    fee_recipient: &Pubkey,
    mints:         &Mints,
    pool:          Pubkey,
    treasury:      Pubkey,
    timer_state:   Pubkey,
) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*user,                                    true),
        AccountMeta::new_readonly(pool,                            false),
        AccountMeta::new(timer_state,                              false),  // init_if_needed
        AccountMeta::new_readonly(treasury,                        false),
        AccountMeta::new(derive_ata(&treasury, &mints.dlan),       false),  // reserve
        AccountMeta::new(derive_ata(user, &mints.dlan),            false),
        AccountMeta::new_readonly(*fee_recipient,                  false),
        AccountMeta::new(derive_ata(fee_recipient, &mints.dlan),   false),
        AccountMeta::new_readonly(mints.dlan,                      false),
        AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID,            false),
        AccountMeta::new_readonly(ATA_PROGRAM_ID,                  false),
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,               false),
    ]
}

// ─── Social ───────────────────────────────────────────────────────────────────

pub fn init_social_config_ix(program_id: &Pubkey, admin: &Pubkey) -> Instruction {
    let (config, _) = derive_social_config(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin,                      true),
            AccountMeta::new(config,                      false),  // init
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,  false),
        ],
        data: ProgramInstruction::InitSocialConfig.discriminator().to_vec(),
    }
}

/// Build `init_profile` with a UTF-8 `handle`.
pub fn init_profile_ix(program_id: &Pubkey, owner: &Pubkey, handle: &str) -> Instruction {
    let (config, _)  = derive_social_config(program_id);
    let (profile, _) = derive_profile(owner, program_id);

    let mut data = ProgramInstruction::InitProfile.discriminator().to_vec();
    push_bytes(&mut data, handle.as_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner,                      true),
            AccountMeta::new(profile,                     false),  // init
            AccountMeta::new(config,                      false),  // profile counter
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,  false),
        ],
        data,
    }
}

/// Build `create_post` for the author's post number `index`.
pub fn create_post_ix(program_id: &Pubkey, author: &Pubkey, index: u64, content: &str) -> Instruction {
    let (profile, _) = derive_profile(author, program_id);
    let (post, _)    = derive_post(author, index, program_id);

    let mut data = ProgramInstruction::CreatePost.discriminator().to_vec();
    data.extend_from_slice(&index.to_le_bytes());
    push_bytes(&mut data, content.as_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*author,                     true),
            AccountMeta::new(profile,                     false),  // post counter
            AccountMeta::new(post,                        false),  // init
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,  false),
        ],
        data,
    }
}

/// Build `request_contact` from `requester` to `target`.
pub fn request_contact_ix(program_id: &Pubkey, requester: &Pubkey, target: &Pubkey) -> Instruction {
    let (contact, _)           = derive_contact(requester, target, program_id);
    let (requester_profile, _) = derive_profile(requester, program_id);
    let (target_profile, _)    = derive_profile(target, program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*requester,                     true),
            AccountMeta::new_readonly(*target,               false),
            AccountMeta::new_readonly(requester_profile,     false),
            AccountMeta::new_readonly(target_profile,        false),
            AccountMeta::new(contact,                        false),  // init
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID,     false),
        ],
        data: ProgramInstruction::RequestContact.discriminator().to_vec(),
    }
}

/// Build `respond_contact`: `responder` accepts or declines `requester`'s request.
pub fn respond_contact_ix(
    program_id: &Pubkey,
    responder:  &Pubkey,
    requester:  &Pubkey,
    accept:     bool,
) -> Instruction {
    let (contact, _) = derive_contact(requester, responder, program_id);
    let (responder_profile, _) = derive_profile(responder, program_id);

    let mut data = ProgramInstruction::RespondContact.discriminator().to_vec();
    data.push(accept as u8);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*responder,                 true),
            AccountMeta::new_readonly(*requester,        false),
            AccountMeta::new(contact,                    false),
            AccountMeta::new(responder_profile,          false),  // contact count
        ],
        data,
    }
}

/// Build `recompute_level` for `owner`'s profile.
pub fn recompute_level_ix(program_id: &Pubkey, owner: &Pubkey) -> Instruction {
    let (profile, _)    = derive_profile(owner, program_id);
    let (user_state, _) = derive_user_state(owner, program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner,      true),
            AccountMeta::new(profile,              false),
            AccountMeta::new_readonly(user_state,  false),
        ],
        data: ProgramInstruction::RecomputeLevel.discriminator().to_vec(),
    }
}
