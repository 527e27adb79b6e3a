//! End-to-end checks of the public `dlan_sdk` surface, no validator required.

use dlan_sdk::{
    claim::{compute_claim, split_payout},
    instructions::{create_post_ix, vip_claim_split_timed_ix, ProgramInstruction},
    pda::{derive, derive_post, POST_SEED},
    units::{to_base_units, to_human},
    vip::{load_vip_config, VipConfig, DEFAULT_DLAN_PER_USD_PER_DAY},
    ClientConfig, DlanClient, Error,
};
use solana_sdk::pubkey::Pubkey;

#[test]
fn reserve_caps_payable_days_and_fee_is_a_third() {
    let q = compute_claim("3", 5, 10_000_000, 6).unwrap();
    assert_eq!(q.per_day_base_units, 3_000_000);
    assert_eq!(q.max_days_by_reserve, 3);
    assert_eq!(q.payable_days, 3);
    assert_eq!(q.gross_base_units, 9_000_000);
    assert_eq!(q.fee_base_units, 3_000_000);
    assert_eq!(q.user_base_units, 6_000_000);
}

#[test]
fn nothing_elapsed_and_empty_reserve_are_refused() {
    assert!(matches!(compute_claim("3", 0, 10_000_000, 6), Err(Error::NothingToClaim)));
    assert!(matches!(compute_claim("3", 5, 0, 6), Err(Error::ReserveEmpty)));
    assert!(matches!(compute_claim("3", 0, 0, 6), Err(Error::ReserveEmpty)));
}

#[test]
fn post_addresses_follow_the_index() {
    let program = Pubkey::new_unique();
    let author = Pubkey::new_unique();

    let p7 = derive_post(&author, 7, &program);
    assert_eq!(p7, derive_post(&author, 7, &program));
    assert_ne!(p7.0, derive_post(&author, 8, &program).0);

    let generic = derive(&program, &[POST_SEED, author.as_ref(), &7u64.to_le_bytes()]).unwrap();
    assert_eq!(generic, p7);

    let ix = create_post_ix(&program, &author, 7, "gm");
    assert!(ix.accounts.iter().any(|m| m.pubkey == p7.0));
    assert_eq!(&ix.data[..8], &ProgramInstruction::CreatePost.discriminator());
}

#[tokio::test]
async fn unreachable_vip_document_falls_back_to_default() {
    let cfg = load_vip_config(&reqwest::Client::new(), "http://127.0.0.1:9/vip.json").await;
    assert_eq!(cfg, VipConfig::default());
    assert_eq!(cfg.invest_usd_per_dlan_rule.dlan_per_usd_per_day, DEFAULT_DLAN_PER_USD_PER_DAY);
    assert!(cfg.tiers.is_empty());
}

#[tokio::test]
async fn client_without_vip_url_uses_default_document() {
    let client = DlanClient::new(ClientConfig::new(
        "http://127.0.0.1:9",
        Pubkey::new_unique(),
        Pubkey::new_unique(),
    ));
    assert_eq!(client.vip_config().await, VipConfig::default());
}

#[test]
fn human_amounts_never_inflate() {
    for (base, decimals) in [(0u64, 6u8), (1, 6), (123_456_789, 6), (u64::MAX, 9), (42, 0)] {
        let back = to_base_units(&to_human(base, decimals), decimals).unwrap();
        assert!(back <= base);
    }
}

#[test]
fn split_claim_instruction_carries_button_amount() {
    let program = Pubkey::new_unique();
    let user = Pubkey::new_unique();
    let fee = Pubkey::new_unique();
    let mints = ClientConfig::new("http://127.0.0.1:9", program, Pubkey::new_unique()).mints();

    let per_day = to_base_units("3", 6).unwrap();
    let ix = vip_claim_split_timed_ix(&program, &user, &fee, &mints, per_day);
    assert_eq!(&ix.data[8..16], &per_day.to_le_bytes());
    assert!(ix.accounts[0].is_signer);

    let split = split_payout(9_000_000);
    assert_eq!(split.user + split.fee, 9_000_000);
}
