//! Interface of the Dubuu marketplace program
//!
//! Method schemas mirror the program's instruction handlers and account
//! contexts; PDA helpers derive the seeded accounts so callers rarely need
//! to pass them by hand.

use super::schema::{AccountSpec, ArgType, MethodSchema, ProgramInterface};
use solana_sdk::hash::hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{pubkey, system_program};

/// SPL token program, the only token program the marketplace transfers through
pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// Maximum byte length of a Walrus metadata CID accepted by the program
pub const MAX_METADATA_CID_LENGTH: usize = 100;

/// Bytes of the hashed asset seed used in the asset PDA
const ASSET_SEED_HASH_PREFIX: usize = 5;

pub const ASSET_SEED: &[u8] = b"asset";
pub const MARKETPLACE_CONFIG_SEED: &[u8] = b"marketplace_config";
pub const WORMHOLE_LISTENER_SEED: &[u8] = b"wormhole_listener";
pub const AUCTION_SEED: &[u8] = b"auction";
pub const ESCROW_SEED: &[u8] = b"escrow";
pub const ESCROW_AUTHORITY_SEED: &[u8] = b"escrow_authority";

/// Variants of the program's `OwnershipStatus` enum, in declaration order
pub const OWNERSHIP_STATUS_VARIANTS: [&str; 3] = ["PendingReview", "Verified", "Rejected"];

fn system_program_account() -> AccountSpec {
    AccountSpec::fixed("system_program", system_program::id())
}

fn token_program_account() -> AccountSpec {
    AccountSpec::fixed("token_program", TOKEN_PROGRAM_ID)
}

/// Build the full method catalog for the program deployed at `program_id`
pub fn marketplace_interface(program_id: Pubkey) -> ProgramInterface {
    ProgramInterface::new("dubuu_marketplace_mvp", program_id)
        .with_method(MethodSchema::new("initialize").account(AccountSpec::payer("signer")))
        .with_method(
            MethodSchema::new("register_asset_and_submit_docs_ref")
                .arg("asset_id_seed_str", ArgType::string())
                .arg(
                    "walrus_main_metadata_cid",
                    ArgType::bounded_string(MAX_METADATA_CID_LENGTH),
                )
                .account(AccountSpec::writable("asset_account"))
                .account(AccountSpec::payer("signer"))
                .account(system_program_account()),
        )
        .with_method(
            MethodSchema::new("admin_update_ownership_verification")
                .arg(
                    "new_verification_status",
                    ArgType::enumeration("OwnershipStatus", &OWNERSHIP_STATUS_VARIANTS),
                )
                .arg("verification_notes_hash", ArgType::option(ArgType::Hash32))
                .account(AccountSpec::writable("asset_account"))
                .account(AccountSpec::readonly("marketplace_config"))
                .account(AccountSpec::signer("admin")),
        )
        .with_method(
            MethodSchema::new("update_asset_walrus_cid")
                .arg(
                    "new_walrus_main_metadata_cid",
                    ArgType::bounded_string(MAX_METADATA_CID_LENGTH),
                )
                .account(AccountSpec::writable("asset_account"))
                .account(AccountSpec::signer("current_owner")),
        )
        .with_method(
            MethodSchema::new("initialize_wormhole_listener")
                .arg("authorized_relayer", ArgType::Pubkey)
                .account(AccountSpec::writable("wormhole_listener_config"))
                .account(AccountSpec::payer("signer"))
                .account(system_program_account()),
        )
        .with_method(
            MethodSchema::new("list_asset_for_auction")
                .arg("start_price_usd_star", ArgType::U64)
                .arg("duration_seconds", ArgType::I64)
                .account(AccountSpec::writable("auction_account"))
                .account(AccountSpec::writable("asset_account"))
                .account(AccountSpec::payer("seller"))
                .account(AccountSpec::readonly("marketplace_config"))
                .account(AccountSpec::writable("seller_pern_token_account"))
                .account(AccountSpec::writable("treasury_pern_token_account"))
                .account(AccountSpec::writable("auction_escrow_token_account"))
                .account(AccountSpec::readonly("pern_usd_star_mint_account"))
                .account(AccountSpec::readonly("auction_escrow_authority"))
                .account(token_program_account())
                .account(system_program_account()),
        )
        .with_method(
            MethodSchema::new("place_bid")
                .arg("bid_amount_usd_star", ArgType::U64)
                .account(AccountSpec::writable("auction_account"))
                .account(AccountSpec::payer("bidder"))
                .account(AccountSpec::writable("bidder_pern_token_account"))
                .account(AccountSpec::writable("auction_escrow_token_account"))
                .account(AccountSpec::readonly("auction_escrow_authority"))
                .account(AccountSpec::writable("previous_highest_bidder_token_account").optional())
                .account(token_program_account()),
        )
        .with_method(
            MethodSchema::new("finalize_auction")
                .account(AccountSpec::writable("auction_account"))
                .account(AccountSpec::signer("signer"))
                .account(AccountSpec::writable("auction_escrow_token_account"))
                .account(AccountSpec::readonly("auction_escrow_authority"))
                .account(
                    AccountSpec::writable("highest_bidder_token_account_for_refund").optional(),
                )
                .account(AccountSpec::writable("seller_rent_recipient"))
                .account(token_program_account())
                .account(system_program_account()),
        )
        .with_method(
            MethodSchema::new("settle_auction_and_transfer")
                .account(AccountSpec::writable("auction_account"))
                .account(AccountSpec::payer("highest_bidder"))
                .account(AccountSpec::writable("asset_account"))
                .account(AccountSpec::readonly("marketplace_config"))
                .account(AccountSpec::writable("auction_escrow_token_account"))
                .account(AccountSpec::readonly("auction_escrow_authority"))
                .account(AccountSpec::writable("seller_token_account"))
                .account(AccountSpec::writable("treasury_pern_token_account"))
                .account(token_program_account())
                .account(system_program_account()),
        )
}

/// Asset PDA: seeded by the first bytes of `sha256(asset_id_seed)`
pub fn find_asset_address(program_id: &Pubkey, asset_id_seed: &str) -> (Pubkey, u8) {
    let seed_hash = hash(asset_id_seed.as_bytes()).to_bytes();
    Pubkey::find_program_address(
        &[ASSET_SEED, &seed_hash[..ASSET_SEED_HASH_PREFIX]],
        program_id,
    )
}

pub fn find_marketplace_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MARKETPLACE_CONFIG_SEED], program_id)
}

pub fn find_wormhole_listener_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[WORMHOLE_LISTENER_SEED], program_id)
}

pub fn find_auction_address(program_id: &Pubkey, asset: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[AUCTION_SEED, asset.as_ref()], program_id)
}

pub fn find_escrow_address(program_id: &Pubkey, auction: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ESCROW_SEED, auction.as_ref()], program_id)
}

pub fn find_escrow_authority_address(program_id: &Pubkey, auction: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ESCROW_AUTHORITY_SEED, auction.as_ref()], program_id)
}
