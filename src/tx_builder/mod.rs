//! Transaction Builder
//!
//! Turns program method invocations into signed transactions:
//! - **errors**: builder error taxonomy
//! - **instructions**: schema-validated instruction construction and
//!   compute-budget planning
//! - **envelope**: freshness anchors, unsigned and signed envelopes
//!
//! Nothing in this module performs I/O. Anchors are fetched by the
//! submission client and handed in.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use dubuu_client::program::marketplace_interface;
//! use dubuu_client::tx_builder::{
//!     AccountRefs, FreshnessAnchor, InstructionBuilder, MessageVersion, UnsignedEnvelope,
//! };
//! use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::{Keypair, Signer}};
//!
//! # fn example() -> Result<(), dubuu_client::tx_builder::TransactionBuilderError> {
//! let payer = Keypair::new();
//! let iface = marketplace_interface(Pubkey::new_unique());
//! let ix = InstructionBuilder::build_method(
//!     &iface,
//!     "initialize",
//!     vec![],
//!     &AccountRefs::new().with("signer", payer.pubkey()),
//! )?;
//!
//! let anchor = FreshnessAnchor::new(Hash::default(), 0);
//! let signed = UnsignedEnvelope::new(vec![ix.into()], payer.pubkey(), anchor, MessageVersion::V0)
//!     .sign(&[&payer])?;
//! println!("{}", signed.signature());
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod errors;
pub mod instructions;

pub use envelope::{FreshnessAnchor, MessageVersion, SignedEnvelope, UnsignedEnvelope};
pub use errors::TransactionBuilderError;
pub use instructions::{
    plan_instructions, sanity_check_ix_order, AccountRefs, InstructionBuilder, MethodInstruction,
};
