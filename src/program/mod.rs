//! Program interface descriptions
//!
//! - `schema`: generic method/argument/account schema types and encoding
//! - `marketplace`: the marketplace program's method catalog and PDA helpers
//! - `errors`: decoding of the program's custom error codes

pub mod errors;
pub mod marketplace;
pub mod schema;

pub use errors::{MarketplaceError, ANCHOR_ERROR_OFFSET};
pub use marketplace::{marketplace_interface, MAX_METADATA_CID_LENGTH, TOKEN_PROGRAM_ID};
pub use schema::{
    method_selector, AccountSpec, ArgSpec, ArgType, ArgValue, MethodSchema, ProgramInterface,
};
