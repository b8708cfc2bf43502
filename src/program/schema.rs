//! Method schemas: the client-side description of a program's interface
//!
//! A schema lists a method's arguments (name + type) and its accounts
//! (name + signer/writable flags) in the order the program expects them.
//! The builder validates caller input against it and encodes instruction
//! data the way Anchor programs decode it: an 8-byte selector followed by
//! the Borsh encoding of each argument.

use borsh::BorshSerialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::io;
use std::str::FromStr;

/// Namespace Anchor prefixes to method names before hashing
const SELECTOR_NAMESPACE: &str = "global";

/// Compute the 8-byte method selector for `method`
pub fn method_selector(method: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(SELECTOR_NAMESPACE.as_bytes());
    hasher.update(b":");
    hasher.update(method.as_bytes());
    let digest = hasher.finalize();

    let mut selector = [0u8; 8];
    selector.copy_from_slice(&digest[..8]);
    selector
}

/// Declared type of a method argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I64,
    /// UTF-8 string, optionally bounded in bytes
    String { max_len: Option<usize> },
    Pubkey,
    /// Fixed 32-byte array (hashes)
    Hash32,
    Option(Box<ArgType>),
    /// Unit-only enum encoded as its variant index
    Enum {
        name: String,
        variants: Vec<String>,
    },
}

impl ArgType {
    pub fn string() -> Self {
        ArgType::String { max_len: None }
    }

    pub fn bounded_string(max_len: usize) -> Self {
        ArgType::String {
            max_len: Some(max_len),
        }
    }

    pub fn option(inner: ArgType) -> Self {
        ArgType::Option(Box::new(inner))
    }

    pub fn enumeration(name: &str, variants: &[&str]) -> Self {
        ArgType::Enum {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Bool => f.write_str("bool"),
            ArgType::U8 => f.write_str("u8"),
            ArgType::U16 => f.write_str("u16"),
            ArgType::U32 => f.write_str("u32"),
            ArgType::U64 => f.write_str("u64"),
            ArgType::I64 => f.write_str("i64"),
            ArgType::String { max_len: None } => f.write_str("string"),
            ArgType::String { max_len: Some(n) } => write!(f, "string(<= {})", n),
            ArgType::Pubkey => f.write_str("pubkey"),
            ArgType::Hash32 => f.write_str("[u8; 32]"),
            ArgType::Option(inner) => write!(f, "option<{}>", inner),
            ArgType::Enum { name, .. } => write!(f, "enum {}", name),
        }
    }
}

/// A concrete argument value supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I64(i64),
    String(String),
    Pubkey(Pubkey),
    Hash32([u8; 32]),
    Option(Option<Box<ArgValue>>),
    /// Variant index of a unit-only enum
    Enum(u8),
}

impl ArgValue {
    pub fn none() -> Self {
        ArgValue::Option(None)
    }

    pub fn some(value: impl Into<ArgValue>) -> Self {
        ArgValue::Option(Some(Box::new(value.into())))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Bool(_) => "bool",
            ArgValue::U8(_) => "u8",
            ArgValue::U16(_) => "u16",
            ArgValue::U32(_) => "u32",
            ArgValue::U64(_) => "u64",
            ArgValue::I64(_) => "i64",
            ArgValue::String(_) => "string",
            ArgValue::Pubkey(_) => "pubkey",
            ArgValue::Hash32(_) => "[u8; 32]",
            ArgValue::Option(_) => "option",
            ArgValue::Enum(_) => "enum",
        }
    }

    /// Check this value against a declared type.
    ///
    /// Returns a human-readable description of the mismatch on failure.
    pub fn check_type(&self, ty: &ArgType) -> Result<(), String> {
        match (self, ty) {
            (ArgValue::Bool(_), ArgType::Bool)
            | (ArgValue::U8(_), ArgType::U8)
            | (ArgValue::U16(_), ArgType::U16)
            | (ArgValue::U32(_), ArgType::U32)
            | (ArgValue::U64(_), ArgType::U64)
            | (ArgValue::I64(_), ArgType::I64)
            | (ArgValue::Pubkey(_), ArgType::Pubkey)
            | (ArgValue::Hash32(_), ArgType::Hash32) => Ok(()),
            (ArgValue::String(s), ArgType::String { max_len }) => match max_len {
                Some(max) if s.len() > *max => Err(format!(
                    "string is {} bytes, maximum is {}",
                    s.len(),
                    max
                )),
                _ => Ok(()),
            },
            (ArgValue::Option(None), ArgType::Option(_)) => Ok(()),
            (ArgValue::Option(Some(inner)), ArgType::Option(inner_ty)) => {
                inner.check_type(inner_ty)
            }
            (ArgValue::Enum(idx), ArgType::Enum { name, variants }) => {
                if (*idx as usize) < variants.len() {
                    Ok(())
                } else {
                    Err(format!(
                        "variant index {} out of range for enum {} ({} variants)",
                        idx,
                        name,
                        variants.len()
                    ))
                }
            }
            (value, ty) => Err(format!("expected {}, found {}", ty, value.type_name())),
        }
    }

    /// Append the Borsh encoding of this value to `buf`
    pub fn encode(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        match self {
            ArgValue::Bool(v) => v.serialize(buf),
            ArgValue::U8(v) => v.serialize(buf),
            ArgValue::U16(v) => v.serialize(buf),
            ArgValue::U32(v) => v.serialize(buf),
            ArgValue::U64(v) => v.serialize(buf),
            ArgValue::I64(v) => v.serialize(buf),
            ArgValue::String(v) => v.serialize(buf),
            ArgValue::Pubkey(v) => v.to_bytes().serialize(buf),
            ArgValue::Hash32(v) => v.serialize(buf),
            ArgValue::Option(None) => 0u8.serialize(buf),
            ArgValue::Option(Some(inner)) => {
                1u8.serialize(buf)?;
                inner.encode(buf)
            }
            ArgValue::Enum(idx) => idx.serialize(buf),
        }
    }

    /// Interpret a JSON value as an argument of type `ty`.
    ///
    /// Used by the CLI; enums accept either the variant name or its index,
    /// pubkeys and hashes accept base58 strings.
    pub fn from_json(value: &Value, ty: &ArgType) -> Result<Self, String> {
        let mismatch = || format!("expected {}, got {}", ty, value);
        match ty {
            ArgType::Bool => value.as_bool().map(ArgValue::Bool).ok_or_else(mismatch),
            ArgType::U8 => as_unsigned(value)
                .and_then(|n| u8::try_from(n).ok())
                .map(ArgValue::U8)
                .ok_or_else(mismatch),
            ArgType::U16 => as_unsigned(value)
                .and_then(|n| u16::try_from(n).ok())
                .map(ArgValue::U16)
                .ok_or_else(mismatch),
            ArgType::U32 => as_unsigned(value)
                .and_then(|n| u32::try_from(n).ok())
                .map(ArgValue::U32)
                .ok_or_else(mismatch),
            ArgType::U64 => as_unsigned(value).map(ArgValue::U64).ok_or_else(mismatch),
            ArgType::I64 => value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                .map(ArgValue::I64)
                .ok_or_else(mismatch),
            ArgType::String { .. } => value
                .as_str()
                .map(|s| ArgValue::String(s.to_string()))
                .ok_or_else(mismatch),
            ArgType::Pubkey => value
                .as_str()
                .and_then(|s| Pubkey::from_str(s).ok())
                .map(ArgValue::Pubkey)
                .ok_or_else(mismatch),
            ArgType::Hash32 => {
                let s = value.as_str().ok_or_else(mismatch)?;
                let bytes = bs58::decode(s).into_vec().map_err(|e| e.to_string())?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| format!("expected 32 bytes for {}", ty))?;
                Ok(ArgValue::Hash32(arr))
            }
            ArgType::Option(inner) => {
                if value.is_null() {
                    Ok(ArgValue::Option(None))
                } else {
                    Ok(ArgValue::some(ArgValue::from_json(value, inner)?))
                }
            }
            ArgType::Enum { variants, .. } => {
                if let Some(name) = value.as_str() {
                    variants
                        .iter()
                        .position(|v| v.eq_ignore_ascii_case(name))
                        .and_then(|i| u8::try_from(i).ok())
                        .map(ArgValue::Enum)
                        .ok_or_else(|| format!("unknown variant `{}` for {}", name, ty))
                } else {
                    as_unsigned(value)
                        .and_then(|n| u8::try_from(n).ok())
                        .map(ArgValue::Enum)
                        .ok_or_else(mismatch)
                }
            }
        }
    }
}

// Large integers are accepted as strings since JSON numbers lose precision
fn as_unsigned(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<u8> for ArgValue {
    fn from(v: u8) -> Self {
        ArgValue::U8(v)
    }
}

impl From<u64> for ArgValue {
    fn from(v: u64) -> Self {
        ArgValue::U64(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::I64(v)
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::String(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::String(v.to_string())
    }
}

impl From<Pubkey> for ArgValue {
    fn from(v: Pubkey) -> Self {
        ArgValue::Pubkey(v)
    }
}

impl From<[u8; 32]> for ArgValue {
    fn from(v: [u8; 32]) -> Self {
        ArgValue::Hash32(v)
    }
}

/// A named, typed argument slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub ty: ArgType,
}

/// An account slot in a method's account list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    pub name: String,
    pub is_signer: bool,
    pub is_writable: bool,
    /// May be omitted by the caller; encoded as the program id when absent
    pub optional: bool,
    /// Well-known address filled in when the caller does not supply one
    pub address: Option<Pubkey>,
}

impl AccountSpec {
    pub fn readonly(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_signer: false,
            is_writable: false,
            optional: false,
            address: None,
        }
    }

    pub fn writable(name: &str) -> Self {
        Self {
            is_writable: true,
            ..Self::readonly(name)
        }
    }

    pub fn signer(name: &str) -> Self {
        Self {
            is_signer: true,
            ..Self::readonly(name)
        }
    }

    /// Writable signer, the shape of fee payers and rent payers
    pub fn payer(name: &str) -> Self {
        Self {
            is_signer: true,
            is_writable: true,
            ..Self::readonly(name)
        }
    }

    pub fn fixed(name: &str, address: Pubkey) -> Self {
        Self {
            address: Some(address),
            ..Self::readonly(name)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Interface of a single program method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSchema {
    pub name: String,
    pub args: Vec<ArgSpec>,
    pub accounts: Vec<AccountSpec>,
}

impl MethodSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
            accounts: Vec::new(),
        }
    }

    pub fn arg(mut self, name: &str, ty: ArgType) -> Self {
        self.args.push(ArgSpec {
            name: name.to_string(),
            ty,
        });
        self
    }

    pub fn account(mut self, spec: AccountSpec) -> Self {
        self.accounts.push(spec);
        self
    }

    pub fn selector(&self) -> [u8; 8] {
        method_selector(&self.name)
    }

    pub fn account_spec(&self, name: &str) -> Option<&AccountSpec> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Names of signer accounts, in schema order
    pub fn signer_accounts(&self) -> impl Iterator<Item = &AccountSpec> {
        self.accounts.iter().filter(|a| a.is_signer)
    }
}

/// All methods a program exposes, keyed by program id
#[derive(Debug, Clone)]
pub struct ProgramInterface {
    pub name: String,
    pub program_id: Pubkey,
    methods: Vec<MethodSchema>,
}

impl ProgramInterface {
    pub fn new(name: &str, program_id: Pubkey) -> Self {
        Self {
            name: name.to_string(),
            program_id,
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, schema: MethodSchema) -> Self {
        self.methods.push(schema);
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodSchema> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn methods(&self) -> &[MethodSchema] {
        &self.methods
    }
}
