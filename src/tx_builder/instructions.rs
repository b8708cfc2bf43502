//! Instruction construction and ordering validation
//!
//! `InstructionBuilder` turns a method name, typed arguments and named
//! account references into a program instruction, validated against the
//! method schema. `plan_instructions` then lays out a transaction's
//! instruction list:
//! 1. Compute budget instructions (CU limit, priority fee)
//! 2. Program instructions, in caller order
//!
//! Everything here is pure: no I/O, no clocks, no shared state.

use crate::program::schema::{ArgValue, MethodSchema, ProgramInterface};
use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::collections::BTreeMap;

/// Account references supplied by the caller, keyed by schema account name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRefs(BTreeMap<String, Pubkey>);

impl AccountRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, key: Pubkey) -> Self {
        self.0.insert(name.into(), key);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, key: Pubkey) -> Option<Pubkey> {
        self.0.insert(name.into(), key)
    }

    pub fn get(&self, name: &str) -> Option<&Pubkey> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, Pubkey)> for AccountRefs {
    fn from_iter<I: IntoIterator<Item = (S, Pubkey)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A validated, encoded invocation of a program method.
///
/// Fields are private: once built, an instruction cannot be altered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInstruction {
    program_id: Pubkey,
    method: String,
    selector: [u8; 8],
    args: Vec<ArgValue>,
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl MethodInstruction {
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn selector(&self) -> [u8; 8] {
        self.selector
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    pub fn accounts(&self) -> &[AccountMeta] {
        &self.accounts
    }

    /// Selector followed by the encoded arguments
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn to_instruction(&self) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: self.accounts.clone(),
            data: self.data.clone(),
        }
    }
}

impl From<MethodInstruction> for Instruction {
    fn from(ix: MethodInstruction) -> Self {
        Instruction {
            program_id: ix.program_id,
            accounts: ix.accounts,
            data: ix.data,
        }
    }
}

/// Builds method instructions for a single program
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder {
    program_id: Pubkey,
}

impl InstructionBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Look up `method` in `interface` and build it.
    pub fn build_method(
        interface: &ProgramInterface,
        method: &str,
        args: Vec<ArgValue>,
        accounts: &AccountRefs,
    ) -> Result<MethodInstruction, TransactionBuilderError> {
        let schema =
            interface
                .method(method)
                .ok_or_else(|| TransactionBuilderError::UnknownMethod {
                    program: interface.name.clone(),
                    method: method.to_string(),
                })?;
        Self::new(interface.program_id).build(schema, args, accounts)
    }

    /// Validate `args` and `accounts` against `schema` and encode the instruction.
    ///
    /// # Errors
    ///
    /// - `SchemaMismatch` on wrong argument count or type, over-long strings,
    ///   unknown account names or a fixed-address account given another key
    /// - `MissingAccount` when a required account is absent
    pub fn build(
        &self,
        schema: &MethodSchema,
        args: Vec<ArgValue>,
        accounts: &AccountRefs,
    ) -> Result<MethodInstruction, TransactionBuilderError> {
        let method = schema.name.as_str();

        if args.len() != schema.args.len() {
            return Err(TransactionBuilderError::schema_mismatch(
                method,
                format!(
                    "expected {} argument(s), got {}",
                    schema.args.len(),
                    args.len()
                ),
            ));
        }

        for (value, spec) in args.iter().zip(&schema.args) {
            value.check_type(&spec.ty).map_err(|detail| {
                TransactionBuilderError::schema_mismatch(
                    method,
                    format!("argument `{}`: {}", spec.name, detail),
                )
            })?;
        }

        if let Some(unknown) = accounts.names().find(|n| schema.account_spec(n).is_none()) {
            return Err(TransactionBuilderError::schema_mismatch(
                method,
                format!("unknown account `{}`", unknown),
            ));
        }

        let mut metas = Vec::with_capacity(schema.accounts.len());
        for spec in &schema.accounts {
            let key = match (accounts.get(&spec.name), spec.address) {
                (Some(given), Some(fixed)) if *given != fixed => {
                    return Err(TransactionBuilderError::schema_mismatch(
                        method,
                        format!("account `{}` must be {}, got {}", spec.name, fixed, given),
                    ));
                }
                (Some(given), _) => *given,
                (None, Some(fixed)) => fixed,
                (None, None) if spec.optional => {
                    // Absent optional accounts are passed as the program id
                    metas.push(AccountMeta::new_readonly(self.program_id, false));
                    continue;
                }
                (None, None) => {
                    return Err(TransactionBuilderError::missing_account(
                        method, &spec.name,
                    ));
                }
            };

            metas.push(if spec.is_writable {
                AccountMeta::new(key, spec.is_signer)
            } else {
                AccountMeta::new_readonly(key, spec.is_signer)
            });
        }

        let selector = schema.selector();
        let mut data = Vec::with_capacity(8 + args.len() * 8);
        data.extend_from_slice(&selector);
        for value in &args {
            value
                .encode(&mut data)
                .map_err(|e| TransactionBuilderError::Encoding {
                    method: method.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(MethodInstruction {
            program_id: self.program_id,
            method: method.to_string(),
            selector,
            args,
            accounts: metas,
            data,
        })
    }
}

/// Lay out a transaction's instructions: compute budget first, then program
/// instructions in the given order.
///
/// A zero `cu_limit` or `cu_price` skips the corresponding instruction.
pub fn plan_instructions(
    cu_limit: u32,
    cu_price: u64,
    program_ixs: Vec<Instruction>,
) -> Result<Vec<Instruction>, TransactionBuilderError> {
    if program_ixs.is_empty() {
        return Err(TransactionBuilderError::Configuration(
            "No program instructions to plan".to_string(),
        ));
    }

    let mut instructions = Vec::with_capacity(program_ixs.len() + 2);

    if cu_limit > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(cu_limit));
    }
    if cu_price > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(cu_price));
    }

    instructions.extend(program_ixs);
    Ok(instructions)
}

/// Validate instruction ordering (debug/test only)
///
/// Expected layout:
/// 1. Compute budget instructions (optional, at most one of each kind)
/// 2. At least one program instruction
///
/// In release builds this is a no-op.
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<(), TransactionBuilderError> {
    if instructions.is_empty() {
        return Err(TransactionBuilderError::invalid_order(
            "Instruction list is empty",
        ));
    }

    let is_budget = |ix: &Instruction| ix.program_id == compute_budget::id();

    let budget_prefix = instructions.iter().take_while(|ix| is_budget(ix)).count();

    if budget_prefix == instructions.len() {
        return Err(TransactionBuilderError::invalid_order(
            "Transaction has no program instructions",
        ));
    }

    if let Some(idx) = instructions
        .iter()
        .skip(budget_prefix)
        .position(|ix| is_budget(ix))
    {
        return Err(TransactionBuilderError::invalid_order(format!(
            "Compute budget instruction at position {} follows a program instruction",
            budget_prefix + idx
        )));
    }

    // First data byte is the compute budget instruction tag
    let mut tags: Vec<u8> = instructions[..budget_prefix]
        .iter()
        .filter_map(|ix| ix.data.first().copied())
        .collect();
    let total = tags.len();
    tags.sort_unstable();
    tags.dedup();
    if tags.len() != total {
        return Err(TransactionBuilderError::invalid_order(
            "Duplicate compute budget instruction",
        ));
    }

    Ok(())
}

#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(_instructions: &[Instruction]) -> Result<(), TransactionBuilderError> {
    Ok(())
}
