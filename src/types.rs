//! Common types shared by the submission and confirmation paths

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::fmt;
use std::str::FromStr;

/// Degree of irreversibility the cluster has assigned to a transaction.
///
/// Ordered from weakest to strongest, so `a >= b` reads as "a satisfies b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalityLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl FinalityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalityLevel::Processed => "processed",
            FinalityLevel::Confirmed => "confirmed",
            FinalityLevel::Finalized => "finalized",
        }
    }

    /// Commitment to use for RPC reads made on behalf of this level
    pub fn commitment(&self) -> CommitmentConfig {
        match self {
            FinalityLevel::Processed => CommitmentConfig::processed(),
            FinalityLevel::Confirmed => CommitmentConfig::confirmed(),
            FinalityLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl fmt::Display for FinalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinalityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" | "recent" => Ok(FinalityLevel::Processed),
            "confirmed" | "single" => Ok(FinalityLevel::Confirmed),
            "finalized" | "max" | "root" => Ok(FinalityLevel::Finalized),
            other => Err(format!("unknown finality level: {}", other)),
        }
    }
}

/// Coarse classification of a ledger-side failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The freshness anchor (recent blockhash) is no longer recognised
    StaleAnchor,
    /// Fee payer cannot cover the transaction fee
    InsufficientFee,
    /// Fee payer account does not exist
    FeePayerNotFound,
    /// The same transaction was already processed
    AlreadyProcessed,
    /// An instruction failed during execution
    Program,
    Other,
}

/// Failure reported by the ledger for a transaction, either during
/// pre-flight simulation or after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    message: String,
    instruction_index: Option<u8>,
    custom_code: Option<u32>,
}

impl FailureReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self::parse(&message.into())
    }

    /// Build a reason from the debug rendering of a transaction error,
    /// e.g. `InstructionError(0, Custom(6008))`.
    ///
    /// Parsing the rendering rather than matching on the error type keeps
    /// this independent of how the RPC layer wraps transaction errors.
    pub fn parse(raw: &str) -> Self {
        let instruction_index = extract_number_after(raw, "InstructionError(")
            .and_then(|n| u8::try_from(n).ok());
        let custom_code =
            extract_number_after(raw, "Custom(").and_then(|n| u32::try_from(n).ok());

        Self {
            message: raw.to_string(),
            instruction_index,
            custom_code,
        }
    }

    /// Reason for an instruction that returned a custom program error
    pub fn custom(instruction_index: u8, code: u32) -> Self {
        Self::parse(&format!(
            "InstructionError({}, Custom({}))",
            instruction_index, code
        ))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn instruction_index(&self) -> Option<u8> {
        self.instruction_index
    }

    pub fn custom_code(&self) -> Option<u32> {
        self.custom_code
    }

    pub fn kind(&self) -> FailureKind {
        let msg = self.message.as_str();
        if has_error_name(msg, "BlockhashNotFound") || msg.contains("blockhash not found") {
            FailureKind::StaleAnchor
        } else if has_error_name(msg, "InsufficientFundsForFee") || msg.contains("insufficient funds") {
            FailureKind::InsufficientFee
        } else if has_error_name(msg, "AccountNotFound") {
            FailureKind::FeePayerNotFound
        } else if has_error_name(msg, "AlreadyProcessed") {
            FailureKind::AlreadyProcessed
        } else if has_error_name(msg, "InstructionError") {
            FailureKind::Program
        } else {
            FailureKind::Other
        }
    }

    /// Decode the custom code into the marketplace program's named error
    pub fn program_error(&self) -> Option<crate::program::MarketplaceError> {
        self.custom_code
            .and_then(crate::program::MarketplaceError::from_code)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.program_error() {
            Some(program_err) => write!(f, "{} ({})", self.message, program_err),
            None => f.write_str(&self.message),
        }
    }
}

/// Whether `name` appears as a whole identifier in a rendered error, so
/// `AccountNotFound` does not match `ProgramAccountNotFound`
pub(crate) fn has_error_name(rendered: &str, name: &str) -> bool {
    rendered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == name)
}

fn extract_number_after(haystack: &str, marker: &str) -> Option<u64> {
    let start = haystack.find(marker)? + marker.len();
    let digits: String = haystack[start..]
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Status of a submitted transaction as reported by the ledger.
///
/// `Pending` is the only non-terminal state; a status query may report
/// `Confirmed` at a level weaker than the caller wants, in which case the
/// caller keeps waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed(FinalityLevel),
    Failed(FailureReason),
}

impl ConfirmationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ConfirmationStatus::Pending)
    }
}

/// Outcome of a pre-flight simulation
#[derive(Debug, Clone, Default)]
pub struct SimulationOutcome {
    pub err: Option<FailureReason>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

impl SimulationOutcome {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finality_ordering() {
        assert!(FinalityLevel::Finalized > FinalityLevel::Confirmed);
        assert!(FinalityLevel::Confirmed > FinalityLevel::Processed);
        assert_eq!("finalized".parse::<FinalityLevel>(), Ok(FinalityLevel::Finalized));
        assert_eq!("Confirmed".parse::<FinalityLevel>(), Ok(FinalityLevel::Confirmed));
        assert!("eventually".parse::<FinalityLevel>().is_err());
    }

    #[test]
    fn test_failure_reason_parses_custom_code() {
        let reason = FailureReason::parse("InstructionError(1, Custom(6008))");
        assert_eq!(reason.instruction_index(), Some(1));
        assert_eq!(reason.custom_code(), Some(6008));
        assert_eq!(reason.kind(), FailureKind::Program);
        assert_eq!(
            reason.program_error(),
            Some(crate::program::MarketplaceError::BidTooLow)
        );
    }

    #[test]
    fn test_failure_reason_kinds() {
        assert_eq!(FailureReason::new("BlockhashNotFound").kind(), FailureKind::StaleAnchor);
        assert_eq!(
            FailureReason::new("InsufficientFundsForFee").kind(),
            FailureKind::InsufficientFee
        );
        assert_eq!(FailureReason::new("AccountNotFound").kind(), FailureKind::FeePayerNotFound);
        assert_eq!(FailureReason::new("something odd").kind(), FailureKind::Other);
        assert_eq!(FailureReason::new("something odd").custom_code(), None);
    }

    #[test]
    fn test_failure_kind_matches_whole_error_names() {
        // Program missing or not deployed: not a fee payer problem
        assert_eq!(
            FailureReason::parse("ProgramAccountNotFound").kind(),
            FailureKind::Other
        );
        assert_eq!(
            FailureReason::parse("InvalidProgramForExecution").kind(),
            FailureKind::Other
        );
        assert_eq!(
            FailureReason::parse("TransactionError(AccountNotFound)").kind(),
            FailureKind::FeePayerNotFound
        );
        assert!(has_error_name("Err(AlreadyProcessed)", "AlreadyProcessed"));
        assert!(!has_error_name("NotAlreadyProcessedYet", "AlreadyProcessed"));
    }

    #[test]
    fn test_display_includes_program_error() {
        let reason = FailureReason::custom(0, 6002);
        assert!(reason.to_string().contains("paused"));
    }
}
