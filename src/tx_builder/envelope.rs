//! Transaction envelopes
//!
//! An `UnsignedEnvelope` holds everything needed to compile a message:
//! instructions, fee payer and the freshness anchor. Signing consumes it and
//! yields a `SignedEnvelope`, which is only constructed once every required
//! signer has signed and offers no way to modify the transaction.

use crate::compat;
use crate::tx_builder::errors::TransactionBuilderError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Signature, Signer},
    transaction::VersionedTransaction,
};
use std::fmt;

/// Recent blockhash plus the last block height at which it is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FreshnessAnchor {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl FreshnessAnchor {
    pub fn new(blockhash: Hash, last_valid_block_height: u64) -> Self {
        Self {
            blockhash,
            last_valid_block_height,
        }
    }

    /// Whether a transaction anchored here can still land at `block_height`
    pub fn is_valid_at(&self, block_height: u64) -> bool {
        block_height <= self.last_valid_block_height
    }
}

impl fmt::Display for FreshnessAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (valid through block {})",
            self.blockhash, self.last_valid_block_height
        )
    }
}

/// Wire format of the compiled message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVersion {
    Legacy,
    #[default]
    V0,
}

/// Instructions, fee payer and anchor, not yet signed
#[derive(Debug, Clone)]
pub struct UnsignedEnvelope {
    instructions: Vec<Instruction>,
    fee_payer: Pubkey,
    anchor: FreshnessAnchor,
    version: MessageVersion,
}

impl UnsignedEnvelope {
    pub fn new(
        instructions: Vec<Instruction>,
        fee_payer: Pubkey,
        anchor: FreshnessAnchor,
        version: MessageVersion,
    ) -> Self {
        Self {
            instructions,
            fee_payer,
            anchor,
            version,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    pub fn anchor(&self) -> &FreshnessAnchor {
        &self.anchor
    }

    pub fn version(&self) -> MessageVersion {
        self.version
    }

    /// Same instructions and payer, new anchor
    pub fn with_anchor(&self, anchor: FreshnessAnchor) -> Self {
        Self {
            anchor,
            ..self.clone()
        }
    }

    pub fn compile_message(&self) -> Result<VersionedMessage, TransactionBuilderError> {
        if self.instructions.is_empty() {
            return Err(TransactionBuilderError::invalid_order(
                "Instruction list is empty",
            ));
        }

        match self.version {
            MessageVersion::Legacy => Ok(VersionedMessage::Legacy(Message::new_with_blockhash(
                &self.instructions,
                Some(&self.fee_payer),
                &self.anchor.blockhash,
            ))),
            MessageVersion::V0 => {
                let message = v0::Message::try_compile(
                    &self.fee_payer,
                    &self.instructions,
                    &[],
                    self.anchor.blockhash,
                )
                .map_err(|e| {
                    TransactionBuilderError::MessageCompile(format!(
                        "Failed to compile message: {}",
                        e
                    ))
                })?;
                Ok(VersionedMessage::V0(message))
            }
        }
    }

    /// Sign with `signers`, consuming the envelope.
    ///
    /// Every required signer of the compiled message must be present in
    /// `signers`; extra signers are ignored.
    ///
    /// # Errors
    ///
    /// - `MissingSigner` if a required authority has no matching signer
    /// - `Signing` if a signer fails to produce a signature
    pub fn sign(self, signers: &[&dyn Signer]) -> Result<SignedEnvelope, TransactionBuilderError> {
        let message = self.compile_message()?;
        let message_bytes = message.serialize();

        let mut signatures = Vec::with_capacity(compat::get_required_signers(&message).len());
        for required in compat::get_required_signers(&message) {
            let signer = signers
                .iter()
                .find(|s| s.try_pubkey().map(|pk| pk == *required).unwrap_or(false))
                .ok_or_else(|| TransactionBuilderError::MissingSigner {
                    pubkey: required.to_string(),
                })?;

            let signature = signer
                .try_sign_message(&message_bytes)
                .map_err(|e| TransactionBuilderError::Signing(e.to_string()))?;
            signatures.push(signature);
        }

        Ok(SignedEnvelope {
            transaction: VersionedTransaction {
                signatures,
                message,
            },
            anchor: self.anchor,
            fee_payer: self.fee_payer,
        })
    }
}

/// A fully signed transaction, ready to submit
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    transaction: VersionedTransaction,
    anchor: FreshnessAnchor,
    fee_payer: Pubkey,
}

impl SignedEnvelope {
    /// The fee payer's signature, which identifies the transaction on the ledger
    pub fn signature(&self) -> Signature {
        self.transaction
            .signatures
            .first()
            .copied()
            .unwrap_or_default()
    }

    pub fn transaction(&self) -> &VersionedTransaction {
        &self.transaction
    }

    pub fn anchor(&self) -> &FreshnessAnchor {
        &self.anchor
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    /// Wire bytes, as sent to the ledger
    pub fn serialize(&self) -> Result<Vec<u8>, TransactionBuilderError> {
        bincode::serialize(&self.transaction)
            .map_err(|e| TransactionBuilderError::internal(format!("serialize: {}", e)))
    }

    pub fn serialize_base64(&self) -> Result<String, TransactionBuilderError> {
        Ok(BASE64.encode(self.serialize()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        instruction::AccountMeta,
        signature::Keypair,
    };

    fn anchor() -> FreshnessAnchor {
        FreshnessAnchor::new(Hash::new_unique(), 1_000)
    }

    fn ix_signed_by(keys: &[Pubkey]) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1, 2, 3],
            keys.iter().map(|k| AccountMeta::new(*k, true)).collect(),
        )
    }

    #[test]
    fn test_sign_v0_and_legacy() {
        let payer = Keypair::new();
        for version in [MessageVersion::V0, MessageVersion::Legacy] {
            let env = UnsignedEnvelope::new(
                vec![ix_signed_by(&[payer.pubkey()])],
                payer.pubkey(),
                anchor(),
                version,
            );
            let signed = env.sign(&[&payer]).expect("should sign");
            assert_ne!(signed.signature(), Signature::default());
            assert!(signed.transaction().verify_with_results().iter().all(|ok| *ok));
            assert!(!signed.serialize_base64().unwrap().is_empty());
        }
    }

    #[test]
    fn test_missing_signer() {
        let payer = Keypair::new();
        let co_signer = Keypair::new();
        let env = UnsignedEnvelope::new(
            vec![ix_signed_by(&[payer.pubkey(), co_signer.pubkey()])],
            payer.pubkey(),
            anchor(),
            MessageVersion::V0,
        );

        match env.clone().sign(&[&payer]) {
            Err(TransactionBuilderError::MissingSigner { pubkey }) => {
                assert_eq!(pubkey, co_signer.pubkey().to_string())
            }
            other => panic!("unexpected result: {other:?}"),
        }

        // Order of signers does not matter
        let signed = env.sign(&[&co_signer, &payer]).unwrap();
        assert_eq!(signed.transaction().signatures.len(), 2);
    }

    #[test]
    fn test_with_anchor_changes_blockhash() {
        let payer = Keypair::new();
        let env = UnsignedEnvelope::new(
            vec![ix_signed_by(&[payer.pubkey()])],
            payer.pubkey(),
            anchor(),
            MessageVersion::V0,
        );
        let fresh = anchor();
        let rebuilt = env.with_anchor(fresh);
        let msg = rebuilt.compile_message().unwrap();
        assert_eq!(compat::get_recent_blockhash(&msg), &fresh.blockhash);
    }

    #[test]
    fn test_empty_envelope_rejected() {
        let payer = Keypair::new();
        let env = UnsignedEnvelope::new(vec![], payer.pubkey(), anchor(), MessageVersion::V0);
        assert!(env.sign(&[&payer]).is_err());
    }

    #[test]
    fn test_anchor_validity() {
        let a = FreshnessAnchor::new(Hash::default(), 100);
        assert!(a.is_valid_at(100));
        assert!(!a.is_valid_at(101));
    }
}
