//! Compatibility layer for Solana SDK message types
//!
//! Legacy and V0 messages expose the same information through different
//! structs. These helpers give one API over `VersionedMessage` so the
//! envelope and signing code never matches on the version itself.

use solana_sdk::{
    hash::Hash,
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys (not including lookup table addresses).
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Accounts that must sign: the first `num_required_signatures` static keys.
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let keys = get_static_account_keys(message);
    let n = get_num_required_signatures(message) as usize;
    &keys[..n.min(keys.len())]
}

#[inline]
#[must_use]
pub fn get_num_required_signatures(message: &VersionedMessage) -> u8 {
    get_message_header(message).num_required_signatures
}

/// The blockhash the message was compiled against
#[inline]
#[must_use]
pub fn get_recent_blockhash(message: &VersionedMessage) -> &Hash {
    message.recent_blockhash()
}

/// Fee payer is always the first static key
#[inline]
#[must_use]
pub fn get_fee_payer(message: &VersionedMessage) -> Option<&Pubkey> {
    get_static_account_keys(message).first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        instruction::{AccountMeta, Instruction},
        message::{v0, Message},
    };

    fn sample_ix(payer: Pubkey, co_signer: Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[7],
            vec![
                AccountMeta::new(payer, true),
                AccountMeta::new_readonly(co_signer, true),
                AccountMeta::new(Pubkey::new_unique(), false),
            ],
        )
    }

    #[test]
    fn test_legacy_and_v0_agree() {
        let payer = Pubkey::new_unique();
        let co_signer = Pubkey::new_unique();
        let ix = sample_ix(payer, co_signer);
        let blockhash = Hash::new_unique();

        let legacy = VersionedMessage::Legacy(Message::new_with_blockhash(
            &[ix.clone()],
            Some(&payer),
            &blockhash,
        ));
        let v0 = VersionedMessage::V0(v0::Message::try_compile(&payer, &[ix], &[], blockhash).unwrap());

        for msg in [&legacy, &v0] {
            assert_eq!(get_num_required_signatures(msg), 2);
            assert_eq!(get_required_signers(msg), &[payer, co_signer]);
            assert_eq!(get_fee_payer(msg), Some(&payer));
            assert_eq!(get_recent_blockhash(msg), &blockhash);
            assert_eq!(get_static_account_keys(msg).len(), 4);
        }
    }
}
