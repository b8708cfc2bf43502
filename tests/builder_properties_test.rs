//! Property tests for instruction construction against the marketplace
//! method catalog.

use dubuu_client::program::{marketplace_interface, method_selector, ArgType, ArgValue};
use dubuu_client::tx_builder::{AccountRefs, InstructionBuilder, TransactionBuilderError};
use proptest::prelude::*;
use solana_sdk::pubkey::Pubkey;

fn pubkey_strategy() -> impl Strategy<Value = Pubkey> {
    any::<[u8; 32]>().prop_map(Pubkey::new_from_array)
}

/// Values that satisfy `ty`
fn value_strategy(ty: &ArgType) -> BoxedStrategy<ArgValue> {
    match ty {
        ArgType::Bool => any::<bool>().prop_map(ArgValue::Bool).boxed(),
        ArgType::U8 => any::<u8>().prop_map(ArgValue::U8).boxed(),
        ArgType::U16 => any::<u16>().prop_map(ArgValue::U16).boxed(),
        ArgType::U32 => any::<u32>().prop_map(ArgValue::U32).boxed(),
        ArgType::U64 => any::<u64>().prop_map(ArgValue::U64).boxed(),
        ArgType::I64 => any::<i64>().prop_map(ArgValue::I64).boxed(),
        ArgType::String { max_len } => {
            let max = max_len.unwrap_or(64);
            proptest::string::string_regex(&format!("[a-zA-Z0-9]{{0,{}}}", max))
                .expect("valid regex")
                .prop_map(ArgValue::String)
                .boxed()
        }
        ArgType::Pubkey => pubkey_strategy().prop_map(ArgValue::Pubkey).boxed(),
        ArgType::Hash32 => any::<[u8; 32]>().prop_map(ArgValue::Hash32).boxed(),
        ArgType::Option(inner) => prop_oneof![
            Just(ArgValue::none()),
            value_strategy(inner).prop_map(ArgValue::some),
        ]
        .boxed(),
        ArgType::Enum { variants, .. } => (0..variants.len() as u8).prop_map(ArgValue::Enum).boxed(),
    }
}

/// A method name plus valid arguments and account references for it
fn invocation_strategy() -> impl Strategy<Value = (String, Vec<ArgValue>, AccountRefs)> {
    let iface = marketplace_interface(Pubkey::new_unique());
    let names: Vec<String> = iface.methods().iter().map(|m| m.name.clone()).collect();

    proptest::sample::select(names).prop_flat_map(move |name| {
        let schema = iface.method(&name).expect("method from catalog").clone();
        let args: Vec<BoxedStrategy<ArgValue>> =
            schema.args.iter().map(|a| value_strategy(&a.ty)).collect();

        let account_names: Vec<(String, bool)> = schema
            .accounts
            .iter()
            .filter(|a| a.address.is_none())
            .map(|a| (a.name.clone(), a.optional))
            .collect();
        let accounts = proptest::collection::vec(
            (pubkey_strategy(), any::<bool>()),
            account_names.len(),
        )
        .prop_map(move |keys| {
            account_names
                .iter()
                .zip(keys)
                .filter(|((_, optional), (_, include))| !optional || *include)
                .map(|((name, _), (key, _))| (name.clone(), key))
                .collect::<AccountRefs>()
        });

        (Just(name), args, accounts)
    })
}

proptest! {
    #[test]
    fn prop_output_counts_match_schema(
        program_seed in any::<[u8; 32]>(),
        (method, args, accounts) in invocation_strategy(),
    ) {
        let program_id = Pubkey::new_from_array(program_seed);
        let iface = marketplace_interface(program_id);
        let schema = iface.method(&method).unwrap();

        let ix = InstructionBuilder::build_method(&iface, &method, args.clone(), &accounts).unwrap();

        prop_assert_eq!(ix.args().len(), schema.args.len());
        prop_assert_eq!(ix.accounts().len(), schema.accounts.len());
        prop_assert_eq!(ix.program_id(), &program_id);
        prop_assert_eq!(&ix.data()[..8], &method_selector(&method)[..]);
        prop_assert_eq!(ix.args(), &args[..]);

        for (meta, spec) in ix.accounts().iter().zip(&schema.accounts) {
            match accounts.get(&spec.name) {
                Some(key) => {
                    prop_assert_eq!(&meta.pubkey, key);
                }
                None if spec.optional => {
                    prop_assert_eq!(meta.pubkey, program_id);
                }
                None => {
                    prop_assert_eq!(Some(meta.pubkey), spec.address);
                }
            }
        }
    }

    #[test]
    fn prop_extra_argument_is_schema_mismatch(
        (method, mut args, accounts) in invocation_strategy(),
        extra in any::<u64>(),
    ) {
        let iface = marketplace_interface(Pubkey::new_unique());
        args.push(ArgValue::U64(extra));

        let err = InstructionBuilder::build_method(&iface, &method, args, &accounts).unwrap_err();
        let is_schema_mismatch = matches!(err, TransactionBuilderError::SchemaMismatch { .. });
        prop_assert!(is_schema_mismatch);
    }
}

#[test]
fn missing_required_account_is_reported_by_name() {
    let iface = marketplace_interface(Pubkey::new_unique());
    let err = InstructionBuilder::build_method(
        &iface,
        "place_bid",
        vec![ArgValue::U64(10)],
        &AccountRefs::new().with("auction_account", Pubkey::new_unique()),
    )
    .unwrap_err();

    match err {
        TransactionBuilderError::MissingAccount { method, account } => {
            assert_eq!(method, "place_bid");
            assert_eq!(account, "bidder");
        }
        other => panic!("expected MissingAccount, got {other:?}"),
    }
}

#[test]
fn over_long_metadata_cid_is_rejected() {
    let iface = marketplace_interface(Pubkey::new_unique());
    let err = InstructionBuilder::build_method(
        &iface,
        "update_asset_walrus_cid",
        vec![ArgValue::String("x".repeat(101))],
        &AccountRefs::new()
            .with("asset_account", Pubkey::new_unique())
            .with("current_owner", Pubkey::new_unique()),
    )
    .unwrap_err();

    assert!(matches!(err, TransactionBuilderError::SchemaMismatch { .. }));
}
