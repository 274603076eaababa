use brine_tl::{from_bytes, to_bytes, TlFunction, WireError};
use proptest::prelude::*;

use example_app::api::ton::tonlib_api::*;
use example_app::native::ton::details as native;

fn le(id: u32) -> [u8; 4] {
    id.to_le_bytes()
}

#[test]
fn constructors_of_a_sum_are_told_apart_by_identifier() {
    let foo = make_foo(7, "seven".to_string());
    let bytes = to_bytes(&foo).unwrap();
    assert_eq!(bytes[..4], le(id_foo));
    assert_eq!(bytes[4..8], 7i32.to_le_bytes());
    assert_eq!(bytes[8..], [5, b's', b'e', b'v', b'e', b'n', 0, 0]);
    assert_eq!(from_bytes::<TLBar>(&bytes).unwrap(), foo);

    let baz = make_baz(-1);
    let bytes = to_bytes(&baz).unwrap();
    assert_eq!(bytes[..4], le(id_baz));
    assert_eq!(from_bytes::<TLBar>(&bytes).unwrap(), TLBar::Baz(TLDbaz { c: -1 }));
    assert_eq!(baz.type_id(), id_baz);
}

#[test]
fn decoding_yields_the_encoded_constructor() {
    let bytes = to_bytes(&make_foo(5, "x".to_string())).unwrap();
    match from_bytes::<TLBar>(&bytes).unwrap() {
        TLBar::Foo(foo) => {
            assert_eq!(foo.a, 5);
            assert_eq!(foo.b, "x");
        }
        other => panic!("decoded the wrong constructor: {:?}", other),
    }
    assert_eq!(from_bytes::<TLBar>(&bytes).unwrap().type_id(), id_foo);
}

#[test]
fn unknown_identifier_is_rejected() {
    let mut bytes = vec![1, 2, 3, 4];
    bytes.extend_from_slice(&[0; 4]);
    assert_eq!(
        from_bytes::<TLBar>(&bytes),
        Err(WireError::UnknownId { type_name: "Bar".to_string(), id: 0x04030201 })
    );
}

#[test]
fn truncated_input_names_the_field() {
    let bytes = to_bytes(&make_foo(7, "seven".to_string())).unwrap();
    match from_bytes::<TLBar>(&bytes[..6]) {
        Err(WireError::Field { combinator, field, source }) => {
            assert_eq!(combinator, "foo");
            assert_eq!(field, "a");
            assert!(matches!(*source, WireError::UnexpectedEnd { .. }));
        }
        other => panic!("expected a field error but got {:?}", other),
    }
}

#[test]
fn vectors_carry_a_count() {
    let numbers = TLDnumbers { values: vec![1, 2, 3] };
    assert_eq!(to_bytes(&numbers).unwrap(), [3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]);

    let boxed = make_numbers(vec![1, 2, 3]);
    let bytes = to_bytes(&boxed).unwrap();
    assert_eq!(bytes[..4], le(id_numbers));
    assert_eq!(from_bytes::<TLNumbers>(&bytes).unwrap(), boxed);

    let matrix = make_matrix(vec![vec![1], vec![], vec![2, 3]]);
    assert_eq!(from_bytes::<TLMatrix>(&to_bytes(&matrix).unwrap()).unwrap(), matrix);
}

#[test]
fn absent_nullable_is_only_a_flag() {
    let options = TLDoptions { config: None, keystore_type: make_keyStoreTypeInMemory() };
    let bytes = to_bytes(&options).unwrap();
    assert_eq!(bytes[..4], [0, 0, 0, 0]);
    assert_eq!(bytes[4..], le(id_keyStoreTypeInMemory));
    assert_eq!(from_bytes::<TLDoptions>(&bytes).unwrap(), options);
}

#[test]
fn present_nullable_is_flagged_and_bare() {
    let config = TLDconfig {
        config:                    String::new(),
        blockchain_name:           String::new(),
        use_callbacks_for_network: true,
        ignore_cache:              false,
    };
    let options = TLDoptions { config: Some(config), keystore_type: make_keyStoreTypeInMemory() };
    let bytes = to_bytes(&options).unwrap();
    assert_eq!(bytes[..4], [1, 0, 0, 0]);
    // Two empty strings, then the two booleans.
    assert_eq!(bytes[4..12], [0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(bytes[12..16], le(0x997275b5));
    assert_eq!(bytes[16..20], le(0xbc799737));
    assert_eq!(from_bytes::<TLDoptions>(&bytes).unwrap(), options);
}

#[test]
fn functions_are_boxed() {
    let request = make_deleteKey(TLDkey {
        public_key: "Pub".to_string(),
        secret:     TLsecureBytes::new(b"secret".to_vec()),
    });
    assert_eq!(<TLDeleteKey as TlFunction>::ID, id_deleteKey);
    let bytes = to_bytes(&request).unwrap();
    assert_eq!(bytes[..4], le(id_deleteKey));
    assert_eq!(from_bytes::<TLDeleteKey>(&bytes).unwrap(), request);
    assert!(format!("{:?}", request).contains("<6 bytes>"));
}

#[test]
fn oversized_bytes_are_not_truncated() {
    let request = make_deleteKey(TLDkey {
        public_key: "Pub".to_string(),
        secret:     TLsecureBytes::new(vec![0; 1 << 24]),
    });
    assert_eq!(
        to_bytes(&request),
        Err(WireError::TooLong { len: 1 << 24, max: 0xFF_FFFF })
    );
}

#[test]
fn native_bool_shares_the_builtin_wire_format() {
    assert_eq!(to_bytes(&native::create::make_boolTrue()).unwrap(), to_bytes(&true).unwrap());
    assert_eq!(to_bytes(&native::create::make_boolFalse()).unwrap(), to_bytes(&false).unwrap());
    assert_eq!(native::id_boolTrue, 0x997275b5);
}

#[test]
fn bool_converts_both_ways() {
    assert!(bool::from(native::create::make_boolTrue()));
    assert!(!bool::from(native::create::make_boolFalse()));
    assert_eq!(native::TLBool::from(true), native::create::make_boolTrue());
    assert_eq!(native::TLBool::from(false), native::create::make_boolFalse());
}

#[test]
fn conversion_round_trips() {
    let options = native::TLDoptions {
        config: Some(native::TLDconfig {
            config:                    "{}".to_string(),
            blockchain_name:           "mainnet".to_string(),
            use_callbacks_for_network: native::create::make_boolTrue(),
            ignore_cache:              native::create::make_boolFalse(),
        }),
        keystore_type: native::create::make_keyStoreTypeDirectory("/tmp/keys".to_string()),
    };

    let public = TLDoptions::from(options.clone());
    let config = public.config.as_ref().unwrap();
    assert!(config.use_callbacks_for_network);
    assert!(!config.ignore_cache);
    assert_eq!(
        public.keystore_type,
        make_keyStoreTypeDirectory("/tmp/keys".to_string())
    );

    assert_eq!(to_bytes(&public).unwrap(), to_bytes(&options).unwrap());
    assert_eq!(native::TLDoptions::from(public), options);
}

#[test]
fn sums_and_functions_convert() {
    assert_eq!(TLBar::from(native::create::make_baz(3)), make_baz(3));
    assert_eq!(native::TLBar::from(make_foo(1, "a".to_string())), native::create::make_foo(1, "a".to_string()));

    let request = native::create::make_deleteKey(native::TLDkey {
        public_key: "Pub".to_string(),
        secret:     TLsecureBytes::new(vec![1, 2, 3]),
    });
    let public = TLDeleteKey::from(request.clone());
    assert_eq!(to_bytes(&public).unwrap(), to_bytes(&request).unwrap());
    assert_eq!(native::TLDeleteKey::from(public), request);
}

proptest! {
    #[test]
    fn numbers_round_trip(values in proptest::collection::vec(any::<i32>(), 0..64)) {
        let numbers = make_numbers(values);
        prop_assert_eq!(from_bytes::<TLNumbers>(&to_bytes(&numbers).unwrap()).unwrap(), numbers);
    }

    #[test]
    fn wallet_lists_round_trip(
        entries in proptest::collection::vec(
            (proptest::collection::vec(any::<u8>(), 0..300), any::<i64>()),
            0..8,
        ),
    ) {
        let list = native::create::make_storage_walletList(
            entries
                .into_iter()
                .map(|(key, created_at)| native::TLDstorage_walletEntry {
                    key: key.clone().into(),
                    value: TLsecureBytes::new(key),
                    created_at,
                })
                .collect(),
        );
        let bytes = to_bytes(&list).unwrap();
        prop_assert_eq!(bytes.len() % 4, 0);
        prop_assert_eq!(from_bytes::<native::TLstorage_WalletList>(&bytes).unwrap(), list);
    }
}
