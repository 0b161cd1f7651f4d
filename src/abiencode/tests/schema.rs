use crate::abiencode::schema::{self, AbiType, AbiValue};
use crate::abiencode::types::{Address, U256};
use super::*;
use crate::state::{ChannelState, ChannelStateClaim, VirtualChannelState, VirtualChannelStateClaim};

fn contract() -> Address {
    Address::from_hex_str("abcdef0123456789abcdef0123456789abcdef01").unwrap()
}

fn record(fields: &[(&str, u64)]) -> AbiValue {
    AbiValue::Record(
        fields
            .iter()
            .map(|(name, v)| (name.to_string(), AbiValue::from(*v)))
            .collect(),
    )
}

#[test]
fn matches_typed_encoding() {
    let typed = ChannelStateClaim {
        contract: contract(),
        state: ChannelState {
            alice_value: 10.into(),
            channel_value: 17.into(),
            auto_increment: 3,
        },
    };
    let values = [
        contract().into(),
        record(&[("aliceValue", 10), ("channelValue", 17), ("autoIncrement", 3)]),
    ];
    assert_eq!(
        schema::encode(&schema::channel_state_claim(), &values).unwrap(),
        to_vec(&typed).unwrap()
    );
}

#[test]
fn record_key_order_is_irrelevant() {
    let in_order = [
        contract().into(),
        record(&[("aliceValue", 2), ("vchannelValue", 3), ("autoIncrement", 1)]),
    ];
    let shuffled = [
        contract().into(),
        record(&[("autoIncrement", 1), ("aliceValue", 2), ("vchannelValue", 3)]),
    ];
    let s = schema::virtual_channel_state_claim();
    let a = schema::encode(&s, &in_order).unwrap();
    assert_eq!(a, schema::encode(&s, &shuffled).unwrap());

    let typed = VirtualChannelStateClaim {
        contract: contract(),
        state: VirtualChannelState {
            alice_value: 2.into(),
            vchannel_value: 3.into(),
            auto_increment: 1,
        },
    };
    assert_eq!(a, to_vec(&typed).unwrap());
}

#[test]
fn differently_cased_field_is_a_mismatch() {
    // `VchannelValue` is not the canonical field name.
    let values = [
        contract().into(),
        record(&[("aliceValue", 2), ("VchannelValue", 3), ("autoIncrement", 1)]),
    ];
    let err = schema::encode(&schema::virtual_channel_state_claim(), &values).unwrap_err();
    assert_eq!(
        err,
        Error::SchemaMismatch {
            path: "1.vchannelValue".to_string(),
            reason: "missing field"
        }
    );
}

#[test]
fn extra_field_is_a_mismatch() {
    let values = [
        contract().into(),
        record(&[
            ("aliceValue", 10),
            ("channelValue", 17),
            ("autoIncrement", 3),
            ("bobValue", 1),
        ]),
    ];
    assert!(matches!(
        schema::encode(&schema::channel_state_claim(), &values),
        Err(Error::SchemaMismatch { .. })
    ));
}

#[test]
fn wrong_kind_is_a_mismatch() {
    // Address and counter swapped.
    let values = [AbiValue::from(3u16), contract().into()];
    assert_eq!(
        schema::encode(&schema::revision_claim(), &values),
        Err(Error::SchemaMismatch {
            path: "0".to_string(),
            reason: "value has a different type than declared"
        })
    );
}

#[test]
fn wrong_arity_is_a_mismatch() {
    let values = [AbiValue::from(contract())];
    assert!(matches!(
        schema::encode(&schema::revision_claim(), &values),
        Err(Error::SchemaMismatch { .. })
    ));
}

#[test]
fn counter_overflowing_uint16_is_a_range_error() {
    let values = [contract().into(), AbiValue::from(0x1_0000u64)];
    assert_eq!(
        schema::encode(&schema::revision_claim(), &values),
        Err(Error::RangeError {
            path: "1".to_string(),
            bits: 16
        })
    );

    // The largest representable counter still encodes.
    let values = [AbiValue::from(contract()), AbiValue::from(u16::MAX)];
    let bytes = schema::encode(&schema::revision_claim(), &values).unwrap();
    assert_eq!(&bytes[62..], &[0xff, 0xff]);
}

#[test]
fn nested_range_error_reports_field_path() {
    let values = [
        contract().into(),
        record(&[("aliceValue", 10), ("channelValue", 17), ("autoIncrement", 70000)]),
    ];
    assert_eq!(
        schema::encode(&schema::channel_state_claim(), &values),
        Err(Error::RangeError {
            path: "1.autoIncrement".to_string(),
            bits: 16
        })
    );
}

#[test]
fn full_width_uint256() {
    let values = [contract().into(), AbiValue::Uint(U256::MAX)];
    let bytes = schema::encode(&schema::value_claim(), &values).unwrap();
    assert_eq!(bytes.len(), 64);
    assert!(bytes[32..].iter().all(|b| *b == 0xff));
}

#[test]
fn invalid_width_is_a_mismatch() {
    let values = [AbiValue::from(1u16)];
    assert!(matches!(
        schema::encode(&[AbiType::Uint(12)], &values),
        Err(Error::SchemaMismatch { .. })
    ));
}
