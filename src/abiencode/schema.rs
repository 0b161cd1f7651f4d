//! Schema driven encoding: `encode(schema, values)`.
//!
//! The typed structs in [crate::state] are the preferred way to build
//! payloads. This module exists for callers that receive a payload as loosely
//! typed data (for example decoded from JSON) and need it checked against the
//! declared layout before anything gets signed. Both paths end up in the same
//! serializer, so they cannot disagree on the produced bytes.

use super::{
    error::{Error, Result},
    ser,
    types::{Address, U256},
};
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use serde::{ser::SerializeTuple, Serialize, Serializer};

/// Declared type of one schema element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Address,
    /// `uintN`, `N` in bits.
    Uint(u16),
    /// Named struct of static fields, encoded inline in declaration order.
    Record {
        name: &'static str,
        fields: Vec<(&'static str, AbiType)>,
    },
}

/// Runtime value checked against an [AbiType].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    /// Fields are looked up by name, their order here is irrelevant.
    Record(Vec<(String, AbiValue)>),
}

impl AbiValue {
    fn kind(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Uint(_) => "uint",
            AbiValue::Record(_) => "record",
        }
    }
}

impl From<Address> for AbiValue {
    fn from(v: Address) -> Self {
        AbiValue::Address(v)
    }
}

impl From<U256> for AbiValue {
    fn from(v: U256) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<u16> for AbiValue {
    fn from(v: u16) -> Self {
        AbiValue::Uint(U256::from(v))
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        AbiValue::Uint(U256::from(v))
    }
}

/// Value that has been checked against its schema and whose record fields
/// have been put into declaration order.
enum Token {
    Address(Address),
    Uint(U256),
    Tuple(Vec<Token>),
}

impl Serialize for Token {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Token::Address(a) => a.serialize(serializer),
            Token::Uint(v) => v.serialize(serializer),
            Token::Tuple(fields) => {
                let mut t = serializer.serialize_tuple(fields.len())?;
                for f in fields {
                    t.serialize_element(f)?;
                }
                t.end()
            }
        }
    }
}

fn mismatch(path: &str, reason: &'static str) -> Error {
    Error::SchemaMismatch {
        path: path.to_string(),
        reason,
    }
}

fn tokenize(ty: &AbiType, value: &AbiValue, path: &str) -> Result<Token> {
    match (ty, value) {
        (AbiType::Address, AbiValue::Address(a)) => Ok(Token::Address(*a)),
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if *bits == 0 || *bits > 256 || bits % 8 != 0 {
                return Err(mismatch(path, "invalid uint width"));
            }
            if v.bits() > *bits as usize {
                return Err(Error::RangeError {
                    path: path.to_string(),
                    bits: *bits,
                });
            }
            Ok(Token::Uint(*v))
        }
        (AbiType::Record { fields, .. }, AbiValue::Record(values)) => {
            if values.len() != fields.len() {
                return Err(mismatch(path, "record field count differs"));
            }
            let mut tokens = Vec::with_capacity(fields.len());
            for (name, field_ty) in fields {
                let field_path = format!("{}.{}", path, name);
                let mut found = values.iter().filter(|(n, _)| n.as_str() == *name);
                let field_value = match (found.next(), found.next()) {
                    (Some((_, v)), None) => v,
                    (None, _) => return Err(mismatch(&field_path, "missing field")),
                    (Some(_), Some(_)) => return Err(mismatch(&field_path, "duplicate field")),
                };
                tokens.push(tokenize(field_ty, field_value, &field_path)?);
            }
            Ok(Token::Tuple(tokens))
        }
        (expected, actual) => {
            log::debug!(
                "schema mismatch at {}: expected {:?}, got {}",
                path,
                expected,
                actual.kind()
            );
            Err(mismatch(path, "value has a different type than declared"))
        }
    }
}

/// Encode `values` according to `schema`, element `i` of `values` being
/// encoded as `schema[i]`.
pub fn encode(schema: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if schema.len() != values.len() {
        return Err(mismatch("", "number of values differs from schema"));
    }
    let tokens = schema
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (ty, v))| tokenize(ty, v, &format!("{}", i)))
        .collect::<Result<Vec<_>>>()?;
    ser::to_vec(&Token::Tuple(tokens))
}

fn state_record(name: &'static str, value_field: &'static str) -> AbiType {
    AbiType::Record {
        name,
        fields: alloc::vec![
            ("aliceValue", AbiType::Uint(256)),
            (value_field, AbiType::Uint(256)),
            ("autoIncrement", AbiType::Uint(16)),
        ],
    }
}

/// `address, ChannelState{aliceValue, channelValue, autoIncrement}`
pub fn channel_state_claim() -> Vec<AbiType> {
    alloc::vec![AbiType::Address, state_record("ChannelState", "channelValue")]
}

/// `address, VirtualChannelState{aliceValue, vchannelValue, autoIncrement}`
pub fn virtual_channel_state_claim() -> Vec<AbiType> {
    alloc::vec![
        AbiType::Address,
        state_record("VirtualChannelState", "vchannelValue")
    ]
}

/// `address, uint16`
pub fn revision_claim() -> Vec<AbiType> {
    alloc::vec![AbiType::Address, AbiType::Uint(16)]
}

/// `address, uint256`
pub fn value_claim() -> Vec<AbiType> {
    alloc::vec![AbiType::Address, AbiType::Uint(256)]
}
