//! Error type and Return values used by the encoder.

use alloc::string::{String, ToString};
use core::fmt::Display;

use serde::ser;

/// Represents all possible errors that can happen during encoding.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The value contains a type that is not directly representable in
    /// Solidity types.
    ///
    /// For example floating point numbers, enums and maps. While we could
    /// default to some enum representation or automatically convert floats to
    /// `fixedNxM` we don't do this, as it could lead to loss of accuracy or
    /// force a specific representation on the Solidity side.
    TypeNotRepresentable(&'static str),
    /// Although the type is representable in Solidity (currently only used for
    /// `char`), the encoder does not implement this functionality.
    TypeNotYetSupported(&'static str),
    /// Dynamically sized types (`bytes`, `string`, `T[]`) require offsets in
    /// the head. None of the signed payloads contain them, so the encoder only
    /// handles static layouts.
    DynamicType(&'static str),
    /// The value does not have the shape declared by the schema. `path` points
    /// at the offending field, e.g. `1.vchannelValue`.
    SchemaMismatch { path: String, reason: &'static str },
    /// A numeric value does not fit into its declared `uintN`.
    RangeError { path: String, bits: u16 },
    /// Raised through [ser::Error::custom], for example by a failing
    /// `Serialize` implementation of a user type.
    Custom(String),
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: core::fmt::Display,
    {
        Error::Custom(msg.to_string())
    }
}
#[cfg(feature = "std")]
impl ser::StdError for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TypeNotRepresentable(type_name) => {
                f.write_str("type is not representable in abi encoding: ")?;
                f.write_str(type_name)
            }
            Error::TypeNotYetSupported(type_name) => {
                f.write_str("type is not yet implemented: ")?;
                f.write_str(type_name)
            }
            Error::DynamicType(type_name) => {
                f.write_str("dynamic types are not part of any canonical schema: ")?;
                f.write_str(type_name)
            }
            Error::SchemaMismatch { path, reason } => {
                write!(f, "value at `{}` does not match schema: {}", path, reason)
            }
            Error::RangeError { path, bits } => {
                write!(f, "value at `{}` does not fit into uint{}", path, bits)
            }
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

/// Alias for `Result` using the [Error] returned by the encoder.
pub type Result<T> = core::result::Result<T, Error>;
