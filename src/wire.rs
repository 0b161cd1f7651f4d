mod encoding;
pub mod proto;

use core::fmt::{Debug, Display};

pub use encoding::{decode_settlement_request, decode_watchtower_message, ProtoBufEncodingLayer};

use crate::{
    messages::{SettlementRequest, WatchtowerMessage},
    quorum::WatchtowerIdx,
};

/// Byte-level transport. Frames are opaque to the implementation.
pub trait BytesBus: Debug {
    fn send_to_watchtower(&self, idx: WatchtowerIdx, msg: &[u8]);
    fn send_to_verifier(&self, msg: &[u8]);
}

/// Where messages leave a party: to the watchtowers of a channel and to the
/// settlement contract (the verifier).
///
/// Sending is fire-and-forget. Whether a request was accepted shows only in
/// the phase of the channel afterwards.
pub trait MessageBus: Debug {
    fn send_to_watchtower(&self, idx: WatchtowerIdx, msg: WatchtowerMessage);
    fn submit(&self, req: SettlementRequest);
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConversionError {
    ByteLengthMismatch,
    ExpectedSome,
    /// A number does not fit the field it is decoded into.
    OutOfRange,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WireError {
    Encode(prost::EncodeError),
    Decode(prost::DecodeError),
    /// The encoded message does not fit the 2-byte length prefix.
    TooLong(usize),
    /// The frame is shorter than its length prefix says.
    Truncated { expected: usize, actual: usize },
    Conversion(ConversionError),
}

impl From<prost::EncodeError> for WireError {
    fn from(e: prost::EncodeError) -> Self {
        Self::Encode(e)
    }
}
impl From<prost::DecodeError> for WireError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e)
    }
}
impl From<ConversionError> for WireError {
    fn from(e: ConversionError) -> Self {
        Self::Conversion(e)
    }
}

impl Display for WireError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WireError::Encode(e) => write!(f, "{}", e),
            WireError::Decode(e) => write!(f, "{}", e),
            WireError::TooLong(len) => write!(f, "message of {} bytes exceeds frame size", len),
            WireError::Truncated { expected, actual } => {
                write!(f, "frame truncated: expected {} bytes, got {}", expected, actual)
            }
            WireError::Conversion(e) => write!(f, "malformed message: {:?}", e),
        }
    }
}
