//! Protobuf messages exchanged with watchtowers and the verifier, and the
//! conversions from and to the typed messages.
//!
//! Numbers wider than 64 bits are 32-byte big-endian `bytes`, addresses are
//! 20 bytes, signatures 65 bytes (`r || s || v`). The schema for other
//! implementations is `thunderdome.proto` next to this file.

use ::prost::alloc::vec::Vec;

use super::ConversionError;
use crate::{
    abiencode::types::{Address, Signature, U256},
    messages,
    quorum::WatchtowerIdx,
    state::{self, SignedMessage},
};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelState {
    #[prost(bytes = "vec", tag = "1")]
    pub alice_value: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub channel_value: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub auto_increment: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VirtualChannelState {
    #[prost(bytes = "vec", tag = "1")]
    pub alice_value: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub vchannel_value: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub auto_increment: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RevisionClaim {
    #[prost(uint32, tag = "1")]
    pub auto_increment: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub alice_sig: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub ingrid_sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VirtualClaim {
    #[prost(message, optional, tag = "1")]
    pub state: ::core::option::Option<VirtualChannelState>,
    #[prost(bytes = "vec", tag = "2")]
    pub alice_sig: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub bob_sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedChannelState {
    #[prost(bytes = "vec", tag = "1")]
    pub contract: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub state: ::core::option::Option<ChannelState>,
    #[prost(bytes = "vec", tag = "3")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchtowerMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub contract: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub idx: u64,
    #[prost(oneof = "watchtower_msg::Claim", tags = "3, 4")]
    pub claim: ::core::option::Option<watchtower_msg::Claim>,
}

pub mod watchtower_msg {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Claim {
        #[prost(message, tag = "3")]
        Revision(super::RevisionClaim),
        #[prost(message, tag = "4")]
        Virtual(super::VirtualClaim),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AliceFund {
    #[prost(bytes = "vec", tag = "1")]
    pub ingrid: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub watchtowers: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FundIngrid {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FundWatchtower {
    #[prost(uint64, tag = "1")]
    pub idx: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OptimisticAliceClose {
    #[prost(bytes = "vec", tag = "1")]
    pub alice_value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchtowerClaimState {
    #[prost(message, optional, tag = "1")]
    pub claim: ::core::option::Option<RevisionClaim>,
    #[prost(uint64, tag = "2")]
    pub idx: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PessimisticClose {
    #[prost(message, optional, tag = "1")]
    pub state: ::core::option::Option<ChannelState>,
    #[prost(bytes = "vec", tag = "2")]
    pub counterparty_sig: Vec<u8>,
    #[prost(message, repeated, tag = "3")]
    pub aggregate: Vec<SignedChannelState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VirtualChannelRegister {
    #[prost(bytes = "vec", tag = "1")]
    pub alice: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub bob: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub ingrid: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub alice_contract: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub bob_contract: Vec<u8>,
    #[prost(message, optional, tag = "6")]
    pub open_state: ::core::option::Option<VirtualChannelState>,
    #[prost(bytes = "vec", tag = "7")]
    pub alice_sig: Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub ingrid_sig: Vec<u8>,
    #[prost(bytes = "vec", tag = "9")]
    pub bob_sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VirtualWatchtowerClaimState {
    #[prost(message, optional, tag = "1")]
    pub claim: ::core::option::Option<VirtualClaim>,
    #[prost(uint64, tag = "2")]
    pub idx: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SettlementRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub contract: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub from: Vec<u8>,
    #[prost(
        oneof = "settlement_request::Call",
        tags = "3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14"
    )]
    pub call: ::core::option::Option<settlement_request::Call>,
}

pub mod settlement_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Call {
        #[prost(message, tag = "3")]
        AliceFund(super::AliceFund),
        #[prost(message, tag = "4")]
        FundIngrid(super::FundIngrid),
        #[prost(message, tag = "5")]
        FundWatchtower(super::FundWatchtower),
        #[prost(message, tag = "6")]
        Open(super::Empty),
        #[prost(message, tag = "7")]
        OptimisticAliceClose(super::OptimisticAliceClose),
        #[prost(message, tag = "8")]
        OptimisticIngridClose(super::Empty),
        #[prost(message, tag = "9")]
        WatchtowerClaimState(super::WatchtowerClaimState),
        #[prost(message, tag = "10")]
        PessimisticClose(super::PessimisticClose),
        #[prost(message, tag = "11")]
        VirtualChannelRegister(super::VirtualChannelRegister),
        #[prost(message, tag = "12")]
        VirtualWatchtowerClaimState(super::VirtualWatchtowerClaimState),
        #[prost(message, tag = "13")]
        PessimisticVirtualChannelClose(super::Empty),
        #[prost(message, tag = "14")]
        FinalClose(super::Empty),
    }
}

fn u256_to_bytes(v: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    v.to_big_endian(&mut buf);
    buf.to_vec()
}

fn u256_from_bytes(v: &[u8]) -> Result<U256, ConversionError> {
    if v.len() != 32 {
        return Err(ConversionError::ByteLengthMismatch);
    }
    Ok(U256::from_big_endian(v))
}

fn address_from_bytes(v: Vec<u8>) -> Result<Address, ConversionError> {
    Ok(Address(
        v.try_into().or(Err(ConversionError::ByteLengthMismatch))?,
    ))
}

fn signature_from_bytes(v: Vec<u8>) -> Result<Signature, ConversionError> {
    let bytes: [u8; 65] = v.try_into().or(Err(ConversionError::ByteLengthMismatch))?;
    Ok(Signature::from_rsv_bytes(&bytes))
}

fn signature_to_bytes(sig: Signature) -> Vec<u8> {
    sig.to_rsv_bytes().to_vec()
}

fn revision_from_u32(v: u32) -> Result<u16, ConversionError> {
    v.try_into().or(Err(ConversionError::OutOfRange))
}

fn idx_from_u64(v: u64) -> Result<WatchtowerIdx, ConversionError> {
    v.try_into().or(Err(ConversionError::OutOfRange))
}

impl From<state::ChannelState> for ChannelState {
    fn from(s: state::ChannelState) -> Self {
        Self {
            alice_value: u256_to_bytes(s.alice_value),
            channel_value: u256_to_bytes(s.channel_value),
            auto_increment: s.auto_increment.into(),
        }
    }
}

impl TryFrom<ChannelState> for state::ChannelState {
    type Error = ConversionError;

    fn try_from(s: ChannelState) -> Result<Self, Self::Error> {
        Ok(Self {
            alice_value: u256_from_bytes(&s.alice_value)?,
            channel_value: u256_from_bytes(&s.channel_value)?,
            auto_increment: revision_from_u32(s.auto_increment)?,
        })
    }
}

impl From<state::VirtualChannelState> for VirtualChannelState {
    fn from(s: state::VirtualChannelState) -> Self {
        Self {
            alice_value: u256_to_bytes(s.alice_value),
            vchannel_value: u256_to_bytes(s.vchannel_value),
            auto_increment: s.auto_increment.into(),
        }
    }
}

impl TryFrom<VirtualChannelState> for state::VirtualChannelState {
    type Error = ConversionError;

    fn try_from(s: VirtualChannelState) -> Result<Self, Self::Error> {
        Ok(Self {
            alice_value: u256_from_bytes(&s.alice_value)?,
            vchannel_value: u256_from_bytes(&s.vchannel_value)?,
            auto_increment: revision_from_u32(s.auto_increment)?,
        })
    }
}

impl From<messages::WatchtowerRevisionClaim> for RevisionClaim {
    fn from(c: messages::WatchtowerRevisionClaim) -> Self {
        Self {
            auto_increment: c.auto_increment.into(),
            alice_sig: signature_to_bytes(c.alice_sig),
            ingrid_sig: signature_to_bytes(c.ingrid_sig),
        }
    }
}

impl TryFrom<RevisionClaim> for messages::WatchtowerRevisionClaim {
    type Error = ConversionError;

    fn try_from(c: RevisionClaim) -> Result<Self, Self::Error> {
        Ok(Self {
            auto_increment: revision_from_u32(c.auto_increment)?,
            alice_sig: signature_from_bytes(c.alice_sig)?,
            ingrid_sig: signature_from_bytes(c.ingrid_sig)?,
        })
    }
}

impl From<messages::WatchtowerVirtualClaim> for VirtualClaim {
    fn from(c: messages::WatchtowerVirtualClaim) -> Self {
        Self {
            state: Some(c.state.into()),
            alice_sig: signature_to_bytes(c.alice_sig),
            bob_sig: signature_to_bytes(c.bob_sig),
        }
    }
}

impl TryFrom<VirtualClaim> for messages::WatchtowerVirtualClaim {
    type Error = ConversionError;

    fn try_from(c: VirtualClaim) -> Result<Self, Self::Error> {
        Ok(Self {
            state: c.state.ok_or(ConversionError::ExpectedSome)?.try_into()?,
            alice_sig: signature_from_bytes(c.alice_sig)?,
            bob_sig: signature_from_bytes(c.bob_sig)?,
        })
    }
}

impl From<messages::SignedChannelState> for SignedChannelState {
    fn from(s: messages::SignedChannelState) -> Self {
        Self {
            contract: s.payload.contract.0.to_vec(),
            state: Some(s.payload.state.into()),
            sig: signature_to_bytes(s.signature),
        }
    }
}

impl TryFrom<SignedChannelState> for messages::SignedChannelState {
    type Error = ConversionError;

    fn try_from(s: SignedChannelState) -> Result<Self, Self::Error> {
        Ok(SignedMessage {
            payload: state::ChannelStateClaim {
                contract: address_from_bytes(s.contract)?,
                state: s.state.ok_or(ConversionError::ExpectedSome)?.try_into()?,
            },
            signature: signature_from_bytes(s.sig)?,
        })
    }
}

impl WatchtowerMsg {
    pub fn new(idx: WatchtowerIdx, msg: messages::WatchtowerMessage) -> Self {
        let claim = match msg {
            messages::WatchtowerMessage::Revision { claim, .. } => {
                watchtower_msg::Claim::Revision(claim.into())
            }
            messages::WatchtowerMessage::Virtual { claim, .. } => {
                watchtower_msg::Claim::Virtual(claim.into())
            }
        };
        Self {
            contract: msg.contract().0.to_vec(),
            idx: idx as u64,
            claim: Some(claim),
        }
    }

    pub fn into_message(
        self,
    ) -> Result<(WatchtowerIdx, messages::WatchtowerMessage), ConversionError> {
        let contract = address_from_bytes(self.contract)?;
        let msg = match self.claim.ok_or(ConversionError::ExpectedSome)? {
            watchtower_msg::Claim::Revision(c) => messages::WatchtowerMessage::Revision {
                contract,
                claim: c.try_into()?,
            },
            watchtower_msg::Claim::Virtual(c) => messages::WatchtowerMessage::Virtual {
                contract,
                claim: c.try_into()?,
            },
        };
        Ok((idx_from_u64(self.idx)?, msg))
    }
}

impl From<messages::VirtualChannelRegistration> for VirtualChannelRegister {
    fn from(r: messages::VirtualChannelRegistration) -> Self {
        Self {
            alice: r.alice.0.to_vec(),
            bob: r.bob.0.to_vec(),
            ingrid: r.ingrid.0.to_vec(),
            alice_contract: r.alice_contract.0.to_vec(),
            bob_contract: r.bob_contract.0.to_vec(),
            open_state: Some(r.open_state.into()),
            alice_sig: signature_to_bytes(r.alice_sig),
            ingrid_sig: signature_to_bytes(r.ingrid_sig),
            bob_sig: signature_to_bytes(r.bob_sig),
        }
    }
}

impl TryFrom<VirtualChannelRegister> for messages::VirtualChannelRegistration {
    type Error = ConversionError;

    fn try_from(r: VirtualChannelRegister) -> Result<Self, Self::Error> {
        Ok(Self {
            alice: address_from_bytes(r.alice)?,
            bob: address_from_bytes(r.bob)?,
            ingrid: address_from_bytes(r.ingrid)?,
            alice_contract: address_from_bytes(r.alice_contract)?,
            bob_contract: address_from_bytes(r.bob_contract)?,
            open_state: r.open_state.ok_or(ConversionError::ExpectedSome)?.try_into()?,
            alice_sig: signature_from_bytes(r.alice_sig)?,
            ingrid_sig: signature_from_bytes(r.ingrid_sig)?,
            bob_sig: signature_from_bytes(r.bob_sig)?,
        })
    }
}

impl From<messages::SettlementCall> for settlement_request::Call {
    fn from(call: messages::SettlementCall) -> Self {
        use messages::SettlementCall as C;
        use settlement_request::Call;

        match call {
            C::AliceFund {
                ingrid,
                watchtowers,
                value,
            } => Call::AliceFund(AliceFund {
                ingrid: ingrid.0.to_vec(),
                watchtowers: watchtowers.iter().map(|w| w.0.to_vec()).collect(),
                value: u256_to_bytes(value),
            }),
            C::FundIngrid { value } => Call::FundIngrid(FundIngrid {
                value: u256_to_bytes(value),
            }),
            C::FundWatchtower { idx, value } => Call::FundWatchtower(FundWatchtower {
                idx: idx as u64,
                value: u256_to_bytes(value),
            }),
            C::Open => Call::Open(Empty {}),
            C::OptimisticAliceClose { alice_value } => {
                Call::OptimisticAliceClose(OptimisticAliceClose {
                    alice_value: u256_to_bytes(alice_value),
                })
            }
            C::OptimisticIngridClose => Call::OptimisticIngridClose(Empty {}),
            C::WatchtowerClaimState { claim, idx } => {
                Call::WatchtowerClaimState(WatchtowerClaimState {
                    claim: Some(claim.into()),
                    idx: idx as u64,
                })
            }
            C::PessimisticClose {
                state,
                counterparty_sig,
                aggregate,
            } => Call::PessimisticClose(PessimisticClose {
                state: Some(state.into()),
                counterparty_sig: signature_to_bytes(counterparty_sig),
                aggregate: aggregate.into_iter().map(SignedChannelState::from).collect(),
            }),
            C::VirtualChannelRegister(reg) => Call::VirtualChannelRegister(reg.into()),
            C::VirtualWatchtowerClaimState { claim, idx } => {
                Call::VirtualWatchtowerClaimState(VirtualWatchtowerClaimState {
                    claim: Some(claim.into()),
                    idx: idx as u64,
                })
            }
            C::PessimisticVirtualChannelClose => Call::PessimisticVirtualChannelClose(Empty {}),
            C::FinalClose => Call::FinalClose(Empty {}),
        }
    }
}

impl TryFrom<settlement_request::Call> for messages::SettlementCall {
    type Error = ConversionError;

    fn try_from(call: settlement_request::Call) -> Result<Self, Self::Error> {
        use messages::SettlementCall as C;
        use settlement_request::Call;

        Ok(match call {
            Call::AliceFund(m) => C::AliceFund {
                ingrid: address_from_bytes(m.ingrid)?,
                watchtowers: m
                    .watchtowers
                    .into_iter()
                    .map(address_from_bytes)
                    .collect::<Result<Vec<_>, _>>()?,
                value: u256_from_bytes(&m.value)?,
            },
            Call::FundIngrid(m) => C::FundIngrid {
                value: u256_from_bytes(&m.value)?,
            },
            Call::FundWatchtower(m) => C::FundWatchtower {
                idx: idx_from_u64(m.idx)?,
                value: u256_from_bytes(&m.value)?,
            },
            Call::Open(_) => C::Open,
            Call::OptimisticAliceClose(m) => C::OptimisticAliceClose {
                alice_value: u256_from_bytes(&m.alice_value)?,
            },
            Call::OptimisticIngridClose(_) => C::OptimisticIngridClose,
            Call::WatchtowerClaimState(m) => C::WatchtowerClaimState {
                claim: m.claim.ok_or(ConversionError::ExpectedSome)?.try_into()?,
                idx: idx_from_u64(m.idx)?,
            },
            Call::PessimisticClose(m) => C::PessimisticClose {
                state: m.state.ok_or(ConversionError::ExpectedSome)?.try_into()?,
                counterparty_sig: signature_from_bytes(m.counterparty_sig)?,
                aggregate: m
                    .aggregate
                    .into_iter()
                    .map(messages::SignedChannelState::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            },
            Call::VirtualChannelRegister(m) => C::VirtualChannelRegister(m.try_into()?),
            Call::VirtualWatchtowerClaimState(m) => C::VirtualWatchtowerClaimState {
                claim: m.claim.ok_or(ConversionError::ExpectedSome)?.try_into()?,
                idx: idx_from_u64(m.idx)?,
            },
            Call::PessimisticVirtualChannelClose(_) => C::PessimisticVirtualChannelClose,
            Call::FinalClose(_) => C::FinalClose,
        })
    }
}

impl From<messages::SettlementRequest> for SettlementRequest {
    fn from(req: messages::SettlementRequest) -> Self {
        Self {
            contract: req.contract.0.to_vec(),
            from: req.from.0.to_vec(),
            call: Some(req.call.into()),
        }
    }
}

impl TryFrom<SettlementRequest> for messages::SettlementRequest {
    type Error = ConversionError;

    fn try_from(req: SettlementRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            contract: address_from_bytes(req.contract)?,
            from: address_from_bytes(req.from)?,
            call: req.call.ok_or(ConversionError::ExpectedSome)?.try_into()?,
        })
    }
}
