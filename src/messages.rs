//! Messages leaving a party: requests for the settlement contract and claims
//! handed to watchtowers.
//!
//! Requests are fire-and-forget. Whether one was accepted is only observable
//! through the resulting phase change of the channel.

use alloc::vec::Vec;

use crate::{
    abiencode::types::{Address, Signature, U256},
    quorum::WatchtowerIdx,
    state::{
        ChannelState, ChannelStateClaim, SignedMessage, VirtualChannelState,
        VirtualChannelStateClaim,
    },
};

/// Revision claim held by watchtowers: Alice and Ingrid both signed
/// `(contract, auto_increment)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchtowerRevisionClaim {
    pub auto_increment: u16,
    pub alice_sig: Signature,
    pub ingrid_sig: Signature,
}

/// Virtual channel state claim: Alice and Bob both signed
/// `(alice_contract, state)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchtowerVirtualClaim {
    pub state: VirtualChannelState,
    pub alice_sig: Signature,
    pub bob_sig: Signature,
}

/// Binds a virtual channel between Alice and Bob to their channels with
/// Ingrid. All three parties sign `(alice_contract, open_state)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualChannelRegistration {
    pub alice: Address,
    pub bob: Address,
    pub ingrid: Address,
    pub alice_contract: Address,
    pub bob_contract: Address,
    pub open_state: VirtualChannelState,
    pub alice_sig: Signature,
    pub ingrid_sig: Signature,
    pub bob_sig: Signature,
}

pub type SignedChannelState = SignedMessage<ChannelStateClaim>;
pub type SignedVirtualChannelState = SignedMessage<VirtualChannelStateClaim>;

/// A call to the settlement contract at `contract`, made by `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub contract: Address,
    pub from: Address,
    pub call: SettlementCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementCall {
    AliceFund {
        ingrid: Address,
        watchtowers: Vec<Address>,
        value: U256,
    },
    FundIngrid {
        value: U256,
    },
    FundWatchtower {
        idx: WatchtowerIdx,
        value: U256,
    },
    Open,
    OptimisticAliceClose {
        alice_value: U256,
    },
    OptimisticIngridClose,
    WatchtowerClaimState {
        claim: WatchtowerRevisionClaim,
        idx: WatchtowerIdx,
    },
    PessimisticClose {
        state: ChannelState,
        counterparty_sig: Signature,
        aggregate: Vec<SignedChannelState>,
    },
    VirtualChannelRegister(VirtualChannelRegistration),
    VirtualWatchtowerClaimState {
        claim: WatchtowerVirtualClaim,
        idx: WatchtowerIdx,
    },
    PessimisticVirtualChannelClose,
    FinalClose,
}

/// Claims handed to watchtower `idx` of the channel at `contract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchtowerMessage {
    Revision {
        contract: Address,
        claim: WatchtowerRevisionClaim,
    },
    Virtual {
        contract: Address,
        claim: WatchtowerVirtualClaim,
    },
}

impl WatchtowerMessage {
    pub fn contract(&self) -> Address {
        match self {
            WatchtowerMessage::Revision { contract, .. } => *contract,
            WatchtowerMessage::Virtual { contract, .. } => *contract,
        }
    }

    pub fn revision(&self) -> u16 {
        match self {
            WatchtowerMessage::Revision { claim, .. } => claim.auto_increment,
            WatchtowerMessage::Virtual { claim, .. } => claim.state.auto_increment,
        }
    }
}
