//! Lifecycle of a channel between Alice and Ingrid, guarded by a committee of
//! watchtowers.
//!
//! ```text
//! Funding --open--> Open --alice+ingrid close--> OptimisticClosed
//!                    |
//!                    +--watchtower claim--> PessimisticClosing --t claims, close--> Closed
//!                    |
//!                    +--register virtual--> (nested virtual channel) --FinalClose--> Closed
//! ```
//!
//! [Channel] mirrors what the settlement contract enforces. Every transition
//! checks the phase, the caller and all signatures before touching any state,
//! so a rejected transition leaves the channel exactly as it was.

mod funding;
mod virtual_channel;


use alloc::vec::Vec;
use core::fmt::Display;

use crate::{
    abiencode::{
        self,
        types::{Address, Signature, U256},
    },
    messages::{
        SettlementCall, SettlementRequest, SignedChannelState, VirtualChannelRegistration,
        WatchtowerRevisionClaim, WatchtowerVirtualClaim,
    },
    quorum::{ClaimError, ClaimOutcome, ClaimTally, Quorum, QuorumError, WatchtowerIdx},
    state::{verify_payload, ChannelState, ChannelStateClaim, RevisionClaim, StateError},
};

pub use funding::{FundingConfig, FundingError};
pub use virtual_channel::{RegisteringParties, VirtualChannel, VirtualPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Funding,
    Open,
    OptimisticClosed,
    PessimisticClosing,
    Closed,
}

impl Phase {
    /// No transition leaves a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::OptimisticClosed | Phase::Closed)
    }
}

/// Role of a signer or caller, used to say whose signature failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Alice,
    Ingrid,
    Bob,
    Watchtower(WatchtowerIdx),
}

/// Final split of the channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub alice: U256,
    pub ingrid: U256,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TransitionError {
    WrongPhase(Phase),
    /// The caller is not allowed to make this call.
    Unauthorized(Address),
    Funding(FundingError),
    Quorum(QuorumError),
    Claim(ClaimError),
    InvalidState(StateError),
    AbiEncodeError(abiencode::Error),
    /// Open requires Ingrid's and every watchtower's funding.
    NotFullyFunded { missing_watchtowers: usize, ingrid: bool },
    /// A signature does not belong to the expected party.
    InvalidSignature(Party),
    /// Signatures that must cover the identical payload do not.
    SignatureMismatch(Party),
    /// The state carries a lower revision than one already claimed.
    StaleState { claimed: u16, required: u16 },
    QuorumNotReached { count: usize, threshold: usize },
    /// The state's (virtual) channel value differs from the funded one.
    ValueMismatch,
    ContractMismatch(Address),
    InsufficientCollateral(Party),
    NoVirtualChannel,
    VirtualChannelExists,
    VirtualChannelSettled,
    /// `FinalClose` was issued before the virtual channel was settled.
    VirtualChannelNotSettled,
}

impl From<FundingError> for TransitionError {
    fn from(e: FundingError) -> Self {
        Self::Funding(e)
    }
}
impl From<QuorumError> for TransitionError {
    fn from(e: QuorumError) -> Self {
        Self::Quorum(e)
    }
}
impl From<ClaimError> for TransitionError {
    fn from(e: ClaimError) -> Self {
        Self::Claim(e)
    }
}
impl From<StateError> for TransitionError {
    fn from(e: StateError) -> Self {
        Self::InvalidState(e)
    }
}
impl From<abiencode::Error> for TransitionError {
    fn from(e: abiencode::Error) -> Self {
        Self::AbiEncodeError(e)
    }
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransitionError::WrongPhase(p) => write!(f, "not allowed in phase {:?}", p),
            TransitionError::Unauthorized(a) => write!(f, "{:?} may not make this call", a),
            TransitionError::Funding(e) => write!(f, "funding rejected: {:?}", e),
            TransitionError::Quorum(e) => write!(f, "{}", e),
            TransitionError::Claim(e) => write!(f, "{}", e),
            TransitionError::InvalidState(e) => write!(f, "{}", e),
            TransitionError::AbiEncodeError(e) => write!(f, "{}", e),
            TransitionError::NotFullyFunded {
                missing_watchtowers,
                ingrid,
            } => write!(
                f,
                "not fully funded: {} watchtowers missing, ingrid funded: {}",
                missing_watchtowers, ingrid
            ),
            TransitionError::InvalidSignature(p) => write!(f, "invalid signature of {:?}", p),
            TransitionError::SignatureMismatch(p) => {
                write!(f, "signature of {:?} is over a different payload", p)
            }
            TransitionError::StaleState { claimed, required } => write!(
                f,
                "state revision {} is below required revision {}",
                claimed, required
            ),
            TransitionError::QuorumNotReached { count, threshold } => {
                write!(f, "{} of {} required claims", count, threshold)
            }
            TransitionError::ValueMismatch => f.write_str("channel value does not match"),
            TransitionError::ContractMismatch(a) => write!(f, "unexpected contract {:?}", a),
            TransitionError::InsufficientCollateral(p) => {
                write!(f, "collateral of {:?} does not cover the virtual channel", p)
            }
            TransitionError::NoVirtualChannel => f.write_str("no virtual channel registered"),
            TransitionError::VirtualChannelExists => {
                f.write_str("a virtual channel is already registered")
            }
            TransitionError::VirtualChannelSettled => {
                f.write_str("virtual channel is already settled")
            }
            TransitionError::VirtualChannelNotSettled => {
                f.write_str("virtual channel must be settled before the final close")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct OptimisticClose {
    alice_value: Option<U256>,
    ingrid_agreed: bool,
}

#[derive(Debug, Clone)]
pub struct Channel {
    address: Address,
    alice: Address,
    ingrid: Address,
    watchtowers: Vec<Address>,
    phase: Phase,
    funding: funding::Funding,
    optimistic: OptimisticClose,
    tally: ClaimTally,
    virtual_channel: Option<VirtualChannel>,
    settlement: Option<Settlement>,
}

impl Channel {
    /// Alice deploys the channel at `address` and funds it, fixing Ingrid and
    /// the watchtower committee (index = position in `watchtowers`).
    pub fn alice_fund(
        address: Address,
        alice: Address,
        ingrid: Address,
        watchtowers: Vec<Address>,
        value: U256,
        config: FundingConfig,
    ) -> Result<Self, TransitionError> {
        let quorum = Quorum::new(watchtowers.len())?;
        let funding = funding::Funding::new(config, watchtowers.len(), value)?;
        log::info!(
            "channel {:?}: funded by alice, committee of {} (f={}, t={})",
            address,
            quorum.committee_size(),
            quorum.max_faulty(),
            quorum.threshold()
        );
        Ok(Channel {
            address,
            alice,
            ingrid,
            watchtowers,
            phase: Phase::Funding,
            funding,
            optimistic: OptimisticClose::default(),
            tally: ClaimTally::new(quorum),
            virtual_channel: None,
            settlement: None,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }
    pub fn alice(&self) -> Address {
        self.alice
    }
    pub fn ingrid(&self) -> Address {
        self.ingrid
    }
    pub fn watchtowers(&self) -> &[Address] {
        &self.watchtowers
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn quorum(&self) -> Quorum {
        self.tally.quorum()
    }
    pub fn claims(&self) -> &ClaimTally {
        &self.tally
    }
    pub fn virtual_channel(&self) -> Option<&VirtualChannel> {
        self.virtual_channel.as_ref()
    }
    pub fn settlement(&self) -> Option<Settlement> {
        self.settlement
    }
    pub fn alice_collateral(&self) -> U256 {
        self.funding.alice_collateral
    }
    pub fn ingrid_collateral(&self) -> U256 {
        self.funding.ingrid_collateral()
    }

    /// Value every [ChannelState] of this channel has to carry.
    pub fn channel_value(&self) -> U256 {
        self.funding.channel_value()
    }

    fn expect_phase(&self, allowed: &[Phase]) -> Result<(), TransitionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(TransitionError::WrongPhase(self.phase))
        }
    }

    fn expect_caller(&self, from: Address, expected: Address) -> Result<(), TransitionError> {
        if from == expected {
            Ok(())
        } else {
            Err(TransitionError::Unauthorized(from))
        }
    }

    fn expect_watchtower(&self, from: Address, idx: WatchtowerIdx) -> Result<(), TransitionError> {
        match self.watchtowers.get(idx) {
            Some(addr) if *addr == from => Ok(()),
            Some(_) => Err(TransitionError::Unauthorized(from)),
            None => Err(ClaimError::IndexOutOfRange {
                index: idx,
                committee_size: self.watchtowers.len(),
            }
            .into()),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        log::info!("channel {:?}: {:?} -> {:?}", self.address, self.phase, phase);
        self.phase = phase;
    }

    /// Dispatch a request made to this channel's contract.
    ///
    /// [SettlementCall::AliceFund] deploys a new channel and is only accepted
    /// through [Channel::alice_fund].
    pub fn apply(&mut self, req: &SettlementRequest) -> Result<(), TransitionError> {
        if req.contract != self.address {
            return Err(TransitionError::ContractMismatch(req.contract));
        }
        let from = req.from;
        match &req.call {
            SettlementCall::AliceFund { .. } => Err(TransitionError::WrongPhase(self.phase)),
            SettlementCall::FundIngrid { value } => self.fund_ingrid(from, *value),
            SettlementCall::FundWatchtower { idx, value } => {
                self.fund_watchtower(*idx, from, *value)
            }
            SettlementCall::Open => self.open(),
            SettlementCall::OptimisticAliceClose { alice_value } => {
                self.optimistic_alice_close(from, *alice_value)
            }
            SettlementCall::OptimisticIngridClose => self.optimistic_ingrid_close(from),
            SettlementCall::WatchtowerClaimState { claim, idx } => {
                self.watchtower_claim_state(claim, *idx, from).map(|_| ())
            }
            SettlementCall::PessimisticClose {
                state,
                counterparty_sig,
                aggregate,
            } => self
                .pessimistic_close(from, *state, *counterparty_sig, aggregate)
                .map(|_| ()),
            SettlementCall::VirtualChannelRegister(reg) => {
                self.register_virtual_channel(from, reg)
            }
            SettlementCall::VirtualWatchtowerClaimState { claim, idx } => self
                .virtual_watchtower_claim_state(claim, *idx, from)
                .map(|_| ()),
            SettlementCall::PessimisticVirtualChannelClose => {
                self.pessimistic_virtual_channel_close(from)
            }
            SettlementCall::FinalClose => self.final_close(from).map(|_| ()),
        }
    }

    pub fn fund_ingrid(&mut self, from: Address, value: U256) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Funding])?;
        self.expect_caller(from, self.ingrid)?;
        self.funding.fund_ingrid(value)?;
        log::debug!("channel {:?}: funded by ingrid", self.address);
        Ok(())
    }

    pub fn fund_watchtower(
        &mut self,
        idx: WatchtowerIdx,
        from: Address,
        value: U256,
    ) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Funding])?;
        self.expect_watchtower(from, idx)?;
        self.funding.fund_watchtower(idx, value)?;
        log::debug!("channel {:?}: funded by watchtower {}", self.address, idx);
        Ok(())
    }

    /// Explicit transition to [Phase::Open], never implied by the last
    /// funding.
    pub fn open(&mut self) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Funding])?;
        if !self.funding.is_complete() {
            return Err(TransitionError::NotFullyFunded {
                missing_watchtowers: self.funding.missing_watchtowers(),
                ingrid: self.funding.ingrid_collateral.is_some(),
            });
        }
        self.set_phase(Phase::Open);
        Ok(())
    }

    /// Alice's half of the cooperative close, proposing her final balance.
    pub fn optimistic_alice_close(
        &mut self,
        from: Address,
        alice_value: U256,
    ) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Open])?;
        self.expect_caller(from, self.alice)?;
        if self.virtual_channel.is_some() {
            return Err(TransitionError::VirtualChannelExists);
        }
        if alice_value > self.channel_value() {
            return Err(StateError::BalanceExceedsChannel.into());
        }
        self.optimistic.alice_value = Some(alice_value);
        self.try_finish_optimistic_close();
        Ok(())
    }

    /// Ingrid's half of the cooperative close.
    pub fn optimistic_ingrid_close(&mut self, from: Address) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Open])?;
        self.expect_caller(from, self.ingrid)?;
        if self.virtual_channel.is_some() {
            return Err(TransitionError::VirtualChannelExists);
        }
        self.optimistic.ingrid_agreed = true;
        self.try_finish_optimistic_close();
        Ok(())
    }

    fn try_finish_optimistic_close(&mut self) {
        if let (Some(alice), true) = (self.optimistic.alice_value, self.optimistic.ingrid_agreed) {
            self.settlement = Some(Settlement {
                alice,
                ingrid: self.channel_value() - alice,
            });
            self.set_phase(Phase::OptimisticClosed);
        }
    }

    /// Watchtower `idx` submits the revision claim it holds.
    ///
    /// Both Alice's and Ingrid's signatures over `(address, auto_increment)`
    /// are checked. The first counted claim starts the pessimistic close, a
    /// repeated claim of the same index returns [ClaimOutcome::Duplicate].
    pub fn watchtower_claim_state(
        &mut self,
        claim: &WatchtowerRevisionClaim,
        idx: WatchtowerIdx,
        from: Address,
    ) -> Result<ClaimOutcome, TransitionError> {
        self.expect_phase(&[Phase::Open, Phase::PessimisticClosing])?;
        self.expect_watchtower(from, idx)?;

        let payload = RevisionClaim {
            contract: self.address,
            auto_increment: claim.auto_increment,
        };
        for (party, addr, sig) in [
            (Party::Alice, self.alice, claim.alice_sig),
            (Party::Ingrid, self.ingrid, claim.ingrid_sig),
        ] {
            if verify_payload(&payload, sig, addr).is_err() {
                log::warn!(
                    "channel {:?}: claim of watchtower {} has invalid {:?} signature",
                    self.address,
                    idx,
                    party
                );
                return Err(TransitionError::InvalidSignature(party));
            }
        }

        let outcome = self.tally.record(idx, claim.auto_increment)?;
        log::debug!(
            "channel {:?}: watchtower {} claimed revision {}: {:?}",
            self.address,
            idx,
            claim.auto_increment,
            outcome
        );
        if self.phase == Phase::Open {
            self.set_phase(Phase::PessimisticClosing);
        }
        Ok(outcome)
    }

    /// Terminal pessimistic close once `t` watchtowers claimed.
    ///
    /// The closing state is the highest revision among `state` (signed by the
    /// counterparty with `counterparty_sig`) and the counterparty-signed states
    /// in `aggregate`. On equal revisions the caller's `state` wins. The
    /// chosen state must not be older than the highest claimed revision.
    pub fn pessimistic_close(
        &mut self,
        from: Address,
        state: ChannelState,
        counterparty_sig: Signature,
        aggregate: &[SignedChannelState],
    ) -> Result<Settlement, TransitionError> {
        self.expect_phase(&[Phase::PessimisticClosing])?;
        let (counterparty, counterparty_addr) = if from == self.alice {
            (Party::Ingrid, self.ingrid)
        } else if from == self.ingrid {
            (Party::Alice, self.alice)
        } else {
            return Err(TransitionError::Unauthorized(from));
        };
        if !self.tally.is_reached() {
            return Err(TransitionError::QuorumNotReached {
                count: self.tally.count(),
                threshold: self.quorum().threshold(),
            });
        }

        self.check_state(&state)?;
        verify_payload(
            &ChannelStateClaim {
                contract: self.address,
                state,
            },
            counterparty_sig,
            counterparty_addr,
        )
        .map_err(|_| TransitionError::InvalidSignature(counterparty))?;

        let mut best = state;
        for signed in aggregate {
            if signed.payload.contract != self.address {
                return Err(TransitionError::ContractMismatch(signed.payload.contract));
            }
            self.check_state(&signed.payload.state)?;
            signed
                .verify(counterparty_addr)
                .map_err(|_| TransitionError::InvalidSignature(counterparty))?;
            if signed.payload.state.auto_increment > best.auto_increment {
                best = signed.payload.state;
            }
        }

        let required = self.tally.max_revision().unwrap_or(0);
        if best.auto_increment < required {
            return Err(TransitionError::StaleState {
                claimed: best.auto_increment,
                required,
            });
        }

        let settlement = Settlement {
            alice: best.alice_value,
            ingrid: best.ingrid_value(),
        };
        self.settlement = Some(settlement);
        self.set_phase(Phase::Closed);
        Ok(settlement)
    }

    fn check_state(&self, state: &ChannelState) -> Result<(), TransitionError> {
        state.validate()?;
        if state.channel_value != self.channel_value() {
            return Err(TransitionError::ValueMismatch);
        }
        Ok(())
    }

    /// Register a virtual channel on this (Alice's) channel. Submitted by
    /// Ingrid, signed by Alice, Bob and Ingrid.
    pub fn register_virtual_channel(
        &mut self,
        from: Address,
        reg: &VirtualChannelRegistration,
    ) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Open])?;
        if from != self.ingrid && from != self.alice {
            return Err(TransitionError::Unauthorized(from));
        }
        if self.virtual_channel.is_some() {
            return Err(TransitionError::VirtualChannelExists);
        }
        if reg.alice_contract != self.address {
            return Err(TransitionError::ContractMismatch(reg.alice_contract));
        }
        if reg.alice != self.alice {
            return Err(TransitionError::Unauthorized(reg.alice));
        }
        if reg.ingrid != self.ingrid {
            return Err(TransitionError::Unauthorized(reg.ingrid));
        }

        let vc = VirtualChannel::register(reg, self.quorum())?;
        if vc.alice_lock() > self.alice_collateral() {
            return Err(TransitionError::InsufficientCollateral(Party::Alice));
        }
        if vc.ingrid_lock() > self.ingrid_collateral() {
            return Err(TransitionError::InsufficientCollateral(Party::Ingrid));
        }
        log::info!(
            "channel {:?}: virtual channel to {:?} via {:?} registered",
            self.address,
            reg.bob,
            reg.bob_contract
        );
        self.virtual_channel = Some(vc);
        Ok(())
    }

    pub fn virtual_watchtower_claim_state(
        &mut self,
        claim: &WatchtowerVirtualClaim,
        idx: WatchtowerIdx,
        from: Address,
    ) -> Result<ClaimOutcome, TransitionError> {
        self.expect_phase(&[Phase::Open])?;
        self.expect_watchtower(from, idx)?;
        let address = self.address;
        let vc = self
            .virtual_channel
            .as_mut()
            .ok_or(TransitionError::NoVirtualChannel)?;
        let outcome = vc.claim(claim, idx)?;
        log::debug!(
            "channel {:?}: watchtower {} claimed virtual revision {}: {:?}",
            address,
            idx,
            claim.state.auto_increment,
            outcome
        );
        Ok(outcome)
    }

    /// Settle the virtual layer. First half of the two-phase virtual close.
    pub fn pessimistic_virtual_channel_close(
        &mut self,
        from: Address,
    ) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Open])?;
        let vc = self
            .virtual_channel
            .as_mut()
            .ok_or(TransitionError::NoVirtualChannel)?;
        let parties = vc.parties();
        if from != parties.alice && from != parties.ingrid && from != parties.bob {
            return Err(TransitionError::Unauthorized(from));
        }
        let settled = vc.settle()?;
        log::info!(
            "channel {:?}: virtual channel settled at revision {}",
            self.address,
            settled.auto_increment
        );
        Ok(())
    }

    /// Close this channel after its virtual channel was settled. Alice keeps
    /// her collateral minus what she locked plus what the virtual channel
    /// settled to her.
    pub fn final_close(&mut self, from: Address) -> Result<Settlement, TransitionError> {
        self.expect_phase(&[Phase::Open])?;
        if from != self.alice && from != self.ingrid {
            return Err(TransitionError::Unauthorized(from));
        }
        let vc = self
            .virtual_channel
            .as_ref()
            .ok_or(TransitionError::NoVirtualChannel)?;
        if vc.phase() != VirtualPhase::Settled {
            return Err(TransitionError::VirtualChannelNotSettled);
        }

        let alice = self.alice_collateral() - vc.alice_lock() + vc.latest_state().alice_value;
        let settlement = Settlement {
            alice,
            ingrid: self.channel_value() - alice,
        };
        self.settlement = Some(settlement);
        self.set_phase(Phase::Closed);
        Ok(settlement)
    }
}
