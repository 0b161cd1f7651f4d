//! Virtual channel between Alice and Bob, routed through Ingrid and anchored
//! in Alice's channel (the first underlying channel).

use crate::{
    abiencode::types::{Address, U256},
    messages::{VirtualChannelRegistration, WatchtowerVirtualClaim},
    quorum::{ClaimOutcome, ClaimTally, Quorum, WatchtowerIdx},
    state::{verify_payload, VirtualChannelState, VirtualChannelStateClaim},
};

use super::{Party, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualPhase {
    /// Registered, no watchtower claim yet.
    Registered,
    /// At least one watchtower claimed a virtual state.
    Claiming,
    /// `pessimisticVirtualChannelClose` went through, the underlying channel
    /// may now be closed with `FinalClose`.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteringParties {
    pub alice: Address,
    pub bob: Address,
    pub ingrid: Address,
}

#[derive(Debug, Clone)]
pub struct VirtualChannel {
    parties: RegisteringParties,
    alice_contract: Address,
    bob_contract: Address,
    open_state: VirtualChannelState,
    latest: VirtualChannelState,
    tally: ClaimTally,
    phase: VirtualPhase,
}

impl VirtualChannel {
    /// Check the registration and its three signatures.
    ///
    /// All signatures must be over the identical encoding of
    /// `(alice_contract, open_state)`. A signature over anything else,
    /// including an `open_state` that differs in a single field, fails with
    /// [TransitionError::SignatureMismatch] naming the party.
    pub(super) fn register(
        reg: &VirtualChannelRegistration,
        quorum: Quorum,
    ) -> Result<Self, TransitionError> {
        reg.open_state.validate()?;
        if reg.alice_contract == reg.bob_contract {
            return Err(TransitionError::ContractMismatch(reg.bob_contract));
        }

        let payload = VirtualChannelStateClaim {
            contract: reg.alice_contract,
            state: reg.open_state,
        };
        for (party, addr, sig) in [
            (Party::Alice, reg.alice, reg.alice_sig),
            (Party::Bob, reg.bob, reg.bob_sig),
            (Party::Ingrid, reg.ingrid, reg.ingrid_sig),
        ] {
            if verify_payload(&payload, sig, addr).is_err() {
                log::warn!("virtual channel registration: {:?} signature mismatch", party);
                return Err(TransitionError::SignatureMismatch(party));
            }
        }

        Ok(VirtualChannel {
            parties: RegisteringParties {
                alice: reg.alice,
                bob: reg.bob,
                ingrid: reg.ingrid,
            },
            alice_contract: reg.alice_contract,
            bob_contract: reg.bob_contract,
            open_state: reg.open_state,
            latest: reg.open_state,
            tally: ClaimTally::new(quorum),
            phase: VirtualPhase::Registered,
        })
    }

    pub fn parties(&self) -> RegisteringParties {
        self.parties
    }

    pub fn alice_contract(&self) -> Address {
        self.alice_contract
    }

    pub fn bob_contract(&self) -> Address {
        self.bob_contract
    }

    pub fn open_state(&self) -> VirtualChannelState {
        self.open_state
    }

    /// Highest revision state seen so far (the open state until claimed).
    pub fn latest_state(&self) -> VirtualChannelState {
        self.latest
    }

    pub fn phase(&self) -> VirtualPhase {
        self.phase
    }

    pub fn claims(&self) -> &ClaimTally {
        &self.tally
    }

    /// Alice's part of the virtual channel, locked from her collateral.
    pub(super) fn alice_lock(&self) -> U256 {
        self.open_state.alice_value
    }

    /// Ingrid's part, mirroring what Bob locks in the second channel.
    pub(super) fn ingrid_lock(&self) -> U256 {
        self.open_state.bob_value()
    }

    pub(super) fn claim(
        &mut self,
        claim: &WatchtowerVirtualClaim,
        idx: WatchtowerIdx,
    ) -> Result<ClaimOutcome, TransitionError> {
        if self.phase == VirtualPhase::Settled {
            return Err(TransitionError::VirtualChannelSettled);
        }
        claim.state.validate()?;
        if claim.state.vchannel_value != self.open_state.vchannel_value {
            return Err(TransitionError::ValueMismatch);
        }
        if claim.state.auto_increment < self.open_state.auto_increment {
            return Err(TransitionError::StaleState {
                claimed: claim.state.auto_increment,
                required: self.open_state.auto_increment,
            });
        }

        let payload = VirtualChannelStateClaim {
            contract: self.alice_contract,
            state: claim.state,
        };
        verify_payload(&payload, claim.alice_sig, self.parties.alice)
            .map_err(|_| TransitionError::InvalidSignature(Party::Alice))?;
        verify_payload(&payload, claim.bob_sig, self.parties.bob)
            .map_err(|_| TransitionError::InvalidSignature(Party::Bob))?;

        let outcome = self.tally.record(idx, claim.state.auto_increment)?;
        if let ClaimOutcome::Counted { .. } = outcome {
            if claim.state.auto_increment > self.latest.auto_increment {
                self.latest = claim.state;
            }
            self.phase = VirtualPhase::Claiming;
        }
        Ok(outcome)
    }

    pub(super) fn settle(&mut self) -> Result<VirtualChannelState, TransitionError> {
        match self.phase {
            VirtualPhase::Settled => return Err(TransitionError::VirtualChannelSettled),
            _ if !self.tally.is_reached() => {
                return Err(TransitionError::QuorumNotReached {
                    count: self.tally.count(),
                    threshold: self.tally.quorum().threshold(),
                })
            }
            _ => {}
        }
        self.phase = VirtualPhase::Settled;
        Ok(self.latest)
    }
}
