//! Watchtower relay.
//!
//! A watchtower holds the best claim it was handed for each channel it
//! guards and turns it into a request for the settlement contract when asked
//! to. Watchtowers never talk to each other, the contract counts their
//! claims independently.

use alloc::collections::BTreeMap;

use crate::{
    abiencode::types::Address,
    messages::{
        SettlementCall, SettlementRequest, WatchtowerMessage, WatchtowerRevisionClaim,
        WatchtowerVirtualClaim,
    },
    quorum::WatchtowerIdx,
    wire::MessageBus,
};

/// What a watchtower holds for one channel.
#[derive(Debug, Clone, Copy, Default)]
struct Held {
    revision: Option<(WatchtowerIdx, WatchtowerRevisionClaim)>,
    virtual_claim: Option<(WatchtowerIdx, WatchtowerVirtualClaim)>,
}

#[derive(Debug, Clone)]
pub struct Watchtower {
    address: Address,
    channels: BTreeMap<Address, Held>,
}

impl Watchtower {
    pub fn new(address: Address) -> Self {
        Watchtower {
            address,
            channels: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Store a claim handed over as watchtower `idx` of `msg.contract()`.
    ///
    /// Only a strictly higher revision replaces the claim held so far.
    /// Returns whether `msg` was kept.
    pub fn receive(&mut self, idx: WatchtowerIdx, msg: WatchtowerMessage) -> bool {
        let contract = msg.contract();
        let held = self.channels.entry(contract).or_default();
        let kept = match msg {
            WatchtowerMessage::Revision { claim, .. } => keep_newer(
                &mut held.revision,
                idx,
                claim,
                claim.auto_increment,
                |c| c.auto_increment,
            ),
            WatchtowerMessage::Virtual { claim, .. } => keep_newer(
                &mut held.virtual_claim,
                idx,
                claim,
                claim.state.auto_increment,
                |c| c.state.auto_increment,
            ),
        };
        if kept {
            log::debug!(
                "watchtower {:?}: holding revision {} for {:?}",
                self.address,
                msg.revision(),
                contract
            );
        }
        kept
    }

    /// Latest revision held for the channel at `contract`.
    pub fn revision_claim(&self, contract: Address) -> Option<WatchtowerRevisionClaim> {
        self.channels
            .get(&contract)
            .and_then(|h| h.revision)
            .map(|(_, claim)| claim)
    }

    pub fn virtual_claim(&self, contract: Address) -> Option<WatchtowerVirtualClaim> {
        self.channels
            .get(&contract)
            .and_then(|h| h.virtual_claim)
            .map(|(_, claim)| claim)
    }

    /// Request claiming the held revision on the channel at `contract`.
    pub fn claim_request(&self, contract: Address) -> Option<SettlementRequest> {
        let (idx, claim) = self.channels.get(&contract)?.revision?;
        Some(SettlementRequest {
            contract,
            from: self.address,
            call: SettlementCall::WatchtowerClaimState { claim, idx },
        })
    }

    /// Request claiming the held virtual state, submitted on Alice's channel.
    pub fn virtual_claim_request(&self, contract: Address) -> Option<SettlementRequest> {
        let (idx, claim) = self.channels.get(&contract)?.virtual_claim?;
        Some(SettlementRequest {
            contract,
            from: self.address,
            call: SettlementCall::VirtualWatchtowerClaimState { claim, idx },
        })
    }

    /// Submit every claim held for `contract`. Returns how many requests
    /// were sent.
    pub fn submit_claims<B: MessageBus>(&self, bus: &B, contract: Address) -> usize {
        let mut sent = 0;
        for req in [
            self.claim_request(contract),
            self.virtual_claim_request(contract),
        ]
        .into_iter()
        .flatten()
        {
            log::info!("watchtower {:?}: claiming on {:?}", self.address, contract);
            bus.submit(req);
            sent += 1;
        }
        sent
    }

    /// Drop everything held for `contract`, typically once its channel is
    /// closed. Returns whether anything was held.
    pub fn forget(&mut self, contract: Address) -> bool {
        let held = self.channels.remove(&contract).is_some();
        if held {
            log::debug!("watchtower {:?}: forgot {:?}", self.address, contract);
        }
        held
    }
}

fn keep_newer<C: Copy>(
    slot: &mut Option<(WatchtowerIdx, C)>,
    idx: WatchtowerIdx,
    claim: C,
    revision: u16,
    revision_of: impl Fn(&C) -> u16,
) -> bool {
    match slot {
        Some((_, held)) if revision_of(held) >= revision => false,
        _ => {
            *slot = Some((idx, claim));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        abiencode::types::Signature,
        state::VirtualChannelState,
        wire::tests::RecordingBus,
    };

    fn addr(last: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = last;
        Address(a)
    }

    fn revision(contract: Address, auto_increment: u16) -> WatchtowerMessage {
        WatchtowerMessage::Revision {
            contract,
            claim: WatchtowerRevisionClaim {
                auto_increment,
                alice_sig: Signature::default(),
                ingrid_sig: Signature::default(),
            },
        }
    }

    #[test]
    fn keeps_only_newer_revisions() {
        let mut wt = Watchtower::new(addr(1));
        let c = addr(9);
        assert!(wt.receive(3, revision(c, 2)));
        assert!(wt.receive(3, revision(c, 5)));
        assert!(!wt.receive(3, revision(c, 4)));
        assert!(!wt.receive(3, revision(c, 5)));
        assert_eq!(wt.revision_claim(c).map(|c| c.auto_increment), Some(5));
        assert!(wt.revision_claim(addr(8)).is_none());
    }

    #[test]
    fn produces_claim_requests_per_channel() {
        let mut wt = Watchtower::new(addr(1));
        let c = addr(9);
        assert!(wt.claim_request(c).is_none());

        wt.receive(3, revision(c, 2));
        let state = VirtualChannelState {
            alice_value: 1.into(),
            vchannel_value: 3.into(),
            auto_increment: 4,
        };
        wt.receive(
            3,
            WatchtowerMessage::Virtual {
                contract: c,
                claim: WatchtowerVirtualClaim {
                    state,
                    alice_sig: Signature::default(),
                    bob_sig: Signature::default(),
                },
            },
        );

        let req = wt.claim_request(c).unwrap();
        assert_eq!(req.contract, c);
        assert_eq!(req.from, addr(1));
        assert!(matches!(
            req.call,
            SettlementCall::WatchtowerClaimState { idx: 3, claim } if claim.auto_increment == 2
        ));

        let bus = RecordingBus::default();
        assert_eq!(wt.submit_claims(&bus, c), 2);
        assert_eq!(bus.submitted().len(), 2);
        assert_eq!(wt.submit_claims(&bus, addr(8)), 0);
    }

    #[test]
    fn forgets_closed_channels() {
        let mut wt = Watchtower::new(addr(1));
        let (closed, open) = (addr(9), addr(8));
        wt.receive(3, revision(closed, 5));
        wt.receive(0, revision(open, 1));

        assert!(wt.forget(closed));
        assert!(!wt.forget(closed));
        assert!(wt.revision_claim(closed).is_none());
        let bus = RecordingBus::default();
        assert_eq!(wt.submit_claims(&bus, closed), 0);
        assert_eq!(wt.revision_claim(open).map(|c| c.auto_increment), Some(1));

        // A forgotten channel starts over from any revision.
        assert!(wt.receive(3, revision(closed, 2)));
    }
}
