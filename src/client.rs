use alloc::vec::Vec;

use crate::{
    abiencode::types::{Address, Signature, U256},
    messages::{
        SettlementCall, SettlementRequest, SignedChannelState, SignedVirtualChannelState,
        WatchtowerMessage, WatchtowerRevisionClaim, WatchtowerVirtualClaim,
    },
    sig::Signer,
    state::{self, ChannelState, RevisionClaim, SignError, SignedMessage, VirtualChannelState},
    wire::MessageBus,
};

/// Signing identity of one party together with the bus its messages leave
/// through.
///
/// Both are passed in, there is no global transport or key. An application
/// usually has exactly one [MessageBus] type, so the bus is a type parameter
/// instead of a trait object.
#[derive(Debug)]
pub struct ThunderdomeClient<B: MessageBus> {
    pub(crate) bus: B,
    pub(crate) signer: Signer,
}

impl<B: MessageBus> ThunderdomeClient<B> {
    pub fn new(bus: B, signer: Signer) -> Self {
        ThunderdomeClient { bus, signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn sign_state(
        &self,
        contract: Address,
        state: ChannelState,
    ) -> Result<SignedChannelState, SignError> {
        SignedMessage::sign_state(&self.signer, contract, state)
    }

    pub fn sign_virtual_state(
        &self,
        contract: Address,
        state: VirtualChannelState,
    ) -> Result<SignedVirtualChannelState, SignError> {
        SignedMessage::sign_virtual_state(&self.signer, contract, state)
    }

    pub fn sign_auto_increment(
        &self,
        contract: Address,
        auto_increment: u16,
    ) -> Result<SignedMessage<RevisionClaim>, SignError> {
        SignedMessage::sign_auto_increment(&self.signer, contract, auto_increment)
    }

    pub fn sign_value(&self, contract: Address, value: U256) -> Result<Signature, SignError> {
        state::sign_value(&self.signer, contract, value)
    }

    /// Hand the same revision claim to every watchtower `0..committee_size`
    /// of the channel at `contract`.
    pub fn hand_claim_to_watchtowers(
        &self,
        contract: Address,
        committee_size: usize,
        claim: WatchtowerRevisionClaim,
    ) {
        self.broadcast(committee_size, WatchtowerMessage::Revision { contract, claim });
    }

    /// Like [ThunderdomeClient::hand_claim_to_watchtowers], for a virtual
    /// channel anchored in the channel at `contract`.
    pub fn hand_virtual_claim_to_watchtowers(
        &self,
        contract: Address,
        committee_size: usize,
        claim: WatchtowerVirtualClaim,
    ) {
        self.broadcast(committee_size, WatchtowerMessage::Virtual { contract, claim });
    }

    fn broadcast(&self, committee_size: usize, msg: WatchtowerMessage) {
        log::debug!(
            "{:?}: handing revision {} of {:?} to {} watchtowers",
            self.address(),
            msg.revision(),
            msg.contract(),
            committee_size
        );
        for idx in 0..committee_size {
            self.bus.send_to_watchtower(idx, msg);
        }
    }

    /// Send `call` to the contract at `contract`, made by this client.
    pub fn submit(&self, contract: Address, call: SettlementCall) {
        self.bus.submit(SettlementRequest {
            contract,
            from: self.address(),
            call,
        });
    }

    /// Fund a new channel at `contract` as Alice.
    pub fn alice_fund(
        &self,
        contract: Address,
        ingrid: Address,
        watchtowers: Vec<Address>,
        value: U256,
    ) {
        self.submit(
            contract,
            SettlementCall::AliceFund {
                ingrid,
                watchtowers,
                value,
            },
        );
    }

    /// Close pessimistically with our latest `state`, countersigned by the
    /// other party, and what the watchtowers forwarded.
    pub fn pessimistic_close(
        &self,
        contract: Address,
        state: ChannelState,
        counterparty_sig: Signature,
        aggregate: Vec<SignedChannelState>,
    ) {
        self.submit(
            contract,
            SettlementCall::PessimisticClose {
                state,
                counterparty_sig,
                aggregate,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{Channel, FundingConfig, Phase},
        watchtower::Watchtower,
        wire::tests::RecordingBus,
    };
    use alloc::vec;

    fn key(hex_key: &str) -> Signer {
        let bytes: [u8; 32] = hex::decode(hex_key).unwrap().try_into().unwrap();
        Signer::from_private_key(&bytes).unwrap()
    }

    fn contract() -> Address {
        Address::from_hex_str("abcdef0123456789abcdef0123456789abcdef01").unwrap()
    }

    fn client(hex_key: &str) -> ThunderdomeClient<RecordingBus> {
        ThunderdomeClient::new(RecordingBus::default(), key(hex_key))
    }

    fn wt_addr(i: u8) -> Address {
        let mut a = [0u8; 20];
        a[0] = 0xaa;
        a[19] = i;
        Address(a)
    }

    #[test]
    fn claims_reach_every_watchtower_and_close_the_channel() {
        let _ = env_logger::builder().is_test(true).try_init();
        let alice =
            client("cf163df783185ed9862902d89aaaee849004f5f79eb2b05f509046fcc27f48fb");
        let ingrid =
            client("f42e9d405dda9c048aeee66b5bd25b94c927004cb2fb2a8da74f3bd379b6bac4");
        let n = 4;
        let watchtowers: Vec<Address> = (0..n as u8).map(wt_addr).collect();

        alice.alice_fund(contract(), ingrid.address(), watchtowers.clone(), 110.into());
        let mut channel = match &alice.bus().submitted()[0].call {
            SettlementCall::AliceFund {
                ingrid: i,
                watchtowers,
                value,
            } => Channel::alice_fund(
                contract(),
                alice.address(),
                *i,
                watchtowers.clone(),
                *value,
                FundingConfig::default(),
            )
            .unwrap(),
            other => panic!("unexpected call {:?}", other),
        };

        ingrid.submit(contract(), SettlementCall::FundIngrid { value: 110.into() });
        for req in ingrid.bus().submitted() {
            channel.apply(&req).unwrap();
        }
        for (idx, addr) in watchtowers.iter().enumerate() {
            channel.fund_watchtower(idx, *addr, 50.into()).unwrap();
        }
        channel.open().unwrap();

        // Both sign revision 2, Alice hands the claim to the committee.
        let claim = WatchtowerRevisionClaim {
            auto_increment: 2,
            alice_sig: alice.sign_auto_increment(contract(), 2).unwrap().signature,
            ingrid_sig: ingrid.sign_auto_increment(contract(), 2).unwrap().signature,
        };
        alice.hand_claim_to_watchtowers(contract(), n, claim);
        let sent = alice.bus().sent_to_watchtowers();
        assert_eq!(sent.len(), n);

        let wt_bus = RecordingBus::default();
        for (idx, msg) in sent {
            let mut wt = Watchtower::new(watchtowers[idx]);
            assert!(wt.receive(idx, msg));
            wt.submit_claims(&wt_bus, contract());
        }
        for req in wt_bus.submitted() {
            channel.apply(&req).unwrap();
        }
        assert!(channel.claims().is_reached());

        let state = ChannelState {
            alice_value: 150.into(),
            channel_value: channel.channel_value(),
            auto_increment: 2,
        };
        let ingrid_signed = ingrid.sign_state(contract(), state).unwrap();
        alice.pessimistic_close(contract(), state, ingrid_signed.signature, vec![]);
        let close = alice.bus().submitted().pop().unwrap();
        channel.apply(&close).unwrap();
        assert_eq!(channel.phase(), Phase::Closed);
        assert_eq!(channel.settlement().unwrap().ingrid, U256::from(50));
    }

    #[test]
    fn value_signature_recovers_to_client() {
        let alice =
            client("cf163df783185ed9862902d89aaaee849004f5f79eb2b05f509046fcc27f48fb");
        let sig = alice.sign_value(contract(), 5.into()).unwrap();
        crate::state::verify_payload(
            &crate::state::ValueClaim {
                contract: contract(),
                value: 5.into(),
            },
            sig,
            alice.address(),
        )
        .unwrap();
    }
}
