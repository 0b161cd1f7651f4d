//! The records that get signed, and the builders turning them into signatures.
//!
//! Every payload starts with the address of the channel contract the
//! signature is meant for, which binds the signature to exactly one channel
//! instance. The encoding of each payload is fixed, see
//! [crate::abiencode::schema] for the matching declarations.

use core::fmt::Display;

use serde::Serialize;

use crate::{
    abiencode::{
        self,
        types::{Address, Hash, Signature, U256},
    },
    sig::{self, Signer},
};

#[derive(Debug, PartialEq, Eq)]
pub enum StateError {
    /// `aliceValue` is larger than the value of the (virtual) channel.
    BalanceExceedsChannel,
}

impl Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StateError::BalanceExceedsChannel => {
                f.write_str("alice value exceeds the channel value")
            }
        }
    }
}

/// Balance split of a channel at revision `auto_increment`.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ChannelState {
    pub alice_value: U256,
    pub channel_value: U256,
    pub auto_increment: u16,
}

impl ChannelState {
    pub fn validate(&self) -> Result<(), StateError> {
        if self.alice_value > self.channel_value {
            Err(StateError::BalanceExceedsChannel)
        } else {
            Ok(())
        }
    }

    /// Ingrid's share of the channel value.
    pub fn ingrid_value(&self) -> U256 {
        self.channel_value.saturating_sub(self.alice_value)
    }
}

/// Balance split of a virtual channel routed through Ingrid.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct VirtualChannelState {
    pub alice_value: U256,
    pub vchannel_value: U256,
    pub auto_increment: u16,
}

impl VirtualChannelState {
    pub fn validate(&self) -> Result<(), StateError> {
        if self.alice_value > self.vchannel_value {
            Err(StateError::BalanceExceedsChannel)
        } else {
            Ok(())
        }
    }

    pub fn bob_value(&self) -> U256 {
        self.vchannel_value.saturating_sub(self.alice_value)
    }
}

/// Anything carrying a revision number that can be compared in a dispute.
pub trait Revisioned {
    fn revision(&self) -> u16;
}

impl Revisioned for ChannelState {
    fn revision(&self) -> u16 {
        self.auto_increment
    }
}

impl Revisioned for VirtualChannelState {
    fn revision(&self) -> u16 {
        self.auto_increment
    }
}

/// Whether `a` replaces `b`: only a strictly higher revision does.
pub fn supersedes<T: Revisioned>(a: &T, b: &T) -> bool {
    a.revision() > b.revision()
}

/// `address, ChannelState`
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelStateClaim {
    pub contract: Address,
    pub state: ChannelState,
}

/// `address, VirtualChannelState`
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct VirtualChannelStateClaim {
    pub contract: Address,
    pub state: VirtualChannelState,
}

/// `address, uint16`
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RevisionClaim {
    pub contract: Address,
    pub auto_increment: u16,
}

/// `address, uint256`
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ValueClaim {
    pub contract: Address,
    pub value: U256,
}

#[derive(Debug)]
pub enum SignError {
    AbiEncodeError(abiencode::Error),
    InvalidState(StateError),
    SigningFailed(sig::Error),
}
impl From<abiencode::Error> for SignError {
    fn from(e: abiencode::Error) -> Self {
        Self::AbiEncodeError(e)
    }
}
impl From<StateError> for SignError {
    fn from(e: StateError) -> Self {
        Self::InvalidState(e)
    }
}
impl From<sig::Error> for SignError {
    fn from(e: sig::Error) -> Self {
        Self::SigningFailed(e)
    }
}

impl Display for SignError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SignError::AbiEncodeError(e) => write!(f, "could not encode payload: {}", e),
            SignError::InvalidState(e) => write!(f, "refusing to sign invalid state: {}", e),
            SignError::SigningFailed(e) => write!(f, "signing failed: {}", e),
        }
    }
}

#[derive(Debug)]
pub enum VerifyError {
    AbiEncodeError(abiencode::Error),
    RecoveryFailed(sig::Error),
    /// The signature is valid, but for a different signer.
    WrongSigner { expected: Address, actual: Address },
}
impl From<abiencode::Error> for VerifyError {
    fn from(e: abiencode::Error) -> Self {
        Self::AbiEncodeError(e)
    }
}
impl From<sig::Error> for VerifyError {
    fn from(e: sig::Error) -> Self {
        Self::RecoveryFailed(e)
    }
}

impl Display for VerifyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            VerifyError::AbiEncodeError(e) => write!(f, "could not encode payload: {}", e),
            VerifyError::RecoveryFailed(e) => write!(f, "could not recover signer: {}", e),
            VerifyError::WrongSigner { expected, actual } => {
                write!(f, "signed by {:?} instead of {:?}", actual, expected)
            }
        }
    }
}

fn sign_payload<T: Serialize>(signer: &Signer, payload: &T) -> Result<Signature, SignError> {
    let hash = abiencode::to_hash(payload)?;
    Ok(signer.sign_eth(hash)?)
}

/// Sign `(contract, state)`.
pub fn sign_state(
    signer: &Signer,
    contract: Address,
    state: &ChannelState,
) -> Result<Signature, SignError> {
    state.validate()?;
    sign_payload(
        signer,
        &ChannelStateClaim {
            contract,
            state: *state,
        },
    )
}

/// Sign `(contract, vstate)`. For virtual channels `contract` is always the
/// first underlying channel.
pub fn sign_virtual_state(
    signer: &Signer,
    contract: Address,
    state: &VirtualChannelState,
) -> Result<Signature, SignError> {
    state.validate()?;
    sign_payload(
        signer,
        &VirtualChannelStateClaim {
            contract,
            state: *state,
        },
    )
}

/// Sign `(contract, autoIncrement)`, the revision claim handed to watchtowers.
pub fn sign_auto_increment(
    signer: &Signer,
    contract: Address,
    auto_increment: u16,
) -> Result<Signature, SignError> {
    sign_payload(
        signer,
        &RevisionClaim {
            contract,
            auto_increment,
        },
    )
}

/// Sign `(contract, value)`.
pub fn sign_value(signer: &Signer, contract: Address, value: U256) -> Result<Signature, SignError> {
    sign_payload(signer, &ValueClaim { contract, value })
}

/// Plaintext payload together with the signature over its encoding.
///
/// A signature alone does not say what was signed, so this is what gets
/// transmitted to counterparties and watchtowers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SignedMessage<P> {
    pub payload: P,
    pub signature: Signature,
}

impl<P: Serialize> SignedMessage<P> {
    pub fn digest(&self) -> Result<Hash, abiencode::Error> {
        abiencode::to_hash(&self.payload)
    }

    pub fn recover_signer(&self) -> Result<Address, VerifyError> {
        Ok(sig::recover_signer(self.digest()?, self.signature)?)
    }

    pub fn verify(&self, expected: Address) -> Result<(), VerifyError> {
        let actual = self.recover_signer()?;
        if actual == expected {
            Ok(())
        } else {
            Err(VerifyError::WrongSigner { expected, actual })
        }
    }
}

/// Check that `signature` was made by `expected` over `payload`.
pub fn verify_payload<P: Serialize>(
    payload: &P,
    signature: Signature,
    expected: Address,
) -> Result<(), VerifyError> {
    let actual = sig::recover_signer(abiencode::to_hash(payload)?, signature)?;
    if actual == expected {
        Ok(())
    } else {
        Err(VerifyError::WrongSigner { expected, actual })
    }
}

impl SignedMessage<ChannelStateClaim> {
    pub fn sign_state(
        signer: &Signer,
        contract: Address,
        state: ChannelState,
    ) -> Result<Self, SignError> {
        Ok(SignedMessage {
            signature: sign_state(signer, contract, &state)?,
            payload: ChannelStateClaim { contract, state },
        })
    }
}

impl SignedMessage<VirtualChannelStateClaim> {
    pub fn sign_virtual_state(
        signer: &Signer,
        contract: Address,
        state: VirtualChannelState,
    ) -> Result<Self, SignError> {
        Ok(SignedMessage {
            signature: sign_virtual_state(signer, contract, &state)?,
            payload: VirtualChannelStateClaim { contract, state },
        })
    }
}

impl SignedMessage<RevisionClaim> {
    pub fn sign_auto_increment(
        signer: &Signer,
        contract: Address,
        auto_increment: u16,
    ) -> Result<Self, SignError> {
        Ok(SignedMessage {
            signature: sign_auto_increment(signer, contract, auto_increment)?,
            payload: RevisionClaim {
                contract,
                auto_increment,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(hex_key: &str) -> Signer {
        let bytes: [u8; 32] = hex::decode(hex_key).unwrap().try_into().unwrap();
        Signer::from_private_key(&bytes).unwrap()
    }

    fn contract() -> Address {
        Address::from_hex_str("abcdef0123456789abcdef0123456789abcdef01").unwrap()
    }

    const ALICE_KEY: &str = "cf163df783185ed9862902d89aaaee849004f5f79eb2b05f509046fcc27f48fb";

    #[test]
    fn refuses_to_sign_overdrawn_state() {
        let state = ChannelState {
            alice_value: 18.into(),
            channel_value: 17.into(),
            auto_increment: 1,
        };
        assert!(matches!(
            sign_state(&key(ALICE_KEY), contract(), &state),
            Err(SignError::InvalidState(StateError::BalanceExceedsChannel))
        ));
    }

    #[test]
    fn signed_message_verifies_against_signer_only() {
        let alice = key(ALICE_KEY);
        let state = ChannelState {
            alice_value: 10.into(),
            channel_value: 17.into(),
            auto_increment: 3,
        };
        let msg = SignedMessage::sign_state(&alice, contract(), state).unwrap();
        msg.verify(alice.address()).unwrap();

        let mut other = [0u8; 20];
        other[19] = 1;
        assert!(matches!(
            msg.verify(Address(other)),
            Err(VerifyError::WrongSigner { .. })
        ));
    }

    #[test]
    fn changing_a_field_invalidates_the_signature() {
        let alice = key(ALICE_KEY);
        let state = VirtualChannelState {
            alice_value: 2.into(),
            vchannel_value: 3.into(),
            auto_increment: 1,
        };
        let mut msg = SignedMessage::sign_virtual_state(&alice, contract(), state).unwrap();
        msg.payload.state.auto_increment = 2;
        // Either recovery fails or it yields some unrelated address.
        assert!(msg.verify(alice.address()).is_err());
    }

    #[test]
    fn higher_revision_supersedes_regardless_of_order() {
        let low = ChannelState {
            alice_value: 10.into(),
            channel_value: 17.into(),
            auto_increment: 3,
        };
        let high = ChannelState {
            alice_value: 4.into(),
            auto_increment: 4,
            ..low
        };
        assert!(supersedes(&high, &low));
        assert!(!supersedes(&low, &high));
        assert!(!supersedes(&low, &low));
    }

    #[test]
    fn value_claim_signature_recovers() {
        let alice = key(ALICE_KEY);
        let sig = sign_value(&alice, contract(), 5.into()).unwrap();
        verify_payload(
            &ValueClaim {
                contract: contract(),
                value: 5.into(),
            },
            sig,
            alice.address(),
        )
        .unwrap();
    }
}
