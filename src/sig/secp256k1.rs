//! Signer using the secp256k1 crate (bindings to libsecp256k1).

use crate::abiencode::types::{Address, Hash, Signature};
use secp256k1::{
    self,
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha3::{Digest, Keccak256};

use super::{hash_to_eth_signed_msg_hash, normalize_recovery_id, split_signature, Error};

pub struct Signer {
    secp: Secp256k1<All>,
    sk: SecretKey,
    addr: Address,
}

impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signer").field("addr", &self.addr).finish()
    }
}

impl From<PublicKey> for Address {
    fn from(pk: PublicKey) -> Self {
        // Throw away the first byte, which is not part of the public key. It is
        // added by serialize_uncompressed due to the encoding used.
        let hash: [u8; 32] = Keccak256::digest(&pk.serialize_uncompressed()[1..]).into();

        let mut addr = Address([0; 20]);
        addr.0.copy_from_slice(&hash[32 - 20..]);
        addr
    }
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(rng);
        let addr = PublicKey::from_secret_key(&secp, &sk).into();
        Self { secp, sk, addr }
    }

    pub fn from_private_key(bytes: &[u8; 32]) -> Result<Self, Error> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(bytes).map_err(|_| Error::InvalidKey)?;
        let addr = PublicKey::from_secret_key(&secp, &sk).into();
        Ok(Self { secp, sk, addr })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign a hash using a Ethereum 65-byte recoverable signature.
    pub fn sign_eth(&self, msg: Hash) -> Result<Signature, Error> {
        // "\x19Ethereum Signed Message:\n32" format
        let hash = hash_to_eth_signed_msg_hash(msg);
        let message = Message::from_slice(&hash.0).map_err(|_| Error::SigningFailed)?;

        // We have to use sign_ecdsa_recoverable because the contract must be
        // able to recover the address. This gives us the additional information
        // needed for v.
        let sig = self.secp.sign_ecdsa_recoverable(&message, &self.sk);
        let (recid, rs) = sig.serialize_compact();

        // EIP-2 makes all signatures with a non-canonical s invalid. The
        // library already produces canonical signatures, fail early in debug
        // builds if that changes.
        debug_assert!(rs[32] & 0x80 == 0);

        Ok(Signature::new(&rs, normalize_recovery_id(recid.to_i32() as u8)))
    }
}

/// Recover the address that produced `eth_sig` over `msg`.
///
/// `msg` is the hash given to [Signer::sign_eth], it should not include the
/// `Ethereum Signed Message` prefix.
pub fn recover_signer(msg: Hash, eth_sig: Signature) -> Result<Address, Error> {
    let hash = hash_to_eth_signed_msg_hash(msg);
    let (rs, recid) = split_signature(eth_sig)?;

    let recid = RecoveryId::from_i32(recid.into()).map_err(|_| Error::RecoveryFailed)?;
    let sig = RecoverableSignature::from_compact(&rs, recid).map_err(|_| Error::RecoveryFailed)?;
    let message = Message::from_slice(&hash.0).map_err(|_| Error::RecoveryFailed)?;

    let secp = Secp256k1::verification_only();
    let pk = secp
        .recover_ecdsa(&message, &sig)
        .map_err(|_| Error::RecoveryFailed)?;

    Ok(pk.into())
}
