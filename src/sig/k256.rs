//! Signer using the k256 Rust crate (implementation of ecdsa in Rust).

use crate::abiencode::types::{Address, Hash, Signature};
use k256::{
    ecdsa::{
        recoverable,
        signature::{hazmat::PrehashSigner, Signature as k256Signature},
        SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha3::{Digest, Keccak256};

use super::{hash_to_eth_signed_msg_hash, normalize_recovery_id, split_signature, Error};

pub struct Signer {
    key: SigningKey,
    addr: Address,
}

impl core::fmt::Debug for Signer {
    // Never print the key.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signer").field("addr", &self.addr).finish()
    }
}

impl From<VerifyingKey> for Address {
    fn from(key: VerifyingKey) -> Self {
        // The uncompressed SEC1 encoding is always 65 bytes: a 0x04 tag
        // followed by x and y.
        let point = key.to_encoded_point(false);
        let pk_bytes = point.as_bytes();

        // See https://ethereum.stackexchange.com/questions/65233/goethereum-getting-public-key-from-private-key-hex-formatting
        //
        // Throw away the first byte, which is not part of the public key.
        let hash: [u8; 32] = Keccak256::digest(&pk_bytes[1..]).into();

        let mut addr = Address([0; 20]);
        addr.0.copy_from_slice(&hash[32 - 20..]);
        addr
    }
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let key = SigningKey::random(rng);
        let addr = key.verifying_key().into();
        Self { key, addr }
    }

    /// Load a raw 32 byte big-endian secret scalar.
    pub fn from_private_key(bytes: &[u8; 32]) -> Result<Self, Error> {
        let key = SigningKey::from_bytes(bytes).map_err(|_| Error::InvalidKey)?;
        let addr = key.verifying_key().into();
        Ok(Self { key, addr })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    pub fn sign_eth(&self, msg: Hash) -> Result<Signature, Error> {
        // "\x19Ethereum Signed Message:\n32" format
        let hash = hash_to_eth_signed_msg_hash(msg);

        let sig: recoverable::Signature = self
            .key
            .sign_prehash(&hash.0)
            .map_err(|_| Error::SigningFailed)?;

        // This Signature type stores r, s and the raw recovery id in this
        // order (65 bytes).
        let sig_bytes = sig.as_bytes();
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&sig_bytes[..64]);
        debug_assert!(rs[32] & 0x80 == 0);

        Ok(Signature::new(&rs, normalize_recovery_id(sig_bytes[64])))
    }
}

/// Recover the address that produced `eth_sig` over `msg`.
///
/// `msg` is the hash given to [Signer::sign_eth], without the `Ethereum Signed
/// Message` prefix.
pub fn recover_signer(msg: Hash, eth_sig: Signature) -> Result<Address, Error> {
    let hash = hash_to_eth_signed_msg_hash(msg);

    // Undo adding the 27, to go back to the format expected below
    let (rs, recid) = split_signature(eth_sig)?;
    let mut sig_bytes = [0u8; 65];
    sig_bytes[..64].copy_from_slice(&rs);
    sig_bytes[64] = recid;

    let sig = recoverable::Signature::from_bytes(&sig_bytes).map_err(|_| Error::RecoveryFailed)?;

    let verifying_key = sig
        .recover_verifying_key_from_digest_bytes(&hash.0.into())
        .map_err(|_| Error::RecoveryFailed)?;
    Ok(verifying_key.into())
}
