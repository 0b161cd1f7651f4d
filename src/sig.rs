//! Handles the creation and verification of (Ethereum) Signatures.
//!
//! # Recovery id convention
//!
//! ECDSA recovery ids are `0` or `1`. The settlement contract (like
//! OpenZeppelin's `ECDSA.recover`) expects them offset by
//! [RECOVERY_ID_OFFSET], i.e. `v ∈ {27, 28}`. Every [Signature] produced here
//! uses that convention and [recover_signer] rejects anything else with
//! [Error::InvalidRecoveryId]. The raw `0`/`1` form and EIP-155 style values
//! that include a chain id are not accepted, a mismatch shows
//! up as an error instead of recovering an unrelated address.

use core::fmt::Display;

use crate::abiencode::types::{Hash, Signature};
use sha3::{Digest, Keccak256};

#[cfg(feature = "secp256k1")]
mod secp256k1;
#[cfg(feature = "secp256k1")]
pub use self::secp256k1::{recover_signer, Signer};

#[cfg(feature = "k256")]
mod k256;
#[cfg(all(feature = "k256", not(feature = "secp256k1")))]
pub use self::k256::{recover_signer, Signer};

#[cfg(not(any(feature = "k256", feature = "secp256k1")))]
compile_error!("enable at least one signing backend: `k256` or `secp256k1`");


/// Added to the ECDSA recovery id to get `v`.
pub const RECOVERY_ID_OFFSET: u8 = 27;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The private key is zero or not smaller than the curve order.
    InvalidKey,
    /// `v` is not [RECOVERY_ID_OFFSET] or [RECOVERY_ID_OFFSET]` + 1`.
    InvalidRecoveryId(u8),
    /// `r`/`s` are not a valid signature or no public key can be recovered.
    RecoveryFailed,
    /// The backend refused to sign.
    SigningFailed,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidKey => f.write_str("private key is not a valid secp256k1 scalar"),
            Error::InvalidRecoveryId(v) => write!(f, "invalid recovery id v={}", v),
            Error::RecoveryFailed => f.write_str("could not recover public key from signature"),
            Error::SigningFailed => f.write_str("signing failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Turn a raw recovery id (`0` or `1`) into `v`.
pub fn normalize_recovery_id(recid: u8) -> u8 {
    debug_assert!(recid < 2, "high-x recovery ids are never produced");
    RECOVERY_ID_OFFSET + recid
}

/// Inverse of [normalize_recovery_id], rejecting anything but `27` and `28`.
pub fn recovery_id_from_v(v: u8) -> Result<u8, Error> {
    match v.checked_sub(RECOVERY_ID_OFFSET) {
        Some(recid @ (0 | 1)) => Ok(recid),
        _ => Err(Error::InvalidRecoveryId(v)),
    }
}

/// Add the `\x19Ethereum Signed Message\n<length>` prefix to hash.
///
/// This is the format expected by the Solidity contracts and what
/// `web3.eth.accounts.sign` does with a 32 byte hex digest.
pub(crate) fn hash_to_eth_signed_msg_hash(hash: Hash) -> Hash {
    // Packed encoding => We can't use the serializer
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.0);
    Hash(hasher.finalize().into())
}

/// `v` of a signature must be the only thing wrong for this to return
/// [Error::InvalidRecoveryId]; used by both backends before touching `r`/`s`.
pub(crate) fn split_signature(sig: Signature) -> Result<([u8; 64], u8), Error> {
    let recid = recovery_id_from_v(sig.v)?;
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&sig.r.0);
    rs[32..].copy_from_slice(&sig.s.0);
    Ok((rs, recid))
}
