use core::fmt::Debug;

use rand::{distributions::Standard, prelude::Distribution};
use serde::Serialize;
use uint::{construct_uint, hex::FromHex};

macro_rules! impl_hex_debug {
    ($T:ident) => {
        impl Debug for $T {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("0x")?;
                for b in self.0 {
                    f.write_fmt(format_args!("{:02x}", b))?;
                }
                Ok(())
            }
        }
    };
}

macro_rules! bytesN {
    ( $T:ident, $N:literal ) => {
        #[derive(PartialEq, Eq, Copy, Clone, Hash)]
        pub struct $T(pub [u8; $N]);

        impl Serialize for $T {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl Distribution<$T> for Standard {
            fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> $T {
                $T(rng.gen())
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self([0; $N])
            }
        }

        impl_hex_debug!($T);
    };
}

bytesN!(Bytes32, 32);

// Digest produced by the Keccak256 hasher.
bytesN!(Hash, 32);

/// Recoverable ECDSA signature as consumed by the settlement contract.
///
/// The field order (`v`, `r`, `s`) is the order of the Solidity struct, which
/// is what the serializer writes when a signature is part of a payload.
#[derive(Serialize, PartialEq, Eq, Copy, Clone, Default, Debug, Hash)]
pub struct Signature {
    /// Recovery id, offset by 27 (see [crate::sig]).
    pub v: u8,
    pub r: Bytes32,
    pub s: Bytes32,
}

impl Signature {
    pub fn new(rs: &[u8; 64], v: u8) -> Self {
        let mut sig = Signature {
            v,
            ..Default::default()
        };
        sig.r.0.copy_from_slice(&rs[..32]);
        sig.s.0.copy_from_slice(&rs[32..]);
        sig
    }

    /// 65 byte `r || s || v` representation used by `eth_sign` and on the wire.
    pub fn to_rsv_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r.0);
        bytes[32..64].copy_from_slice(&self.s.0);
        bytes[64] = self.v;
        bytes
    }

    pub fn from_rsv_bytes(bytes: &[u8; 65]) -> Self {
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&bytes[..64]);
        Self::new(&rs, bytes[64])
    }
}

// We could use primitive_types:U256 or ethereum_types::U256 here, too. Both
// have the ability to serde serialize, but unfrotunately to a hex string, which
// is not what we want.
construct_uint! {
    pub struct U256(4);
}

impl Serialize for U256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        serializer.serialize_bytes(&bytes)
    }
}

impl Distribution<U256> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> U256 {
        let buf: [u8; 32] = rng.gen();
        U256::from_big_endian(&buf)
    }
}

/// 20 byte identifier of a party or of a channel contract instance.
#[derive(Copy, Clone, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);
impl_hex_debug!(Address);

impl Address {
    /// Parse a hex address, with or without `0x` prefix. Checksum casing is
    /// ignored.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        <[u8; 20]>::from_hex(s).ok().map(Address)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // For some onknown reason abi encoding has addresses right aligned
        // (like uints) instead of left aligned like bytes/bytesN.
        let mut bytes = [0u8; 32];
        bytes[32 - 20..].copy_from_slice(self.0.as_slice());
        serializer.serialize_bytes(&bytes)
    }
}

impl Distribution<Address> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Address {
        Address(rng.gen())
    }
}
