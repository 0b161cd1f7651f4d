#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod abiencode {
    mod error;
    mod hashing;
    mod ser;

    pub mod schema;
    pub mod types;

    pub use error::{Error, Result};
    pub use hashing::{keccak256, to_hash, Keccak256Writer};
    pub use ser::{to_vec, to_writer, Serializer, Writer};

    #[cfg(test)]
    mod tests;
}
pub mod sig;
pub mod state;

pub mod channel;
mod client;
pub mod messages;
pub mod quorum;
pub mod watchtower;
pub mod wire;

pub use abiencode::types::{Address, Hash, Signature, U256};
pub use client::ThunderdomeClient;
