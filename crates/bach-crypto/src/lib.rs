//! # bach-crypto
//!
//! Cryptographic primitives for the BachLedger EVM.
//!
//! - Keccak-256 (KECCAK256 opcode, code hashes, contract addresses)
//! - SHA-256 (precompile 0x02)
//! - secp256k1 signer recovery (precompile 0x01)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;
mod recover;
mod error;

pub use hash::{keccak256, sha256};
pub use recover::{ecrecover, public_key_to_address};
pub use error::CryptoError;
