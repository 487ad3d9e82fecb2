//! # bach-primitives
//!
//! Primitive types shared by the BachLedger EVM crates.
//!
//! - [`U256`]: the 256-bit machine word
//! - [`Address`]: 20-byte account identifier
//! - [`H256`]: 32-byte hash

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;
mod error;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};
pub use error::PrimitiveError;

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Block number type
pub type BlockNumber = u64;

/// Account nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;

/// Parse a hex word (`0x`-prefixed or bare, odd length allowed)
pub fn word_from_hex(s: &str) -> Result<U256, PrimitiveError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16).map_err(|e| PrimitiveError::InvalidWord(format!("{s}: {e:?}")))
}
