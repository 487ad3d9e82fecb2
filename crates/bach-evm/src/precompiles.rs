//! Precompiled contracts
//!
//! A precompile is a call target implemented natively. The registry maps
//! addresses to implementations; the frame manager charges
//! [`Precompile::gas_cost`] against the forwarded gas before running one.

use bach_crypto::{ecrecover, sha256};
use bach_primitives::{Address, H256};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Precompile failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Malformed input
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Not implemented by this engine
    #[error("precompile {0} is not supported")]
    Unsupported(&'static str),
}

/// A natively implemented contract
pub trait Precompile: Send + Sync {
    /// Gas charged for `input`
    fn gas_cost(&self, input: &[u8]) -> u64;

    /// Run on `input`
    fn execute(&self, input: &[u8]) -> Result<Bytes, PrecompileError>;
}

fn words(len: usize) -> u64 {
    len.div_ceil(32) as u64
}

/// 0x01: secp256k1 signer recovery
///
/// Input is `hash ‖ v ‖ r ‖ s`, each 32 bytes and right-padded with zeros.
/// An unrecoverable signature returns empty output rather than failing.
#[derive(Debug, Default)]
pub struct EcRecover;

impl Precompile for EcRecover {
    fn gas_cost(&self, _input: &[u8]) -> u64 {
        3000
    }

    fn execute(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let mut buf = [0u8; 128];
        let len = input.len().min(128);
        buf[..len].copy_from_slice(&input[..len]);

        // v must be exactly 27 or 28 as a 32-byte word
        if buf[32..63].iter().any(|b| *b != 0) || !matches!(buf[63], 27 | 28) {
            return Ok(Bytes::new());
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&buf[..32]);
        let mut r = [0u8; 32];
        r.copy_from_slice(&buf[64..96]);
        let mut s = [0u8; 32];
        s.copy_from_slice(&buf[96..128]);

        match ecrecover(&H256::from_bytes(hash), buf[63] - 27, &r, &s) {
            Ok(address) => {
                let mut out = [0u8; 32];
                out[12..].copy_from_slice(address.as_bytes());
                Ok(Bytes::copy_from_slice(&out))
            }
            Err(_) => Ok(Bytes::new()),
        }
    }
}

/// 0x02: SHA-256
#[derive(Debug, Default)]
pub struct Sha256;

impl Precompile for Sha256 {
    fn gas_cost(&self, input: &[u8]) -> u64 {
        60 + 12 * words(input.len())
    }

    fn execute(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::copy_from_slice(sha256(input).as_bytes()))
    }
}

/// 0x04: identity
#[derive(Debug, Default)]
pub struct Identity;

impl Precompile for Identity {
    fn gas_cost(&self, input: &[u8]) -> u64 {
        15 + 3 * words(input.len())
    }

    fn execute(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::copy_from_slice(input))
    }
}

/// Placeholder for a precompile this engine does not implement
///
/// Any call to it fails and consumes the forwarded gas.
#[derive(Debug)]
pub struct Unsupported {
    name: &'static str,
}

impl Unsupported {
    /// Stub named `name`
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Precompile for Unsupported {
    fn gas_cost(&self, _input: &[u8]) -> u64 {
        0
    }

    fn execute(&self, _input: &[u8]) -> Result<Bytes, PrecompileError> {
        Err(PrecompileError::Unsupported(self.name))
    }
}

/// Address-keyed precompile registry
#[derive(Clone, Default)]
pub struct Precompiles {
    entries: BTreeMap<Address, Arc<dyn Precompile>>,
}

impl Precompiles {
    /// No precompiles
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard set at 0x01..=0x0a
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.register(Address::from_low_u64_be(1), Arc::new(EcRecover));
        set.register(Address::from_low_u64_be(2), Arc::new(Sha256));
        set.register(
            Address::from_low_u64_be(3),
            Arc::new(Unsupported::new("RIPEMD160")),
        );
        set.register(Address::from_low_u64_be(4), Arc::new(Identity));
        let stubs = [
            (5, "MODEXP"),
            (6, "BN254_ADD"),
            (7, "BN254_MUL"),
            (8, "BN254_PAIRING"),
            (9, "BLAKE2F"),
            (10, "POINT_EVALUATION"),
        ];
        for (n, name) in stubs {
            set.register(Address::from_low_u64_be(n), Arc::new(Unsupported::new(name)));
        }
        set
    }

    /// Install or replace the precompile at `address`
    pub fn register(&mut self, address: Address, precompile: Arc<dyn Precompile>) -> &mut Self {
        self.entries.insert(address, precompile);
        self
    }

    /// Precompile at `address`
    pub fn get(&self, address: &Address) -> Option<&Arc<dyn Precompile>> {
        self.entries.get(address)
    }

    /// Whether `address` is a precompile
    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    /// Registered addresses in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.keys().copied()
    }

    /// Number of registered precompiles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Precompiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
