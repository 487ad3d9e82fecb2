//! State error types

use bach_primitives::{Address, H256, U256};
use thiserror::Error;

/// State access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Failure reported by the backing store
    #[error("backend error: {0}")]
    Backend(String),

    /// An account references code the backend does not have
    #[error("missing code for hash {0}")]
    MissingCode(H256),

    /// Debit larger than the balance
    #[error("insufficient balance for {address}: have {available}, need {required}")]
    InsufficientBalance {
        /// Debited account
        address: Address,
        /// Current balance
        available: U256,
        /// Requested amount
        required: U256,
    },

    /// Credit would exceed 2^256 - 1
    #[error("balance overflow for {0}")]
    BalanceOverflow(Address),

    /// Nonce already at u64::MAX
    #[error("nonce overflow for {0}")]
    NonceOverflow(Address),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
