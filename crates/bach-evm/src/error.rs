//! EVM error types

use bach_state::StateError;
use thiserror::Error;

/// Exceptional halts of a frame
///
/// Every variant is local to the frame that raised it: the caller sees a
/// failed sub-call, never an error value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Invalid jump destination
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Undefined opcode, or not enabled in the active hardfork
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Write in static context
    #[error("state modification in static context")]
    StaticCallViolation,

    /// Return data out of bounds
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// Contract creation collision
    #[error("contract address collision")]
    CreateCollision,

    /// Deployed code too large (EIP-170)
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,

    /// Init code too large (EIP-3860)
    #[error("max initcode size exceeded")]
    MaxInitCodeSizeExceeded,

    /// Deployed code starts with 0xEF (EIP-3541)
    #[error("deployed code starts with 0xef")]
    InvalidCodePrefix,

    /// Call depth exceeded
    #[error("call depth exceeded (max 1024)")]
    CallDepthExceeded,

    /// Insufficient balance for transfer
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Sender nonce at u64::MAX
    #[error("nonce overflow")]
    NonceOverflow,

    /// Precompile rejected its input
    #[error("precompile error: {0}")]
    PrecompileFailure(String),

    /// Backend failure
    #[error("state error: {0}")]
    State(String),
}

impl From<StateError> for EvmError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::InsufficientBalance { .. } => EvmError::InsufficientBalance,
            StateError::NonceOverflow(_) => EvmError::NonceOverflow,
            other => EvmError::State(other.to_string()),
        }
    }
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;
