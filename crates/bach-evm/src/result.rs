//! Execution outcomes

use crate::error::EvmError;
use crate::gas::Gas;
use bach_primitives::{Address, U256};
use bach_state::Log;
use bytes::Bytes;

/// Selector of Solidity's `Error(string)`
const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// Selector of Solidity's `Panic(uint256)`
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// How a frame ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// STOP or end of code
    Stop,
    /// RETURN
    Return,
    /// SELFDESTRUCT
    SelfDestruct,
    /// REVERT: state discarded, output and unused gas kept
    Revert,
    /// Exceptional halt: state discarded, all gas consumed
    Halt(EvmError),
}

impl ExitReason {
    /// Stop, Return or SelfDestruct
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ExitReason::Stop | ExitReason::Return | ExitReason::SelfDestruct
        )
    }

    /// Explicit REVERT
    pub fn is_revert(&self) -> bool {
        matches!(self, ExitReason::Revert)
    }

    /// The halt error, if any
    pub fn error(&self) -> Option<&EvmError> {
        match self {
            ExitReason::Halt(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of one call or create frame, as seen by its parent
#[derive(Clone, Debug)]
pub struct FrameResult {
    /// Exit status
    pub exit: ExitReason,
    /// Gas meter at exit (remaining and refund counter)
    pub gas: Gas,
    /// Return or revert data; deployed code for a successful create
    pub output: Bytes,
    /// Address of the created contract on a successful create
    pub created_address: Option<Address>,
}

impl FrameResult {
    /// Frame ended normally
    pub fn new(exit: ExitReason, gas: Gas, output: Bytes) -> Self {
        Self {
            exit,
            gas,
            output,
            created_address: None,
        }
    }

    /// Frame was never entered; all of `gas_limit` goes back to the caller
    pub fn not_entered(error: EvmError, gas_limit: u64) -> Self {
        Self::new(ExitReason::Halt(error), Gas::new(gas_limit), Bytes::new())
    }

    /// Exceptional halt consuming all of `gas_limit`
    pub fn halt(error: EvmError, gas_limit: u64) -> Self {
        Self::new(ExitReason::Halt(error), Gas::new_spent(gas_limit), Bytes::new())
    }

    /// Whether the frame succeeded
    pub fn is_success(&self) -> bool {
        self.exit.is_success()
    }
}

/// Final result of a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Gas left after refunds
    pub gas_left: u64,
    /// Gas used after refunds
    pub gas_used: u64,
    /// Refund credited (already included in `gas_left`)
    pub gas_refunded: u64,
    /// Return data (or revert data)
    pub output: Bytes,
    /// Decoded revert reason for a REVERT with a non-empty payload
    pub revert_reason: Option<String>,
    /// Logs emitted (empty on failure)
    pub logs: Vec<Log>,
    /// How the top-level frame ended
    pub exit: ExitReason,
    /// Created contract for a successful create transaction
    pub created_address: Option<Address>,
}

impl CallResult {
    /// Failure before any frame ran (e.g. intrinsic gas above the limit)
    pub fn rejected(error: EvmError, gas_limit: u64) -> Self {
        Self {
            success: false,
            gas_left: 0,
            gas_used: gas_limit,
            gas_refunded: 0,
            output: Bytes::new(),
            revert_reason: None,
            logs: Vec::new(),
            exit: ExitReason::Halt(error),
            created_address: None,
        }
    }
}

/// Human-readable reason for a revert payload
///
/// `Error(string)` yields the string and `Panic(uint256)` yields
/// `panic: 0x..`. Anything else is rendered as hex; an empty payload has no
/// reason.
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if output.is_empty() {
        return None;
    }
    if output.len() >= 4 {
        let (selector, body) = output.split_at(4);
        if selector == ERROR_SELECTOR {
            if let Some(reason) = decode_abi_string(body) {
                return Some(reason);
            }
        } else if selector == PANIC_SELECTOR && body.len() >= 32 {
            let code = crate::word::as_u64_saturated(U256::from_big_endian(&body[..32]));
            return Some(format!("panic: 0x{:02x}", code));
        }
    }
    Some(format!("0x{}", hex::encode(output)))
}

fn decode_abi_string(body: &[u8]) -> Option<String> {
    let offset = word_at(body, 0)?;
    let len = word_at(body, offset)?;
    let start = offset.checked_add(32)?;
    let end = start.checked_add(len)?;
    let bytes = body.get(start..end)?;
    String::from_utf8(bytes.to_vec()).ok()
}

fn word_at(data: &[u8], offset: usize) -> Option<usize> {
    let word = data.get(offset..offset.checked_add(32)?)?;
    let value = U256::from_big_endian(word);
    if value > U256::from(u32::MAX) {
        return None;
    }
    Some(value.low_u64() as usize)
}
