//! Gas schedule and metering

use crate::config::Hardfork;
use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use bach_primitives::U256;

/// Gas costs for EVM operations
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp byte gas
    pub const EXP_BYTE: u64 = 50;
    /// KECCAK256 base gas
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 word gas
    pub const KECCAK256_WORD: u64 = 6;
    /// BLOCKHASH gas
    pub const BLOCKHASH: u64 = 20;

    /// Warm account or slot access (EIP-2929)
    pub const WARM_ACCESS: u64 = 100;
    /// Cold account access
    pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
    /// Cold SLOAD
    pub const COLD_SLOAD: u64 = 2100;

    /// Sstore set gas
    pub const SSTORE_SET: u64 = 20000;
    /// Sstore reset gas
    pub const SSTORE_RESET: u64 = 2900;
    /// SSTORE is refused while gas left is at or below the stipend (EIP-2200)
    pub const SSTORE_SENTRY: u64 = 2300;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Init code gas per word (EIP-3860)
    pub const INITCODE_WORD: u64 = 2;
    /// Deployed code gas per byte
    pub const CODE_DEPOSIT: u64 = 200;
    /// Call value transfer gas
    pub const CALL_VALUE: u64 = 9000;
    /// Call new account gas
    pub const NEW_ACCOUNT: u64 = 25000;
    /// Call stipend
    pub const CALL_STIPEND: u64 = 2300;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Transaction gas
    pub const TX: u64 = 21000;
    /// Transaction create gas
    pub const TX_CREATE: u64 = 32000;
    /// Transaction data zero byte
    pub const TX_DATA_ZERO: u64 = 4;
    /// Transaction data non-zero byte
    pub const TX_DATA_NONZERO: u64 = 16;
    /// Access list address gas
    pub const ACCESS_LIST_ADDRESS: u64 = 2400;
    /// Access list storage key gas
    pub const ACCESS_LIST_STORAGE_KEY: u64 = 1900;

    /// Selfdestruct gas
    pub const SELFDESTRUCT: u64 = 5000;
    /// Selfdestruct refund before London
    pub const SELFDESTRUCT_REFUND: i64 = 24000;
}

/// Static gas charged before an opcode runs
///
/// Opcodes with cold/warm pricing carry the warm cost here; the cold
/// surcharge is dynamic.
pub const fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;
    match opcode {
        STOP | RETURN | REVERT | INVALID | SSTORE => cost::ZERO,

        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | COINBASE | TIMESTAMP | NUMBER | PREVRANDAO | GASLIMIT | CHAINID | RETURNDATASIZE
        | POP | PC | MSIZE | GAS | BASEFEE | BLOBBASEFEE | PUSH0 => cost::BASE,

        ADD | SUB | NOT | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | BYTE | SHL
        | SHR | SAR | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY
        | RETURNDATACOPY | MCOPY | BLOBHASH => cost::VERYLOW,

        PUSH1 | PUSH2 | PUSH3 | PUSH4 | PUSH5 | PUSH6 | PUSH7 | PUSH8 | PUSH9 | PUSH10
        | PUSH11 | PUSH12 | PUSH13 | PUSH14 | PUSH15 | PUSH16 | PUSH17 | PUSH18 | PUSH19
        | PUSH20 | PUSH21 | PUSH22 | PUSH23 | PUSH24 | PUSH25 | PUSH26 | PUSH27 | PUSH28
        | PUSH29 | PUSH30 | PUSH31 | PUSH32 => cost::VERYLOW,

        DUP1 | DUP2 | DUP3 | DUP4 | DUP5 | DUP6 | DUP7 | DUP8 | DUP9 | DUP10 | DUP11
        | DUP12 | DUP13 | DUP14 | DUP15 | DUP16 => cost::VERYLOW,

        SWAP1 | SWAP2 | SWAP3 | SWAP4 | SWAP5 | SWAP6 | SWAP7 | SWAP8 | SWAP9 | SWAP10
        | SWAP11 | SWAP12 | SWAP13 | SWAP14 | SWAP15 | SWAP16 => cost::VERYLOW,

        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => cost::LOW,

        ADDMOD | MULMOD | JUMP => cost::MID,

        JUMPI => cost::HIGH,
        JUMPDEST => cost::JUMPDEST,
        EXP => cost::EXP,
        KECCAK256 => cost::KECCAK256,
        BLOCKHASH => cost::BLOCKHASH,

        BALANCE | EXTCODESIZE | EXTCODECOPY | EXTCODEHASH | SLOAD | TLOAD | TSTORE
        | CALL | CALLCODE | DELEGATECALL | STATICCALL => cost::WARM_ACCESS,

        LOG0 => cost::LOG,
        LOG1 => cost::LOG + cost::LOG_TOPIC,
        LOG2 => cost::LOG + 2 * cost::LOG_TOPIC,
        LOG3 => cost::LOG + 3 * cost::LOG_TOPIC,
        LOG4 => cost::LOG + 4 * cost::LOG_TOPIC,

        CREATE | CREATE2 => cost::CREATE,
        SELFDESTRUCT => cost::SELFDESTRUCT,
    }
}

fn words(len: u64) -> u64 {
    len.div_ceil(32)
}

/// Total cost of `words` words of memory: `3w + w²/512`
pub fn memory_cost(words: u64) -> u64 {
    cost::MEMORY
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / 512)
}

/// Cost of growing memory from `current_words` to `new_words`
pub fn memory_expansion_cost(current_words: u64, new_words: u64) -> u64 {
    if new_words <= current_words {
        return 0;
    }
    memory_cost(new_words) - memory_cost(current_words)
}

/// Per-word cost of CALLDATACOPY, CODECOPY, EXTCODECOPY, RETURNDATACOPY, MCOPY
pub fn copy_cost(len: u64) -> u64 {
    cost::COPY.saturating_mul(words(len))
}

/// Dynamic part of EXP
pub fn exp_cost(exponent: U256) -> u64 {
    cost::EXP_BYTE * crate::word::byte_len(exponent)
}

/// Dynamic part of KECCAK256
pub fn keccak256_cost(len: u64) -> u64 {
    cost::KECCAK256_WORD.saturating_mul(words(len))
}

/// Dynamic part of LOG0..LOG4
pub fn log_data_cost(len: u64) -> u64 {
    cost::LOG_DATA.saturating_mul(len)
}

/// Init code metering (EIP-3860), plus the hashing cost for CREATE2
pub fn create_cost(hardfork: Hardfork, init_code_len: u64, is_create2: bool) -> u64 {
    let mut total = 0u64;
    if hardfork.is_enabled_in(Hardfork::Shanghai) {
        total += cost::INITCODE_WORD.saturating_mul(words(init_code_len));
    }
    if is_create2 {
        total = total.saturating_add(keccak256_cost(init_code_len));
    }
    total
}

/// Deposit for deployed code
pub fn code_deposit_cost(len: usize) -> u64 {
    cost::CODE_DEPOSIT.saturating_mul(len as u64)
}

/// All but one 64th of `available` (EIP-150)
pub fn all_but_one_64th(available: u64) -> u64 {
    available - available / 64
}

/// SSTORE cost (EIP-2200 as amended by EIP-2929)
pub fn sstore_cost(original: U256, present: U256, new: U256, is_cold: bool) -> u64 {
    let base = if new == present {
        cost::WARM_ACCESS
    } else if original == present {
        if original.is_zero() {
            cost::SSTORE_SET
        } else {
            cost::SSTORE_RESET
        }
    } else {
        cost::WARM_ACCESS
    };
    if is_cold {
        base + cost::COLD_SLOAD
    } else {
        base
    }
}

/// Refund counter change for an SSTORE; may be negative
pub fn sstore_refund(hardfork: Hardfork, original: U256, present: U256, new: U256) -> i64 {
    if new == present {
        return 0;
    }
    let clears = hardfork.sstore_clears_refund();

    if original == present {
        if !original.is_zero() && new.is_zero() {
            return clears;
        }
        return 0;
    }

    let mut refund = 0i64;
    if !original.is_zero() {
        if present.is_zero() {
            refund -= clears;
        } else if new.is_zero() {
            refund += clears;
        }
    }
    if original == new {
        refund += if original.is_zero() {
            (cost::SSTORE_SET - cost::WARM_ACCESS) as i64
        } else {
            (cost::SSTORE_RESET - cost::WARM_ACCESS) as i64
        };
    }
    refund
}

/// Intrinsic gas of a transaction
pub fn intrinsic_gas(
    hardfork: Hardfork,
    data: &[u8],
    is_create: bool,
    access_list_addresses: u64,
    access_list_keys: u64,
) -> u64 {
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;

    let mut total = cost::TX
        + zeros * cost::TX_DATA_ZERO
        + non_zeros * cost::TX_DATA_NONZERO
        + access_list_addresses * cost::ACCESS_LIST_ADDRESS
        + access_list_keys * cost::ACCESS_LIST_STORAGE_KEY;
    if is_create {
        total += cost::TX_CREATE;
        if hardfork.is_enabled_in(Hardfork::Shanghai) {
            total += cost::INITCODE_WORD * words(data.len() as u64);
        }
    }
    total
}

/// Gas meter of one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gas {
    limit: u64,
    remaining: u64,
    refunded: i64,
}

impl Gas {
    /// Fresh meter
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refunded: 0,
        }
    }

    /// Meter with everything spent
    pub const fn new_spent(limit: u64) -> Self {
        Self {
            limit,
            remaining: 0,
            refunded: 0,
        }
    }

    /// Gas the frame started with
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas left
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas consumed so far
    pub const fn spent(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Refund counter
    pub const fn refunded(&self) -> i64 {
        self.refunded
    }

    /// Deduct `amount`; on failure nothing is deducted
    pub fn charge(&mut self, amount: u64) -> EvmResult<()> {
        if amount > self.remaining {
            return Err(EvmError::OutOfGas);
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Give back gas a sub-call did not use
    pub fn erase_cost(&mut self, returned: u64) {
        self.remaining += returned;
    }

    /// Forfeit everything left
    pub fn spend_all(&mut self) {
        self.remaining = 0;
    }

    /// Add to (or subtract from) the refund counter
    pub fn record_refund(&mut self, refund: i64) {
        self.refunded += refund;
    }

    /// Cap the refund counter at `spent / quotient` and return the amount
    /// that will actually be credited
    pub fn final_refund(&self, quotient: u64) -> u64 {
        let refunded = self.refunded.max(0) as u64;
        refunded.min(self.spent() / quotient)
    }
}
