//! Hardfork selection and engine limits

use crate::table::{self, InstructionTable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Protocol upgrade whose rules the interpreter follows
///
/// Ordered: every fork includes the rules of the ones before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Hardfork {
    /// EIP-2929 access lists and warm/cold pricing
    Berlin = 0,
    /// BASEFEE, EIP-3529 refund reduction, EIP-3541
    London = 1,
    /// PUSH0, warm coinbase, initcode metering
    Shanghai = 2,
    /// Transient storage, MCOPY, blob opcodes, EIP-6780
    #[default]
    Cancun = 3,
}

impl Hardfork {
    /// Whether rules introduced in `fork` apply under `self`
    pub const fn is_enabled_in(self, fork: Hardfork) -> bool {
        self as u8 >= fork as u8
    }

    /// Static opcode table for this fork
    pub fn instruction_table(self) -> &'static InstructionTable {
        match self {
            Hardfork::Berlin => &table::BERLIN,
            Hardfork::London => &table::LONDON,
            Hardfork::Shanghai => &table::SHANGHAI,
            Hardfork::Cancun => &table::CANCUN,
        }
    }

    /// Refund for clearing a storage slot
    pub const fn sstore_clears_refund(self) -> i64 {
        if self.is_enabled_in(Hardfork::London) {
            4800
        } else {
            15000
        }
    }

    /// Divisor capping the refund counter against gas used
    pub const fn max_refund_quotient(self) -> u64 {
        if self.is_enabled_in(Hardfork::London) {
            5
        } else {
            2
        }
    }
}

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvmConfig {
    /// Active hardfork
    pub hardfork: Hardfork,
    /// Deepest frame allowed (top-level frame is depth 0)
    pub max_call_depth: usize,
    /// Largest deployable code (EIP-170)
    pub max_code_size: usize,
    /// Largest init code from Shanghai (EIP-3860)
    pub max_initcode_size: usize,
    /// Charge intrinsic transaction gas in [`crate::Evm::transact`]
    pub intrinsic_gas: bool,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            hardfork: Hardfork::default(),
            max_call_depth: 1024,
            max_code_size: 24576,
            max_initcode_size: 49152,
            intrinsic_gas: false,
        }
    }
}

impl EvmConfig {
    /// Default limits under a given hardfork
    pub fn with_hardfork(hardfork: Hardfork) -> Self {
        Self {
            hardfork,
            ..Self::default()
        }
    }
}
