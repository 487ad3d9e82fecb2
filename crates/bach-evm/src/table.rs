//! Per-hardfork instruction tables
//!
//! Each table is built at compile time and indexed directly by the opcode
//! byte. An empty entry means the byte is not an instruction under that
//! fork.

use crate::config::Hardfork;
use crate::gas::static_gas;
use crate::opcode::Opcode;

/// Decoded metadata for one instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    /// The instruction
    pub opcode: Opcode,
    /// Gas charged before execution
    pub static_gas: u64,
    /// Words popped
    pub inputs: u8,
    /// Words pushed
    pub outputs: u8,
}

/// 256 entries, one per byte
pub type InstructionTable = [Option<OpInfo>; 256];

/// Fork that introduced an opcode (Berlin is the oldest tracked)
pub const fn introduced_in(opcode: Opcode) -> Hardfork {
    match opcode {
        Opcode::BASEFEE => Hardfork::London,
        Opcode::PUSH0 => Hardfork::Shanghai,
        Opcode::TLOAD | Opcode::TSTORE | Opcode::MCOPY | Opcode::BLOBHASH | Opcode::BLOBBASEFEE => {
            Hardfork::Cancun
        }
        _ => Hardfork::Berlin,
    }
}

const fn build(fork: Hardfork) -> InstructionTable {
    let mut table: InstructionTable = [None; 256];
    let mut byte = 0usize;
    while byte < 256 {
        if let Some(opcode) = Opcode::from_byte(byte as u8) {
            if fork.is_enabled_in(introduced_in(opcode)) {
                let (inputs, outputs) = opcode.stack_io();
                table[byte] = Some(OpInfo {
                    opcode,
                    static_gas: static_gas(opcode),
                    inputs,
                    outputs,
                });
            }
        }
        byte += 1;
    }
    table
}

/// Berlin instruction set
pub static BERLIN: InstructionTable = build(Hardfork::Berlin);
/// London instruction set
pub static LONDON: InstructionTable = build(Hardfork::London);
/// Shanghai instruction set
pub static SHANGHAI: InstructionTable = build(Hardfork::Shanghai);
/// Cancun instruction set
pub static CANCUN: InstructionTable = build(Hardfork::Cancun);
