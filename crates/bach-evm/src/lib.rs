//! # bach-evm
//!
//! EVM execution core for BachLedger, at the Cancun rule set.
//!
//! This crate provides:
//! - Table-driven bytecode interpreter with 256-bit word semantics
//! - Gas metering with EIP-2929 warm/cold access and refund caps
//! - Call and create frames over a journaled state
//! - Precompile registry (ecrecover, sha256, identity)
//!
//! # Example
//!
//! ```
//! use bach_evm::{execute, BlockEnv};
//! use bach_primitives::{Address, U256};
//! use bach_state::InMemoryDb;
//!
//! let caller = Address::from_low_u64_be(1);
//! let contract = Address::from_low_u64_be(0x1000);
//! let mut db = InMemoryDb::new();
//! db.set_balance(caller, U256::exp10(20));
//!
//! // PUSH1 1, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
//! let code = [0x60, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3];
//! let result = execute(&code, &[], caller, contract, U256::zero(), 100_000, &BlockEnv::default(), &mut db);
//! assert!(result.success);
//! assert_eq!(result.gas_used, 18);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod evm;
pub mod gas;
pub mod host;
pub mod interpreter;
pub mod memory;
pub mod opcode;
pub mod precompiles;
pub mod result;
pub mod stack;
pub mod table;
pub mod word;

pub use analysis::{CodeCache, JumpDests};
pub use config::{EvmConfig, Hardfork};
pub use context::{BlockEnv, Environment, FrameContext, TxEnv};
pub use error::{EvmError, EvmResult};
pub use evm::{create2_address, create_address, AccessListItem, Evm, Transaction, TxKind};
pub use gas::Gas;
pub use host::{CallInputs, CallScheme, CallValue, CreateInputs, CreateScheme, Host};
pub use interpreter::{Interpreter, InterpreterAction, InterpreterResult};
pub use opcode::Opcode;
pub use precompiles::{Precompile, PrecompileError, Precompiles};
pub use result::{decode_revert_reason, CallResult, ExitReason, FrameResult};

use bach_primitives::{Address, U256};
use bach_state::{StateReader, StateWriter};
use bytes::Bytes;

/// Run `code` at `target` as a message call from `caller`
///
/// Non-empty `code` is installed at `target` first and stays installed even
/// if the call fails. Uses Cancun rules, the standard precompiles and no
/// intrinsic gas.
#[allow(clippy::too_many_arguments)]
pub fn execute<DB: StateReader + StateWriter>(
    code: &[u8],
    input: &[u8],
    caller: Address,
    target: Address,
    value: U256,
    gas_limit: u64,
    block: &BlockEnv,
    db: &mut DB,
) -> CallResult {
    let env = Environment::new(
        block.clone(),
        TxEnv {
            origin: caller,
            ..TxEnv::default()
        },
    );
    let mut evm = Evm::new(db, env, EvmConfig::default());
    if !code.is_empty() {
        if let Err(err) = evm.install_code(target, Bytes::copy_from_slice(code)) {
            return CallResult::rejected(err, gas_limit);
        }
    }
    evm.transact(Transaction::call(
        caller,
        target,
        value,
        Bytes::copy_from_slice(input),
        gas_limit,
    ))
}
