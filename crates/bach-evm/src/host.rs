//! Interface between the interpreter and the frame manager
//!
//! The interpreter never touches state directly. Everything outside the
//! frame's own stack and memory goes through [`Host`]. Child frames are
//! described by [`CallInputs`] and [`CreateInputs`] and started by the
//! frame driver, not the host.

use crate::config::EvmConfig;
use crate::context::Environment;
use crate::error::EvmResult;
use bach_primitives::{Address, H256, U256};
use bach_state::Log;
use bytes::Bytes;

/// A loaded value and whether this was the first access (EIP-2929)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLoad<T> {
    /// Loaded value
    pub data: T,
    /// First touch in this transaction
    pub is_cold: bool,
}

impl<T> StateLoad<T> {
    /// Wrap a loaded value
    pub fn new(data: T, is_cold: bool) -> Self {
        Self { data, is_cold }
    }
}

/// Account facts needed to price a CALL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountLoad {
    /// First touch in this transaction
    pub is_cold: bool,
    /// Missing or EIP-161 empty
    pub is_empty: bool,
}

/// Slot values around an SSTORE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SStoreResult {
    /// Value at transaction start
    pub original: U256,
    /// Value before this write
    pub present: U256,
    /// Value written
    pub new: U256,
    /// First touch of the slot
    pub is_cold: bool,
}

/// Facts needed to price a SELFDESTRUCT
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelfDestructResult {
    /// The destroyed account held a balance
    pub had_value: bool,
    /// The beneficiary was non-empty beforehand
    pub target_exists: bool,
    /// First touch of the beneficiary
    pub is_cold: bool,
    /// Already scheduled for deletion in this transaction
    pub previously_destroyed: bool,
}

/// Kind of message call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallScheme {
    /// CALL
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// STATICCALL
    StaticCall,
}

/// Value attached to a call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallValue {
    /// Moved from caller to target before the frame runs
    Transfer(U256),
    /// Only visible through CALLVALUE (DELEGATECALL)
    Apparent(U256),
}

impl CallValue {
    /// Value seen by CALLVALUE
    pub fn apparent(&self) -> U256 {
        match *self {
            CallValue::Transfer(v) | CallValue::Apparent(v) => v,
        }
    }

    /// Value actually moved
    pub fn transfer(&self) -> U256 {
        match *self {
            CallValue::Transfer(v) => v,
            CallValue::Apparent(_) => U256::zero(),
        }
    }
}

/// Inputs of a call frame
#[derive(Clone, Debug)]
pub struct CallInputs {
    /// Call kind
    pub scheme: CallScheme,
    /// CALLER inside the frame
    pub caller: Address,
    /// Address whose storage and balance the frame acts on
    pub target: Address,
    /// Address whose code runs
    pub code_address: Address,
    /// Attached value
    pub value: CallValue,
    /// Call data
    pub input: Bytes,
    /// Gas given to the frame (stipend included)
    pub gas_limit: u64,
    /// No state changes allowed
    pub is_static: bool,
    /// Depth of the new frame
    pub depth: usize,
}

/// Address derivation for a new contract
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateScheme {
    /// keccak(rlp([sender, nonce]))
    Create,
    /// keccak(0xff ‖ sender ‖ salt ‖ keccak(init_code))
    Create2 {
        /// Salt word
        salt: U256,
    },
}

/// Inputs of a create frame
#[derive(Clone, Debug)]
pub struct CreateInputs {
    /// Creator
    pub caller: Address,
    /// Address derivation
    pub scheme: CreateScheme,
    /// Endowment
    pub value: U256,
    /// Code run to produce the deployed code
    pub init_code: Bytes,
    /// Gas given to the frame
    pub gas_limit: u64,
    /// Depth of the new frame
    pub depth: usize,
}

/// Everything an executing frame needs from outside itself
///
/// Account and slot accessors mark what they touch as warm and report
/// whether it was cold.
pub trait Host {
    /// Block and transaction environment
    fn env(&self) -> &Environment;

    /// Engine configuration
    fn config(&self) -> &EvmConfig;

    /// Touch an account for CALL pricing
    fn load_account(&mut self, address: Address) -> EvmResult<AccountLoad>;

    /// BALANCE / SELFBALANCE
    fn balance(&mut self, address: Address) -> EvmResult<StateLoad<U256>>;

    /// EXTCODESIZE / EXTCODECOPY
    fn code(&mut self, address: Address) -> EvmResult<StateLoad<Bytes>>;

    /// EXTCODEHASH; zero for missing or empty accounts
    fn code_hash(&mut self, address: Address) -> EvmResult<StateLoad<H256>>;

    /// BLOCKHASH; zero outside the last 256 blocks
    fn block_hash(&mut self, number: U256) -> EvmResult<H256>;

    /// SLOAD
    fn sload(&mut self, address: Address, key: U256) -> EvmResult<StateLoad<U256>>;

    /// SSTORE; writes and reports the values needed for pricing
    fn sstore(&mut self, address: Address, key: U256, value: U256) -> EvmResult<SStoreResult>;

    /// TLOAD
    fn tload(&mut self, address: Address, key: U256) -> U256;

    /// TSTORE
    fn tstore(&mut self, address: Address, key: U256, value: U256);

    /// LOG0..LOG4
    fn log(&mut self, log: Log);

    /// SELFDESTRUCT: move the balance and schedule deletion
    fn selfdestruct(&mut self, address: Address, target: Address) -> EvmResult<SelfDestructResult>;
}
