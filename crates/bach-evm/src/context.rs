//! Execution environment: block, transaction and frame context

use bach_primitives::{Address, H256, U256};
use bytes::Bytes;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Block environment information
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlockEnv {
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block coinbase (miner/validator)
    pub coinbase: Address,
    /// Base fee (EIP-1559)
    pub base_fee: U256,
    /// Chain ID
    pub chain_id: u64,
    /// Pre-merge difficulty
    pub difficulty: U256,
    /// Post-merge randomness; takes precedence over `difficulty`
    pub prevrandao: Option<H256>,
    /// Blob base fee (EIP-7516)
    pub blob_base_fee: U256,
}

impl Default for BlockEnv {
    fn default() -> Self {
        Self {
            number: 1,
            timestamp: 1000,
            gas_limit: 30_000_000,
            coinbase: Address::ZERO,
            base_fee: U256::from(1_000_000_000u64),
            chain_id: 1,
            difficulty: U256::zero(),
            prevrandao: Some(H256::ZERO),
            blob_base_fee: U256::one(),
        }
    }
}

impl BlockEnv {
    /// Value pushed by opcode 0x44
    pub fn prevrandao_word(&self) -> U256 {
        match self.prevrandao {
            Some(randao) => randao.to_word(),
            None => self.difficulty,
        }
    }
}

/// Transaction environment information
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TxEnv {
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
    /// Versioned blob hashes (EIP-4844)
    pub blob_hashes: Vec<H256>,
}

/// Complete execution environment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Environment {
    /// Block context
    pub block: BlockEnv,
    /// Transaction context
    pub tx: TxEnv,
}

impl Environment {
    /// Create new environment
    pub fn new(block: BlockEnv, tx: TxEnv) -> Self {
        Self { block, tx }
    }
}

/// Per-frame call context
#[derive(Clone, Debug, Default)]
pub struct FrameContext {
    /// Address whose storage and balance the frame acts on
    pub address: Address,
    /// Caller address
    pub caller: Address,
    /// CALLVALUE
    pub value: U256,
    /// Call data
    pub input: Bytes,
    /// Whether this is a static call (no state modifications)
    pub is_static: bool,
    /// Call depth (0 for the top-level frame)
    pub depth: usize,
}
