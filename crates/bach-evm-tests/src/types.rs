//! Type definitions for the VMTest JSON fixture format

use bach_evm::Hardfork;
use bach_primitives::{Address, H256, U256};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

fn hex_body<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(s.strip_prefix("0x").unwrap_or(&s).to_string())
}

/// Hex-encoded bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_body(deserializer)?;
        hex::decode(&s).map(HexBytes).map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded 256-bit word; odd lengths and short values are accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HexWord(pub U256);

impl<'de> Deserialize<'de> for HexWord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_body(deserializer)?;
        parse_word(&s).map(HexWord).map_err(serde::de::Error::custom)
    }
}

/// Parse a hex word with or without `0x`
pub fn parse_word(s: &str) -> Result<U256, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(s, 16).map_err(|e| format!("invalid word {s}: {e:?}"))
}

/// Hex-encoded u64
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HexU64(pub u64);

impl<'de> Deserialize<'de> for HexU64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_body(deserializer)?;
        if s.is_empty() {
            return Ok(HexU64(0));
        }
        u64::from_str_radix(&s, 16)
            .map(HexU64)
            .map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexAddress(pub Address);

impl<'de> Deserialize<'de> for HexAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Address::from_hex(&s)
            .map(HexAddress)
            .map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded 32-byte hash; short values are left-padded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HexH256(pub H256);

impl<'de> Deserialize<'de> for HexH256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = hex_body(deserializer)?;
        let word = parse_word(&s).map_err(serde::de::Error::custom)?;
        Ok(HexH256(H256::from_word(word)))
    }
}

// =============================================================================
// VM Test Types
// =============================================================================

/// VM test file structure (test name -> test case), in name order
pub type VmTestFile = BTreeMap<String, VmTestCase>;

/// Single VM test case
#[derive(Debug, Deserialize)]
pub struct VmTestCase {
    /// Rule set; the runner's default when absent
    #[serde(default)]
    pub fork: Option<Hardfork>,
    /// Environment info
    pub env: VmEnv,
    /// Execution parameters
    pub exec: VmExec,
    /// Expected gas remaining (None if execution should fail)
    pub gas: Option<HexU64>,
    /// Expected logs hash (not checked)
    pub logs: Option<HexH256>,
    /// Expected output
    pub out: Option<HexBytes>,
    /// Pre-execution state
    pub pre: BTreeMap<HexAddress, AccountState>,
    /// Post-execution state (None if execution should fail)
    pub post: Option<BTreeMap<HexAddress, AccountState>>,
}

/// VM test environment
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmEnv {
    /// Current coinbase
    pub current_coinbase: HexAddress,
    /// Current difficulty
    pub current_difficulty: HexWord,
    /// Current gas limit
    pub current_gas_limit: HexU64,
    /// Current block number
    pub current_number: HexU64,
    /// Current timestamp
    pub current_timestamp: HexU64,
    /// Current base fee (EIP-1559)
    pub current_base_fee: Option<HexWord>,
    /// Current random (post-merge)
    pub current_random: Option<HexH256>,
}

/// VM test execution parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmExec {
    /// Address of the executing account
    pub address: HexAddress,
    /// Caller address
    pub caller: HexAddress,
    /// Code to execute
    pub code: HexBytes,
    /// Input data
    pub data: HexBytes,
    /// Gas provided
    pub gas: HexU64,
    /// Gas price
    pub gas_price: HexWord,
    /// Origin address
    pub origin: HexAddress,
    /// Value transferred
    pub value: HexWord,
}

/// Account state
#[derive(Debug, Deserialize)]
pub struct AccountState {
    /// Balance
    pub balance: HexWord,
    /// Code
    pub code: HexBytes,
    /// Nonce
    pub nonce: HexU64,
    /// Storage (hex key -> value)
    pub storage: BTreeMap<String, HexWord>,
}
