//! Event log records

use bach_primitives::{Address, H256};
use bytes::Bytes;

/// Log entry emitted by LOG0..LOG4
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics (at most four)
    pub topics: Vec<H256>,
    /// Unindexed payload
    pub data: Bytes,
}
