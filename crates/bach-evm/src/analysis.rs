//! JUMPDEST analysis and the shared analysis cache

use bach_primitives::H256;
use dashmap::DashMap;
use std::sync::Arc;

/// Bitmap of valid jump destinations
///
/// A byte is a valid destination when it is a JUMPDEST opcode and not part
/// of a PUSH immediate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JumpDests {
    bits: Vec<u64>,
    len: usize,
}

impl JumpDests {
    /// Scan `code` once
    pub fn analyze(code: &[u8]) -> Self {
        let mut bits = vec![0u64; code.len().div_ceil(64)];
        let mut i = 0;
        while i < code.len() {
            let op = code[i];
            if op == 0x5B {
                bits[i / 64] |= 1u64 << (i % 64);
            } else if (0x60..=0x7F).contains(&op) {
                // Skip PUSH operands
                i += (op - 0x5F) as usize;
            }
            i += 1;
        }
        Self {
            bits,
            len: code.len(),
        }
    }

    /// Whether `pc` is a JUMPDEST outside push data
    pub fn is_valid(&self, pc: usize) -> bool {
        pc < self.len && self.bits[pc / 64] & (1u64 << (pc % 64)) != 0
    }

    /// Number of valid destinations
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Analysis results keyed by code hash
///
/// Entries never change once inserted, so one cache can be shared by
/// `Evm` instances on different threads.
#[derive(Debug, Default)]
pub struct CodeCache {
    entries: DashMap<H256, Arc<JumpDests>>,
}

impl CodeCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached analysis of `code`, computing it on first use
    pub fn get_or_analyze(&self, code_hash: H256, code: &[u8]) -> Arc<JumpDests> {
        if let Some(entry) = self.entries.get(&code_hash) {
            return Arc::clone(entry.value());
        }
        let analysis = Arc::new(JumpDests::analyze(code));
        tracing::trace!(%code_hash, jumpdests = analysis.count(), "code analyzed");
        Arc::clone(self.entries.entry(code_hash).or_insert(analysis).value())
    }

    /// Number of analyzed codes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been analyzed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
