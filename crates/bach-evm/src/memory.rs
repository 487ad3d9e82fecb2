//! EVM memory implementation
//!
//! Byte-addressable and grows in 32-byte words. Callers charge expansion gas
//! through [`crate::gas::memory_expansion_cost`] before touching a new range;
//! the methods here only resize and copy.

use bach_primitives::U256;

/// EVM memory (byte-addressable, expandable)
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes (always a multiple of 32)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size in words
    pub fn words(&self) -> usize {
        self.data.len() / 32
    }

    /// Grow to cover `offset..offset + len`, rounded up to a word boundary.
    /// A zero length never grows memory.
    pub fn resize(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let end = offset.saturating_add(len);
        if end > self.data.len() {
            self.data.resize(end.div_ceil(32) * 32, 0);
        }
    }

    /// Load a 32-byte word
    pub fn load_word(&self, offset: usize) -> U256 {
        U256::from_big_endian(&self.read(offset, 32))
    }

    /// Store a 32-byte word
    pub fn store_word(&mut self, offset: usize, value: U256) {
        let mut buf = [0u8; 32];
        value.to_big_endian(&mut buf);
        self.store(offset, &buf);
    }

    /// Store a single byte
    pub fn store8(&mut self, offset: usize, value: u8) {
        self.resize(offset, 1);
        self.data[offset] = value;
    }

    /// Copy `len` bytes starting at `offset`; bytes past the end read as zero
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        if offset < self.data.len() {
            let end = offset.saturating_add(len).min(self.data.len());
            out[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        out
    }

    /// Borrow a range that has already been resized into
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        if len == 0 {
            return &[];
        }
        &self.data[offset..offset + len]
    }

    /// Write bytes at `offset`, growing as needed
    pub fn store(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.resize(offset, bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Write `len` bytes at `offset` taken from `source` at `source_offset`,
    /// zero-filling whatever lies past the end of `source`
    pub fn store_padded(&mut self, offset: usize, len: usize, source: &[u8], source_offset: usize) {
        if len == 0 {
            return;
        }
        self.resize(offset, len);
        let dest = &mut self.data[offset..offset + len];
        let available = source.len().saturating_sub(source_offset).min(len);
        if available > 0 {
            dest[..available].copy_from_slice(&source[source_offset..source_offset + available]);
        }
        dest[available..].fill(0);
    }

    /// Overlap-safe copy within memory (MCOPY)
    pub fn copy_within(&mut self, dest: usize, src: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.resize(dest.max(src), len);
        self.data.copy_within(src..src + len, dest);
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
