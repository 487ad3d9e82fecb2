//! EVM operand stack

use crate::error::{EvmError, EvmResult};
use bach_primitives::U256;

/// Maximum number of words on the stack
pub const STACK_LIMIT: usize = 1024;

/// EVM stack (max 1024 words)
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<U256> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Pop `N` values, top first
    pub fn pop_n<const N: usize>(&mut self) -> EvmResult<[U256; N]> {
        if self.data.len() < N {
            return Err(EvmError::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Value at depth `n` (0 = top)
    pub fn peek(&self, n: usize) -> EvmResult<U256> {
        if n >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - n])
    }

    /// Swap top with item at depth `n` (1 = second item)
    pub fn swap(&mut self, n: usize) -> EvmResult<()> {
        let len = self.data.len();
        if n == 0 || n >= len {
            return Err(EvmError::StackUnderflow);
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Push a copy of the item at depth `n - 1` (1 = duplicate top)
    pub fn dup(&mut self, n: usize) -> EvmResult<()> {
        if n == 0 || n > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - n];
        self.push(value)
    }

    /// Items from bottom to top
    pub fn as_slice(&self) -> &[U256] {
        &self.data
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
