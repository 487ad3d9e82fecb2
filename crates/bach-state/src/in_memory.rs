//! In-memory state backend

use crate::account::{Account, EMPTY_CODE_HASH};
use crate::error::StateResult;
use crate::traits::{StateReader, StateWriter};
use bach_crypto::keccak256;
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;
use std::collections::HashMap;

/// Hash-map backed state, pre-populated by the host before execution
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryDb {
    accounts: HashMap<Address, Account>,
    storage: HashMap<(Address, U256), U256>,
    code: HashMap<H256, Bytes>,
    block_hashes: HashMap<u64, H256>,
}

impl InMemoryDb {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account
    pub fn insert_account(&mut self, address: Address, account: Account) -> &mut Self {
        self.accounts.insert(address, account);
        self
    }

    /// Set the balance of an account, creating it if needed
    pub fn set_balance(&mut self, address: Address, balance: U256) -> &mut Self {
        self.accounts.entry(address).or_default().balance = balance;
        self
    }

    /// Install code at an address, creating the account if needed.
    ///
    /// Returns the code hash.
    pub fn deploy(&mut self, address: Address, code: impl Into<Bytes>) -> H256 {
        let code = code.into();
        let code_hash = if code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            let hash = keccak256(&code);
            self.code.insert(hash, code);
            hash
        };
        self.accounts.entry(address).or_default().code_hash = code_hash;
        code_hash
    }

    /// Set a storage slot directly
    pub fn insert_storage(&mut self, address: Address, key: U256, value: U256) -> &mut Self {
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
        self
    }

    /// Record a historical block hash for BLOCKHASH
    pub fn insert_block_hash(&mut self, number: u64, hash: H256) -> &mut Self {
        self.block_hashes.insert(number, hash);
        self
    }

    /// Look up an account
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Storage value, zero when absent
    pub fn storage_value(&self, address: &Address, key: U256) -> U256 {
        self.storage.get(&(*address, key)).copied().unwrap_or_default()
    }

    /// Code deployed at an address
    pub fn code_at(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .and_then(|account| self.code.get(&account.code_hash))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of distinct code blobs
    pub fn code_count(&self) -> usize {
        self.code.len()
    }
}

impl StateReader for InMemoryDb {
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>> {
        Ok(self.accounts.get(address).cloned())
    }

    fn get_storage(&self, address: &Address, key: &U256) -> StateResult<U256> {
        Ok(self.storage_value(address, *key))
    }

    fn get_code(&self, code_hash: &H256) -> StateResult<Option<Bytes>> {
        if *code_hash == EMPTY_CODE_HASH {
            return Ok(Some(Bytes::new()));
        }
        Ok(self.code.get(code_hash).cloned())
    }

    fn block_hash(&self, number: u64) -> StateResult<H256> {
        Ok(self.block_hashes.get(&number).copied().unwrap_or_default())
    }
}

impl StateWriter for InMemoryDb {
    fn set_account(&mut self, address: Address, account: Account) -> StateResult<()> {
        self.accounts.insert(address, account);
        Ok(())
    }

    fn delete_account(&mut self, address: &Address) -> StateResult<()> {
        self.accounts.remove(address);
        self.storage.retain(|(owner, _), _| owner != address);
        Ok(())
    }

    fn set_storage(&mut self, address: Address, key: U256, value: U256) -> StateResult<()> {
        self.insert_storage(address, key, value);
        Ok(())
    }

    fn set_code(&mut self, code_hash: H256, code: Bytes) -> StateResult<()> {
        if code_hash != EMPTY_CODE_HASH {
            self.code.insert(code_hash, code);
        }
        Ok(())
    }
}
