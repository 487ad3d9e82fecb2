//! Backend traits for state access

use crate::account::Account;
use crate::error::StateResult;
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;

/// Read access to state
pub trait StateReader {
    /// Get account by address
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>>;

    /// Get storage value (zero when absent)
    fn get_storage(&self, address: &Address, key: &U256) -> StateResult<U256>;

    /// Get contract code by hash
    fn get_code(&self, code_hash: &H256) -> StateResult<Option<Bytes>>;

    /// Hash of a historical block, zero when unknown
    fn block_hash(&self, _number: u64) -> StateResult<H256> {
        Ok(H256::ZERO)
    }

    /// Check if account exists
    fn account_exists(&self, address: &Address) -> StateResult<bool> {
        Ok(self.get_account(address)?.is_some())
    }

    /// Get account nonce
    fn get_nonce(&self, address: &Address) -> StateResult<u64> {
        Ok(self.get_account(address)?.map(|a| a.nonce).unwrap_or(0))
    }

    /// Get account balance
    fn get_balance(&self, address: &Address) -> StateResult<U256> {
        Ok(self.get_account(address)?.map(|a| a.balance).unwrap_or_default())
    }
}

/// Write access to state
pub trait StateWriter {
    /// Set account
    fn set_account(&mut self, address: Address, account: Account) -> StateResult<()>;

    /// Delete account together with its storage
    fn delete_account(&mut self, address: &Address) -> StateResult<()>;

    /// Set storage value; zero removes the slot
    fn set_storage(&mut self, address: Address, key: U256, value: U256) -> StateResult<()>;

    /// Set contract code
    fn set_code(&mut self, code_hash: H256, code: Bytes) -> StateResult<()>;
}

impl<T: StateReader + ?Sized> StateReader for &T {
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>> {
        (**self).get_account(address)
    }

    fn get_storage(&self, address: &Address, key: &U256) -> StateResult<U256> {
        (**self).get_storage(address, key)
    }

    fn get_code(&self, code_hash: &H256) -> StateResult<Option<Bytes>> {
        (**self).get_code(code_hash)
    }

    fn block_hash(&self, number: u64) -> StateResult<H256> {
        (**self).block_hash(number)
    }
}

impl<T: StateReader + ?Sized> StateReader for &mut T {
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>> {
        (**self).get_account(address)
    }

    fn get_storage(&self, address: &Address, key: &U256) -> StateResult<U256> {
        (**self).get_storage(address, key)
    }

    fn get_code(&self, code_hash: &H256) -> StateResult<Option<Bytes>> {
        (**self).get_code(code_hash)
    }

    fn block_hash(&self, number: u64) -> StateResult<H256> {
        (**self).block_hash(number)
    }
}

impl<T: StateWriter + ?Sized> StateWriter for &mut T {
    fn set_account(&mut self, address: Address, account: Account) -> StateResult<()> {
        (**self).set_account(address, account)
    }

    fn delete_account(&mut self, address: &Address) -> StateResult<()> {
        (**self).delete_account(address)
    }

    fn set_storage(&mut self, address: Address, key: U256, value: U256) -> StateResult<()> {
        (**self).set_storage(address, key, value)
    }

    fn set_code(&mut self, code_hash: H256, code: Bytes) -> StateResult<()> {
        (**self).set_code(code_hash, code)
    }
}

/// Combined read/write state access
pub trait State: StateReader + StateWriter {}

impl<T: StateReader + StateWriter> State for T {}
