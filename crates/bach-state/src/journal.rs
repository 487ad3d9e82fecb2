//! Journaled state with nested snapshot/revert
//!
//! Every mutation made during a transaction is applied to an in-memory cache
//! over the backend and recorded in a flat journal. A [`Checkpoint`] is the
//! journal length at the time it was taken; reverting pops and undoes entries
//! until the journal is back to that length. Checkpoints must be released in
//! LIFO order, matching call-frame nesting.
//!
//! Nothing reaches the backend until [`JournaledState::finalize`].

use crate::account::{Account, EMPTY_CODE_HASH};
use crate::error::{StateError, StateResult};
use crate::log::Log;
use crate::traits::{StateReader, StateWriter};
use bach_crypto::keccak256;
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// Opaque snapshot token returned by [`JournaledState::snapshot`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    journal_len: usize,
}

/// Undo record for one mutation
#[derive(Clone, Debug, PartialEq, Eq)]
enum JournalEntry {
    /// Balance, nonce, code hash or existence changed
    AccountChanged {
        address: Address,
        previous: Option<Account>,
    },
    StorageChanged {
        address: Address,
        key: U256,
        previous: U256,
    },
    TransientChanged {
        address: Address,
        key: U256,
        previous: U256,
    },
    AddressWarmed(Address),
    SlotWarmed(Address, U256),
    LogEmitted,
    /// Code blob first queued for writing at finalize
    CodeAdded(H256),
    AccountCreated(Address),
    AccountDestroyed(Address),
}

#[derive(Clone, Debug)]
struct CachedAccount {
    /// Value as seen by execution; `None` means the account does not exist
    present: Option<Account>,
    /// Value last read from or written to the backend
    loaded: Option<Account>,
}

#[derive(Clone, Copy, Debug)]
struct CachedSlot {
    /// Value at the start of the transaction
    original: U256,
    present: U256,
}

/// Current and transaction-start value of a storage slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotValue {
    /// Value when the transaction started
    pub original: U256,
    /// Value now
    pub present: U256,
}

/// Account and storage state for one transaction at a time
pub struct JournaledState<DB> {
    db: DB,
    accounts: HashMap<Address, CachedAccount>,
    storage: HashMap<(Address, U256), CachedSlot>,
    code: HashMap<H256, Bytes>,
    new_code: HashSet<H256>,
    transient: HashMap<(Address, U256), U256>,
    warm_addresses: HashSet<Address>,
    warm_slots: HashSet<(Address, U256)>,
    logs: Vec<Log>,
    created: HashSet<Address>,
    destroyed: HashSet<Address>,
    journal: Vec<JournalEntry>,
}

impl<DB: StateReader> JournaledState<DB> {
    /// Wrap a backend
    pub fn new(db: DB) -> Self {
        Self {
            db,
            accounts: HashMap::new(),
            storage: HashMap::new(),
            code: HashMap::new(),
            new_code: HashSet::new(),
            transient: HashMap::new(),
            warm_addresses: HashSet::new(),
            warm_slots: HashSet::new(),
            logs: Vec::new(),
            created: HashSet::new(),
            destroyed: HashSet::new(),
            journal: Vec::new(),
        }
    }

    /// The wrapped backend
    pub fn db(&self) -> &DB {
        &self.db
    }

    /// Unwrap the backend, dropping uncommitted changes
    pub fn into_inner(self) -> DB {
        self.db
    }

    fn load_account(&mut self, address: Address) -> StateResult<&mut CachedAccount> {
        if !self.accounts.contains_key(&address) {
            let loaded = self.db.get_account(&address)?;
            self.accounts.insert(
                address,
                CachedAccount {
                    present: loaded.clone(),
                    loaded,
                },
            );
        }
        // Inserted above when missing
        self.accounts
            .get_mut(&address)
            .ok_or_else(|| StateError::Backend(format!("account cache miss for {address}")))
    }

    fn load_slot(&mut self, address: Address, key: U256) -> StateResult<&mut CachedSlot> {
        if !self.storage.contains_key(&(address, key)) {
            let value = if self.created.contains(&address) {
                U256::zero()
            } else {
                self.db.get_storage(&address, &key)?
            };
            self.storage.insert(
                (address, key),
                CachedSlot {
                    original: value,
                    present: value,
                },
            );
        }
        self.storage
            .get_mut(&(address, key))
            .ok_or_else(|| StateError::Backend(format!("slot cache miss for {address}")))
    }

    // ==================== Reads ====================

    /// Account at `address`; a missing account reads as the empty account
    pub fn account(&mut self, address: Address) -> StateResult<Account> {
        Ok(self.load_account(address)?.present.clone().unwrap_or_default())
    }

    /// Whether the account exists at all
    pub fn exists(&mut self, address: Address) -> StateResult<bool> {
        Ok(self.load_account(address)?.present.is_some())
    }

    /// Missing or EIP-161 empty
    pub fn is_empty(&mut self, address: Address) -> StateResult<bool> {
        Ok(self
            .load_account(address)?
            .present
            .as_ref()
            .map_or(true, Account::is_empty))
    }

    /// Balance of an account
    pub fn balance(&mut self, address: Address) -> StateResult<U256> {
        Ok(self.account(address)?.balance)
    }

    /// Nonce of an account
    pub fn nonce(&mut self, address: Address) -> StateResult<u64> {
        Ok(self.account(address)?.nonce)
    }

    /// Code deployed at an address
    pub fn code(&mut self, address: Address) -> StateResult<(Bytes, H256)> {
        let code_hash = self.account(address)?.code_hash;
        if code_hash == EMPTY_CODE_HASH || code_hash.is_zero() {
            return Ok((Bytes::new(), EMPTY_CODE_HASH));
        }
        if let Some(code) = self.code.get(&code_hash) {
            return Ok((code.clone(), code_hash));
        }
        let code = self
            .db
            .get_code(&code_hash)?
            .ok_or(StateError::MissingCode(code_hash))?;
        self.code.insert(code_hash, code.clone());
        Ok((code, code_hash))
    }

    /// Current value of a storage slot
    pub fn storage(&mut self, address: Address, key: U256) -> StateResult<U256> {
        Ok(self.load_slot(address, key)?.present)
    }

    /// Current and transaction-start value of a storage slot
    pub fn slot(&mut self, address: Address, key: U256) -> StateResult<SlotValue> {
        let slot = self.load_slot(address, key)?;
        Ok(SlotValue {
            original: slot.original,
            present: slot.present,
        })
    }

    /// Hash of a historical block from the backend
    pub fn block_hash(&self, number: u64) -> StateResult<H256> {
        self.db.block_hash(number)
    }

    // ==================== Account writes ====================

    fn modify_account<F>(&mut self, address: Address, f: F) -> StateResult<()>
    where
        F: FnOnce(&mut Account) -> StateResult<()>,
    {
        let cached = self.load_account(address)?;
        let previous = cached.present.clone();
        let mut account = previous.clone().unwrap_or_default();
        f(&mut account)?;
        cached.present = Some(account);
        self.journal
            .push(JournalEntry::AccountChanged { address, previous });
        Ok(())
    }

    /// Overwrite a balance
    pub fn set_balance(&mut self, address: Address, balance: U256) -> StateResult<()> {
        self.modify_account(address, |account| {
            account.balance = balance;
            Ok(())
        })
    }

    /// Credit an account
    pub fn add_balance(&mut self, address: Address, amount: U256) -> StateResult<()> {
        self.modify_account(address, |account| {
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(StateError::BalanceOverflow(address))?;
            Ok(())
        })
    }

    /// Debit an account
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> StateResult<()> {
        self.modify_account(address, |account| {
            if account.balance < amount {
                return Err(StateError::InsufficientBalance {
                    address,
                    available: account.balance,
                    required: amount,
                });
            }
            account.balance -= amount;
            Ok(())
        })
    }

    /// Move `value` wei between accounts. A zero transfer touches nothing.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> StateResult<()> {
        if value.is_zero() {
            return Ok(());
        }
        let available = self.balance(from)?;
        if available < value {
            return Err(StateError::InsufficientBalance {
                address: from,
                available,
                required: value,
            });
        }
        if from == to {
            return Ok(());
        }
        self.sub_balance(from, value)?;
        self.add_balance(to, value)
    }

    /// Overwrite a nonce
    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> StateResult<()> {
        self.modify_account(address, |account| {
            account.nonce = nonce;
            Ok(())
        })
    }

    /// Increment the nonce, returning the new value
    pub fn increment_nonce(&mut self, address: Address) -> StateResult<u64> {
        let mut new_nonce = 0;
        self.modify_account(address, |account| {
            account.nonce = account
                .nonce
                .checked_add(1)
                .ok_or(StateError::NonceOverflow(address))?;
            new_nonce = account.nonce;
            Ok(())
        })?;
        Ok(new_nonce)
    }

    /// Install code at an address, returning its hash
    pub fn set_code(&mut self, address: Address, code: Bytes) -> StateResult<H256> {
        let code_hash = if code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            let hash = keccak256(&code);
            self.code.insert(hash, code);
            if self.new_code.insert(hash) {
                self.journal.push(JournalEntry::CodeAdded(hash));
            }
            hash
        };
        self.modify_account(address, |account| {
            account.code_hash = code_hash;
            Ok(())
        })?;
        Ok(code_hash)
    }

    // ==================== Storage writes ====================

    /// Write a storage slot, returning the previous value
    pub fn set_storage(&mut self, address: Address, key: U256, value: U256) -> StateResult<U256> {
        let slot = self.load_slot(address, key)?;
        let previous = slot.present;
        slot.present = value;
        self.journal.push(JournalEntry::StorageChanged {
            address,
            key,
            previous,
        });
        Ok(previous)
    }

    /// Read transient storage (EIP-1153)
    pub fn tload(&self, address: Address, key: U256) -> U256 {
        self.transient
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    /// Write transient storage (EIP-1153)
    pub fn tstore(&mut self, address: Address, key: U256, value: U256) {
        let previous = if value.is_zero() {
            self.transient.remove(&(address, key))
        } else {
            self.transient.insert((address, key), value)
        }
        .unwrap_or_default();
        self.journal.push(JournalEntry::TransientChanged {
            address,
            key,
            previous,
        });
    }

    // ==================== Access sets ====================

    /// Whether the address was already touched this transaction
    pub fn is_warm_address(&self, address: &Address) -> bool {
        self.warm_addresses.contains(address)
    }

    /// Mark an address warm; returns true if it was cold
    pub fn warm_address(&mut self, address: Address) -> bool {
        let was_cold = self.warm_addresses.insert(address);
        if was_cold {
            self.journal.push(JournalEntry::AddressWarmed(address));
        }
        was_cold
    }

    /// Whether the slot was already touched this transaction
    pub fn is_warm_slot(&self, address: &Address, key: &U256) -> bool {
        self.warm_slots.contains(&(*address, *key))
    }

    /// Mark a slot warm; returns true if it was cold
    pub fn warm_slot(&mut self, address: Address, key: U256) -> bool {
        let was_cold = self.warm_slots.insert((address, key));
        if was_cold {
            self.journal.push(JournalEntry::SlotWarmed(address, key));
        }
        was_cold
    }

    // ==================== Substate ====================

    /// Record a log
    pub fn log(&mut self, log: Log) {
        self.logs.push(log);
        self.journal.push(JournalEntry::LogEmitted);
    }

    /// Logs emitted so far and not reverted
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Remember that the account was created in this transaction
    pub fn mark_created(&mut self, address: Address) {
        if self.created.insert(address) {
            self.journal.push(JournalEntry::AccountCreated(address));
        }
    }

    /// Whether the account was created in this transaction
    pub fn is_created(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    /// Schedule the account for deletion at the end of the transaction
    pub fn mark_destroyed(&mut self, address: Address) {
        if self.destroyed.insert(address) {
            self.journal.push(JournalEntry::AccountDestroyed(address));
        }
    }

    /// Whether the account is scheduled for deletion
    pub fn is_destroyed(&self, address: &Address) -> bool {
        self.destroyed.contains(address)
    }

    // ==================== Checkpoints ====================

    /// Take a snapshot of the current state
    pub fn snapshot(&self) -> Checkpoint {
        Checkpoint {
            journal_len: self.journal.len(),
        }
    }

    /// Keep every change made since `checkpoint`
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.journal_len <= self.journal.len());
    }

    /// Undo every change made since `checkpoint`, newest first
    pub fn revert(&mut self, checkpoint: Checkpoint) {
        let target = checkpoint.journal_len.min(self.journal.len());
        let undone = self.journal.len() - target;
        while self.journal.len() > target {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        tracing::trace!(undone, "journal reverted");
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountChanged { address, previous } => {
                if let Some(cached) = self.accounts.get_mut(&address) {
                    cached.present = previous;
                }
            }
            JournalEntry::StorageChanged {
                address,
                key,
                previous,
            } => {
                if let Some(slot) = self.storage.get_mut(&(address, key)) {
                    slot.present = previous;
                }
            }
            JournalEntry::TransientChanged {
                address,
                key,
                previous,
            } => {
                if previous.is_zero() {
                    self.transient.remove(&(address, key));
                } else {
                    self.transient.insert((address, key), previous);
                }
            }
            JournalEntry::AddressWarmed(address) => {
                self.warm_addresses.remove(&address);
            }
            JournalEntry::SlotWarmed(address, key) => {
                self.warm_slots.remove(&(address, key));
            }
            JournalEntry::LogEmitted => {
                self.logs.pop();
            }
            JournalEntry::CodeAdded(hash) => {
                self.new_code.remove(&hash);
            }
            JournalEntry::AccountCreated(address) => {
                self.created.remove(&address);
            }
            JournalEntry::AccountDestroyed(address) => {
                self.destroyed.remove(&address);
            }
        }
    }

    /// Drop per-transaction bookkeeping without touching the backend
    pub fn discard_transaction(&mut self) -> Vec<Log> {
        self.revert(Checkpoint { journal_len: 0 });
        self.reset_transaction()
    }

    fn reset_transaction(&mut self) -> Vec<Log> {
        self.journal.clear();
        self.transient.clear();
        self.warm_addresses.clear();
        self.warm_slots.clear();
        self.created.clear();
        self.destroyed.clear();
        self.new_code.clear();
        std::mem::take(&mut self.logs)
    }
}

impl<DB: StateReader + StateWriter> JournaledState<DB> {
    /// Write the transaction's changes to the backend and reset the
    /// per-transaction sets. Returns the logs.
    ///
    /// Destroyed accounts are deleted with their storage; accounts left
    /// empty are removed (EIP-161).
    pub fn finalize(&mut self) -> StateResult<Vec<Log>> {
        for address in &self.destroyed {
            if let Some(cached) = self.accounts.get_mut(address) {
                cached.present = None;
            }
        }

        let mut slots_written = 0usize;
        for (&(address, key), slot) in self.storage.iter_mut() {
            if self.destroyed.contains(&address) {
                slot.original = U256::zero();
                slot.present = U256::zero();
                continue;
            }
            if slot.present != slot.original {
                self.db.set_storage(address, key, slot.present)?;
                slots_written += 1;
            }
            slot.original = slot.present;
        }

        for hash in &self.new_code {
            if let Some(code) = self.code.get(hash) {
                self.db.set_code(*hash, code.clone())?;
            }
        }

        let mut accounts_written = 0usize;
        for (address, cached) in self.accounts.iter_mut() {
            if cached.present == cached.loaded {
                continue;
            }
            match &cached.present {
                Some(account) if !account.is_empty() => {
                    self.db.set_account(*address, account.clone())?;
                }
                _ => {
                    self.db.delete_account(address)?;
                    cached.present = None;
                }
            }
            cached.loaded = cached.present.clone();
            accounts_written += 1;
        }

        tracing::debug!(
            accounts = accounts_written,
            slots = slots_written,
            destroyed = self.destroyed.len(),
            logs = self.logs.len(),
            "state committed"
        );

        Ok(self.reset_transaction())
    }
}
