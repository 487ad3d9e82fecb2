//! # bach-state
//!
//! Account and storage state for the BachLedger EVM.
//!
//! This crate provides:
//! - Account model and event log record
//! - Backend traits (`StateReader`/`StateWriter`) and an in-memory backend
//! - `JournaledState`: per-transaction cache with nested snapshot/revert,
//!   warm access sets, transient storage and destruction bookkeeping

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod error;
mod in_memory;
mod journal;
mod log;
mod traits;

pub use account::{Account, EMPTY_CODE_HASH};
pub use error::{StateError, StateResult};
pub use in_memory::InMemoryDb;
pub use journal::{Checkpoint, JournaledState, SlotValue};
pub use log::Log;
pub use traits::{State, StateReader, StateWriter};
