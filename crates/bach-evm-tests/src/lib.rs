//! # bach-evm-tests
//!
//! JSON fixture runner for the BachLedger EVM.
//!
//! This crate provides:
//! - Parsing for the VMTest JSON format (`env`, `exec`, `pre`, `gas`, `out`, `post`)
//! - A runner that executes each case through [`bach_evm::Evm`]
//! - Result aggregation and reporting
//!
//! A case without `gas` and `post` is expected to fail.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod runner;
mod types;
mod vm_test;

pub use error::{TestError, TestResult};
pub use runner::{TestRunner, TestStats};
pub use types::*;
pub use vm_test::{VmTestResults, VmTestRunner};
