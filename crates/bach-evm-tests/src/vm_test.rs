//! VM test runner

use crate::error::{TestError, TestResult};
use crate::types::*;
use bach_evm::{
    BlockEnv, CallResult, CodeCache, Environment, Evm, EvmConfig, Hardfork, Transaction, TxEnv,
};
use bach_primitives::{Address, U256};
use bach_state::{Account, InMemoryDb, EMPTY_CODE_HASH};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// VM test runner
///
/// Seeds an [`InMemoryDb`] from each case's `pre` state, runs `exec` as a
/// message call and checks remaining gas, output and `post` storage.
pub struct VmTestRunner {
    /// Rule set for cases that do not name one
    hardfork: Hardfork,
    /// Jump table cache shared by every case
    code_cache: Arc<CodeCache>,
    /// Verbose output
    verbose: bool,
}

impl VmTestRunner {
    /// Create new VM test runner
    pub fn new(hardfork: Hardfork, verbose: bool) -> Self {
        Self {
            hardfork,
            code_cache: Arc::new(CodeCache::new()),
            verbose,
        }
    }

    /// Run all tests in a file
    pub fn run_file(&self, path: &Path) -> TestResult<VmTestResults> {
        let content = std::fs::read_to_string(path)?;
        self.run_json(&path.to_string_lossy(), &content)
    }

    /// Run all tests in a JSON document
    pub fn run_json(&self, source: &str, json: &str) -> TestResult<VmTestResults> {
        let tests: VmTestFile = serde_json::from_str(json)?;
        let mut results = VmTestResults::new(source.to_string());

        for (name, test_case) in tests {
            match self.run_test(&name, &test_case) {
                Ok(()) => {
                    if self.verbose {
                        tracing::info!(test = %name, "PASS");
                    }
                    results.passed.push(name);
                }
                Err(e) => {
                    if self.verbose {
                        tracing::warn!(test = %name, error = %e, "FAIL");
                    }
                    results.failed.push((name, e.to_string()));
                }
            }
        }

        Ok(results)
    }

    /// Run a single test case
    pub fn run_test(&self, name: &str, test: &VmTestCase) -> TestResult<()> {
        let mut db = seed_state(&test.pre)?;
        if !test.exec.code.0.is_empty() {
            db.deploy(test.exec.address.0, test.exec.code.0.clone());
        }

        let config = EvmConfig::with_hardfork(test.fork.unwrap_or(self.hardfork));
        let result = {
            let mut evm = Evm::new(&mut db, build_environment(test), config)
                .with_code_cache(Arc::clone(&self.code_cache));
            evm.transact(Transaction::call(
                test.exec.caller.0,
                test.exec.address.0,
                test.exec.value.0,
                Bytes::from(test.exec.data.0.clone()),
                test.exec.gas.0,
            ))
        };

        tracing::debug!(
            test = name,
            success = result.success,
            gas_left = result.gas_left,
            exit = ?result.exit,
            "case executed"
        );

        self.check_result(test, &result, &db)
    }

    /// Check execution result against expected values
    fn check_result(&self, test: &VmTestCase, result: &CallResult, db: &InMemoryDb) -> TestResult<()> {
        let Some(expected_gas) = test.gas else {
            // No expected gas means execution must fail
            if result.success {
                return Err(TestError::Assertion(
                    "expected execution to fail, but it succeeded".to_string(),
                ));
            }
            return Ok(());
        };

        if !result.success {
            return Err(TestError::Assertion(format!(
                "expected success, got {:?}",
                result.exit
            )));
        }

        if result.gas_left != expected_gas.0 {
            return Err(TestError::Assertion(format!(
                "gas mismatch: expected {}, got {}",
                expected_gas.0, result.gas_left
            )));
        }

        if let Some(expected_out) = &test.out {
            if result.output.as_ref() != expected_out.0.as_slice() {
                return Err(TestError::Assertion(format!(
                    "output mismatch: expected 0x{}, got 0x{}",
                    hex::encode(&expected_out.0),
                    hex::encode(&result.output)
                )));
            }
        }

        if let Some(post) = &test.post {
            check_post_state(post, db)?;
        }

        Ok(())
    }
}

/// Build the backend from a `pre` section
fn seed_state(pre: &BTreeMap<HexAddress, AccountState>) -> TestResult<InMemoryDb> {
    let mut db = InMemoryDb::new();
    for (address, state) in pre {
        db.insert_account(
            address.0,
            Account {
                nonce: state.nonce.0,
                balance: state.balance.0,
                code_hash: EMPTY_CODE_HASH,
            },
        );
        if !state.code.0.is_empty() {
            db.deploy(address.0, state.code.0.clone());
        }
        for (key, value) in &state.storage {
            db.insert_storage(address.0, storage_key(key)?, value.0);
        }
    }
    Ok(db)
}

fn build_environment(test: &VmTestCase) -> Environment {
    let block = BlockEnv {
        number: test.env.current_number.0,
        timestamp: test.env.current_timestamp.0,
        gas_limit: test.env.current_gas_limit.0,
        coinbase: test.env.current_coinbase.0,
        base_fee: test.env.current_base_fee.map(|fee| fee.0).unwrap_or_default(),
        difficulty: test.env.current_difficulty.0,
        prevrandao: test.env.current_random.map(|random| random.0),
        ..BlockEnv::default()
    };
    let tx = TxEnv {
        origin: test.exec.origin.0,
        gas_price: test.exec.gas_price.0,
        ..TxEnv::default()
    };
    Environment::new(block, tx)
}

fn storage_key(key: &str) -> TestResult<U256> {
    parse_word(key).map_err(TestError::Parse)
}

/// Compare `post` storage and code with the backend
fn check_post_state(post: &BTreeMap<HexAddress, AccountState>, db: &InMemoryDb) -> TestResult<()> {
    for (address, expected) in post {
        let address: Address = address.0;
        for (key, value) in &expected.storage {
            let key = storage_key(key)?;
            let actual = db.storage_value(&address, key);
            if actual != value.0 {
                return Err(TestError::Assertion(format!(
                    "storage mismatch at {address} slot {key:#x}: expected {:#x}, got {actual:#x}",
                    value.0
                )));
            }
        }

        let actual_code = db.code_at(&address);
        if actual_code.as_ref() != expected.code.0.as_slice() {
            return Err(TestError::Assertion(format!(
                "code mismatch at {address}: expected {} bytes, got {}",
                expected.code.0.len(),
                actual_code.len()
            )));
        }
    }
    Ok(())
}

/// Results from running VM tests
#[derive(Debug, Default)]
pub struct VmTestResults {
    /// Source file
    pub source: String,
    /// Passed tests
    pub passed: Vec<String>,
    /// Failed tests with reasons
    pub failed: Vec<(String, String)>,
}

impl VmTestResults {
    /// Create new results container
    pub fn new(source: String) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Total number of tests
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// Pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 100.0;
        }
        (self.passed.len() as f64 / self.total() as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALLER: &str = "0xcd1722f3947def4cf144679da39c4c32bdc35681";
    const CONTRACT: &str = "0x0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6";

    fn case(code: &str, gas: Option<&str>, post_storage: &str) -> String {
        let expectation = match gas {
            Some(gas) => format!(
                r#""gas": "{gas}", "out": "0x", "post": {{ "{CONTRACT}": {{ "balance": "0x00", "code": "{code}", "nonce": "0x00", "storage": {post_storage} }} }},"#
            ),
            None => String::new(),
        };
        format!(
            r#"{{
                "env": {{
                    "currentCoinbase": "0x2adc25665018aa1fe0e6bc666dac8fc2697ff9ba",
                    "currentDifficulty": "0x020000",
                    "currentGasLimit": "0x0f4240",
                    "currentNumber": "0x01",
                    "currentTimestamp": "0x03e8"
                }},
                "exec": {{
                    "address": "{CONTRACT}",
                    "caller": "{CALLER}",
                    "code": "{code}",
                    "data": "0x",
                    "gas": "0x0186a0",
                    "gasPrice": "0x01",
                    "origin": "{CALLER}",
                    "value": "0x00"
                }},
                {expectation}
                "pre": {{
                    "{CALLER}": {{ "balance": "0x0de0b6b3a7640000", "code": "0x", "nonce": "0x00", "storage": {{}} }}
                }}
            }}"#
        )
    }

    fn file(cases: &[(&str, String)]) -> String {
        let body = cases
            .iter()
            .map(|(name, case)| format!(r#""{name}": {case}"#))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{body}}}")
    }

    // ==================== Runner tests ====================

    #[test]
    fn test_runner_creation() {
        let runner = VmTestRunner::new(Hardfork::Cancun, false);
        assert!(!runner.verbose);
        assert_eq!(runner.hardfork, Hardfork::Cancun);
    }

    #[test]
    fn test_sstore_case_passes() {
        // PUSH1 1, PUSH1 2, ADD, PUSH1 0, SSTORE: 4 * 3 + 22100
        let json = file(&[(
            "add",
            case("0x6001600201600055", Some("0x013040"), r#"{ "0x00": "0x03" }"#),
        )]);
        let results = VmTestRunner::new(Hardfork::Cancun, false)
            .run_json("inline", &json)
            .unwrap();
        assert!(results.failed.is_empty(), "{:?}", results.failed);
        assert_eq!(results.passed, vec!["add".to_string()]);
    }

    #[test]
    fn test_gas_mismatch_is_reported() {
        let json = file(&[(
            "add",
            case("0x6001600201600055", Some("0x013041"), r#"{ "0x00": "0x03" }"#),
        )]);
        let results = VmTestRunner::new(Hardfork::Cancun, false)
            .run_json("inline", &json)
            .unwrap();
        assert_eq!(results.failed.len(), 1);
        assert!(results.failed[0].1.contains("gas mismatch"));
    }

    #[test]
    fn test_storage_mismatch_is_reported() {
        let json = file(&[(
            "add",
            case("0x6001600201600055", Some("0x013040"), r#"{ "0x00": "0x04" }"#),
        )]);
        let results = VmTestRunner::new(Hardfork::Cancun, false)
            .run_json("inline", &json)
            .unwrap();
        assert!(results.failed[0].1.contains("storage mismatch"));
    }

    #[test]
    fn test_expected_failure() {
        // PUSH1 4, JUMP: destination is not a JUMPDEST
        let json = file(&[
            ("badJump", case("0x600456", None, "{}")),
            ("stop", case("0x00", None, "{}")),
        ]);
        let results = VmTestRunner::new(Hardfork::Cancun, false)
            .run_json("inline", &json)
            .unwrap();
        assert_eq!(results.passed, vec!["badJump".to_string()]);
        assert_eq!(results.failed.len(), 1);
        assert_eq!(results.failed[0].0, "stop");
        assert!((results.pass_rate() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_malformed_file() {
        let runner = VmTestRunner::new(Hardfork::Cancun, false);
        assert!(matches!(
            runner.run_json("inline", "{ \"x\": 1 }"),
            Err(TestError::Json(_))
        ));
    }

    #[test]
    fn test_empty_results() {
        let results = VmTestResults::new("none".to_string());
        assert_eq!(results.total(), 0);
        assert_eq!(results.pass_rate(), 100.0);
    }
}
