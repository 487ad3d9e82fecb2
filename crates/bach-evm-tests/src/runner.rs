//! Test runner and statistics

use crate::error::TestResult;
use crate::vm_test::{VmTestResults, VmTestRunner};
use bach_evm::Hardfork;
use std::path::Path;
use std::time::{Duration, Instant};

/// Aggregated test statistics
#[derive(Debug, Default)]
pub struct TestStats {
    /// Total tests executed
    pub total: usize,
    /// Tests passed
    pub passed: usize,
    /// Tests failed
    pub failed: usize,
    /// Files that could not be parsed
    pub unreadable: usize,
    /// Total execution time
    pub duration: Duration,
    /// Failed test names with reasons
    pub failures: Vec<(String, String)>,
}

impl TestStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add VM test results
    pub fn add_vm_results(&mut self, results: &VmTestResults) {
        self.total += results.total();
        self.passed += results.passed.len();
        self.failed += results.failed.len();
        for (name, reason) in &results.failed {
            self.failures
                .push((format!("{}::{}", results.source, name), reason.clone()));
        }
    }

    /// Pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.passed as f64 / self.total as f64) * 100.0
    }

    /// Whether every executed case passed and every file parsed
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.unreadable == 0
    }

    /// Log a summary
    pub fn print_summary(&self) {
        tracing::info!(
            total = self.total,
            passed = self.passed,
            failed = self.failed,
            unreadable = self.unreadable,
            pass_rate = format!("{:.2}%", self.pass_rate()),
            duration = format!("{:.2}s", self.duration.as_secs_f64()),
            "test summary"
        );
        for (name, reason) in &self.failures {
            tracing::warn!(test = %name, %reason, "failed");
        }
    }
}

/// Walks fixture directories and runs every JSON file it finds
pub struct TestRunner {
    vm_runner: VmTestRunner,
    verbose: bool,
}

impl TestRunner {
    /// Create new test runner
    pub fn new(hardfork: Hardfork, verbose: bool) -> Self {
        Self {
            vm_runner: VmTestRunner::new(hardfork, verbose),
            verbose,
        }
    }

    /// Run VM tests from directory
    pub fn run_vm_tests(&self, dir: &Path) -> TestResult<TestStats> {
        let mut stats = TestStats::new();
        let start = Instant::now();

        if self.verbose {
            tracing::info!(dir = %dir.display(), "running VM tests");
        }

        self.run_vm_tests_recursive(dir, &mut stats)?;

        stats.duration = start.elapsed();
        Ok(stats)
    }

    fn run_vm_tests_recursive(&self, dir: &Path, stats: &mut TestStats) -> TestResult<()> {
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "directory not found");
            return Ok(());
        }

        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.run_vm_tests_recursive(&path, stats)?;
            } else if path.extension().is_some_and(|e| e == "json") {
                match self.vm_runner.run_file(&path) {
                    Ok(results) => {
                        if self.verbose && !results.failed.is_empty() {
                            tracing::info!(
                                file = %path.display(),
                                passed = results.passed.len(),
                                failed = results.failed.len(),
                                "file done"
                            );
                        }
                        stats.add_vm_results(&results);
                    }
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "unreadable fixture");
                        stats.unreadable += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run the `VMTests` directory under a fixture root
    pub fn run_all(&self, tests_dir: &Path) -> TestResult<TestStats> {
        self.run_vm_tests(&tests_dir.join("VMTests"))
    }
}
