/// Validator - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate harness, engine and evaluator to produce one verdict per submission.
///
/// **Architecture:**
/// 1. Resolve the language tag; unknown runtimes short-circuit (nothing is spawned)
/// 2. Compose the submission once (harness.rs) and stage it once (engine.rs)
/// 3. Run every test case in a fresh process with the shared deadline
/// 4. Score each run (evaluator.rs) and aggregate in input order
///
/// This module is the glue layer - it knows nothing about:
/// - How code executes (engine's job)
/// - How scoring works (evaluator's job)

use crate::engine::{ProcessEngine, StagedUnit};
use crate::evaluator;
use crate::harness;
use futures_util::stream::{self, StreamExt};
use learnbase_common::types::{Language, Submission, TestCase, TestResult, Verdict};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Validator {
    engine: ProcessEngine,
    timeout: Option<Duration>,
    max_parallel_tests: usize,
}

impl Validator {
    /// Sequential validator using each language's configured deadline
    pub fn new(engine: ProcessEngine) -> Self {
        Self {
            engine,
            timeout: None,
            max_parallel_tests: 1,
        }
    }

    /// Override the per-test-case deadline for every language.
    /// A zero deadline is ignored and the language's configured one applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Run up to `n` test cases at once. Results keep input order regardless.
    pub fn with_max_parallel_tests(mut self, n: usize) -> Self {
        self.max_parallel_tests = n.max(1);
        self
    }

    pub fn timeout_for(&self, language: &Language) -> Duration {
        self.timeout
            .unwrap_or_else(|| self.engine.default_timeout(language))
    }

    /// Validate a submission against all of its test cases.
    ///
    /// Never fails: infrastructure problems surface as `internal_error` results
    /// on the affected cases.
    #[instrument(
        skip(self, submission),
        fields(
            submission_id = %Uuid::new_v4(),
            language = ?submission.language,
            test_count = submission.test_cases.len()
        )
    )]
    pub async fn validate(&self, submission: &Submission) -> Verdict {
        let language = match Language::resolve(submission.language.as_deref()) {
            Ok(language) => language,
            Err(e) => {
                warn!(error = %e, "Rejecting submission");
                return evaluator::unsupported_language(&e);
            }
        };

        let timeout = self.timeout_for(&language);
        let unit = harness::compose(language, &submission.source_code);

        // Stage once; every run reads the same file
        let staged = match self.engine.stage(&unit).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(error = %e, "Failed to stage submission");
                let message = e.to_string();
                let results = submission
                    .test_cases
                    .iter()
                    .map(|tc| evaluator::internal_error(tc, &message))
                    .collect();
                return evaluator::aggregate(results);
            }
        };

        let unit_ref = &staged;
        let runs: Vec<_> = submission
            .test_cases
            .iter()
            .enumerate()
            .map(|(idx, tc)| self.run_case(unit_ref, idx + 1, tc, timeout))
            .collect();
        let results: Vec<TestResult> = stream::iter(runs)
            .buffered(self.max_parallel_tests)
            .collect()
            .await;

        // All runs have been reaped; the staged unit can go
        drop(staged);

        let verdict = evaluator::aggregate(results);
        info!(
            passed = verdict.passed,
            failed = verdict.failed_count(),
            "Validation completed"
        );
        verdict
    }

    async fn run_case(
        &self,
        staged: &StagedUnit,
        test_num: usize,
        test_case: &TestCase,
        timeout: Duration,
    ) -> TestResult {
        match self
            .engine
            .run_staged(staged, test_case.input.as_bytes(), timeout)
            .await
        {
            Ok(output) => {
                if output.timed_out {
                    warn!(test_num, execution_ms = output.execution_time_ms, "Test case timed out");
                }
                let result = evaluator::evaluate_test(&output, test_case, timeout);
                tracing::debug!(
                    test_num,
                    status = %result.status,
                    execution_ms = result.execution_time_ms,
                    "Test case evaluated"
                );
                result
            }
            Err(e) => {
                warn!(test_num, error = %e, "Test case could not be executed");
                evaluator::internal_error(test_case, &e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageConfigManager;

    fn validator() -> Validator {
        Validator::new(ProcessEngine::new(LanguageConfigManager::builtin()))
    }

    #[test]
    fn test_timeout_override() {
        let v = validator().with_timeout(Duration::from_millis(750));
        assert_eq!(v.timeout_for(&Language::Python), Duration::from_millis(750));
    }

    #[test]
    fn test_zero_timeout_falls_back_to_language_default() {
        let default = validator().timeout_for(&Language::Python);
        let v = validator().with_timeout(Duration::ZERO);
        assert!(!default.is_zero());
        assert_eq!(v.timeout_for(&Language::Python), default);
    }

    #[test]
    fn test_parallelism_is_at_least_one() {
        assert_eq!(validator().with_max_parallel_tests(0).max_parallel_tests, 1);
        assert_eq!(validator().with_max_parallel_tests(4).max_parallel_tests, 4);
    }
}
