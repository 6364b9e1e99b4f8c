// Prometheus metrics for the Learnbase API

use lazy_static::lazy_static;
use learnbase_common::types::Verdict;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref VALIDATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("learnbase_validations_total", "Validations by outcome"),
        &["outcome"]
    )
    .expect("metric can be created");
    pub static ref TEST_CASES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("learnbase_test_cases_total", "Executed test cases by status"),
        &["status"]
    )
    .expect("metric can be created");
    pub static ref VALIDATION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "learnbase_validation_duration_seconds",
            "Wall time spent validating one submission"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    )
    .expect("metric can be created");
    pub static ref EXERCISES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("learnbase_exercises_total", "Generated exercises by source"),
        &["source"]
    )
    .expect("metric can be created");
}

/// Register every collector with the shared registry. Safe to call more than once.
pub fn register() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(VALIDATIONS_TOTAL.clone()),
        Box::new(TEST_CASES_TOTAL.clone()),
        Box::new(VALIDATION_DURATION.clone()),
        Box::new(EXERCISES_TOTAL.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn outcome(verdict: &Verdict) -> &'static str {
    if verdict.passed {
        "passed"
    } else if verdict.results.is_empty() {
        // Only an unsupported language yields a failing verdict with no results
        "rejected"
    } else {
        "failed"
    }
}

pub fn record_validation(verdict: &Verdict, elapsed: Duration) {
    VALIDATIONS_TOTAL.with_label_values(&[outcome(verdict)]).inc();
    for result in &verdict.results {
        TEST_CASES_TOTAL
            .with_label_values(&[result.status.as_str()])
            .inc();
    }
    VALIDATION_DURATION.observe(elapsed.as_secs_f64());
}

pub fn record_exercise(source: &str) {
    EXERCISES_TOTAL.with_label_values(&[source]).inc();
}

/// Prometheus text exposition of everything registered
pub fn render() -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnbase_common::types::{TestResult, TestStatus};

    fn result(status: TestStatus) -> TestResult {
        TestResult {
            input: String::new(),
            expected_output: String::new(),
            actual_output: None,
            error_message: Some("x".to_string()),
            passed: status == TestStatus::Passed,
            status,
            execution_time_ms: 1,
        }
    }

    #[test]
    fn test_outcome_labels() {
        let passed = Verdict {
            passed: true,
            results: vec![],
            feedback: String::new(),
        };
        let rejected = Verdict {
            passed: false,
            results: vec![],
            feedback: String::new(),
        };
        let failed = Verdict {
            passed: false,
            results: vec![result(TestStatus::RuntimeError)],
            feedback: String::new(),
        };
        assert_eq!(outcome(&passed), "passed");
        assert_eq!(outcome(&rejected), "rejected");
        assert_eq!(outcome(&failed), "failed");
    }

    #[test]
    fn test_record_and_render() {
        register().unwrap();
        register().unwrap();

        let verdict = Verdict {
            passed: false,
            results: vec![result(TestStatus::TimeLimitExceeded)],
            feedback: String::new(),
        };
        let before = TEST_CASES_TOTAL
            .with_label_values(&["time_limit_exceeded"])
            .get();
        record_validation(&verdict, Duration::from_millis(20));
        assert_eq!(
            TEST_CASES_TOTAL
                .with_label_values(&["time_limit_exceeded"])
                .get(),
            before + 1
        );

        let text = render().unwrap();
        assert!(text.contains("learnbase_validations_total"));
        assert!(text.contains("learnbase_validation_duration_seconds"));
    }
}
