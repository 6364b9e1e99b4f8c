/// Test Evaluator - Scoring Logic
///
/// **Core Responsibility:**
/// Turn raw execution outputs into per-case results and an aggregate verdict.
///
/// **Critical Properties:**
/// - Knows nothing about processes or temp files
/// - Knows nothing about language runtimes beyond the harness marker
/// - Pure functions: (execution output, test case) → TestResult
///
/// **Comparison Rules:**
/// - Exact byte equality between stdout and the expected output
/// - No trimming, no newline normalization, no numeric tolerance
///
/// **Error Classification (checked in this order):**
/// 1. Timeout → TimeLimitExceeded
/// 2. Reserved harness exit code plus the harness marker → MissingEntryPoint
/// 3. Any other non-zero exit → RuntimeError
/// 4. Exit 0 → Passed or WrongAnswer

use crate::harness::{is_missing_entry_point, ENTRY_POINT, MISSING_ENTRY_POINT_MARKER};
use learnbase_common::types::{TestCase, TestResult, TestStatus, UnsupportedLanguage, Verdict};
use std::time::Duration;

/// Exit code recorded when the process was killed at the deadline
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Upper bound on error messages copied from stderr
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

pub const ALL_PASSED_FEEDBACK: &str = "Great job! All tests passed.";

/// Raw execution output for a single test case
/// Produced by the engine, consumed by the evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    /// Exit code of the direct child when it had already exited before a
    /// deadline that still expired: a descendant kept the output pipes open
    pub leader_exit_code: Option<i32>,
    pub execution_time_ms: u64,
}

impl ExecutionResult {
    /// Finished on its own with exit code 0
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Cut `message` down to at most `max_chars` characters, on a char boundary
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

fn failed(test_case: &TestCase, status: TestStatus, message: String, time_ms: u64) -> TestResult {
    TestResult {
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: None,
        error_message: Some(message),
        passed: false,
        status,
        execution_time_ms: time_ms,
    }
}

/// Evaluate a single test case execution output
pub fn evaluate_test(output: &ExecutionResult, test_case: &TestCase, timeout: Duration) -> TestResult {
    if output.timed_out {
        let message = match output.leader_exit_code {
            Some(code) => format!(
                "Execution timed out after {} ms: the program exited with code {} \
                 but a background process kept its output open",
                timeout.as_millis(),
                code
            ),
            None => format!("Execution timed out after {} ms", timeout.as_millis()),
        };
        return failed(
            test_case,
            TestStatus::TimeLimitExceeded,
            message,
            output.execution_time_ms,
        );
    }

    if output.exit_code != 0 {
        if is_missing_entry_point(output.exit_code, &output.stderr) {
            return failed(
                test_case,
                TestStatus::MissingEntryPoint,
                format!(
                    "{}: define a function named `{}` that takes no arguments",
                    MISSING_ENTRY_POINT_MARKER, ENTRY_POINT
                ),
                output.execution_time_ms,
            );
        }

        let message = if output.stderr.trim().is_empty() {
            format!("Process exited with code {}", output.exit_code)
        } else {
            truncate_message(&output.stderr, MAX_ERROR_MESSAGE_CHARS)
        };
        return failed(test_case, TestStatus::RuntimeError, message, output.execution_time_ms);
    }

    let passed = output.stdout.as_bytes() == test_case.expected_output.as_bytes();
    TestResult {
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: Some(output.stdout.clone()),
        error_message: None,
        passed,
        status: if passed { TestStatus::Passed } else { TestStatus::WrongAnswer },
        execution_time_ms: output.execution_time_ms,
    }
}

/// Result for a case the engine could not run at all
pub fn internal_error(test_case: &TestCase, message: &str) -> TestResult {
    failed(
        test_case,
        TestStatus::InternalError,
        truncate_message(&format!("Execution failed: {}", message), MAX_ERROR_MESSAGE_CHARS),
        0,
    )
}

/// Human-readable summary for a batch of results
pub fn feedback(results: &[TestResult]) -> String {
    let failing = results.iter().filter(|r| !r.passed).count();
    if failing == 0 {
        ALL_PASSED_FEEDBACK.to_string()
    } else {
        format!("{} test(s) failing. Compare expected vs actual output.", failing)
    }
}

/// Fold per-case results into the final verdict.
/// An empty batch passes: there is no failing case.
pub fn aggregate(results: Vec<TestResult>) -> Verdict {
    let passed = results.iter().all(|r| r.passed);
    let feedback = feedback(&results);
    Verdict {
        passed,
        results,
        feedback,
    }
}

/// Verdict for a submission whose runtime is not available; nothing was executed
pub fn unsupported_language(err: &UnsupportedLanguage) -> Verdict {
    let supported: Vec<String> = learnbase_common::types::Language::all()
        .iter()
        .map(|l| l.to_string())
        .collect();
    Verdict {
        passed: false,
        results: Vec::new(),
        feedback: format!(
            "Language '{}' is not supported. Only {} is supported at the moment.",
            err.0,
            supported.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::MISSING_ENTRY_POINT_EXIT_CODE;

    const TIMEOUT: Duration = Duration::from_millis(2500);

    fn make_output(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
            leader_exit_code: None,
            execution_time_ms: 12,
        }
    }

    fn make_failure(stderr: &str, exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code,
            timed_out: false,
            leader_exit_code: None,
            execution_time_ms: 7,
        }
    }

    #[test]
    fn test_exact_match_passes() {
        let tc = TestCase::new("hello\n", "HELLO\n");
        let result = evaluate_test(&make_output("HELLO\n"), &tc, TIMEOUT);
        assert!(result.passed);
        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(result.actual_output.as_deref(), Some("HELLO\n"));
        assert!(result.error_message.is_none());
        assert_eq!(result.execution_time_ms, 12);
    }

    #[test]
    fn test_trailing_newline_matters() {
        let tc = TestCase::new("hello\n", "HELLO\n");
        let result = evaluate_test(&make_output("HELLO"), &tc, TIMEOUT);
        assert!(!result.passed);
        assert_eq!(result.status, TestStatus::WrongAnswer);
        assert_eq!(result.actual_output.as_deref(), Some("HELLO"));
    }

    #[test]
    fn test_whitespace_is_not_trimmed() {
        let tc = TestCase::new("", "6\n");
        assert!(!evaluate_test(&make_output(" 6\n"), &tc, TIMEOUT).passed);
        assert!(!evaluate_test(&make_output("6\r\n"), &tc, TIMEOUT).passed);
        assert!(evaluate_test(&make_output("6\n"), &tc, TIMEOUT).passed);
    }

    #[test]
    fn test_case_sensitivity() {
        let tc = TestCase::new("hi\n", "HELLO\n");
        let result = evaluate_test(&make_output("HI\n"), &tc, TIMEOUT);
        assert!(!result.passed);
        assert_eq!(result.actual_output.as_deref(), Some("HI\n"));
    }

    #[test]
    fn test_stderr_on_success_is_not_an_error() {
        let tc = TestCase::new("", "ok\n");
        let mut output = make_output("ok\n");
        output.stderr = "DeprecationWarning: something\n".to_string();
        let result = evaluate_test(&output, &tc, TIMEOUT);
        assert!(result.passed);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_runtime_error_uses_stderr() {
        let tc = TestCase::new("0\n", "1\n");
        let output = make_failure("Traceback...\nZeroDivisionError: division by zero\n", 1);
        let result = evaluate_test(&output, &tc, TIMEOUT);
        assert!(!result.passed);
        assert_eq!(result.status, TestStatus::RuntimeError);
        assert!(result.actual_output.is_none());
        assert!(result.error_message.unwrap().contains("ZeroDivisionError"));
    }

    #[test]
    fn test_runtime_error_with_empty_stderr() {
        let tc = TestCase::new("", "");
        let result = evaluate_test(&make_failure("", 137), &tc, TIMEOUT);
        assert_eq!(result.error_message.as_deref(), Some("Process exited with code 137"));
    }

    #[test]
    fn test_runtime_error_message_is_bounded() {
        let tc = TestCase::new("", "");
        let huge = "é".repeat(5000);
        let result = evaluate_test(&make_failure(&huge, 1), &tc, TIMEOUT);
        let message = result.error_message.unwrap();
        assert_eq!(message.chars().count(), MAX_ERROR_MESSAGE_CHARS);
    }

    #[test]
    fn test_missing_entry_point() {
        let tc = TestCase::new("x\n", "X\n");
        let output = make_failure("No solve() function found\n", MISSING_ENTRY_POINT_EXIT_CODE);
        let result = evaluate_test(&output, &tc, TIMEOUT);
        assert_eq!(result.status, TestStatus::MissingEntryPoint);
        assert!(result.error_message.unwrap().contains("solve"));
    }

    #[test]
    fn test_marker_from_user_code_is_a_runtime_error() {
        let tc = TestCase::new("x\n", "X\n");
        let result = evaluate_test(&make_failure("No solve() function found\n", 1), &tc, TIMEOUT);
        assert_eq!(result.status, TestStatus::RuntimeError);
        assert_eq!(
            result.error_message.as_deref(),
            Some("No solve() function found\n")
        );
    }

    #[test]
    fn test_timeout_after_leader_exit_names_the_background_process() {
        let tc = TestCase::new("", "done\n");
        let output = ExecutionResult {
            stdout: "done\n".to_string(),
            stderr: String::new(),
            exit_code: TIMEOUT_EXIT_CODE,
            timed_out: true,
            leader_exit_code: Some(0),
            execution_time_ms: 2503,
        };
        let result = evaluate_test(&output, &tc, TIMEOUT);
        assert_eq!(result.status, TestStatus::TimeLimitExceeded);
        let message = result.error_message.unwrap();
        assert!(message.starts_with("Execution timed out after 2500 ms"));
        assert!(message.contains("exited with code 0"));
        assert!(message.contains("background process"));
    }

    #[test]
    fn test_timeout_is_distinct_from_crash() {
        let tc = TestCase::new("", "done\n");
        let output = ExecutionResult {
            stdout: "partial".to_string(),
            stderr: String::new(),
            exit_code: TIMEOUT_EXIT_CODE,
            timed_out: true,
            leader_exit_code: None,
            execution_time_ms: 2501,
        };
        let result = evaluate_test(&output, &tc, TIMEOUT);
        assert_eq!(result.status, TestStatus::TimeLimitExceeded);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Execution timed out after 2500 ms")
        );
        assert!(result.actual_output.is_none());
    }

    #[test]
    fn test_internal_error() {
        let tc = TestCase::new("a", "b");
        let result = internal_error(&tc, "failed to spawn 'python3'");
        assert_eq!(result.status, TestStatus::InternalError);
        assert!(!result.passed);
        assert!(result.error_message.unwrap().contains("python3"));
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("abcdef", 3), "abc");
        assert_eq!(truncate_message("abc", 3), "abc");
        assert_eq!(truncate_message("", 3), "");
        assert_eq!(truncate_message("ééé", 2), "éé");
    }

    #[test]
    fn test_aggregate_empty_batch_passes() {
        let verdict = aggregate(Vec::new());
        assert!(verdict.passed);
        assert!(verdict.results.is_empty());
        assert_eq!(verdict.feedback, ALL_PASSED_FEEDBACK);
    }

    #[test]
    fn test_aggregate_mixed() {
        let pass = evaluate_test(&make_output("A\n"), &TestCase::new("a\n", "A\n"), TIMEOUT);
        let fail = evaluate_test(&make_output("b\n"), &TestCase::new("b\n", "B\n"), TIMEOUT);
        let crash = evaluate_test(&make_failure("boom", 1), &TestCase::new("c\n", "C\n"), TIMEOUT);

        let verdict = aggregate(vec![pass, fail, crash]);
        assert!(!verdict.passed);
        assert_eq!(verdict.results.len(), 3);
        assert_eq!(verdict.results[0].input, "a\n");
        assert_eq!(verdict.results[2].input, "c\n");
        assert_eq!(verdict.failed_count(), 2);
        assert_eq!(
            verdict.feedback,
            "2 test(s) failing. Compare expected vs actual output."
        );
    }

    #[test]
    fn test_unsupported_language_verdict() {
        let verdict = unsupported_language(&UnsupportedLanguage("java".to_string()));
        assert!(!verdict.passed);
        assert!(verdict.results.is_empty());
        assert!(verdict.feedback.contains("java"));
        assert!(verdict.feedback.contains("Only python is supported"));
    }
}
