// CLI commands for local validation
use anyhow::{Context, Result};
use learnbase_common::exercise::fallback_exercise;
use learnbase_common::types::{Language, Submission, TestCase, Verdict};
use learnbase_judge::{LanguageConfigManager, ProcessEngine, Validator};
use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Accepted layouts for a test-case file
#[derive(Deserialize)]
#[serde(untagged)]
enum CasesFile {
    List(Vec<TestCase>),
    Document { test_cases: Vec<TestCase> },
}

/// Parse test cases from either a bare array or a document with a `test_cases` key
fn parse_test_cases(content: &str) -> Result<Vec<TestCase>> {
    let parsed: CasesFile = serde_json::from_str(content)
        .context("Expected a JSON array of {input, output} or an object with test_cases")?;
    Ok(match parsed {
        CasesFile::List(cases) => cases,
        CasesFile::Document { test_cases } => test_cases,
    })
}

fn render_verdict(verdict: &Verdict) -> String {
    let mut out = String::new();
    for (idx, result) in verdict.results.iter().enumerate() {
        let mark = if result.passed { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "{} Test {} [{}] ({} ms)",
            mark,
            idx + 1,
            result.status,
            result.execution_time_ms
        );
        if !result.passed {
            let _ = writeln!(out, "    input:    {:?}", result.input);
            let _ = writeln!(out, "    expected: {:?}", result.expected_output);
            if let Some(actual) = &result.actual_output {
                let _ = writeln!(out, "    actual:   {:?}", actual);
            }
            if let Some(error) = &result.error_message {
                let _ = writeln!(out, "    error:    {}", error.trim_end());
            }
        }
    }
    if !verdict.results.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "{}", verdict.feedback);
    out
}

/// Validate a local solution file. Returns whether every test case passed.
pub async fn validate(
    code_path: &Path,
    cases_path: &Path,
    language: Option<&str>,
    timeout_ms: Option<u64>,
    parallel: usize,
    json: bool,
) -> Result<bool> {
    let source_code = fs::read_to_string(code_path)
        .with_context(|| format!("Failed to read {}", code_path.display()))?;
    let cases = fs::read_to_string(cases_path)
        .with_context(|| format!("Failed to read {}", cases_path.display()))?;
    let test_cases = parse_test_cases(&cases)
        .with_context(|| format!("Invalid test cases in {}", cases_path.display()))?;

    let mut submission = Submission::new(source_code, test_cases);
    if let Some(language) = language {
        submission = submission.with_language(language);
    }

    let config_manager = LanguageConfigManager::load_default()?;
    let mut validator =
        Validator::new(ProcessEngine::new(config_manager)).with_max_parallel_tests(parallel);
    if let Some(ms) = timeout_ms {
        validator = validator.with_timeout(Duration::from_millis(ms));
    }

    let verdict = validator.validate(&submission).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print!("{}", render_verdict(&verdict));
    }

    Ok(verdict.passed)
}

/// Print the built-in exercise for a topic and level
pub fn show_exercise(topic: &str, level: &str) -> Result<()> {
    let exercise = fallback_exercise(topic, level);
    println!("{}", serde_json::to_string_pretty(&exercise)?);
    Ok(())
}

/// List configured languages with their interpreter and deadline
pub fn list_languages() -> Result<()> {
    let path = LanguageConfigManager::default_path();
    let manager = LanguageConfigManager::load_default()?;

    println!("Language config: {}", path.display());
    for name in manager.list_languages() {
        let language: Language = name.parse()?;
        let config = manager.get_config(&language)?;
        let mut command = vec![config.execution.command.clone()];
        command.extend(config.execution.args.iter().cloned());
        println!(
            "  {:<10} {:<24} timeout {} ms, output cap {} bytes",
            name,
            command.join(" "),
            config.timeout_ms,
            config.max_output_bytes
        );
    }
    Ok(())
}
