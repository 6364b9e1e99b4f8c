use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtimes a submission can be executed with.
///
/// Each variant carries its own harness and interpreter configuration; adding a
/// runtime means adding a variant, not another branch in the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
}

impl Language {
    /// All languages this build knows how to run
    pub fn all() -> &'static [Language] {
        &[Language::Python]
    }

    /// Resolve an optional request tag. A missing or blank tag selects the default runtime.
    pub fn resolve(tag: Option<&str>) -> Result<Self, UnsupportedLanguage> {
        match tag.map(str::trim) {
            None | Some("") => Ok(Language::default()),
            Some(tag) => tag.parse(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
        }
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct UnsupportedLanguage(pub String);

/// One (input, expected output) pair. Order only matters for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    #[serde(rename = "output", alias = "expected_output")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// A validation request: untrusted code plus the cases it must satisfy.
///
/// `language` is kept as the raw request tag so that an unknown runtime can be
/// reported back to the caller instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "code", alias = "source_code")]
    pub source_code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Submission {
    pub fn new(source_code: impl Into<String>, test_cases: Vec<TestCase>) -> Self {
        Self {
            source_code: source_code.into(),
            test_cases,
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Outcome classification for a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    WrongAnswer,
    RuntimeError,
    MissingEntryPoint,
    TimeLimitExceeded,
    InternalError,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::WrongAnswer => "wrong_answer",
            TestStatus::RuntimeError => "runtime_error",
            TestStatus::MissingEntryPoint => "missing_entry_point",
            TestStatus::TimeLimitExceeded => "time_limit_exceeded",
            TestStatus::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-case verdict. Exactly one of `actual_output` and `error_message` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub input: String,
    #[serde(rename = "expected")]
    pub expected_output: String,
    #[serde(rename = "actual", default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<String>,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub passed: bool,
    pub status: TestStatus,
    #[serde(default)]
    pub execution_time_ms: u64,
}

/// Aggregate result of one validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub results: Vec<TestResult>,
    pub feedback: String,
}

impl Verdict {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

/// Difficulty bucket an exercise is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Map a free-form level name onto a difficulty. Unknown names fall back to basic.
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "basic" | "beginner" => Difficulty::Basic,
            "intermediate" | "medium" => Difficulty::Intermediate,
            "advanced" | "hard" => Difficulty::Advanced,
            _ => Difficulty::Basic,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Basic => write!(f, "basic"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseContent {
    pub question: String,
    pub exercise: String,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub topic: String,
    pub progress: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_resolution() {
        assert_eq!(Language::resolve(None), Ok(Language::Python));
        assert_eq!(Language::resolve(Some("  ")), Ok(Language::Python));
        assert_eq!(Language::resolve(Some("Python")), Ok(Language::Python));
        assert_eq!(
            Language::resolve(Some("java")),
            Err(UnsupportedLanguage("java".to_string()))
        );
    }

    #[test]
    fn test_language_display_round_trips_through_parse() {
        for lang in Language::all() {
            assert_eq!(lang.to_string().parse::<Language>(), Ok(*lang));
        }
    }

    #[test]
    fn test_submission_wire_format() {
        let body = r#"{
            "code": "def solve():\n  pass",
            "test_cases": [{"input": "1\n", "output": "2\n"}]
        }"#;
        let submission: Submission = serde_json::from_str(body).unwrap();
        assert_eq!(submission.source_code, "def solve():\n  pass");
        assert_eq!(submission.test_cases, vec![TestCase::new("1\n", "2\n")]);
        assert_eq!(submission.language, None);
    }

    #[test]
    fn test_result_serializes_actual_or_error_only() {
        let ok = TestResult {
            input: "a".into(),
            expected_output: "A".into(),
            actual_output: Some("A".into()),
            error_message: None,
            passed: true,
            status: TestStatus::Passed,
            execution_time_ms: 3,
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["actual"], "A");
        assert_eq!(json["expected"], "A");
        assert!(json.get("error").is_none());
        assert_eq!(json["status"], "passed");
    }

    #[test]
    fn test_difficulty_from_level() {
        assert_eq!(Difficulty::from_level("Beginner"), Difficulty::Basic);
        assert_eq!(Difficulty::from_level("medium"), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_level("HARD"), Difficulty::Advanced);
        assert_eq!(Difficulty::from_level("wizard"), Difficulty::Basic);
        assert_eq!(Difficulty::from_level(""), Difficulty::Basic);
    }
}
