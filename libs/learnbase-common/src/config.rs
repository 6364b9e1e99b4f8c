// Application configuration read from the process environment

use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 2500;
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Credentials for the optional exercise-generation backend
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: Option<String>,
    pub timeout: Duration,
    pub max_parallel_tests: usize,
    pub openai: Option<OpenAiSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            redis_url: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_parallel_tests: 1,
            openai: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_ms = match non_empty("VALIDATION_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "VALIDATION_TIMEOUT_MS",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_MS,
        };

        let max_parallel_tests = match non_empty("MAX_PARALLEL_TESTS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "MAX_PARALLEL_TESTS",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            },
            None => defaults.max_parallel_tests,
        };

        let openai = non_empty("OPENAI_API_KEY").map(|api_key| OpenAiSettings {
            api_key,
            api_base: non_empty("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string()),
            model: non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        });

        Ok(Self {
            bind_addr: non_empty("LEARNBASE_BIND").unwrap_or(defaults.bind_addr),
            redis_url: non_empty("REDIS_URL"),
            timeout: Duration::from_millis(timeout_ms),
            max_parallel_tests,
            openai,
        })
    }
}
