// Language runtime configuration for the execution engine
use anyhow::{bail, Context, Result};
use learnbase_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/languages.json";
pub const CONFIG_PATH_ENV: &str = "LANGUAGES_CONFIG";
pub const DEFAULT_TIMEOUT_MS: u64 = 2500;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageExecution {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub file_extension: String,
}

impl LanguageExecution {
    /// File name the composed unit is staged under, e.g. `main.py`
    pub fn file_name(&self) -> String {
        let ext = self.file_extension.trim_start_matches('.');
        if ext.is_empty() {
            "main".to_string()
        } else {
            format!("main.{}", ext)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub execution: LanguageExecution,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Extra variables for the child; everything else is scrubbed except PATH
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl LanguageConfig {
    /// Built-in runtime used when no configuration file is present
    pub fn builtin(language: Language) -> Self {
        match language {
            Language::Python => LanguageConfig {
                name: language.to_string(),
                version: "3".to_string(),
                execution: LanguageExecution {
                    command: "python3".to_string(),
                    args: vec![
                        "-I".to_string(),
                        "-X".to_string(),
                        "utf8".to_string(),
                        "-u".to_string(),
                    ],
                    file_extension: ".py".to_string(),
                },
                timeout_ms: DEFAULT_TIMEOUT_MS,
                max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
                env: BTreeMap::new(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from a languages.json file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Invalid language config in {}", config_path.display()))
    }

    /// Parse a languages.json document
    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;
        Self::from_configs(languages_json.languages)
    }

    /// Build a manager from explicit configs. Every entry must name a known language.
    pub fn from_configs(languages: Vec<LanguageConfig>) -> Result<Self> {
        let mut configs = HashMap::new();
        for lang in languages {
            let language: Language = lang
                .name
                .parse()
                .with_context(|| format!("Unknown language '{}' in configuration", lang.name))?;
            if lang.execution.command.trim().is_empty() {
                bail!("Language '{}' has an empty execution command", lang.name);
            }
            if lang.timeout_ms == 0 {
                bail!("Language '{}' must have a positive timeout_ms", lang.name);
            }
            configs.insert(language, lang);
        }

        if configs.is_empty() {
            bail!("No languages configured");
        }

        Ok(Self { configs })
    }

    /// Built-in configuration for every language this build supports
    pub fn builtin() -> Self {
        let configs = Language::all()
            .iter()
            .map(|lang| (*lang, LanguageConfig::builtin(*lang)))
            .collect();
        Self { configs }
    }

    /// Resolve the config path from `LANGUAGES_CONFIG`, defaulting to config/languages.json
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from the default path, or fall back to the built-in runtimes when it does not exist
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            let manager = Self::load(&path)?;
            info!(path = %path.display(), languages = ?manager.list_languages(), "Loaded language configuration");
            Ok(manager)
        } else {
            warn!(path = %path.display(), "Language config not found, using built-in defaults");
            Ok(Self::builtin())
        }
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &Language) -> Result<&LanguageConfig> {
        self.configs
            .get(language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    /// List all configured languages, sorted by name
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().map(|l| l.to_string()).collect();
        names.sort();
        names
    }
}
