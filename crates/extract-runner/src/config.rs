// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Runner configuration
//!
//! Settings are layered from defaults, optional JSON files and environment
//! variables, then turned into the extractor's own configuration types.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use serde::{Deserialize, Deserializer, de};
use shipment_extractor::{DuplicatePolicy, ExtractorConfig, InferenceConfig, RetryPolicy};
use url::Url;

/// Base configuration file, read from the working directory when present
pub const CONFIG_FILE: &str = "extract.json";

/// Prefix for environment overrides, e.g. `EXTRACT_PATHS__OUTPUT`
pub const ENV_PREFIX: &str = "EXTRACT";

/// Provider key consulted when no key is configured under [`ENV_PREFIX`]
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";

/// A validated request timeout in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self(Duration::from_secs(30))
    }
}

/// Input, output and registry file locations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsConfig {
    /// Email input records
    pub emails: PathBuf,
    /// Port reference dataset
    pub ports: PathBuf,
    /// Extracted records
    pub output: PathBuf,
    /// Per-email failure entries
    pub failures: PathBuf,
    /// Model registry (YAML)
    pub models: PathBuf,
    /// Prompt registry (JSON)
    pub prompts: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            emails: PathBuf::from("emails_input.json"),
            ports: PathBuf::from("port_codes_reference.json"),
            output: PathBuf::from("output.json"),
            failures: PathBuf::from("failures.json"),
            models: PathBuf::from("assets/configs/models.yaml"),
            prompts: PathBuf::from("assets/prompts/extraction_prompts.json"),
        }
    }
}

/// Everything one extraction run needs
#[derive(Clone, Deserialize)]
pub struct RunnerConfig {
    /// File locations
    pub paths: PathsConfig,
    /// Provider API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chat-completions base URL; the provider default when unset
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Per-request timeout (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Completion token limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Backoff for rate-limited and transient failures
    pub retry: RetryPolicy,
    /// Handling of duplicate codes in the port reference
    pub duplicate_policy: DuplicatePolicy,
    /// Pause between consecutive emails, in milliseconds
    pub inter_item_delay_ms: u64,
    /// Ports rendered into each prompt
    pub max_reference_ports: usize,
    /// Pinned prompt version; the registry's current version when unset
    #[serde(default)]
    pub prompt_version: Option<String>,
    /// Emit an all-null record for every failed email in the output file
    pub write_placeholders: bool,
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("paths", &self.paths)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("retry", &self.retry)
            .field("duplicate_policy", &self.duplicate_policy)
            .field("inter_item_delay_ms", &self.inter_item_delay_ms)
            .field("max_reference_ports", &self.max_reference_ports)
            .field("prompt_version", &self.prompt_version)
            .field("write_placeholders", &self.write_placeholders)
            .finish()
    }
}

impl RunnerConfig {
    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (extract.json)
    /// 3. Environment-specific file (extract.{env}.json)
    /// 4. Environment variables with the EXTRACT_ prefix, `__` separating nested keys
    ///
    /// `GROQ_API_KEY` supplies the key when none of the above set one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let env_file = PathBuf::from(format!("extract.{}.json", env_var.to_lowercase()));

        let mut config = Self::load_from(
            &[Path::new(CONFIG_FILE), env_file.as_path()],
            Self::environment_source(),
        )?;

        if config.api_key.is_none() {
            config.api_key = std::env::var(GROQ_API_KEY_VAR)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(config)
    }

    /// Environment variable source used by [`RunnerConfig::load`]
    pub fn environment_source() -> ConfigEnv {
        ConfigEnv::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Build configuration from defaults, the given optional files and an
    /// environment source
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a file is malformed or a value fails validation.
    pub fn load_from(files: &[&Path], environment: ConfigEnv) -> Result<Self, ConfigError> {
        let paths = PathsConfig::default();

        let mut builder = Config::builder()
            .set_default("paths.emails", path_default(&paths.emails))?
            .set_default("paths.ports", path_default(&paths.ports))?
            .set_default("paths.output", path_default(&paths.output))?
            .set_default("paths.failures", path_default(&paths.failures))?
            .set_default("paths.models", path_default(&paths.models))?
            .set_default("paths.prompts", path_default(&paths.prompts))?
            .set_default("timeout_seconds", 30)?
            .set_default("max_tokens", 1000)?
            .set_default("temperature", 0.0)?
            .set_default("retry.max_retries", 3)?
            .set_default("retry.initial_delay_secs", 2)?
            .set_default("retry.max_delay_secs", 30)?
            .set_default("duplicate_policy", "keep_first")?
            .set_default("inter_item_delay_ms", 500)?
            .set_default("max_reference_ports", 30)?
            .set_default("write_placeholders", false)?;

        for file in files {
            builder = builder.add_source(File::from(*file).required(false));
        }

        let mut config: Self = builder.add_source(environment).build()?.try_deserialize()?;
        config.api_key = config.api_key.filter(|key| !key.trim().is_empty());

        Ok(config)
    }

    /// Inference endpoint settings
    ///
    /// # Errors
    ///
    /// Returns an error when no API key is configured.
    pub fn inference_config(&self) -> Result<InferenceConfig> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow!("no API key configured: set {ENV_PREFIX}_API_KEY or {GROQ_API_KEY_VAR}")
        })?;

        let mut inference = InferenceConfig::new(api_key)
            .with_timeout(self.timeout_seconds.value().as_secs())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);
        if let Some(base_url) = &self.base_url {
            inference = inference.with_base_url(base_url.clone());
        }

        Ok(inference)
    }

    /// Load the registries and assemble the extractor configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a registry cannot be loaded or any setting is invalid.
    pub async fn extractor_config(&self) -> Result<ExtractorConfig> {
        let mut config =
            ExtractorConfig::from_files(&self.paths.models, &self.paths.prompts, self.inference_config()?)
                .await
                .context("failed to load extractor registries")?
                .with_retry_policy(self.retry)?
                .with_duplicate_policy(self.duplicate_policy)
                .with_inter_item_delay(Duration::from_millis(self.inter_item_delay_ms))
                .with_max_reference_ports(self.max_reference_ports);

        if let Some(version) = &self.prompt_version {
            config = config.with_prompt_version(version.clone())?;
        }

        Ok(config)
    }
}

fn path_default(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> ConfigEnv {
        let source: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RunnerConfig::environment_source().source(Some(source))
    }

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn defaults_apply_without_sources() {
        let config = RunnerConfig::load_from(&[], env(&[])).unwrap();

        assert_eq!(config.paths, PathsConfig::default());
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, None);
        assert_eq!(config.timeout_seconds.value(), Duration::from_secs(30));
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert_eq!(config.inter_item_delay_ms, 500);
        assert!(!config.write_placeholders);
    }

    #[test]
    fn file_then_environment_override() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("extract.json");
        std::fs::write(
            &file,
            r#"{
                "paths": { "output": "out/records.json" },
                "max_tokens": 512,
                "retry": { "max_retries": 5 },
                "duplicate_policy": "reject"
            }"#,
        )
        .unwrap();

        let config = RunnerConfig::load_from(
            &[file.as_path()],
            env(&[
                ("EXTRACT_MAX_TOKENS", "800"),
                ("EXTRACT_API_KEY", "test-key"),
                ("EXTRACT_RETRY__INITIAL_DELAY_SECS", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.paths.output, PathBuf::from("out/records.json"));
        assert_eq!(config.paths.emails, PathBuf::from("emails_input.json"));
        assert_eq!(config.max_tokens, 800);
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_secs, 1);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn missing_files_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("extract.production.json");

        assert!(RunnerConfig::load_from(&[absent.as_path()], env(&[])).is_ok());
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = RunnerConfig::load_from(&[], env(&[("EXTRACT_TIMEOUT_SECONDS", "0")])).unwrap_err();
        assert!(err.to_string().contains("timeout must be greater than 0"));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = RunnerConfig::load_from(&[], env(&[("EXTRACT_API_KEY", "  ")])).unwrap();

        let err = config.inference_config().unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn inference_settings_carry_over() {
        let config = RunnerConfig::load_from(
            &[],
            env(&[
                ("EXTRACT_API_KEY", "gsk_example"),
                ("EXTRACT_BASE_URL", "http://localhost:8080/v1/"),
                ("EXTRACT_TIMEOUT_SECONDS", "10"),
                ("EXTRACT_TEMPERATURE", "0.5"),
            ]),
        )
        .unwrap();

        let inference = config.inference_config().unwrap();
        assert_eq!(inference.api_key, "gsk_example");
        assert_eq!(inference.timeout_seconds, 10);
        assert!((inference.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(
            inference.base_url.as_ref().map(Url::as_str),
            Some("http://localhost:8080/v1/")
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let config =
            RunnerConfig::load_from(&[], env(&[("EXTRACT_API_KEY", "gsk_secret")])).unwrap();
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
