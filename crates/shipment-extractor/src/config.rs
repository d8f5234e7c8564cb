// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for shipment extraction
//!
//! This module loads the model registry (YAML) and the prompt registry (JSON),
//! validates them together with the inference and retry settings, and exposes
//! the resolved model pair and prompt template to the pipeline.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use inference_client::types::DEFAULT_MAX_TOKENS;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{ExtractorError, ExtractorResult},
    reference::DuplicatePolicy,
};

/// Registry task name holding the extraction model pair
pub const EXTRACTION_TASK: &str = "shipment_extraction";

/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/";

/// Pause between consecutive emails
pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_millis(500);

/// Ports rendered into each prompt
pub const DEFAULT_MAX_REFERENCE_PORTS: usize = 30;

/// Primary model and optional substitute for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPair {
    /// Model used for every first attempt
    pub primary: String,
    /// Model substituted once when the primary is unavailable
    #[serde(default)]
    pub fallback: Option<String>,
}

impl ModelPair {
    /// Create a pair without a fallback
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    /// Set the fallback model
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Fallback model, if one is configured and differs from the primary
    pub fn distinct_fallback(&self) -> Option<&str> {
        self.fallback
            .as_deref()
            .filter(|fallback| !fallback.is_empty() && *fallback != self.primary)
    }
}

/// Model registry configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistry {
    /// Model pairs by task name
    pub model_registry: HashMap<String, ModelPair>,
}

impl ModelRegistry {
    /// Load model registry from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> ExtractorResult<Self> {
        let path = path.as_ref();
        debug!("Loading model registry from: {}", path.display());

        let content = fs::read_to_string(path).await.map_err(|e| {
            ExtractorError::io(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let registry: ModelRegistry = serde_yaml::from_str(&content).map_err(|e| {
            ExtractorError::yaml(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        info!(
            "Loaded model registry with {} tasks from {}",
            registry.model_registry.len(),
            path.display()
        );

        Ok(registry)
    }

    /// Validate that every task names a primary model
    pub fn validate(&self) -> ExtractorResult<()> {
        if !self.model_registry.contains_key(EXTRACTION_TASK) {
            return Err(ExtractorError::model_registry(format!(
                "Task '{EXTRACTION_TASK}' is not configured"
            )));
        }

        for (task, pair) in &self.model_registry {
            if pair.primary.trim().is_empty() {
                return Err(ExtractorError::model_registry(format!(
                    "Empty primary model for task '{task}'"
                )));
            }

            if pair.fallback.as_deref() == Some(pair.primary.as_str()) {
                warn!(
                    task = %task,
                    model = %pair.primary,
                    "Fallback model equals the primary; substitution is disabled"
                );
            }
        }

        Ok(())
    }

    /// Get the model pair for a task
    pub fn get_pair(&self, task: &str) -> ExtractorResult<&ModelPair> {
        self.model_registry.get(task).ok_or_else(|| {
            ExtractorError::model_registry(format!("Task '{task}' not found"))
        })
    }

    /// Get all configured task names, sorted
    pub fn task_names(&self) -> Vec<String> {
        let mut tasks: Vec<_> = self.model_registry.keys().cloned().collect();
        tasks.sort();
        tasks
    }
}

/// Prompt version configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    /// Semantic version identifier (e.g., "3.0.0")
    pub version: String,
    /// Creation date of this version
    pub date: String,
    /// Description of this prompt version
    pub description: String,
    /// System message sent ahead of every email
    pub system_message: String,
    /// User message template with `{subject}`, `{body}` and optional `{port_reference}`
    pub user_template: String,
}

/// Prompt registry configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRegistry {
    /// All available prompt versions
    pub versions: Vec<PromptVersion>,
    /// Current/default version to use
    pub current_version: String,
}

impl PromptRegistry {
    /// Placeholders every user template must contain
    pub const REQUIRED_PLACEHOLDERS: [&'static str; 2] = ["{subject}", "{body}"];

    /// Load prompt registry from a JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> ExtractorResult<Self> {
        let path = path.as_ref();
        debug!("Loading prompt registry from: {}", path.display());

        let content = fs::read_to_string(path).await.map_err(|e| {
            ExtractorError::io(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let registry: PromptRegistry = serde_json::from_str(&content).map_err(|e| {
            ExtractorError::json(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        info!(
            "Loaded prompt registry with {} versions from {}",
            registry.versions.len(),
            path.display()
        );

        Ok(registry)
    }

    /// Get a prompt by version
    pub fn get_version(&self, version: &str) -> ExtractorResult<&PromptVersion> {
        self.versions
            .iter()
            .find(|v| v.version == version)
            .ok_or_else(|| {
                ExtractorError::prompt_registry(format!("Prompt version '{version}' not found"))
            })
    }

    /// Get the current/default prompt
    pub fn current(&self) -> ExtractorResult<&PromptVersion> {
        self.get_version(&self.current_version)
    }

    /// Get all available prompt versions
    pub fn get_versions(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.version.clone()).collect()
    }

    /// Validate the prompt registry
    pub fn validate(&self) -> ExtractorResult<()> {
        if self.versions.is_empty() {
            return Err(ExtractorError::prompt_registry(
                "No prompt versions configured",
            ));
        }

        if !self
            .versions
            .iter()
            .any(|v| v.version == self.current_version)
        {
            return Err(ExtractorError::prompt_registry(format!(
                "Current version '{}' not found in available versions",
                self.current_version
            )));
        }

        let mut seen_versions = HashSet::new();
        for version in &self.versions {
            semver::Version::parse(&version.version).map_err(|e| {
                ExtractorError::prompt_registry(format!(
                    "Invalid version identifier '{}': {}",
                    version.version, e
                ))
            })?;

            if !seen_versions.insert(&version.version) {
                return Err(ExtractorError::prompt_registry(format!(
                    "Duplicate version '{}' found",
                    version.version
                )));
            }

            if version.system_message.trim().is_empty() {
                return Err(ExtractorError::prompt_registry(format!(
                    "Empty system message for version '{}'",
                    version.version
                )));
            }

            for placeholder in Self::REQUIRED_PLACEHOLDERS {
                if !version.user_template.contains(placeholder) {
                    return Err(ExtractorError::prompt_registry(format!(
                        "User template for version '{}' is missing {}",
                        version.version, placeholder
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Inference endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API (defaults to Groq)
    pub base_url: Option<Url>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of tokens in the response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            timeout_seconds: 30,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
        }
    }
}

impl InferenceConfig {
    /// Create a new inference configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the maximum tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Base URL with a trailing slash so relative joins keep the path prefix
    pub fn resolved_base_url(&self) -> ExtractorResult<Url> {
        let mut url = match &self.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(ExtractorError::config)?,
        };

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Validate the inference configuration
    pub fn validate(&self) -> ExtractorResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ExtractorError::config("Inference API key cannot be empty"));
        }

        if !self.api_key.starts_with("gsk_") && !self.api_key.starts_with("test-") {
            warn!("Inference API key doesn't match expected format (should start with 'gsk_')");
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ExtractorError::config(format!(
                "Invalid timeout: {} seconds (must be 1-300)",
                self.timeout_seconds
            )));
        }

        if self.max_tokens == 0 || self.max_tokens > 4096 {
            return Err(ExtractorError::config(format!(
                "Invalid max_tokens: {} (must be 1-4096)",
                self.max_tokens
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ExtractorError::config(format!(
                "Invalid temperature: {} (must be 0.0-2.0)",
                self.temperature
            )));
        }

        Ok(())
    }
}

/// Exponential backoff settings for retryable inference failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, in seconds
    pub initial_delay_secs: u64,
    /// Upper bound for any single delay, in seconds
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_secs: 2,
            max_delay_secs: 30,
        }
    }
}

impl RetryPolicy {
    /// Growth factor between consecutive delays
    pub const BACKOFF_FACTOR: u64 = 2;

    /// Delay before retry number `retry` (1-based)
    ///
    /// `min(initial * 2^(retry - 1), max)`, saturating on overflow.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = Self::BACKOFF_FACTOR
            .checked_pow(exponent)
            .unwrap_or(u64::MAX);
        let secs = self
            .initial_delay_secs
            .saturating_mul(factor)
            .min(self.max_delay_secs);
        Duration::from_secs(secs)
    }

    /// Full delay schedule, one entry per allowed retry
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|n| self.delay_for(n)).collect()
    }

    /// Validate the retry policy
    pub fn validate(&self) -> ExtractorResult<()> {
        if self.max_retries > 10 {
            return Err(ExtractorError::config(format!(
                "Invalid max_retries: {} (must be 0-10)",
                self.max_retries
            )));
        }

        if self.initial_delay_secs > self.max_delay_secs {
            return Err(ExtractorError::config(format!(
                "Initial delay {}s exceeds maximum delay {}s",
                self.initial_delay_secs, self.max_delay_secs
            )));
        }

        Ok(())
    }
}

/// Complete extractor configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Model registry
    pub model_registry: Arc<ModelRegistry>,
    /// Prompt registry
    pub prompt_registry: Arc<PromptRegistry>,
    /// Inference endpoint configuration
    pub inference: InferenceConfig,
    /// Backoff settings
    pub retry: RetryPolicy,
    /// Handling of duplicate port codes in the reference data
    pub duplicate_policy: DuplicatePolicy,
    /// Pause between consecutive emails
    pub inter_item_delay: Duration,
    /// Ports rendered into each prompt
    pub max_reference_ports: usize,
    /// Prompt version override; the registry's current version when unset
    pub prompt_version: Option<String>,
    /// Canonical path of the model registry file
    pub model_registry_path: PathBuf,
    /// Canonical path of the prompt registry file
    pub prompt_registry_path: PathBuf,
}

impl ExtractorConfig {
    /// Create configuration from file paths
    pub async fn from_files<P1, P2>(
        model_registry_path: P1,
        prompt_registry_path: P2,
        inference: InferenceConfig,
    ) -> ExtractorResult<Self>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let model_registry_path =
            Self::validate_and_canonicalize_path(model_registry_path.as_ref(), "model registry")?;
        let prompt_registry_path =
            Self::validate_and_canonicalize_path(prompt_registry_path.as_ref(), "prompt registry")?;

        let model_registry = ModelRegistry::from_file(&model_registry_path).await?;
        model_registry.validate()?;

        let prompt_registry = PromptRegistry::from_file(&prompt_registry_path).await?;
        prompt_registry.validate()?;

        inference.validate()?;

        Ok(Self {
            model_registry: Arc::new(model_registry),
            prompt_registry: Arc::new(prompt_registry),
            inference,
            retry: RetryPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
            max_reference_ports: DEFAULT_MAX_REFERENCE_PORTS,
            prompt_version: None,
            model_registry_path,
            prompt_registry_path,
        })
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> ExtractorResult<Self> {
        retry.validate()?;
        self.retry = retry;
        Ok(self)
    }

    /// Set the duplicate port policy
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Set the pause between emails
    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    /// Set the number of ports rendered into each prompt
    pub fn with_max_reference_ports(mut self, max_ports: usize) -> Self {
        self.max_reference_ports = max_ports;
        self
    }

    /// Pin a prompt version instead of the registry's current one
    pub fn with_prompt_version(mut self, version: impl Into<String>) -> ExtractorResult<Self> {
        let version = version.into();
        self.prompt_registry.get_version(&version)?;
        self.prompt_version = Some(version);
        Ok(self)
    }

    /// Model pair for the extraction task
    pub fn models(&self) -> ExtractorResult<&ModelPair> {
        self.model_registry.get_pair(EXTRACTION_TASK)
    }

    /// Prompt version selected for this run
    pub fn prompt(&self) -> ExtractorResult<&PromptVersion> {
        match &self.prompt_version {
            Some(version) => self.prompt_registry.get_version(version),
            None => self.prompt_registry.current(),
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        let models = self.models().ok();
        ConfigSummary {
            primary_model: models.map(|pair| pair.primary.clone()),
            fallback_model: models.and_then(|pair| pair.distinct_fallback().map(str::to_string)),
            prompt_versions: self.prompt_registry.get_versions(),
            active_prompt_version: self.prompt().ok().map(|p| p.version.clone()),
            max_retries: self.retry.max_retries,
            inference_configured: !self.inference.api_key.is_empty(),
        }
    }

    /// Validate and canonicalize a file path
    pub(crate) fn validate_and_canonicalize_path(
        path: &Path,
        file_type: &str,
    ) -> ExtractorResult<PathBuf> {
        if !path.exists() {
            return Err(ExtractorError::config(format!(
                "{} file not found: {} (current working directory: {})",
                file_type,
                path.display(),
                std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "unknown".to_string())
            )));
        }

        if !path.is_file() {
            return Err(ExtractorError::config(format!(
                "{} path exists but is not a file: {}",
                file_type,
                path.display()
            )));
        }

        path.canonicalize().map_err(|e| {
            ExtractorError::config(format!(
                "Failed to canonicalize {} path {}: {}",
                file_type,
                path.display(),
                e
            ))
        })
    }
}

/// Configuration summary for startup logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    /// Primary extraction model
    pub primary_model: Option<String>,
    /// Distinct fallback model, if any
    pub fallback_model: Option<String>,
    /// Available prompt versions
    pub prompt_versions: Vec<String>,
    /// Prompt version in use
    pub active_prompt_version: Option<String>,
    /// Retries allowed per email
    pub max_retries: u32,
    /// Whether an API key is configured
    pub inference_configured: bool,
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::TempDir;
    use tokio::fs::write;
    use tokio_test::assert_ok;

    use super::*;

    pub(crate) const MODELS_YAML: &str = r#"
model_registry:
  shipment_extraction:
    primary: llama-3.1-70b-versatile
    fallback: llama-3.3-70b-versatile
  port_normalization:
    primary: llama-3.1-8b-instant
"#;

    pub(crate) const PROMPTS_JSON: &str = r#"{
    "versions": [
        {
            "version": "2.0.0",
            "date": "2025-01-10",
            "description": "Few-shot prompt",
            "system_message": "You extract shipment details from freight emails.",
            "user_template": "Subject: {subject}\nBody: {body}"
        },
        {
            "version": "3.0.0",
            "date": "2025-01-14",
            "description": "Prompt with port reference",
            "system_message": "You extract shipment details from freight emails. Reply with JSON only.",
            "user_template": "Known ports:\n{port_reference}\n\nSubject: {subject}\nBody: {body}"
        }
    ],
    "current_version": "3.0.0"
}"#;

    async fn write_temp(name: &str, content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join(name);
        write(&file_path, content).await.unwrap();
        (temp_dir, file_path)
    }

    fn prompt_registry(version: &str, template: &str) -> PromptRegistry {
        PromptRegistry {
            versions: vec![PromptVersion {
                version: version.to_string(),
                date: "2025-01-14".to_string(),
                description: "test".to_string(),
                system_message: "system".to_string(),
                user_template: template.to_string(),
            }],
            current_version: version.to_string(),
        }
    }

    #[tokio::test]
    async fn load_model_registry() {
        let (_temp_dir, file_path) = write_temp("models.yaml", MODELS_YAML).await;
        let registry = ModelRegistry::from_file(&file_path).await.unwrap();

        assert!(registry.validate().is_ok());
        assert_eq!(
            registry.task_names(),
            vec!["port_normalization", "shipment_extraction"]
        );

        let pair = registry.get_pair(EXTRACTION_TASK).unwrap();
        assert_eq!(pair.primary, "llama-3.1-70b-versatile");
        assert_eq!(pair.distinct_fallback(), Some("llama-3.3-70b-versatile"));

        let single = registry.get_pair("port_normalization").unwrap();
        assert_eq!(single.distinct_fallback(), None);
        assert!(registry.get_pair("unknown").is_err());
    }

    #[test]
    fn model_registry_requires_extraction_task() {
        let registry = ModelRegistry {
            model_registry: HashMap::from([(
                "other".to_string(),
                ModelPair::new("llama-3.1-8b-instant"),
            )]),
        };
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("shipment_extraction"));
    }

    #[test]
    fn identical_fallback_is_not_distinct() {
        let pair = ModelPair::new("same-model").with_fallback("same-model");
        assert_eq!(pair.distinct_fallback(), None);

        let blank = ModelPair::new("model").with_fallback("");
        assert_eq!(blank.distinct_fallback(), None);
    }

    #[tokio::test]
    async fn load_prompt_registry() {
        let (_temp_dir, file_path) = write_temp("prompts.json", PROMPTS_JSON).await;
        let registry = PromptRegistry::from_file(&file_path).await.unwrap();

        assert!(registry.validate().is_ok());
        assert_eq!(registry.get_versions(), vec!["2.0.0", "3.0.0"]);

        let current = registry.current().unwrap();
        assert_eq!(current.version, "3.0.0");
        assert!(current.user_template.contains("{port_reference}"));

        assert!(registry.get_version("9.9.9").is_err());
    }

    #[test]
    fn prompt_registry_rejects_non_semver_versions() {
        let registry = prompt_registry("v3", "{subject} {body}");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid version identifier 'v3'"));
    }

    #[test]
    fn prompt_registry_requires_placeholders() {
        let registry = prompt_registry("1.0.0", "Subject only: {subject}");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("missing {body}"));
    }

    #[test]
    fn prompt_registry_rejects_unknown_current_version() {
        let mut registry = prompt_registry("1.0.0", "{subject} {body}");
        registry.current_version = "2.0.0".to_string();
        assert!(registry.validate().is_err());
    }

    #[test]
    fn inference_config_validation() {
        assert!(InferenceConfig::new("gsk_test").validate().is_ok());
        assert!(InferenceConfig::new("").validate().is_err());
        assert!(
            InferenceConfig::new("gsk_test")
                .with_timeout(500)
                .validate()
                .is_err()
        );
        assert!(
            InferenceConfig::new("gsk_test")
                .with_max_tokens(0)
                .validate()
                .is_err()
        );
        assert!(
            InferenceConfig::new("gsk_test")
                .with_temperature(2.5)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn base_url_resolution() {
        let default = InferenceConfig::new("gsk_test").resolved_base_url().unwrap();
        assert_eq!(default.as_str(), DEFAULT_BASE_URL);

        let custom = InferenceConfig::new("gsk_test")
            .with_base_url(Url::parse("http://localhost:8080/v1").unwrap())
            .resolved_base_url()
            .unwrap();
        assert_eq!(custom.as_str(), "http://localhost:8080/v1/");
    }

    #[test]
    fn retry_policy_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for(200), Duration::from_secs(30));
    }

    #[test]
    fn retry_policy_validation() {
        assert!(RetryPolicy::default().validate().is_ok());

        let inverted = RetryPolicy {
            initial_delay_secs: 60,
            ..RetryPolicy::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[tokio::test]
    async fn full_configuration() {
        let (_models_dir, model_path) = write_temp("models.yaml", MODELS_YAML).await;
        let (_prompts_dir, prompt_path) = write_temp("prompts.json", PROMPTS_JSON).await;

        let config = assert_ok!(
            ExtractorConfig::from_files(
                model_path,
                prompt_path,
                InferenceConfig::new("test-api-key").with_timeout(60),
            )
            .await
        );

        assert_eq!(config.models().unwrap().primary, "llama-3.1-70b-versatile");
        assert_eq!(config.prompt().unwrap().version, "3.0.0");
        assert_eq!(config.inter_item_delay, DEFAULT_INTER_ITEM_DELAY);

        let pinned = config.clone().with_prompt_version("2.0.0").unwrap();
        assert_eq!(pinned.prompt().unwrap().version, "2.0.0");
        assert!(config.clone().with_prompt_version("0.1.0").is_err());

        let summary = config.get_summary();
        assert_eq!(
            summary.fallback_model.as_deref(),
            Some("llama-3.3-70b-versatile")
        );
        assert_eq!(summary.active_prompt_version.as_deref(), Some("3.0.0"));
        assert_eq!(summary.max_retries, 3);
        assert!(summary.inference_configured);
    }

    #[test]
    fn file_validation() {
        let result = ExtractorConfig::validate_and_canonicalize_path(
            Path::new("/non/existent/file.yaml"),
            "test",
        );
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("test file not found")
        );

        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let canonical_path =
            ExtractorConfig::validate_and_canonicalize_path(temp_file.path(), "test").unwrap();
        assert!(canonical_path.is_absolute());
        assert!(canonical_path.exists());

        let dir = TempDir::new().unwrap();
        let err = ExtractorConfig::validate_and_canonicalize_path(dir.path(), "test").unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }
}
