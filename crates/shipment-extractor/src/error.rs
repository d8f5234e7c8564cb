// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for extractor setup and configuration
//!
//! Per-email failures are never raised through this type: they are classified
//! into [`shipment_types::ExtractionFailure`] entries at the item boundary. This
//! module covers everything that happens before or around a batch run, such as
//! loading registries, building the reference index and creating HTTP clients.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for extractor operations
pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Correlation metadata attached to HTTP-level messages
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Request ID for correlation across logs
    pub request_id: Option<String>,
    /// Operation that failed
    pub operation: Option<String>,
    /// Timestamp when error occurred
    pub timestamp: Option<DateTime<Utc>>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
}

impl ErrorContext {
    /// Create new error context
    pub fn new() -> Self {
        Self {
            request_id: None,
            operation: None,
            timestamp: Some(Utc::now()),
            metadata: HashMap::new(),
        }
    }

    /// Set request ID for correlation
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set operation name
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add metadata key-value pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Append the context to a message as `[key: value]` tags
    pub fn annotate(&self, message: impl Into<String>) -> String {
        let mut annotated = message.into();

        if let Some(request_id) = &self.request_id {
            annotated.push_str(&format!(" [request_id: {request_id}]"));
        }

        if let Some(operation) = &self.operation {
            annotated.push_str(&format!(" [operation: {operation}]"));
        }

        let mut keys: Vec<_> = self.metadata.keys().collect();
        keys.sort();
        for key in keys {
            annotated.push_str(&format!(" [{key}: {}]", self.metadata[key]));
        }

        annotated
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised while setting up or configuring the extractor
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Configuration file not found or invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Model registry error (task not found, invalid format)
    #[error("Model registry error: {message}")]
    ModelRegistry { message: String },

    /// Prompt registry error (version not found, invalid template)
    #[error("Prompt registry error: {message}")]
    PromptRegistry { message: String },

    /// Port reference dataset holds a code with conflicting names
    #[error("Duplicate port code '{code}': '{existing}' conflicts with '{conflicting}'")]
    DuplicatePortCode {
        code: String,
        existing: String,
        conflicting: String,
    },

    /// Prompt could not be rendered for an email
    #[error("Prompt error: {message}")]
    Prompt { message: String },

    /// HTTP client construction or request failure
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing error
    #[error("YAML error: {message}")]
    Yaml { message: String },

    /// I/O error (file operations)
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl ExtractorError {
    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Create a model registry error
    pub fn model_registry<T: ToString>(message: T) -> Self {
        Self::ModelRegistry {
            message: message.to_string(),
        }
    }

    /// Create a prompt registry error
    pub fn prompt_registry<T: ToString>(message: T) -> Self {
        Self::PromptRegistry {
            message: message.to_string(),
        }
    }

    /// Create a prompt rendering error
    pub fn prompt<T: ToString>(message: T) -> Self {
        Self::Prompt {
            message: message.to_string(),
        }
    }

    /// Create an HTTP error with correlation context
    pub fn http_with_context<T: ToString>(message: T, context: &ErrorContext) -> Self {
        Self::Http {
            message: context.annotate(message.to_string()),
        }
    }

    /// Create a JSON error
    pub fn json<T: ToString>(message: T) -> Self {
        Self::Json {
            message: message.to_string(),
        }
    }

    /// Create a YAML error
    pub fn yaml<T: ToString>(message: T) -> Self {
        Self::Yaml {
            message: message.to_string(),
        }
    }

    /// Create an I/O error
    pub fn io<T: ToString>(message: T) -> Self {
        Self::Io {
            message: message.to_string(),
        }
    }
}
