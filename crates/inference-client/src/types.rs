// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request and outcome types for inference calls

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default completion length budget
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// A single completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Optional system message preceding the prompt
    pub system_prompt: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with no system message and default token budget
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            system_prompt: None,
            prompt: prompt.into(),
            model: model.into(),
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the system message
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the maximum number of tokens to generate
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Same request against a different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// Classification of a failed inference call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Service rejected the call for exceeding its rate limit
    RateLimited,
    /// Timeout, connection failure or server-side error
    TransientNetwork,
    /// Requested model is unknown, decommissioned or unavailable
    ModelUnavailable,
    /// Credentials were rejected
    Authentication,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Whether the same call may succeed if repeated later
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientNetwork)
    }

    /// Whether repeating the call against a different model may succeed
    pub const fn is_substitutable(self) -> bool {
        matches!(self, Self::ModelUnavailable)
    }

    /// Stable identifier for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::TransientNetwork => "transient_network",
            Self::ModelUnavailable => "model_unavailable",
            Self::Authentication => "authentication",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified inference failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct InferenceFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Provider or transport message
    pub message: String,
}

impl InferenceFailure {
    /// Create a new classified failure
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of one inference call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// Raw completion text
    Success(String),
    /// Failure that may clear up on retry
    RetryableFailure(InferenceFailure),
    /// Failure that retrying the same call will not fix
    FatalFailure(InferenceFailure),
}

impl InferenceOutcome {
    /// Wrap a classified failure in the matching variant
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        let failure = InferenceFailure::new(kind, message);
        if kind.is_retryable() {
            Self::RetryableFailure(failure)
        } else {
            Self::FatalFailure(failure)
        }
    }

    /// Rate-limited failure
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::RateLimited, message)
    }

    /// Transient network failure
    pub fn transient(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::TransientNetwork, message)
    }

    /// Model unavailable failure
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::ModelUnavailable, message)
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure classification, if the call failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::RetryableFailure(failure) | Self::FatalFailure(failure) => Some(failure.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_constructor_picks_variant_by_kind() {
        assert!(matches!(
            InferenceOutcome::failure(FailureKind::RateLimited, "429"),
            InferenceOutcome::RetryableFailure(_)
        ));
        assert!(matches!(
            InferenceOutcome::failure(FailureKind::TransientNetwork, "timeout"),
            InferenceOutcome::RetryableFailure(_)
        ));
        assert!(matches!(
            InferenceOutcome::failure(FailureKind::Authentication, "bad key"),
            InferenceOutcome::FatalFailure(_)
        ));
        assert!(matches!(
            InferenceOutcome::model_unavailable("decommissioned"),
            InferenceOutcome::FatalFailure(_)
        ));
    }

    #[test]
    fn only_model_unavailable_is_substitutable() {
        assert!(FailureKind::ModelUnavailable.is_substitutable());
        assert!(!FailureKind::Authentication.is_substitutable());
        assert!(!FailureKind::RateLimited.is_substitutable());
        assert!(!FailureKind::Other.is_substitutable());
    }

    #[test]
    fn failure_kind_accessor() {
        assert_eq!(InferenceOutcome::Success("{}".to_string()).failure_kind(), None);
        assert_eq!(
            InferenceOutcome::rate_limited("slow down").failure_kind(),
            Some(FailureKind::RateLimited)
        );
    }

    #[test]
    fn request_model_substitution_keeps_prompt() {
        let request = CompletionRequest::new("extract", "primary-model", 0.0)
            .with_system_prompt("system")
            .with_max_tokens(256);
        let fallback = request.with_model("fallback-model");

        assert_eq!(fallback.model, "fallback-model");
        assert_eq!(fallback.prompt, "extract");
        assert_eq!(fallback.system_prompt.as_deref(), Some("system"));
        assert_eq!(fallback.max_tokens, 256);
    }

    #[test]
    fn failure_display() {
        let failure = InferenceFailure::new(FailureKind::Authentication, "Invalid API key");
        assert_eq!(failure.to_string(), "authentication: Invalid API key");
    }
}
