// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Classified extraction failures

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an email did not produce a validated record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Model output held no parseable JSON object
    InvalidJson,
    /// A required field was missing, mistyped or out of range
    SchemaViolation,
    /// A port code was absent from the reference index
    UnresolvedPort,
    /// Retryable failures persisted past the retry budget
    RateLimitedExhausted,
    /// Fatal, authentication or unclassified failure
    ApiError,
}

impl FailureReason {
    /// Wire identifier
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::SchemaViolation => "schema_violation",
            Self::UnresolvedPort => "unresolved_port",
            Self::RateLimitedExhausted => "rate_limited_exhausted",
            Self::ApiError => "api_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed extraction for one email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// Identifier of the source email
    pub id: String,
    /// Failure classification
    pub reason: FailureReason,
    /// Diagnostic detail naming the offending field or code
    pub detail: String,
}

impl ExtractionFailure {
    /// Create a new extraction failure
    pub fn new(id: impl Into<String>, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason,
            detail: detail.into(),
        }
    }

    /// Create an `api_error` failure
    pub fn api_error(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(id, FailureReason::ApiError, detail)
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.id, self.reason, self.detail)
    }
}
