// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Inference client abstraction with classified call outcomes
//!
//! This crate defines the seam between the extraction pipeline and a hosted
//! model-completion service.
//!
//! # Core Abstractions
//!
//! - **`InferenceClient` Trait**: a single completion call per invocation, no retries
//! - **`InferenceOutcome`**: tagged result separating success, retryable and fatal failures
//! - **Classification**: maps HTTP status and provider error codes to a [`FailureKind`]
//!
//! Outcomes are plain values rather than errors, so retry logic built on top of
//! a client can be driven entirely by scripted outcomes in unit tests (see the
//! `test-util` feature).

pub mod classify;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use classify::classify_status;
pub use types::{CompletionRequest, FailureKind, InferenceFailure, InferenceOutcome};

/// Client for an external model-completion endpoint
///
/// Implementations perform exactly one request per call and translate every
/// failure into a classified [`InferenceOutcome`]; they never retry on their own.
pub trait InferenceClient: Send + Sync {
    /// Run one completion request
    ///
    /// # Arguments
    ///
    /// * `request` - Prompt, model identifier and sampling parameters
    ///
    /// # Returns
    ///
    /// * `InferenceOutcome::Success(text)` with the raw completion text
    /// * `InferenceOutcome::RetryableFailure(_)` for rate limiting and transient errors
    /// * `InferenceOutcome::FatalFailure(_)` for authentication, unavailable models and
    ///   anything unclassified
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = InferenceOutcome> + Send;

    /// Get the name/identifier of this client
    fn name(&self) -> &'static str;
}
