// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Retry governor for inference calls
//!
//! Drives one email's calls through the attempt/backoff state machine:
//!
//! ```text
//! ATTEMPT -> SUCCESS
//!         -> RETRYABLE_FAILURE -> BACKOFF -> ATTEMPT   (while retries remain)
//!         -> FATAL_FAILURE -> ATTEMPT on fallback model (first attempt, once)
//!         -> FATAL_FAILURE                              (terminal)
//! ```
//!
//! A fallback substitution does not consume a retry, so one email makes at
//! most `max_retries + 2` calls.

use std::time::Duration;

use inference_client::{CompletionRequest, InferenceClient, InferenceFailure, InferenceOutcome};
use shipment_types::{ExtractionFailure, FailureReason};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{ModelPair, RetryPolicy};

/// Successful governed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernedResponse {
    /// Raw completion text
    pub text: String,
    /// Calls made, including the successful one
    pub attempts: u32,
    /// Model that produced the text
    pub model: String,
    /// Whether the fallback model was substituted
    pub fallback_used: bool,
    /// Backoff delays slept, in order
    pub delays: Vec<Duration>,
}

/// Terminal outcome of a governed call that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernorFailure {
    /// Retryable failures persisted past the retry budget
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RateLimitedExhausted {
        /// Calls made
        attempts: u32,
        /// Last failure observed
        last: InferenceFailure,
    },

    /// A failure that neither retrying nor substitution can fix
    #[error("inference failed after {attempts} attempts: {failure}")]
    Fatal {
        /// Calls made
        attempts: u32,
        /// The terminal failure
        failure: InferenceFailure,
    },
}

impl GovernorFailure {
    /// Calls made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RateLimitedExhausted { attempts, .. } | Self::Fatal { attempts, .. } => *attempts,
        }
    }

    /// Failure category recorded for the email
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::RateLimitedExhausted { .. } => FailureReason::RateLimitedExhausted,
            Self::Fatal { .. } => FailureReason::ApiError,
        }
    }

    /// Convert into the per-email failure entry
    pub fn into_extraction_failure(self, email_id: &str) -> ExtractionFailure {
        ExtractionFailure::new(email_id, self.reason(), self.to_string())
    }
}

/// Bounded retry and fallback policy around an [`InferenceClient`]
#[derive(Debug, Clone)]
pub struct RetryGovernor {
    policy: RetryPolicy,
    models: ModelPair,
}

impl RetryGovernor {
    /// Create a governor
    pub fn new(policy: RetryPolicy, models: ModelPair) -> Self {
        Self { policy, models }
    }

    /// Backoff settings
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Primary and fallback models
    pub fn models(&self) -> &ModelPair {
        &self.models
    }

    /// Run a request until it succeeds or reaches a terminal failure
    ///
    /// The request's model is replaced with the primary model before the
    /// first attempt.
    #[instrument(skip(self, client, request), fields(client = client.name()))]
    pub async fn execute<C: InferenceClient>(
        &self,
        client: &C,
        request: &CompletionRequest,
        email_id: &str,
    ) -> Result<GovernedResponse, GovernorFailure> {
        let mut current = request.with_model(self.models.primary.as_str());
        let mut attempts = 0u32;
        let mut retries_used = 0u32;
        let mut fallback_used = false;
        let mut delays = Vec::new();

        loop {
            attempts += 1;
            debug!(attempt = attempts, model = %current.model, "Calling inference service");

            match client.complete(&current).await {
                InferenceOutcome::Success(text) => {
                    if attempts > 1 {
                        info!(attempts, model = %current.model, fallback_used, "Succeeded after retry");
                    }
                    return Ok(GovernedResponse {
                        text,
                        attempts,
                        model: current.model,
                        fallback_used,
                        delays,
                    });
                }
                InferenceOutcome::RetryableFailure(failure) => {
                    if retries_used >= self.policy.max_retries {
                        warn!(
                            attempts,
                            kind = %failure.kind,
                            "Retry budget exhausted"
                        );
                        return Err(GovernorFailure::RateLimitedExhausted {
                            attempts,
                            last: failure,
                        });
                    }

                    retries_used += 1;
                    let delay = self.policy.delay_for(retries_used);
                    warn!(
                        attempt = attempts,
                        retry = retries_used,
                        kind = %failure.kind,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delays.push(delay);
                }
                InferenceOutcome::FatalFailure(failure) => {
                    let fallback = self.models.distinct_fallback();
                    match fallback {
                        Some(fallback)
                            if failure.kind.is_substitutable() && attempts == 1 && !fallback_used =>
                        {
                            warn!(
                                primary = %current.model,
                                fallback = %fallback,
                                kind = %failure.kind,
                                "Primary model unavailable, switching to fallback"
                            );
                            fallback_used = true;
                            current = current.with_model(fallback);
                        }
                        _ => {
                            warn!(attempts, kind = %failure.kind, "Fatal inference failure");
                            return Err(GovernorFailure::Fatal { attempts, failure });
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use inference_client::{
        FailureKind,
        testing::{ScriptStep, ScriptedClient},
    };
    use tokio::time::Instant;

    use super::*;

    const PRIMARY: &str = "llama-3.1-70b-versatile";
    const FALLBACK: &str = "llama-3.3-70b-versatile";

    fn governor() -> RetryGovernor {
        RetryGovernor::new(
            RetryPolicy::default(),
            ModelPair::new(PRIMARY).with_fallback(FALLBACK),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("extract", "unset", 0.0)
    }

    fn ok(text: &str) -> ScriptStep {
        InferenceOutcome::Success(text.to_string()).into()
    }

    fn rate_limited() -> ScriptStep {
        InferenceOutcome::rate_limited("429 Too Many Requests").into()
    }

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_secs).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success() {
        let client = ScriptedClient::new([ok("{}")]);

        let response = governor()
            .execute(&client, &request(), "EMAIL_001")
            .await
            .unwrap();

        assert_eq!(response.text, "{}");
        assert_eq!(response.attempts, 1);
        assert_eq!(response.model, PRIMARY);
        assert!(!response.fallback_used);
        assert!(response.delays.is_empty());
        assert_eq!(client.models(), vec![PRIMARY]);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_schedule_doubles() {
        let client = ScriptedClient::new([rate_limited(), rate_limited(), rate_limited(), ok("{}")]);
        let started = Instant::now();

        let response = governor()
            .execute(&client, &request(), "EMAIL_001")
            .await
            .unwrap();

        assert_eq!(response.attempts, 4);
        assert_eq!(response.delays, secs(&[2, 4, 8]));
        assert!(started.elapsed() >= Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_on_fourth_failure() {
        let client = ScriptedClient::new([
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            ok("never reached"),
        ]);

        let failure = governor()
            .execute(&client, &request(), "EMAIL_001")
            .await
            .unwrap_err();

        assert!(matches!(
            failure,
            GovernorFailure::RateLimitedExhausted { attempts: 4, .. }
        ));
        assert_eq!(failure.reason(), FailureReason::RateLimitedExhausted);
        assert_eq!(client.call_count(), 4);
        assert_eq!(client.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_network_failures_are_retried() {
        let client = ScriptedClient::new([
            ScriptStep::from(InferenceOutcome::transient("connection reset")),
            ok("{}"),
        ]);

        let response = governor()
            .execute(&client, &request(), "EMAIL_002")
            .await
            .unwrap();

        assert_eq!(response.attempts, 2);
        assert_eq!(response.delays, secs(&[2]));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_fails_on_first_retryable() {
        let governor = RetryGovernor::new(
            RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
            ModelPair::new(PRIMARY),
        );
        let client = ScriptedClient::new([rate_limited()]);

        let failure = governor
            .execute(&client, &request(), "EMAIL_002")
            .await
            .unwrap_err();
        assert_eq!(failure.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_failure_is_immediately_fatal() {
        let client = ScriptedClient::new([
            ScriptStep::from(InferenceOutcome::failure(FailureKind::Authentication, "Invalid API Key")),
            ok("never reached"),
        ]);

        let failure = governor()
            .execute(&client, &request(), "EMAIL_003")
            .await
            .unwrap_err();

        assert!(matches!(failure, GovernorFailure::Fatal { attempts: 1, .. }));
        assert_eq!(failure.reason(), FailureReason::ApiError);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_primary_switches_to_fallback() {
        let client = ScriptedClient::new([
            ScriptStep::from(InferenceOutcome::model_unavailable("model_decommissioned")),
            ok("{}"),
        ]);

        let response = governor()
            .execute(&client, &request(), "EMAIL_004")
            .await
            .unwrap();

        assert!(response.fallback_used);
        assert_eq!(response.model, FALLBACK);
        assert_eq!(response.attempts, 2);
        assert!(response.delays.is_empty());
        assert_eq!(client.models(), vec![PRIMARY, FALLBACK]);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_happens_at_most_once() {
        let client = ScriptedClient::new([
            ScriptStep::from(InferenceOutcome::model_unavailable("primary gone")),
            ScriptStep::from(InferenceOutcome::model_unavailable("fallback gone")),
            ok("never reached"),
        ]);

        let failure = governor()
            .execute(&client, &request(), "EMAIL_004")
            .await
            .unwrap_err();

        assert!(matches!(failure, GovernorFailure::Fatal { attempts: 2, .. }));
        assert_eq!(client.models(), vec![PRIMARY, FALLBACK]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_substitution_without_distinct_fallback() {
        let governor = RetryGovernor::new(
            RetryPolicy::default(),
            ModelPair::new(PRIMARY).with_fallback(PRIMARY),
        );
        let client = ScriptedClient::new([ScriptStep::from(InferenceOutcome::model_unavailable("gone"))]);

        let failure = governor
            .execute(&client, &request(), "EMAIL_005")
            .await
            .unwrap_err();
        assert_eq!(failure.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_substitution_after_first_attempt() {
        let client = ScriptedClient::new([
            rate_limited(),
            ScriptStep::from(InferenceOutcome::model_unavailable("gone mid-run")),
            ok("never reached"),
        ]);

        let failure = governor()
            .execute(&client, &request(), "EMAIL_005")
            .await
            .unwrap_err();

        assert!(matches!(failure, GovernorFailure::Fatal { attempts: 2, .. }));
        assert_eq!(client.models(), vec![PRIMARY, PRIMARY]);
    }

    #[tokio::test(start_paused = true)]
    async fn total_calls_bounded_by_retries_plus_fallback() {
        let client = ScriptedClient::new([
            ScriptStep::from(InferenceOutcome::model_unavailable("gone")),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            ok("never reached"),
        ]);
        let governor = governor();

        let failure = governor
            .execute(&client, &request(), "EMAIL_006")
            .await
            .unwrap_err();

        let max_calls = governor.policy().max_retries as usize + 2;
        assert_eq!(client.call_count(), max_calls);
        assert_eq!(failure.attempts() as usize, max_calls);
        assert_eq!(failure.reason(), FailureReason::RateLimitedExhausted);
        assert_eq!(&client.models()[1..], vec![FALLBACK; 4].as_slice());
    }

    #[test]
    fn failure_maps_to_extraction_failure() {
        let failure = GovernorFailure::RateLimitedExhausted {
            attempts: 4,
            last: InferenceFailure::new(FailureKind::RateLimited, "429"),
        };

        let entry = failure.into_extraction_failure("EMAIL_007");
        assert_eq!(entry.id, "EMAIL_007");
        assert_eq!(entry.reason, FailureReason::RateLimitedExhausted);
        assert!(entry.detail.contains("4 attempts"));
    }
}
