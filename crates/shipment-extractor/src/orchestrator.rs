// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Batch extraction orchestrator
//!
//! This module provides [`BatchOrchestrator`], which drives every email of a
//! batch through prompt construction, the retry governor and the record
//! validator. Emails are processed strictly one at a time in input order.
//! Every per-item failure, including a panic, is recorded in the batch result
//! instead of aborting the run.

use std::{any::Any, sync::Arc, time::Duration};

use inference_client::{CompletionRequest, InferenceClient, types::DEFAULT_MAX_TOKENS};
use shipment_types::{BatchResult, EmailRecord, ExtractionFailure, ShipmentRecord};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    chat::ChatCompletionClient,
    config::{DEFAULT_INTER_ITEM_DELAY, ExtractorConfig},
    error::ExtractorResult,
    prompt::{PromptBuilder, TemplatePromptBuilder},
    reference::ReferenceIndex,
    retry::RetryGovernor,
    validator::RecordValidator,
};

/// Sampling parameters applied to every request of a batch
#[derive(Debug, Clone, Copy, PartialEq)]
struct RequestSettings {
    temperature: f32,
    max_tokens: u32,
}

/// Sequential, cancellable batch driver
///
/// The orchestrator holds no mutable state: running it twice over the same
/// input with a deterministic client yields identical results.
#[derive(Debug)]
pub struct BatchOrchestrator<C, P> {
    client: Arc<C>,
    prompts: Arc<P>,
    index: Arc<ReferenceIndex>,
    governor: Arc<RetryGovernor>,
    validator: Arc<RecordValidator>,
    settings: RequestSettings,
    inter_item_delay: Duration,
}

impl<C, P> Clone for BatchOrchestrator<C, P> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            prompts: Arc::clone(&self.prompts),
            index: Arc::clone(&self.index),
            governor: Arc::clone(&self.governor),
            validator: Arc::clone(&self.validator),
            settings: self.settings,
            inter_item_delay: self.inter_item_delay,
        }
    }
}

impl BatchOrchestrator<ChatCompletionClient, TemplatePromptBuilder> {
    /// Wire the production client and template prompt builder from configuration
    #[instrument(skip_all, fields(ports = index.len()))]
    pub fn from_config(config: &ExtractorConfig, index: Arc<ReferenceIndex>) -> ExtractorResult<Self> {
        let client = ChatCompletionClient::new(&config.inference)?;
        let prompt = config.prompt()?;
        let prompts = TemplatePromptBuilder::new(prompt, &index, config.max_reference_ports)?;
        let governor = RetryGovernor::new(config.retry, config.models()?.clone());

        let summary = config.get_summary();
        info!(
            primary_model = ?summary.primary_model,
            fallback_model = ?summary.fallback_model,
            prompt_version = %prompt.version,
            max_retries = summary.max_retries,
            "Extraction pipeline configured"
        );

        Ok(Self::new(Arc::new(client), Arc::new(prompts), index, governor)
            .with_temperature(config.inference.temperature)
            .with_max_tokens(config.inference.max_tokens)
            .with_inter_item_delay(config.inter_item_delay))
    }
}

impl<C, P> BatchOrchestrator<C, P>
where
    C: InferenceClient + 'static,
    P: PromptBuilder + 'static,
{
    /// Create an orchestrator with deterministic sampling and the default throttle
    pub fn new(
        client: Arc<C>,
        prompts: Arc<P>,
        index: Arc<ReferenceIndex>,
        governor: RetryGovernor,
    ) -> Self {
        let validator = RecordValidator::new(Arc::clone(&index));
        Self {
            client,
            prompts,
            index,
            governor: Arc::new(governor),
            validator: Arc::new(validator),
            settings: RequestSettings {
                temperature: 0.0,
                max_tokens: DEFAULT_MAX_TOKENS,
            },
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = temperature;
        self
    }

    /// Set the completion length budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = max_tokens;
        self
    }

    /// Set the pause between consecutive emails
    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    /// Reference index shared with the validator
    pub fn index(&self) -> &Arc<ReferenceIndex> {
        &self.index
    }

    /// Process a batch of emails in input order
    ///
    /// Cancellation is honored between items only; an item already in flight
    /// runs to completion. The result is marked cancelled when items were
    /// skipped.
    #[instrument(skip_all, fields(emails = emails.len(), client = self.client.name()))]
    pub async fn run(&self, emails: &[EmailRecord], cancel: &CancellationToken) -> BatchResult {
        let total = emails.len();
        let mut builder = BatchResult::builder();

        info!(
            prompt_version = self.prompts.version(),
            "Starting extraction of {} emails", total
        );

        for (position, email) in emails.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    processed = builder.processed(),
                    remaining = total - position,
                    "Cancellation requested, stopping batch"
                );
                builder.mark_cancelled();
                break;
            }

            let outcome = self.process_isolated(email).await;
            match &outcome {
                Ok(_) => info!("[{}/{}] {} ✓", position + 1, total, email.id),
                Err(failure) => info!(
                    "[{}/{}] {} ✗ {}",
                    position + 1,
                    total,
                    email.id,
                    failure.reason
                ),
            }
            builder.push(outcome);

            if position + 1 < total && !self.inter_item_delay.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(self.inter_item_delay) => {}
                }
            }
        }

        let result = builder.build();
        info!(
            total = result.total(),
            succeeded = result.succeeded(),
            failed = result.failed(),
            cancelled = result.was_cancelled(),
            "Extraction batch complete"
        );
        result
    }

    /// Run one email on its own task so a panic cannot escape the batch
    async fn process_isolated(&self, email: &EmailRecord) -> Result<ShipmentRecord, ExtractionFailure> {
        let handle = tokio::spawn(extract_item(
            Arc::clone(&self.client),
            Arc::clone(&self.prompts),
            Arc::clone(&self.governor),
            Arc::clone(&self.validator),
            self.settings,
            email.clone(),
        ));

        match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let detail = describe_join_error(join_error);
                warn!(email_id = %email.id, detail = %detail, "Extraction task aborted");
                Err(ExtractionFailure::api_error(&email.id, detail))
            }
        }
    }
}

/// Full pipeline for one email
#[instrument(skip_all, fields(email_id = %email.id))]
async fn extract_item<C, P>(
    client: Arc<C>,
    prompts: Arc<P>,
    governor: Arc<RetryGovernor>,
    validator: Arc<RecordValidator>,
    settings: RequestSettings,
    email: EmailRecord,
) -> Result<ShipmentRecord, ExtractionFailure>
where
    C: InferenceClient,
    P: PromptBuilder,
{
    let prompt = prompts
        .build(&email)
        .map_err(|e| ExtractionFailure::api_error(&email.id, e.to_string()))?;

    let mut request = CompletionRequest::new(
        prompt.user,
        governor.models().primary.as_str(),
        settings.temperature,
    )
    .with_max_tokens(settings.max_tokens);
    if !prompt.system.is_empty() {
        request = request.with_system_prompt(prompt.system);
    }

    let response = governor
        .execute(client.as_ref(), &request, &email.id)
        .await
        .map_err(|failure| failure.into_extraction_failure(&email.id))?;

    debug!(
        attempts = response.attempts,
        model = %response.model,
        fallback_used = response.fallback_used,
        response_length = response.text.len(),
        "Received model output"
    );

    validator.validate(&response.text, &email.id)
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_cancelled() {
        return "extraction task was cancelled".to_string();
    }

    match error.try_into_panic() {
        Ok(payload) => format!("panic during extraction: {}", panic_message(payload.as_ref())),
        Err(error) => format!("extraction task failed: {error}"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
