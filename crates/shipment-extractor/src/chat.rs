// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! OpenAI-compatible chat-completions client
//!
//! This module provides the production [`InferenceClient`] used for extraction.
//! It issues exactly one HTTP request per call and classifies every failure;
//! retries and model substitution belong to the [`crate::retry`] governor.

use std::time::{Duration, Instant};

use inference_client::{
    CompletionRequest, FailureKind, InferenceClient, InferenceOutcome, classify_status,
};
use reqwest::{
    Client, ClientBuilder,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::{Span, debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    config::InferenceConfig,
    error::{ErrorContext, ExtractorError, ExtractorResult},
};

/// Chat completion API request body
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// A single message in the chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
        }
    }
}

/// Chat completion API response
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Deserialize)]
struct TokenUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Provider error envelope
#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Chat-completions client for extraction calls
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    /// HTTP client for API requests
    client: Client,
    /// Resolved `chat/completions` endpoint
    endpoint: Url,
}

impl ChatCompletionClient {
    /// Create a new client from the inference configuration
    pub fn new(config: &InferenceConfig) -> ExtractorResult<Self> {
        let base_url = config.resolved_base_url()?;
        let endpoint = base_url
            .join("chat/completions")
            .map_err(|e| ExtractorError::config(format!("Invalid base URL: {e}")))?;
        let timeout = Duration::from_secs(config.timeout_seconds);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| ExtractorError::config(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = ClientBuilder::new()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("shipment-extractor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                let context = ErrorContext::new()
                    .with_operation("client_setup")
                    .with_metadata("base_url", base_url.as_str());
                ExtractorError::http_with_context(
                    format!("Failed to create HTTP client: {e}"),
                    &context,
                )
            })?;

        info!(
            "Created chat-completions client with base URL: {} and timeout: {}s",
            base_url, config.timeout_seconds
        );

        Ok(Self { client, endpoint })
    }

    fn body_for(request: &CompletionRequest) -> ChatCompletionBody {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage::new("system", system));
        }
        messages.push(ChatMessage::new("user", &request.prompt));

        ChatCompletionBody {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    /// Classify a failure that happened before a status code was received
    fn classify_transport(err: &reqwest::Error) -> FailureKind {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            FailureKind::TransientNetwork
        } else {
            FailureKind::Other
        }
    }

    /// Classify a non-success response
    fn classify_error_response(
        status: u16,
        response_text: &str,
        context: &ErrorContext,
    ) -> InferenceOutcome {
        let (kind, message) = match serde_json::from_str::<ApiErrorResponse>(response_text) {
            Ok(envelope) => {
                let error = envelope.error;
                let kind = classify_status(status, error.code.as_deref(), &error.message);
                let message = format!(
                    "API error ({}): {} (type: {:?}, code: {:?})",
                    status, error.message, error.r#type, error.code
                );
                (kind, message)
            }
            Err(_) => (
                classify_status(status, None, response_text),
                format!("HTTP {} error: {}", status, truncate(response_text, 200)),
            ),
        };

        warn!(status, kind = %kind, "Inference request failed");
        InferenceOutcome::failure(kind, context.annotate(message))
    }

    /// Turn a parsed completion into an outcome
    fn process_completion(
        completion: ChatCompletionResponse,
        request_id: Uuid,
        context: &ErrorContext,
    ) -> InferenceOutcome {
        if let Some(usage) = completion.usage {
            debug!(
                request_id = %request_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Token usage statistics"
            );
        }

        let Some(choice) = completion.choices.into_iter().next() else {
            return InferenceOutcome::failure(
                FailureKind::Other,
                context.annotate("No choices in completion response"),
            );
        };

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => {
                debug!(
                    request_id = %request_id,
                    completion_id = completion.id.as_deref().unwrap_or("unknown"),
                    finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
                    response_length = content.len(),
                    "Received completion"
                );
                InferenceOutcome::Success(content)
            }
            _ => InferenceOutcome::failure(
                FailureKind::Other,
                context.annotate("Empty completion content"),
            ),
        }
    }
}

impl InferenceClient for ChatCompletionClient {
    #[instrument(skip(self, request), fields(model = %request.model, request_id))]
    async fn complete(&self, request: &CompletionRequest) -> InferenceOutcome {
        let request_id = Uuid::new_v4();
        Span::current().record("request_id", request_id.to_string());

        let context = ErrorContext::new()
            .with_request_id(request_id.to_string())
            .with_operation("chat_completion")
            .with_metadata("model", request.model.as_str());

        debug!(
            request_id = %request_id,
            prompt_length = request.prompt.len(),
            "Sending chat completion request"
        );

        let body = Self::body_for(request);
        let start_time = Instant::now();

        let response = match self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let kind = Self::classify_transport(&e);
                warn!(request_id = %request_id, kind = %kind, error = %e, "Transport failure");
                return InferenceOutcome::failure(kind, context.annotate(e.to_string()));
            }
        };

        let status = response.status();
        let response_text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return InferenceOutcome::failure(
                    Self::classify_transport(&e),
                    context.annotate(format!("Failed to read response body: {e}")),
                );
            }
        };

        debug!(
            request_id = %request_id,
            status = status.as_u16(),
            duration_ms = start_time.elapsed().as_millis(),
            "API request completed"
        );

        if !status.is_success() {
            return Self::classify_error_response(status.as_u16(), &response_text, &context);
        }

        match serde_json::from_str::<ChatCompletionResponse>(&response_text) {
            Ok(completion) => Self::process_completion(completion, request_id, &context),
            Err(e) => InferenceOutcome::failure(
                FailureKind::Other,
                context.annotate(format!("Failed to parse response: {e}")),
            ),
        }
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

/// Shorten provider text for log-safe messages
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
