// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! LLM-backed shipment extraction from freight-forwarding emails
//!
//! This crate turns free-text emails into validated shipment records. A hosted
//! chat-completion model does the interpretation; everything around it is
//! deterministic: bounded retries, a single model fallback, schema checks and
//! port resolution against a reference dataset.
//!
//! # Architecture
//!
//! - [`reference`]: port code index built once from the reference dataset
//! - [`chat`]: OpenAI-compatible chat-completions client, one request per call
//! - [`prompt`]: versioned prompt templates filled per email
//! - [`retry`]: backoff and fallback state machine around the client
//! - [`validator`]: JSON location, schema checks and port resolution
//! - [`orchestrator`]: sequential, cancellable batch driver with per-item isolation
//! - [`config`]: model and prompt registries, inference and retry settings
//! - [`error`]: setup and configuration errors
//!
//! Per-email problems never surface as [`ExtractorError`]; they are classified
//! into [`shipment_types::ExtractionFailure`] entries of the batch result.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use shipment_extractor::{
//!     BatchOrchestrator, DuplicatePolicy, ExtractorConfig, ReferenceIndex, config::InferenceConfig,
//! };
//! use shipment_types::{EmailRecord, PortReference};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractorConfig::from_files(
//!     "assets/configs/models.yaml",
//!     "assets/prompts/extraction_prompts.json",
//!     InferenceConfig::new("gsk_your-api-key"),
//! )
//! .await?;
//!
//! let ports = vec![PortReference::new("INMAA", "Chennai")];
//! let index = Arc::new(ReferenceIndex::build(ports, DuplicatePolicy::KeepFirst)?);
//! let orchestrator = BatchOrchestrator::from_config(&config, index)?;
//!
//! let emails = vec![EmailRecord::new("EMAIL_001", "LCL to Chennai", "2 cbm, FOB")];
//! let result = orchestrator.run(&emails, &CancellationToken::new()).await;
//!
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod reference;
pub mod retry;
pub mod validator;

// Re-export main types for convenience
pub use chat::ChatCompletionClient;
pub use config::{ExtractorConfig, InferenceConfig, ModelPair, ModelRegistry, PromptRegistry, RetryPolicy};
pub use error::{ExtractorError, ExtractorResult};
pub use orchestrator::BatchOrchestrator;
pub use prompt::{Prompt, PromptBuilder, TemplatePromptBuilder};
pub use reference::{DuplicatePolicy, ReferenceIndex};
pub use retry::{GovernedResponse, GovernorFailure, RetryGovernor};
pub use validator::{RecordValidator, ValidationError};
