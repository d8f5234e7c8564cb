// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Batch runner for the shipment extraction pipeline
//!
//! Reads the email batch and port reference from disk, drives the
//! [`shipment_extractor::BatchOrchestrator`] over it and writes the extracted
//! records and failure entries back out as JSON.

pub mod config;
pub mod loader;

use std::sync::Arc;

use anyhow::{Context, Result};
use shipment_extractor::{BatchOrchestrator, ReferenceIndex};
use shipment_types::BatchSummary;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub use config::{PathsConfig, RunnerConfig, TimeoutSeconds};

/// Run one extraction batch end to end
///
/// Per-email failures are written to the failures file and do not make the
/// run fail. A cancelled run still writes what it processed.
///
/// # Errors
///
/// Returns an error if configuration, inputs or outputs cannot be handled.
#[instrument(skip_all, fields(emails = %config.paths.emails.display()))]
pub async fn run(config: &RunnerConfig, cancel: &CancellationToken) -> Result<BatchSummary> {
    let extractor = config.extractor_config().await?;

    let emails = loader::load_emails(&config.paths.emails).await?;
    let ports = loader::load_ports(&config.paths.ports).await?;
    let index = ReferenceIndex::build(ports, extractor.duplicate_policy)
        .context("failed to build port reference index")?;
    info!(emails = emails.len(), ports = index.len(), "Inputs loaded");

    let orchestrator = BatchOrchestrator::from_config(&extractor, Arc::new(index))?;
    let result = orchestrator.run(&emails, cancel).await;

    let records = loader::output_records(&result, &emails, config.write_placeholders);
    loader::write_json(&config.paths.output, &records).await?;
    loader::write_json(&config.paths.failures, result.failures()).await?;

    let summary = result.summary();
    if result.was_cancelled() {
        warn!(%summary, pending = emails.len() - summary.total, "Batch cancelled before completion");
    } else {
        info!(
            %summary,
            output = %config.paths.output.display(),
            failures = %config.paths.failures.display(),
            "Batch complete"
        );
    }

    Ok(summary)
}

/// Handle shutdown signals and trigger coordinated cancellation
///
/// Listens for SIGINT (Ctrl+C) and SIGTERM and cancels the token when one
/// arrives. Returns early if the token is cancelled elsewhere.
pub async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
    let signal_received = async {
        #[cfg(unix)]
        #[allow(clippy::expect_used)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            }
        }

        #[cfg(not(unix))]
        #[allow(clippy::expect_used)]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
            "CTRL+C"
        }
    };

    tokio::select! {
        signal_name = signal_received => {
            warn!("Shutdown signal {} received, finishing the current email", signal_name);
            cancellation_token.cancel();
        },
        () = cancellation_token.cancelled() => {}
    }
}
