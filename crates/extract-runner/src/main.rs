// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shipment extraction batch runner
//!
//! Extracts structured shipment records from a batch of freight emails.

use anyhow::Result;
use extract_runner::{RunnerConfig, run, shutdown_signal_handler};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunnerConfig::load()?;
    info!(?config, "Starting shipment extraction");

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    let signals = tokio::spawn(async move { shutdown_signal_handler(signal_token).await });

    let outcome = run(&config, &cancellation_token).await;

    cancellation_token.cancel();
    signals.await?;

    let summary = outcome?;
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Extraction finished"
    );

    Ok(())
}
