// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Failure classification for HTTP inference providers

use crate::types::FailureKind;

/// Provider error codes meaning the requested model cannot serve the call
const MODEL_UNAVAILABLE_CODES: &[&str] = &["model_decommissioned", "model_not_found", "model_not_active"];

/// Classify a non-success HTTP response
///
/// The provider error code wins over the status when it names an unavailable
/// model, since providers report decommissioned models as plain 400s.
///
/// # Arguments
///
/// * `status` - HTTP status code
/// * `error_code` - `error.code` from the provider's error body, if any
/// * `message` - `error.message` from the provider's error body, or the raw body
pub fn classify_status(status: u16, error_code: Option<&str>, message: &str) -> FailureKind {
    if error_code.is_some_and(|code| MODEL_UNAVAILABLE_CODES.contains(&code))
        || mentions_unavailable_model(message)
    {
        return FailureKind::ModelUnavailable;
    }

    match status {
        429 => FailureKind::RateLimited,
        408 | 500..=599 => FailureKind::TransientNetwork,
        401 | 403 => FailureKind::Authentication,
        404 => FailureKind::ModelUnavailable,
        _ => FailureKind::Other,
    }
}

fn mentions_unavailable_model(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("model")
        && (message.contains("decommissioned") || message.contains("does not exist"))
}
