// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Reading pipeline inputs and writing its outputs

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use shipment_types::{BatchResult, EmailRecord, PortReference, ShipmentRecord};
use tracing::{debug, warn};

/// Read and parse a JSON document
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse as `T`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load the email batch
///
/// Repeated ids are kept but reported, since their records cannot be told
/// apart downstream.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub async fn load_emails(path: &Path) -> Result<Vec<EmailRecord>> {
    let emails: Vec<EmailRecord> = read_json(path).await?;

    let mut seen = HashSet::new();
    for email in &emails {
        if !seen.insert(email.id.as_str()) {
            warn!(id = %email.id, "Email id appears more than once in the input");
        }
    }

    debug!(count = emails.len(), path = %path.display(), "Loaded emails");
    Ok(emails)
}

/// Load the port reference dataset
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub async fn load_ports(path: &Path) -> Result<Vec<PortReference>> {
    let ports: Vec<PortReference> = read_json(path).await?;
    debug!(count = ports.len(), path = %path.display(), "Loaded port references");
    Ok(ports)
}

/// Write a value as pretty-printed JSON, creating parent directories
///
/// # Errors
///
/// Returns an error if serialization or any filesystem operation fails.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut contents = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    contents.push('\n');

    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Records for the output file, in input order
///
/// With `placeholders` set, every failed email contributes an all-null record
/// so the output lines up one-to-one with the processed input. Emails left
/// unprocessed by a cancelled run contribute nothing either way.
pub fn output_records(
    result: &BatchResult,
    emails: &[EmailRecord],
    placeholders: bool,
) -> Vec<ShipmentRecord> {
    if !placeholders {
        return result.records().to_vec();
    }

    let mut extracted: HashMap<&str, Vec<&ShipmentRecord>> = HashMap::new();
    for record in result.records().iter().rev() {
        extracted.entry(record.id.as_str()).or_default().push(record);
    }
    let mut failed: HashMap<&str, usize> = HashMap::new();
    for failure in result.failures() {
        *failed.entry(failure.id.as_str()).or_default() += 1;
    }

    let mut records = Vec::with_capacity(result.total());
    for email in emails.iter().take(result.total()) {
        let id = email.id.as_str();
        if let Some(record) = extracted.get_mut(id).and_then(Vec::pop) {
            records.push(record.clone());
        } else if let Some(count) = failed.get_mut(id)
            && *count > 0
        {
            *count -= 1;
            records.push(ShipmentRecord::placeholder(id));
        }
    }

    records
}
