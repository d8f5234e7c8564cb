// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Port reference index
//!
//! Maps normalized UN/LOCODE port codes to their canonical names. The index is
//! built once from the reference dataset and shared read-only behind an `Arc`.

use std::collections::{HashMap, hash_map::Entry};

use serde::{Deserialize, Serialize};
use shipment_types::PortReference;
use tracing::{debug, info, warn};

use crate::error::{ExtractorError, ExtractorResult};

/// Handling of a port code that appears more than once in the reference data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// First occurrence is canonical; later differing names become prompt aliases
    #[default]
    KeepFirst,
    /// Conflicting names for one code fail the build
    Reject,
}

#[derive(Debug, Clone)]
struct PortEntry {
    name: String,
    aliases: Vec<String>,
}

/// Normalize a port code for storage and lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Read-only lookup from port code to canonical port name
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    ports: HashMap<String, PortEntry>,
}

impl ReferenceIndex {
    /// Build the index from reference records
    ///
    /// Entries with a blank code are skipped with a warning.
    pub fn build<I>(references: I, policy: DuplicatePolicy) -> ExtractorResult<Self>
    where
        I: IntoIterator<Item = PortReference>,
    {
        let mut ports: HashMap<String, PortEntry> = HashMap::new();
        let mut records = 0usize;

        for reference in references {
            records += 1;
            let code = normalize_code(&reference.code);
            let name = reference.name.trim().to_string();

            if code.is_empty() {
                warn!(name = %name, "Skipping port reference with empty code");
                continue;
            }

            match ports.entry(code) {
                Entry::Vacant(slot) => {
                    slot.insert(PortEntry {
                        name,
                        aliases: Vec::new(),
                    });
                }
                Entry::Occupied(slot) => {
                    let code = slot.key().clone();
                    let entry = slot.into_mut();
                    if entry.name == name || entry.aliases.contains(&name) {
                        continue;
                    }

                    match policy {
                        DuplicatePolicy::Reject => {
                            return Err(ExtractorError::DuplicatePortCode {
                                code,
                                existing: entry.name.clone(),
                                conflicting: name,
                            });
                        }
                        DuplicatePolicy::KeepFirst => {
                            warn!(
                                code = %code,
                                canonical = %entry.name,
                                alias = %name,
                                "Duplicate port code; keeping first name"
                            );
                            entry.aliases.push(name);
                        }
                    }
                }
            }
        }

        info!(
            records,
            unique_codes = ports.len(),
            "Built port reference index"
        );

        Ok(Self { ports })
    }

    /// Canonical name for a port code, if known
    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.ports
            .get(&normalize_code(code))
            .map(|entry| entry.name.as_str())
    }

    /// Whether the code is known
    pub fn contains(&self, code: &str) -> bool {
        self.ports.contains_key(&normalize_code(code))
    }

    /// Number of distinct codes
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Whether the index holds no codes
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Render up to `max_ports` entries as `- CODE: Name[, Alias]` lines, sorted by code
    pub fn prompt_listing(&self, max_ports: usize) -> String {
        let mut codes: Vec<&String> = self.ports.keys().collect();
        codes.sort();

        let lines: Vec<String> = codes
            .into_iter()
            .take(max_ports)
            .filter_map(|code| {
                self.ports.get(code).map(|entry| {
                    let mut names = vec![entry.name.as_str()];
                    names.extend(entry.aliases.iter().map(String::as_str));
                    format!("- {}: {}", code, names.join(", "))
                })
            })
            .collect();

        debug!(
            rendered = lines.len(),
            total = self.ports.len(),
            "Rendered port listing"
        );

        lines.join("\n")
    }
}
