// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Batch result accumulation
//!
//! A [`BatchResultBuilder`] is filled one item at a time while a batch runs and
//! is then frozen into an immutable [`BatchResult`]. Counts are derived from the
//! accumulated sequences, so they can never disagree with them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{failure::ExtractionFailure, shipment::ShipmentRecord};

/// Aggregate counts for a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Items processed
    pub total: usize,
    /// Items that produced a validated record
    pub succeeded: usize,
    /// Items that produced a failure entry
    pub failed: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} succeeded={} failed={}",
            self.total, self.succeeded, self.failed
        )
    }
}

/// Final outcome of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    records: Vec<ShipmentRecord>,
    failures: Vec<ExtractionFailure>,
    total: usize,
    succeeded: usize,
    failed: usize,
    cancelled: bool,
}

impl BatchResult {
    /// Start accumulating a new batch
    pub fn builder() -> BatchResultBuilder {
        BatchResultBuilder::default()
    }

    /// Validated records in processing order
    pub fn records(&self) -> &[ShipmentRecord] {
        &self.records
    }

    /// Failures in processing order
    pub fn failures(&self) -> &[ExtractionFailure] {
        &self.failures
    }

    /// Number of items processed
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of validated records
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Number of failures
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Whether the run stopped early on cancellation
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Aggregate counts
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }

    /// Find the failure entry for an email, if any
    pub fn failure_for(&self, id: &str) -> Option<&ExtractionFailure> {
        self.failures.iter().find(|failure| failure.id == id)
    }
}

/// Mutable accumulator for a batch in progress
#[derive(Debug, Default)]
pub struct BatchResultBuilder {
    records: Vec<ShipmentRecord>,
    failures: Vec<ExtractionFailure>,
    cancelled: bool,
}

impl BatchResultBuilder {
    /// Append a validated record
    pub fn push_record(&mut self, record: ShipmentRecord) {
        self.records.push(record);
    }

    /// Append a failure entry
    pub fn push_failure(&mut self, failure: ExtractionFailure) {
        self.failures.push(failure);
    }

    /// Append either outcome of a processed item
    pub fn push(&mut self, outcome: Result<ShipmentRecord, ExtractionFailure>) {
        match outcome {
            Ok(record) => self.push_record(record),
            Err(failure) => self.push_failure(failure),
        }
    }

    /// Mark the run as stopped before every item was processed
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Items accumulated so far
    pub fn processed(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    /// Freeze the accumulated outcomes
    pub fn build(self) -> BatchResult {
        let succeeded = self.records.len();
        let failed = self.failures.len();

        BatchResult {
            records: self.records,
            failures: self.failures,
            total: succeeded + failed,
            succeeded,
            failed,
            cancelled: self.cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureReason;

    #[test]
    fn empty_batch() {
        let result = BatchResult::builder().build();
        assert_eq!(result.total(), 0);
        assert_eq!(result.succeeded(), 0);
        assert_eq!(result.failed(), 0);
        assert!(!result.was_cancelled());
    }

    #[test]
    fn counts_follow_accumulated_outcomes() {
        let mut builder = BatchResult::builder();
        builder.push(Ok(ShipmentRecord::placeholder("EMAIL_001")));
        builder.push(Err(ExtractionFailure::new(
            "EMAIL_002",
            FailureReason::InvalidJson,
            "no JSON object found",
        )));
        builder.push_record(ShipmentRecord::placeholder("EMAIL_003"));
        assert_eq!(builder.processed(), 3);

        let result = builder.build();
        assert_eq!(result.total(), 3);
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.records()[1].id, "EMAIL_003");
        assert_eq!(
            result.failure_for("EMAIL_002").map(|f| f.reason),
            Some(FailureReason::InvalidJson)
        );
        assert!(result.failure_for("EMAIL_001").is_none());
    }

    #[test]
    fn summary_display() {
        let mut builder = BatchResult::builder();
        builder.push_failure(ExtractionFailure::api_error("EMAIL_001", "boom"));
        builder.mark_cancelled();
        let result = builder.build();

        assert!(result.was_cancelled());
        assert_eq!(result.summary().to_string(), "total=1 succeeded=0 failed=1");
    }
}
