// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the shipment extraction pipeline
//!
//! This crate provides the data model that flows through the pipeline: the
//! input email and port reference records, the validated shipment record that
//! forms the output wire contract, the classified extraction failure, and the
//! batch result that aggregates both.

pub mod batch;
pub mod email;
pub mod failure;
pub mod shipment;
pub mod trade;

pub use batch::{BatchResult, BatchResultBuilder, BatchSummary};
pub use email::{EmailRecord, PortReference};
pub use failure::{ExtractionFailure, FailureReason};
pub use shipment::ShipmentRecord;
pub use trade::{Incoterm, ProductLine, TradeTermParseError};
