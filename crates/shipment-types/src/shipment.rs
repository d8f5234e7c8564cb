// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Validated shipment record
//!
//! Field names, their order and their JSON types form the wire contract of the
//! pipeline output file. Absent values serialize as `null`, never omitted.

use serde::{Deserialize, Serialize};

use crate::trade::{Incoterm, ProductLine};

/// Shipment details extracted from one email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    /// Identifier of the source email
    pub id: String,
    /// Service type
    pub product_line: Option<ProductLine>,
    /// Origin port code, resolved against the reference index
    pub origin_port_code: Option<String>,
    /// Canonical origin port name
    pub origin_port_name: Option<String>,
    /// Destination port code, resolved against the reference index
    pub destination_port_code: Option<String>,
    /// Canonical destination port name
    pub destination_port_name: Option<String>,
    /// Trade term
    pub incoterm: Option<Incoterm>,
    /// Cargo weight in kilograms
    pub cargo_weight_kg: Option<f64>,
    /// Cargo volume in cubic meters
    pub cargo_cbm: Option<f64>,
    /// Whether the cargo contains dangerous goods
    pub is_dangerous: bool,
}

impl ShipmentRecord {
    /// All-null record for an email whose extraction failed
    ///
    /// Used when a consumer expects exactly one output row per input email.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_line: None,
            origin_port_code: None,
            origin_port_name: None,
            destination_port_code: None,
            destination_port_name: None,
            incoterm: None,
            cargo_weight_kg: None,
            cargo_cbm: None,
            is_dangerous: false,
        }
    }
}
