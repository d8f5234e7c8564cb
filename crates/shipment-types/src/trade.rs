// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Trade terms and service types
//!
//! This module provides closed enumerations for the two categorical shipment
//! fields. Both parse leniently (surrounding whitespace, any case) and always
//! serialize in their canonical spelling.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a categorical field holds an unknown value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeTermParseError {
    /// Value is not a known incoterm
    #[error("unknown incoterm '{0}'")]
    UnknownIncoterm(String),

    /// Value is not a known product line
    #[error("unknown product line '{0}'")]
    UnknownProductLine(String),
}

/// International commercial terms (Incoterms 2020)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Incoterm {
    /// Ex Works
    Exw,
    /// Free Carrier
    Fca,
    /// Free Alongside Ship
    Fas,
    /// Free On Board
    Fob,
    /// Cost and Freight
    Cfr,
    /// Cost, Insurance and Freight
    Cif,
    /// Carriage Paid To
    Cpt,
    /// Carriage and Insurance Paid To
    Cip,
    /// Delivered At Place
    Dap,
    /// Delivered at Place Unloaded
    Dpu,
    /// Delivered Duty Paid
    Ddp,
}

impl Incoterm {
    /// Canonical uppercase code
    pub const fn code(self) -> &'static str {
        match self {
            Self::Exw => "EXW",
            Self::Fca => "FCA",
            Self::Fas => "FAS",
            Self::Fob => "FOB",
            Self::Cfr => "CFR",
            Self::Cif => "CIF",
            Self::Cpt => "CPT",
            Self::Cip => "CIP",
            Self::Dap => "DAP",
            Self::Dpu => "DPU",
            Self::Ddp => "DDP",
        }
    }

    /// Returns all known incoterms
    pub const fn all() -> &'static [Self] {
        &[
            Self::Exw,
            Self::Fca,
            Self::Fas,
            Self::Fob,
            Self::Cfr,
            Self::Cif,
            Self::Cpt,
            Self::Cip,
            Self::Dap,
            Self::Dpu,
            Self::Ddp,
        ]
    }
}

impl fmt::Display for Incoterm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Incoterm {
    type Err = TradeTermParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::all()
            .iter()
            .copied()
            .find(|term| term.code() == normalized)
            .ok_or_else(|| TradeTermParseError::UnknownIncoterm(s.to_string()))
    }
}

impl Serialize for Incoterm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Incoterm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Freight service type the shipment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductLine {
    /// Less-than-container-load sea import
    SeaImportLcl,
    /// Less-than-container-load sea export
    SeaExportLcl,
}

impl ProductLine {
    /// Wire identifier
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeaImportLcl => "pl_sea_import_lcl",
            Self::SeaExportLcl => "pl_sea_export_lcl",
        }
    }

    /// Returns all known product lines
    pub const fn all() -> &'static [Self] {
        &[Self::SeaImportLcl, Self::SeaExportLcl]
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductLine {
    type Err = TradeTermParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|line| line.as_str() == normalized)
            .ok_or_else(|| TradeTermParseError::UnknownProductLine(s.to_string()))
    }
}

impl Serialize for ProductLine {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProductLine {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
