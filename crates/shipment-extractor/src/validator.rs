// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Validation of raw model output into shipment records
//!
//! The validator locates the JSON object in the completion text, checks every
//! required field, normalizes values and resolves port codes against the
//! reference index. The indexed port name always replaces the model's name.

use std::{
    str::FromStr,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use serde_json::{Map, Value};
use shipment_types::{ExtractionFailure, FailureReason, Incoterm, ProductLine, ShipmentRecord};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    chat::truncate,
    reference::{ReferenceIndex, normalize_code},
};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced JSON regex is valid")
});

/// Keys every model response must carry; all but `is_dangerous` may be null
pub const REQUIRED_FIELDS: [&str; 9] = [
    "product_line",
    "origin_port_code",
    "origin_port_name",
    "destination_port_code",
    "destination_port_name",
    "incoterm",
    "cargo_weight_kg",
    "cargo_cbm",
    "is_dangerous",
];

/// Why a model response was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No `{...}` span in the text
    #[error("no JSON object found in model output")]
    NoJsonObject,

    /// The located span did not parse
    #[error("malformed JSON: {message}")]
    MalformedJson { message: String },

    /// A field was missing, mistyped or out of range
    #[error("{field}: {message}")]
    Schema { field: String, message: String },

    /// A port code that the reference index does not know
    #[error("{field}: port code '{code}' not found in reference index")]
    UnresolvedPort { field: String, code: String },
}

impl ValidationError {
    fn schema(field: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Failure category recorded for the email
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::NoJsonObject | Self::MalformedJson { .. } => FailureReason::InvalidJson,
            Self::Schema { .. } => FailureReason::SchemaViolation,
            Self::UnresolvedPort { .. } => FailureReason::UnresolvedPort,
        }
    }

    /// Convert into the per-email failure entry
    pub fn into_failure(self, email_id: &str) -> ExtractionFailure {
        ExtractionFailure::new(email_id, self.reason(), self.to_string())
    }
}

/// Find the JSON object in completion text
///
/// A fenced ```` ```json ```` block wins; otherwise the span from the first `{`
/// to the last `}` is used.
pub fn locate_json(raw: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(raw)
        && let Some(body) = captures.get(1)
    {
        return Some(body.as_str());
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ValidationError> {
    object
        .get(field)
        .ok_or_else(|| ValidationError::schema(field, "missing required field"))
}

/// String or null; blank strings count as null
fn optional_string(
    object: &Map<String, Value>,
    field: &str,
) -> Result<Option<String>, ValidationError> {
    match required(object, field)? {
        Value::Null => Ok(None),
        Value::String(text) => {
            let text = text.trim();
            Ok((!text.is_empty()).then(|| text.to_string()))
        }
        other => Err(ValidationError::schema(
            field,
            format!("expected string or null, found {}", json_type(other)),
        )),
    }
}

/// Non-negative finite number or null, rounded to 2 decimals
fn optional_quantity(object: &Map<String, Value>, field: &str) -> Result<Option<f64>, ValidationError> {
    match required(object, field)? {
        Value::Null => Ok(None),
        Value::Number(number) => {
            let value = number
                .as_f64()
                .filter(|value| value.is_finite())
                .ok_or_else(|| ValidationError::schema(field, "number is not finite"))?;
            if value < 0.0 {
                return Err(ValidationError::schema(
                    field,
                    format!("must be non-negative, got {value}"),
                ));
            }
            let rounded = (value * 100.0).round() / 100.0;
            if !rounded.is_finite() {
                return Err(ValidationError::schema(field, "number is out of range"));
            }
            Ok(Some(rounded))
        }
        other => Err(ValidationError::schema(
            field,
            format!("expected number or null, found {}", json_type(other)),
        )),
    }
}

/// Echoed values in failure details are cut to this many characters
const MAX_ECHOED_CHARS: usize = 40;

fn optional_enum<T: FromStr>(
    object: &Map<String, Value>,
    field: &str,
) -> Result<Option<T>, ValidationError> {
    let Some(value) = optional_string(object, field)? else {
        return Ok(None);
    };

    value.parse::<T>().map(Some).map_err(|_| {
        ValidationError::schema(
            field,
            format!("unrecognized value '{}'", truncate(&value, MAX_ECHOED_CHARS)),
        )
    })
}

/// Validates model output against the schema and the port reference
#[derive(Debug, Clone)]
pub struct RecordValidator {
    index: Arc<ReferenceIndex>,
}

impl RecordValidator {
    /// Create a validator over a shared reference index
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self { index }
    }

    /// Reference index used for port resolution
    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Validate raw completion text for one email
    ///
    /// The returned record always carries `source_id`, whatever `id` the model
    /// reported.
    pub fn validate(&self, raw: &str, source_id: &str) -> Result<ShipmentRecord, ExtractionFailure> {
        self.check(raw, source_id).map_err(|error| {
            debug!(
                email_id = %source_id,
                response_length = raw.len(),
                preview = %truncate(raw, 80),
                "Rejected model output"
            );
            error.into_failure(source_id)
        })
    }

    /// Validation with the typed error
    pub fn check(&self, raw: &str, source_id: &str) -> Result<ShipmentRecord, ValidationError> {
        let json = locate_json(raw).ok_or(ValidationError::NoJsonObject)?;
        let value: Value = serde_json::from_str(json).map_err(|e| ValidationError::MalformedJson {
            message: e.to_string(),
        })?;
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ValidationError::schema(
                    "$",
                    format!("expected object, found {}", json_type(&other)),
                ));
            }
        };

        if let Some(reported) = object.get("id").and_then(Value::as_str)
            && reported != source_id
        {
            warn!(email_id = %source_id, reported_id = %reported, "Model reported a different id");
        }

        let product_line = optional_enum::<ProductLine>(&object, "product_line")?;
        let (origin_port_code, origin_port_name) =
            self.resolve_port(&object, "origin_port_code", "origin_port_name")?;
        let (destination_port_code, destination_port_name) =
            self.resolve_port(&object, "destination_port_code", "destination_port_name")?;
        let incoterm = optional_enum::<Incoterm>(&object, "incoterm")?;
        let cargo_weight_kg = optional_quantity(&object, "cargo_weight_kg")?;
        let cargo_cbm = optional_quantity(&object, "cargo_cbm")?;
        let is_dangerous = match required(&object, "is_dangerous")? {
            Value::Bool(flag) => *flag,
            other => {
                return Err(ValidationError::schema(
                    "is_dangerous",
                    format!("expected boolean, found {}", json_type(other)),
                ));
            }
        };

        Ok(ShipmentRecord {
            id: source_id.to_string(),
            product_line,
            origin_port_code,
            origin_port_name,
            destination_port_code,
            destination_port_name,
            incoterm,
            cargo_weight_kg,
            cargo_cbm,
            is_dangerous,
        })
    }

    /// Resolve a code/name pair; a null code forces a null name
    fn resolve_port(
        &self,
        object: &Map<String, Value>,
        code_field: &str,
        name_field: &str,
    ) -> Result<(Option<String>, Option<String>), ValidationError> {
        let code = optional_string(object, code_field)?;
        let reported_name = optional_string(object, name_field)?;

        let Some(code) = code else {
            return Ok((None, None));
        };

        let code = normalize_code(&code);
        match self.index.lookup(&code) {
            Some(canonical) => {
                if reported_name.as_deref().is_some_and(|name| name != canonical) {
                    debug!(
                        field = %name_field,
                        reported = ?reported_name,
                        canonical = %canonical,
                        "Replacing model port name with indexed name"
                    );
                }
                let canonical = canonical.to_string();
                Ok((Some(code), Some(canonical)))
            }
            None => Err(ValidationError::UnresolvedPort {
                field: code_field.to_string(),
                code,
            }),
        }
    }
}
