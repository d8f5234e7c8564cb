// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Pipeline input records

use serde::{Deserialize, Serialize};

/// A freight-forwarding email to extract shipment details from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Unique identifier, echoed into the extracted record
    pub id: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Sender address
    #[serde(default)]
    pub sender_email: Option<String>,
    /// Comma-separated recipients
    #[serde(default)]
    pub to_emails: Option<String>,
    /// Comma-separated CC recipients
    #[serde(default)]
    pub cc_emails: Option<String>,
}

impl EmailRecord {
    /// Create an email with only the fields the extractor reads
    pub fn new(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            sender_email: None,
            to_emails: None,
            cc_emails: None,
        }
    }
}

/// One entry of the port reference dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortReference {
    /// UN/LOCODE-style port code, e.g. `CNSHA`
    pub code: String,
    /// Port name
    pub name: String,
}

impl PortReference {
    /// Create a new port reference entry
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_deserializes_with_missing_or_null_addresses() {
        let email: EmailRecord = serde_json::from_str(
            r#"{"id":"EMAIL_001","subject":"RFQ","body":"Shanghai to LA","sender_email":null}"#,
        )
        .unwrap();

        assert_eq!(email.id, "EMAIL_001");
        assert_eq!(email.sender_email, None);
        assert_eq!(email.to_emails, None);
        assert_eq!(email.cc_emails, None);
    }

    #[test]
    fn email_requires_body() {
        let result = serde_json::from_str::<EmailRecord>(r#"{"id":"EMAIL_001","subject":"RFQ"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn port_reference_deserialization() {
        let ports: Vec<PortReference> =
            serde_json::from_str(r#"[{"code":"CNSHA","name":"Shanghai"}]"#).unwrap();
        assert_eq!(ports, vec![PortReference::new("CNSHA", "Shanghai")]);
    }
}
