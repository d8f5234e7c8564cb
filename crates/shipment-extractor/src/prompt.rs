// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prompt construction for extraction calls

use shipment_types::EmailRecord;

use crate::{
    config::{DEFAULT_MAX_REFERENCE_PORTS, PromptRegistry, PromptVersion},
    error::{ExtractorError, ExtractorResult},
    reference::ReferenceIndex,
};

const SUBJECT: &str = "{subject}";
const BODY: &str = "{body}";
const PORT_REFERENCE: &str = "{port_reference}";

/// Rendered messages for one email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System message, empty when the template has none
    pub system: String,
    /// User message with the email and port listing filled in
    pub user: String,
}

/// Turns an email into the messages sent to the model
pub trait PromptBuilder: Send + Sync {
    /// Render the prompt for one email
    fn build(&self, email: &EmailRecord) -> ExtractorResult<Prompt>;

    /// Identifier of the template in use, for logs
    fn version(&self) -> &str;
}

/// Prompt builder backed by a versioned template from the prompt registry
#[derive(Debug, Clone)]
pub struct TemplatePromptBuilder {
    version: String,
    system_message: String,
    user_template: String,
    port_listing: String,
}

impl TemplatePromptBuilder {
    /// Create a builder from a registry entry and the port index
    ///
    /// The port listing is rendered once here and reused for every email.
    pub fn new(
        prompt: &PromptVersion,
        index: &ReferenceIndex,
        max_ports: usize,
    ) -> ExtractorResult<Self> {
        for placeholder in PromptRegistry::REQUIRED_PLACEHOLDERS {
            if !prompt.user_template.contains(placeholder) {
                return Err(ExtractorError::prompt_registry(format!(
                    "User template for version '{}' is missing {}",
                    prompt.version, placeholder
                )));
            }
        }

        Ok(Self {
            version: prompt.version.clone(),
            system_message: prompt.system_message.clone(),
            user_template: prompt.user_template.clone(),
            port_listing: index.prompt_listing(max_ports),
        })
    }

    /// Create a builder with the default port listing size
    pub fn with_default_listing(
        prompt: &PromptVersion,
        index: &ReferenceIndex,
    ) -> ExtractorResult<Self> {
        Self::new(prompt, index, DEFAULT_MAX_REFERENCE_PORTS)
    }

    /// Substitute placeholders in a single pass; substituted text is never rescanned
    fn render(&self, email: &EmailRecord) -> String {
        let mut rendered = String::with_capacity(
            self.user_template.len() + email.subject.len() + email.body.len() + self.port_listing.len(),
        );
        let mut rest = self.user_template.as_str();

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];

            let substitution = [
                (SUBJECT, email.subject.as_str()),
                (BODY, email.body.as_str()),
                (PORT_REFERENCE, self.port_listing.as_str()),
            ]
            .into_iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder));

            match substitution {
                Some((placeholder, value)) => {
                    rendered.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    rendered.push('{');
                    rest = &tail[1..];
                }
            }
        }

        rendered.push_str(rest);
        rendered
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(&self, email: &EmailRecord) -> ExtractorResult<Prompt> {
        if email.subject.trim().is_empty() && email.body.trim().is_empty() {
            return Err(ExtractorError::prompt(format!(
                "Email '{}' has neither subject nor body",
                email.id
            )));
        }

        Ok(Prompt {
            system: self.system_message.clone(),
            user: self.render(email),
        })
    }

    fn version(&self) -> &str {
        &self.version
    }
}
