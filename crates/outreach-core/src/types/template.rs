//! Per-contact rendering of the campaign message.

use crate::types::Contact;

/// The fixed campaign message with `{name}`, `{category}` and `{locality}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    source: String,
}

impl MessageTemplate {
    /// Wraps a template string.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Returns the raw template.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders the template for one contact.
    ///
    /// Unknown placeholders are left untouched.
    pub fn render(&self, contact: &Contact, category: &str, locality: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + contact.name.len());
        let mut rest = self.source.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            match &after[..close] {
                "name" => out.push_str(contact.name.trim()),
                "category" => out.push_str(category),
                "locality" => out.push_str(locality),
                other => {
                    out.push('{');
                    out.push_str(other);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}
