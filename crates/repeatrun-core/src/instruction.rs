//! Run instructions: the per-item prompt template and the response contract.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Placeholder substituted with the item identifier when rendering.
pub const ITEM_PLACEHOLDER: &str = "{item}";

/// A per-item instruction template with a single `{item}` placeholder.
///
/// Supplied once per run, immutable for the run's duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInstruction {
    template: String,
}

impl RunInstruction {
    /// Create a new RunInstruction.
    ///
    /// Fails if the template does not contain the `{item}` placeholder.
    pub fn new(template: impl Into<String>) -> Result<Self, CoreError> {
        let template = template.into();
        if !template.contains(ITEM_PLACEHOLDER) {
            return Err(CoreError::InvalidTemplate(format!(
                "template must contain '{ITEM_PLACEHOLDER}'"
            )));
        }
        Ok(Self { template })
    }

    /// The raw template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the template for one item.
    pub fn render(&self, item: &str) -> String {
        self.template.replace(ITEM_PLACEHOLDER, item)
    }
}

/// Payload does not match the declared response format.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("missing fields {missing:?}, unexpected fields {unexpected:?}")]
pub struct SchemaMismatch {
    /// Declared fields absent from the payload.
    pub missing: Vec<String>,
    /// Payload keys not declared in the format.
    pub unexpected: Vec<String>,
}

/// The ordered set of named output fields a worker must return per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    fields: Vec<String>,
}

impl ResponseFormat {
    /// Create a new ResponseFormat.
    ///
    /// Fails when the field set is empty, contains blanks, or duplicates.
    pub fn new(fields: Vec<String>) -> Result<Self, CoreError> {
        if fields.is_empty() {
            return Err(CoreError::InvalidResponseFormat(
                "at least one field is required".to_string(),
            ));
        }
        for (idx, field) in fields.iter().enumerate() {
            if field.trim().is_empty() {
                return Err(CoreError::InvalidResponseFormat(format!(
                    "field {idx} is blank"
                )));
            }
            if fields[..idx].contains(field) {
                return Err(CoreError::InvalidResponseFormat(format!(
                    "duplicate field '{field}'"
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Declared field names, in order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Structurally validate a payload: it must carry exactly the declared
    /// fields, no more, no less.
    pub fn validate(&self, payload: &HashMap<String, String>) -> Result<(), SchemaMismatch> {
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| !payload.contains_key(*f))
            .cloned()
            .collect();
        let mut unexpected: Vec<String> = payload
            .keys()
            .filter(|k| !self.fields.contains(k))
            .cloned()
            .collect();
        unexpected.sort();

        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(SchemaMismatch { missing, unexpected })
        }
    }
}
