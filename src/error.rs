//! Error types and the diagnostic reporter used by the HAL containers

use std::cell::RefCell;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while coercing or parsing HAL sections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HalError {
    /// A relation value could not be coerced into a typed member
    #[error("Invalid member identified by 'rel'='{relation}' (found {found})")]
    InvalidMember { relation: String, found: String },

    /// An element of an array payload could not be coerced
    #[error("Invalid element {index} of 'rel'='{relation}' (found {found})")]
    InvalidElement {
        relation: String,
        index: usize,
        found: String,
    },

    /// A resource document has the wrong shape
    #[error("Invalid HAL document: {0}")]
    InvalidDocument(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for HalError {
    fn from(e: serde_json::Error) -> Self {
        HalError::JsonParse(e.to_string())
    }
}

impl From<serde_yaml::Error> for HalError {
    fn from(e: serde_yaml::Error) -> Self {
        HalError::Config(e.to_string())
    }
}

/// Name of the JSON type of a value, used in error messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Sink for diagnostics that must not interrupt the caller
///
/// Implementations record the problem and return; they never fail.
pub trait ErrorReporter {
    fn capture(&self, message: &str, origin: &str, context: &Value);
}

/// Reporter that emits each diagnostic as a `tracing` warning
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn capture(&self, message: &str, origin: &str, context: &Value) {
        tracing::warn!(origin, context = %context, "{}", message);
    }
}

/// A diagnostic retained by [`CollectingReporter`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub origin: String,
    pub context: Value,
}

/// Reporter that keeps every diagnostic for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the diagnostics captured so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    /// Drop all captured diagnostics
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl ErrorReporter for CollectingReporter {
    fn capture(&self, message: &str, origin: &str, context: &Value) {
        tracing::debug!(origin, "captured diagnostic: {}", message);
        self.diagnostics.borrow_mut().push(Diagnostic {
            message: message.to_string(),
            origin: origin.to_string(),
            context: context.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collecting_reporter_keeps_order() {
        let reporter = CollectingReporter::new();
        assert!(reporter.is_empty());

        reporter.capture("first", "test", &json!({"n": 1}));
        reporter.capture("second", "test", &json!(null));

        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].message, "first");
        assert_eq!(diagnostics[0].context, json!({"n": 1}));
        assert_eq!(diagnostics[1].message, "second");

        reporter.clear();
        assert_eq!(reporter.len(), 0);
    }

    #[test]
    fn test_error_messages_name_relation() {
        let err = HalError::InvalidMember {
            relation: "bad".to_string(),
            found: "number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid member identified by 'rel'='bad' (found number)"
        );

        let err = HalError::InvalidElement {
            relation: "items".to_string(),
            index: 2,
            found: "string".to_string(),
        };
        assert!(err.to_string().contains("'rel'='items'"));
    }

    #[test]
    fn test_json_parse_conversion() {
        let parse_err = serde_json::from_str::<Value>("{not json").unwrap_err();
        let err: HalError = parse_err.into();
        assert!(matches!(err, HalError::JsonParse(_)));
    }
}
