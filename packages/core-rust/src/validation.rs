use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a reported validation failure is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

/// A single rule violation reported by a validator.
///
/// `identifier` names the offending field (e.g. `"Email"`), `message` is the
/// human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Field or property the failure refers to.
    pub identifier: String,
    /// Human-readable description of the violated rule.
    pub message: String,
    /// Optional machine-readable code for clients that branch on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub severity: Severity,
}

impl ValidationFailure {
    /// Creates an error-severity failure for `identifier`.
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
            error_code: None,
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.identifier, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_error_severity_without_code() {
        let failure = ValidationFailure::new("Email", "must not be empty");
        assert_eq!(failure.identifier, "Email");
        assert_eq!(failure.message, "must not be empty");
        assert_eq!(failure.severity, Severity::Error);
        assert!(failure.error_code.is_none());
    }

    #[test]
    fn display_joins_identifier_and_message() {
        let failure = ValidationFailure::new("Email", "must not be empty").with_code("NotEmpty");
        assert_eq!(failure.to_string(), "Email: must not be empty");
        assert_eq!(failure.error_code.as_deref(), Some("NotEmpty"));
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let failure: ValidationFailure =
            serde_json::from_str(r#"{"identifier":"Name","message":"too long"}"#).unwrap();
        assert_eq!(failure, ValidationFailure::new("Name", "too long"));
    }
}
