//! Structured configuration issues.
//!
//! Config validation reports every problem it finds instead of stopping at
//! the first one, so a user can fix a whole file in one pass.

use std::fmt;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the orchestrator cannot start with this value.
    Error,
    /// Non-fatal: a fallback is used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field does not parse into one of its accepted values.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric field violates its constraint.
    InvalidConstraint { field: String },
    /// A field is empty where a value is required.
    EmptyValue { field: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_severity() {
        let issue = ConfigIssue::error(
            ConfigIssueCode::InvalidConstraint {
                field: "sweeper.interval_secs".to_string(),
            },
            "sweeper.interval_secs must be at least 1",
        );
        assert!(issue.is_error());
        assert_eq!(
            issue.to_string(),
            "error: sweeper.interval_secs must be at least 1"
        );
    }
}
