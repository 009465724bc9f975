//! Validation error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
///
/// `path` is the location of the offending value inside the input
/// (`"lines[0].quantity"`); the empty string denotes the input root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Issue attached to the input root rather than a field.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }
}

impl core::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Input rejected by a schema.
///
/// Always carries at least one issue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation failed: {}", summary(.issues))]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        debug_assert!(!issues.is_empty(), "validation error without issues");
        Self { issues }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(path, message)])
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// Messages reported for one field path.
    pub fn messages_for(&self, path: &str) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.path == path)
            .map(|i| i.message.as_str())
            .collect()
    }
}

fn summary(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_issues() {
        let err = ValidationError::new(vec![
            ValidationIssue::new("page", "Expected number, received string"),
            ValidationIssue::root("Unexpected input"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: page: Expected number, received string; Unexpected input"
        );
    }

    #[test]
    fn messages_for_filters_by_path() {
        let err = ValidationError::new(vec![
            ValidationIssue::new("email", "Invalid email"),
            ValidationIssue::new("name", "Required"),
            ValidationIssue::new("email", "String must contain at most 5 character(s)"),
        ]);
        assert_eq!(err.messages_for("email").len(), 2);
        assert_eq!(err.messages_for("name"), vec!["Required"]);
        assert!(err.messages_for("page").is_empty());
    }
}
