//! Validation report types.
//!
//! A report is an ordered list of named checks. Each check carries a tagged
//! outcome so that a skipped check has no pass/fail judgement at all.

use serde::{Deserialize, Serialize};

use crate::error::ValidationIssue;

/// Check names, in the order they appear in every report.
pub mod check {
    pub const SCHEMA: &str = "schema";
    pub const DUPLICATE_IDS: &str = "duplicate-ids";
    pub const TASK_REFERENCES: &str = "task-references";
    pub const DEPENDENCIES: &str = "dependencies";
    pub const TEMPLATE_EXPRESSIONS: &str = "template-expressions";
    pub const CIRCULAR_DEPENDENCIES: &str = "circular-dependencies";

    pub const ALL: [&str; 6] = [
        SCHEMA,
        DUPLICATE_IDS,
        TASK_REFERENCES,
        DEPENDENCIES,
        TEMPLATE_EXPRESSIONS,
        CIRCULAR_DEPENDENCIES,
    ];
}

/// Result of a single named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed { message: String },
    Failed { message: String, errors: Vec<String> },
    Skipped { reason: String },
}

/// A named check and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

impl ValidationCheck {
    pub fn passed(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome: CheckOutcome::Passed {
                message: message.into(),
            },
        }
    }

    pub fn failed(name: &str, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome: CheckOutcome::Failed {
                message: message.into(),
                errors,
            },
        }
    }

    pub fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome: CheckOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Skipped { .. })
    }

    /// Human-readable one-liner (message, failure message, or skip reason).
    pub fn summary(&self) -> &str {
        match &self.outcome {
            CheckOutcome::Passed { message } | CheckOutcome::Failed { message, .. } => message,
            CheckOutcome::Skipped { reason } => reason,
        }
    }
}

/// Aggregated validation result for one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `true` iff every non-skipped check passed.
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    /// Advisory findings; never affect `valid`.
    pub warnings: Vec<String>,
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    /// Assemble a report, deriving `valid` from the checks.
    pub fn from_checks(
        checks: Vec<ValidationCheck>,
        errors: Vec<ValidationIssue>,
        warnings: Vec<String>,
    ) -> Self {
        let valid = checks.iter().all(|c| !c.is_failed());
        Self {
            valid,
            errors,
            warnings,
            checks,
        }
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Error messages as display strings.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}
