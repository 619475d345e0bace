//! Consistency checks between the detected criterion count and the
//! weight/impact text. Everything here is pure and cheap enough to run on
//! every edit.

use crate::utils::validation::is_valid_email;
use std::fmt;

pub const IMPACT_BENEFIT: &str = "+";
pub const IMPACT_COST: &str = "-";

/// Non-empty comma-separated tokens of `raw`.
pub fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').filter(|token| !token.is_empty())
}

pub fn count_tokens(raw: &str) -> usize {
    tokens(raw).count()
}

/// Local checks beyond the token counts. Both are decided by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub check_impact_symbols: bool,
    pub check_email_format: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            check_impact_symbols: false,
            check_email_format: true,
        }
    }
}

/// Reasons a submission is refused before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    NoDataset,
    CountMismatch {
        expected: usize,
        weights: usize,
        impacts: usize,
    },
    InvalidImpact(String),
    MissingEmail,
    InvalidEmail(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoDataset => write!(f, "Select a CSV file before submitting"),
            ValidationIssue::CountMismatch { expected, .. } => {
                write!(f, "Exactly {} weights and impacts are required", expected)
            }
            ValidationIssue::InvalidImpact(token) => {
                write!(f, "Impacts must be '+' or '-' (found '{}')", token)
            }
            ValidationIssue::MissingEmail => {
                write!(f, "An email address is required to send the result")
            }
            ValidationIssue::InvalidEmail(_) => write!(f, "Invalid email address"),
        }
    }
}

/// Snapshot of how the current inputs line up with the detected criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consistency {
    pub expected: Option<usize>,
    pub weights: usize,
    pub impacts: usize,
}

impl Consistency {
    pub fn evaluate(expected: Option<usize>, weights_raw: &str, impacts_raw: &str) -> Self {
        Self {
            expected,
            weights: count_tokens(weights_raw),
            impacts: count_tokens(impacts_raw),
        }
    }

    pub fn is_consistent(&self) -> bool {
        matches!(self.expected, Some(n) if self.weights == n && self.impacts == n)
    }

    pub fn weights_label(&self) -> String {
        counter_label(self.weights, self.expected)
    }

    pub fn impacts_label(&self) -> String {
        counter_label(self.impacts, self.expected)
    }

    pub fn issue(&self) -> Option<ValidationIssue> {
        match self.expected {
            None => Some(ValidationIssue::NoDataset),
            Some(_) if self.is_consistent() => None,
            Some(expected) => Some(ValidationIssue::CountMismatch {
                expected,
                weights: self.weights,
                impacts: self.impacts,
            }),
        }
    }
}

/// `"X / N criteria"`, with `?` while no file has been read.
pub fn counter_label(count: usize, expected: Option<usize>) -> String {
    match expected {
        Some(n) => format!("{} / {} criteria", count, n),
        None => format!("{} / ? criteria", count),
    }
}

pub fn first_invalid_impact(impacts_raw: &str) -> Option<&str> {
    tokens(impacts_raw)
        .map(str::trim)
        .find(|token| *token != IMPACT_BENEFIT && *token != IMPACT_COST)
}

/// Email precondition for a notify request; `None` when the request may proceed.
pub fn email_issue(notify: bool, email: Option<&str>, rules: &ValidationRules) -> Option<ValidationIssue> {
    if !notify {
        return None;
    }
    match email.map(str::trim) {
        None | Some("") => Some(ValidationIssue::MissingEmail),
        Some(address) if rules.check_email_format && !is_valid_email(address) => {
            Some(ValidationIssue::InvalidEmail(address.to_string()))
        }
        Some(_) => None,
    }
}
