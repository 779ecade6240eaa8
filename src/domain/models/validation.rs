//! Validation verdicts and issue classification.

use serde::{Deserialize, Serialize};

use super::specification::ValidationStatus;

const CLARIFICATION_KEYWORDS: &[&str] = &[
    "ambiguous",
    "vague",
    "unclear",
    "specify",
    "clarify",
    "more detail",
];
const URL_KEYWORDS: &[&str] = &["url", "link", "website", "site", "access"];
const MISSING_DATA_KEYWORDS: &[&str] = &["missing", "required", "must have", "mandatory", "lacking"];

/// Outcome of one validation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the spec passed.
    pub is_valid: bool,
    /// Classified outcome.
    pub status: ValidationStatus,
    /// Problems found, worded for the extractor.
    #[serde(default)]
    pub issues: Vec<String>,
    /// Questions to put to the user.
    #[serde(default)]
    pub clarification_questions: Vec<String>,
}

impl ValidationResult {
    /// A passing verdict with no issues.
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            status: ValidationStatus::Valid,
            issues: Vec::new(),
            clarification_questions: Vec::new(),
        }
    }

    /// Every target URL failed its health probe.
    pub fn unreachable(unhealthy: &[String]) -> Self {
        Self {
            is_valid: false,
            status: ValidationStatus::UrlIssue,
            issues: vec![format!(
                "None of the target URLs are accessible: {}",
                unhealthy.join(", ")
            )],
            clarification_questions: Vec::new(),
        }
    }

    /// The judge could not be consulted.
    pub fn judge_failure(message: impl std::fmt::Display) -> Self {
        Self {
            is_valid: false,
            status: ValidationStatus::Invalid,
            issues: vec![format!("Validation error: {message}")],
            clarification_questions: Vec::new(),
        }
    }

    /// Build an invalid result whose status is derived from the issue text.
    pub fn rejected(
        issues: Vec<String>,
        clarification_questions: Vec<String>,
        judge_wants_clarification: bool,
    ) -> Self {
        let status = classify_issues(&issues, judge_wants_clarification);
        Self {
            is_valid: false,
            status,
            issues,
            clarification_questions,
        }
    }
}

/// Map failed-validation issues to a status.
///
/// Precedence: clarification, then URL, then missing data, else `invalid`.
pub fn classify_issues(issues: &[String], judge_wants_clarification: bool) -> ValidationStatus {
    let lowered: Vec<String> = issues.iter().map(|i| i.to_lowercase()).collect();
    let mentions = |keywords: &[&str]| {
        lowered
            .iter()
            .any(|issue| keywords.iter().any(|kw| issue.contains(kw)))
    };

    if judge_wants_clarification || mentions(CLARIFICATION_KEYWORDS) {
        ValidationStatus::NeedsClarification
    } else if mentions(URL_KEYWORDS) {
        ValidationStatus::UrlIssue
    } else if mentions(MISSING_DATA_KEYWORDS) {
        ValidationStatus::MissingData
    } else {
        ValidationStatus::Invalid
    }
}
