//! Intent specification domain model.
//!
//! A [`Specification`] is the structured description of a scraping request:
//! which sites to visit, which fields to pull out, and under which
//! constraints. Specifications are immutable values from the workflow's point
//! of view: feedback produces a new revision through [`Specification::revise_with`]
//! and the previous value is left untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Capability tag every specification starts with.
pub const DEFAULT_REQUIREMENT: &str = "html_parsing";

const REVISION_MARKER: &str = "_rev";
const ID_PREFIX: &str = "intent_";

/// Reachability of a target URL as observed by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UrlHealth {
    /// Answered below 400.
    Healthy,
    /// Unparseable, unreachable, timed out or answered 400 or above.
    Unhealthy,
    /// Not checked yet.
    #[default]
    Unknown,
}

impl UrlHealth {
    /// Snake-case name, as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UrlHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Not validated yet.
    #[default]
    Pending,
    /// Passed validation.
    Valid,
    /// The request is too vague to act on.
    NeedsClarification,
    /// Target URLs are missing or unreachable.
    UrlIssue,
    /// Required fields are missing.
    MissingData,
    /// Failed for any other reason.
    Invalid,
    /// Valid and waiting for sign-off.
    NeedsHumanApproval,
    /// Iteration budget spent or URLs unreachable; a person must look.
    NeedsHumanReview,
    /// Signed off by a reviewer.
    UserApproved,
    /// Produced by a fallback after a collaborator failure.
    Error,
}

impl ValidationStatus {
    /// Snake-case name, as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::NeedsClarification => "needs_clarification",
            Self::UrlIssue => "url_issue",
            Self::MissingData => "missing_data",
            Self::Invalid => "invalid",
            Self::NeedsHumanApproval => "needs_human_approval",
            Self::NeedsHumanReview => "needs_human_review",
            Self::UserApproved => "user_approved",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single datum the downstream scraper should extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldToExtract {
    /// Identifier the scraper will emit the value under.
    pub name: String,
    /// What the value is, in plain words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldToExtract {
    /// Field with no description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Builder-style description setter.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One structural edit produced by the revision collaborator.
///
/// Serialized with an internal `type` tag, e.g.
/// `{"type": "add_field", "field_name": "rating"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiffOp {
    /// Append a URL unless already present.
    AddUrl {
        url: String,
    },
    /// Drop a URL.
    RemoveUrl {
        url: String,
    },
    /// Replace the whole URL list.
    ReplaceUrls {
        urls: Vec<String>,
    },
    /// Add a field, or fill in the description of an existing one.
    AddField {
        #[serde(alias = "name")]
        field_name: String,
        #[serde(default)]
        description: Option<String>,
    },
    /// Drop a field by name.
    RemoveField {
        #[serde(alias = "name")]
        field_name: String,
    },
    /// Rename a field or change its description.
    UpdateField {
        #[serde(alias = "name")]
        field_name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        new_name: Option<String>,
    },
    /// Set a constraint, replacing any previous value.
    AddConstraint {
        key: String,
        value: Value,
    },
    /// Drop a constraint.
    RemoveConstraint {
        key: String,
    },
    /// Add a technical requirement.
    AddRequirement {
        requirement: String,
    },
}

impl DiffOp {
    /// Parse raw ops one by one, skipping anything unrecognised or malformed.
    pub fn parse_lenient(raw: &[Value]) -> Vec<Self> {
        raw.iter()
            .filter_map(|value| match serde_json::from_value::<Self>(value.clone()) {
                Ok(op) => Some(op),
                Err(err) => {
                    let op_type = value.get("type").and_then(Value::as_str).unwrap_or("<none>");
                    warn!(op_type, error = %err, "skipping unrecognised diff op");
                    None
                }
            })
            .collect()
    }
}

/// Structured description of what to scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    spec_id: String,
    original_query: String,
    target_urls: Vec<String>,
    fields_to_extract: Vec<FieldToExtract>,
    /// Scraper capabilities, e.g. `javascript_rendering`.
    pub technical_requirements: BTreeSet<String>,
    /// Free-form limits such as `max_pages`.
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
    /// Last known health per target URL.
    #[serde(default)]
    pub url_health_status: BTreeMap<String, UrlHealth>,
    /// Where the spec stands in validation and review.
    pub validation_status: ValidationStatus,
    #[serde(default)]
    critique_history: Vec<String>,
    /// Open questions for the user.
    #[serde(default)]
    pub clarification_questions: Vec<String>,
    /// Set when a person must look before approval.
    #[serde(default)]
    pub needs_human_review: bool,
    /// Notes left by the approving reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_approval_notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Specification {
    /// Build a fresh specification with a new base id and `pending` status.
    ///
    /// Duplicate URLs and duplicate field names are dropped, first one wins.
    pub fn create_new<U, F>(
        original_query: impl Into<String>,
        urls: U,
        fields: F,
        constraints: BTreeMap<String, Value>,
    ) -> Self
    where
        U: IntoIterator<Item = String>,
        F: IntoIterator<Item = FieldToExtract>,
    {
        let now = Utc::now();
        let mut spec = Self {
            spec_id: new_base_id(),
            original_query: original_query.into(),
            target_urls: Vec::new(),
            fields_to_extract: Vec::new(),
            technical_requirements: BTreeSet::from([DEFAULT_REQUIREMENT.to_string()]),
            constraints,
            url_health_status: BTreeMap::new(),
            validation_status: ValidationStatus::Pending,
            critique_history: Vec::new(),
            clarification_questions: Vec::new(),
            needs_human_review: false,
            human_approval_notes: None,
            created_at: now,
            updated_at: now,
        };
        for url in urls {
            spec.insert_url(url);
        }
        for field in fields {
            spec.insert_field(field);
        }
        spec
    }

    /// Degraded specification used when extraction could not produce anything.
    ///
    /// Any http(s) URL written verbatim in the query is kept so the reviewer
    /// has something to act on.
    pub fn fallback(original_query: impl Into<String>, reason: impl Into<String>) -> Self {
        let original_query = original_query.into();
        let urls = urls_in_text(&original_query);
        let mut spec = Self::create_new(original_query, urls, Vec::new(), BTreeMap::new());
        spec.validation_status = ValidationStatus::Error;
        spec.push_critique(reason);
        spec
    }

    /// Placeholder for a blank request; always routed to a human.
    pub fn empty_input_fallback(original_query: impl Into<String>) -> Self {
        let mut spec = Self::create_new(original_query, Vec::new(), Vec::new(), BTreeMap::new());
        spec.validation_status = ValidationStatus::Error;
        spec.needs_human_review = true;
        spec.push_critique("Empty request: nothing to extract");
        spec
    }

    /// Builder-style replacement of the technical requirement set.
    ///
    /// An empty set falls back to the default requirement.
    #[must_use]
    pub fn with_requirements<I>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let requirements: BTreeSet<String> = requirements
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if !requirements.is_empty() {
            self.technical_requirements = requirements;
        }
        self
    }

    /// Id including any `_revN` suffix.
    pub fn spec_id(&self) -> &str {
        &self.spec_id
    }

    /// Request the spec was first extracted from.
    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    /// URLs to scrape, deduplicated in insertion order.
    pub fn target_urls(&self) -> &[String] {
        &self.target_urls
    }

    /// Fields to extract, unique by name.
    pub fn fields_to_extract(&self) -> &[FieldToExtract] {
        &self.fields_to_extract
    }

    /// Just the field names, in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields_to_extract.iter().map(|f| f.name.as_str()).collect()
    }

    /// Critiques recorded against this spec, oldest first.
    pub fn critique_history(&self) -> &[String] {
        &self.critique_history
    }

    /// Base id without any revision suffix.
    pub fn base_id(&self) -> &str {
        split_revision(&self.spec_id).0
    }

    /// Revision number; `0` for a specification fresh out of extraction.
    pub fn revision(&self) -> u32 {
        split_revision(&self.spec_id).1
    }

    /// Apply a batch of diff ops and return the next revision.
    ///
    /// `self` is not modified. The result always carries a new `_revN` id,
    /// no clarification questions and `pending` status, even when every op
    /// turned out to be a no-op.
    #[must_use]
    pub fn revise_with(&self, ops: &[DiffOp]) -> Self {
        let mut next = self.clone();
        next.spec_id = format!("{}{REVISION_MARKER}{}", self.base_id(), self.revision() + 1);
        for op in ops {
            next.apply(op);
        }
        next.clarification_questions.clear();
        next.validation_status = ValidationStatus::Pending;
        next.needs_human_review = false;
        next.human_approval_notes = None;
        next.updated_at = Utc::now();
        next
    }

    /// Append a critique entry unless it repeats the previous one.
    pub fn push_critique(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return;
        }
        let repeats_last = self
            .critique_history
            .last()
            .is_some_and(|last| last.trim().eq_ignore_ascii_case(trimmed));
        if !repeats_last {
            self.critique_history.push(trimmed.to_string());
            self.updated_at = Utc::now();
        }
    }

    /// URLs the last probe reported as unhealthy, in target order.
    pub fn unhealthy_urls(&self) -> Vec<String> {
        self.target_urls
            .iter()
            .filter(|url| self.url_health_status.get(*url) == Some(&UrlHealth::Unhealthy))
            .cloned()
            .collect()
    }

    /// Set the status and bump `updated_at`.
    pub fn set_status(&mut self, status: ValidationStatus) {
        self.validation_status = status;
        self.updated_at = Utc::now();
    }

    /// Serialized form handed to the downstream execution pipeline.
    pub fn to_handoff_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn insert_url(&mut self, url: String) -> bool {
        let url = url.trim().to_string();
        if url.is_empty() || self.target_urls.contains(&url) {
            return false;
        }
        self.target_urls.push(url);
        true
    }

    fn insert_field(&mut self, field: FieldToExtract) -> bool {
        let name = field.name.trim();
        if name.is_empty() || self.has_field(name) {
            return false;
        }
        self.fields_to_extract.push(FieldToExtract {
            name: name.to_string(),
            description: field.description.filter(|d| !d.trim().is_empty()),
        });
        true
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields_to_extract.iter().any(|f| f.name == name)
    }

    fn apply(&mut self, op: &DiffOp) {
        match op {
            DiffOp::AddUrl { url } => {
                self.insert_url(url.clone());
            }
            DiffOp::RemoveUrl { url } => {
                self.target_urls.retain(|u| u != url);
                self.url_health_status.remove(url);
            }
            DiffOp::ReplaceUrls { urls } => {
                self.target_urls.clear();
                for url in urls {
                    self.insert_url(url.clone());
                }
                let kept = &self.target_urls;
                self.url_health_status.retain(|url, _| kept.contains(url));
            }
            DiffOp::AddField {
                field_name,
                description,
            } => {
                self.insert_field(FieldToExtract {
                    name: field_name.clone(),
                    description: description.clone(),
                });
            }
            DiffOp::RemoveField { field_name } => {
                self.fields_to_extract.retain(|f| &f.name != field_name);
            }
            DiffOp::UpdateField {
                field_name,
                description,
                new_name,
            } => self.update_field(field_name, description.as_deref(), new_name.as_deref()),
            DiffOp::AddConstraint { key, value } => {
                if !key.trim().is_empty() {
                    self.constraints.insert(key.clone(), value.clone());
                }
            }
            DiffOp::RemoveConstraint { key } => {
                self.constraints.remove(key);
            }
            DiffOp::AddRequirement { requirement } => {
                let requirement = requirement.trim();
                if !requirement.is_empty() {
                    self.technical_requirements.insert(requirement.to_string());
                }
            }
        }
    }

    fn update_field(&mut self, field_name: &str, description: Option<&str>, new_name: Option<&str>) {
        let new_name = new_name.map(str::trim).filter(|n| !n.is_empty() && *n != field_name);
        if let Some(target) = new_name {
            if self.has_field(target) {
                warn!(field_name, new_name = target, "rename collides with an existing field, skipping");
                return;
            }
        }
        let Some(field) = self.fields_to_extract.iter_mut().find(|f| f.name == field_name) else {
            warn!(field_name, "update_field targets an unknown field, skipping");
            return;
        };
        if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
            field.description = Some(description.to_string());
        }
        if let Some(target) = new_name {
            field.name = target.to_string();
        }
    }
}

fn new_base_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{ID_PREFIX}{}", &uuid[..8])
}

fn split_revision(spec_id: &str) -> (&str, u32) {
    spec_id
        .rsplit_once(REVISION_MARKER)
        .and_then(|(base, rev)| rev.parse::<u32>().ok().map(|n| (base, n)))
        .unwrap_or((spec_id, 0))
}

/// Pull `http://` and `https://` tokens out of free text.
pub fn urls_in_text(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .trim_start_matches(['(', '<', '"', '\''])
                .trim_end_matches(['.', ',', ';', ':', ')', '>', '"', '\'', '!', '?'])
        })
        .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn price_spec() -> Specification {
        Specification::create_new(
            "Get price from https://example.com",
            vec!["https://example.com".to_string()],
            vec![FieldToExtract::new("price")],
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_create_new_defaults() {
        let spec = price_spec();
        assert!(spec.spec_id().starts_with("intent_"));
        assert_eq!(spec.revision(), 0);
        assert_eq!(spec.validation_status, ValidationStatus::Pending);
        assert!(spec.technical_requirements.contains(DEFAULT_REQUIREMENT));
        assert!(spec.critique_history().is_empty());
    }

    #[test]
    fn test_create_new_drops_duplicates() {
        let spec = Specification::create_new(
            "q",
            vec!["https://a.com".to_string(), "https://a.com".to_string()],
            vec![FieldToExtract::new("price"), FieldToExtract::new("price")],
            BTreeMap::new(),
        );
        assert_eq!(spec.target_urls().len(), 1);
        assert_eq!(spec.fields_to_extract().len(), 1);
    }

    #[test]
    fn test_revision_numbering() {
        let base = price_spec();
        let rev1 = base.revise_with(&[]);
        let rev2 = rev1.revise_with(&[]);
        assert_eq!(rev1.spec_id(), format!("{}_rev1", base.spec_id()));
        assert_eq!(rev2.spec_id(), format!("{}_rev2", base.spec_id()));
        assert_eq!(rev2.base_id(), base.spec_id());
        assert_eq!(base.revision(), 0);
    }

    #[test]
    fn test_revise_does_not_mutate_original() {
        let base = price_spec();
        let snapshot = base.clone();
        let _ = base.revise_with(&[DiffOp::AddField {
            field_name: "rating".to_string(),
            description: None,
        }]);
        assert_eq!(base, snapshot);
    }

    #[test]
    fn test_revise_resets_status_and_questions() {
        let mut base = price_spec();
        base.validation_status = ValidationStatus::NeedsClarification;
        base.clarification_questions = vec!["Which currency?".to_string()];
        let next = base.revise_with(&[DiffOp::AddField {
            field_name: "rating".to_string(),
            description: None,
        }]);
        assert_eq!(next.field_names(), vec!["price", "rating"]);
        assert!(next.clarification_questions.is_empty());
        assert_eq!(next.validation_status, ValidationStatus::Pending);
        assert_eq!(next.original_query(), base.original_query());
    }

    #[test]
    fn test_url_ops() {
        let base = price_spec();
        let next = base.revise_with(&[
            DiffOp::AddUrl {
                url: "https://example.com".to_string(),
            },
            DiffOp::AddUrl {
                url: "https://other.com".to_string(),
            },
            DiffOp::RemoveUrl {
                url: "https://example.com".to_string(),
            },
        ]);
        assert_eq!(next.target_urls(), ["https://other.com".to_string()]);

        let replaced = next.revise_with(&[DiffOp::ReplaceUrls {
            urls: vec!["https://x.com".to_string(), "https://x.com".to_string()],
        }]);
        assert_eq!(replaced.target_urls(), ["https://x.com".to_string()]);
    }

    #[test]
    fn test_update_field_rename_collision_is_skipped() {
        let spec = Specification::create_new(
            "q",
            Vec::new(),
            vec![FieldToExtract::new("price"), FieldToExtract::new("title")],
            BTreeMap::new(),
        );
        let next = spec.revise_with(&[DiffOp::UpdateField {
            field_name: "price".to_string(),
            description: Some("ignored".to_string()),
            new_name: Some("title".to_string()),
        }]);
        assert_eq!(next.field_names(), vec!["price", "title"]);
        assert_eq!(next.fields_to_extract()[0].description, None);
    }

    #[test]
    fn test_update_field_rename_and_describe() {
        let spec = price_spec();
        let next = spec.revise_with(&[DiffOp::UpdateField {
            field_name: "price".to_string(),
            description: Some("Price in USD".to_string()),
            new_name: Some("cost".to_string()),
        }]);
        assert_eq!(next.fields_to_extract()[0].name, "cost");
        assert_eq!(
            next.fields_to_extract()[0].description.as_deref(),
            Some("Price in USD")
        );
    }

    #[test]
    fn test_constraint_ops() {
        let spec = price_spec();
        let next = spec.revise_with(&[
            DiffOp::AddConstraint {
                key: "max_pages".to_string(),
                value: json!(5),
            },
            DiffOp::AddConstraint {
                key: "max_pages".to_string(),
                value: json!(10),
            },
            DiffOp::AddConstraint {
                key: "region".to_string(),
                value: json!("eu"),
            },
            DiffOp::RemoveConstraint {
                key: "region".to_string(),
            },
        ]);
        assert_eq!(next.constraints.get("max_pages"), Some(&json!(10)));
        assert!(!next.constraints.contains_key("region"));
    }

    #[test]
    fn test_parse_lenient_skips_unknown_ops() {
        let raw = vec![
            json!({"type": "add_field", "field_name": "rating"}),
            json!({"type": "teleport", "where": "moon"}),
            json!({"type": "add_url"}),
            json!({"type": "add_constraint", "key": "lang", "value": "en"}),
        ];
        let ops = DiffOp::parse_lenient(&raw);
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], DiffOp::AddField { .. }));
        assert!(matches!(ops[1], DiffOp::AddConstraint { .. }));
    }

    #[test]
    fn test_push_critique_skips_immediate_repeat() {
        let mut spec = price_spec();
        spec.push_critique("URL is down");
        spec.push_critique("url is down ");
        spec.push_critique("missing price");
        spec.push_critique("URL is down");
        assert_eq!(spec.critique_history().len(), 3);
    }

    #[test]
    fn test_fallback_keeps_query_urls() {
        let spec = Specification::fallback(
            "Scrape (https://shop.example.com/items), please.",
            "Extraction failed: timeout",
        );
        assert_eq!(spec.validation_status, ValidationStatus::Error);
        assert_eq!(spec.target_urls(), ["https://shop.example.com/items".to_string()]);
        assert_eq!(spec.critique_history(), ["Extraction failed: timeout".to_string()]);
    }

    #[test]
    fn test_empty_input_fallback() {
        let spec = Specification::empty_input_fallback("   ");
        assert_eq!(spec.validation_status, ValidationStatus::Error);
        assert!(spec.needs_human_review);
        assert!(spec.target_urls().is_empty());
    }

    #[test]
    fn test_split_revision_ignores_non_numeric_suffix() {
        assert_eq!(split_revision("intent_ab_review"), ("intent_ab_review", 0));
        assert_eq!(split_revision("intent_ab_rev12"), ("intent_ab", 12));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let value = serde_json::to_value(ValidationStatus::NeedsHumanApproval).unwrap();
        assert_eq!(value, json!("needs_human_approval"));
    }
}
