//! Report and record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Content type every report record is stored under.
pub const POST_TYPE: &str = "csp-report";

/// Report fields that may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportField {
    BlockedUri,
    DocumentUri,
    OriginalPolicy,
    Referrer,
    StatusCode,
    ViolatedDirective,
}

impl ReportField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportField::BlockedUri => "blocked-uri",
            ReportField::DocumentUri => "document-uri",
            ReportField::OriginalPolicy => "original-policy",
            ReportField::Referrer => "referrer",
            ReportField::StatusCode => "status-code",
            ReportField::ViolatedDirective => "violated-directive",
        }
    }

    /// Look up a field by its wire key. Matching is exact.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "blocked-uri" => Some(ReportField::BlockedUri),
            "document-uri" => Some(ReportField::DocumentUri),
            "original-policy" => Some(ReportField::OriginalPolicy),
            "referrer" => Some(ReportField::Referrer),
            "status-code" => Some(ReportField::StatusCode),
            "violated-directive" => Some(ReportField::ViolatedDirective),
            _ => None,
        }
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sanitized field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(u64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        FieldValue::Integer(n)
    }
}

/// Output of the sanitize pipeline for one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedReport {
    pub title: String,
    pub fields: BTreeMap<ReportField, FieldValue>,
}

impl SanitizedReport {
    pub fn get(&self, field: ReportField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Fields stored as metadata. The blocked URI is carried by the title.
    pub fn meta(&self) -> impl Iterator<Item = (ReportField, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(field, _)| **field != ReportField::BlockedUri)
            .map(|(field, value)| (*field, value))
    }
}

/// Identifier assigned by the store. Valid ids are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Draft,
}

/// Insert payload for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub post_type: String,
    pub status: PostStatus,
    pub title: String,
}

impl NewReport {
    pub fn published(title: impl Into<String>) -> Self {
        Self {
            post_type: POST_TYPE.to_string(),
            status: PostStatus::Publish,
            title: title.into(),
        }
    }
}

/// A stored report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: RecordId,
    pub post_type: String,
    pub status: PostStatus,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: BTreeMap<String, FieldValue>,
}

impl ReportRecord {
    pub fn from_new(id: RecordId, report: NewReport, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            post_type: report.post_type,
            status: report.status,
            title: report.title,
            created_at,
            meta: BTreeMap::new(),
        }
    }

    pub fn meta(&self, key: &str) -> Option<&FieldValue> {
        self.meta.get(key)
    }
}
