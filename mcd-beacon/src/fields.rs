//! Field whitelist and per-field sanitizers.

use crate::escape::esc_url;
use crate::report::{FieldValue, ReportField, SanitizedReport};
use serde_json::{Map, Value};

/// How a whitelisted field is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitizer {
    BlockedUri,
    Url,
    AbsInt,
    OriginalPolicy,
    ViolatedDirective,
}

/// A whitelisted field and its sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: ReportField,
    pub sanitizer: Sanitizer,
}

pub static WHITELISTED_FIELDS: [FieldRule; 6] = [
    FieldRule {
        field: ReportField::BlockedUri,
        sanitizer: Sanitizer::BlockedUri,
    },
    FieldRule {
        field: ReportField::DocumentUri,
        sanitizer: Sanitizer::Url,
    },
    FieldRule {
        field: ReportField::OriginalPolicy,
        sanitizer: Sanitizer::OriginalPolicy,
    },
    FieldRule {
        field: ReportField::Referrer,
        sanitizer: Sanitizer::Url,
    },
    FieldRule {
        field: ReportField::StatusCode,
        sanitizer: Sanitizer::AbsInt,
    },
    FieldRule {
        field: ReportField::ViolatedDirective,
        sanitizer: Sanitizer::ViolatedDirective,
    },
];

/// Rule for a wire key, if the key is whitelisted.
pub fn rule_for(key: &str) -> Option<&'static FieldRule> {
    let field = ReportField::from_key(key)?;
    WHITELISTED_FIELDS.iter().find(|rule| rule.field == field)
}

/// Canonical values the comparing sanitizers check against.
#[derive(Debug, Clone, Default)]
pub struct SanitizeContext {
    pub site_url: String,
    pub full_policy: String,
    pub policies: Vec<String>,
}

impl Sanitizer {
    /// Clean one value. `None` means the value was not usable and the
    /// field is dropped.
    pub fn apply(&self, value: &Value, ctx: &SanitizeContext) -> Option<FieldValue> {
        let cleaned = match self {
            Sanitizer::AbsInt => return absint(value).map(FieldValue::Integer),
            Sanitizer::BlockedUri => sanitize_blocked_uri(&scalar_text(value)?, &ctx.site_url),
            Sanitizer::Url => esc_url(&scalar_text(value)?),
            Sanitizer::OriginalPolicy => {
                sanitize_original_policy(&scalar_text(value)?, &ctx.full_policy)
            }
            Sanitizer::ViolatedDirective => {
                sanitize_violated_directive(&scalar_text(value)?, &ctx.policies)
            }
        };
        Some(FieldValue::Text(cleaned))
    }
}

/// Run every whitelisted field of `report` through its sanitizer.
///
/// Unknown keys and values a sanitizer rejects are dropped. A missing
/// `blocked-uri` is sanitized as an empty string, so the title falls back
/// to the site URL.
pub fn sanitize_report(report: &Map<String, Value>, ctx: &SanitizeContext) -> SanitizedReport {
    let mut sanitized = SanitizedReport::default();

    for (key, value) in report {
        let Some(rule) = rule_for(key) else {
            continue;
        };
        if let Some(clean) = rule.sanitizer.apply(value, ctx) {
            sanitized.fields.insert(rule.field, clean);
        }
    }

    sanitized.title = match sanitized.get(ReportField::BlockedUri) {
        Some(FieldValue::Text(title)) => title.clone(),
        _ => sanitize_blocked_uri("", &ctx.site_url),
    };

    sanitized
}

/// `data` passes through, blank becomes the site URL as given, anything
/// else is URL-escaped.
pub fn sanitize_blocked_uri(uri: &str, site_url: &str) -> String {
    let uri = uri.trim();

    if uri == "data" {
        return "data".to_string();
    }

    if uri.is_empty() {
        return site_url.to_string();
    }

    esc_url(uri)
}

/// Keep the policy only if it is exactly the canonical one.
pub fn sanitize_original_policy(policy: &str, canonical: &str) -> String {
    if policy == canonical {
        policy.to_string()
    } else {
        String::new()
    }
}

/// Keep the directive only if it is one the site's policy declares.
pub fn sanitize_violated_directive(directive: &str, policies: &[String]) -> String {
    if policies.iter().any(|known| known == directive) {
        directive.to_string()
    } else {
        String::new()
    }
}

/// Coerce to a non-negative integer; negative or non-numeric becomes 0.
///
/// Strings are read by their leading integer (`"404 Not Found"` is 404).
/// Arrays and objects are rejected.
pub fn absint(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Null => 0,
        Value::Bool(b) => u64::from(*b),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(n), _, _) => n,
            (None, Some(_), _) => 0,
            (None, None, Some(f)) if f >= 1.0 => f as u64,
            _ => 0,
        },
        Value::String(s) => leading_uint(s),
        Value::Array(_) | Value::Object(_) => return None,
    };
    Some(n)
}

fn leading_uint(s: &str) -> u64 {
    let s = s.trim_start();
    if s.starts_with('-') {
        return 0;
    }

    s.trim_start_matches('+')
        .chars()
        .take_while(char::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(d.to_digit(10).unwrap_or(0)))
        })
}

/// Text form of a scalar JSON value; arrays and objects have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) | Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
