//! Content Security Policy definition for the MCD beacon.
//!
//! The policy is the canonical source for two things the report handler
//! checks incoming reports against: the full policy string a browser echoes
//! back as `original-policy`, and the list of serialized directives it may
//! name as `violated-directive`.
//!
//! ```
//! use mcd_policy::{CspPolicy, PolicySource, beacon_report_uri};
//!
//! let policy = CspPolicy::new()
//!     .default_src(vec!["'self'".to_string()])
//!     .script_src(vec!["'self'".to_string(), "https://cdn.example.com".to_string()]);
//!
//! let uri = beacon_report_uri("https://example.com", "n0nce");
//! assert_eq!(uri, "https://example.com/?mcd=report&nonce=n0nce");
//!
//! assert_eq!(
//!     policy.get_full_policy(Some(&uri)),
//!     "default-src 'self'; script-src 'self' https://cdn.example.com; \
//!      report-uri https://example.com/?mcd=report&nonce=n0nce"
//! );
//! assert!(policy.get_policies().contains(&"default-src 'self'".to_string()));
//! ```

use thiserror::Error;

/// Directive that names the reporting endpoint.
pub const REPORT_URI: &str = "report-uri";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy is empty")]
    Empty,

    #[error("Invalid directive name: {0}")]
    InvalidDirective(String),
}

/// Canonical policy as consumed by the report handler.
pub trait PolicySource: Send + Sync {
    /// The full header value, with `report-uri` appended when given.
    fn get_full_policy(&self, report_uri: Option<&str>) -> String;

    /// Every serialized directive, e.g. `"script-src 'self'"`.
    fn get_policies(&self) -> Vec<String>;
}

/// Content Security Policy configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspPolicy {
    /// Directives in header order
    directives: Vec<(String, Vec<String>)>,

    /// Default reporting endpoint, used when none is passed at render time
    report_uri: Option<String>,

    /// Report violations only (doesn't enforce)
    report_only: bool,
}

impl CspPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive, replacing an existing one of the same name in place
    pub fn directive(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        match self.directives.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = values,
            None => self.directives.push((name, values)),
        }
        self
    }

    pub fn default_src(self, sources: Vec<String>) -> Self {
        self.directive("default-src", sources)
    }

    pub fn script_src(self, sources: Vec<String>) -> Self {
        self.directive("script-src", sources)
    }

    pub fn style_src(self, sources: Vec<String>) -> Self {
        self.directive("style-src", sources)
    }

    pub fn img_src(self, sources: Vec<String>) -> Self {
        self.directive("img-src", sources)
    }

    pub fn connect_src(self, sources: Vec<String>) -> Self {
        self.directive("connect-src", sources)
    }

    pub fn font_src(self, sources: Vec<String>) -> Self {
        self.directive("font-src", sources)
    }

    pub fn object_src(self, sources: Vec<String>) -> Self {
        self.directive("object-src", sources)
    }

    pub fn media_src(self, sources: Vec<String>) -> Self {
        self.directive("media-src", sources)
    }

    pub fn frame_src(self, sources: Vec<String>) -> Self {
        self.directive("frame-src", sources)
    }

    pub fn report_uri(mut self, uri: impl Into<String>) -> Self {
        self.report_uri = Some(uri.into());
        self
    }

    pub fn report_only(mut self, enabled: bool) -> Self {
        self.report_only = enabled;
        self
    }

    pub fn is_report_only(&self) -> bool {
        self.report_only
    }

    pub fn directives(&self) -> &[(String, Vec<String>)] {
        &self.directives
    }

    pub fn header_name(&self) -> &'static str {
        if self.report_only {
            "Content-Security-Policy-Report-Only"
        } else {
            "Content-Security-Policy"
        }
    }

    /// Header name and value, ready to attach to a response
    pub fn header(&self, report_uri: Option<&str>) -> (&'static str, String) {
        (self.header_name(), self.get_full_policy(report_uri))
    }

    /// Parse a header value back into a policy.
    ///
    /// Empty segments are skipped; `report-uri` is lifted out of the
    /// directive list.
    pub fn parse(header: &str) -> Result<Self, PolicyError> {
        let mut policy = Self::new();

        for segment in header.split(';') {
            let mut parts = segment.split_whitespace();
            let Some(name) = parts.next() else {
                continue;
            };

            let name = name.to_ascii_lowercase();
            if !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(PolicyError::InvalidDirective(name));
            }

            if name == REPORT_URI {
                policy.report_uri = parts.next().map(str::to_string);
                continue;
            }

            policy = policy.directive(name, parts.map(str::to_string).collect());
        }

        if policy.directives.is_empty() {
            return Err(PolicyError::Empty);
        }

        Ok(policy)
    }

    fn serialize_directive(name: &str, values: &[String]) -> String {
        if values.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, values.join(" "))
        }
    }
}

impl PolicySource for CspPolicy {
    fn get_full_policy(&self, report_uri: Option<&str>) -> String {
        let mut parts = self.get_policies();

        if let Some(uri) = report_uri.or(self.report_uri.as_deref()) {
            parts.push(format!("{} {}", REPORT_URI, uri));
        }

        parts.join("; ")
    }

    fn get_policies(&self) -> Vec<String> {
        self.directives
            .iter()
            .map(|(name, values)| Self::serialize_directive(name, values))
            .collect()
    }
}

/// The beacon URL a browser posts reports to: `<site>/?mcd=report&nonce=<nonce>`.
pub fn beacon_report_uri(site_url: &str, nonce: &str) -> String {
    let query = serde_urlencoded::to_string([("mcd", "report"), ("nonce", nonce)])
        .unwrap_or_else(|_| format!("mcd=report&nonce={}", nonce));
    format!("{}/?{}", site_url.trim_end_matches('/'), query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let csp = CspPolicy::new()
            .script_src(s(&["'self'"]))
            .default_src(s(&["'none'"]));

        assert_eq!(
            csp.get_full_policy(None),
            "script-src 'self'; default-src 'none'"
        );
    }

    #[test]
    fn test_directive_replaced_in_place() {
        let csp = CspPolicy::new()
            .default_src(s(&["'self'"]))
            .img_src(s(&["data:"]))
            .default_src(s(&["'none'"]));

        assert_eq!(csp.get_policies(), s(&["default-src 'none'", "img-src data:"]));
    }

    #[test]
    fn test_valueless_directive() {
        let csp = CspPolicy::new().directive("upgrade-insecure-requests", Vec::new());
        assert_eq!(csp.get_policies(), s(&["upgrade-insecure-requests"]));
    }

    #[test]
    fn test_report_uri_override() {
        let csp = CspPolicy::new()
            .default_src(s(&["'self'"]))
            .report_uri("/default");

        assert_eq!(
            csp.get_full_policy(None),
            "default-src 'self'; report-uri /default"
        );
        assert_eq!(
            csp.get_full_policy(Some("/other")),
            "default-src 'self'; report-uri /other"
        );
    }

    #[test]
    fn test_header_name() {
        let csp = CspPolicy::new().default_src(s(&["'self'"]));
        assert_eq!(csp.header_name(), "Content-Security-Policy");
        assert_eq!(
            csp.report_only(true).header(None).0,
            "Content-Security-Policy-Report-Only"
        );
    }

    #[test]
    fn test_parse() {
        let csp = CspPolicy::parse(
            "default-src 'self'; script-src 'self' https://cdn.example.com;; report-uri /r",
        )
        .unwrap();

        assert_eq!(
            csp.get_policies(),
            s(&["default-src 'self'", "script-src 'self' https://cdn.example.com"])
        );
        assert_eq!(
            csp.get_full_policy(None),
            "default-src 'self'; script-src 'self' https://cdn.example.com; report-uri /r"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(CspPolicy::parse(" ; "), Err(PolicyError::Empty));
        assert_eq!(CspPolicy::parse("report-uri /r"), Err(PolicyError::Empty));
        assert!(matches!(
            CspPolicy::parse("script_src 'self'"),
            Err(PolicyError::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_beacon_report_uri_encodes_nonce() {
        assert_eq!(
            beacon_report_uri("https://example.com/", "a b"),
            "https://example.com/?mcd=report&nonce=a+b"
        );
    }
}
