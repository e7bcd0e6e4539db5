//! Output escaping helpers.
//!
//! These follow the host CMS's display-context rules so stored values and
//! rendered admin cells look the same as they would there.

use once_cell::sync::Lazy;
use regex::Regex;

/// Schemes `esc_url` lets through.
pub const ALLOWED_PROTOCOLS: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "news", "irc", "irc6", "ircs", "gopher", "nntp",
    "feed", "telnet", "mms", "rtsp", "sms", "svn", "tel", "fax", "xmpp", "webcal", "urn",
];

static URL_DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z0-9\-~+_.?#=!&;,/:%@$|*'()\[\]\x{80}-\x{10FFFF}]")
        .expect("valid URL filter pattern")
});

static ENCODED_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)%0[ad]").expect("valid line-break pattern"));

static PHP_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9-]+?\.php").expect("valid php pattern"));

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{0,31});")
        .expect("valid entity pattern")
});

static SCHEME_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i):|&#0*58;|&#x0*3a;").expect("valid scheme separator pattern"));

static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(?:([0-9]{1,7})|[xX]([0-9a-fA-F]{1,6}));").expect("valid numeric entity pattern")
});

/// Rounds of scheme stripping before a URL is given up on.
const MAX_PROTOCOL_PASSES: usize = 6;

static SCRIPT_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>").expect("valid script pattern")
});

static STYLE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*?>.*?</style>").expect("valid style pattern"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*(>|$)").expect("valid tag pattern"));

/// Clean a URL for storage and display.
///
/// Returns an empty string when nothing usable is left or the scheme is not
/// in [`ALLOWED_PROTOCOLS`].
pub fn esc_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    let url = url.replace(' ', "%20");
    let mut url = URL_DISALLOWED.replace_all(&url, "").into_owned();
    if url.is_empty() {
        return url;
    }

    if !url.to_ascii_lowercase().starts_with("mailto:") {
        while ENCODED_BREAK.is_match(&url) {
            url = ENCODED_BREAK.replace_all(&url, "").into_owned();
        }
        if url.is_empty() {
            return url;
        }
    }

    let mut url = url.replace(";//", "://");

    if !url.contains(':') && !url.starts_with(['/', '#', '?']) && !PHP_FILE.is_match(&url) {
        url = format!("http://{}", url);
    }

    if !url.starts_with('/') {
        match strip_bad_protocols(&url) {
            Some(clean) if clean.eq_ignore_ascii_case(&url) => {}
            _ => return String::new(),
        }
    }

    normalize_ampersands(&url, "&#038;").replace('\'', "&#039;")
}

/// Escape text for an HTML context. Existing entities are not re-encoded.
pub fn esc_html(text: &str) -> String {
    let text = normalize_ampersands(text, "&amp;");
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove every tag, and `<script>`/`<style>` elements with their content.
pub fn strip_all_tags(text: &str) -> String {
    let text = SCRIPT_ELEMENT.replace_all(text, "");
    let text = STYLE_ELEMENT.replace_all(&text, "");
    TAG.replace_all(&text, "").trim().to_string()
}

/// Remove disallowed schemes until the URL stops changing. `None` if it
/// never settles.
fn strip_bad_protocols(url: &str) -> Option<String> {
    let mut url = url.to_string();
    for _ in 0..MAX_PROTOCOL_PASSES {
        let next = strip_bad_protocol_once(&url);
        if next == url {
            return Some(url);
        }
        url = next;
    }
    None
}

/// The scheme is whatever precedes the first `:` (plain or entity-encoded),
/// unless that prefix contains `/?`. A disallowed scheme is dropped along
/// with its separator.
fn strip_bad_protocol_once(url: &str) -> String {
    let Some(separator) = SCHEME_SEPARATOR.find(url) else {
        return url.to_string();
    };

    let prefix = &url[..separator.start()];
    if prefix.contains("/?") {
        return url.to_string();
    }

    let rest = url[separator.end()..].trim();
    match normalize_scheme(prefix) {
        Some(scheme) => format!("{}:{}", scheme, rest),
        None => rest.to_string(),
    }
}

/// Decode numeric entities, drop whitespace and control characters, then
/// lowercase. Returns the scheme only if it is allowed.
fn normalize_scheme(prefix: &str) -> Option<String> {
    let decoded = NUMERIC_ENTITY.replace_all(prefix, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
            (None, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    let scheme: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_lowercase();

    ALLOWED_PROTOCOLS
        .contains(&scheme.as_str())
        .then_some(scheme)
}

/// Replace each `&` that does not start a well-formed entity, and each
/// `&amp;`, with `replacement`.
fn normalize_ampersands(text: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        match ENTITY.find(after) {
            Some(m) if !after[..m.end()].eq_ignore_ascii_case("amp;") => {
                out.push('&');
                out.push_str(m.as_str());
                rest = &after[m.end()..];
            }
            Some(m) => {
                out.push_str(replacement);
                rest = &after[m.end()..];
            }
            None => {
                out.push_str(replacement);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
