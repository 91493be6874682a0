//! URL normalisation and the pure image-URL derivations.
//!
//! User input gets exactly two fix-ups: a missing scheme becomes `https://`,
//! and a bare two-label hostname gets a `www.` prefix. Anything else that
//! does not parse is rejected before a network call is made.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

use crate::error::{Result, StartPageError};

const FAVICON_ENDPOINT: &str = "https://www.google.com/s2/favicons";
const PLACEHOLDER_ENDPOINT: &str = "https://via.placeholder.com/150x150/4A90E2/FFFFFF";
const PLACEHOLDER_DEFAULT_TEXT: &str = "Website";

fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://").expect("static regex"))
}

fn local_host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(localhost|\d+\.\d+\.\d+\.\d+)$").expect("static regex")
    })
}

/// Auto-formats a typed URL: adds `https://` and, for `example.com`-style
/// hosts, `www.`. Input that cannot be parsed comes back with only the
/// scheme prefix so validation can reject it.
pub fn format_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let url = if scheme_pattern().is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut parsed = match Url::parse(&url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("URL formatting error for {}: {}", url, e);
            return url;
        }
    };

    let host = match parsed.host_str() {
        Some(host) => host.to_string(),
        None => return url,
    };

    let is_bare_domain = host.contains('.')
        && !host.starts_with("www.")
        && host.split('.').count() == 2
        && !local_host_pattern().is_match(&host);

    if is_bare_domain && parsed.set_host(Some(&format!("www.{}", host))).is_ok() {
        return parsed.to_string();
    }
    url
}

pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map_or(false, |h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Formats then validates, as the add/preview forms do
pub fn normalize_user_url(input: &str) -> Result<String> {
    let url = format_url(input);
    if url.is_empty() || !is_valid_url(&url) {
        return Err(StartPageError::InvalidUrl(input.trim().to_string()));
    }
    Ok(url)
}

/// Favicon service URL for the host of `url`; `None` if `url` does not parse
pub fn favicon_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    let mut favicon = Url::parse(FAVICON_ENDPOINT).ok()?;
    favicon
        .query_pairs_mut()
        .append_pair("domain", host)
        .append_pair("sz", "256");
    Some(favicon.to_string())
}

/// Text placeholder keyed by display name. Never fails.
pub fn placeholder_url(name: &str) -> String {
    let text = match name.trim() {
        "" => PLACEHOLDER_DEFAULT_TEXT,
        trimmed => trimmed,
    };
    match Url::parse_with_params(PLACEHOLDER_ENDPOINT, &[("text", text)]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}?text={}", PLACEHOLDER_ENDPOINT, PLACEHOLDER_DEFAULT_TEXT),
    }
}

/// Image shown for a tile without a screenshot: favicon, else placeholder
pub fn tile_image(name: &str, url: &str) -> String {
    favicon_url(url).unwrap_or_else(|| placeholder_url(name))
}
