//! Recovery of the inline structured-data blob from page markup.
//!
//! The site embeds its Nuxt state as `window.__NUXT__ = {...};` inside an
//! inline script. The blob's braces are not greedy-safe (string values
//! contain `};` sequences), so several textual patterns are tried and each
//! candidate must actually parse as a non-empty JSON object to be accepted.
//! When no blob is recoverable the page's JSON-LD script tags are scanned
//! instead. Template pages may carry neither, in which case callers fall
//! back to anchor scanning.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

/// Candidate patterns for isolating the state blob, tried in order.
static NUXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?s)window\.__NUXT__\s*=\s*(\{.+?\});").unwrap(),
        Regex::new(r"(?s)window\.__NUXT__\s*=\s*(\{[^}]*data[^}]*\[[^\]]*\]);").unwrap(),
        Regex::new(r"(?s)window\.__NUXT__\s*=\s*(\{[^}]*\.data[^}]*\});").unwrap(),
    ]
});

/// Extract structured data from page markup.
///
/// Tries the state blob patterns first, then JSON-LD. Returns the first
/// candidate that parses to a non-empty JSON object, or `None` when the page
/// carries no recoverable structured data.
pub fn structured_data(html: &str) -> Option<Value> {
    state_blob(html).or_else(|| json_ld(html))
}

/// Isolate and parse the `window.__NUXT__` state blob.
fn state_blob(html: &str) -> Option<Value> {
    for (i, pattern) in NUXT_PATTERNS.iter().enumerate() {
        let Some(captures) = pattern.captures(html) else {
            continue;
        };
        let candidate = captures.get(1).map(|m| m.as_str())?;
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) if !map.is_empty() => {
                debug!(pattern = i, bytes = candidate.len(), "Parsed state blob");
                return Some(Value::Object(map));
            }
            Ok(_) => debug!(pattern = i, "State blob candidate was not a non-empty object"),
            Err(e) => debug!(pattern = i, error = %e, "State blob candidate failed to parse"),
        }
    }
    None
}

/// Scan `<script type="application/ld+json">` tags for a JSON object.
fn json_ld(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();

    for script in document.select(&selector) {
        let body = script.text().collect::<String>();
        if body.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(value @ Value::Object(_)) => {
                debug!("Parsed JSON-LD structured data");
                return Some(value);
            }
            _ => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_blob_simple() {
        let html = r#"<html><script>window.__NUXT__ = {"data":[{"title":"x"}]};</script></html>"#;
        let data = structured_data(html).unwrap();
        assert!(data.get("data").is_some());
    }

    #[test]
    fn test_state_blob_no_spaces() {
        let html = r#"<script>window.__NUXT__={"state":{"ok":true}};</script>"#;
        let data = structured_data(html).unwrap();
        assert_eq!(data["state"]["ok"], Value::Bool(true));
    }

    #[test]
    fn test_empty_blob_rejected_falls_through_to_json_ld() {
        let html = concat!(
            r#"<script>window.__NUXT__ = {};</script>"#,
            r#"<script type="application/ld+json">{"@type":"RadioSeries","name":"Utility Fog"}</script>"#,
        );
        let data = structured_data(html).unwrap();
        assert_eq!(data["@type"], Value::String("RadioSeries".to_string()));
    }

    #[test]
    fn test_json_ld_array_rejected() {
        let html = r#"<script type="application/ld+json">[1, 2, 3]</script>"#;
        assert!(structured_data(html).is_none());
    }

    #[test]
    fn test_no_structured_data() {
        let html = "<html><body><p>Nothing here</p></body></html>";
        assert!(structured_data(html).is_none());
    }

    #[test]
    fn test_unparseable_blob_is_not_fatal() {
        let html = r#"<script>window.__NUXT__ = {broken json};</script>"#;
        assert!(structured_data(html).is_none());
    }
}
