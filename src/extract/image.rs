//! Program cover image recovery.
//!
//! Resolution order: the static override table, then the structured-data
//! program node (following `__ref` image indirection when present), then a
//! raw-markup scan for size-variant image URLs. Size preference is
//! widescreen 2000px, then the 1200x630 social preview, then widescreen
//! 800px. A denylist of generic site imagery (volunteer drives, station
//! promos) applies to every heuristic path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::extract::episodes::{is_image_node, is_program_node};
use crate::models::ProgramIdentity;

/// `sizes` keys in descending preference order.
const SIZE_PRIORITY: &[&str] = &[
    "wide_2000",
    "opengraph",
    "wide_800",
    "auto_2000",
    "landscape_2000",
    "auto_800",
    "landscape_800",
];

/// Filename prefixes of images that appear on many pages but identify
/// nothing program-specific.
const GENERIC_IMAGE_PREFIXES: &[&str] = &["fbi-volunteers", "supportfbi", "syd_images_web"];

/// Size-variant URL patterns for the raw-markup scan, best first. The lax
/// `.+?` variants pick up URLs containing literal spaces.
static SIZED_IMAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)https://media\.fbi\.radio/images/[^"'\s)]+-2000x11\d{2}\.jpg"#).unwrap(),
        Regex::new(r#"(?i)https://media\.fbi\.radio/images/[^"'\s)]+-1200x630\.jpg"#).unwrap(),
        Regex::new(r#"(?i)https://media\.fbi\.radio/images/[^"'\s)]+-800x450\.jpg"#).unwrap(),
        Regex::new(r"(?i)https://media\.fbi\.radio/images/.+?-2000x11\d{2}\.jpg").unwrap(),
        Regex::new(r"(?i)https://media\.fbi\.radio/images/.+?-1200x630\.jpg").unwrap(),
        Regex::new(r"(?i)https://media\.fbi\.radio/images/.+?-800x450\.jpg").unwrap(),
    ]
});

/// Catch-all image URL for the last-resort scan.
static ANY_IMAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https://media\.fbi\.radio/images/[^"'\s)]+\.jpg"#).unwrap());

/// Filename extractor used by the denylist check.
static FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/([^/]+)\.jpg").unwrap());

/// Resolve the cover image for a program page.
pub fn cover_image(
    identity: &ProgramIdentity,
    html: &str,
    structured: Option<&Value>,
) -> Option<String> {
    if let Some(known) = &identity.known_image {
        debug!(slug = %identity.slug, "Using cover image from override table");
        return Some(known.clone());
    }

    if let Some(data) = structured {
        if let Some(url) = image_from_structured(data, &identity.slug) {
            return Some(url);
        }
    }

    image_from_markup(html)
}

/// Is this URL generic station imagery rather than a program cover?
pub fn is_generic_image(url: &str) -> bool {
    let lower = url.to_lowercase();

    if let Some(captures) = FILENAME_RE.captures(&lower) {
        let filename = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        if GENERIC_IMAGE_PREFIXES
            .iter()
            .any(|prefix| filename.starts_with(prefix))
        {
            return true;
        }
    }

    GENERIC_IMAGE_PREFIXES
        .iter()
        .any(|prefix| lower.contains(&format!("/{prefix}")))
}

/// Find the program's image via its node in the structured data tree.
fn image_from_structured(data: &Value, slug: &str) -> Option<String> {
    if let Some(program) = find_program_node(data, slug) {
        if let Some(image_value) = program.get("image") {
            // Indirect reference ("Image:<id>") or inline image object.
            let resolved = match image_value.get("__ref").and_then(Value::as_str) {
                Some(reference) => find_by_ref(data, reference),
                None => Some(image_value),
            };
            if let Some(url) = resolved.and_then(image_url_from_value) {
                debug!(%slug, "Cover image resolved from program node");
                return Some(url);
            }
        }
    }

    // Program node not found or imageless: any non-generic image in the tree.
    image_url_from_value(data).filter(|url| !is_generic_image(url))
}

/// Locate the program node: program-shaped (slug + title, no date) with a
/// slug matching this program.
pub fn find_program_node<'a>(data: &'a Value, slug: &str) -> Option<&'a Value> {
    match data {
        Value::Object(obj) => {
            if is_program_node(obj) {
                let node_slug = obj.get("slug").and_then(Value::as_str).unwrap_or_default();
                if node_slug == slug || node_slug.ends_with(slug) || node_slug.contains(slug) {
                    return Some(data);
                }
            }
            obj.values().find_map(|child| find_program_node(child, slug))
        }
        Value::Array(items) => items.iter().find_map(|item| find_program_node(item, slug)),
        _ => None,
    }
}

/// Resolve an indirect object reference like `Image:66dcbfda...` by ID.
pub fn find_by_ref<'a>(data: &'a Value, reference: &str) -> Option<&'a Value> {
    let ref_id = reference.rsplit(':').next().unwrap_or(reference);
    find_by_id(data, ref_id)
}

fn find_by_id<'a>(data: &'a Value, id: &str) -> Option<&'a Value> {
    match data {
        Value::Object(obj) => {
            if obj.get("id").and_then(Value::as_str) == Some(id) {
                return Some(data);
            }
            obj.values().find_map(|child| find_by_id(child, id))
        }
        Value::Array(items) => items.iter().find_map(|item| find_by_id(item, id)),
        _ => None,
    }
}

/// Pull the best-sized image URL out of a value, searching recursively for
/// image-shaped objects and honoring the size priority order.
fn image_url_from_value(value: &Value) -> Option<String> {
    let mut found: Vec<(String, usize)> = Vec::new();
    collect_sized_urls(value, &mut found);
    found.sort_by_key(|(_, priority)| *priority);
    found.into_iter().map(|(url, _)| url).next()
}

fn collect_sized_urls(value: &Value, out: &mut Vec<(String, usize)>) {
    match value {
        Value::Object(obj) => {
            let sizes = if is_image_node(obj) {
                obj.get("sizes").and_then(Value::as_object)
            } else {
                Some(obj)
            };
            if let Some(sizes) = sizes {
                for (priority, key) in SIZE_PRIORITY.iter().enumerate() {
                    if let Some(url) = sizes
                        .get(*key)
                        .and_then(|entry| entry.get("url"))
                        .and_then(Value::as_str)
                    {
                        if url.starts_with("http") {
                            out.push((url.to_string(), priority));
                        }
                    }
                }
            }
            for child in obj.values() {
                collect_sized_urls(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_sized_urls(item, out);
            }
        }
        _ => {}
    }
}

/// Raw-markup fallback: scan for size-variant URLs in preference order.
fn image_from_markup(html: &str) -> Option<String> {
    for pattern in SIZED_IMAGE_PATTERNS.iter() {
        for m in pattern.find_iter(html) {
            let url = m.as_str().replace(' ', "%20");
            if !is_generic_image(&url) {
                debug!(%url, "Cover image resolved from raw markup");
                return Some(url);
            }
        }
    }

    // Last resort: any image that is not a small square thumb.
    for m in ANY_IMAGE_PATTERN.find_iter(html) {
        let url = m.as_str().replace(' ', "%20");
        if !is_generic_image(&url) && !url.contains("-320x") {
            return Some(url);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(slug: &str) -> ProgramIdentity {
        ProgramIdentity::new(slug, "Test Program")
    }

    #[test]
    fn test_override_table_bypasses_heuristics() {
        // The fixture markup contains a clearly-wrong candidate the heuristic
        // scan would otherwise pick up.
        let html = r#"<img src="https://media.fbi.radio/images/wrong-show-2000x1125.jpg">"#;
        let url = cover_image(&identity("utility-fog"), html, None).unwrap();
        assert_eq!(
            url,
            "https://media.fbi.radio/images/utility%20fog%20with%20peter%20hollo-800x450.jpg"
        );
    }

    #[test]
    fn test_structured_program_node_with_inline_image() {
        let data = json!({
            "docs": [{
                "title": "Loose Joints",
                "slug": "loose-joints",
                "image": {"sizes": {
                    "wide_800": {"url": "https://media.fbi.radio/images/lj-800x450.jpg"},
                    "wide_2000": {"url": "https://media.fbi.radio/images/lj-2000x1125.jpg"}
                }}
            }]
        });
        let url = cover_image(&identity("loose-joints"), "", Some(&data)).unwrap();
        assert_eq!(url, "https://media.fbi.radio/images/lj-2000x1125.jpg");
    }

    #[test]
    fn test_structured_ref_indirection() {
        let data = json!({
            "program": {
                "title": "Loose Joints",
                "slug": "loose-joints",
                "image": {"__ref": "Image:66dcbfda"}
            },
            "images": [{
                "id": "66dcbfda",
                "sizes": {"opengraph": {"url": "https://media.fbi.radio/images/lj-1200x630.jpg"}}
            }]
        });
        let url = cover_image(&identity("loose-joints"), "", Some(&data)).unwrap();
        assert_eq!(url, "https://media.fbi.radio/images/lj-1200x630.jpg");
    }

    #[test]
    fn test_markup_scan_priority_order() {
        let html = concat!(
            r#"<meta content="https://media.fbi.radio/images/show-800x450.jpg">"#,
            r#"<meta content="https://media.fbi.radio/images/show-1200x630.jpg">"#,
        );
        let url = cover_image(&identity("some-show"), html, None).unwrap();
        assert_eq!(url, "https://media.fbi.radio/images/show-1200x630.jpg");
    }

    #[test]
    fn test_markup_scan_skips_generic_images() {
        let html = concat!(
            r#"<img src="https://media.fbi.radio/images/fbi-volunteers-2000x1125.jpg">"#,
            r#"<img src="https://media.fbi.radio/images/show-800x450.jpg">"#,
        );
        let url = cover_image(&identity("some-show"), html, None).unwrap();
        assert_eq!(url, "https://media.fbi.radio/images/show-800x450.jpg");
    }

    #[test]
    fn test_space_in_url_normalized() {
        let html = r#"<img src="https://media.fbi.radio/images/my show-800x450.jpg">"#;
        let url = cover_image(&identity("some-show"), html, None).unwrap();
        assert_eq!(url, "https://media.fbi.radio/images/my%20show-800x450.jpg");
    }

    #[test]
    fn test_is_generic_image() {
        assert!(is_generic_image(
            "https://media.fbi.radio/images/supportfbi-banner-800x450.jpg"
        ));
        assert!(!is_generic_image(
            "https://media.fbi.radio/images/loose-joints-800x450.jpg"
        ));
    }

    #[test]
    fn test_nothing_resolvable() {
        assert!(cover_image(&identity("some-show"), "<html></html>", None).is_none());
    }
}
