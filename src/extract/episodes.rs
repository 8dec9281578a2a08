//! Episode discovery within structured data, plus the anchor-tag fallback.
//!
//! The state blob has no stable schema: episode objects have been observed
//! at several depths and under several container keys (`Episodes`, `docs`,
//! page-level `data` arrays). Discovery therefore walks the whole JSON tree
//! and duck-types each object against named shape predicates instead of
//! navigating fixed paths. An object carrying all of `airedAt` + `slug` +
//! `title` is treated as an episode wherever it sits.

use itertools::Itertools;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::models::ProgramIdentity;
use crate::programs;

/// An episode-shaped object pulled out of the structured data tree.
///
/// Raw field values are kept as [`Value`]s; date and description resolution
/// happen later in the pipeline where the fallback chains live.
#[derive(Debug, Clone)]
pub struct EpisodeCandidate {
    pub title: String,
    pub url: String,
    /// Raw `airedAt` string, if the node carried one.
    pub aired_at: Option<String>,
    /// Raw description value (rich-text tree or plain string).
    pub description: Option<Value>,
}

/// Does this object look like an episode? (`airedAt` + `slug` + `title`)
pub fn is_episode_node(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("airedAt") && obj.contains_key("slug") && obj.contains_key("title")
}

/// Does this object look like a program? (`slug` + `title`, no `airedAt`)
///
/// The absence of a date field is what distinguishes a program node from an
/// episode node; both carry slug and title.
pub fn is_program_node(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("slug") && obj.contains_key("title") && !obj.contains_key("airedAt")
}

/// Does this object look like an image? (has a `sizes` object)
pub fn is_image_node(obj: &serde_json::Map<String, Value>) -> bool {
    obj.get("sizes").map(Value::is_object).unwrap_or(false)
}

/// Collect every episode-shaped object in the tree, in discovery order.
pub fn collect_candidates(data: &Value, identity: &ProgramIdentity) -> Vec<EpisodeCandidate> {
    let mut out = Vec::new();
    walk(data, identity, &mut out);
    out
}

fn walk(value: &Value, identity: &ProgramIdentity, out: &mut Vec<EpisodeCandidate>) {
    match value {
        Value::Object(obj) => {
            if is_episode_node(obj) {
                out.push(candidate_from_node(obj, identity));
                // An episode node does not nest further episodes.
                return;
            }
            for child in obj.values() {
                walk(child, identity, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, identity, out);
            }
        }
        _ => {}
    }
}

fn candidate_from_node(
    obj: &serde_json::Map<String, Value>,
    identity: &ProgramIdentity,
) -> EpisodeCandidate {
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Untitled")
        .to_string();
    let slug = obj.get("slug").and_then(Value::as_str).unwrap_or_default();
    let url = if slug.is_empty() {
        identity.url.clone()
    } else {
        format!(
            "{}/programs/{}/episodes/{}",
            programs::BASE_URL,
            identity.slug,
            slug
        )
    };

    EpisodeCandidate {
        title,
        url,
        aired_at: obj
            .get("airedAt")
            .and_then(Value::as_str)
            .map(str::to_string),
        description: obj.get("description").cloned(),
    }
}

/// Anchor-tag fallback: episode page links found in raw markup.
///
/// Collects every `a[href]` whose target contains the episode path segment
/// and the program slug, resolved against the site origin, deduplicated in
/// discovery order.
pub fn episode_links(html: &str, program_slug: &str) -> Vec<String> {
    let base = match Url::parse(programs::BASE_URL) {
        Ok(base) => base,
        Err(_) => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains("/episodes/") && href.contains(program_slug))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .unique()
        .collect()
}

/// Flatten the rich-text description shape into plain text.
///
/// The state blob stores descriptions as a lexical tree
/// (`{"root": {"children": [{"text": ...}, ...]}}`); plain strings are
/// passed through unchanged, anything else becomes empty.
pub fn parse_description(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(tree @ Value::Object(_)) => {
            let mut texts = Vec::new();
            collect_text(tree, &mut texts);
            texts.join(" ")
        }
        _ => String::new(),
    }
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(text)) = obj.get("text") {
                out.push(text.clone());
            }
            for child in obj.values() {
                collect_text(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        _ => {}
    }
}

/// Find the first value stored under `key` anywhere in the tree.
pub fn find_first_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(obj) => {
            if let Some(found) = obj.get(key) {
                return Some(found);
            }
            obj.values().find_map(|child| find_first_key(child, key))
        }
        Value::Array(items) => items.iter().find_map(|item| find_first_key(item, key)),
        _ => None,
    }
}
