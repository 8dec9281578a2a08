//! Audio locator recovery from episode page text.
//!
//! The CDN path has the fixed shape `{orgId}/{showId}/{clipId}`, but none of
//! the three identifiers is guaranteed to appear verbatim on an episode page.
//! This module holds the pure pieces of the recovery chain: the direct URL
//! match (tier 1) and the raw material for heuristic reconstruction (tier 2):
//! org ID from inline configuration, build ID detection, UUID token
//! collection, clip selection, triad assembly. The show-ID strategy chain
//! needs the network and the per-program cache, so it lives in
//! [`crate::scrape`].

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::AudioLocator;
use crate::programs;

/// Fully-formed CDN URL variants, most specific first.
static CDN_URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"(?i)https://traffic\.omny\.fm/d/clips/[a-f0-9\-]+/[a-f0-9\-]+/[a-f0-9\-]+/audio\.mp3",
        )
        .unwrap(),
        Regex::new(r#"(?i)https://traffic\.omny\.fm/d/clips/[^"'\s)]+/audio\.mp3"#).unwrap(),
        Regex::new(
            r"(?i)traffic\.omny\.fm/d/clips/[a-f0-9\-]+/[a-f0-9\-]+/[a-f0-9\-]+/audio\.mp3",
        )
        .unwrap(),
        Regex::new(r#"(?i)traffic\.omny\.fm/d/clips/[^"'\s)]+/audio\.mp3"#).unwrap(),
    ]
});

/// UUID-shaped token: 8-4-4-4-12 hex digits.
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

/// `omnyStudio: { orgId: "..." }` inline configuration.
static ORG_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)omnyStudio[^}]*orgId["']?\s*:\s*["']([^"']+)"#).unwrap());

/// `omnyStudio: { showId: "..." }` inline configuration.
static SHOW_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)omnyStudio[^}]*showId["']?\s*:\s*["']([^"']+)"#).unwrap());

/// Nuxt build identifier, which is UUID-shaped and must not be mistaken
/// for a clip.
static BUILD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)buildId["']?\s*:\s*["']([^"']+)"#).unwrap());

/// `"showId": "..."` inside a serialized clip reference.
static CLIP_SHOW_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"showId"\s*:\s*"([^"]+)""#).unwrap());

/// Tier 1: a fully-formed CDN audio URL anywhere in the page text.
///
/// The match is returned verbatim (scheme prefixed when the page carried a
/// scheme-less variant).
pub fn direct_cdn_url(html: &str) -> Option<String> {
    for pattern in CDN_URL_PATTERNS.iter() {
        if let Some(m) = pattern.find(html) {
            let url = m.as_str();
            let url = if url.starts_with("http") {
                url.to_string()
            } else {
                format!("https://{url}")
            };
            debug!(%url, "Found fully-formed CDN audio URL");
            return Some(url);
        }
    }
    None
}

/// Org ID from inline configuration, or the site-wide default.
pub fn org_id(html: &str) -> String {
    ORG_ID_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| programs::DEFAULT_ORG_ID.to_string())
}

/// Show ID from inline configuration, when the page carries one.
pub fn config_show_id(html: &str) -> Option<String> {
    SHOW_ID_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Show ID named by a serialized `omnyStudioClip` reference.
pub fn clip_reference_show_id(serialized_clip: &str) -> Option<String> {
    CLIP_SHOW_ID_RE
        .captures(serialized_clip)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Nuxt build identifier, if the page exposes one.
pub fn build_id(html: &str) -> Option<String> {
    BUILD_ID_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// All UUID-shaped tokens in the page, lowercased, deduplicated in
/// discovery order, minus the excluded identifiers.
pub fn page_uuids(html: &str, exclude: &[&str]) -> Vec<String> {
    let excluded: Vec<String> = exclude.iter().map(|s| s.to_lowercase()).collect();
    UUID_RE
        .find_iter(html)
        .map(|m| m.as_str().to_lowercase())
        .unique()
        .filter(|uuid| !excluded.contains(uuid))
        .collect()
}

/// Pick the show ID out of the program page's UUID tokens.
///
/// The show ID is program-wide, so it appears on both page types, while
/// clip IDs are episode-specific: a token present on the program page but
/// absent from the episode page is taken to be the show. No such token
/// means the show stays unresolved and triad assembly falls back to its
/// ordering-based guess.
pub fn program_page_show_id(
    program_uuids: &[String],
    episode_uuids: &[String],
) -> Option<String> {
    program_uuids
        .iter()
        .find(|uuid| !episode_uuids.contains(uuid))
        .cloned()
}

/// Tier 2 final step: assemble a triad from the leftover tokens.
///
/// With a resolved show ID the clip is the earliest token that is not the
/// show (last token as a final fallback). Without one, and with at least two
/// tokens, the ordering-based guess applies: earliest token as the show,
/// earliest other token as the clip. A single leftover token is not a triad.
pub fn assemble_locator(
    org_id: &str,
    show_id: Option<&str>,
    uuids: &[String],
) -> Option<AudioLocator> {
    if uuids.is_empty() {
        return None;
    }

    match show_id {
        Some(show) => {
            let show = show.to_lowercase();
            let clip = uuids
                .iter()
                .find(|u| **u != show)
                .or_else(|| uuids.last())?
                .clone();
            Some(AudioLocator {
                org_id: org_id.to_string(),
                show_id: show,
                clip_id: clip,
            })
        }
        None if uuids.len() >= 2 => {
            let show = uuids[0].clone();
            let clip = uuids.iter().skip(1).find(|u| **u != show)?.clone();
            debug!(%show, %clip, "Show ID unresolved; using ordering-based guess");
            Some(AudioLocator {
                org_id: org_id.to_string(),
                show_id: show,
                clip_id: clip,
            })
        }
        None => None,
    }
}
