//! Data models for programs, episodes, and audio locators.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`ProgramIdentity`]: A radio program as configured in the static roster
//! - [`EpisodeRecord`]: One aired episode, ready for feed emission
//! - [`AudioLocator`]: The org/show/clip identifier triad used by the Omny
//!   Studio CDN to address a specific audio file
//!
//! It also owns the feed ordering invariant: [`sort_newest_first`] is the
//! single definition of how episodes are ordered, applied both when records
//! are assembled and again at final serialization.

use chrono::{DateTime, Utc};

use crate::programs;

/// A radio program as driven by the static roster.
///
/// Identity is the URL slug. The optional `known_show_id` and `known_image`
/// fields are populated from the override tables at construction time and,
/// when present, bypass the fragile heuristic extraction paths entirely.
#[derive(Debug, Clone)]
pub struct ProgramIdentity {
    /// URL slug for the program (e.g., `loose-joints`).
    pub slug: String,
    /// Human-readable display name.
    pub name: String,
    /// Canonical program page URL.
    pub url: String,
    /// Show ID from the override table, if this program has one.
    pub known_show_id: Option<String>,
    /// Cover image URL from the override table, if this program has one.
    pub known_image: Option<String>,
}

impl ProgramIdentity {
    /// Build an identity for a slug, resolving overrides from the static tables.
    pub fn new(slug: &str, name: &str) -> Self {
        ProgramIdentity {
            slug: slug.to_string(),
            name: name.to_string(),
            url: programs::program_url(slug),
            known_show_id: programs::known_show_id(slug).map(str::to_string),
            known_image: programs::known_image(slug).map(str::to_string),
        }
    }
}

/// One aired episode of a program.
///
/// The episode page URL doubles as the feed item GUID. `published` is
/// optional in the model because discovery can precede date resolution,
/// but by the time a feed is emitted every record carries `Some` (the date
/// chain ends in a current-time placeholder).
#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    /// Episode title.
    pub title: String,
    /// Episode page URL; also used as the item GUID.
    pub url: String,
    /// Publish timestamp, normalized to UTC.
    pub published: Option<DateTime<Utc>>,
    /// Free-text description; may be empty.
    pub description: String,
    /// Direct CDN audio URL, when one could be resolved.
    pub audio_url: Option<String>,
}

/// The three-part identifier triad addressing one audio file on the CDN.
///
/// The org ID is site-wide (usually a fixed default), the show ID is
/// program-scoped, and the clip ID is episode-specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioLocator {
    pub org_id: String,
    pub show_id: String,
    pub clip_id: String,
}

impl AudioLocator {
    /// Render the deterministic CDN audio URL for this triad.
    pub fn audio_url(&self) -> String {
        format!(
            "{}/{}/{}/{}/audio.mp3",
            programs::CDN_CLIPS_BASE,
            self.org_id,
            self.show_id,
            self.clip_id
        )
    }
}

/// Sort episodes strictly newest-first.
///
/// Records without a timestamp sort after all timestamped records and keep
/// their relative discovery order among themselves (the sort is stable).
pub fn sort_newest_first(episodes: &mut [EpisodeRecord]) {
    episodes.sort_by_key(|ep| std::cmp::Reverse(ep.published.map(|dt| dt.timestamp())));
}
