//! Static site constants, the program roster, and the override tables.
//!
//! The roster drives which programs are processed. The override tables map a
//! subset of slugs to known show IDs and cover image URLs; when a slug is
//! present here the corresponding heuristic extraction path is bypassed
//! entirely. Add an entry whenever the heuristics resolve the wrong value
//! for a program.

/// Site origin all program and episode pages live under.
pub const BASE_URL: &str = "https://www.fbi.radio";

/// Base path of the Omny Studio clip CDN.
pub const CDN_CLIPS_BASE: &str = "https://traffic.omny.fm/d/clips";

/// Org ID used when none can be extracted from inline page configuration.
pub const DEFAULT_ORG_ID: &str = "02b00798-16d7-4067-89ac-aba000ffd8cb";

/// Programs to process: (slug, display name).
pub const ROSTER: &[(&str, &str)] = &[
    ("jack-off", "Jack Off"),
    ("loose-joints", "Loose Joints"),
    ("wildcard-with-stuart-coupe", "Wildcard With Stuart Coupe"),
    ("sunset-with-tangela", "Sunset with Tangela"),
    ("utility-fog", "Utility Fog"),
];

/// Known show IDs per slug, extracted from working CDN URLs.
const KNOWN_SHOW_IDS: &[(&str, &str)] = &[
    ("jack-off", "85ea9d91-cb57-46c4-a9c6-abe601048b69"),
    ("loose-joints", "e8d27dbf-88c7-4901-9560-b37b0064b8ec"),
    ("wildcard-with-stuart-coupe", "cec7fc63-681b-4126-a98c-b37d00232daa"),
    ("sunset-with-tangela", "018aa123-6990-463e-8983-b37f0095b36a"),
    ("utility-fog", "1e142c09-9e63-4d2e-8ce7-a00df26cf834"),
];

/// Known cover image URLs for programs where auto-extraction is unreliable.
const KNOWN_PROGRAM_IMAGES: &[(&str, &str)] = &[
    (
        "sunset-with-tangela",
        "https://media.fbi.radio/images/sunset%20with%20tangela-800x450.jpg",
    ),
    (
        "utility-fog",
        "https://media.fbi.radio/images/utility%20fog%20with%20peter%20hollo-800x450.jpg",
    ),
];

/// Canonical page URL for a program slug.
pub fn program_url(slug: &str) -> String {
    format!("{BASE_URL}/programs/{slug}")
}

/// Look up the override show ID for a slug, if one is known.
pub fn known_show_id(slug: &str) -> Option<&'static str> {
    KNOWN_SHOW_IDS
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, id)| *id)
}

/// Look up the override cover image for a slug, if one is known.
pub fn known_image(slug: &str) -> Option<&'static str> {
    KNOWN_PROGRAM_IMAGES
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, url)| *url)
}
