//! Heuristic extraction of episode and audio metadata from page markup.
//!
//! FBi Radio pages are server-rendered by a Nuxt application; the useful
//! metadata lives in an inline state blob with no stable schema, so every
//! extractor here is a layered set of fallbacks rather than a single parse:
//!
//! 1. **Structured data** ([`structured`]): isolate and parse the state blob,
//!    falling back to JSON-LD script tags.
//! 2. **Episode discovery** ([`episodes`]): recursive duck-typed search for
//!    episode-shaped objects, with an anchor-tag fallback when no structured
//!    data is recoverable.
//! 3. **Audio locator** ([`audio`]): direct CDN URL match first, then
//!    best-effort reconstruction of the org/show/clip UUID triad.
//! 4. **Cover image** ([`image`]): override table, structured-data program
//!    node, then raw-markup size-variant scan.
//! 5. **Dates** ([`dates`]): `airedAt` ISO parsing, ordinal dates embedded in
//!    URL slugs, current time as a logged placeholder.
//!
//! Every function in this tree is pure over page text / parsed JSON; the
//! network-dependent parts of the fallback chains live in [`crate::scrape`].

pub mod audio;
pub mod dates;
pub mod episodes;
pub mod image;
pub mod structured;
