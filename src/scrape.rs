//! Per-program scraping context and pipeline.
//!
//! One [`ProgramScraper`] is created per program and discarded afterwards;
//! the show-ID cache is an explicit field on it, scoped to a single run
//! against a single program, never shared. All requests are issued strictly
//! sequentially: each episode page is fetched one at a time, and the
//! structured-data path may fetch the program page a second time to resolve
//! a show ID.

use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::extract::{audio, dates, episodes, image, structured};
use crate::fetch::fetch_page;
use crate::models::{sort_newest_first, EpisodeRecord, ProgramIdentity};

/// Everything scraped for one program.
pub struct ProgramScrape {
    /// Episodes, newest first.
    pub episodes: Vec<EpisodeRecord>,
    /// Display name from the page `<h1>`, or the configured name.
    pub display_name: String,
    /// Resolved cover image, if any.
    pub cover_image: Option<String>,
}

/// Scraping context for a single program.
pub struct ProgramScraper {
    client: Client,
    pub identity: ProgramIdentity,
    /// Show ID resolved once per run; it does not vary per episode.
    show_id: Option<String>,
}

impl ProgramScraper {
    pub fn new(client: Client, identity: ProgramIdentity) -> Self {
        ProgramScraper {
            client,
            identity,
            show_id: None,
        }
    }

    /// Scrape the program page and every episode, sequentially.
    #[instrument(level = "info", skip_all, fields(program = %self.identity.slug))]
    pub async fn collect(&mut self) -> ProgramScrape {
        let Some(html) = fetch_page(&self.client, &self.identity.url).await else {
            return ProgramScrape {
                episodes: Vec::new(),
                display_name: self.identity.name.clone(),
                cover_image: None,
            };
        };

        let display_name = page_heading(&html).unwrap_or_else(|| self.identity.name.clone());
        let data = structured::structured_data(&html);
        let cover_image = image::cover_image(&self.identity, &html, data.as_ref());

        let candidates = data
            .as_ref()
            .map(|data| episodes::collect_candidates(data, &self.identity))
            .unwrap_or_default();

        let mut records = if candidates.is_empty() {
            info!("No structured episodes; falling back to anchor scan");
            self.collect_from_links(&html).await
        } else {
            info!(count = candidates.len(), "Episodes discovered in structured data");
            self.resolve_candidates(candidates).await
        };

        sort_newest_first(&mut records);
        ProgramScrape {
            episodes: records,
            display_name,
            cover_image,
        }
    }

    /// Turn structured-data candidates into full records, one page at a time.
    async fn resolve_candidates(
        &mut self,
        candidates: Vec<episodes::EpisodeCandidate>,
    ) -> Vec<EpisodeRecord> {
        let mut records = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let published = self.resolve_date(candidate.aired_at.as_deref(), &candidate.url);
            let description = episodes::parse_description(candidate.description.as_ref());

            let audio_url = match fetch_page(&self.client, &candidate.url).await {
                Some(page) => self.resolve_audio_url(&page).await,
                None => None,
            };

            records.push(EpisodeRecord {
                title: candidate.title,
                url: candidate.url,
                published: Some(published),
                description,
                audio_url,
            });
        }
        records
    }

    /// Anchor-scan fallback for pages without a usable state blob.
    ///
    /// Each linked episode page gets one more chance at structured
    /// extraction before the bare-HTML path (heading, slug date, inline
    /// audio URL) applies.
    async fn collect_from_links(&mut self, html: &str) -> Vec<EpisodeRecord> {
        let links = episodes::episode_links(html, &self.identity.slug);
        info!(count = links.len(), "Episode links found in markup");

        // Sequential by construction: one request in flight at a time.
        let pages: Vec<(String, Option<String>)> = stream::iter(links)
            .then(|link| {
                let client = self.client.clone();
                async move {
                    let page = fetch_page(&client, &link).await;
                    (link, page)
                }
            })
            .collect()
            .await;

        let mut records = Vec::new();
        for (link, page) in pages {
            let Some(page) = page else {
                continue;
            };

            if let Some(data) = structured::structured_data(&page) {
                let found = episodes::collect_candidates(&data, &self.identity);
                if !found.is_empty() {
                    records.extend(self.resolve_candidates(found).await);
                    continue;
                }
            }

            let title = page_heading(&page).unwrap_or_else(|| "Untitled Episode".to_string());
            let published = self.resolve_date(None, &link);
            let audio_url = self.resolve_audio_url(&page).await;

            records.push(EpisodeRecord {
                title,
                url: link,
                published: Some(published),
                description: String::new(),
                audio_url,
            });
        }
        records
    }

    /// Date fallback chain: `airedAt`, then the URL slug, then now.
    fn resolve_date(
        &self,
        aired_at: Option<&str>,
        url: &str,
    ) -> chrono::DateTime<chrono::Utc> {
        if let Some(dt) = aired_at.and_then(dates::parse_aired_at) {
            return dt;
        }
        if let Some(dt) = dates::parse_ordinal_date(url) {
            return dt;
        }
        warn!(%url, "No publish date resolvable; using current time as placeholder");
        chrono::Utc::now()
    }

    /// Resolve the audio URL for one episode page.
    ///
    /// Tier 1 is a verbatim CDN URL in the page; tier 2 reconstructs the
    /// org/show/clip triad from UUID tokens. The winning tier is logged for
    /// regression triage when the site's markup changes.
    pub async fn resolve_audio_url(&mut self, episode_html: &str) -> Option<String> {
        if let Some(url) = audio::direct_cdn_url(episode_html) {
            debug!(tier = "direct-url", "Audio URL resolved");
            return Some(url);
        }

        let org = audio::org_id(episode_html);
        let mut exclude = vec![org.clone()];
        if let Some(build) = audio::build_id(episode_html) {
            exclude.push(build);
        }
        let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
        let uuids = audio::page_uuids(episode_html, &exclude);
        if uuids.is_empty() {
            debug!("No UUID candidates on episode page; no audio");
            return None;
        }

        let show_id = self.resolve_show_id(episode_html, &uuids, &org).await;
        let locator = audio::assemble_locator(&org, show_id.as_deref(), &uuids)?;
        debug!(
            tier = "reconstruction",
            show_id = %locator.show_id,
            clip_id = %locator.clip_id,
            "Audio URL reconstructed"
        );
        Some(locator.audio_url())
    }

    /// Ordered show-ID strategies: cache, override table, clip reference in
    /// structured data, then a secondary fetch of the program page.
    async fn resolve_show_id(
        &mut self,
        episode_html: &str,
        episode_uuids: &[String],
        org: &str,
    ) -> Option<String> {
        if let Some(cached) = &self.show_id {
            debug!(strategy = "cache", "Show ID resolved");
            return Some(cached.clone());
        }

        if let Some(known) = &self.identity.known_show_id {
            debug!(strategy = "override-table", "Show ID resolved");
            self.show_id = Some(known.clone());
            return self.show_id.clone();
        }

        if let Some(data) = structured::structured_data(episode_html) {
            if let Some(clip) = episodes::find_first_key(&data, "omnyStudioClip") {
                let serialized = clip.to_string();
                if let Some(show) = audio::clip_reference_show_id(&serialized) {
                    debug!(strategy = "clip-reference", "Show ID resolved");
                    self.show_id = Some(show);
                    return self.show_id.clone();
                }
            }
        }

        if let Some(show) = self.show_id_from_program_page(episode_uuids, org).await {
            debug!(strategy = "program-page", "Show ID resolved");
            self.show_id = Some(show);
            return self.show_id.clone();
        }

        debug!("Show ID unresolved for this program");
        None
    }

    /// Mine the program page for the show ID.
    ///
    /// An explicit inline config match wins; otherwise the show ID is taken
    /// to be a UUID present on the program page but absent from the episode
    /// page. When no such token exists the show stays unresolved and triad
    /// assembly drops to its ordering-based guess.
    async fn show_id_from_program_page(
        &self,
        episode_uuids: &[String],
        org: &str,
    ) -> Option<String> {
        let html = fetch_page(&self.client, &self.identity.url).await?;

        if let Some(show) = audio::config_show_id(&html) {
            return Some(show);
        }

        let program_uuids = audio::page_uuids(&html, &[org]);
        audio::program_page_show_id(&program_uuids, episode_uuids)
    }
}

/// First `<h1>` text on a page, falling back to the `<title>` element.
fn page_heading(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector in ["h1", "title"] {
        let selector = Selector::parse(selector).unwrap();
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scraper_for(slug: &str) -> ProgramScraper {
        let client = crate::fetch::build_client(Duration::from_secs(5)).unwrap();
        ProgramScraper::new(client, ProgramIdentity::new(slug, "Test"))
    }

    #[test]
    fn test_page_heading_prefers_h1() {
        let html = "<html><head><title>Tab Title</title></head><body><h1> Loose Joints </h1></body></html>";
        assert_eq!(page_heading(html), Some("Loose Joints".to_string()));
    }

    #[test]
    fn test_page_heading_title_fallback() {
        let html = "<html><head><title>Tab Title</title></head><body></body></html>";
        assert_eq!(page_heading(html), Some("Tab Title".to_string()));
    }

    #[tokio::test]
    async fn test_override_show_id_bypasses_heuristics() {
        // The page carries a UUID the heuristics would otherwise latch onto;
        // the override table entry must win.
        let mut scraper = scraper_for("utility-fog");
        let wrong = "99999999-9999-4999-8999-999999999999".to_string();
        let html = format!("<html>{wrong}</html>");
        let resolved = scraper
            .resolve_show_id(&html, &[wrong.clone()], crate::programs::DEFAULT_ORG_ID)
            .await;
        assert_eq!(
            resolved.as_deref(),
            Some("1e142c09-9e63-4d2e-8ce7-a00df26cf834")
        );
    }

    #[tokio::test]
    async fn test_show_id_cached_for_run() {
        let mut scraper = scraper_for("utility-fog");
        let first = scraper.resolve_show_id("<html></html>", &[], "org").await;
        // Second resolution hits the cache even with a page that names nothing.
        let second = scraper.resolve_show_id("", &[], "org").await;
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn test_clip_reference_strategy() {
        let mut scraper = scraper_for("brand-new-show");
        let html = concat!(
            r#"<script>window.__NUXT__ = {"episode":{"omnyStudioClip":"#,
            r#"{"uuid":"0b239285-ff32-4160-aad8-b38800644870","showId":"85ea9d91-cb57-46c4-a9c6-abe601048b69"}}};</script>"#,
        );
        let resolved = scraper.resolve_show_id(html, &[], "org").await;
        assert_eq!(
            resolved.as_deref(),
            Some("85ea9d91-cb57-46c4-a9c6-abe601048b69")
        );
    }

    #[tokio::test]
    async fn test_direct_url_tier_short_circuits() {
        let mut scraper = scraper_for("brand-new-show");
        let url = "https://traffic.omny.fm/d/clips/02b00798-16d7-4067-89ac-aba000ffd8cb/85ea9d91-cb57-46c4-a9c6-abe601048b69/0b239285-ff32-4160-aad8-b38800644870/audio.mp3";
        let html = format!(r#"<audio src="{url}"></audio>"#);
        assert_eq!(scraper.resolve_audio_url(&html).await.as_deref(), Some(url));
    }

    #[tokio::test]
    async fn test_reconstruction_with_override_show() {
        let mut scraper = scraper_for("jack-off");
        let clip = "0b239285-ff32-4160-aad8-b38800644870";
        let build = "11111111-2222-3333-4444-555555555555";
        let html = format!(
            r#"<script>buildId: "{build}"</script><div data-clip="{clip}"></div>"#
        );
        let resolved = scraper.resolve_audio_url(&html).await.unwrap();
        assert_eq!(
            resolved,
            format!(
                "https://traffic.omny.fm/d/clips/{}/{}/{}/audio.mp3",
                crate::programs::DEFAULT_ORG_ID,
                "85ea9d91-cb57-46c4-a9c6-abe601048b69",
                clip
            )
        );
    }

    #[test]
    fn test_undateable_episode_gets_current_time_placeholder() {
        let scraper = scraper_for("brand-new-show");
        let before = chrono::Utc::now();
        let resolved = scraper.resolve_date(
            None,
            "https://www.fbi.radio/programs/brand-new-show/episodes/season-opener",
        );
        let after = chrono::Utc::now();
        assert!(resolved >= before && resolved <= after);
    }

    #[test]
    fn test_resolve_date_prefers_aired_at_over_slug() {
        let scraper = scraper_for("brand-new-show");
        let resolved = scraper.resolve_date(
            Some("2025-10-20T09:00:00.000Z"),
            "https://www.fbi.radio/programs/brand-new-show/episodes/ep-28th-october-2025",
        );
        assert_eq!(resolved.to_rfc3339(), "2025-10-20T09:00:00+00:00");
    }

    #[tokio::test]
    async fn test_no_uuids_means_no_audio() {
        let mut scraper = scraper_for("jack-off");
        assert!(scraper.resolve_audio_url("<html>plain page</html>").await.is_none());
    }
}
