//! Small helpers: output naming and file system validation.

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Feed file name for a program slug: hyphens become underscores, suffixed
/// `_feed.xml`.
pub fn feed_filename(slug: &str) -> String {
    format!("{}_feed.xml", slug.replace('-', "_"))
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then performs a write test by creating
/// and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_filename() {
        assert_eq!(feed_filename("loose-joints"), "loose_joints_feed.xml");
        assert_eq!(
            feed_filename("wildcard-with-stuart-coupe"),
            "wildcard_with_stuart_coupe_feed.xml"
        );
        assert_eq!(feed_filename("utilityfog"), "utilityfog_feed.xml");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates() {
        let dir = std::env::temp_dir().join("fbi_radio_feeds_probe_test");
        let path = dir.to_str().unwrap().to_string();
        assert!(ensure_writable_dir(&path).await.is_ok());
        let _ = stdfs::remove_dir_all(&dir);
    }
}
