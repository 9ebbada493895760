use chrono::{DateTime, Utc};

use crate::app::{AppContext, Result};
use crate::poller::Poller;
use crate::status::Template;
use crate::MAX_LENGTH;

/// Outcome of one run, for logging and tests.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// New entries seen across all feeds.
    pub entries: usize,
    pub posted: usize,
    pub failed: usize,
    /// The watermark after this run.
    pub watermark: Option<DateTime<Utc>>,
}

/// Process every configured feed once.
///
/// Feeds are handled strictly one after another and entries within a feed in
/// ascending time order, so the posted timeline matches the feed's. A feed
/// that fails to fetch is skipped; a failed post is logged and processing
/// continues with the next entry. The watermark advances over entries whose
/// post succeeded (all of them in dry-run) and the config is rewritten only
/// on non-dry runs.
pub async fn run(ctx: &AppContext, dry_run: bool) -> Result<RunSummary> {
    let poller = Poller::new(ctx.fetcher.clone(), ctx.media_extractor());
    let watermark = ctx.config.updated;
    let mut newest = watermark;
    let mut summary = RunSummary::default();

    for feed in &ctx.config.feeds {
        let template = Template::parse(&feed.template)?;
        let mut stream = match poller
            .poll(&feed.url, watermark, ctx.config.include_images, feed.generator)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("failed to poll {}: {}", feed.url, e);
                continue;
            }
        };
        tracing::info!("{} new entries from {}", stream.len(), feed.url);

        while let Some(mut entry) = stream.next_entry().await {
            summary.entries += 1;
            tracing::debug!("entry: {:?}", entry.url);

            let mut media_refs = Vec::new();
            // In a trial run the posting client is never called; dropping
            // the handles releases their connections.
            let images = std::mem::take(&mut entry.images);
            if !dry_run {
                for handle in images {
                    match ctx.poster.upload_media(handle).await {
                        Ok(media_ref) => media_refs.push(media_ref),
                        Err(e) => tracing::warn!("media upload failed: {}", e),
                    }
                }
            }

            let status = template.render_bounded(&entry, MAX_LENGTH);
            tracing::debug!("status: {:?}", status);

            if dry_run {
                let title: String = entry.title.chars().take(50).collect();
                tracing::info!("trial run, not posting {:?}", title);
                newest = advance(newest, entry.updated);
                continue;
            }

            tracing::info!("posting {:?} with {} attachments", entry.url, media_refs.len());
            match ctx.poster.post_status(&status, &media_refs).await {
                Ok(()) => {
                    summary.posted += 1;
                    newest = advance(newest, entry.updated);
                }
                Err(e) => {
                    // The entry's timestamp does not advance the watermark,
                    // so it is retried next run unless a later entry from
                    // the same feed posts successfully.
                    summary.failed += 1;
                    tracing::error!("posting {} failed: {}", entry.url, e);
                }
            }
        }
    }

    summary.watermark = newest;
    if dry_run {
        tracing::info!("trial run, not saving the config");
    } else if newest != ctx.config.updated {
        let mut config = ctx.config.clone();
        config.updated = newest;
        config.save(&ctx.config_path)?;
        tracing::debug!("saved config {}", ctx.config_path.display());
    }
    Ok(summary)
}

/// The watermark only ever moves forward.
fn advance(current: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match current {
        Some(current) => Some(current.max(candidate)),
        None => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::app::context::build_client;
    use crate::app::EstuaryError;
    use crate::config::{Config, FeedConfig};
    use crate::fetcher::Fetcher;
    use crate::media::MediaHandle;
    use crate::poster::{MediaRef, Poster};

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Test Feed</title>
  <entry>
    <title>Second</title>
    <link href="https://example.com/2"/>
    <id>https://example.com/2</id>
    <updated>2024-01-02T00:00:00Z</updated>
  </entry>
  <entry>
    <title>First</title>
    <link href="https://example.com/1"/>
    <id>https://example.com/1</id>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

    struct FakeFetcher(&'static str);

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    struct RecordingPoster {
        statuses: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingPoster {
        fn new(fail: bool) -> Self {
            Self {
                statuses: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Poster for RecordingPoster {
        async fn upload_media(&self, _handle: MediaHandle) -> Result<MediaRef> {
            Ok(MediaRef("1".into()))
        }

        async fn post_status(&self, text: &str, _media: &[MediaRef]) -> Result<()> {
            if self.fail {
                return Err(EstuaryError::Api("boom".into()));
            }
            self.statuses.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn context(
        config_path: PathBuf,
        poster: Arc<RecordingPoster>,
        updated: Option<DateTime<Utc>>,
    ) -> AppContext {
        let client = build_client();
        AppContext {
            config: Config {
                url: "https://masto.example".into(),
                client_id: "ci".into(),
                client_secret: "cs".into(),
                access_token: "at".into(),
                include_images: false,
                updated,
                feeds: vec![FeedConfig {
                    url: "https://example.com/feed.xml".into(),
                    template: "{title} {url}".into(),
                    generator: None,
                }],
            },
            config_path,
            client,
            fetcher: Arc::new(FakeFetcher(ATOM_SAMPLE)),
            poster,
        }
    }

    #[test]
    fn test_advance_never_decreases() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(advance(None, t1), Some(t1));
        assert_eq!(advance(Some(t2), t1), Some(t2));
        assert_eq!(advance(Some(t1), t2), Some(t2));
    }

    #[tokio::test]
    async fn test_posts_in_chronological_order_and_saves_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let poster = Arc::new(RecordingPoster::new(false));
        let ctx = context(config_path.clone(), poster.clone(), None);

        let summary = run(&ctx, false).await.unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.posted, 2);
        assert_eq!(summary.failed, 0);
        let statuses = poster.statuses.lock().unwrap();
        assert_eq!(
            *statuses,
            vec![
                "First https://example.com/1".to_string(),
                "Second https://example.com/2".to_string(),
            ]
        );

        let saved = Config::load(&config_path).unwrap();
        assert_eq!(
            saved.updated,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_second_run_posts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let poster = Arc::new(RecordingPoster::new(false));
        let ctx = context(config_path.clone(), poster.clone(), None);
        let first = run(&ctx, false).await.unwrap();

        let ctx = context(config_path, poster.clone(), first.watermark);
        let second = run(&ctx, false).await.unwrap();

        assert_eq!(second.entries, 0);
        assert_eq!(poster.statuses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_posts_do_not_advance_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let poster = Arc::new(RecordingPoster::new(true));
        let ctx = context(config_path.clone(), poster, None);

        let summary = run(&ctx, false).await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.posted, 0);
        assert_eq!(summary.watermark, None);
        // Nothing advanced, so nothing was saved.
        assert!(!config_path.exists());
    }

    #[tokio::test]
    async fn test_dry_run_posts_and_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let poster = Arc::new(RecordingPoster::new(false));
        let ctx = context(config_path.clone(), poster.clone(), None);

        let summary = run(&ctx, true).await.unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.posted, 0);
        assert!(poster.statuses.lock().unwrap().is_empty());
        assert!(!config_path.exists());
        // The watermark still reflects what would have been advanced.
        assert_eq!(
            summary.watermark,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }
}
