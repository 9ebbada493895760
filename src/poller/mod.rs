use std::sync::Arc;

use chrono::{DateTime, Utc};
use feed_rs::parser;

use crate::app::{EstuaryError, Result};
use crate::domain::{Enclosure, EntryLink, Generator, RawEntry, TransformedEntry};
use crate::fetcher::Fetcher;
use crate::media::MediaExtractor;
use crate::transformer;

/// Polls one feed and yields its new entries oldest-first.
pub struct Poller {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    media: MediaExtractor,
}

impl Poller {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, media: MediaExtractor) -> Self {
        Self { fetcher, media }
    }

    /// Fetch and parse the feed, keep entries strictly newer than the
    /// watermark, and order them by ascending update time.
    ///
    /// The returned stream transforms entries one at a time; re-polling
    /// always restarts from a full re-fetch. Entries without a parseable
    /// update time cannot be ordered or watermarked and are dropped with a
    /// warning.
    pub async fn poll(
        &self,
        feed_url: &str,
        watermark: Option<DateTime<Utc>>,
        include_images: bool,
        generator_hint: Option<Generator>,
    ) -> Result<EntryStream> {
        let body = self.fetcher.fetch(feed_url).await?;
        let feed =
            parser::parse(&body[..]).map_err(|e| EstuaryError::FeedParse(e.to_string()))?;

        let generator = generator_hint.or_else(|| Generator::detect(feed.generator.as_ref()));

        let mut entries: Vec<RawEntry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let id = entry.id.clone();
                raw_entry(entry).or_else(|| {
                    tracing::warn!("dropping entry {} without parseable update time", id);
                    None
                })
            })
            .collect();
        if let Some(watermark) = watermark {
            entries.retain(|e| e.updated > watermark);
        }
        entries.sort_by_key(|e| e.updated);

        let total = entries.len();
        Ok(EntryStream {
            entries: entries.into_iter(),
            total,
            generator,
            include_images,
            media: self.media.clone(),
        })
    }
}

/// Lazy sequence of transformed entries from one poll.
///
/// Finite and forward-only; there is no resumable cursor, a fresh poll
/// restarts from scratch.
pub struct EntryStream {
    entries: std::vec::IntoIter<RawEntry>,
    total: usize,
    generator: Option<Generator>,
    include_images: bool,
    media: MediaExtractor,
}

impl EntryStream {
    /// Total new entries this poll, for caller bookkeeping.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn generator(&self) -> Option<Generator> {
        self.generator
    }

    /// Transform and yield the next entry, oldest first.
    pub async fn next_entry(&mut self) -> Option<TransformedEntry> {
        let raw = self.entries.next()?;
        Some(transformer::transform(raw, self.include_images, self.generator, &self.media).await)
    }
}

fn raw_entry(entry: feed_rs::model::Entry) -> Option<RawEntry> {
    let updated = entry.updated.or(entry.published)?;
    let links: Vec<EntryLink> = entry
        .links
        .iter()
        .map(|l| EntryLink {
            href: l.href.clone(),
            rel: l.rel.clone(),
            media_type: l.media_type.clone(),
        })
        .collect();
    let enclosures: Vec<Enclosure> = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|c| {
            let href = c.url.as_ref()?.to_string();
            let media_type = c
                .content_type
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_default();
            Some(Enclosure { href, media_type })
        })
        .collect();

    Some(RawEntry {
        id: entry.id,
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        summary: entry.summary.map(|t| t.content).unwrap_or_default(),
        content: entry.content.and_then(|c| c.body).into_iter().collect(),
        tags: entry.categories.into_iter().map(|c| c.term).collect(),
        enclosures,
        link: links.first().map(|l| l.href.clone()).unwrap_or_default(),
        links,
        updated,
    })
}
