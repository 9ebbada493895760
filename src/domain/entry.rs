use chrono::{DateTime, Utc};

use crate::domain::Generator;
use crate::media::MediaHandle;

/// One link on a feed entry, with the attributes the pipeline cares about.
#[derive(Debug, Clone, Default)]
pub struct EntryLink {
    pub href: String,
    pub rel: Option<String>,
    pub media_type: Option<String>,
}

/// An enclosure (RSS `<enclosure>` or media object) attached to an entry.
#[derive(Debug, Clone)]
pub struct Enclosure {
    pub href: String,
    pub media_type: String,
}

/// One parsed feed item, unmodified.
///
/// Produced by the poller from the parsed feed document; read-only input to
/// the transformer. Entries whose update time cannot be parsed never make it
/// this far, so `updated` is always present.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Content blobs in feed order; the transformer uses the first one.
    pub content: Vec<String>,
    /// Tag/category terms in feed order.
    pub tags: Vec<String>,
    pub enclosures: Vec<Enclosure>,
    pub links: Vec<EntryLink>,
    /// The entry's primary link (first link in the feed document).
    pub link: String,
    pub updated: DateTime<Utc>,
}

/// The postable record derived from one [`RawEntry`].
///
/// Consumed once by the status synthesizer and the posting step; its media
/// handles are released (dropped or uploaded) regardless of outcome.
#[derive(Debug)]
pub struct TransformedEntry {
    /// Canonical URL (entry id, or a platform-specific alternate link).
    pub url: String,
    pub link: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    /// Space-joined `#hashtags` derived from the entry's tags.
    pub hashtags: String,
    pub updated: DateTime<Utc>,
    pub images: Vec<MediaHandle>,
    pub generator: Option<Generator>,
}
