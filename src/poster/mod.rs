pub mod mastodon;

use async_trait::async_trait;

pub use mastodon::MastodonPoster;

use crate::app::Result;
use crate::media::MediaHandle;

/// Server-side reference to an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef(pub String);

/// Outbound posting API.
///
/// A trait seam so the run loop can be exercised against a recording fake.
#[async_trait]
pub trait Poster: Send + Sync {
    /// Upload one attachment, consuming its handle.
    async fn upload_media(&self, handle: MediaHandle) -> Result<MediaRef>;

    /// Post one status with the given attachment references.
    async fn post_status(&self, text: &str, media: &[MediaRef]) -> Result<()>;
}
