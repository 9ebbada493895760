//! # Estuary
//!
//! Watches RSS/Atom feeds and republishes new entries as Mastodon statuses.
//!
//! ## Architecture
//!
//! Estuary follows a modular pipeline architecture:
//!
//! ```text
//! Poller → Transformer → (Normalizer, Media) → Status → Poster
//! ```
//!
//! - [`poller`]: fetches a feed, filters entries against the watermark and
//!   yields them oldest-first
//! - [`transformer`]: turns one raw entry into a postable record
//! - [`normalizer`]: strips HTML fragments down to clean plain text
//! - [`media`]: collects and fetches image/video attachment candidates
//! - [`status`]: renders a templated status bounded to [`MAX_LENGTH`]
//! - [`poster`]: the Mastodon API client (media upload + status post)
//!
//! ## Quick Start
//!
//! ```bash
//! # First run launches the interactive setup and writes the config
//! estuary
//!
//! # Trial run: fetch and render, but don't post or save
//! estuary --dry-run -vv
//! ```
//!
//! On every run, entries newer than the stored watermark are posted in
//! chronological order, then the watermark is advanced and the config saved.

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, HTTP client, fetcher, poster.
pub mod app;

/// Command-line interface using clap.
///
/// Flags only, cron-friendly: `--dry-run`, `-v/-vv`, `--config <path>`.
pub mod cli;

/// Configuration load/save.
///
/// Stored at `~/.config/estuary/config.toml`: instance URL, API credentials,
/// the watermark timestamp, the image flag, and the feed list. Saves are
/// staged to a temporary file and renamed into place.
pub mod config;

/// Core domain models.
///
/// - [`RawEntry`](domain::RawEntry): one parsed feed item, unmodified
/// - [`TransformedEntry`](domain::TransformedEntry): the postable record
/// - [`Generator`](domain::Generator): detected publishing platform
pub mod domain;

/// HTTP feed fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Attachment candidate collection and fetching.
///
/// Scans entry HTML and enclosures for image/video URLs and resolves up to
/// [`MAX_IMAGES`] of them into open [`MediaHandle`](media::MediaHandle)s.
pub mod media;

/// HTML fragment cleanup.
///
/// Strips markup, drops "read more" boilerplate and collapses whitespace.
pub mod normalizer;

/// Feed polling.
///
/// Fetches and parses a feed, applies the watermark filter and yields
/// transformed entries in ascending time order.
pub mod poller;

/// Mastodon posting client.
///
/// - [`Poster`](poster::Poster): async trait for the outbound API
/// - [`MastodonPoster`](poster::mastodon::MastodonPoster): reqwest-based implementation
pub mod poster;

/// One-time interactive setup.
///
/// Obtains instance URL and credentials (registering an app if needed) and
/// writes the initial config file.
pub mod setup;

/// Status synthesis.
///
/// Renders an entry through a user template into a post no longer than
/// [`MAX_LENGTH`] characters, shortening only the content/summary fields.
pub mod status;

/// Entry transformation.
///
/// Cleans title/summary/content, derives hashtags, picks the canonical URL
/// and attaches media.
pub mod transformer;

/// Mastodon allows attaching 4 images max.
pub const MAX_IMAGES: usize = 4;

/// Hard character budget for one status.
pub const MAX_LENGTH: usize = 490;
