use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};

use crate::app::Result;
use crate::domain::{Generator, RawEntry};
use crate::MAX_IMAGES;

static LINK_OR_IMG: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href], img[src]").expect("valid selector"));

/// An open, fetched attachment candidate.
///
/// Owns the HTTP response until it is either uploaded (consumed via
/// [`into_bytes`](MediaHandle::into_bytes)) or dropped; dropping releases the
/// connection, so every exit path releases the resource exactly once.
#[derive(Debug)]
pub struct MediaHandle {
    url: String,
    content_type: String,
    response: reqwest::Response,
}

impl MediaHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Read the full body, consuming the handle.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        Ok(self.response.bytes().await?.to_vec())
    }
}

/// Fetches attachment candidates over the shared HTTP transport.
#[derive(Clone)]
pub struct MediaExtractor {
    client: reqwest::Client,
}

impl MediaExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Collect and fetch an entry's attachments, capped at [`MAX_IMAGES`].
    ///
    /// Transport failures for single candidates are skipped; only responses
    /// whose content type starts with `image/` or `video/` are kept.
    pub async fn extract(&self, entry: &RawEntry, generator: Option<Generator>) -> Vec<MediaHandle> {
        self.resolve(collect_candidates(entry, generator)).await
    }

    async fn resolve(&self, candidates: Vec<String>) -> Vec<MediaHandle> {
        let mut handles = Vec::new();
        for url in candidates {
            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("skipping media candidate {}: {}", url, e);
                    continue;
                }
            };
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if is_attachable(&content_type) {
                handles.push(MediaHandle {
                    url,
                    content_type,
                    response,
                });
                if handles.len() >= MAX_IMAGES {
                    break;
                }
            }
        }
        handles
    }
}

/// Collect candidate attachment URLs from an entry, in document order.
///
/// Sources, in order: `<a href>`/`<img src>` values from the summary HTML,
/// then from each content fragment, then enclosures and `rel="enclosure"`
/// links declaring an image or video type. Duplicates keep their first-seen
/// position. Wordpress feeds get plugin assets dropped and non-ASCII URL
/// bytes percent-escaped (the platform emits them raw, which breaks the
/// subsequent request).
pub fn collect_candidates(entry: &RawEntry, generator: Option<Generator>) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    html_urls(&entry.summary, &mut urls);
    for fragment in &entry.content {
        html_urls(fragment, &mut urls);
    }

    let enclosure_links = entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| {
            (
                l.href.as_str(),
                l.media_type.as_deref().unwrap_or_default(),
            )
        });
    let enclosures = entry
        .enclosures
        .iter()
        .map(|e| (e.href.as_str(), e.media_type.as_str()))
        .chain(enclosure_links);
    for (href, media_type) in enclosures {
        if (media_type.starts_with("image/") || media_type.starts_with("video/"))
            && !urls.iter().any(|u| u == href)
        {
            urls.push(href.to_string());
        }
    }

    if generator == Some(Generator::Wordpress) {
        urls.retain(|u| !u.contains("/wp-content/plugins/"));
        urls = urls.iter().map(|u| escape_non_ascii(u)).collect();
    }
    urls
}

fn html_urls(fragment: &str, urls: &mut Vec<String>) {
    if fragment.is_empty() {
        return;
    }
    let html = Html::parse_fragment(fragment);
    for element in html.select(&LINK_OR_IMG) {
        let url = if element.value().name() == "a" {
            element.value().attr("href")
        } else {
            element.value().attr("src")
        };
        if let Some(url) = url {
            if !url.is_empty() && !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
    }
}

/// Only image and video resources qualify as attachments.
fn is_attachable(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type.starts_with("video/")
}

/// Percent-escape every non-ASCII byte of a URL as `%XX`.
pub(crate) fn escape_non_ascii(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for byte in url.bytes() {
        if byte.is_ascii() {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Enclosure, EntryLink};
    use chrono::{TimeZone, Utc};

    fn entry() -> RawEntry {
        RawEntry {
            id: "id".into(),
            title: "t".into(),
            summary: String::new(),
            content: Vec::new(),
            tags: Vec::new(),
            enclosures: Vec::new(),
            links: Vec::new(),
            link: "https://example.com/post".into(),
            updated: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_collects_summary_before_content() {
        let mut e = entry();
        e.summary = r#"<a href="https://x.io/a">a</a>"#.into();
        e.content = vec![r#"<img src="https://x.io/b.png">"#.into()];
        assert_eq!(
            collect_candidates(&e, None),
            vec!["https://x.io/a", "https://x.io/b.png"]
        );
    }

    #[test]
    fn test_document_order_within_fragment() {
        let mut e = entry();
        e.summary = r#"<p><img src="https://x.io/1.png"> then <a href="https://x.io/2">l</a></p>"#
            .into();
        assert_eq!(
            collect_candidates(&e, None),
            vec!["https://x.io/1.png", "https://x.io/2"]
        );
    }

    #[test]
    fn test_deduplicates_preserving_first_seen() {
        let mut e = entry();
        e.summary = r#"<a href="https://x.io/a">a</a><img src="https://x.io/a">"#.into();
        e.content = vec![r#"<a href="https://x.io/a">again</a>"#.into()];
        assert_eq!(collect_candidates(&e, None), vec!["https://x.io/a"]);
    }

    #[test]
    fn test_enclosures_filtered_by_type() {
        let mut e = entry();
        e.enclosures = vec![
            Enclosure {
                href: "https://x.io/img.jpg".into(),
                media_type: "image/jpeg".into(),
            },
            Enclosure {
                href: "https://x.io/doc.pdf".into(),
                media_type: "application/pdf".into(),
            },
            Enclosure {
                href: "https://x.io/clip.mp4".into(),
                media_type: "video/mp4".into(),
            },
        ];
        assert_eq!(
            collect_candidates(&e, None),
            vec!["https://x.io/img.jpg", "https://x.io/clip.mp4"]
        );
    }

    #[test]
    fn test_enclosure_rel_links_included() {
        let mut e = entry();
        e.links = vec![
            EntryLink {
                href: "https://x.io/pic.png".into(),
                rel: Some("enclosure".into()),
                media_type: Some("image/png".into()),
            },
            EntryLink {
                href: "https://x.io/page".into(),
                rel: Some("alternate".into()),
                media_type: Some("text/html".into()),
            },
        ];
        assert_eq!(collect_candidates(&e, None), vec!["https://x.io/pic.png"]);
    }

    #[test]
    fn test_wordpress_drops_plugin_assets() {
        let mut e = entry();
        e.summary = concat!(
            r#"<img src="https://x.io/wp-content/plugins/foo/icon.png">"#,
            r#"<img src="https://x.io/wp-content/uploads/pic.png">"#
        )
        .into();
        assert_eq!(
            collect_candidates(&e, Some(Generator::Wordpress)),
            vec!["https://x.io/wp-content/uploads/pic.png"]
        );
    }

    #[test]
    fn test_wordpress_escapes_non_ascii() {
        let mut e = entry();
        e.summary = r#"<img src="https://x.io/über.png">"#.into();
        assert_eq!(
            collect_candidates(&e, Some(Generator::Wordpress)),
            vec!["https://x.io/%C3%BCber.png"]
        );
    }

    #[test]
    fn test_non_wordpress_urls_untouched() {
        let mut e = entry();
        e.summary = r#"<img src="https://x.io/über.png">"#.into();
        assert_eq!(
            collect_candidates(&e, None),
            vec!["https://x.io/über.png"]
        );
    }

    #[test]
    fn test_attachable_content_types() {
        assert!(is_attachable("image/png"));
        assert!(is_attachable("video/mp4"));
        assert!(!is_attachable("text/html"));
        assert!(!is_attachable("application/pdf"));
        assert!(!is_attachable(""));
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape_non_ascii("abc"), "abc");
        assert_eq!(escape_non_ascii("ü"), "%C3%BC");
        assert_eq!(escape_non_ascii("a%20b"), "a%20b");
    }
}
