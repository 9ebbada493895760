use crate::domain::{Generator, RawEntry, TransformedEntry};
use crate::media::MediaExtractor;
use crate::normalizer;

/// Turn one raw feed entry into a postable record.
///
/// Title, summary and the first content fragment go through the normalizer;
/// hashtags are derived from the tag terms exactly once; the canonical URL
/// is the entry id unless a platform-specific link selection applies. Media
/// is fetched only when `include_images` is on.
pub async fn transform(
    entry: RawEntry,
    include_images: bool,
    generator: Option<Generator>,
    media: &MediaExtractor,
) -> TransformedEntry {
    let images = if include_images {
        media.extract(&entry, generator).await
    } else {
        Vec::new()
    };

    let content = entry
        .content
        .first()
        .map(|fragment| normalizer::clean(fragment))
        .unwrap_or_default();

    TransformedEntry {
        url: canonical_url(&entry, generator),
        link: entry.link,
        title: normalizer::clean(&entry.title),
        summary: normalizer::clean(&entry.summary),
        content,
        hashtags: hashtags(&entry.tags),
        updated: entry.updated,
        images,
        generator,
    }
}

/// Space-joined `#hashtags`: spaces become underscores, periods and hyphens
/// are dropped, feed order is kept.
fn hashtags(tags: &[String]) -> String {
    tags.iter()
        .map(|term| {
            let cleaned = term.replace(' ', "_").replace(['.', '-'], "");
            format!("#{}", cleaned)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The entry's declared id, except on Wordpress feeds where the id is not a
/// usable permalink: prefer `rel="alternate"` links, narrowed to
/// `type="text/html"` when several exist.
fn canonical_url(entry: &RawEntry, generator: Option<Generator>) -> String {
    if generator != Some(Generator::Wordpress) {
        return entry.id.clone();
    }
    let mut links: Vec<_> = entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("alternate"))
        .collect();
    if links.len() > 1 {
        links = entry
            .links
            .iter()
            .filter(|l| l.media_type.as_deref() == Some("text/html"))
            .collect();
    }
    links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_else(|| entry.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryLink;
    use chrono::{TimeZone, Utc};

    fn entry() -> RawEntry {
        RawEntry {
            id: "https://example.com/?p=1".into(),
            title: "<b>Title</b>".into(),
            summary: "<p>Summary</p>".into(),
            content: Vec::new(),
            tags: Vec::new(),
            enclosures: Vec::new(),
            links: Vec::new(),
            link: "https://example.com/post".into(),
            updated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn extractor() -> MediaExtractor {
        MediaExtractor::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_cleans_title_summary_and_first_content() {
        let mut e = entry();
        e.content = vec!["<p>First</p>".into(), "<p>Second</p>".into()];
        let t = transform(e, false, None, &extractor()).await;
        assert_eq!(t.title, "Title");
        assert_eq!(t.summary, "Summary");
        assert_eq!(t.content, "First");
    }

    #[tokio::test]
    async fn test_empty_content_when_no_fragments() {
        let t = transform(entry(), false, None, &extractor()).await;
        assert_eq!(t.content, "");
    }

    #[tokio::test]
    async fn test_no_images_when_flag_off() {
        let mut e = entry();
        e.summary = r#"<img src="https://x.io/a.png">"#.into();
        let t = transform(e, false, None, &extractor()).await;
        assert!(t.images.is_empty());
    }

    #[test]
    fn test_hashtag_derivation() {
        let tags = vec![
            "rust lang".to_string(),
            "web-dev".to_string(),
            "v2.0".to_string(),
        ];
        assert_eq!(hashtags(&tags), "#rust_lang #webdev #v20");
    }

    #[test]
    fn test_hashtags_empty_without_tags() {
        assert_eq!(hashtags(&[]), "");
    }

    #[tokio::test]
    async fn test_hashtags_derived_once_on_wordpress() {
        let mut e = entry();
        e.tags = vec!["news".to_string()];
        let t = transform(e, false, Some(Generator::Wordpress), &extractor()).await;
        assert_eq!(t.hashtags, "#news");
    }

    #[test]
    fn test_canonical_url_defaults_to_id() {
        assert_eq!(canonical_url(&entry(), None), "https://example.com/?p=1");
    }

    #[test]
    fn test_wordpress_prefers_single_alternate_link() {
        let mut e = entry();
        e.links = vec![EntryLink {
            href: "https://example.com/post".into(),
            rel: Some("alternate".into()),
            media_type: None,
        }];
        assert_eq!(
            canonical_url(&e, Some(Generator::Wordpress)),
            "https://example.com/post"
        );
    }

    #[test]
    fn test_wordpress_narrows_multiple_alternates_by_type() {
        let mut e = entry();
        e.links = vec![
            EntryLink {
                href: "https://example.com/post.json".into(),
                rel: Some("alternate".into()),
                media_type: Some("application/json".into()),
            },
            EntryLink {
                href: "https://example.com/post".into(),
                rel: Some("alternate".into()),
                media_type: Some("text/html".into()),
            },
        ];
        assert_eq!(
            canonical_url(&e, Some(Generator::Wordpress)),
            "https://example.com/post"
        );
    }

    #[test]
    fn test_wordpress_falls_back_to_id_without_alternates() {
        assert_eq!(
            canonical_url(&entry(), Some(Generator::Wordpress)),
            "https://example.com/?p=1"
        );
    }
}
