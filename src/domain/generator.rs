use serde::{Deserialize, Serialize};

/// Publishing platform behind a feed, used to select platform-specific
/// extraction and encoding workarounds.
///
/// Either declared per feed in the config or detected from the feed's
/// generator metadata. Anything unrecognized stays `None` at the use sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    Wordpress,
}

impl Generator {
    /// Map feed-level generator metadata to a known platform.
    ///
    /// For RSS the generator tag holds a URL, while for Atom it holds the
    /// name, so both the content and the URI are inspected.
    pub fn detect(generator: Option<&feed_rs::model::Generator>) -> Option<Self> {
        let generator = generator?;
        let content = generator.content.as_str();
        let uri = generator.uri.as_deref().unwrap_or("");
        if content.contains("/wordpress.org/")
            || uri.contains("/wordpress.org/")
            || content.eq_ignore_ascii_case("wordpress")
        {
            return Some(Generator::Wordpress);
        }
        None
    }
}
