//! Status synthesis.
//!
//! A post template is a string with named placeholders (`{title}`, `{url}`,
//! ...) over the transformed entry's fields. Rendering is two-pass: if the
//! naive rendering overflows the length budget, only the `content` and
//! `summary` fields are shortened; the fixed parts of the template (title,
//! URL, hashtags, literal text) are never touched.

use thiserror::Error;

use crate::domain::TransformedEntry;

/// Stand-in for `\n` during word-boundary shortening, so embedded newlines
/// survive as breakable content instead of being collapsed away.
const NEWLINE_SENTINEL: char = '\u{00B6}';

/// Appended to a field when trailing words were dropped.
const TRUNCATION_MARKER: &str = "[...]";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("unmatched '{{' in template")]
    UnclosedPlaceholder,

    #[error("unmatched '}}' in template")]
    UnmatchedBrace,
}

/// An entry field a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Url,
    Link,
    Title,
    Summary,
    Content,
    Hashtags,
    Updated,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "url" => Some(Field::Url),
            "link" => Some(Field::Link),
            "title" => Some(Field::Title),
            "summary" => Some(Field::Summary),
            "content" => Some(Field::Content),
            "hashtags" => Some(Field::Hashtags),
            "updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed post template.
///
/// Parsing rejects unknown placeholders, so a bad template is a
/// configuration error caught at load time, not at render time.
/// `{{` and `}}` escape literal braces.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(TemplateError::UnclosedPlaceholder),
                        }
                    }
                    let field = Field::from_name(&name)
                        .ok_or(TemplateError::UnknownPlaceholder(name))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::UnmatchedBrace);
                    }
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Render with the entry's fields as-is.
    pub fn render(&self, entry: &TransformedEntry) -> String {
        self.render_with(entry, &entry.content, &entry.summary)
    }

    /// Render a status bounded to `max_length` characters.
    ///
    /// If the naive rendering fits, it is returned unchanged. Otherwise the
    /// template's fixed overhead (everything except content and summary) is
    /// measured, and content and summary are each shortened to the remaining
    /// budget on word boundaries. No further shrinking happens: when the
    /// overhead alone overflows, the result may still exceed the budget.
    pub fn render_bounded(&self, entry: &TransformedEntry, max_length: usize) -> String {
        let status = self.render(entry);
        if status.chars().count() < max_length {
            tracing::debug!("no need to shorten the status");
            return status;
        }

        let overhead = self.render_with(entry, "", "").chars().count();
        let budget = max_length.saturating_sub(overhead);
        tracing::debug!("maximum content length: {}", budget);

        let content = shorten(&entry.content, budget);
        let summary = shorten(&entry.summary, budget);
        let status = self.render_with(entry, &content, &summary);
        tracing::debug!("shortened status length: {}", status.chars().count());
        status
    }

    fn render_with(&self, entry: &TransformedEntry, content: &str, summary: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::Url) => out.push_str(&entry.url),
                Segment::Field(Field::Link) => out.push_str(&entry.link),
                Segment::Field(Field::Title) => out.push_str(&entry.title),
                Segment::Field(Field::Summary) => out.push_str(summary),
                Segment::Field(Field::Content) => out.push_str(content),
                Segment::Field(Field::Hashtags) => out.push_str(&entry.hashtags),
                Segment::Field(Field::Updated) => out.push_str(&entry.updated.to_rfc3339()),
            }
        }
        out
    }
}

/// Word-boundary truncation that keeps embedded newlines.
///
/// Newlines are swapped for a sentinel character before word-splitting (so
/// they ride along inside words rather than acting as breaks) and restored
/// afterwards. Whitespace runs collapse to single spaces. When words are
/// dropped, the truncation marker is appended.
fn shorten(text: &str, max_chars: usize) -> String {
    let sentinel = text.replace('\n', &NEWLINE_SENTINEL.to_string());
    let words: Vec<&str> = sentinel.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed.replace(NEWLINE_SENTINEL, "\n");
    }

    let marker_len = TRUNCATION_MARKER.chars().count() + 1;
    let budget = max_chars.saturating_sub(marker_len);
    let mut kept = String::new();
    let mut kept_len = 0;
    for word in words {
        let word_len = word.chars().count();
        let needed = if kept.is_empty() { word_len } else { word_len + 1 };
        if kept_len + needed > budget {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
        kept_len += needed;
    }
    if kept.is_empty() {
        return TRUNCATION_MARKER.to_string();
    }
    kept.push(' ');
    kept.push_str(TRUNCATION_MARKER);
    kept.replace(NEWLINE_SENTINEL, "\n")
}
