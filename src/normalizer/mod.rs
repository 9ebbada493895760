use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Element;
use scraper::{Html, Node};

static NBSP_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("\u{a0}+").expect("valid regex"));
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("  +").expect("valid regex"));
static SPACE_BEFORE_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(" +\n").expect("valid regex"));
static NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("\n\n\n+").expect("valid regex"));

/// Strip an HTML fragment down to clean plain text.
///
/// Elements carrying a `read-more` or `read-more-*` class are dropped with
/// their subtree before text extraction. Runs of non-breaking spaces become
/// one space, runs of spaces collapse, spaces before a newline are stripped
/// and 3+ consecutive newlines collapse to two. Malformed HTML degrades to
/// its text content; this never fails.
pub fn clean(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let mut text = String::new();
    collect_text(&html.tree.root(), &mut text);

    let text = NBSP_RUN.replace_all(&text, " ");
    let text = SPACE_RUN.replace_all(&text, " ");
    let text = SPACE_BEFORE_NEWLINE.replace_all(&text, "\n");
    let text = NEWLINE_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn collect_text(node: &NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
        }
        Node::Element(element) => {
            if is_read_more(element) {
                return;
            }
            for child in node.children() {
                collect_text(&child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(&child, out);
            }
        }
    }
}

fn is_read_more(element: &Element) -> bool {
    element
        .classes()
        .any(|class| class == "read-more" || class.starts_with("read-more-"))
}
