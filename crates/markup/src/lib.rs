//! Template-aware HTML formatting.
//!
//! The pipeline is tokenize → build → render → flatten → write:
//! a streaming tokenizer turns bytes into events, a tolerant builder
//! assembles them into a tree, rendering lowers the tree into a small
//! document algebra, and two linear passes resolve layout and emit text.
//!
//! Formatting is idempotent: running the formatter over its own output
//! yields the same bytes.

pub mod attrs;
pub mod doc;
mod entities;
mod render;
pub mod tags;
pub mod tokenizer;
pub mod tree;
pub mod writer;

pub use settings::{Config, IndentChar, Profile};
pub use writer::{RawTextFormatter, Services};

use tokenizer::Tokenizer;

/// Format a document with no external raw-text services.
pub fn format(input: &str, config: &Config) -> String {
    format_with(input, config, &Services::default())
}

/// Format a document, splicing registered CSS/JS formatters into raw-text
/// bodies where the configuration enables them.
pub fn format_with(input: &str, config: &Config, services: &Services) -> String {
    if input.is_empty() {
        return String::new();
    }

    let crlf = input.contains("\r\n");
    let normalized;
    let text: &str = if crlf {
        normalized = input.replace("\r\n", "\n");
        &normalized
    } else {
        input
    };

    let (front_matter, body) = split_front_matter(text);

    let mut out = String::new();
    if let Some(front) = front_matter {
        out.push_str(front);
        if !config.no_line_after_front_matter {
            out.push('\n');
        }
    }

    let tree = tree::build(tokenize_body(body, config), config);
    let docs = render::render(&tree, config);
    let flat = doc::flatten(docs, config.max_line_length);
    out.push_str(&writer::write(&flat, config, services));

    // Exactly one trailing newline.
    while out.ends_with('\n') {
        out.pop();
    }
    out.push('\n');

    if crlf {
        out = out.replace('\n', "\r\n");
    }
    out
}

/// Parse a document into its tree without formatting it.
pub fn parse(input: &str, config: &Config) -> tree::Tree {
    tree::build(tokenizer::tokenize(input, config), config)
}

/// Tokenize the body, routing formatter-off regions around the scanner as
/// pass-through spans.
fn tokenize_body(body: &str, config: &Config) -> Vec<tokenizer::Event> {
    let mut tok = Tokenizer::new(config);
    let mut rest = body;
    while let Some((start, end)) = find_ignore_region(rest) {
        tok.feed(&rest[..start]);
        tok.push_verbatim(&rest[start..end]);
        rest = &rest[end..];
    }
    tok.feed(rest);
    tok.close();
    tok.drain()
}

const OFF_MARKER: &str = "djlint:off";
const ON_MARKER: &str = "djlint:on";

/// Comment forms that may carry the on/off markers, paired with their
/// closing delimiters.
const COMMENT_DELIMS: [(&str, &str); 5] = [
    ("{% comment %}", "{% endcomment %}"),
    ("{{!--", "--}}"),
    ("<!--", "-->"),
    ("{{!", "}}"),
    ("{#", "#}"),
];

/// Locate the next formatter-off region: from the start of the comment
/// holding `djlint:off` through the end of the comment holding `djlint:on`,
/// or to the end of input when the region is never switched back on.
fn find_ignore_region(text: &str) -> Option<(usize, usize)> {
    let (start, off_end) = marker_comment_span(text, 0, OFF_MARKER)?;
    match marker_comment_span(text, off_end, ON_MARKER) {
        Some((_, end)) => Some((start, end)),
        None => Some((start, text.len())),
    }
}

/// Find the first occurrence of `marker` at or after `from` that sits
/// inside a comment, and return that comment's span. Marker text out in
/// the open is ordinary content and is skipped.
fn marker_comment_span(text: &str, from: usize, marker: &str) -> Option<(usize, usize)> {
    let mut at = from;
    while let Some(rel) = text[at..].find(marker) {
        let pos = at + rel;
        if let Some(span) = enclosing_comment(text, pos) {
            return Some(span);
        }
        at = pos + marker.len();
    }
    None
}

/// The span of the comment containing byte `pos`, if any: the nearest
/// opener before `pos` whose matching closer falls after it. An
/// unterminated comment runs to the end of input.
fn enclosing_comment(text: &str, pos: usize) -> Option<(usize, usize)> {
    // Ties at the same position take the longer opener (`{{!--` over `{{!`).
    let (start, body, close) = COMMENT_DELIMS
        .iter()
        .filter_map(|&(open, close)| {
            text[..pos].rfind(open).map(|i| (i, i + open.len(), close))
        })
        .max_by_key(|&(i, body, _)| (i, body))?;
    let end = match text[body..].find(close) {
        Some(rel) => body + rel + close.len(),
        None => text.len(),
    };
    (pos < end).then_some((start, end))
}

/// Split a leading `---` front-matter fence off the document. The returned
/// prefix includes both fences and the closing fence's newline.
fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix("---\n") else {
        return (None, text);
    };
    match rest.find("\n---\n") {
        Some(idx) => {
            let end = 4 + idx + 5;
            (Some(&text[..end]), &text[end..])
        }
        None => (None, text),
    }
}
