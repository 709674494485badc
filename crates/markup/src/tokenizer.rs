//! Streaming tokenizer over markup plus template delimiters.
//!
//! Scanning is byte-cursor based with a constrained, practical tag-name
//! character set (ASCII `[A-Za-z0-9:_-]`). Template delimiter families are
//! gated by the configured [`Profile`]: `{% %}`/`{# #}` for the
//! django/jinja/nunjucks dialects, the mustache curly forms for handlebars,
//! keyword blocks (`{{ if }}...{{ end }}`) for go templates.
//!
//! The tokenizer is tolerant by construction: anything that cannot be read
//! as a construct is literal text. `feed` may be called with arbitrary
//! chunk boundaries; a construct that is still incomplete at the end of the
//! buffer is held back until more input arrives, so the event stream is
//! identical no matter how the input is split. `close` flushes whatever
//! remains, degrading unterminated constructs to text.
//!
//! Invariant: we scan by byte, but slice endpoints are only ever cut at
//! ASCII structural bytes, so they remain UTF-8 char boundaries.

use crate::entities::{RefScan, scan_reference};
use crate::tags::{self, Syntax};
use memchr::{memchr, memchr3};
use settings::Config;

/// One tokenizer output.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// `<!DOCTYPE ...>`; `raw` is the inner text without `<!` and `>`.
    Doctype { raw: String },
    /// `<? ... >`, echoed verbatim.
    Pi { raw: String },
    StartTag {
        name: String,
        attrs_raw: String,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    BlockOpen {
        syntax: Syntax,
        name: String,
        args: String,
        left: Option<char>,
        right: Option<char>,
    },
    BlockClose {
        syntax: Syntax,
        name: String,
        left: Option<char>,
        right: Option<char>,
    },
    /// Inline template construct. `raw` is the inner expression for the
    /// curly/percent statements, the full lexeme for `CurlyEscaped`.
    Statement {
        syntax: Syntax,
        raw: String,
        left: Option<char>,
        right: Option<char>,
    },
    /// Comment-like span; `raw` is the full original span including
    /// delimiters.
    Comment {
        syntax: Syntax,
        raw: String,
    },
    Text {
        raw: String,
    },
    /// A well-formed character or entity reference, kept verbatim.
    EntityRef {
        raw: String,
    },
    /// Pass-through span, echoed byte for byte: a formatter-off region
    /// injected by the caller, or a handlebars raw block.
    Verbatim {
        raw: String,
    },
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_spaceless_marker(b: u8) -> bool {
    b == b'-' || b == b'~' || b == b'+'
}

/// Locate `</name [ws]* >` case-insensitively. Returns the span start and
/// the index one past `>`.
fn find_rawtext_close(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let hay = haystack.as_bytes();
    debug_assert!(name.is_ascii() && !name.is_empty());
    let n = name.len() + 2;
    let mut i = 0;
    while i + n <= hay.len() {
        let rel = memchr(b'<', &hay[i..])?;
        i += rel;
        if i + n > hay.len() {
            return None;
        }
        if hay[i + 1] == b'/' && hay[i + 2..i + n].eq_ignore_ascii_case(name.as_bytes()) {
            let mut k = i + n;
            while k < hay.len() && hay[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < hay.len() && hay[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

pub struct Tokenizer<'a> {
    config: &'a Config,
    buffer: String,
    cursor: usize,
    /// Element name whose raw-text body we are inside, if any.
    raw_text: Option<String>,
    events: Vec<Event>,
    closed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Tokenizer {
            config,
            buffer: String::new(),
            cursor: 0,
            raw_text: None,
            events: Vec::new(),
            closed: false,
        }
    }

    /// Append a chunk and emit every event that is complete so far.
    pub fn feed(&mut self, chunk: &str) {
        debug_assert!(!self.closed, "feed after close");
        self.buffer.push_str(chunk);
        self.run(false);
    }

    /// Flush the remainder; unterminated constructs degrade to text.
    pub fn close(&mut self) {
        self.run(true);
        self.closed = true;
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Inject a pass-through span (formatter-off region). Buffered input is
    /// flushed first so event order follows the source.
    pub fn push_verbatim(&mut self, raw: &str) {
        self.run(true);
        self.events.push(Event::Verbatim {
            raw: raw.to_string(),
        });
    }

    fn run(&mut self, end: bool) {
        while self.cursor < self.buffer.len() {
            let next = if self.raw_text.is_some() {
                self.scan_raw_text(end)
            } else {
                match self.buffer.as_bytes()[self.cursor] {
                    b'<' => self.scan_markup(end),
                    b'{' if self.template_opens_at(self.cursor) => self.scan_template(end),
                    b'\\' if self.escaped_expression_at(self.cursor) => self.scan_escaped(end),
                    _ => self.scan_text(end),
                }
            };
            match next {
                Some(n) => {
                    debug_assert!(n > self.cursor, "tokenizer must make progress");
                    self.cursor = n;
                }
                // Needs more input; wait for the next feed (or close).
                None => break,
            }
        }
    }

    /// Whether `{` at `pos` could start a template construct under the
    /// active profile. A lone `{` at the end of the buffer stays undecided
    /// until more input arrives.
    fn template_opens_at(&self, pos: usize) -> bool {
        let bytes = self.buffer.as_bytes();
        debug_assert!(bytes[pos] == b'{');
        let profile = self.config.profile;
        match bytes.get(pos + 1) {
            None => profile.uses_curly_expressions() || profile.uses_percent_blocks(),
            Some(b'%') | Some(b'#') => profile.uses_percent_blocks(),
            Some(b'{') => profile.uses_curly_expressions(),
            Some(_) => false,
        }
    }

    fn escaped_expression_at(&self, pos: usize) -> bool {
        let bytes = self.buffer.as_bytes();
        self.config.profile.uses_handlebars_curlies()
            && bytes[pos] == b'\\'
            && bytes.get(pos + 1) == Some(&b'{')
            && (bytes.get(pos + 2) == Some(&b'{') || pos + 2 == bytes.len())
    }

    fn emit_text(&mut self, start: usize, stop: usize) {
        if stop > start {
            self.events.push(Event::Text {
                raw: self.buffer[start..stop].to_string(),
            });
        }
    }

    /// Emit pending text and hand the cursor to the structural byte at
    /// `stop`.
    fn flush_text(&mut self, stop: usize) -> Option<usize> {
        debug_assert!(stop > self.cursor);
        self.emit_text(self.cursor, stop);
        Some(stop)
    }

    fn scan_text(&mut self, end: bool) -> Option<usize> {
        let mut probe = self.cursor;
        loop {
            let bytes = self.buffer.as_bytes();
            let Some(rel) = memchr3(b'<', b'{', b'&', &bytes[probe..]) else {
                return if end {
                    self.flush_text(self.buffer.len())
                } else {
                    None
                };
            };
            let pos = probe + rel;
            match bytes[pos] {
                b'<' => return self.flush_text(pos),
                b'{' => {
                    if !self.template_opens_at(pos) {
                        probe = pos + 1;
                        continue;
                    }
                    // `\{{` keeps its backslash with the expression.
                    let stop = if pos > self.cursor
                        && bytes[pos - 1] == b'\\'
                        && self.escaped_expression_at(pos - 1)
                    {
                        pos - 1
                    } else {
                        pos
                    };
                    if stop == self.cursor {
                        // Backslash at the cursor itself; handled by the
                        // dispatch loop.
                        return self.scan_escaped(end);
                    }
                    return self.flush_text(stop);
                }
                b'&' => match scan_reference(bytes, pos) {
                    RefScan::Invalid => {
                        probe = pos + 1;
                    }
                    RefScan::Complete(ref_end) => {
                        if pos > self.cursor {
                            return self.flush_text(pos);
                        }
                        self.events.push(Event::EntityRef {
                            raw: self.buffer[pos..ref_end].to_string(),
                        });
                        return Some(ref_end);
                    }
                    RefScan::Incomplete => {
                        if pos > self.cursor {
                            return self.flush_text(pos);
                        }
                        return if end {
                            self.flush_text(self.buffer.len())
                        } else {
                            None
                        };
                    }
                },
                _ => unreachable!(),
            }
        }
    }

    fn scan_raw_text(&mut self, end: bool) -> Option<usize> {
        let name = self.raw_text.clone().unwrap_or_default();
        match find_rawtext_close(&self.buffer[self.cursor..], &name) {
            Some((rel_start, rel_end)) => {
                self.emit_text(self.cursor, self.cursor + rel_start);
                self.events.push(Event::EndTag { name });
                self.raw_text = None;
                Some(self.cursor + rel_end)
            }
            None if end => {
                // Close tag never arrives; the body stays raw text and the
                // element is left unclosed.
                self.emit_text(self.cursor, self.buffer.len());
                self.raw_text = None;
                Some(self.buffer.len())
            }
            None => None,
        }
    }

    fn degrade_to_text(&mut self) -> Option<usize> {
        self.flush_text(self.buffer.len())
    }

    fn scan_markup(&mut self, end: bool) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let c = self.cursor;
        let rest = &self.buffer[c..];

        if rest.len() < 2 {
            return if end { self.degrade_to_text() } else { None };
        }

        if rest.starts_with("<!--") {
            return match rest[4..].find("-->") {
                Some(idx) => {
                    let span_end = c + 4 + idx + 3;
                    self.events.push(Event::Comment {
                        syntax: Syntax::Comment,
                        raw: self.buffer[c..span_end].to_string(),
                    });
                    Some(span_end)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }
        // A comment opener may be split across chunks.
        if "<!--".starts_with(rest) {
            return if end { self.degrade_to_text() } else { None };
        }

        if bytes[c + 1] == b'!' {
            return match rest.find('>') {
                Some(idx) => {
                    let inner = rest[2..idx].trim();
                    if inner
                        .get(..7)
                        .is_some_and(|word| word.eq_ignore_ascii_case("doctype"))
                    {
                        self.events.push(Event::Doctype {
                            raw: inner.to_string(),
                        });
                    } else {
                        // Bogus declaration; keep the span as an opaque
                        // comment.
                        self.events.push(Event::Comment {
                            syntax: Syntax::Comment,
                            raw: rest[..=idx].to_string(),
                        });
                    }
                    Some(c + idx + 1)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }

        if bytes[c + 1] == b'?' {
            return match rest.find('>') {
                Some(idx) => {
                    self.events.push(Event::Pi {
                        raw: rest[..=idx].to_string(),
                    });
                    Some(c + idx + 1)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }

        if bytes[c + 1] == b'/' {
            return self.scan_end_tag(end);
        }

        if bytes[c + 1].is_ascii_alphabetic() {
            return self.scan_start_tag(end);
        }

        // `<` followed by anything else is literal text.
        self.emit_text(c, c + 1);
        Some(c + 1)
    }

    fn scan_end_tag(&mut self, end: bool) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let c = self.cursor;
        let name_start = c + 2;
        let mut j = name_start;
        while j < bytes.len() && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == name_start {
            // `</>` or `</ ...>`: bogus, echoed as a comment span.
            return match self.buffer[c..].find('>') {
                Some(idx) => {
                    self.events.push(Event::Comment {
                        syntax: Syntax::Comment,
                        raw: self.buffer[c..=c + idx].to_string(),
                    });
                    Some(c + idx + 1)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }
        let name = tags::fold_name(&self.buffer[name_start..j], self.config.ignore_case);
        while j < bytes.len() && bytes[j] != b'>' {
            j += 1;
        }
        if j >= bytes.len() {
            return if end { self.degrade_to_text() } else { None };
        }
        log::trace!(target: "markup.tokenizer", "end tag </{name}>");
        self.events.push(Event::EndTag { name });
        Some(j + 1)
    }

    fn scan_start_tag(&mut self, end: bool) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let c = self.cursor;
        let name_start = c + 1;
        let mut j = name_start;
        while j < bytes.len() && is_name_byte(bytes[j]) {
            j += 1;
        }
        let name = tags::fold_name(&self.buffer[name_start..j], self.config.ignore_case);

        // Attribute region: quoted values and embedded template spans may
        // contain `>`; skip over both.
        let mut k = j;
        let mut self_closing = false;
        let attrs_end;
        loop {
            if k >= bytes.len() {
                return if end { self.degrade_to_text() } else { None };
            }
            match bytes[k] {
                b'"' | b'\'' => {
                    let quote = bytes[k];
                    let Some(rel) = memchr(quote, &bytes[k + 1..]) else {
                        return if end { self.degrade_to_text() } else { None };
                    };
                    k += rel + 2;
                }
                b'{' if matches!(bytes.get(k + 1), Some(b'{') | Some(b'%')) => {
                    let closer = if bytes[k + 1] == b'{' { "}}" } else { "%}" };
                    let Some(rel) = self.buffer[k + 2..].find(closer) else {
                        return if end { self.degrade_to_text() } else { None };
                    };
                    k += 2 + rel + 2;
                }
                b'/' if bytes.get(k + 1) == Some(&b'>') => {
                    self_closing = true;
                    attrs_end = k;
                    k += 2;
                    break;
                }
                b'>' => {
                    attrs_end = k;
                    k += 1;
                    break;
                }
                _ => k += 1,
            }
        }

        let attrs_raw = self.buffer[j..attrs_end].trim().to_string();
        let lower = name.to_ascii_lowercase();
        log::trace!(target: "markup.tokenizer", "start tag <{name}> self_closing={self_closing}");
        let enters_raw_text = !self_closing && tags::is_raw_text(&lower, &self.config.custom_html);
        self.events.push(Event::StartTag {
            name,
            attrs_raw,
            self_closing,
        });
        if enters_raw_text {
            log::trace!(target: "markup.tokenizer", "entering raw text mode for <{lower}>");
            self.raw_text = Some(lower);
        }
        Some(k)
    }

    fn scan_template(&mut self, end: bool) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let c = self.cursor;
        if c + 1 >= bytes.len() {
            return if end { self.degrade_to_text() } else { None };
        }
        match bytes[c + 1] {
            b'%' => self.scan_percent(end),
            b'#' => self.scan_hash_comment(end),
            b'{' => self.scan_curly(end),
            _ => unreachable!("template_opens_at checked the second byte"),
        }
    }

    fn scan_hash_comment(&mut self, end: bool) -> Option<usize> {
        let c = self.cursor;
        match self.buffer[c + 2..].find("#}") {
            Some(idx) => {
                let span_end = c + 2 + idx + 2;
                self.events.push(Event::Comment {
                    syntax: Syntax::HashComment,
                    raw: self.buffer[c..span_end].to_string(),
                });
                Some(span_end)
            }
            None if end => self.degrade_to_text(),
            None => None,
        }
    }

    fn scan_percent(&mut self, end: bool) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let c = self.cursor;
        let Some(rel) = self.buffer[c + 2..].find("%}") else {
            return if end { self.degrade_to_text() } else { None };
        };
        let close = c + 2 + rel;
        let span_end = close + 2;

        let mut inner_start = c + 2;
        let mut left = None;
        if inner_start < close && is_spaceless_marker(bytes[inner_start]) {
            left = Some(bytes[inner_start] as char);
            inner_start += 1;
        }
        let mut inner_end = close;
        let mut right = None;
        if inner_end > inner_start
            && is_spaceless_marker(bytes[inner_end - 1])
            && (inner_end - 1 == inner_start || bytes[inner_end - 2].is_ascii_whitespace())
        {
            right = Some(bytes[inner_end - 1] as char);
            inner_end -= 1;
        }
        let inner = self.buffer[inner_start..inner_end].trim().to_string();
        let mut words = inner.splitn(2, char::is_whitespace);
        let word = words.next().unwrap_or("").to_string();
        let args = words.next().unwrap_or("").trim().to_string();

        // Spans whose bodies must not be parsed are swallowed whole.
        let opaque_end_word = match word.to_ascii_lowercase().as_str() {
            "comment" => Some(("endcomment", Syntax::PercentComment)),
            "verbatim" => Some(("endverbatim", Syntax::PercentRaw)),
            "raw" => Some(("endraw", Syntax::PercentRaw)),
            _ => None,
        };
        if let Some((end_word, syntax)) = opaque_end_word {
            match self.find_percent_span_end(span_end, end_word) {
                Some(outer_end) => {
                    self.events.push(Event::Comment {
                        syntax,
                        raw: self.buffer[c..outer_end].to_string(),
                    });
                    return Some(outer_end);
                }
                None if !end => return None,
                // Unterminated: keep the opener as a statement and parse on.
                None => {}
            }
        }

        if let Some(name) = word.strip_prefix("end").or_else(|| word.strip_prefix("END")) {
            log::trace!(target: "markup.tokenizer", "block close {{% end{name} %}}");
            self.events.push(Event::BlockClose {
                syntax: Syntax::PercentBlock,
                name: name.to_ascii_lowercase(),
                left,
                right,
            });
        } else if tags::is_percent_block_name(&word, &self.config.custom_blocks) {
            log::trace!(target: "markup.tokenizer", "block open {{% {word} %}}");
            self.events.push(Event::BlockOpen {
                syntax: Syntax::PercentBlock,
                name: word,
                args,
                left,
                right,
            });
        } else {
            self.events.push(Event::Statement {
                syntax: Syntax::PercentStatement,
                raw: inner,
                left,
                right,
            });
        }
        Some(span_end)
    }

    /// Find the end of the first `{% word ... %}` whose word matches
    /// `end_word`, scanning from `from`. Returns the index one past `%}`.
    fn find_percent_span_end(&self, from: usize, end_word: &str) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let mut i = from;
        while i + 1 < bytes.len() {
            let rel = memchr(b'{', &bytes[i..])?;
            let p = i + rel;
            if p + 1 >= bytes.len() {
                return None;
            }
            if bytes[p + 1] != b'%' {
                i = p + 1;
                continue;
            }
            let close_rel = self.buffer[p + 2..].find("%}")?;
            let close = p + 2 + close_rel;
            let inner = self.buffer[p + 2..close]
                .trim_matches(|ch: char| ch.is_whitespace() || matches!(ch, '-' | '~' | '+'));
            if inner
                .split_whitespace()
                .next()
                .is_some_and(|w| w.eq_ignore_ascii_case(end_word))
            {
                return Some(close + 2);
            }
            i = p + 1;
        }
        None
    }

    fn scan_curly(&mut self, end: bool) -> Option<usize> {
        let c = self.cursor;
        let rest = &self.buffer[c..];
        let handlebars = self.config.profile.uses_handlebars_curlies();

        if handlebars && rest.starts_with("{{{{") {
            return self.scan_raw_block(end);
        }
        if handlebars && rest.starts_with("{{{") && !rest.starts_with("{{{{") {
            return match rest[3..].find("}}}") {
                Some(idx) => {
                    let inner = rest[3..3 + idx].trim().to_string();
                    self.events.push(Event::Statement {
                        syntax: Syntax::CurlyTriple,
                        raw: inner,
                        left: None,
                        right: None,
                    });
                    Some(c + 3 + idx + 3)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }
        if handlebars && rest.starts_with("{{!") {
            let (closer, skip) = if rest.starts_with("{{!--") {
                ("--}}", 5)
            } else {
                ("}}", 3)
            };
            return match rest[skip..].find(closer) {
                Some(idx) => {
                    let span_end = c + skip + idx + closer.len();
                    self.events.push(Event::Comment {
                        syntax: Syntax::CurlyComment,
                        raw: self.buffer[c..span_end].to_string(),
                    });
                    Some(span_end)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }
        if handlebars && (rest.starts_with("{{#") || rest.starts_with("{{/")) {
            let closing = rest.as_bytes()[2] == b'/';
            return match rest[3..].find("}}") {
                Some(idx) => {
                    let inner = rest[3..3 + idx].trim();
                    let mut words = inner.splitn(2, char::is_whitespace);
                    let name = words.next().unwrap_or("").to_string();
                    let args = words.next().unwrap_or("").trim().to_string();
                    if closing {
                        log::trace!(target: "markup.tokenizer", "block close {{{{/{name}}}}}");
                        self.events.push(Event::BlockClose {
                            syntax: Syntax::CurlyBlock,
                            name,
                            left: None,
                            right: None,
                        });
                    } else {
                        log::trace!(target: "markup.tokenizer", "block open {{{{#{name}}}}}");
                        self.events.push(Event::BlockOpen {
                            syntax: Syntax::CurlyBlock,
                            name,
                            args,
                            left: None,
                            right: None,
                        });
                    }
                    Some(c + 3 + idx + 2)
                }
                None if end => self.degrade_to_text(),
                None => None,
            };
        }

        // Plain `{{ ... }}` expression or go-template keyword block.
        let bytes = self.buffer.as_bytes();
        let Some(rel) = rest[2..].find("}}") else {
            return if end { self.degrade_to_text() } else { None };
        };
        let close = c + 2 + rel;
        let span_end = close + 2;

        let mut inner_start = c + 2;
        let mut left = None;
        if inner_start < close && matches!(bytes[inner_start], b'-' | b'~') {
            left = Some(bytes[inner_start] as char);
            inner_start += 1;
        }
        let mut inner_end = close;
        let mut right = None;
        if inner_end > inner_start
            && matches!(bytes[inner_end - 1], b'-' | b'~')
            && (inner_end - 1 == inner_start || bytes[inner_end - 2].is_ascii_whitespace())
        {
            right = Some(bytes[inner_end - 1] as char);
            inner_end -= 1;
        }
        let inner = self.buffer[inner_start..inner_end].trim().to_string();

        if self.config.profile.uses_golang_keyword_blocks() {
            let mut words = inner.splitn(2, char::is_whitespace);
            let word = words.next().unwrap_or("");
            let args = words.next().unwrap_or("").trim();
            if tags::is_keyword_block_name(word) {
                self.events.push(Event::BlockOpen {
                    syntax: Syntax::CurlyKeywordBlock,
                    name: word.to_string(),
                    args: args.to_string(),
                    left,
                    right,
                });
                return Some(span_end);
            }
            if word == "end" && args.is_empty() {
                self.events.push(Event::BlockClose {
                    syntax: Syntax::CurlyKeywordBlock,
                    name: String::new(),
                    left,
                    right,
                });
                return Some(span_end);
            }
        }

        self.events.push(Event::Statement {
            syntax: Syntax::CurlyStatement,
            raw: inner,
            left,
            right,
        });
        Some(span_end)
    }

    /// Handlebars `{{{{name}}}}...{{{{/name}}}}`. The body is raw and is
    /// swallowed whole as a pass-through span; only an unterminated opener
    /// or a stray closer survives as block structure.
    fn scan_raw_block(&mut self, end: bool) -> Option<usize> {
        let c = self.cursor;
        let rest = &self.buffer[c..];
        let Some(idx) = rest[4..].find("}}}}") else {
            return if end { self.degrade_to_text() } else { None };
        };
        let inner = rest[4..4 + idx].trim();
        let head_end = c + 4 + idx + 4;
        if let Some(name) = inner.strip_prefix('/') {
            self.events.push(Event::BlockClose {
                syntax: Syntax::CurlyRawBlock,
                name: name.trim().to_string(),
                left: None,
                right: None,
            });
            return Some(head_end);
        }
        let mut words = inner.splitn(2, char::is_whitespace);
        let name = words.next().unwrap_or("").to_string();
        let args = words.next().unwrap_or("").trim().to_string();
        let close_fence = ["{{{{/", &name, "}}}}"].concat();
        match self.buffer[head_end..].find(&close_fence) {
            Some(rel) => {
                let span_end = head_end + rel + close_fence.len();
                self.events.push(Event::Verbatim {
                    raw: self.buffer[c..span_end].to_string(),
                });
                Some(span_end)
            }
            None if !end => None,
            None => {
                // Unterminated: keep the opener and parse the rest normally.
                self.events.push(Event::BlockOpen {
                    syntax: Syntax::CurlyRawBlock,
                    name,
                    args,
                    left: None,
                    right: None,
                });
                Some(head_end)
            }
        }
    }

    fn scan_escaped(&mut self, end: bool) -> Option<usize> {
        let c = self.cursor;
        let rest = &self.buffer[c..];
        debug_assert!(rest.starts_with('\\'));
        match rest[1..].find("}}") {
            Some(idx) => {
                let span_end = c + 1 + idx + 2;
                self.events.push(Event::Statement {
                    syntax: Syntax::CurlyEscaped,
                    raw: self.buffer[c..span_end].to_string(),
                    left: None,
                    right: None,
                });
                Some(span_end)
            }
            None if end => self.degrade_to_text(),
            None => None,
        }
    }
}

/// Tokenize a complete input in one call.
pub fn tokenize(input: &str, config: &Config) -> Vec<Event> {
    let mut tokenizer = Tokenizer::new(config);
    tokenizer.feed(input);
    tokenizer.close();
    tokenizer.drain()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Vec<Event> {
        tokenize(input, &Config::default())
    }

    #[test]
    fn tokenizes_simple_elements_and_text() {
        let out = events("<div><p>hi</p></div>");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::StartTag { name: div, .. },
                    Event::StartTag { name: p, .. },
                    Event::Text { raw },
                    Event::EndTag { name: p_end },
                    Event::EndTag { name: div_end },
                ] if div == "div" && p == "p" && raw == "hi" && p_end == "p" && div_end == "div"
            ),
            "expected element events, got: {out:?}"
        );
    }

    #[test]
    fn folds_known_names_but_keeps_custom_elements() {
        let out = events("<DIV></DIV><My-Widget></My-Widget>");
        let names: Vec<&str> = out
            .iter()
            .map(|e| match e {
                Event::StartTag { name, .. } | Event::EndTag { name } => name.as_str(),
                _ => panic!("unexpected event: {e:?}"),
            })
            .collect();
        assert_eq!(names, ["div", "div", "My-Widget", "My-Widget"]);
    }

    #[test]
    fn keeps_attribute_region_raw() {
        let out = events("<a href=\"/x?a=1&b=2\" class='c d'>x</a>");
        assert!(
            matches!(
                out.first(),
                Some(Event::StartTag { attrs_raw, .. })
                    if attrs_raw == "href=\"/x?a=1&b=2\" class='c d'"
            ),
            "expected raw attribute text, got: {out:?}"
        );
    }

    #[test]
    fn gt_inside_quoted_attribute_does_not_end_the_tag() {
        let out = events("<div data-x=\"a > b\">y</div>");
        assert!(
            matches!(
                out.first(),
                Some(Event::StartTag { attrs_raw, .. }) if attrs_raw == "data-x=\"a > b\""
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn gt_inside_template_expression_does_not_end_the_tag() {
        let out = events("<div {% if x > 1 %}hidden{% endif %}>y</div>");
        assert!(
            matches!(
                out.first(),
                Some(Event::StartTag { attrs_raw, .. })
                    if attrs_raw == "{% if x > 1 %}hidden{% endif %}"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn recognizes_doctype_and_comments() {
        let out = events("<!DOCTYPE html><!-- note -->");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::Doctype { raw },
                    Event::Comment { syntax: Syntax::Comment, raw: comment },
                ] if raw == "DOCTYPE html" && comment == "<!-- note -->"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn raw_text_body_is_not_parsed() {
        let out = events("<script>if (a < b) { x(); }</script>");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::StartTag { name, .. },
                    Event::Text { raw },
                    Event::EndTag { name: end },
                ] if name == "script" && raw == "if (a < b) { x(); }" && end == "script"
            ),
            "expected raw script body, got: {out:?}"
        );
    }

    #[test]
    fn rawtext_close_accepts_whitespace_and_mixed_case() {
        let out = events("<style>a{}</StYlE >");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::StartTag { name, .. },
                    Event::Text { raw },
                    Event::EndTag { name: end },
                ] if name == "style" && raw == "a{}" && end == "style"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn percent_blocks_open_and_close() {
        let out = events("{% if a %}x{% endif %}");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::BlockOpen { syntax: Syntax::PercentBlock, name, args, .. },
                    Event::Text { raw },
                    Event::BlockClose { syntax: Syntax::PercentBlock, name: close, .. },
                ] if name == "if" && args == "a" && raw == "x" && close == "if"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn unknown_percent_words_are_statements() {
        let out = events("{% csrf_token %}");
        assert!(
            matches!(
                out.as_slice(),
                [Event::Statement { syntax: Syntax::PercentStatement, raw, .. }]
                    if raw == "csrf_token"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn spaceless_markers_are_captured() {
        let out = events("{%- if x -%}{%- endif +%}");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::BlockOpen { name, left: Some('-'), right: Some('-'), .. },
                    Event::BlockClose { name: close, left: Some('-'), right: Some('+'), .. },
                ] if name == "if" && close == "if"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn comment_block_is_swallowed_whole() {
        let out = events("{% comment %} {{ not parsed }} {% endcomment %}after");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::Comment { syntax: Syntax::PercentComment, raw },
                    Event::Text { raw: after },
                ] if raw == "{% comment %} {{ not parsed }} {% endcomment %}" && after == "after"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn verbatim_block_is_swallowed_whole() {
        let out = events("{% verbatim %}{{ literal }}{% endverbatim %}");
        assert!(
            matches!(
                out.as_slice(),
                [Event::Comment { syntax: Syntax::PercentRaw, raw }]
                    if raw == "{% verbatim %}{{ literal }}{% endverbatim %}"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn handlebars_forms() {
        let out = events("{{#each xs}}{{name}}{{/each}}{{{ html }}}{{! note }}");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::BlockOpen { syntax: Syntax::CurlyBlock, name, args, .. },
                    Event::Statement { syntax: Syntax::CurlyStatement, raw, .. },
                    Event::BlockClose { syntax: Syntax::CurlyBlock, name: close, .. },
                    Event::Statement { syntax: Syntax::CurlyTriple, raw: triple, .. },
                    Event::Comment { syntax: Syntax::CurlyComment, raw: comment },
                ] if name == "each" && args == "xs" && raw == "name" && close == "each"
                    && triple == "html" && comment == "{{! note }}"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn handlebars_raw_block_and_escaped_expression() {
        let out = events("{{{{raw}}}}{{ body }}{{{{/raw}}}}\\{{ literal }}");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::Verbatim { raw },
                    Event::Statement { syntax: Syntax::CurlyEscaped, raw: escaped, .. },
                ] if raw == "{{{{raw}}}}{{ body }}{{{{/raw}}}}"
                    && escaped == "\\{{ literal }}"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn golang_keyword_blocks() {
        let config = Config {
            profile: settings::Profile::Golang,
            ..Config::default()
        };
        let out = tokenize("{{ if .Ready }}ok{{ end }}", &config);
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::BlockOpen { syntax: Syntax::CurlyKeywordBlock, name, args, .. },
                    Event::Text { raw },
                    Event::BlockClose { syntax: Syntax::CurlyKeywordBlock, .. },
                ] if name == "if" && args == ".Ready" && raw == "ok"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn html_profile_treats_curlies_as_text() {
        let config = Config {
            profile: settings::Profile::Html,
            ..Config::default()
        };
        let out = tokenize("{{ not a template }}", &config);
        assert!(
            matches!(
                out.as_slice(),
                [Event::Text { raw }] if raw == "{{ not a template }}"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn entity_references_are_separate_events() {
        let out = events("a &amp; b");
        assert!(
            matches!(
                out.as_slice(),
                [
                    Event::Text { raw: a },
                    Event::EntityRef { raw },
                    Event::Text { raw: b },
                ] if a == "a " && raw == "&amp;" && b == " b"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn bare_ampersand_is_text() {
        let out = events("fish & chips");
        assert!(
            matches!(out.as_slice(), [Event::Text { raw }] if raw == "fish & chips"),
            "got: {out:?}"
        );
    }

    #[test]
    fn chunked_feeding_matches_single_feed() {
        let input = "<div class=\"a\">{% if x %}a &amp; b{% endif %}</div><script>1 < 2</script>";
        let whole = events(input);

        for split in 1..input.len() {
            if !input.is_char_boundary(split) {
                continue;
            }
            let config = Config::default();
            let mut tokenizer = Tokenizer::new(&config);
            tokenizer.feed(&input[..split]);
            tokenizer.feed(&input[split..]);
            tokenizer.close();
            let chunked = tokenizer.drain();
            assert_eq!(chunked, whole, "split at byte {split}");
        }
    }

    #[test]
    fn unterminated_constructs_degrade_to_text_at_close() {
        let out = events("before <div class=\"x");
        assert!(
            matches!(
                out.as_slice(),
                [Event::Text { raw: a }, Event::Text { raw: b }]
                    if a == "before " && b == "<div class=\"x"
            ),
            "got: {out:?}"
        );

        let out = events("{% if x");
        assert!(
            matches!(out.as_slice(), [Event::Text { raw }] if raw == "{% if x"),
            "got: {out:?}"
        );
    }

    #[test]
    fn unterminated_rawtext_leaves_element_unclosed() {
        let out = events("<script>let x = 1;");
        assert!(
            matches!(
                out.as_slice(),
                [Event::StartTag { name, .. }, Event::Text { raw }]
                    if name == "script" && raw == "let x = 1;"
            ),
            "got: {out:?}"
        );
    }

    #[test]
    fn stray_lt_is_literal_text() {
        let out = events("1 < 2 and 3 > 2");
        let text: String = out
            .iter()
            .map(|e| match e {
                Event::Text { raw } => raw.as_str(),
                _ => panic!("unexpected event: {e:?}"),
            })
            .collect();
        assert_eq!(text, "1 < 2 and 3 > 2");
    }
}
