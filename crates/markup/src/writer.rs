//! Final text emission: one linear pass over the flattened IR.
//!
//! The only state carried is the current line length and a lazily emitted
//! indent, so blank lines never gain trailing whitespace. `Line` breaks on
//! line-fit, `Fill` wraps greedily, `Opaque` hands raw text to a registered
//! formatter service or passes it through with its own layout untouched.

use crate::doc::FlatDoc;
use settings::Config;

/// External formatter for raw-text bodies (scripts, styles).
///
/// `indent_depth` is the indentation level of the surrounding element; the
/// returned text is spliced into the output verbatim.
pub trait RawTextFormatter {
    fn format(&self, raw: &str, indent_depth: usize, hint: &str) -> String;
}

/// Registered raw-text services, looked up by hint.
#[derive(Default)]
pub struct Services<'a> {
    pub css: Option<&'a dyn RawTextFormatter>,
    pub js: Option<&'a dyn RawTextFormatter>,
}

impl Services<'_> {
    fn lookup(&self, hint: &str, config: &Config) -> Option<&dyn RawTextFormatter> {
        match hint {
            "css" if config.format_css => self.css,
            "js" if config.format_js => self.js,
            _ => None,
        }
    }
}

struct Writer<'a> {
    config: &'a Config,
    unit: String,
    unit_width: usize,
    out: String,
    line_length: usize,
    pending_indent: Option<usize>,
}

impl Writer<'_> {
    fn newline(&mut self, indent: usize) {
        self.out.push('\n');
        self.pending_indent = Some(indent);
        self.line_length = indent * self.unit_width;
    }

    fn start_content(&mut self) {
        if let Some(depth) = self.pending_indent.take() {
            for _ in 0..depth {
                self.out.push_str(&self.unit);
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        self.start_content();
        self.out.push_str(text);
        match text.rfind('\n') {
            // Multi-line payloads (comments, pass-through spans) reset the
            // running length to their last line.
            Some(pos) => self.line_length = text[pos + 1..].chars().count(),
            None => self.line_length += text.chars().count(),
        }
    }

    fn push_fill(&mut self, words: &[String], indent: usize) {
        let max = self.config.max_line_length;
        for (i, word) in words.iter().enumerate() {
            let width = word.chars().count();
            if i == 0 {
                self.push_text(word);
                continue;
            }
            if self.line_length + 1 + width <= max {
                self.out.push(' ');
                self.line_length += 1 + width;
                self.out.push_str(word);
            } else {
                self.newline(indent);
                self.push_text(word);
            }
        }
    }

    fn push_opaque(&mut self, raw: &str, hint: &str, indent: usize, services: &Services) {
        if let Some(service) = services.lookup(hint, self.config) {
            let formatted = service.format(raw, indent, hint);
            self.pending_indent = None;
            self.push_raw_lines(&formatted);
            return;
        }
        // No service: the body keeps its own layout, byte for byte apart
        // from surrounding blank lines.
        self.pending_indent = None;
        self.push_raw_lines(trim_blank_edges(raw));
    }

    fn push_raw_lines(&mut self, text: &str) {
        self.out.push_str(text);
        match text.rfind('\n') {
            Some(pos) => self.line_length = text[pos + 1..].chars().count(),
            None => self.line_length += text.chars().count(),
        }
    }
}

/// Drop leading and trailing whitespace-only lines while keeping the
/// indentation of the first content line.
fn trim_blank_edges(raw: &str) -> &str {
    let trimmed = raw.trim_end();
    match trimmed.find(|c: char| !c.is_whitespace()) {
        Some(first) => match trimmed[..first].rfind('\n') {
            Some(nl) => &trimmed[nl + 1..],
            None => trimmed,
        },
        None => "",
    }
}

/// Width of the unbreakable run starting at `from`, used for `Line` fit
/// decisions.
fn next_run_width(flat: &[FlatDoc], from: usize) -> usize {
    let mut width = 0;
    for item in &flat[from..] {
        match item {
            FlatDoc::Text(s) => width += s.chars().count(),
            _ => break,
        }
    }
    width
}

pub fn write(flat: &[FlatDoc], config: &Config, services: &Services) -> String {
    let unit = config.indent_unit();
    let mut writer = Writer {
        config,
        unit_width: unit.chars().count(),
        unit,
        out: String::new(),
        line_length: 0,
        pending_indent: Some(0),
    };

    for (i, item) in flat.iter().enumerate() {
        match item {
            FlatDoc::Text(s) => writer.push_text(s),
            FlatDoc::Line { indent } => {
                let run = next_run_width(flat, i + 1);
                if writer.line_length + 1 + run <= config.max_line_length {
                    writer.start_content();
                    writer.out.push(' ');
                    writer.line_length += 1;
                } else {
                    writer.newline(*indent);
                }
            }
            FlatDoc::Break { indent } => writer.newline(*indent),
            FlatDoc::Fill { words, indent } => writer.push_fill(words, *indent),
            FlatDoc::Opaque { raw, hint, indent } => {
                writer.push_opaque(raw, hint, *indent, services)
            }
        }
    }

    writer.out
}
