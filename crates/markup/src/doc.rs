//! Document IR between the tree renderer and the text writer.
//!
//! Rendering lowers the tree into this small algebra; `flatten` then
//! resolves grouping decisions (which `SoftLine`s actually break) and
//! indentation depth, leaving the writer a single linear pass.

/// Width assumed for content the measurer cannot see into; a group holding
/// one always overflows.
const OPAQUE_WIDTH: usize = usize::MAX / 4;

#[derive(Clone, Debug, PartialEq)]
pub enum Doc {
    Text(String),
    /// A space, or a break when the rest of the line would not fit.
    Line,
    /// Nothing, or a break when the enclosing group overflows.
    SoftLine { forced: bool },
    /// Always a break.
    HardLine,
    /// Measurement boundary: if the group's flat width exceeds the line
    /// limit, its soft lines are forced.
    Group(Vec<Doc>),
    /// One indentation level deeper.
    Indent(Vec<Doc>),
    /// Words wrapped greedily at the line limit.
    Fill(Vec<String>),
    /// Raw text delegated to an external formatter, or passed through.
    Opaque { raw: String, hint: &'static str },
}

impl Doc {
    pub fn soft_line() -> Doc {
        Doc::SoftLine { forced: false }
    }

    pub fn text(s: impl Into<String>) -> Doc {
        Doc::Text(s.into())
    }
}

/// Flattened form consumed by the writer. Break decisions that depend on
/// group width are already resolved; `Line` still breaks dynamically on
/// line-fit at write time.
#[derive(Clone, Debug, PartialEq)]
pub enum FlatDoc {
    Text(String),
    Line { indent: usize },
    Break { indent: usize },
    Fill { words: Vec<String>, indent: usize },
    Opaque {
        raw: String,
        hint: &'static str,
        indent: usize,
    },
}

/// Width of a doc sequence if laid out flat on one line.
fn measure(docs: &[Doc]) -> usize {
    let mut width = 0usize;
    for doc in docs {
        let w = match doc {
            Doc::Text(s) => s.chars().count(),
            Doc::Line => 1,
            Doc::SoftLine { .. } | Doc::HardLine => 0,
            Doc::Group(children) | Doc::Indent(children) => measure(children),
            Doc::Fill(words) => {
                let chars: usize = words.iter().map(|w| w.chars().count()).sum();
                chars + words.len().saturating_sub(1)
            }
            Doc::Opaque { .. } => OPAQUE_WIDTH,
        };
        width = width.saturating_add(w);
    }
    width
}

/// Force the soft lines of an overflowing group: a breadth-first walk
/// finds the shallowest group-nesting level that contains any, and forces
/// all soft lines at that level. `Indent` is transparent; only `Group` is
/// a nesting boundary, so an element's opening and closing soft lines
/// break together.
fn force_softlines(children: &mut [Doc]) {
    for target in 0..usize::MAX {
        let mut deeper = false;
        let mut forced = false;
        force_at_depth(children, 0, target, &mut deeper, &mut forced);
        if forced || !deeper {
            return;
        }
    }
}

fn force_at_depth(
    docs: &mut [Doc],
    depth: usize,
    target: usize,
    deeper: &mut bool,
    forced: &mut bool,
) {
    for doc in docs {
        match doc {
            Doc::SoftLine { forced: f } if depth == target => {
                *f = true;
                *forced = true;
            }
            Doc::Indent(children) => force_at_depth(children, depth, target, deeper, forced),
            Doc::Group(children) => {
                if depth < target {
                    force_at_depth(children, depth + 1, target, deeper, forced);
                } else {
                    *deeper = true;
                }
            }
            _ => {}
        }
    }
}

/// Resolve groups and indentation into the writer's linear form.
pub fn flatten(docs: Vec<Doc>, max_line_length: usize) -> Vec<FlatDoc> {
    let mut out = Vec::new();
    flatten_into(docs, 0, max_line_length, &mut out);
    out
}

fn flatten_into(docs: Vec<Doc>, indent: usize, max: usize, out: &mut Vec<FlatDoc>) {
    for doc in docs {
        match doc {
            Doc::Text(s) => {
                if !s.is_empty() {
                    out.push(FlatDoc::Text(s));
                }
            }
            Doc::Line => out.push(FlatDoc::Line { indent }),
            Doc::SoftLine { forced } => {
                if forced {
                    out.push(FlatDoc::Break { indent });
                }
            }
            Doc::HardLine => out.push(FlatDoc::Break { indent }),
            Doc::Group(mut children) => {
                if measure(&children) > max {
                    force_softlines(&mut children);
                }
                flatten_into(children, indent, max, out);
            }
            Doc::Indent(children) => flatten_into(children, indent + 1, max, out),
            Doc::Fill(words) => {
                if !words.is_empty() {
                    out.push(FlatDoc::Fill { words, indent });
                }
            }
            Doc::Opaque { raw, hint } => out.push(FlatDoc::Opaque { raw, hint, indent }),
        }
    }
}
