//! Lowering from the document tree to the doc IR.
//!
//! Spacing policy, in order of precedence:
//! - whitespace-significant content (`pre`-like bodies, raw-text bodies,
//!   comments, pass-through spans) is echoed without reflowing;
//! - inline content never gains or loses surrounding whitespace: adjacent
//!   inline nodes glue when the source had no separator, and collapse any
//!   separator to a single breakable space otherwise;
//! - a container with any non-inline child breaks hard around every
//!   non-inline boundary;
//! - everything else becomes a group that stays flat when it fits.

use crate::attrs::{self, AttrItem, AttrValue};
use crate::doc::Doc;
use crate::tags::{self, Syntax};
use crate::tree::{Node, NodeId, Tree};
use settings::Config;

/// Collapse internal whitespace runs to single spaces.
fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn marker(m: Option<char>) -> String {
    m.map(String::from).unwrap_or_default()
}

pub fn render(tree: &Tree, config: &Config) -> Vec<Doc> {
    let renderer = Renderer { tree, config };
    renderer.join_children(tree.root(), true)
}

struct Renderer<'a> {
    tree: &'a Tree,
    config: &'a Config,
}

impl Renderer<'_> {
    /// Inline content whose surrounding whitespace is meaningful: text,
    /// statements, and inline-display elements.
    fn space_sensitive(&self, node: &Node) -> bool {
        node.display.is_inline()
    }

    fn force_hard(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        if self
            .tree
            .children(id)
            .iter()
            .any(|c| !self.space_sensitive(self.tree.node(*c)))
        {
            return true;
        }
        if self.config.line_break_after_multiline_tag && node.syntax == Syntax::Element {
            let open_width = node.name.len() + node.attrs_raw.len() + 2;
            if open_width > self.config.max_line_length {
                return true;
            }
        }
        false
    }

    fn join_children(&self, id: NodeId, hard: bool) -> Vec<Doc> {
        self.join_nodes(self.tree.children(id), hard)
    }

    /// Render a sibling run with separators derived from the source
    /// whitespace markers.
    fn join_nodes(&self, kids: &[NodeId], hard: bool) -> Vec<Doc> {
        let mut out = Vec::new();
        for (i, &kid) in kids.iter().enumerate() {
            out.extend(self.node_docs(kid));
            if i + 1 == kids.len() {
                break;
            }
            let prev = self.tree.node(kid);
            let next = self.tree.node(kids[i + 1]);
            let inline_pair = self.space_sensitive(prev) && self.space_sensitive(next);
            if inline_pair {
                if prev.props.has(tags::Props::TRAILING_SPACE)
                    || prev.props.has(tags::Props::TRAILING_BREAK)
                {
                    out.push(Doc::Line);
                }
                // No separator in the source: the nodes stay glued.
            } else if hard {
                out.push(Doc::HardLine);
                if self.config.preserve_blank_lines && prev.blank_lines > 0 {
                    let extra = (prev.blank_lines as usize).min(self.config.max_blank_lines);
                    for _ in 0..extra {
                        out.push(Doc::HardLine);
                    }
                }
            } else if prev.props.has(tags::Props::TRAILING_SPACE)
                || prev.props.has(tags::Props::TRAILING_BREAK)
            {
                out.push(Doc::Line);
            }
        }
        out
    }

    fn node_docs(&self, id: NodeId) -> Vec<Doc> {
        let node = self.tree.node(id);
        match node.syntax {
            Syntax::Root => self.join_children(id, true),
            Syntax::Text => self.text_docs(node),
            Syntax::Element => self.element_docs(id),
            Syntax::PercentBlock
            | Syntax::CurlyBlock
            | Syntax::CurlyRawBlock
            | Syntax::CurlyKeywordBlock => self.block_docs(id),
            Syntax::PercentStatement
            | Syntax::CurlyStatement
            | Syntax::CurlyTriple
            | Syntax::CurlyEscaped => vec![Doc::text(self.statement_text(node))],
            Syntax::Comment
            | Syntax::PercentComment
            | Syntax::PercentRaw
            | Syntax::HashComment
            | Syntax::CurlyComment => vec![Doc::text(node.text.clone())],
            Syntax::Doctype => vec![Doc::text(doctype_text(&node.text))],
            Syntax::Pi | Syntax::Verbatim => vec![Doc::text(node.text.clone())],
        }
    }

    fn text_docs(&self, node: &Node) -> Vec<Doc> {
        if self.config.preserve_leading_space {
            return vec![Doc::text(node.text.clone())];
        }
        vec![Doc::Fill(
            node.text.split_whitespace().map(String::from).collect(),
        )]
    }

    fn element_docs(&self, id: NodeId) -> Vec<Doc> {
        let node = self.tree.node(id);
        if node.stray() {
            return vec![Doc::text(format!("</{}>", node.name))];
        }

        let mut docs = self.open_tag_docs(node);
        if node.void || node.self_closing {
            return docs;
        }
        let close = format!("</{}>", node.name);

        if node.raw_text {
            let body: String = self
                .tree
                .children(id)
                .iter()
                .map(|c| self.tree.node(*c).text.as_str())
                .collect();
            if body.trim().is_empty() {
                if node.closed() {
                    docs.push(Doc::text(close));
                }
                return docs;
            }
            docs.push(Doc::HardLine);
            docs.push(Doc::Opaque {
                raw: body,
                hint: tags::raw_text_hint(&node.name.to_ascii_lowercase()),
            });
            if node.closed() {
                docs.push(Doc::HardLine);
                docs.push(Doc::text(close));
            }
            return docs;
        }

        if node.pre {
            self.verbatim_children(id, &mut docs);
            if node.closed() {
                docs.push(Doc::text(close));
            }
            return docs;
        }

        if self.tree.children(id).is_empty() {
            if node.closed() {
                if node.display.is_inline()
                    && (node.props.has(tags::Props::PAD_LEFT)
                        || node.props.has(tags::Props::PAD_RIGHT))
                {
                    docs.push(Doc::text(" ".to_string()));
                }
                docs.push(Doc::text(close));
            }
            return docs;
        }

        let hard = self.force_hard(id);
        let kids = self.join_children(id, hard);
        if hard {
            let mut body = vec![Doc::HardLine];
            body.extend(kids);
            docs.push(Doc::Indent(body));
            docs.push(Doc::HardLine);
            if node.closed() {
                docs.push(Doc::text(close));
            }
            return docs;
        }
        if node.display.is_inline() {
            // Inline elements never introduce break points at their edges,
            // but meaningful whitespace just inside the tags collapses to a
            // single space rather than disappearing.
            if node.props.has(tags::Props::PAD_LEFT) {
                docs.push(Doc::text(" ".to_string()));
            }
            docs.extend(kids);
            if node.closed() {
                if node.props.has(tags::Props::PAD_RIGHT) {
                    docs.push(Doc::text(" ".to_string()));
                }
                docs.push(Doc::text(close));
            }
            return docs;
        }
        let mut body = vec![Doc::soft_line()];
        body.extend(kids);
        docs.push(Doc::Indent(body));
        docs.push(Doc::soft_line());
        if node.closed() {
            docs.push(Doc::text(close));
        }
        vec![Doc::Group(docs)]
    }

    /// Children of a `pre`-like element, echoed with their exact source
    /// whitespace.
    fn verbatim_children(&self, id: NodeId, out: &mut Vec<Doc>) {
        for &kid in self.tree.children(id) {
            let node = self.tree.node(kid);
            match node.syntax {
                Syntax::Text => out.push(Doc::text(node.text.clone())),
                Syntax::Element => {
                    if node.stray() {
                        out.push(Doc::text(format!("</{}>", node.name)));
                        continue;
                    }
                    out.extend(self.open_tag_docs(node));
                    if !node.void && !node.self_closing {
                        self.verbatim_children(kid, out);
                        if node.closed() {
                            out.push(Doc::text(format!("</{}>", node.name)));
                        }
                    }
                }
                _ => out.extend(self.node_docs(kid)),
            }
        }
    }

    fn block_docs(&self, id: NodeId) -> Vec<Doc> {
        let node = self.tree.node(id);
        if node.stray() {
            return vec![Doc::text(self.block_close_text(
                node,
                node.open_left,
                node.open_right,
            ))];
        }
        let open = Doc::text(self.block_open_text(node));
        let close = self.block_close_text(node, node.close_left, node.close_right);

        if self.tree.children(id).is_empty() {
            let mut docs = vec![open];
            if node.closed() {
                docs.push(Doc::text(close));
            }
            return docs;
        }

        if self.force_hard(id) {
            let mut docs = vec![open];
            self.push_block_body(id, &mut docs);
            docs.push(Doc::HardLine);
            if node.closed() {
                docs.push(Doc::text(close));
            }
            return docs;
        }
        let mut group = vec![open];
        let mut body = vec![Doc::soft_line()];
        body.extend(self.join_children(id, false));
        group.push(Doc::Indent(body));
        group.push(Doc::soft_line());
        if node.closed() {
            group.push(Doc::text(close));
        }
        vec![Doc::Group(group)]
    }

    /// Broken-out block body. Branch keywords (`{% else %}`, `{% elif x %}`,
    /// `{% empty %}`, `{% plural %}`, `{{ else }}`) align with the block's
    /// own delimiters and restart the indented segment after them.
    fn push_block_body(&self, id: NodeId, docs: &mut Vec<Doc>) {
        let kids = self.tree.children(id);
        let mut seg_start = 0;
        for (i, &kid) in kids.iter().enumerate() {
            if !self.is_branch_statement(kid) {
                continue;
            }
            self.push_block_segment(&kids[seg_start..i], docs);
            docs.push(Doc::HardLine);
            docs.push(Doc::text(self.statement_text(self.tree.node(kid))));
            seg_start = i + 1;
        }
        self.push_block_segment(&kids[seg_start..], docs);
    }

    fn push_block_segment(&self, seg: &[NodeId], docs: &mut Vec<Doc>) {
        if seg.is_empty() {
            return;
        }
        let mut body = vec![Doc::HardLine];
        body.extend(self.join_nodes(seg, true));
        docs.push(Doc::Indent(body));
    }

    fn is_branch_statement(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        if !matches!(
            node.syntax,
            Syntax::PercentStatement | Syntax::CurlyStatement
        ) {
            return false;
        }
        node.text
            .split_whitespace()
            .next()
            .is_some_and(tags::is_branch_keyword)
    }

    fn block_open_text(&self, node: &Node) -> String {
        let args = collapse(&node.args);
        match node.syntax {
            Syntax::PercentBlock => {
                let head = if args.is_empty() {
                    node.name.clone()
                } else {
                    format!("{} {}", node.name, args)
                };
                format!(
                    "{{%{} {} {}%}}",
                    marker(node.open_left),
                    head,
                    marker(node.open_right)
                )
            }
            Syntax::CurlyBlock => {
                if args.is_empty() {
                    format!("{{{{#{}}}}}", node.name)
                } else {
                    format!("{{{{#{} {}}}}}", node.name, args)
                }
            }
            Syntax::CurlyRawBlock => {
                if args.is_empty() {
                    format!("{{{{{{{{{}}}}}}}}}", node.name)
                } else {
                    format!("{{{{{{{{{} {}}}}}}}}}", node.name, args)
                }
            }
            Syntax::CurlyKeywordBlock => {
                let head = if args.is_empty() {
                    node.name.clone()
                } else {
                    format!("{} {}", node.name, args)
                };
                format!(
                    "{{{{{} {} {}}}}}",
                    marker(node.open_left),
                    head,
                    marker(node.open_right)
                )
            }
            _ => unreachable!("not a block syntax: {:?}", node.syntax),
        }
    }

    fn block_close_text(&self, node: &Node, left: Option<char>, right: Option<char>) -> String {
        match node.syntax {
            Syntax::PercentBlock => format!(
                "{{%{} end{} {}%}}",
                marker(left),
                node.name,
                marker(right)
            ),
            Syntax::CurlyBlock => format!("{{{{/{}}}}}", node.name),
            Syntax::CurlyRawBlock => format!("{{{{{{{{/{}}}}}}}}}", node.name),
            Syntax::CurlyKeywordBlock => {
                format!("{{{{{} end {}}}}}", marker(left), marker(right))
            }
            _ => unreachable!("not a block syntax: {:?}", node.syntax),
        }
    }

    fn statement_text(&self, node: &Node) -> String {
        match node.syntax {
            // Echoed exactly as written.
            Syntax::CurlyEscaped => node.text.clone(),
            Syntax::PercentStatement => {
                let inner = collapse(&node.text);
                format!(
                    "{{%{} {} {}%}}",
                    marker(node.open_left),
                    inner,
                    marker(node.open_right)
                )
            }
            Syntax::CurlyStatement => {
                let inner = collapse(&node.text);
                let pad = if self.config.profile.pads_statements() {
                    " "
                } else {
                    ""
                };
                format!(
                    "{{{{{}{pad}{inner}{pad}{}}}}}",
                    marker(node.open_left),
                    marker(node.open_right)
                )
            }
            Syntax::CurlyTriple => {
                let inner = collapse(&node.text);
                let pad = if self.config.profile.pads_statements() {
                    " "
                } else {
                    ""
                };
                format!("{{{{{{{pad}{inner}{pad}}}}}}}")
            }
            _ => unreachable!("not a statement syntax: {:?}", node.syntax),
        }
    }

    fn open_tag_docs(&self, node: &Node) -> Vec<Doc> {
        let closer = if node.void {
            if self.config.close_void_tags {
                " />"
            } else {
                ">"
            }
        } else if node.self_closing {
            " />"
        } else {
            ">"
        };
        if node.attrs_raw.is_empty() {
            return vec![Doc::text(format!("<{}{closer}", node.name))];
        }
        let mut attr_docs = Vec::new();
        for item in attrs::parse(&node.attrs_raw) {
            self.push_attr_docs(&item, &mut attr_docs);
        }
        vec![Doc::Group(vec![
            Doc::text(format!("<{}", node.name)),
            Doc::Indent(attr_docs),
            Doc::text(closer.to_string()),
        ])]
    }

    fn push_attr_docs(&self, item: &AttrItem, out: &mut Vec<Doc>) {
        match item {
            AttrItem::Expr(raw) => {
                out.push(Doc::Line);
                out.push(Doc::text(raw.clone()));
            }
            AttrItem::Pair { name, value } => {
                let folded = self.fold_attr_name(name);
                let rendered = match value {
                    None => folded.clone(),
                    Some(v) => {
                        let collapsed = collapse(&v.raw);
                        match v.quote {
                            Some(q) => format!("{folded}={q}{collapsed}{q}"),
                            None => format!("{folded}={collapsed}"),
                        }
                    }
                };
                if rendered.chars().count() <= self.config.max_attribute_length {
                    out.push(Doc::Line);
                    out.push(Doc::text(rendered));
                    return;
                }
                // Over budget: the attribute takes its own line, and
                // list-valued attributes wrap one segment per line.
                out.push(Doc::HardLine);
                match (folded.as_str(), value) {
                    ("style", Some(v)) if v.quote.is_some() => {
                        self.push_segmented(out, &folded, v, ';')
                    }
                    ("srcset" | "sizes", Some(v)) if v.quote.is_some() => {
                        self.push_segmented(out, &folded, v, ',')
                    }
                    ("class", Some(v)) if v.quote.is_some() => {
                        let q = v.quote.expect("guarded");
                        out.push(Doc::text(format!("{folded}={q}")));
                        out.push(Doc::Fill(
                            v.raw.split_whitespace().map(String::from).collect(),
                        ));
                        out.push(Doc::text(q.to_string()));
                    }
                    _ => out.push(Doc::text(rendered)),
                }
            }
        }
    }

    fn push_segmented(&self, out: &mut Vec<Doc>, name: &str, value: &AttrValue, sep: char) {
        let q = value.quote.expect("segmented values are quoted");
        let segments: Vec<String> = value
            .raw
            .split(sep)
            .map(collapse)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() <= 1 {
            out.push(Doc::text(format!("{name}={q}{}{q}", collapse(&value.raw))));
            return;
        }
        // `style` keeps a terminator on every segment; comma lists keep
        // the separator on all but the last.
        let tail = |last: bool| match sep {
            ';' => ";",
            _ if last => "",
            _ => ",",
        };
        out.push(Doc::text(format!(
            "{name}={q}{}{}",
            segments[0],
            tail(segments.len() == 1)
        )));
        let mut cont = Vec::new();
        for (i, seg) in segments[1..].iter().enumerate() {
            cont.push(Doc::HardLine);
            cont.push(Doc::text(format!(
                "{seg}{}",
                tail(i + 2 == segments.len())
            )));
        }
        out.push(Doc::Indent(cont));
        out.push(Doc::text(q.to_string()));
    }

    /// Lowercase an attribute name only when it is a known HTML attribute.
    /// Case-sensitive names (SVG `viewBox`, framework bindings) pass
    /// through as written.
    fn fold_attr_name(&self, name: &str) -> String {
        if self.config.ignore_case {
            return name.to_string();
        }
        let lower = name.to_ascii_lowercase();
        if tags::is_html_attribute(&lower) {
            lower
        } else {
            name.to_string()
        }
    }
}

fn doctype_text(inner: &str) -> String {
    let mut words = inner.splitn(2, char::is_whitespace);
    let _keyword = words.next().unwrap_or_default();
    match words.next().map(str::trim) {
        Some(rest) if !rest.is_empty() => format!("<!DOCTYPE {rest}>"),
        _ => "<!DOCTYPE>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::flatten;
    use crate::tokenizer::tokenize;
    use crate::tree::build;
    use crate::writer::{Services, write};

    fn fmt(input: &str) -> String {
        fmt_with(input, &Config::default())
    }

    fn fmt_with(input: &str, config: &Config) -> String {
        let tree = build(tokenize(input, config), config);
        let docs = render(&tree, config);
        let flat = flatten(docs, config.max_line_length);
        write(&flat, config, &Services::default())
    }

    #[test]
    fn block_parent_breaks_around_element_children() {
        assert_eq!(fmt("<div><p>hi</p></div>"), "<div>\n    <p>hi</p>\n</div>");
    }

    #[test]
    fn void_siblings_each_take_a_line() {
        assert_eq!(fmt("<img><meta>"), "<img>\n<meta>");
        let config = Config {
            close_void_tags: true,
            ..Config::default()
        };
        assert_eq!(fmt_with("<img><meta>", &config), "<img />\n<meta />");
    }

    #[test]
    fn empty_template_block_stays_inline() {
        assert_eq!(fmt("{% if a %}{% endif %}"), "{% if a %}{% endif %}");
    }

    #[test]
    fn long_attribute_gets_its_own_line() {
        let value = "v".repeat(80);
        let input = format!("<div class=\"{value}\">x</div>");
        let out = fmt(&input);
        assert!(
            out.starts_with("<div\n    class=\""),
            "expected the attribute on its own indented line, got: {out}"
        );
    }

    #[test]
    fn pre_contents_are_untouched() {
        let input = "<pre>\n  a\n   b\n</pre>";
        assert_eq!(fmt(input), input);
    }

    #[test]
    fn inline_elements_glue_to_surrounding_text() {
        assert_eq!(fmt("a<b>x</b>c"), "a<b>x</b>c");
        assert_eq!(fmt("a <b>x</b> c"), "a <b>x</b> c");
    }

    #[test]
    fn inline_edge_whitespace_collapses_inside_the_tag() {
        assert_eq!(fmt("<b>x </b>y"), "<b>x </b>y");
        assert_eq!(fmt("<b> x</b>y"), "<b> x</b>y");
        assert_eq!(fmt("a<b> x </b>c"), "a<b> x </b>c");
        assert_eq!(fmt("a<b> </b>c"), "a<b> </b>c");
    }

    #[test]
    fn camel_case_attribute_names_survive() {
        assert_eq!(
            fmt("<svg viewBox=\"0 0 10 10\"></svg>"),
            "<svg viewBox=\"0 0 10 10\"></svg>"
        );
        assert_eq!(fmt("<input TYPE=\"text\">"), "<input type=\"text\">");
    }

    #[test]
    fn statement_padding_follows_profile() {
        assert_eq!(fmt("{{ name }}"), "{{ name }}");
        assert_eq!(fmt("{{name}}"), "{{ name }}");
        let config = Config {
            profile: settings::Profile::Handlebars,
            ..Config::default()
        };
        assert_eq!(fmt_with("{{ name }}", &config), "{{name}}");
    }

    #[test]
    fn spaceless_markers_round_trip() {
        assert_eq!(
            fmt("{%- if x -%}{%- endif -%}"),
            "{%- if x -%}{%- endif -%}"
        );
    }

    #[test]
    fn handlebars_blocks_carry_no_padding() {
        let config = Config {
            profile: settings::Profile::Handlebars,
            ..Config::default()
        };
        assert_eq!(
            fmt_with("{{#each xs}}{{name}}{{/each}}", &config),
            "{{#each xs}}{{name}}{{/each}}"
        );
    }

    #[test]
    fn stray_close_is_echoed() {
        assert_eq!(fmt("<p>a</p></div>"), "<p>a</p>\n</div>");
    }

    #[test]
    fn doctype_is_normalized() {
        assert_eq!(fmt("<!doctype html>"), "<!DOCTYPE html>");
    }

    #[test]
    fn script_body_passes_through() {
        let input = "<script>\nlet x = 1;\n</script>";
        assert_eq!(fmt(input), "<script>\nlet x = 1;\n</script>");
    }

    #[test]
    fn blank_lines_survive_when_preserved() {
        let config = Config {
            preserve_blank_lines: true,
            ..Config::default()
        };
        assert_eq!(
            fmt_with("<img>\n\n<meta>", &config),
            "<img>\n\n<meta>"
        );
        // Runs longer than max_blank_lines are clamped.
        assert_eq!(
            fmt_with("<img>\n\n\n\n\n<meta>", &config),
            "<img>\n\n\n<meta>"
        );
    }
}
