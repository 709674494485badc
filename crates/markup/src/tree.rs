//! Arena-backed document tree built from tokenizer events.
//!
//! Nodes live in one `Vec` and refer to each other by index. The builder
//! keeps an open-construct stack and is tolerant of mismatched input: a
//! close that never finds its opener is kept as a childless node where it
//! stood, and a markup end tag never pops past an open template block, so a
//! tag opened in one template branch and closed in another cannot tear the
//! template structure apart.

use crate::tags::{self, Display, Props, Syntax};
use crate::tokenizer::Event;
use settings::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub syntax: Syntax,
    /// Element or template block name; empty for text-like nodes.
    pub name: String,
    /// Template block argument text (`x in xs` of `{% for x in xs %}`).
    pub args: String,
    /// Raw attribute region of an element's start tag.
    pub attrs_raw: String,
    /// Payload for text, comments, statements, and pass-through spans.
    pub text: String,
    pub open_left: Option<char>,
    pub open_right: Option<char>,
    pub close_left: Option<char>,
    pub close_right: Option<char>,
    pub props: Props,
    /// Blank lines that separated this node from its next sibling.
    pub blank_lines: u8,
    pub self_closing: bool,
    pub void: bool,
    pub display: Display,
    /// Whitespace inside must survive byte for byte.
    pub pre: bool,
    /// Contents are raw text delegated to an external formatter.
    pub raw_text: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(syntax: Syntax) -> Self {
        Node {
            syntax,
            name: String::new(),
            args: String::new(),
            attrs_raw: String::new(),
            text: String::new(),
            open_left: None,
            open_right: None,
            close_left: None,
            close_right: None,
            props: Props::default(),
            blank_lines: 0,
            self_closing: false,
            void: false,
            display: Display::Inline,
            pre: false,
            raw_text: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn closed(&self) -> bool {
        self.props.has(Props::CLOSED)
    }

    pub fn stray(&self) -> bool {
        self.props.has(Props::STRAY)
    }
}

pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }
}

/// Build a tree from an event stream.
pub fn build(events: Vec<Event>, config: &Config) -> Tree {
    let mut builder = Builder {
        config,
        nodes: vec![Node::new(Syntax::Root)],
        stack: vec![NodeId(0)],
        most_recent: None,
    };
    for event in events {
        builder.on_event(event);
    }
    Tree {
        nodes: builder.nodes,
        root: NodeId(0),
    }
}

struct Builder<'a> {
    config: &'a Config,
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
    /// The node that trailing whitespace in the source attaches to.
    most_recent: Option<NodeId>,
}

impl Builder<'_> {
    fn top(&self) -> NodeId {
        *self.stack.last().expect("root is never popped")
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn append(&mut self, mut node: Node) -> NodeId {
        let parent = self.top();
        node.parent = Some(parent);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        self.most_recent = Some(id);
        id
    }

    /// Whether the cursor is inside a whitespace-preserving element
    /// (`pre`-like, or a raw-text body headed to an external formatter).
    fn in_pre(&self) -> bool {
        self.stack
            .iter()
            .any(|id| self.node(*id).pre || self.node(*id).raw_text)
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Text { raw } => self.on_text(&raw),
            Event::EntityRef { raw } => self.on_text_chunk(&raw),
            Event::StartTag {
                name,
                attrs_raw,
                self_closing,
            } => self.on_start_tag(name, attrs_raw, self_closing),
            Event::EndTag { name } => self.on_end_tag(&name),
            Event::BlockOpen {
                syntax,
                name,
                args,
                left,
                right,
            } => {
                let mut node = Node::new(syntax);
                node.name = name;
                node.args = args;
                node.open_left = left;
                node.open_right = right;
                node.display = Display::Block;
                let id = self.append(node);
                self.stack.push(id);
            }
            Event::BlockClose {
                syntax,
                name,
                left,
                right,
            } => self.on_block_close(syntax, &name, left, right),
            Event::Statement {
                syntax,
                raw,
                left,
                right,
            } => {
                let mut node = Node::new(syntax);
                node.text = raw;
                node.open_left = left;
                node.open_right = right;
                self.append(node);
            }
            Event::Comment { syntax, raw } => {
                let mut node = Node::new(syntax);
                node.text = raw;
                node.display = Display::Block;
                self.append(node);
            }
            Event::Doctype { raw } => {
                let mut node = Node::new(Syntax::Doctype);
                node.text = raw;
                node.display = Display::Block;
                self.append(node);
            }
            Event::Pi { raw } => {
                let mut node = Node::new(Syntax::Pi);
                node.text = raw;
                node.display = Display::Block;
                self.append(node);
            }
            Event::Verbatim { raw } => {
                let mut node = Node::new(Syntax::Verbatim);
                node.text = raw;
                node.display = Display::Block;
                self.append(node);
            }
        }
    }

    fn on_text(&mut self, raw: &str) {
        if self.in_pre() {
            self.on_text_chunk(raw);
            return;
        }
        let lead_len = raw.len() - raw.trim_start().len();
        if lead_len > 0 {
            self.mark_trailing_whitespace(&raw[..lead_len]);
        }
        let rest = &raw[lead_len..];
        let body = rest.trim_end();
        if !body.is_empty() {
            self.on_text_chunk(body);
        }
        if rest.len() > body.len() {
            self.mark_trailing_whitespace(&rest[body.len()..]);
        }
    }

    fn mark_trailing_whitespace(&mut self, ws: &str) {
        let Some(id) = self.most_recent else {
            // Leading whitespace before the first construct carries nothing.
            return;
        };
        // Right after a container opens, the most recent node is the
        // container itself: the whitespace sits inside it, before any
        // child, not between it and a sibling.
        if self.stack.last() == Some(&id) {
            self.node_mut(id).props.set(Props::PAD_LEFT);
            return;
        }
        let breaks = ws.bytes().filter(|b| *b == b'\n').count();
        let node = self.node_mut(id);
        node.props.set(Props::TRAILING_SPACE);
        if breaks > 0 {
            node.props.set(Props::TRAILING_BREAK);
        }
        if breaks > 1 {
            node.blank_lines = node.blank_lines.max((breaks - 1).min(255) as u8);
        }
    }

    /// Move a last child's trailing whitespace onto the closing container:
    /// it sits just before the close tag, inside the element, and has no
    /// next sibling to separate from.
    fn absorb_closing_whitespace(&mut self, id: NodeId) {
        let padded = self.node(id).children.last().copied().is_some_and(|last| {
            let props = self.node(last).props;
            props.has(Props::TRAILING_SPACE) || props.has(Props::TRAILING_BREAK)
        });
        if padded {
            self.node_mut(id).props.set(Props::PAD_RIGHT);
        }
    }

    /// Append a text run, merging with an immediately preceding text node
    /// when no whitespace was recorded in between.
    fn on_text_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let top = self.top();
        if let Some(id) = self.most_recent {
            let mergeable = {
                let node = self.node(id);
                node.syntax == Syntax::Text
                    && node.parent == Some(top)
                    && (self.in_pre()
                        || (!node.props.has(Props::TRAILING_SPACE)
                            && !node.props.has(Props::TRAILING_BREAK)))
            };
            if mergeable {
                self.node_mut(id).text.push_str(chunk);
                return;
            }
        }
        let mut node = Node::new(Syntax::Text);
        node.text = chunk.to_string();
        self.append(node);
    }

    fn on_start_tag(&mut self, name: String, attrs_raw: String, self_closing: bool) {
        let lower = name.to_ascii_lowercase();
        let mut node = Node::new(Syntax::Element);
        node.void = tags::is_void_element(&lower);
        node.display = tags::default_display(&lower);
        node.pre = tags::is_indentation_sensitive(&lower);
        node.raw_text = tags::is_raw_text(&lower, &self.config.custom_html);
        node.self_closing = self_closing;
        node.name = name;
        node.attrs_raw = attrs_raw;
        let void = node.void;
        let id = self.append(node);
        if !void && !self_closing {
            self.stack.push(id);
        }
    }

    fn on_end_tag(&mut self, name: &str) {
        // Search for the opener, stopping at any open template block: a
        // markup close must not tear template structure apart.
        let mut found = None;
        for idx in (1..self.stack.len()).rev() {
            let node = self.node(self.stack[idx]);
            if node.syntax == Syntax::Element && node.name.eq_ignore_ascii_case(name) {
                found = Some(idx);
                break;
            }
            if node.syntax.is_template_block() {
                break;
            }
        }
        match found {
            Some(idx) => {
                let popped = self.stack.len() - idx;
                if popped > 1 {
                    log::trace!(
                        target: "markup.tree",
                        "</{name}> implicitly closes {} open element(s)",
                        popped - 1
                    );
                }
                let id = self.stack[idx];
                self.stack.truncate(idx);
                self.node_mut(id).props.set(Props::CLOSED);
                self.absorb_closing_whitespace(id);
                self.most_recent = Some(id);
            }
            None => {
                log::trace!(target: "markup.tree", "stray close tag </{name}> kept in place");
                let mut node = Node::new(Syntax::Element);
                node.display = tags::default_display(&name.to_ascii_lowercase());
                node.name = name.to_string();
                node.props.set(Props::STRAY);
                self.append(node);
            }
        }
    }

    fn on_block_close(
        &mut self,
        syntax: Syntax,
        name: &str,
        left: Option<char>,
        right: Option<char>,
    ) {
        // A template close pops past anything, elements included; unclosed
        // elements simply stay where they were opened.
        let mut found = None;
        for idx in (1..self.stack.len()).rev() {
            let node = self.node(self.stack[idx]);
            if node.syntax != syntax {
                continue;
            }
            if name.is_empty() || node.name.eq_ignore_ascii_case(name) {
                found = Some(idx);
                break;
            }
        }
        match found {
            Some(idx) => {
                let popped = self.stack.len() - idx;
                if popped > 1 {
                    log::trace!(
                        target: "markup.tree",
                        "template close {syntax:?}/{name} pops {} open construct(s)",
                        popped - 1
                    );
                }
                let id = self.stack[idx];
                self.stack.truncate(idx);
                let node = self.node_mut(id);
                node.props.set(Props::CLOSED);
                node.close_left = left;
                node.close_right = right;
                self.absorb_closing_whitespace(id);
                self.most_recent = Some(id);
            }
            None => {
                log::trace!(target: "markup.tree", "stray template close {syntax:?}/{name}");
                let mut node = Node::new(syntax);
                node.name = name.to_string();
                node.open_left = left;
                node.open_right = right;
                node.props.set(Props::STRAY);
                self.append(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse(input: &str) -> Tree {
        let config = Config::default();
        build(tokenize(input, &config), &config)
    }

    fn child_names(tree: &Tree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|c| {
                let n = tree.node(*c);
                if n.syntax == Syntax::Text {
                    format!("#{}", n.text)
                } else {
                    n.name.clone()
                }
            })
            .collect()
    }

    #[test]
    fn nests_matched_elements() {
        let tree = parse("<div><p>hi</p></div>");
        let root_children = tree.children(tree.root());
        assert_eq!(root_children.len(), 1);
        let div = tree.node(root_children[0]);
        assert_eq!(div.name, "div");
        assert!(div.closed());
        assert_eq!(child_names(&tree, root_children[0]), ["p"]);
    }

    #[test]
    fn void_elements_take_no_children() {
        let tree = parse("<img><meta>");
        assert_eq!(child_names(&tree, tree.root()), ["img", "meta"]);
        for id in tree.children(tree.root()) {
            assert!(tree.node(*id).void);
            assert!(tree.children(*id).is_empty());
        }
    }

    #[test]
    fn stray_close_is_kept_as_childless_sibling() {
        let tree = parse("<p>a</p></div><p>b</p>");
        let names = child_names(&tree, tree.root());
        assert_eq!(names, ["p", "div", "p"]);
        let stray = tree.node(tree.children(tree.root())[1]);
        assert!(stray.stray(), "expected stray close node, got: {stray:?}");
        assert!(tree.children(tree.children(tree.root())[1]).is_empty());
    }

    #[test]
    fn markup_close_does_not_pop_past_template_block() {
        let tree = parse("{% if x %}<div>{% else %}</div>{% endif %}");
        let root_children = tree.children(tree.root());
        assert_eq!(root_children.len(), 1, "endif must close the if block");
        let if_block = tree.node(root_children[0]);
        assert_eq!(if_block.name, "if");
        assert!(if_block.closed(), "endif must be honored");
        // The div was opened inside the block and stays there.
        assert_eq!(child_names(&tree, root_children[0]), ["div"]);
        let div_id = tree.children(root_children[0])[0];
        let div = tree.node(div_id);
        assert!(div.closed(), "</div> closes the div inside its branch");
        assert_eq!(tree.children(div_id).len(), 1);
        let else_stmt = tree.node(tree.children(div_id)[0]);
        assert!(
            matches!(else_stmt.syntax, Syntax::PercentStatement),
            "expected else to stay a statement, got: {else_stmt:?}"
        );
    }

    #[test]
    fn template_close_pops_unclosed_elements() {
        let tree = parse("{% for x in xs %}<li>{{ x }}{% endfor %}");
        let for_id = tree.children(tree.root())[0];
        let for_block = tree.node(for_id);
        assert_eq!(for_block.name, "for");
        assert!(for_block.closed());
        let li_id = tree.children(for_id)[0];
        let li = tree.node(li_id);
        assert_eq!(li.name, "li");
        assert!(!li.closed(), "unclosed li stays unclosed");
    }

    #[test]
    fn trailing_whitespace_becomes_props() {
        let tree = parse("a <b>x</b>\n\nc");
        let root_children = tree.children(tree.root());
        assert_eq!(root_children.len(), 3);
        let a = tree.node(root_children[0]);
        assert_eq!(a.text, "a");
        assert!(a.props.has(Props::TRAILING_SPACE));
        assert!(!a.props.has(Props::TRAILING_BREAK));
        let b = tree.node(root_children[1]);
        assert!(b.props.has(Props::TRAILING_BREAK));
        assert_eq!(b.blank_lines, 1);
    }

    #[test]
    fn inline_edge_whitespace_becomes_pads() {
        let tree = parse("<b> x</b>y <i>z </i>");
        let root_children = tree.children(tree.root());
        let b = tree.node(root_children[0]);
        assert!(b.props.has(Props::PAD_LEFT), "got: {b:?}");
        assert!(!b.props.has(Props::TRAILING_SPACE), "got: {b:?}");
        let i = tree.node(root_children[2]);
        assert!(i.props.has(Props::PAD_RIGHT), "got: {i:?}");
    }

    #[test]
    fn pre_contents_keep_exact_whitespace() {
        let tree = parse("<pre>  a\n   b</pre>");
        let pre_id = tree.children(tree.root())[0];
        assert!(tree.node(pre_id).pre);
        let text = tree.node(tree.children(pre_id)[0]);
        assert_eq!(text.text, "  a\n   b");
    }

    #[test]
    fn entity_reference_merges_into_text() {
        let tree = parse("a&amp;b");
        let text = tree.node(tree.children(tree.root())[0]);
        assert_eq!(text.text, "a&amp;b");
    }

    #[test]
    fn extends_and_include_are_statements() {
        let tree = parse("{% extends \"base.html\" %}{% block content %}{% endblock %}");
        let root_children = tree.children(tree.root());
        assert_eq!(root_children.len(), 2);
        let extends = tree.node(root_children[0]);
        assert!(matches!(extends.syntax, Syntax::PercentStatement));
        assert!(tree.children(root_children[0]).is_empty());
        let block = tree.node(root_children[1]);
        assert_eq!(block.name, "block");
        assert!(block.closed());
    }

    #[test]
    fn eof_leaves_unclosed_elements_unclosed() {
        let tree = parse("<div><p>text");
        let div_id = tree.children(tree.root())[0];
        assert!(!tree.node(div_id).closed());
        let p_id = tree.children(div_id)[0];
        assert!(!tree.node(p_id).closed());
    }
}
