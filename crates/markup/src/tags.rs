//! Static semantics for markup names and template constructs.
//!
//! Everything here is a plain `match` over `&str`: the tables are small,
//! fixed, and hot, and a match compiles to a jump that needs no lazy
//! statics or hashing.

/// Construct kind attached to every event and tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Syntax {
    Root,
    Text,
    Element,
    Comment,
    Doctype,
    /// `<? ... >` processing instruction, echoed verbatim.
    Pi,
    /// `{% name %} ... {% endname %}`
    PercentBlock,
    /// `{% name %}` with no closing form.
    PercentStatement,
    /// `{% comment %} ... {% endcomment %}`, kept as one opaque span.
    PercentComment,
    /// `{% verbatim %}` / `{% raw %}` spans, kept opaque (their bodies may
    /// contain delimiter text that must not be parsed).
    PercentRaw,
    /// `{# ... #}`
    HashComment,
    /// `{{ expr }}`
    CurlyStatement,
    /// `{{{ expr }}}`
    CurlyTriple,
    /// `{{! ... }}` or `{{!-- ... --}}`
    CurlyComment,
    /// `{{#name}} ... {{/name}}`
    CurlyBlock,
    /// `{{{{name}}}} ... {{{{/name}}}}`
    CurlyRawBlock,
    /// `{{ if ... }} ... {{ end }}` (go-template keyword blocks)
    CurlyKeywordBlock,
    /// `\{{ expr }}`, an escaped expression echoed as-is.
    CurlyEscaped,
    /// Formatter-off region, echoed byte for byte.
    Verbatim,
}

impl Syntax {
    /// Constructs that open a scope and expect a matching close.
    pub fn is_template_block(self) -> bool {
        matches!(
            self,
            Syntax::PercentBlock
                | Syntax::CurlyBlock
                | Syntax::CurlyRawBlock
                | Syntax::CurlyKeywordBlock
        )
    }
}

/// Node-level bit flags.
///
/// Trailing whitespace markers record what separated a node from its next
/// sibling in the source; the pad markers record whitespace at the inner
/// edges of a container, just after its open tag or just before its close
/// tag; the stray flag marks a close tag that never found its opener and is
/// re-emitted where it stood.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Props(u8);

impl Props {
    pub const TRAILING_SPACE: Props = Props(1);
    pub const TRAILING_BREAK: Props = Props(1 << 1);
    pub const CLOSED: Props = Props(1 << 2);
    pub const STRAY: Props = Props(1 << 3);
    pub const PAD_LEFT: Props = Props(1 << 4);
    pub const PAD_RIGHT: Props = Props(1 << 5);

    pub fn set(&mut self, flag: Props) {
        self.0 |= flag.0;
    }

    pub fn has(self, flag: Props) -> bool {
        self.0 & flag.0 != 0
    }
}

/// CSS default display, reduced to what spacing decisions need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    /// `display: none` defaults (`head`, `meta`, ...). Still printed, but
    /// never whitespace-sensitive.
    Hidden,
}

impl Display {
    /// Inline content cannot gain or lose surrounding whitespace.
    pub fn is_inline(self) -> bool {
        matches!(self, Display::Inline)
    }
}

/// The HTML void elements. Unknown names are never void.
pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Default display for an element name.
///
/// Mostly the CSS defaults, with hand-maintained overrides where the
/// default would make for bad formatting: `button` and replaced elements
/// behave like inline blocks, `template`/`details`/`summary`/`dialog` and
/// the media-source elements format as blocks.
pub fn default_display(name: &str) -> Display {
    match name {
        "a" | "abbr" | "b" | "bdi" | "bdo" | "br" | "cite" | "code" | "data" | "del" | "dfn"
        | "em" | "font" | "i" | "ins" | "kbd" | "label" | "map" | "mark" | "nobr" | "output"
        | "q" | "rb" | "rp" | "rt" | "rtc" | "ruby" | "s" | "samp" | "small" | "span"
        | "strike" | "strong" | "sub" | "sup" | "time" | "tt" | "u" | "var" | "wbr" => {
            Display::Inline
        }
        "audio" | "button" | "canvas" | "embed" | "iframe" | "img" | "input" | "meter"
        | "object" | "progress" | "select" | "textarea" | "video" => Display::InlineBlock,
        "head" | "base" | "link" | "meta" | "title" | "datalist" | "area" => Display::Hidden,
        _ => Display::Block,
    }
}

/// Elements whose internal whitespace is significant and must survive
/// byte for byte.
pub fn is_indentation_sensitive(name: &str) -> bool {
    matches!(name, "pre" | "textarea" | "listing" | "plaintext" | "xmp")
}

/// Elements whose contents are raw text handed to an external formatter
/// (or passed through untouched).
pub fn is_raw_text(name: &str, custom_html: &[String]) -> bool {
    matches!(name, "script" | "style" | "svg:style")
        || custom_html.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Formatter hint for a raw-text element's delegated contents.
pub fn raw_text_hint(name: &str) -> &'static str {
    match name {
        "style" | "svg:style" => "css",
        "script" => "js",
        _ => "raw",
    }
}

/// Known HTML element names; used to decide when case folding is safe.
/// Custom elements and foreign names keep their case as written.
pub fn is_html_tag(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "address"
            | "area"
            | "article"
            | "aside"
            | "audio"
            | "b"
            | "base"
            | "bdi"
            | "bdo"
            | "big"
            | "blockquote"
            | "body"
            | "br"
            | "button"
            | "canvas"
            | "caption"
            | "center"
            | "cite"
            | "code"
            | "col"
            | "colgroup"
            | "data"
            | "datalist"
            | "dd"
            | "del"
            | "details"
            | "dfn"
            | "dialog"
            | "div"
            | "dl"
            | "dt"
            | "em"
            | "embed"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "font"
            | "footer"
            | "form"
            | "frame"
            | "frameset"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "head"
            | "header"
            | "hgroup"
            | "hr"
            | "html"
            | "i"
            | "iframe"
            | "img"
            | "input"
            | "ins"
            | "kbd"
            | "label"
            | "legend"
            | "li"
            | "link"
            | "listing"
            | "main"
            | "map"
            | "mark"
            | "menu"
            | "meta"
            | "meter"
            | "nav"
            | "nobr"
            | "noframes"
            | "noscript"
            | "object"
            | "ol"
            | "optgroup"
            | "option"
            | "output"
            | "p"
            | "param"
            | "picture"
            | "plaintext"
            | "pre"
            | "progress"
            | "q"
            | "rb"
            | "rp"
            | "rt"
            | "rtc"
            | "ruby"
            | "s"
            | "samp"
            | "script"
            | "section"
            | "select"
            | "slot"
            | "small"
            | "source"
            | "span"
            | "strike"
            | "strong"
            | "style"
            | "sub"
            | "summary"
            | "sup"
            | "table"
            | "tbody"
            | "td"
            | "template"
            | "textarea"
            | "tfoot"
            | "th"
            | "thead"
            | "time"
            | "title"
            | "tr"
            | "track"
            | "tt"
            | "u"
            | "ul"
            | "var"
            | "video"
            | "wbr"
            | "xmp"
    )
}

/// Known HTML attribute names; case folding applies only to these.
/// Anything else (SVG `viewBox`, `data-*` variants written with case,
/// framework bindings) keeps its exact case.
pub fn is_html_attribute(name: &str) -> bool {
    matches!(
        name,
        "accept"
            | "accesskey"
            | "action"
            | "align"
            | "allow"
            | "alt"
            | "async"
            | "autocapitalize"
            | "autocomplete"
            | "autofocus"
            | "autoplay"
            | "background"
            | "bgcolor"
            | "border"
            | "buffered"
            | "capture"
            | "charset"
            | "checked"
            | "cite"
            | "class"
            | "color"
            | "cols"
            | "colspan"
            | "content"
            | "contenteditable"
            | "controls"
            | "coords"
            | "crossorigin"
            | "data"
            | "datetime"
            | "decoding"
            | "default"
            | "defer"
            | "dir"
            | "dirname"
            | "disabled"
            | "download"
            | "draggable"
            | "enctype"
            | "enterkeyhint"
            | "for"
            | "form"
            | "formaction"
            | "formenctype"
            | "formmethod"
            | "formnovalidate"
            | "formtarget"
            | "headers"
            | "height"
            | "hidden"
            | "high"
            | "href"
            | "hreflang"
            | "http-equiv"
            | "id"
            | "inputmode"
            | "integrity"
            | "ismap"
            | "itemprop"
            | "kind"
            | "label"
            | "lang"
            | "language"
            | "list"
            | "loading"
            | "loop"
            | "low"
            | "manifest"
            | "max"
            | "maxlength"
            | "media"
            | "method"
            | "min"
            | "minlength"
            | "multiple"
            | "muted"
            | "name"
            | "novalidate"
            | "open"
            | "optimum"
            | "pattern"
            | "ping"
            | "placeholder"
            | "poster"
            | "preload"
            | "readonly"
            | "referrerpolicy"
            | "rel"
            | "required"
            | "reversed"
            | "rows"
            | "rowspan"
            | "sandbox"
            | "scope"
            | "scoped"
            | "selected"
            | "shape"
            | "size"
            | "sizes"
            | "slot"
            | "span"
            | "spellcheck"
            | "src"
            | "srcdoc"
            | "srclang"
            | "srcset"
            | "start"
            | "step"
            | "style"
            | "summary"
            | "tabindex"
            | "target"
            | "title"
            | "translate"
            | "type"
            | "usemap"
            | "value"
            | "width"
            | "wrap"
    )
}

/// Lowercase a tag or attribute name when it matches a known HTML name.
/// Names that are not known HTML keep their exact case (custom elements,
/// framework attributes), as does everything when `ignore_case` is set.
pub fn fold_name(name: &str, ignore_case: bool) -> String {
    if ignore_case {
        return name.to_string();
    }
    let lower = name.to_ascii_lowercase();
    if is_html_tag(&lower) { lower } else { name.to_string() }
}

/// Template block names that open a `{% name %} ... {% endname %}` pair
/// (django, jinja, nunjucks, twig). Names outside this set are statements.
pub fn is_percent_block_name(name: &str, custom_blocks: &[String]) -> bool {
    matches!(
        name,
        "if" | "for"
            | "block"
            | "with"
            | "filter"
            | "autoescape"
            | "spaceless"
            | "blocktrans"
            | "blocktranslate"
            | "macro"
            | "call"
            | "cache"
            | "ifchanged"
            | "language"
            | "localize"
            | "timezone"
            | "while"
            | "embed"
            | "apply"
            | "asyncEach"
            | "asyncAll"
    ) || custom_blocks.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Go-template keywords that open a `{{ keyword ... }} ... {{ end }}` scope.
pub fn is_keyword_block_name(name: &str) -> bool {
    matches!(name, "if" | "range" | "with" | "block" | "define")
}

/// Branch separators that live inside an open block (`{% else %}`,
/// `{% elif x %}`, the `{% empty %}` arm of a for loop, `{% plural %}` in
/// translation blocks). They never open or close a scope themselves.
pub fn is_branch_keyword(name: &str) -> bool {
    matches!(name, "else" | "elif" | "elseif" | "empty" | "plural")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_match_the_html_list() {
        assert!(is_void_element("img"));
        assert!(is_void_element("meta"));
        assert!(is_void_element("br"));
        assert!(!is_void_element("div"));
        assert!(!is_void_element("imgx"));
    }

    #[test]
    fn display_overrides_replace_css_defaults() {
        assert_eq!(default_display("button"), Display::InlineBlock);
        assert_eq!(default_display("img"), Display::InlineBlock);
        assert_eq!(default_display("span"), Display::Inline);
        assert_eq!(default_display("div"), Display::Block);
        assert_eq!(default_display("my-widget"), Display::Block);
        assert_eq!(default_display("meta"), Display::Hidden);
    }

    #[test]
    fn case_folding_spares_unknown_names() {
        assert_eq!(fold_name("DIV", false), "div");
        assert_eq!(fold_name("MyComponent", false), "MyComponent");
        assert_eq!(fold_name("DIV", true), "DIV");
    }

    #[test]
    fn attribute_table_excludes_case_sensitive_names() {
        assert!(is_html_attribute("class"));
        assert!(is_html_attribute("http-equiv"));
        assert!(is_html_attribute("srcset"));
        assert!(!is_html_attribute("viewbox"));
        assert!(!is_html_attribute("ng-model"));
    }

    #[test]
    fn percent_block_names_recognize_custom_blocks() {
        assert!(is_percent_block_name("if", &[]));
        assert!(!is_percent_block_name("csrf_token", &[]));
        assert!(!is_percent_block_name("extends", &[]));
        let custom = vec!["toc".to_string()];
        assert!(is_percent_block_name("toc", &custom));
    }

    #[test]
    fn syntax_classification() {
        assert!(Syntax::PercentBlock.is_template_block());
        assert!(Syntax::CurlyBlock.is_template_block());
        assert!(!Syntax::CurlyStatement.is_template_block());
        assert!(!Syntax::PercentStatement.is_template_block());
    }

    #[test]
    fn branch_keywords_are_not_block_names() {
        assert!(is_branch_keyword("else"));
        assert!(is_branch_keyword("elif"));
        assert!(is_branch_keyword("plural"));
        assert!(!is_branch_keyword("endif"));
        assert!(!is_percent_block_name("else", &[]));
    }

    #[test]
    fn props_bits_are_independent() {
        let mut props = Props::default();
        props.set(Props::TRAILING_SPACE);
        assert!(props.has(Props::TRAILING_SPACE));
        assert!(!props.has(Props::TRAILING_BREAK));
        props.set(Props::CLOSED);
        assert!(props.has(Props::CLOSED));
        props.set(Props::PAD_LEFT);
        assert!(props.has(Props::PAD_LEFT));
        assert!(!props.has(Props::PAD_RIGHT));
    }
}
