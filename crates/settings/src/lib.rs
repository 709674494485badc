//! Read-only formatter configuration.
//!
//! This crate is the boundary surface for an external settings loader: it
//! only defines the data. Discovering, loading, and merging configuration
//! files is the loader's job, not ours.

use serde::Deserialize;

/// Template dialect recognized by the tokenizer.
///
/// `All` enables every delimiter family at once; the formatter narrows the
/// effective profile when it sees a dialect-specific construct (for example
/// a handlebars `{{#block}}`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Django,
    Jinja,
    Nunjucks,
    Handlebars,
    Golang,
    Angular,
    Html,
    #[default]
    All,
}

impl Profile {
    /// Whether `{% ... %}` statement blocks are recognized.
    pub fn uses_percent_blocks(self) -> bool {
        !matches!(self, Profile::Handlebars | Profile::Golang | Profile::Html)
    }

    /// Whether handlebars/mustache curly forms (`{{# }}`, `{{/ }}`, `{{! }}`,
    /// `{{{ }}}`) are recognized.
    pub fn uses_handlebars_curlies(self) -> bool {
        matches!(self, Profile::Handlebars | Profile::All)
    }

    /// Whether `{{ keyword ... }}` opens a block (go templates close blocks
    /// with `{{ end }}` rather than a distinct delimiter).
    pub fn uses_golang_keyword_blocks(self) -> bool {
        matches!(self, Profile::Golang | Profile::All)
    }

    /// Whether any `{{ ... }}` expression form is recognized at all.
    pub fn uses_curly_expressions(self) -> bool {
        !matches!(self, Profile::Html)
    }

    /// Statement tags carry an inner padding space in every dialect except
    /// handlebars (`{{name}}` vs `{{ name }}`).
    pub fn pads_statements(self) -> bool {
        !matches!(self, Profile::Handlebars)
    }
}

/// Character used for one indentation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentChar {
    #[default]
    Space,
    Tab,
}

/// Formatter configuration, consumed read-only by the core.
///
/// Field defaults mirror common template-formatter conventions: 4-space
/// indent, 120-column lines, 70-column attribute budget.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: Profile,
    pub indent_size: usize,
    pub indent_char: IndentChar,
    pub max_line_length: usize,
    pub max_attribute_length: usize,
    /// Extra template block names treated as open/close pairs
    /// (for example a project-local `{% cache %}...{% endcache %}`).
    pub custom_blocks: Vec<String>,
    /// Extra element names whose contents are treated as raw text.
    pub custom_html: Vec<String>,
    pub preserve_leading_space: bool,
    pub preserve_blank_lines: bool,
    /// Emit `<img />` instead of `<img>` for void elements.
    pub close_void_tags: bool,
    /// Keep tag and attribute case exactly as written even for known names.
    pub ignore_case: bool,
    pub line_break_after_multiline_tag: bool,
    pub format_css: bool,
    pub format_js: bool,
    pub max_blank_lines: usize,
    /// Suppress the blank line normally emitted after a front-matter block.
    pub no_line_after_front_matter: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::All,
            indent_size: 4,
            indent_char: IndentChar::Space,
            max_line_length: 120,
            max_attribute_length: 70,
            custom_blocks: Vec::new(),
            custom_html: Vec::new(),
            preserve_leading_space: false,
            preserve_blank_lines: false,
            close_void_tags: false,
            ignore_case: false,
            line_break_after_multiline_tag: false,
            format_css: false,
            format_js: false,
            max_blank_lines: 2,
            no_line_after_front_matter: false,
        }
    }
}

impl Config {
    /// One indentation step as text.
    pub fn indent_unit(&self) -> String {
        match self.indent_char {
            IndentChar::Space => " ".repeat(self.indent_size),
            IndentChar::Tab => "\t".to_string(),
        }
    }
}
