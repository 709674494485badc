//! Sub-parser for a start tag's raw attribute region.
//!
//! The region was captured verbatim by the tokenizer; this scanner splits
//! it into attribute pairs and standalone template fragments without
//! disturbing embedded template expressions: a balanced `{{ ... }}` or
//! `{% ... %}` span never splits a name or value, so
//! `class="a {{ cls }} b"` and `data-{{ key }}="x"` stay intact.

/// One item of a tag's attribute list, in source order.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrItem {
    Pair {
        name: String,
        value: Option<AttrValue>,
    },
    /// A template construct standing on its own between attributes, for
    /// example `{% if busy %}disabled{% endif %}` (its markup parts scan as
    /// ordinary items; the delimiters are what is kept whole here).
    Expr(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttrValue {
    /// The quote character, or `None` for a bare value.
    pub quote: Option<char>,
    pub raw: String,
}

fn template_span_len(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b'{') {
        return None;
    }
    let closer: &[u8] = match bytes.get(start + 1) {
        Some(b'{') => b"}}",
        Some(b'%') => b"%}",
        _ => return None,
    };
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if &bytes[i..i + 2] == closer {
            return Some(i + 2 - start);
        }
        i += 1;
    }
    None
}

/// Scan the raw attribute region into items.
pub fn parse(raw: &str) -> Vec<AttrItem> {
    let bytes = raw.as_bytes();
    let mut items = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // Standalone template fragment.
        if let Some(len) = template_span_len(bytes, i) {
            items.push(AttrItem::Expr(raw[i..i + len].to_string()));
            i += len;
            continue;
        }

        // Attribute name; embedded template spans are part of the token.
        let name_start = i;
        while i < bytes.len() {
            let b = bytes[i];
            if b.is_ascii_whitespace() || b == b'=' {
                break;
            }
            if let Some(len) = template_span_len(bytes, i) {
                i += len;
                continue;
            }
            i += 1;
        }
        let name = raw[name_start..i].to_string();

        // Optional `= value`, with whitespace tolerated around `=`.
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            items.push(AttrItem::Pair { name, value: None });
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            items.push(AttrItem::Pair {
                name,
                value: Some(AttrValue {
                    quote: None,
                    raw: String::new(),
                }),
            });
            i = j;
            continue;
        }

        if bytes[j] == b'"' || bytes[j] == b'\'' {
            let quote = bytes[j];
            let value_start = j + 1;
            let mut k = value_start;
            while k < bytes.len() && bytes[k] != quote {
                k += 1;
            }
            items.push(AttrItem::Pair {
                name,
                value: Some(AttrValue {
                    quote: Some(quote as char),
                    raw: raw[value_start..k].to_string(),
                }),
            });
            i = (k + 1).min(bytes.len());
        } else {
            let value_start = j;
            let mut k = j;
            while k < bytes.len() && !bytes[k].is_ascii_whitespace() {
                if let Some(len) = template_span_len(bytes, k) {
                    k += len;
                    continue;
                }
                k += 1;
            }
            items.push(AttrItem::Pair {
                name,
                value: Some(AttrValue {
                    quote: None,
                    raw: raw[value_start..k].to_string(),
                }),
            });
            i = k;
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, quote: Option<char>, value: &str) -> AttrItem {
        AttrItem::Pair {
            name: name.to_string(),
            value: Some(AttrValue {
                quote,
                raw: value.to_string(),
            }),
        }
    }

    fn flag(name: &str) -> AttrItem {
        AttrItem::Pair {
            name: name.to_string(),
            value: None,
        }
    }

    #[test]
    fn parses_quoted_bare_and_boolean_attributes() {
        let items = parse("href=\"/x\" id=main disabled class='a b'");
        assert_eq!(
            items,
            vec![
                pair("href", Some('"'), "/x"),
                pair("id", None, "main"),
                flag("disabled"),
                pair("class", Some('\''), "a b"),
            ]
        );
    }

    #[test]
    fn tolerates_whitespace_around_equals() {
        let items = parse("a = \"1\"  b =2");
        assert_eq!(items, vec![pair("a", Some('"'), "1"), pair("b", None, "2")]);
    }

    #[test]
    fn keeps_template_spans_inside_values() {
        let items = parse("class=\"btn {{ kind }} large\"");
        assert_eq!(items, vec![pair("class", Some('"'), "btn {{ kind }} large")]);
    }

    #[test]
    fn keeps_template_spans_inside_names_and_bare_values() {
        let items = parse("data-{{ key }}=x value={{ v }}");
        assert_eq!(
            items,
            vec![pair("data-{{ key }}", None, "x"), pair("value", None, "{{ v }}")]
        );
    }

    #[test]
    fn standalone_template_fragments_are_items() {
        let items = parse("{% if busy %}disabled{% endif %} id=x");
        assert_eq!(
            items,
            vec![
                AttrItem::Expr("{% if busy %}".to_string()),
                flag("disabled"),
                AttrItem::Expr("{% endif %}".to_string()),
                pair("id", None, "x"),
            ]
        );
    }

    #[test]
    fn empty_and_unterminated_input() {
        assert!(parse("").is_empty());
        assert_eq!(
            parse("x="),
            vec![pair("x", None, "")],
            "dangling equals keeps an empty value"
        );
        // An unterminated quote runs to the end of the region.
        assert_eq!(parse("a=\"bc"), vec![pair("a", Some('"'), "bc")]);
    }
}
