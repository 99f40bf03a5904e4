//! HTML documents as bind targets
//!
//! [`HtmlDocument`] locates `<time>` elements in raw markup and rewrites their
//! inner text in place. Everything outside a rewritten element's content is
//! serialized back byte for byte.

use crate::binder::{TimeDocument, TimeElement, MODE_ATTR, TIME_TAG};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;
use std::sync::OnceLock;

/// Quoted attribute values may contain `>`.
const TAG_BODY: &str = r#"(?:[^>"']|"[^"]*"|'[^']*')*"#;

/// Elements whose content is never parsed as markup.
const RAW_TEXT_TAGS: [&str; 3] = ["script", "style", "textarea"];

/// Either an opaque region (a comment or raw-text element, group `opaque`)
/// or a `<time ...>content</time>` element (groups `attrs` and `content`).
///
/// Opaque alternatives come first so that time markup inside them is
/// consumed without matching.
fn scan_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let mut opaque = vec![r"<!--.*?(?:-->|\z)".to_string()];
        opaque.extend(RAW_TEXT_TAGS.iter().map(|tag| {
            format!(r"<{tag}(?:[\s/]{TAG_BODY})?>.*?(?:</{tag}\s*>|\z)")
        }));
        let pattern = format!(
            r"(?is)(?P<opaque>{})|<{TIME_TAG}(?P<attrs>[\s/]{TAG_BODY})?>(?P<content>.*?)</{TIME_TAG}\s*>",
            opaque.join("|")
        );
        Regex::new(&pattern).expect("scan pattern is valid")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("attribute pattern is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"))
}

/// A `<time data-local-time>` element inside an [`HtmlDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTimeElement {
    attributes: Vec<(String, String)>,
    /// Byte range of the inner content in the source
    content: Range<usize>,
    text: String,
    rewritten: bool,
}

impl HtmlTimeElement {
    /// Whether a bind pass has replaced this element's text
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }
}

impl TimeElement for HtmlTimeElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.rewritten = true;
    }
}

/// Markup text plus the opted-in `<time>` elements found in it.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    source: String,
    elements: Vec<HtmlTimeElement>,
}

impl HtmlDocument {
    /// Scan `source` for `<time>` elements carrying `data-local-time`.
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let elements = scan_regex()
            .captures_iter(&source)
            .filter_map(|caps| {
                let content = caps.name("content")?;
                let attrs = caps.name("attrs").map_or("", |m| m.as_str());
                let attributes = parse_attributes(attrs);
                if !attributes.iter().any(|(name, _)| name == MODE_ATTR) {
                    return None;
                }
                Some(HtmlTimeElement {
                    attributes,
                    content: content.range(),
                    text: text_content(content.as_str()),
                    rewritten: false,
                })
            })
            .collect::<Vec<_>>();

        tracing::trace!(elements = elements.len(), "Parsed HTML document");
        Self { source, elements }
    }

    /// Replace the whole markup, as after an out-of-band content swap.
    pub fn swap(&mut self, source: impl Into<String>) {
        *self = Self::parse(source);
    }

    pub fn elements(&self) -> &[HtmlTimeElement] {
        &self.elements
    }

    /// Serialize with rewritten element texts applied.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;

        for element in self.elements.iter().filter(|e| e.rewritten) {
            out.push_str(&self.source[cursor..element.content.start]);
            out.push_str(&escape_text(&element.text));
            cursor = element.content.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

impl TimeDocument for HtmlDocument {
    type Element = HtmlTimeElement;

    fn time_elements(&mut self) -> &mut [HtmlTimeElement] {
        &mut self.elements
    }
}

/// Attribute name/value pairs; names lowercased, values entity-decoded.
/// Bare attributes get an empty value. The first occurrence of a name wins.
fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();

    for caps in attribute_regex().captures_iter(raw) {
        let name = caps[1].to_ascii_lowercase();
        if attributes.iter().any(|(n, _)| *n == name) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str()).into_owned())
            .unwrap_or_default();
        attributes.push((name, value));
    }

    attributes
}

/// Visible text of an inner-HTML fragment.
fn text_content(fragment: &str) -> String {
    let stripped = tag_regex().replace_all(fragment, "");
    decode_entities(&stripped).into_owned()
}

/// Decode named entities common in attribute values, plus numeric references.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape text for use as element content.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if !input.contains(|c: char| matches!(c, '&' | '<' | '>')) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
