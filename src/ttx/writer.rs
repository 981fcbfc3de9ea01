//! Text emission for table dumps.

use std::borrow::Cow;
use std::fmt;

/// The indentation added per nesting level.
const INDENT: &str = "  ";

/// An attribute name with a value to be formatted.
pub type Attribute<'a> = (&'a str, &'a dyn fmt::Display);

/// Writes indented XML text.
///
/// Element and attribute names are written verbatim; attribute values and text content are escaped.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        XmlWriter::default()
    }

    /// Writes the XML declaration.
    pub fn declaration(&mut self) {
        self.out
            .push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn open(&mut self, name: &str, attributes: &[Attribute]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(name);

        for (key, value) in attributes {
            let value = value.to_string();
            self.out
                .push_str(&format!(" {}=\"{}\"", key, escape_attribute(&value)));
        }
    }

    /// Writes a start tag and increases the nesting level.
    pub fn begin(&mut self, name: &str, attributes: &[Attribute]) {
        self.open(name, attributes);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    /// Decreases the nesting level and writes an end tag.
    pub fn end(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str(&format!("</{}>\n", name));
    }

    /// Writes an empty element.
    pub fn simple(&mut self, name: &str, attributes: &[Attribute]) {
        self.open(name, attributes);
        self.out.push_str("/>\n");
    }

    /// Writes an element containing only text, on a single line.
    pub fn text_element(&mut self, name: &str, attributes: &[Attribute], text: &str) {
        self.open(name, attributes);
        self.out
            .push_str(&format!(">{}</{}>\n", escape_text(text), name));
    }

    /// Writes an indented line of text.
    pub fn text(&mut self, text: &str) {
        self.indent();
        self.out.push_str(&escape_text(text));
        self.out.push('\n');
    }

    /// Writes a comment.
    ///
    /// Comments may not contain `--`, so a space is put between consecutive hyphens.
    /// The content is padded with spaces, so it never ends in `-`.
    /// Characters XML can not carry are replaced by U+FFFD.
    pub fn comment(&mut self, text: &str) {
        let mut content = String::with_capacity(text.len());

        for c in text.chars() {
            if c == '-' && content.ends_with('-') {
                content.push(' ');
            }
            content.push(if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER });
        }

        self.indent();
        self.out.push_str(&format!("<!-- {} -->\n", content));
    }

    /// Writes an empty line.
    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    /// Returns the written text.
    pub fn finish(self) -> String {
        self.out
    }
}

/// Whether `c` may appear in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escapes `&`, `<`, and `>` for use in text content.
///
/// ```
/// # use ttxml::ttx::writer::escape_text;
/// assert_eq!(escape_text("A & B < C"), "A &amp; B &lt; C");
/// ```
pub fn escape_text(text: &str) -> Cow<str> {
    escape(text, false)
}

/// Escapes `&`, `<`, `>`, and `"` for use in a double-quoted attribute value.
pub fn escape_attribute(text: &str) -> Cow<str> {
    escape(text, true)
}

fn escape(text: &str, quotes: bool) -> Cow<str> {
    let needs_escaping = |c: char| c == '&' || c == '<' || c == '>' || (quotes && c == '"');

    if !text.contains(needs_escaping) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if quotes => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }

    Cow::Owned(escaped)
}
