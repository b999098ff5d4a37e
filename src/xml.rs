//! XML writing, sanitizing and well-formedness checks
//!
//! Every document this crate produces goes through [`XmlWriter`], which escapes
//! text and attribute values, rejects characters XML cannot carry, and strips
//! `{...}` template placeholders from everything except free text.
//! Documents received from the remote system go through [`clean_xml`], which
//! strips the same placeholders, checks well-formedness and pretty-prints.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use regex::Regex;

use crate::error::{Error, Result};

/// Spaces per nesting level in pretty-printed output
const INDENT: usize = 2;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("placeholder pattern is valid"));

fn malformed<E: std::fmt::Display>(e: E) -> Error {
    Error::MalformedPayload(e.to_string())
}

/// XML 1.0 `Char` production. Surrogates cannot occur in a Rust `char`.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Reject values that no conforming XML parser would accept
fn check_chars(name: &str, value: &str) -> Result<()> {
    match value.char_indices().find(|(_, c)| !is_xml_char(*c)) {
        Some((offset, c)) => Err(Error::MalformedPayload(format!(
            "character U+{:04X} at offset {} in <{}> is not allowed in XML",
            c as u32, offset, name
        ))),
        None => Ok(()),
    }
}

/// Remove `{...}` template artifacts (e.g. `{+1}`) from a string
pub fn strip_placeholders(input: &str) -> Cow<'_, str> {
    PLACEHOLDER.replace_all(input, "")
}

/// Strip placeholders, then validate and pretty-print the document
///
/// # Errors
/// Returns [`Error::MalformedPayload`] if the stripped text is not a
/// well-formed XML document.
pub fn clean_xml(raw: &str) -> Result<String> {
    reformat(&strip_placeholders(raw))
}

/// Validate a document and re-serialize it with consistent indentation
///
/// The output always starts with an XML declaration. Whitespace-only text
/// between elements is dropped.
pub fn reformat(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
    let mut depth: usize = 0;
    let mut roots: usize = 0;
    let mut first = true;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::MalformedPayload(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        if first && !matches!(event, Event::Decl(_) | Event::Eof) {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(malformed)?;
        }
        first = false;

        match &event {
            Event::Eof => break,
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::MalformedPayload("unexpected closing tag".into()))?;
            }
            Event::Empty(_) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Event::Text(_) | Event::CData(_) if depth == 0 => {
                return Err(Error::MalformedPayload(
                    "text content outside the root element".into(),
                ));
            }
            _ => {}
        }

        writer.write_event(event).map_err(malformed)?;
    }

    if depth != 0 {
        return Err(Error::MalformedPayload(format!(
            "{} element(s) left unclosed",
            depth
        )));
    }
    if roots != 1 {
        return Err(Error::MalformedPayload(format!(
            "expected exactly one root element, found {}",
            roots
        )));
    }

    String::from_utf8(writer.into_inner()).map_err(malformed)
}

/// Check that a document is well-formed without keeping the reformatted output
pub fn check_well_formed(xml: &str) -> Result<()> {
    reformat(xml).map(|_| ())
}

/// Indenting writer used by the payload and envelope builders
pub(crate) struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub(crate) fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', INDENT),
        }
    }

    pub(crate) fn declaration(&mut self) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(malformed)
    }

    pub(crate) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = element_with(name, attributes)?;
        self.inner
            .write_event(Event::Start(element))
            .map_err(malformed)
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(malformed)
    }

    /// Write `<name attrs>text</name>`, or `<name attrs/>` when the sanitized
    /// text is empty
    pub(crate) fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<()> {
        self.write_text_element(name, attributes, &strip_placeholders(text))
    }

    /// Like [`text_element`](Self::text_element) but keeps the text as given.
    /// Credentials must reach the server exactly as configured.
    pub(crate) fn verbatim_text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<()> {
        self.write_text_element(name, attributes, text)
    }

    fn write_text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<()> {
        check_chars(name, text)?;
        let element = element_with(name, attributes)?;
        if text.is_empty() {
            return self
                .inner
                .write_event(Event::Empty(element))
                .map_err(malformed);
        }
        self.inner
            .write_event(Event::Start(element))
            .map_err(malformed)?;
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(malformed)?;
        self.end(name)
    }

    pub(crate) fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(malformed)
    }
}

fn element_with<'a>(name: &'a str, attributes: &[(&str, &str)]) -> Result<BytesStart<'a>> {
    let mut element = BytesStart::new(name);
    for (key, value) in attributes {
        let value = strip_placeholders(value);
        check_chars(name, &value)?;
        element.push_attribute((*key, value.as_ref()));
    }
    Ok(element)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_placeholders_removes_braced_artifacts() {
        assert_eq!(strip_placeholders("<a>{+1}x{foo}</a>"), "<a>x</a>");
        assert_eq!(strip_placeholders("no artifacts"), "no artifacts");
    }

    #[test]
    fn test_clean_xml_pretty_prints_and_adds_declaration() {
        let cleaned = clean_xml("<root><child>value</child>{+1}</root>").unwrap();

        assert!(cleaned.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(cleaned.contains("\n  <child>value</child>"));
        assert!(!cleaned.contains("{+1}"));
    }

    #[test]
    fn test_clean_xml_keeps_existing_declaration() {
        let cleaned = clean_xml("<?xml version=\"1.0\"?><root/>").unwrap();
        assert_eq!(cleaned.matches("<?xml").count(), 1);
    }

    #[test]
    fn test_reformat_rejects_unclosed_element() {
        let err = reformat("<root><child></root>").unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn test_reformat_rejects_truncated_document() {
        assert!(matches!(
            reformat("<root><child>"),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_reformat_rejects_empty_and_multi_root_input() {
        assert!(reformat("").is_err());
        assert!(reformat("<a/><b/>").is_err());
        assert!(reformat("plain text").is_err());
    }

    #[test]
    fn test_writer_escapes_text_and_attributes() {
        let mut writer = XmlWriter::new();
        writer
            .text_element("note", &[("by", "O'Neil & \"Co\"")], "a < b && c > d")
            .unwrap();
        let xml = writer.finish().unwrap();

        check_well_formed(&xml).unwrap();
        assert_eq!(inspect::texts(&xml, "note"), vec!["a < b && c > d"]);
    }

    #[test]
    fn test_writer_renders_empty_text_as_empty_element() {
        let mut writer = XmlWriter::new();
        writer.start("root", &[]).unwrap();
        writer.text_element("id", &[("type", "x")], "").unwrap();
        writer.end("root").unwrap();
        let xml = writer.finish().unwrap();

        assert!(xml.contains("<id type=\"x\"/>"));
        assert_eq!(inspect::texts(&xml, "id"), vec![""]);
    }

    #[test]
    fn test_writer_strips_placeholders_from_values() {
        let mut writer = XmlWriter::new();
        writer.text_element("v", &[], "late{+1} work").unwrap();
        let xml = writer.finish().unwrap();
        assert_eq!(inspect::texts(&xml, "v"), vec!["late work"]);
    }

    #[test]
    fn test_verbatim_writer_keeps_braces() {
        let mut writer = XmlWriter::new();
        writer.verbatim_text_element("v", &[], "rubric {v2}").unwrap();
        let xml = writer.finish().unwrap();
        assert_eq!(inspect::texts(&xml, "v"), vec!["rubric {v2}"]);
    }

    #[test]
    fn test_writer_rejects_characters_outside_xml_range() {
        let mut writer = XmlWriter::new();
        let err = writer
            .verbatim_text_element("note", &[], "late\u{1}work")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(ref m) if m.contains("U+0001")));

        let err = writer.start("note", &[("by", "x\u{FFFE}")]).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn test_writer_accepts_tabs_newlines_and_astral_characters() {
        let mut writer = XmlWriter::new();
        writer
            .verbatim_text_element("note", &[], "line one\n\tline two \u{1F393}")
            .unwrap();
        let xml = writer.finish().unwrap();
        check_well_formed(&xml).unwrap();
    }
}
