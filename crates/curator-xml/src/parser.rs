//! XML parser that builds mutable [`XmlDocument`] arenas.

use crate::{Error, NodeId, Result, XmlAttribute, XmlDocument, XmlNode};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

/// Parse XML from a string, producing an [`XmlDocument`].
///
/// The XML declaration, comments, processing instructions and DOCTYPE are
/// skipped; whitespace-only text between elements is dropped.
///
/// # Example
///
/// ```rust
/// use curator_xml::parse;
///
/// let doc = parse("<root><child/></root>").unwrap();
/// assert_eq!(doc.node(doc.root()).name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed, if the document has no root
/// element or more than one, or if an element mixes text and child elements.
pub fn parse(content: &str) -> Result<XmlDocument> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Arena of nodes built so far.
    nodes: Vec<XmlNode>,

    /// Stack of open elements.
    stack: Vec<NodeId>,

    /// Completed root element, once seen.
    root: Option<NodeId>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            nodes: Vec::new(),
            stack: Vec::new(),
            root: None,
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = self.handle_open(&e)?;
                    self.stack.push(id);
                }
                Ok(Event::End(e)) => {
                    self.handle_end(e)?;
                }
                Ok(Event::Empty(e)) => {
                    self.handle_open(&e)?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(e)?;
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(e)?;
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {
                    // Skipped; the writer emits a fresh declaration.
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Syntax {
                        message: e.to_string(),
                        position: self.reader.error_position(),
                    });
                }
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: self.nodes[open.0].name.clone(),
            });
        }

        let root = self.root.ok_or(Error::EmptyDocument)?;
        Ok(XmlDocument::from_arena(std::mem::take(&mut self.nodes), root))
    }

    /// Allocate a node for a start or empty-element tag and attach it.
    fn handle_open(&mut self, e: &BytesStart<'_>) -> Result<NodeId> {
        let (name, prefix) = split_name(e.name().as_ref());
        let attributes = self.parse_attributes(e)?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(XmlNode::new(name, prefix, attributes));

        match self.stack.last().copied() {
            Some(parent) => {
                if self.nodes[parent.0].text.is_some() {
                    return Err(Error::MixedContent {
                        element: self.nodes[parent.0].name.clone(),
                    });
                }
                self.nodes[parent.0].children.push(id);
            }
            None => {
                if self.root.is_some() {
                    return Err(Error::MultipleRoots);
                }
                self.root = Some(id);
            }
        }

        Ok(id)
    }

    fn handle_end(&mut self, e: BytesEnd<'_>) -> Result<()> {
        let (end_name, _) = split_name(e.name().as_ref());

        let id = self.stack.pop().ok_or_else(|| Error::Syntax {
            message: format!("unexpected closing tag </{}>", end_name),
            position: self.reader.error_position(),
        })?;

        if self.nodes[id.0].name != end_name {
            return Err(Error::MismatchedEndTag {
                expected: self.nodes[id.0].name.clone(),
                found: end_name,
            });
        }

        Ok(())
    }

    fn handle_text(&mut self, e: BytesText<'_>) -> Result<()> {
        let position = self.reader.error_position();
        let text = e.unescape().map_err(|err| Error::Syntax {
            message: format!("invalid text content: {}", err),
            position,
        })?;

        self.push_text(text.trim())
    }

    fn handle_cdata(&mut self, e: BytesCData<'_>) -> Result<()> {
        let text = String::from_utf8_lossy(e.as_ref()).to_string();
        self.push_text(&text)
    }

    fn push_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let Some(id) = self.stack.last().copied() else {
            // Stray text outside the root element.
            return Ok(());
        };

        let node = &mut self.nodes[id.0];
        if !node.children.is_empty() {
            return Err(Error::MixedContent {
                element: node.name.clone(),
            });
        }

        match &mut node.text {
            Some(existing) => existing.push_str(text),
            None => node.text = Some(text.to_string()),
        }
        Ok(())
    }

    fn parse_attributes(&mut self, e: &BytesStart<'_>) -> Result<Vec<XmlAttribute>> {
        let mut attributes = Vec::new();

        for attr_result in e.attributes() {
            let attr = attr_result?;
            let (name, prefix) = split_name(attr.key.as_ref());
            let position = self.reader.error_position();
            let value = attr.unescape_value().map_err(|err| Error::Syntax {
                message: format!("invalid attribute value: {}", err),
                position,
            })?;

            attributes.push(XmlAttribute {
                name,
                prefix,
                value: value.into_owned(),
            });
        }

        Ok(attributes)
    }
}

/// Split a qualified name into (local name, optional prefix).
fn split_name(raw: &[u8]) -> (String, Option<String>) {
    let full = String::from_utf8_lossy(raw).to_string();
    match full.find(':') {
        Some(pos) => (full[pos + 1..].to_string(), Some(full[..pos].to_string())),
        None => (full, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let doc = parse("<root/>").unwrap();
        assert_eq!(doc.node(doc.root()).name, "root");
        assert!(doc.node(doc.root()).is_empty());
    }

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse("<root><child/><child/></root>").unwrap();
        let root = doc.root();
        assert_eq!(doc.children_named(root, "child").len(), 2);
    }

    #[test]
    fn test_parse_text_content() {
        let doc = parse("<root>\n  Hello, world!\n</root>").unwrap();
        assert_eq!(doc.node(doc.root()).text(), Some("Hello, world!"));
    }

    #[test]
    fn test_parse_attributes() {
        let doc = parse(r#"<root alias="a-1" accession="ACC1"/>"#).unwrap();
        let root = doc.node(doc.root());
        assert_eq!(root.attribute("alias"), Some("a-1"));
        assert_eq!(root.attribute("accession"), Some("ACC1"));
    }

    #[test]
    fn test_parse_namespace_prefix() {
        let doc = parse(r#"<ena:STUDY xmlns:ena="http://example.org"/>"#).unwrap();
        let root = doc.node(doc.root());
        assert_eq!(root.name, "STUDY");
        assert_eq!(root.prefix, Some("ena".to_string()));
    }

    #[test]
    fn test_parse_entities_unescaped() {
        let doc = parse("<root>a &amp; b</root>").unwrap();
        assert_eq!(doc.node(doc.root()).text(), Some("a & b"));
    }

    #[test]
    fn test_declaration_and_comments_skipped() {
        let doc = parse(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- submission -->\n<root><child/></root>",
        )
        .unwrap();
        assert_eq!(doc.node(doc.root()).name, "root");
    }

    #[test]
    fn test_empty_document_error() {
        assert!(matches!(parse(""), Err(Error::EmptyDocument)));
        assert!(matches!(parse("<!-- nothing -->"), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_multiple_roots_error() {
        assert!(matches!(
            parse("<root/><another/>"),
            Err(Error::MultipleRoots)
        ));
    }

    #[test]
    fn test_unclosed_element_error() {
        assert!(matches!(
            parse("<root><child>"),
            Err(Error::UnexpectedEof { .. } | Error::Syntax { .. })
        ));
    }

    #[test]
    fn test_mismatched_tags_error() {
        // quick-xml catches mismatched tags itself when check_end_names is
        // enabled (the default); either shape is acceptable.
        assert!(matches!(
            parse("<root></wrong>"),
            Err(Error::MismatchedEndTag { .. } | Error::Syntax { .. })
        ));
    }

    #[test]
    fn test_mixed_content_rejected() {
        assert!(matches!(
            parse("<root>text<child/></root>"),
            Err(Error::MixedContent { .. })
        ));
        assert!(matches!(
            parse("<root><child/>text</root>"),
            Err(Error::MixedContent { .. })
        ));
    }

    #[test]
    fn test_whitespace_between_elements_dropped() {
        let doc = parse("<root>\n  <child/>\n</root>").unwrap();
        let root = doc.node(doc.root());
        assert!(root.text().is_none());
        assert_eq!(root.children().len(), 1);
    }
}
