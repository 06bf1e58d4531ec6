// crates/ethercat-esi/src/sink.rs

//! Structured XML output used by the descriptor compiler.
//!
//! The compiler only talks to the [`XmlSink`] trait: open an element, add
//! attributes, write text or CDATA, close it again. [`QuickXmlSink`] implements
//! it on top of the `quick-xml` event writer.

use crate::error::EsiError;
use log::{debug, warn};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// A streaming sink for one XML document, with an implicit open-element stack.
pub trait XmlSink {
    /// Writes the XML declaration.
    fn start_document(&mut self) -> Result<(), EsiError>;

    /// Opens `name`. Attributes may be added until content is written.
    fn open_element(&mut self, name: &str) -> Result<(), EsiError>;

    /// Adds an attribute to the most recently opened element.
    ///
    /// # Errors
    /// `EsiError::AttributeOutsideElement` once the element already has content.
    fn attribute(&mut self, name: &str, value: &str) -> Result<(), EsiError>;

    /// Writes escaped character data.
    fn text(&mut self, value: &str) -> Result<(), EsiError>;

    /// Writes a CDATA section.
    fn cdata(&mut self, value: &str) -> Result<(), EsiError>;

    /// Closes the innermost open element.
    ///
    /// # Errors
    /// `EsiError::UnbalancedElement` if no element is open.
    fn close_element(&mut self) -> Result<(), EsiError>;

    /// Closes every element still open.
    fn end_document(&mut self) -> Result<(), EsiError>;

    /// Takes the bytes written so far.
    fn flush(&mut self) -> Vec<u8>;

    /// `<name>value</name>`
    fn text_element(&mut self, name: &str, value: &str) -> Result<(), EsiError> {
        self.open_element(name)?;
        self.text(value)?;
        self.close_element()
    }

    /// `<name><![CDATA[value]]></name>`
    fn cdata_element(&mut self, name: &str, value: &str) -> Result<(), EsiError> {
        self.open_element(name)?;
        self.cdata(value)?;
        self.close_element()
    }
}

/// [`XmlSink`] writing into an in-memory buffer through `quick_xml::Writer`.
///
/// Elements closed without content are written as empty elements (`<FoE/>`).
pub struct QuickXmlSink {
    writer: Writer<Vec<u8>>,
    /// Start tag still accepting attributes.
    pending: Option<BytesStart<'static>>,
    stack: Vec<String>,
}

impl Default for QuickXmlSink {
    fn default() -> Self {
        Self::new()
    }
}

impl QuickXmlSink {
    /// Sink indenting nested elements by two spaces.
    pub fn new() -> Self {
        Self::with_writer(Writer::new_with_indent(Vec::new(), b' ', 2))
    }

    /// Sink writing the document on a single line.
    pub fn compact() -> Self {
        Self::with_writer(Writer::new(Vec::new()))
    }

    fn with_writer(writer: Writer<Vec<u8>>) -> Self {
        Self {
            writer,
            pending: None,
            stack: Vec::new(),
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Writes the pending start tag, if any, so that content can follow.
    fn commit_start(&mut self) -> Result<(), EsiError> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}

impl XmlSink for QuickXmlSink {
    fn start_document(&mut self) -> Result<(), EsiError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn open_element(&mut self, name: &str) -> Result<(), EsiError> {
        self.commit_start()?;
        self.pending = Some(BytesStart::new(name.to_owned()));
        self.stack.push(name.to_owned());
        Ok(())
    }

    fn attribute(&mut self, name: &str, value: &str) -> Result<(), EsiError> {
        match self.pending.as_mut() {
            Some(start) => {
                start.push_attribute((name, value));
                Ok(())
            }
            None => Err(EsiError::AttributeOutsideElement {
                attribute: name.to_owned(),
            }),
        }
    }

    fn text(&mut self, value: &str) -> Result<(), EsiError> {
        self.commit_start()?;
        self.writer.write_event(Event::Text(BytesText::new(value)))?;
        Ok(())
    }

    fn cdata(&mut self, value: &str) -> Result<(), EsiError> {
        if value.contains("]]>") {
            warn!("Value {:?} cannot be wrapped in CDATA; writing it as text", value);
            return self.text(value);
        }
        self.commit_start()?;
        self.writer.write_event(Event::CData(BytesCData::new(value)))?;
        Ok(())
    }

    fn close_element(&mut self) -> Result<(), EsiError> {
        let name = self.stack.pop().ok_or(EsiError::UnbalancedElement)?;
        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Empty(start))?,
            None => self.writer.write_event(Event::End(BytesEnd::new(name)))?,
        }
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), EsiError> {
        if !self.stack.is_empty() {
            debug!("Closing {} element(s) left open", self.stack.len());
        }
        while !self.stack.is_empty() {
            self.close_element()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Vec<u8> {
        std::mem::take(self.writer.get_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(build: impl FnOnce(&mut QuickXmlSink) -> Result<(), EsiError>) -> String {
        let mut sink = QuickXmlSink::compact();
        build(&mut sink).unwrap();
        String::from_utf8(sink.flush()).unwrap()
    }

    #[test]
    fn test_nested_elements_with_attributes() {
        let xml = render(|s| {
            s.open_element("Sm")?;
            s.attribute("StartAddress", "#x1000")?;
            s.attribute("Enable", "1")?;
            s.text("MBoxOut")?;
            s.close_element()
        });
        assert_eq!(xml, r##"<Sm StartAddress="#x1000" Enable="1">MBoxOut</Sm>"##);
    }

    #[test]
    fn test_childless_element_is_empty() {
        let xml = render(|s| {
            s.open_element("Mailbox")?;
            s.open_element("FoE")?;
            s.close_element()?;
            s.close_element()
        });
        assert_eq!(xml, "<Mailbox><FoE/></Mailbox>");
    }

    #[test]
    fn test_text_is_escaped_and_cdata_is_not() {
        let xml = render(|s| {
            s.text_element("Desc", "a < b")?;
            s.cdata_element("Name", "R&D <1>")
        });
        assert_eq!(xml, "<Desc>a &lt; b</Desc><Name><![CDATA[R&D <1>]]></Name>");
    }

    #[test]
    fn test_attribute_after_content_is_rejected() {
        let mut sink = QuickXmlSink::compact();
        sink.open_element("Type").unwrap();
        sink.text("Device").unwrap();
        assert!(matches!(
            sink.attribute("ProductCode", "#x1"),
            Err(EsiError::AttributeOutsideElement { .. })
        ));
    }

    #[test]
    fn test_unbalanced_close_is_rejected() {
        let mut sink = QuickXmlSink::compact();
        assert!(matches!(
            sink.close_element(),
            Err(EsiError::UnbalancedElement)
        ));
    }

    #[test]
    fn test_end_document_closes_everything() {
        let mut sink = QuickXmlSink::compact();
        sink.open_element("EtherCATInfo").unwrap();
        sink.open_element("Descriptions").unwrap();
        sink.text("x").unwrap();
        sink.end_document().unwrap();
        assert_eq!(sink.depth(), 0);
        let xml = String::from_utf8(sink.flush()).unwrap();
        assert_eq!(xml, "<EtherCATInfo><Descriptions>x</Descriptions></EtherCATInfo>");
    }

    #[test]
    fn test_declaration() {
        let xml = render(|s| s.start_document());
        assert_eq!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    }
}
