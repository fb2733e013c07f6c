//! XML parsing utilities for the SpreadsheetML parts of an xlsx package
//! Provides an XML reader wrapper and helper traits for attribute and text processing

use crate::error::RollforwardError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Missing attribute '{attribute}' on <{tag}>")]
    MissingAttribute { tag: String, attribute: String },
}

/// XML reader wrapper configured for streaming worksheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, None at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RollforwardError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RollforwardError::XmlError(error)),
        }
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an unescaped attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RollforwardError>;

    /// Gets an attribute value that must be present
    fn require_attribute_value(&'a self, name: &str) -> Result<Cow<'a, str>, RollforwardError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RollforwardError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn require_attribute_value(&'a self, name: &str) -> Result<Cow<'a, str>, RollforwardError> {
        self.get_attribute_value(name)?.ok_or_else(|| {
            XmlError::MissingAttribute {
                tag: String::from_utf8_lossy(self.name().as_ref()).into_owned(),
                attribute: name.to_owned(),
            }
            .into()
        })
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from a BytesRef event (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RollforwardError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RollforwardError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_attributes_and_refs() {
        let xml = r#"<root><mergeCell ref="A1:C1"/><t>A&amp;B &#x41;</t></root>"#;
        let mut reader = XmlReader::new(Cursor::new(xml.as_bytes()));
        let mut reference = None::<String>;
        let mut text = String::new();
        let mut in_text = false;
        let result: Result<(), RollforwardError> = (|| {
            match_xml_events!(reader => {
                Event::Start(event) if event.name().as_ref() == b"mergeCell" => {
                    reference = Some(event.require_attribute_value("ref")?.to_string());
                }
                Event::Start(event) if event.name().as_ref() == b"t" => in_text = true,
                Event::End(event) if event.name().as_ref() == b"t" => in_text = false,
                Event::Text(event) if in_text => text.push_str(&event.xml_content()?),
                Event::GeneralRef(event) if in_text => text.push_bytes_ref(&event)?,
            });
            Ok(())
        })();
        result.unwrap();
        assert_eq!(reference.as_deref(), Some("A1:C1"));
        assert_eq!(text, "A&B A");
    }
}
