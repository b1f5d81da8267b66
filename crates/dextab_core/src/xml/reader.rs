use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, BytesText, Event};

use super::{Element, XmlError, check_text, is_xml_char};

struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.check_end_names = true;
        config.expand_empty_elements = true;
        config.trim_text(false);

        Self {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    fn next(&mut self) -> Result<Option<Event<'_>>, XmlError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

trait TextSink {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), XmlError>;
    fn push_bytes_ref(&mut self, reference: &BytesRef) -> Result<(), XmlError>;
}

impl TextSink for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), XmlError> {
        let content = text.xml_content()?;
        check_text(&content)?;
        self.push_str(&content);
        Ok(())
    }

    fn push_bytes_ref(&mut self, reference: &BytesRef) -> Result<(), XmlError> {
        let raw = reference.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            match char::from_u32(code).filter(|c| is_xml_char(*c)) {
                Some(character) => self.push(character),
                None => return Err(XmlError::InvalidCharacterReference(code)),
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            return Err(XmlError::UnknownEntity(raw.into_owned()));
        }
        Ok(())
    }
}

/// Parses a complete XML document held in memory.
pub fn parse_str(xml: &str) -> Result<Element, XmlError> {
    read_tree(xml.as_bytes())
}

/// Reads a whole XML document into an owned tree.
///
/// Whitespace-only text inside elements that have child elements is treated
/// as indentation and discarded; leaf text is kept verbatim.
pub fn read_tree<R: BufRead>(input: R) -> Result<Element, XmlError> {
    let mut reader = XmlReader::new(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    while let Some(event) = reader.next()? {
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::ContentOutsideRoot);
                }
                stack.push(element_from_start(&start)?);
            }
            Event::End(_) => {
                let Some(mut element) = stack.pop() else {
                    return Err(XmlError::ContentOutsideRoot);
                };
                if !element.is_leaf() {
                    let trimmed = element.text.trim();
                    if trimmed.len() != element.text.len() {
                        element.text = trimmed.to_string();
                    }
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => match stack.last_mut() {
                Some(current) => current.text.push_bytes_text(&text)?,
                None => {
                    if !text.xml_content()?.trim().is_empty() {
                        return Err(XmlError::ContentOutsideRoot);
                    }
                }
            },
            Event::GeneralRef(reference) => match stack.last_mut() {
                Some(current) => current.text.push_bytes_ref(&reference)?,
                None => return Err(XmlError::ContentOutsideRoot),
            },
            Event::CData(cdata) => match stack.last_mut() {
                Some(current) => {
                    let content = std::str::from_utf8(&cdata)?;
                    check_text(content)?;
                    current.text.push_str(content);
                }
                None => return Err(XmlError::ContentOutsideRoot),
            },
            _ => (),
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::UnclosedElement(open.name));
    }
    root.ok_or(XmlError::MissingRoot)
}

fn element_from_start(start: &BytesStart) -> Result<Element, XmlError> {
    let mut element = Element::new(std::str::from_utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        check_text(&value)?;
        element.attributes.push((key, value));
    }
    Ok(element)
}
