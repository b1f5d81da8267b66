//! Minimal owned XML tree used by the table document.
//!
//! Only what the table format needs is modelled: element names, attributes,
//! text and child elements. Comments, processing instructions and doctype
//! declarations are dropped on read.

mod reader;
mod writer;

use thiserror::Error;

pub use reader::{parse_str, read_tree};
pub use writer::{DEFAULT_INDENT_WIDTH, WriteOptions, to_string, write_tree};

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("{0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    CharacterReference(#[from] std::num::ParseIntError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("unknown entity '&{0};'")]
    UnknownEntity(String),

    #[error("document has no root element")]
    MissingRoot,

    #[error("element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("unexpected content outside the root element")]
    ContentOutsideRoot,

    #[error("character reference &#x{0:X}; is not an XML character")]
    InvalidCharacterReference(u32),

    #[error("character U+{0:04X} is not allowed in XML text")]
    InvalidCharacter(u32),
}

/// Whether `c` matches the XML 1.0 `Char` production.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Rejects text containing a character no XML 1.0 document may hold.
pub fn check_text(text: &str) -> Result<(), XmlError> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(XmlError::InvalidCharacter(u32::from(c))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }
}
