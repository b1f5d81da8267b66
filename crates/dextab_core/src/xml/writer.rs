use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{Element, XmlError, check_text};

pub const DEFAULT_INDENT_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent_width: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent_width: DEFAULT_INDENT_WIDTH,
        }
    }
}

/// Writes `root` as an indented UTF-8 document, one element per line.
///
/// Leaf text stays inline with its tags and empty leaves collapse to `<tag/>`,
/// so the output never contains blank lines of its own making.
pub fn write_tree<W: Write>(root: &Element, out: W, options: &WriteOptions) -> Result<(), XmlError> {
    let mut writer = Writer::new_with_indent(out, b' ', options.indent_width);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    writer.get_mut().write_all(b"\n")?;
    writer.get_mut().flush()?;
    Ok(())
}

pub fn to_string(root: &Element, options: &WriteOptions) -> Result<String, XmlError> {
    let mut out = Vec::new();
    write_tree(root, &mut out, options)?;
    String::from_utf8(out).map_err(|e| XmlError::Utf8(e.utf8_error()))
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        check_text(value)?;
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.is_leaf() && element.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        check_text(&element.text)?;
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
