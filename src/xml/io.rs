//! Parsing and serialization between XML text and the arena model.
//!
//! Fidelity rule: everything the reconciler does not understand (foreign
//! elements, attributes, comments, whitespace text nodes) is carried through
//! the arena verbatim so that round-tripping an ARXML file does not discard
//! information the DSL cannot express.

use std::io::Cursor;

use quick_xml::events::{BytesCData, BytesDecl, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{Document, NodeId, NodeKind};

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("unexpected closing tag near byte {0}")]
    UnexpectedClose(u64),
    #[error("serialization failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialized document is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub(super) fn parse(xml: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let id = open_element(&mut doc, &e)?;
                attach(&mut doc, &stack, id);
                stack.push(id);
            }
            Event::Empty(e) => {
                let id = open_element(&mut doc, &e)?;
                attach(&mut doc, &stack, id);
            }
            Event::End(_) => {
                if stack.pop().is_none() {
                    return Err(XmlError::UnexpectedClose(reader.buffer_position() as u64));
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                let id = doc.create_text(&text);
                attach(&mut doc, &stack, id);
            }
            Event::CData(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                let id = doc.alloc(NodeKind::CData(content));
                attach(&mut doc, &stack, id);
            }
            Event::Comment(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                let id = doc.alloc(NodeKind::Comment(content));
                attach(&mut doc, &stack, id);
            }
            Event::Decl(e) => {
                let id = doc.alloc(NodeKind::Declaration(decl_content(&e)));
                attach(&mut doc, &stack, id);
            }
            Event::PI(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                let id = doc.alloc(NodeKind::ProcessingInstruction(content));
                attach(&mut doc, &stack, id);
            }
            Event::DocType(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                let id = doc.alloc(NodeKind::DocType(content));
                attach(&mut doc, &stack, id);
            }
            Event::Eof => break,
        }
    }
    Ok(doc)
}

fn open_element(doc: &mut Document, e: &BytesStart<'_>) -> Result<NodeId, XmlError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let id = doc.create_element(&tag);
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((name, value));
    }
    doc.set_attrs(id, attrs);
    Ok(id)
}

fn attach(doc: &mut Document, stack: &[NodeId], id: NodeId) {
    match stack.last() {
        Some(&parent) => doc.append_raw(parent, id),
        None => doc.push_top(id),
    }
}

/// Reconstruct the declaration content (`xml version=".." ..`) from the
/// parsed pieces.
fn decl_content(e: &BytesDecl<'_>) -> String {
    let version = e
        .version()
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .unwrap_or_else(|_| "1.0".to_string());
    let mut content = format!("xml version=\"{}\"", version);
    if let Some(Ok(enc)) = e.encoding() {
        content.push_str(&format!(" encoding=\"{}\"", String::from_utf8_lossy(&enc)));
    }
    if let Some(Ok(sd)) = e.standalone() {
        content.push_str(&format!(" standalone=\"{}\"", String::from_utf8_lossy(&sd)));
    }
    content
}

pub(super) fn serialize(doc: &Document) -> Result<String, XmlError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    for &id in doc.top_nodes() {
        write_node(doc, id, &mut writer)?;
    }
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_node(
    doc: &Document,
    id: NodeId,
    writer: &mut Writer<Cursor<Vec<u8>>>,
) -> Result<(), XmlError> {
    match doc.kind(id) {
        NodeKind::Element { tag, attrs } => {
            let mut start = BytesStart::new(tag.as_str());
            for (name, value) in attrs {
                start.push_attribute((name.as_str(), value.as_str()));
            }
            let children = doc.children(id);
            if children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for &c in children {
                    write_node(doc, c, writer)?;
                }
                writer.write_event(Event::End(quick_xml::events::BytesEnd::new(tag.as_str())))?;
            }
        }
        NodeKind::Text(t) => {
            writer.write_event(Event::Text(BytesText::new(t)))?;
        }
        NodeKind::Comment(t) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?;
        }
        NodeKind::CData(t) => {
            writer.write_event(Event::CData(BytesCData::new(t.as_str())))?;
        }
        NodeKind::ProcessingInstruction(t) => {
            writer.write_event(Event::PI(BytesPI::new(t.as_str())))?;
        }
        NodeKind::DocType(t) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(t.as_str())))?;
        }
        NodeKind::Declaration(content) => {
            let start = BytesStart::from_content(content.as_str(), 3);
            writer.write_event(Event::Decl(BytesDecl::from_start(start)))?;
        }
    }
    Ok(())
}
