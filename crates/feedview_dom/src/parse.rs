//! Markup reading and writing.
//!
//! Article content is server-rendered HTML, which is close to but not quite
//! XML: void elements are left open, attributes may lack values, and named
//! entities such as `&nbsp;` appear. The reader is configured to tolerate all
//! three.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::{Document, DomError, NodeId, NodeKind};

/// HTML elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Whether the tag is an HTML void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Document {
    /// Parse an HTML fragment into a new document under its root.
    pub fn parse_fragment(input: &str) -> Result<Self, DomError> {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_fragment(root, input)?;
        Ok(doc)
    }

    /// Parse markup and append the resulting nodes to `parent`.
    ///
    /// Returns the top-level nodes that were appended. On a parse error the
    /// nodes read so far remain in place.
    pub fn append_fragment(&mut self, parent: NodeId, input: &str) -> Result<Vec<NodeId>, DomError> {
        let mut reader = Reader::from_str(input);
        reader.check_end_names(false);

        let mut stack = vec![parent];
        let mut top_level = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| DomError::Parse {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;
            let current = stack.last().copied().unwrap_or(parent);

            match event {
                XmlEvent::Start(start) => {
                    let id = self.element_from(&start)?;
                    self.append_child(current, id)?;
                    if current == parent {
                        top_level.push(id);
                    }
                    let void = self.tag(id).is_some_and(is_void_element);
                    if !void {
                        stack.push(id);
                    }
                }
                XmlEvent::Empty(start) => {
                    let id = self.element_from(&start)?;
                    self.append_child(current, id)?;
                    if current == parent {
                        top_level.push(id);
                    }
                }
                XmlEvent::End(end) => {
                    let name = lossy(end.name().as_ref()).to_ascii_lowercase();
                    // Close the nearest open element with this name; stray
                    // closing tags (including `</img>`) are ignored.
                    let open = stack
                        .iter()
                        .enumerate()
                        .skip(1)
                        .rev()
                        .find(|(_, id)| self.tag(**id) == Some(name.as_str()))
                        .map(|(index, _)| index);
                    if let Some(index) = open {
                        stack.truncate(index);
                    }
                }
                XmlEvent::Text(text) => {
                    let content = match text.unescape() {
                        Ok(value) => value.into_owned(),
                        Err(_) => lossy(&text),
                    };
                    if !content.is_empty() {
                        let id = self.create_text(&content);
                        self.append_child(current, id)?;
                        if current == parent {
                            top_level.push(id);
                        }
                    }
                }
                XmlEvent::CData(data) => {
                    let id = self.create_text(&lossy(&data));
                    self.append_child(current, id)?;
                    if current == parent {
                        top_level.push(id);
                    }
                }
                XmlEvent::Comment(_)
                | XmlEvent::Decl(_)
                | XmlEvent::PI(_)
                | XmlEvent::DocType(_) => {}
                XmlEvent::Eof => break,
            }
        }

        Ok(top_level)
    }

    fn element_from(&mut self, start: &BytesStart<'_>) -> Result<NodeId, DomError> {
        let tag = lossy(start.name().as_ref());
        let id = self.create_element(&tag);
        for attr in start.html_attributes() {
            let attr = attr.map_err(|e| DomError::Parse {
                position: 0,
                message: e.to_string(),
            })?;
            let key = lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => lossy(&attr.value),
            };
            self.set_attr(id, &key, &value)?;
        }
        Ok(id)
    }

    /// Serialize a node and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialize the children of a node.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(&escape(text)),
            Some(NodeKind::Element(element)) => {
                out.push('<');
                out.push_str(element.tag());
                for (key, value) in element.attrs() {
                    push_attr(out, key, value);
                }
                if !element.style().is_empty() {
                    let style = element
                        .style()
                        .iter()
                        .map(|(property, value)| format!("{property}: {value}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    push_attr(out, "style", &style);
                }
                out.push('>');
                if is_void_element(element.tag()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(element.tag());
                out.push('>');
            }
            None => {}
        }
    }
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}
