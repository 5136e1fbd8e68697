//! Code block highlighting hook.
//!
//! Highlighting itself is delegated to a [`Highlighter`]; this module only
//! decides whether the page wants it and hands over the blocks.

use feedview_dom::{Document, DomError, NodeId};

use crate::constants::classes;

/// Syntax highlighter applied to one `pre` block at a time.
pub trait Highlighter {
    fn highlight(&mut self, doc: &mut Document, block: NodeId) -> Result<(), DomError>;
}

/// Marks blocks with the stylesheet's highlight class and a language class
/// taken from a nested `code.language-*` element, when present.
#[derive(Debug, Clone, Default)]
pub struct ClassHighlighter {
    highlighted: usize,
}

impl ClassHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }
}

impl Highlighter for ClassHighlighter {
    fn highlight(&mut self, doc: &mut Document, block: NodeId) -> Result<(), DomError> {
        let language = doc
            .find_first(block, |d, n| d.is_tag(n, "code"))
            .and_then(|code| doc.attr(code, "class"))
            .and_then(|class| {
                class
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
            })
            .map(str::to_string);

        doc.add_class(block, "hljs")?;
        if let Some(language) = language {
            doc.add_class(block, &language)?;
        }
        self.highlighted += 1;
        Ok(())
    }
}

/// Whether the page asked for highlighting.
pub fn is_enabled(doc: &Document) -> bool {
    doc.find_first(doc.root(), |d, n| d.has_class(n, classes::HIGHLIGHT_MARKER))
        .is_some()
}

/// Run the highlighter over every `pre` block if the page has the marker.
///
/// Returns the number of blocks handed over.
pub fn highlight_blocks(
    doc: &mut Document,
    highlighter: &mut dyn Highlighter,
) -> Result<usize, DomError> {
    if !is_enabled(doc) {
        return Ok(0);
    }
    let root = doc.root();
    let blocks = doc.find_all(root, |d, n| d.is_tag(n, "pre"));
    for &block in &blocks {
        highlighter.highlight(doc, block)?;
    }
    log::debug!("Highlighted {} code blocks", blocks.len());
    Ok(blocks.len())
}
