//! Horizontal scrolling for wide tables in article content.

use feedview_dom::{Document, DomError, NodeId};

use crate::constants::classes;
use crate::media::in_content_region;

/// Mark the `div` wrapping each content table as scrollable.
///
/// Returns the wrappers that were marked. Tables directly inside other
/// elements are left alone.
pub fn enable_overflow(doc: &mut Document) -> Result<Vec<NodeId>, DomError> {
    let root = doc.root();
    let tables = doc.find_all(root, |d, n| d.is_tag(n, "table") && in_content_region(d, n));

    let mut wrappers = Vec::new();
    for table in tables {
        let Some(parent) = doc.parent(table) else {
            continue;
        };
        if doc.is_tag(parent, "div") && !wrappers.contains(&parent) {
            doc.add_class(parent, classes::OVERFLOW)?;
            wrappers.push(parent);
        }
    }
    if !wrappers.is_empty() {
        log::debug!("Enabled overflow on {} table wrappers", wrappers.len());
    }
    Ok(wrappers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_div_parents_in_content() {
        let mut doc = Document::parse_fragment(
            r#"<div class="content"><div id="a"><table></table></div><p><table></table></p></div><div id="b"><table></table></div>"#,
        )
        .unwrap();

        let wrappers = enable_overflow(&mut doc).unwrap();

        let a = doc.element_by_id("a").unwrap();
        let b = doc.element_by_id("b").unwrap();
        assert_eq!(wrappers, vec![a]);
        assert!(doc.has_class(a, classes::OVERFLOW));
        assert!(!doc.has_class(b, classes::OVERFLOW));
    }

    #[test]
    fn test_content_div_itself_can_wrap() {
        let mut doc =
            Document::parse_fragment(r#"<div class="content"><table></table></div>"#).unwrap();
        let content = doc.children(doc.root())[0];

        enable_overflow(&mut doc).unwrap();

        assert!(doc.has_class(content, classes::OVERFLOW));
        assert!(doc.has_class(content, classes::CONTENT));
    }
}
