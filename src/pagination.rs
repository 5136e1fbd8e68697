//! "Load more" pagination for entry lists.
//!
//! The list page carries a `.load-more` link pointing at the next page of
//! entries. Fetching is the host's job: [`Pagination::begin`] hands out the
//! URL and [`Pagination::apply_fragment`] takes the response body.

use feedview_dom::{Document, DomError, NodeId};
use serde_json::Value;

use crate::constants::classes;

/// Hidden input receiving the ids of unread entries on the page
pub const UNREAD_IDS_INPUT: &str = "id_entries";
/// Container new entries are appended to
pub const ENTRIES_CONTAINER: &str = "entries";

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("No #{0} element on the page")]
    MissingElement(&'static str),

    #[error("Load-more link has no href")]
    MissingHref,

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// The ids of unread entries, numeric when they look numeric.
pub fn unread_ids(doc: &Document) -> Vec<Value> {
    doc.find_all(doc.root(), |d, n| {
        d.has_class(n, classes::NEW_ENTRY) && d.attr(n, "data-id").is_some()
    })
    .into_iter()
    .filter_map(|entry| doc.attr(entry, "data-id"))
    .map(|id| match id.parse::<i64>() {
        Ok(number) => Value::from(number),
        Err(_) => Value::from(id),
    })
    .collect()
}

/// Write the unread ids as a JSON array into the hidden input, if present.
pub fn write_unread_ids(doc: &mut Document) -> Result<usize, DomError> {
    let ids = unread_ids(doc);
    let Some(input) = doc.element_by_id(UNREAD_IDS_INPUT) else {
        log::trace!("No #{} input, not recording unread ids", UNREAD_IDS_INPUT);
        return Ok(0);
    };
    doc.set_attr(input, "value", &Value::Array(ids.clone()).to_string())?;
    Ok(ids.len())
}

/// State of the load-more link on a list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    link: Option<NodeId>,
    loading: bool,
}

impl Pagination {
    /// Set up pagination if the page has a load-more link.
    pub fn install(doc: &mut Document) -> Result<Option<Self>, PaginationError> {
        let root = doc.root();
        let Some(link) = doc.find_first(root, |d, n| {
            d.is_tag(n, "a") && d.has_class(n, classes::LOAD_MORE)
        }) else {
            return Ok(None);
        };
        write_unread_ids(doc)?;
        Ok(Some(Self {
            link: Some(link),
            loading: false,
        }))
    }

    /// The link, while there are more pages.
    pub fn link(&self) -> Option<NodeId> {
        self.link
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether a click target belongs to the load-more link.
    pub fn is_trigger(&self, doc: &Document, target: NodeId) -> bool {
        self.link
            .is_some_and(|link| doc.closest(target, |_, n| n == link).is_some())
    }

    /// Switch the link to its loading label and return the URL to fetch.
    ///
    /// Returns `None` once the last page was loaded or while a fetch is in
    /// flight.
    pub fn begin(&mut self, doc: &mut Document) -> Result<Option<String>, PaginationError> {
        let Some(link) = self.link else {
            return Ok(None);
        };
        if self.loading {
            return Ok(None);
        }
        let href = doc
            .attr(link, "href")
            .ok_or(PaginationError::MissingHref)?
            .to_string();
        if let Some(label) = doc.attr(link, "data-loading").map(str::to_string) {
            doc.set_text(link, &label)?;
        }
        self.loading = true;
        log::debug!("Loading more entries from {}", href);
        Ok(Some(href))
    }

    /// Append a fetched page of entries and move the link to the next page.
    ///
    /// Returns the next URL, or `None` when the link was removed.
    pub fn apply_fragment(
        &mut self,
        doc: &mut Document,
        fragment: &str,
    ) -> Result<Option<String>, PaginationError> {
        let container = doc
            .element_by_id(ENTRIES_CONTAINER)
            .ok_or(PaginationError::MissingElement(ENTRIES_CONTAINER))?;
        let added = doc.append_fragment(container, fragment)?;
        self.loading = false;

        let next = added
            .iter()
            .flat_map(|&node| {
                let mut nodes = vec![node];
                nodes.extend(doc.descendants(node));
                nodes
            })
            .find(|&n| doc.has_class(n, classes::ENTRIES_INCLUDE))
            .and_then(|include| doc.attr(include, "data-next"))
            .map(str::to_string);

        let Some(link) = self.link else {
            return Ok(None);
        };
        match &next {
            Some(url) => {
                doc.set_attr(link, "href", url)?;
                if let Some(title) = doc.attr(link, "title").map(str::to_string) {
                    doc.set_text(link, &title)?;
                }
            }
            None => {
                log::debug!("Last page of entries loaded");
                doc.detach(link)?;
                self.link = None;
            }
        }
        write_unread_ids(doc)?;
        Ok(next)
    }

    /// Restore the link after a failed fetch.
    pub fn abort(&mut self, doc: &mut Document) -> Result<(), PaginationError> {
        self.loading = false;
        if let Some(link) = self.link {
            if let Some(title) = doc.attr(link, "title").map(str::to_string) {
                doc.set_text(link, &title)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<form><input type="hidden" id="id_entries" value=""></form><ul id="entries"><li class="entry new" data-id="12">a</li><li class="entry" data-id="13">b</li><li class="entry new" data-id="x7">c</li></ul><a class="load-more" href="/unread/?page=2" title="More entries" data-loading="Loading…">More entries</a>"#;

    fn input_value(doc: &Document) -> String {
        let input = doc.element_by_id(UNREAD_IDS_INPUT).unwrap();
        doc.attr(input, "value").unwrap().to_string()
    }

    #[test]
    fn test_no_link_no_pagination() {
        let mut doc = Document::parse_fragment("<ul id=\"entries\"></ul>").unwrap();
        assert!(Pagination::install(&mut doc).unwrap().is_none());
    }

    #[test]
    fn test_install_records_unread_ids() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        Pagination::install(&mut doc).unwrap().unwrap();
        assert_eq!(input_value(&doc), r#"[12,"x7"]"#);
    }

    #[test]
    fn test_begin_shows_loading_label_once() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        let mut pagination = Pagination::install(&mut doc).unwrap().unwrap();
        let link = pagination.link().unwrap();

        assert_eq!(
            pagination.begin(&mut doc).unwrap().as_deref(),
            Some("/unread/?page=2")
        );
        assert_eq!(doc.text_content(link), "Loading…");
        assert!(pagination.begin(&mut doc).unwrap().is_none());
    }

    #[test]
    fn test_fragment_with_next_page() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        let mut pagination = Pagination::install(&mut doc).unwrap().unwrap();
        let link = pagination.link().unwrap();
        pagination.begin(&mut doc).unwrap();

        let next = pagination
            .apply_fragment(
                &mut doc,
                r#"<li class="entry new" data-id="20">d</li><div class="entries-include" data-next="/unread/?page=3"></div>"#,
            )
            .unwrap();

        assert_eq!(next.as_deref(), Some("/unread/?page=3"));
        assert_eq!(doc.attr(link, "href"), Some("/unread/?page=3"));
        assert_eq!(doc.text_content(link), "More entries");
        assert_eq!(input_value(&doc), r#"[12,"x7",20]"#);
        assert!(!pagination.is_loading());
    }

    #[test]
    fn test_last_page_removes_link() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        let mut pagination = Pagination::install(&mut doc).unwrap().unwrap();
        let link = pagination.link().unwrap();
        pagination.begin(&mut doc).unwrap();

        let next = pagination
            .apply_fragment(&mut doc, r#"<li class="entry" data-id="21">e</li>"#)
            .unwrap();

        assert!(next.is_none());
        assert!(!doc.is_attached(link));
        assert!(pagination.link().is_none());
        assert!(pagination.begin(&mut doc).unwrap().is_none());
    }

    #[test]
    fn test_trigger_includes_link_children() {
        let mut doc = Document::parse_fragment(
            r#"<a class="load-more" href="/p2"><span>more</span></a><a href="/x">x</a>"#,
        )
        .unwrap();
        let pagination = Pagination::install(&mut doc).unwrap().unwrap();
        let span = doc.find_first(doc.root(), |d, n| d.is_tag(n, "span")).unwrap();
        let other = doc
            .find_first(doc.root(), |d, n| d.attr(n, "href") == Some("/x"))
            .unwrap();
        assert!(pagination.is_trigger(&doc, span));
        assert!(!pagination.is_trigger(&doc, other));
    }
}
