//! Finding content images and deciding which ones need a viewer.

use std::collections::HashMap;

use feedview_dom::{Document, NodeId};

use crate::constants::classes;

/// Load state of an image's bytes as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Loaded; natural dimensions are known
    Complete { natural_width: u32 },
    /// Still downloading; a load event will follow
    Pending,
    /// Network or decode error
    Failed,
}

/// Host query for an image's load state by source URL.
pub trait ImageSource {
    fn status(&mut self, src: &str) -> LoadStatus;
}

impl<F> ImageSource for F
where
    F: FnMut(&str) -> LoadStatus,
{
    fn status(&mut self, src: &str) -> LoadStatus {
        self(src)
    }
}

/// Image source backed by a fixed table; unknown sources are pending.
#[derive(Debug, Clone, Default)]
pub struct KnownImages {
    statuses: HashMap<String, LoadStatus>,
}

impl KnownImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an image as loaded with the given natural width.
    pub fn loaded(mut self, src: &str, natural_width: u32) -> Self {
        self.set(src, LoadStatus::Complete { natural_width });
        self
    }

    /// Record an image as failed.
    pub fn failed(mut self, src: &str) -> Self {
        self.set(src, LoadStatus::Failed);
        self
    }

    pub fn set(&mut self, src: &str, status: LoadStatus) {
        self.statuses.insert(src.to_string(), status);
    }
}

impl ImageSource for KnownImages {
    fn status(&mut self, src: &str) -> LoadStatus {
        self.statuses
            .get(src)
            .copied()
            .unwrap_or(LoadStatus::Pending)
    }
}

/// Outcome of comparing an image with the reading column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Fits the column; left untouched
    Fits,
    /// Wider than the column; gets a viewer
    Oversized,
}

/// Compare a natural width to the column width.
///
/// An unknown or non-positive column width counts as "fits": without a
/// measurement there is nothing to enhance against.
pub fn classify(natural_width: u32, column_width: Option<f32>) -> Fit {
    match column_width {
        Some(column) if column > 0.0 && natural_width as f32 > column => Fit::Oversized,
        _ => Fit::Fits,
    }
}

/// Whether the page asked for image viewers.
pub fn media_enabled(doc: &Document) -> bool {
    doc.find_first(doc.root(), |d, n| d.has_class(n, classes::MEDIA_MARKER))
        .is_some()
}

/// Whether a node lies in a content region (itself or an ancestor has the class).
pub fn in_content_region(doc: &Document, node: NodeId) -> bool {
    doc.closest(node, |d, n| d.has_class(n, classes::CONTENT))
        .is_some()
}

/// All `img` elements inside content regions under `scope`, in document order.
pub fn content_images(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    doc.find_all(scope, |d, n| d.is_tag(n, "img") && in_content_region(d, n))
}

/// `img` elements in a subtree, including the root itself.
pub fn images_within(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut images = Vec::new();
    if doc.is_tag(node, "img") {
        images.push(node);
    }
    images.extend(doc.find_all(node, |d, n| d.is_tag(n, "img")));
    images
}
