//! Page-level scenarios for the media engine.

mod interaction;

use feedview_dom::{Document, NodeId};
use web_time::Duration;

use super::{KnownImages, MediaEngine, PageMetrics, Signal};
use crate::config::MediaConfig;
use crate::constants::classes;

pub(super) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

pub(super) fn engine(column_width: f32, device_pixel_ratio: f32) -> MediaEngine {
    MediaEngine::new(
        MediaConfig::default(),
        PageMetrics {
            column_width: Some(column_width),
            device_pixel_ratio,
        },
    )
}

pub(super) fn article(body: &str) -> Document {
    Document::parse_fragment(&format!(r#"<div class="entry content">{body}</div>"#)).unwrap()
}

/// Scan the whole document at t=0 with the given image table.
pub(super) fn scanned(
    engine: &mut MediaEngine,
    doc: &mut Document,
    images: &mut KnownImages,
) -> super::ScanSummary {
    let root = doc.root();
    engine.scan(doc, root, images, ms(0)).unwrap()
}

pub(super) fn image_by_src(doc: &Document, src: &str) -> NodeId {
    doc.find_first(doc.root(), |d, n| d.is_tag(n, "img") && d.attr(n, "src") == Some(src))
        .unwrap()
}

pub(super) fn viewer_roots(doc: &Document) -> Vec<NodeId> {
    doc.find_all(doc.root(), |d, n| d.has_class(n, classes::VIEWER))
}

pub(super) fn settled_count(signals: &[Signal]) -> usize {
    signals
        .iter()
        .filter(|s| **s == Signal::ContentImagesSettled)
        .count()
}
