//! Building the composite viewer that replaces an oversized image.
//!
//! The viewer is assembled completely off-tree and then swapped in with a
//! single [`Document::replace`], so the original node and the viewer are
//! never in the document at the same time.
//!
//! Resulting markup:
//!
//! ```text
//! div.media-viewer
//! ├── div.media-menu            one a[data-role=mode-control] per mode
//! ├── div.media-body            clone of the img, or of the enclosing a
//! └── div.media-link            only for linked images: a[href] with the URL
//! ```

use feedview_dom::{Document, DomError, NodeId};

use super::detector::images_within;
use super::mode::{DisplayMode, ModeSet};
use crate::constants::{attrs, classes, roles};

/// Handles into a built viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    /// The `div.media-viewer` element now in the document
    pub root: NodeId,
    /// The control strip
    pub menu: NodeId,
    /// Images inside the viewer body
    pub images: Vec<NodeId>,
    /// Link target shown in the link strip, if the image was linked
    pub link: Option<String>,
}

/// A viewer plus the mapping from replaced images to their copies.
#[derive(Debug, Clone)]
pub(crate) struct BuiltViewer {
    pub viewer: Viewer,
    /// `(original, copy)` for every image in the replaced unit, in document order
    pub image_pairs: Vec<(NodeId, NodeId)>,
}

/// Target of a link, if it can be shown and followed.
///
/// Empty, fragment-only, `javascript:` and whitespace-containing targets are
/// treated as missing.
pub fn link_target(doc: &Document, link: NodeId) -> Option<String> {
    let href = doc.attr(link, "href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    if href
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
    {
        return None;
    }
    Some(href.to_string())
}

/// Replace `image` (or its enclosing link) with a viewer.
pub(crate) fn build_viewer(
    doc: &mut Document,
    image: NodeId,
    modes: &ModeSet,
) -> Result<BuiltViewer, DomError> {
    let parent = doc.parent(image).ok_or(DomError::Detached(image))?;
    let (unit, link) = if doc.is_tag(parent, "a") {
        let target = link_target(doc, parent);
        if target.is_none() {
            log::debug!("Linked image {:?} has no usable target, skipping link strip", image);
        }
        (parent, target)
    } else {
        (image, None)
    };

    let root = doc.create_element("div");
    doc.add_class(root, classes::VIEWER)?;

    let menu = build_menu(doc, modes)?;
    doc.append_child(root, menu)?;

    let body = doc.create_element("div");
    doc.add_class(body, classes::BODY)?;
    let copy = doc.deep_clone(unit)?;
    doc.append_child(body, copy)?;
    doc.append_child(root, body)?;

    if doc.is_tag(copy, "a") {
        // Clicks on the link padding cycle like clicks on the image
        doc.set_attr(copy, roles::ATTR, roles::VIEWER_IMAGE)?;
    }

    let originals = images_within(doc, unit);
    let copies = images_within(doc, copy);
    for &img in &copies {
        doc.remove_attr(img, "width")?;
        doc.remove_attr(img, "height")?;
        doc.set_attr(img, roles::ATTR, roles::VIEWER_IMAGE)?;
        doc.set_style(img, "width", &DisplayMode::AutoFit.css_width(None))?;
    }

    if let Some(url) = &link {
        let strip = build_link_strip(doc, url)?;
        doc.append_child(root, strip)?;
    }

    doc.replace(unit, root)?;

    Ok(BuiltViewer {
        viewer: Viewer {
            root,
            menu,
            images: copies.clone(),
            link,
        },
        image_pairs: originals.into_iter().zip(copies).collect(),
    })
}

fn build_menu(doc: &mut Document, modes: &ModeSet) -> Result<NodeId, DomError> {
    let menu = doc.create_element("div");
    doc.add_class(menu, classes::MENU)?;

    for &mode in modes.modes() {
        let control = doc.create_element("a");
        doc.set_attr(control, "href", "#")?;
        doc.add_class(control, mode.control_class())?;
        if mode == DisplayMode::AutoFit {
            doc.add_class(control, classes::SELECTED)?;
        }
        doc.set_attr(control, roles::ATTR, roles::MODE_CONTROL)?;
        doc.set_attr(control, attrs::MODE, mode.name())?;

        let glyph = doc.create_element("span");
        match (mode.icon(), mode.label()) {
            (Some(icon), _) => doc.add_class(glyph, icon)?,
            (None, Some(label)) => {
                doc.add_class(glyph, "text")?;
                doc.set_text(glyph, label)?;
            }
            (None, None) => {}
        }
        doc.append_child(control, glyph)?;
        doc.append_child(menu, control)?;
    }

    Ok(menu)
}

fn build_link_strip(doc: &mut Document, url: &str) -> Result<NodeId, DomError> {
    let strip = doc.create_element("div");
    doc.add_class(strip, classes::LINK_STRIP)?;
    doc.set_attr(strip, roles::ATTR, roles::LINK_STRIP)?;

    let anchor = doc.create_element("a");
    doc.set_attr(anchor, "href", url)?;
    doc.set_attr(anchor, "target", "_blank")?;
    doc.set_text(anchor, url)?;
    doc.append_child(strip, anchor)?;

    Ok(strip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_img(doc: &Document) -> NodeId {
        doc.find_first(doc.root(), |d, n| d.is_tag(n, "img")).unwrap()
    }

    #[test]
    fn test_plain_image_is_replaced() {
        let mut doc = Document::parse_fragment(
            r#"<div class="content"><p>before</p><img src="big.png" width="2000" height="900"><p>after</p></div>"#,
        )
        .unwrap();
        let content = doc.children(doc.root())[0];
        let image = first_img(&doc);
        let modes = ModeSet::for_pixel_ratio(1.0, 1.5);

        let built = build_viewer(&mut doc, image, &modes).unwrap();
        let viewer = built.viewer;

        assert_eq!(doc.children(content)[1], viewer.root);
        assert!(!doc.is_attached(image));
        assert_eq!(viewer.images.len(), 1);
        let copy = viewer.images[0];
        assert_eq!(doc.attr(copy, "src"), Some("big.png"));
        assert_eq!(doc.attr(copy, "width"), None);
        assert_eq!(doc.attr(copy, "height"), None);
        assert_eq!(doc.style(copy, "width"), Some("100%"));
        assert_eq!(built.image_pairs, vec![(image, copy)]);
        assert!(viewer.link.is_none());
    }

    #[test]
    fn test_menu_controls_follow_mode_order() {
        let mut doc = Document::parse_fragment(r#"<img src="big.png">"#).unwrap();
        let image = first_img(&doc);
        let modes = ModeSet::for_pixel_ratio(2.0, 1.5);
        let viewer = build_viewer(&mut doc, image, &modes).unwrap().viewer;

        let controls = doc.children(viewer.menu).to_vec();
        let names: Vec<_> = controls
            .iter()
            .map(|&c| doc.attr(c, attrs::MODE).unwrap())
            .collect();
        assert_eq!(names, vec!["auto-fit", "actual-size", "retina-halved"]);
        assert!(doc.has_class(controls[0], classes::SELECTED));
        assert!(!doc.has_class(controls[1], classes::SELECTED));
        assert_eq!(doc.text_content(controls[1]), "1:1");
    }

    #[test]
    fn test_linked_image_gets_link_strip() {
        let mut doc = Document::parse_fragment(
            r#"<div class="content"><a href="https://example.com/photo"><img src="big.png"></a></div>"#,
        )
        .unwrap();
        let content = doc.children(doc.root())[0];
        let link = doc.children(content)[0];
        let image = first_img(&doc);
        let modes = ModeSet::for_pixel_ratio(1.0, 1.5);

        let viewer = build_viewer(&mut doc, image, &modes).unwrap().viewer;

        assert!(!doc.is_attached(link));
        assert_eq!(viewer.link.as_deref(), Some("https://example.com/photo"));
        let strip = *doc.children(viewer.root).last().unwrap();
        assert!(doc.has_class(strip, classes::LINK_STRIP));
        assert_eq!(doc.attr(strip, roles::ATTR), Some(roles::LINK_STRIP));
        let anchor = doc.children(strip)[0];
        assert_eq!(doc.attr(anchor, "href"), Some("https://example.com/photo"));
        assert_eq!(doc.text_content(anchor), "https://example.com/photo");
    }

    #[test]
    fn test_malformed_link_target_builds_without_strip() {
        for href in ["", "#", "javascript:void(0)", "has space"] {
            let markup = format!(r#"<a href="{href}"><img src="big.png"></a>"#);
            let mut doc = Document::parse_fragment(&markup).unwrap();
            let image = first_img(&doc);
            let modes = ModeSet::for_pixel_ratio(1.0, 1.5);
            let viewer = build_viewer(&mut doc, image, &modes).unwrap().viewer;

            assert!(viewer.link.is_none(), "href {href:?}");
            assert_eq!(doc.children(viewer.root).len(), 2);
        }
    }

    #[test]
    fn test_detached_image_is_an_error() {
        let mut doc = Document::new();
        let image = doc.create_element("img");
        let modes = ModeSet::for_pixel_ratio(1.0, 1.5);
        assert!(build_viewer(&mut doc, image, &modes).is_err());
    }
}
