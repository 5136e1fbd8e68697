//! Overlay visibility and per-viewer mode switching.
//!
//! Everything here works from the document alone: the viewer a click belongs
//! to, its controls and its selected mode are all read from markup. That is
//! what lets one delegated handler serve viewers built at any time.

use feedview_dom::{Document, DomError, NodeId};
use web_time::Duration;

use super::mode::{DisplayMode, ModeSet};
use super::timer::CancelableTimer;
use crate::constants::{attrs, classes, roles};

/// What a click resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// A mode control of a viewer
    ModeControl { viewer: NodeId, control: NodeId },
    /// The image (or its wrapping link) inside a viewer
    ViewerImage { viewer: NodeId },
    /// The link strip; navigation proceeds
    LinkStrip { viewer: NodeId },
    /// Not part of any viewer
    Outside,
}

/// Resolve a click target through the nearest `data-role` ancestor.
pub fn resolve_click(doc: &Document, target: NodeId) -> ClickTarget {
    let Some(viewer) = doc.closest(target, |d, n| d.has_class(n, classes::VIEWER)) else {
        return ClickTarget::Outside;
    };
    let Some(role_node) = doc.closest(target, |d, n| d.attr(n, roles::ATTR).is_some()) else {
        return ClickTarget::Outside;
    };
    // A role above the viewer belongs to something else
    if !doc.ancestors(role_node).contains(&viewer) {
        return ClickTarget::Outside;
    }
    match doc.attr(role_node, roles::ATTR) {
        Some(roles::MODE_CONTROL) => ClickTarget::ModeControl {
            viewer,
            control: role_node,
        },
        Some(roles::VIEWER_IMAGE) => ClickTarget::ViewerImage { viewer },
        Some(roles::LINK_STRIP) => ClickTarget::LinkStrip { viewer },
        _ => ClickTarget::Outside,
    }
}

/// Mode controls of a viewer in strip order.
pub fn mode_controls(doc: &Document, viewer: NodeId) -> Vec<(NodeId, DisplayMode)> {
    doc.find_all(viewer, |d, n| d.attr(n, roles::ATTR) == Some(roles::MODE_CONTROL))
        .into_iter()
        .filter_map(|control| {
            let mode = DisplayMode::from_name(doc.attr(control, attrs::MODE)?)?;
            Some((control, mode))
        })
        .collect()
}

/// Modes offered by a viewer, read from its controls.
pub fn viewer_modes(doc: &Document, viewer: NodeId) -> ModeSet {
    ModeSet::from_modes(mode_controls(doc, viewer).into_iter().map(|(_, m)| m).collect())
}

/// The mode whose control is marked selected, if any.
pub fn selected_mode(doc: &Document, viewer: NodeId) -> Option<DisplayMode> {
    mode_controls(doc, viewer)
        .into_iter()
        .find(|(control, _)| doc.has_class(*control, classes::SELECTED))
        .map(|(_, mode)| mode)
}

/// Restyle every image in the viewer for `mode`.
pub fn apply_mode(doc: &mut Document, viewer: NodeId, mode: DisplayMode) -> Result<(), DomError> {
    let images = doc.find_all(viewer, |d, n| d.is_tag(n, "img"));
    for img in images {
        let natural = doc
            .attr(img, attrs::NATURAL_WIDTH)
            .and_then(|w| w.parse::<u32>().ok());
        let width = mode.css_width(natural);
        doc.set_style(img, "width", &width)?;
    }
    Ok(())
}

/// Make `mode` the selected mode of the viewer.
///
/// Returns `false` without touching the document when it already is selected
/// or the viewer does not offer it.
pub fn select_mode(doc: &mut Document, viewer: NodeId, mode: DisplayMode) -> Result<bool, DomError> {
    let controls = mode_controls(doc, viewer);
    let Some(&(target, _)) = controls.iter().find(|(_, m)| *m == mode) else {
        log::debug!("Viewer {:?} does not offer mode {}", viewer, mode);
        return Ok(false);
    };
    if doc.has_class(target, classes::SELECTED) {
        return Ok(false);
    }
    for (control, _) in &controls {
        doc.remove_class(*control, classes::SELECTED)?;
    }
    doc.add_class(target, classes::SELECTED)?;
    apply_mode(doc, viewer, mode)?;
    Ok(true)
}

/// Advance the viewer to its next mode, wrapping around.
///
/// With no selected control the first offered mode is selected.
pub fn cycle_mode(doc: &mut Document, viewer: NodeId) -> Result<Option<DisplayMode>, DomError> {
    let modes = viewer_modes(doc, viewer);
    let current = selected_mode(doc, viewer);
    let Some(next) = modes.next_after(current) else {
        return Ok(None);
    };
    select_mode(doc, viewer, next)?;
    Ok(Some(next))
}

/// Shows all viewer control strips on interaction and hides them after a
/// quiet period. One timer serves every viewer on the page.
#[derive(Debug, Clone)]
pub struct OverlayController {
    hide_delay: Duration,
    timer: CancelableTimer,
    visible: bool,
}

impl OverlayController {
    pub fn new(hide_delay: Duration) -> Self {
        Self {
            hide_delay,
            timer: CancelableTimer::new(),
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Deadline of the pending hide, if any.
    pub fn hide_deadline(&self) -> Option<Duration> {
        self.timer.deadline()
    }

    /// Fade the overlay in and restart the quiet period.
    pub fn reveal(&mut self, doc: &mut Document, now: Duration) -> Result<(), DomError> {
        set_menus_visible(doc, true)?;
        self.visible = true;
        self.timer.restart(now, self.hide_delay);
        Ok(())
    }

    /// Hide the overlay if the quiet period has elapsed.
    ///
    /// Returns `true` when the overlay was hidden by this call.
    pub fn tick(&mut self, doc: &mut Document, now: Duration) -> Result<bool, DomError> {
        if !self.timer.fire_if_due(now) {
            return Ok(false);
        }
        set_menus_visible(doc, false)?;
        self.visible = false;
        Ok(true)
    }
}

fn set_menus_visible(doc: &mut Document, visible: bool) -> Result<(), DomError> {
    let (add, remove) = if visible {
        (classes::FADE_IN, classes::FADE_OUT)
    } else {
        (classes::FADE_OUT, classes::FADE_IN)
    };
    let root = doc.root();
    let menus = doc.find_all(root, |d, n| d.has_class(n, classes::MENU));
    for menu in menus {
        doc.remove_class(menu, remove)?;
        doc.add_class(menu, add)?;
    }
    Ok(())
}
