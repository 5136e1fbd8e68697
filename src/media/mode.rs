//! Display modes of an image viewer.

use serde::{Deserialize, Serialize};

/// Scaling policy applied to the images of a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Width forced to 100% of the reading column
    AutoFit,
    /// Intrinsic width, scrolling horizontally if needed
    ActualSize,
    /// Half the intrinsic width, for high-density displays
    RetinaHalved,
}

impl DisplayMode {
    /// Name used in the `data-mode` attribute and in signals.
    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::AutoFit => "auto-fit",
            DisplayMode::ActualSize => "actual-size",
            DisplayMode::RetinaHalved => "retina-halved",
        }
    }

    /// Parse a `data-mode` attribute value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto-fit" => Some(DisplayMode::AutoFit),
            "actual-size" => Some(DisplayMode::ActualSize),
            "retina-halved" => Some(DisplayMode::RetinaHalved),
            _ => None,
        }
    }

    /// Class of the control element, styled by the page's stylesheet.
    pub fn control_class(&self) -> &'static str {
        match self {
            DisplayMode::AutoFit => "fit",
            DisplayMode::ActualSize => "zoom1",
            DisplayMode::RetinaHalved => "retina",
        }
    }

    /// Text label for modes without an icon.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            DisplayMode::ActualSize => Some("1:1"),
            DisplayMode::AutoFit | DisplayMode::RetinaHalved => None,
        }
    }

    /// Icon class for modes rendered as a glyph.
    pub fn icon(&self) -> Option<&'static str> {
        match self {
            DisplayMode::AutoFit => Some("icon-fullscreen"),
            DisplayMode::RetinaHalved => Some("icon-eye-open"),
            DisplayMode::ActualSize => None,
        }
    }

    /// CSS width an image gets in this mode.
    ///
    /// `natural_width` is the probed intrinsic width. Until the probe resolves
    /// the retina mode falls back to the intrinsic size.
    pub fn css_width(&self, natural_width: Option<u32>) -> String {
        match (self, natural_width) {
            (DisplayMode::AutoFit, _) => "100%".to_string(),
            (DisplayMode::ActualSize, _) => "auto".to_string(),
            (DisplayMode::RetinaHalved, Some(width)) => format!("{}px", width as f32 / 2.0),
            (DisplayMode::RetinaHalved, None) => "auto".to_string(),
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered set of modes offered by viewers on this page.
///
/// The order is both the control strip order and the cycling order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSet {
    modes: Vec<DisplayMode>,
}

impl ModeSet {
    /// Modes for a display: retina-halved only at or above `threshold`.
    pub fn for_pixel_ratio(device_pixel_ratio: f32, threshold: f32) -> Self {
        let mut modes = vec![DisplayMode::AutoFit, DisplayMode::ActualSize];
        if device_pixel_ratio >= threshold {
            modes.push(DisplayMode::RetinaHalved);
        }
        Self { modes }
    }

    /// Build from an explicit list, e.g. the controls found in a viewer.
    pub fn from_modes(modes: Vec<DisplayMode>) -> Self {
        Self { modes }
    }

    pub fn modes(&self) -> &[DisplayMode] {
        &self.modes
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn contains(&self, mode: DisplayMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Mode following `current`, wrapping to the first.
    ///
    /// With no current mode (or one not in the set) the first mode is returned.
    pub fn next_after(&self, current: Option<DisplayMode>) -> Option<DisplayMode> {
        let first = self.modes.first().copied();
        let Some(current) = current else {
            return first;
        };
        match self.modes.iter().position(|&m| m == current) {
            Some(index) => self
                .modes
                .get(index + 1)
                .copied()
                .or(first),
            None => first,
        }
    }
}
