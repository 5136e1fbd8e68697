//! Global constants for page behavior

/// Device pixel ratio from which the retina-halved mode is offered
pub const RETINA_PIXEL_RATIO: f32 = 1.5;

/// Quiet period after the last interaction before the viewer overlay hides
pub const OVERLAY_HIDE_DELAY_MS: u64 = 2000;

/// How long an image may stay unloaded before it is given up on
pub const IMAGE_LOAD_TIMEOUT_MS: u64 = 10_000;

/// Pause after which a partially typed key sequence is discarded
pub const KEY_SEQUENCE_TIMEOUT_MS: u64 = 1000;

/// Refresh interval of the job-queue dashboard
pub const DASHBOARD_POLL_INTERVAL_MS: u64 = 2500;

/// Page header, by id
pub const HEADER_ID: &str = "header";

/// Class names that make up the markup contract with the stylesheet.
pub mod classes {
    /// Article body region scanned for images
    pub const CONTENT: &str = "content";
    /// Composite viewer replacing an oversized image
    pub const VIEWER: &str = "media-viewer";
    /// Control strip inside a viewer
    pub const MENU: &str = "media-menu";
    /// Neutral wrapper holding the cloned image markup
    pub const BODY: &str = "media-body";
    /// Visible link target under a linked image
    pub const LINK_STRIP: &str = "media-link";
    /// Marks the active mode control
    pub const SELECTED: &str = "selected";
    /// Overlay visibility transitions
    pub const FADE_IN: &str = "fade-in";
    pub const FADE_OUT: &str = "fade-out";
    /// Presence of this marker enables inline image viewers
    pub const MEDIA_MARKER: &str = "media-viewers";
    /// Presence of this marker enables code highlighting
    pub const HIGHLIGHT_MARKER: &str = "code-highlight";
    /// Tables in content get horizontal scrolling through this class
    pub const OVERFLOW: &str = "overflow";
    /// "Load more" pagination link
    pub const LOAD_MORE: &str = "load-more";
    /// Header link carrying the entry list URLs
    pub const HOME_LINK: &str = "home";
    /// Wrapper of the link to the original article
    pub const ENTRY_DATE: &str = "date";
    /// Entries not yet marked as read
    pub const NEW_ENTRY: &str = "new";
    /// Element inside a fetched page fragment that carries the next URL
    pub const ENTRIES_INCLUDE: &str = "entries-include";
}

/// Semantic roles used for delegated click dispatch.
pub mod roles {
    /// Attribute holding the role
    pub const ATTR: &str = "data-role";
    pub const MODE_CONTROL: &str = "mode-control";
    pub const VIEWER_IMAGE: &str = "viewer-image";
    pub const LINK_STRIP: &str = "link-strip";
}

/// Data attributes written by the behavior layer.
pub mod attrs {
    /// Display mode a control activates
    pub const MODE: &str = "data-mode";
    /// Probed natural width of a viewer image, in pixels
    pub const NATURAL_WIDTH: &str = "data-width";
    /// Key sequences bound to a page element, comma separated
    pub const SHORTCUT: &str = "data-shortcut";
    /// URL of the full entry list, on the home link
    pub const ALL_ENTRIES: &str = "data-all";
    /// URL of the unread entry list, on the home link
    pub const UNREAD_ENTRIES: &str = "data-unread";
}
