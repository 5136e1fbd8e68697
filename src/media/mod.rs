//! Inline image enhancement.
//!
//! [`MediaEngine`] scans the content region for images, replaces the ones
//! wider than the reading column with interactive viewers, and drives the
//! shared control overlay. It is the single owner of the page's media state:
//! the settle latch, the overlay timer and the set of images still loading.
//!
//! The host feeds it three kinds of input, always with the current time as a
//! [`Duration`] since page load:
//! - image load completions ([`MediaEngine::image_loaded`]),
//! - user events ([`MediaEngine::handle_event`]),
//! - clock ticks ([`MediaEngine::tick`]).
//!
//! Signals for other collaborators are queued and drained with
//! [`MediaEngine::take_signals`].

mod detector;
mod latch;
mod mode;
mod overlay;
mod timer;
mod viewer;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashSet};

use feedview_dom::{Dispatch, Document, DomError, Event, NodeId};
use thiserror::Error;
use web_time::Duration;

use crate::config::MediaConfig;
use crate::constants::attrs;

pub use detector::{
    classify, content_images, images_within, in_content_region, media_enabled, Fit, ImageSource,
    KnownImages, LoadStatus,
};
pub use latch::SettleLatch;
pub use mode::{DisplayMode, ModeSet};
pub use overlay::{
    apply_mode, cycle_mode, mode_controls, resolve_click, select_mode, selected_mode,
    viewer_modes, ClickTarget, OverlayController,
};
pub use timer::CancelableTimer;
pub use viewer::{link_target, Viewer};

/// Errors surfaced by the media engine.
///
/// Per-image failures never show up here; they degrade to "no enhancement"
/// for that image and are logged.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The content region was already scanned for this page
    #[error("Content images were already scanned for this page")]
    AlreadyScanned,

    /// Document operation failed outside of per-image processing
    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// Rendered measurements the engine compares against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    /// Rendered width of the reading column, if it could be measured
    pub column_width: Option<f32>,
    /// Device pixel ratio of the display
    pub device_pixel_ratio: f32,
}

impl Default for PageMetrics {
    fn default() -> Self {
        Self {
            column_width: None,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Signals exposed to other page collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Every content image has been classified and, if needed, rebuilt
    ContentImagesSettled,
    /// A click on a viewer image cycled its mode
    ImageTapped,
    /// A viewer switched to a different mode
    ModeChanged { viewer: NodeId, mode: DisplayMode },
}

impl Signal {
    /// Event name as seen by page scripts.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::ContentImagesSettled => "content-images-settled",
            Signal::ImageTapped => "image-tapped",
            Signal::ModeChanged { .. } => "mode-changed",
        }
    }
}

/// Counts from the initial scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Content images found
    pub found: usize,
    /// Images already loaded that fit the column
    pub fitted: usize,
    /// Viewers built during the scan
    pub viewers: usize,
    /// Images that failed to load
    pub failed: usize,
    /// Images still loading or being probed
    pub pending: usize,
}

/// What an outstanding image is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waiting {
    /// Content image whose bytes are not loaded yet
    Detect { since: Duration },
    /// Viewer image whose natural width is being probed
    Probe {
        since: Duration,
        viewer: NodeId,
        counted: bool,
    },
}

impl Waiting {
    fn since(&self) -> Duration {
        match self {
            Waiting::Detect { since } | Waiting::Probe { since, .. } => *since,
        }
    }

    fn counted(&self) -> bool {
        match self {
            Waiting::Detect { .. } => true,
            Waiting::Probe { counted, .. } => *counted,
        }
    }
}

/// Page-scoped controller for inline image viewers.
#[derive(Debug)]
pub struct MediaEngine {
    config: MediaConfig,
    metrics: PageMetrics,
    modes: ModeSet,
    latch: Option<SettleLatch>,
    waiting: BTreeMap<NodeId, Waiting>,
    /// Content images whose determination has been counted down
    settled: HashSet<NodeId>,
    viewers: Vec<Viewer>,
    overlay: OverlayController,
    signals: Vec<Signal>,
}

impl MediaEngine {
    pub fn new(config: MediaConfig, metrics: PageMetrics) -> Self {
        let modes = ModeSet::for_pixel_ratio(metrics.device_pixel_ratio, config.retina_threshold);
        let overlay = OverlayController::new(config.overlay_hide_delay());
        Self {
            config,
            metrics,
            modes,
            latch: None,
            waiting: BTreeMap::new(),
            settled: HashSet::new(),
            viewers: Vec::new(),
            overlay,
            signals: Vec::new(),
        }
    }

    pub fn metrics(&self) -> PageMetrics {
        self.metrics
    }

    /// Column width used for images classified from now on.
    pub fn set_column_width(&mut self, column_width: Option<f32>) {
        self.metrics.column_width = column_width;
    }

    /// Modes offered by viewers on this page.
    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    pub fn viewers(&self) -> &[Viewer] {
        &self.viewers
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    /// Whether the settle signal has fired.
    pub fn is_settled(&self) -> bool {
        self.latch.as_ref().is_some_and(SettleLatch::has_fired)
    }

    /// Determinations still outstanding, or `None` before the scan.
    pub fn remaining(&self) -> Option<usize> {
        self.latch.as_ref().map(SettleLatch::remaining)
    }

    /// Images waiting for a load or probe result.
    pub fn waiting_images(&self) -> Vec<NodeId> {
        self.waiting.keys().copied().collect()
    }

    /// Drain queued signals in emission order.
    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// Scan `scope` for content images and classify those already loaded.
    ///
    /// Runs once per page. With no images the settle signal fires right away.
    pub fn scan(
        &mut self,
        doc: &mut Document,
        scope: NodeId,
        images: &mut dyn ImageSource,
        now: Duration,
    ) -> Result<ScanSummary, MediaError> {
        if self.latch.is_some() {
            return Err(MediaError::AlreadyScanned);
        }
        let found = content_images(doc, scope);
        log::debug!("Found {} content images", found.len());
        self.latch = Some(SettleLatch::new(found.len()));

        let mut summary = ScanSummary {
            found: found.len(),
            ..Default::default()
        };

        // Statuses are gathered first: building a viewer for one image can
        // claim later images that share its link.
        for image in found {
            if self.settled.contains(&image) || !doc.is_attached(image) {
                continue;
            }
            let src = doc.attr(image, "src").unwrap_or_default().to_string();
            match images.status(&src) {
                LoadStatus::Complete { natural_width } => {
                    match self.evaluate(doc, image, natural_width, images, now)? {
                        Fit::Fits => summary.fitted += 1,
                        Fit::Oversized => summary.viewers += 1,
                    }
                }
                LoadStatus::Failed => {
                    log::warn!("Image {} failed to load, leaving it as is", src);
                    summary.failed += 1;
                    self.settle(doc, image, now)?;
                }
                LoadStatus::Pending => {
                    self.waiting.insert(image, Waiting::Detect { since: now });
                }
            }
        }

        if self.latch.as_ref().is_some_and(SettleLatch::check) {
            self.on_settled(doc, now)?;
        }

        summary.pending = self.waiting.len();
        Ok(summary)
    }

    /// Settle without looking at any image, for pages that have not opted in.
    pub fn skip(&mut self, doc: &mut Document, now: Duration) -> Result<(), MediaError> {
        if self.latch.is_some() {
            return Err(MediaError::AlreadyScanned);
        }
        log::debug!("Image viewers not enabled on this page");
        let latch = SettleLatch::new(0);
        let fired = latch.check();
        self.latch = Some(latch);
        if fired {
            self.on_settled(doc, now)?;
        }
        Ok(())
    }

    /// Report a load result for an image the engine is waiting on.
    ///
    /// Results for unknown images, and repeated results, are ignored.
    pub fn image_loaded(
        &mut self,
        doc: &mut Document,
        image: NodeId,
        status: LoadStatus,
        images: &mut dyn ImageSource,
        now: Duration,
    ) -> Result<(), MediaError> {
        if status == LoadStatus::Pending {
            return Ok(());
        }
        let Some(waiting) = self.waiting.remove(&image) else {
            log::trace!("Ignoring load result for {:?}", image);
            return Ok(());
        };

        match (waiting, status) {
            (Waiting::Detect { .. }, LoadStatus::Complete { natural_width }) => {
                self.evaluate(doc, image, natural_width, images, now)?;
            }
            (Waiting::Detect { .. }, _) => {
                log::warn!("Image {:?} failed to load, leaving it as is", image);
                self.settle(doc, image, now)?;
            }
            (Waiting::Probe { viewer, counted, .. }, LoadStatus::Complete { natural_width }) => {
                self.record_natural_width(doc, viewer, image, natural_width)?;
                if counted {
                    self.count_down(doc, now)?;
                }
            }
            (Waiting::Probe { counted, .. }, _) => {
                log::warn!("Could not probe natural width of {:?}", image);
                if counted {
                    self.count_down(doc, now)?;
                }
            }
        }
        Ok(())
    }

    /// Advance timers: hide the overlay after its quiet period and give up on
    /// images that exceeded the load timeout.
    pub fn tick(&mut self, doc: &mut Document, now: Duration) -> Result<(), MediaError> {
        let timeout = self.config.load_timeout();
        let expired: Vec<(NodeId, Waiting)> = self
            .waiting
            .iter()
            .filter(|(_, w)| now >= w.since() + timeout)
            .map(|(&id, &w)| (id, w))
            .collect();
        for (image, waiting) in expired {
            self.waiting.remove(&image);
            log::warn!("Image {:?} timed out after {:?}", image, timeout);
            if waiting.counted() {
                self.count_down(doc, now)?;
            }
        }

        if self.overlay.tick(doc, now)? {
            log::trace!("Overlay hidden");
        }
        Ok(())
    }

    /// Delegated handler for page events.
    pub fn handle_event(
        &mut self,
        doc: &mut Document,
        event: &Event,
        now: Duration,
    ) -> Result<Dispatch, MediaError> {
        match event {
            Event::Scroll | Event::MouseMoved => {
                self.overlay.reveal(doc, now)?;
                Ok(Dispatch::ignored())
            }
            Event::Click { target } => self.handle_click(doc, *target, now),
            Event::KeyPressed { .. } => Ok(Dispatch::ignored()),
        }
    }

    fn handle_click(
        &mut self,
        doc: &mut Document,
        target: NodeId,
        now: Duration,
    ) -> Result<Dispatch, MediaError> {
        match resolve_click(doc, target) {
            ClickTarget::ModeControl { viewer, control } => {
                let Some(mode) = doc
                    .attr(control, attrs::MODE)
                    .and_then(DisplayMode::from_name)
                else {
                    return Ok(Dispatch::suppressed());
                };
                if select_mode(doc, viewer, mode)? {
                    self.signals.push(Signal::ModeChanged { viewer, mode });
                    Ok(Dispatch::consumed())
                } else {
                    Ok(Dispatch::suppressed())
                }
            }
            ClickTarget::ViewerImage { viewer } => {
                let before = selected_mode(doc, viewer);
                if let Some(mode) = cycle_mode(doc, viewer)? {
                    if before != Some(mode) {
                        self.signals.push(Signal::ModeChanged { viewer, mode });
                    }
                }
                self.signals.push(Signal::ImageTapped);
                self.overlay.reveal(doc, now)?;
                Ok(Dispatch::consumed())
            }
            ClickTarget::LinkStrip { .. } => Ok(Dispatch::passthrough()),
            ClickTarget::Outside => Ok(Dispatch::ignored()),
        }
    }

    /// Classify a loaded content image and build a viewer if it is oversized.
    fn evaluate(
        &mut self,
        doc: &mut Document,
        image: NodeId,
        natural_width: u32,
        images: &mut dyn ImageSource,
        now: Duration,
    ) -> Result<Fit, MediaError> {
        let fit = classify(natural_width, self.metrics.column_width);
        match fit {
            Fit::Fits => {
                log::debug!(
                    "Image {:?} ({}px) fits the column {:?}",
                    image,
                    natural_width,
                    self.metrics.column_width
                );
                self.settle(doc, image, now)?;
            }
            Fit::Oversized => self.enhance(doc, image, natural_width, images, now)?,
        }
        Ok(fit)
    }

    fn enhance(
        &mut self,
        doc: &mut Document,
        image: NodeId,
        detected_width: u32,
        images: &mut dyn ImageSource,
        now: Duration,
    ) -> Result<(), MediaError> {
        let built = match viewer::build_viewer(doc, image, &self.modes) {
            Ok(built) => built,
            Err(e) => {
                log::warn!("Could not build viewer for {:?}: {}", image, e);
                return self.settle(doc, image, now);
            }
        };
        let viewer = built.viewer.root;
        log::info!(
            "Built viewer {:?} with {} modes{}",
            viewer,
            self.modes.len(),
            built
                .viewer
                .link
                .as_deref()
                .map(|l| format!(" linking to {l}"))
                .unwrap_or_default()
        );
        self.viewers.push(built.viewer);

        for (original, copy) in built.image_pairs {
            // Images sharing the replaced link are claimed by this viewer; the
            // probe of their copy completes their determination instead.
            let counted = !self.settled.contains(&original);
            if counted {
                self.waiting.remove(&original);
                self.settled.insert(original);
            }
            if original == image {
                self.record_natural_width(doc, viewer, copy, detected_width)?;
            }
            let src = doc.attr(copy, "src").unwrap_or_default().to_string();
            match images.status(&src) {
                LoadStatus::Complete { natural_width } => {
                    self.record_natural_width(doc, viewer, copy, natural_width)?;
                    if counted {
                        self.count_down(doc, now)?;
                    }
                }
                LoadStatus::Failed => {
                    log::warn!("Could not probe natural width of {}", src);
                    if counted {
                        self.count_down(doc, now)?;
                    }
                }
                LoadStatus::Pending => {
                    self.waiting.insert(
                        copy,
                        Waiting::Probe {
                            since: now,
                            viewer,
                            counted,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn record_natural_width(
        &mut self,
        doc: &mut Document,
        viewer: NodeId,
        image: NodeId,
        natural_width: u32,
    ) -> Result<(), MediaError> {
        doc.set_attr(image, attrs::NATURAL_WIDTH, &natural_width.to_string())?;
        // Keep the rendered width in step with the selected control
        if let Some(mode) = selected_mode(doc, viewer) {
            apply_mode(doc, viewer, mode)?;
        }
        Ok(())
    }

    /// Mark a content image as determined and count it down once.
    fn settle(&mut self, doc: &mut Document, image: NodeId, now: Duration) -> Result<(), MediaError> {
        if self.settled.insert(image) {
            self.count_down(doc, now)?;
        }
        Ok(())
    }

    fn count_down(&mut self, doc: &mut Document, now: Duration) -> Result<(), MediaError> {
        let fired = self.latch.as_ref().is_some_and(SettleLatch::count_down);
        if fired {
            self.on_settled(doc, now)?;
        }
        Ok(())
    }

    fn on_settled(&mut self, doc: &mut Document, now: Duration) -> Result<(), MediaError> {
        log::info!("Content images settled ({} viewers)", self.viewers.len());
        self.signals.push(Signal::ContentImagesSettled);
        self.overlay.reveal(doc, now)?;
        Ok(())
    }
}
