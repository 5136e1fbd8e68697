//! Page bootstrap and event routing.
//!
//! A [`Page`] owns the document of one loaded page and every behavior
//! installed on it. Behaviors are installed in a fixed order: code
//! highlighting, inline images, tables, shortcuts, then pagination.

use feedview_dom::{Dispatch, Document, DomError, Event, NodeId};
use web_time::Duration;

use crate::config::AppConfig;
use crate::highlight::{self, Highlighter};
use crate::keybindings::{Command, Shortcuts};
use crate::media::{ImageSource, MediaEngine, MediaError, PageMetrics, ScanSummary, Signal};
use crate::pagination::{Pagination, PaginationError};
use crate::tables;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Pagination error: {0}")]
    Pagination(#[from] PaginationError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// What the host knows about the browsing environment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    pub metrics: PageMetrics,
    /// Touch-capable device; tooltips stay off
    pub touch_device: bool,
}

/// What the host should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Outcome of a click inside or outside a viewer
    Click(Dispatch),
    /// A shortcut matched
    Shortcut(Command),
    /// Fetch this URL and pass the body to [`Page::load_more_finished`]
    LoadMore(String),
    /// Nothing to do
    Ignored,
}

/// Counts from bootstrapping a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootReport {
    pub highlighted: usize,
    pub images: ScanSummary,
    pub overflow_tables: usize,
    pub shortcuts: usize,
    pub paginated: bool,
    pub tooltips: bool,
}

/// Whether the page is an entry detail page (`data-view="detail"`).
pub fn is_detail_view(doc: &Document) -> bool {
    let root = doc.root();
    doc.attr(root, "data-view") == Some("detail")
        || doc
            .find_first(root, |d, n| d.attr(n, "data-view").is_some())
            .is_some_and(|n| doc.attr(n, "data-view") == Some("detail"))
}

#[derive(Debug)]
pub struct Page {
    doc: Document,
    media: MediaEngine,
    shortcuts: Shortcuts,
    pagination: Option<Pagination>,
    detail_view: bool,
    tooltips: bool,
}

impl Page {
    /// Install every behavior on a freshly loaded document.
    pub fn bootstrap(
        mut doc: Document,
        config: &AppConfig,
        env: Environment,
        highlighter: &mut dyn Highlighter,
        images: &mut dyn ImageSource,
        now: Duration,
    ) -> Result<(Self, BootReport), PageError> {
        let mut report = BootReport {
            highlighted: highlight::highlight_blocks(&mut doc, highlighter)?,
            ..Default::default()
        };

        let mut metrics = env.metrics;
        if metrics.column_width.is_none() {
            metrics.column_width = config.media.column_width;
        }
        let mut media = MediaEngine::new(config.media.clone(), metrics);
        if crate::media::media_enabled(&doc) {
            let root = doc.root();
            report.images = media.scan(&mut doc, root, images, now)?;
        } else {
            media.skip(&mut doc, now)?;
        }

        report.overflow_tables = tables::enable_overflow(&mut doc)?.len();

        let detail_view = is_detail_view(&doc);
        let shortcuts = Shortcuts::install(&doc, &config.keybindings.to_keybindings(), detail_view);
        report.shortcuts = shortcuts.len();

        let pagination = Pagination::install(&mut doc)?;
        report.paginated = pagination.is_some();

        report.tooltips = !env.touch_device;
        log::info!(
            "Page ready: {} images, {} shortcuts{}",
            report.images.found,
            report.shortcuts,
            if detail_view { ", detail view" } else { "" }
        );

        Ok((
            Self {
                doc,
                media,
                shortcuts,
                pagination,
                detail_view,
                tooltips: report.tooltips,
            },
            report,
        ))
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn media(&self) -> &MediaEngine {
        &self.media
    }

    pub fn is_detail_view(&self) -> bool {
        self.detail_view
    }

    pub fn tooltips_enabled(&self) -> bool {
        self.tooltips
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        self.media.take_signals()
    }

    /// Route an event to the behavior it belongs to.
    pub fn handle_event(&mut self, event: &Event, now: Duration) -> Result<Response, PageError> {
        match event {
            Event::KeyPressed { key } => Ok(self
                .shortcuts
                .handle_key(*key, now)
                .map_or(Response::Ignored, Response::Shortcut)),
            Event::Click { target } => self.handle_click(*target, now),
            Event::Scroll | Event::MouseMoved => {
                self.media.handle_event(&mut self.doc, event, now)?;
                Ok(Response::Ignored)
            }
        }
    }

    fn handle_click(&mut self, target: NodeId, now: Duration) -> Result<Response, PageError> {
        let dispatch = self
            .media
            .handle_event(&mut self.doc, &Event::Click { target }, now)?;
        if dispatch != Dispatch::ignored() {
            return Ok(Response::Click(dispatch));
        }
        if let Some(pagination) = self.pagination.as_mut() {
            if pagination.is_trigger(&self.doc, target) {
                return Ok(match pagination.begin(&mut self.doc)? {
                    Some(url) => Response::LoadMore(url),
                    None => Response::Click(Dispatch::suppressed()),
                });
            }
        }
        Ok(Response::Click(dispatch))
    }

    /// Hand a fetched page of entries back. `None` means the fetch failed.
    pub fn load_more_finished(&mut self, body: Option<&str>) -> Result<Option<String>, PageError> {
        let Some(pagination) = self.pagination.as_mut() else {
            return Ok(None);
        };
        match body {
            Some(fragment) => Ok(pagination.apply_fragment(&mut self.doc, fragment)?),
            None => {
                log::warn!("Loading more entries failed");
                pagination.abort(&mut self.doc)?;
                Ok(None)
            }
        }
    }

    /// Report a load result for an image the engine is waiting on.
    pub fn image_loaded(
        &mut self,
        image: NodeId,
        status: crate::media::LoadStatus,
        images: &mut dyn ImageSource,
        now: Duration,
    ) -> Result<(), PageError> {
        Ok(self.media.image_loaded(&mut self.doc, image, status, images, now)?)
    }

    /// Advance page timers.
    pub fn tick(&mut self, now: Duration) -> Result<(), PageError> {
        Ok(self.media.tick(&mut self.doc, now)?)
    }

    /// Give the document back, e.g. for serialization.
    pub fn into_document(self) -> Document {
        self.doc
    }
}
