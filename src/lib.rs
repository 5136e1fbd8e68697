//! feedview - client-side behavior for feed reader pages
//!
//! Inline image viewers for oversized article images, keyboard shortcuts,
//! "load more" pagination, table and code block tweaks, and the job-queue
//! dashboard. Everything operates on a [`feedview_dom::Document`], so the
//! same code runs in the browser (wasm32) and in the native driver.

pub mod config;
pub mod constants;
pub mod dashboard;
pub mod highlight;
pub mod keybindings;
pub mod media;
pub mod page;
pub mod pagination;
pub mod tables;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

pub use media::{DisplayMode, MediaEngine, MediaError, PageMetrics, Signal};
pub use page::{Page, PageError};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
