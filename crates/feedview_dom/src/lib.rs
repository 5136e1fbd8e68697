//! feedview_dom - an in-memory document tree for page behavior
//!
//! This crate provides the rendered-document abstraction the behavior layer
//! operates on: an arena of element and text nodes with attribute, class and
//! inline-style access, deep cloning and atomic replacement, plus the event
//! types delivered through delegated dispatch.

mod document;
mod error;
mod event;
mod parse;

pub use document::{Document, ElementData, NodeId, NodeKind};
pub use error::DomError;
pub use event::{Dispatch, Event, Key};
pub use parse::is_void_element;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::document::{Document, NodeId, NodeKind};
    pub use crate::error::DomError;
    pub use crate::event::{Dispatch, Event, Key};
}
