//! Error types for document operations.

use thiserror::Error;

use crate::NodeId;

/// Errors that can occur while reading or mutating a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Node id does not belong to this document
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// Operation needs an element but the node is text
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// Node has no parent to be replaced or detached from
    #[error("Node {0:?} is not attached to a parent")]
    Detached(NodeId),

    /// Node being inserted already has a parent
    #[error("Node {0:?} already has a parent")]
    AlreadyAttached(NodeId),

    /// Inserting the node would make it its own ancestor
    #[error("Inserting {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// The node that would become the parent
        parent: NodeId,
        /// The node being inserted
        child: NodeId,
    },

    /// Markup could not be parsed
    #[error("Parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset in the input where parsing stopped
        position: usize,
        /// Description from the underlying reader
        message: String,
    },
}
