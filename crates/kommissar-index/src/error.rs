//! Error types for the classification index.

use kommissar_types::EventError;

use crate::tree::NodeId;

/// Errors that can occur while ingesting into or reading the index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The event lacks an attribute required for classification.
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] EventError),

    /// A node reference did not resolve inside the tree.
    #[error("corrupt tree state at {node}")]
    CorruptTreeState {
        /// The unresolved node.
        node: NodeId,
    },

    /// A writer panicked while holding the shared tree lock.
    #[error("classification tree lock poisoned")]
    LockPoisoned,
}
