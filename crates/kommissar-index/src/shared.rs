//! Lock-guarded tree handle for concurrent readers.

use std::sync::{Arc, RwLock};

use kommissar_types::Event;

use crate::error::IndexError;
use crate::tree::{ClassificationTree, Ingested};

/// A cloneable handle to one [`ClassificationTree`] behind a read/write lock.
///
/// Ingestion holds the write lock for the whole descent, so readers always
/// observe a tree between two events. Uses `std::sync::RwLock`: no critical
/// section spans an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedTree {
    inner: Arc<RwLock<ClassificationTree>>,
}

impl SharedTree {
    /// Creates a handle to an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one event under the write lock.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::LockPoisoned` if a previous writer panicked, or
    /// any error from [`ClassificationTree::ingest`].
    pub fn ingest(&self, event: Event) -> Result<Ingested, IndexError> {
        let mut tree = self.inner.write().map_err(|_| IndexError::LockPoisoned)?;
        tree.ingest(event)
    }

    /// Runs `f` against a consistent snapshot of the tree.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::LockPoisoned` if a previous writer panicked.
    pub fn read<R>(&self, f: impl FnOnce(&ClassificationTree) -> R) -> Result<R, IndexError> {
        let tree = self.inner.read().map_err(|_| IndexError::LockPoisoned)?;
        Ok(f(&tree))
    }
}

impl From<ClassificationTree> for SharedTree {
    fn from(tree: ClassificationTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }
}
