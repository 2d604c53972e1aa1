//! Incremental classification index for cluster resource events.
//!
//! Each ingested [`Event`](kommissar_types::Event) is routed through a
//! fixed hierarchy of classification levels and attached as a leaf:
//!
//! | Depth | Level | Label |
//! |-------|-------|-------|
//! | 0 | `Root` | `*` |
//! | 1 | `ApiVersion` | `v1`, `apps/v1`, ... |
//! | 2 | `Kind` | `Pod`, `Node`, ... |
//! | 3 | `Namespace` (namespaced resources only) | `default`, ... |
//! | 3 or 4 | `Name` | resource name |
//! | 4 or 5 | `ResourceVersion` | `#<resourceVersion>` |
//!
//! The tree grows lazily and is append-only. Re-ingesting an event whose
//! path already exists only replaces the event stored on the leaf.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kommissar_index::ClassificationTree;
//!
//! let mut tree = ClassificationTree::new();
//! let ingested = tree.ingest(event)?;
//! let leaf = tree.node(ingested.leaf).expect("leaf exists");
//! println!("{}", leaf.label());
//! ```
//!
//! Concurrent readers go through [`SharedTree`], which holds the whole tree
//! behind one read/write lock.

mod error;
mod level;
mod shared;
mod tree;

pub use error::IndexError;
pub use level::ClassificationLevel;
pub use shared::SharedTree;
pub use tree::{ClassificationTree, Ingested, Leaves, NodeId, NodeRef, TreeNode};
