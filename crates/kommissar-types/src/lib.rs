//! Shared event types for the kommissar resource index.
//!
//! This crate defines the decoded [`Event`] record that flows from a cluster
//! watch into the classification tree, the [`ChangeType`] reported by the
//! watch, and the [`EventError`] raised when a payload cannot be decoded or
//! lacks the attributes the index classifies on.
//!
//! # Decoding
//!
//! Watch streams deliver one JSON document per line:
//!
//! ```rust,ignore
//! use kommissar_types::Event;
//!
//! let line = r#"{"type":"ADDED","object":{"kind":"Pod","apiVersion":"v1",
//!     "metadata":{"name":"my-pod-1","namespace":"default","resourceVersion":"1"}}}"#;
//! let event = Event::from_watch_json(line, chrono::Utc::now())?;
//! assert_eq!(event.kind, "Pod");
//! ```

mod error;
mod event;

pub use error::EventError;
pub use event::{ChangeType, Event, ParseChangeTypeError};
