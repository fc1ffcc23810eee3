//! Common building blocks for docbridge
//!
//! This crate holds everything that does not depend on a particular driver:
//! the error type, connection config loading, collection-name validation,
//! query options, the [`DocumentDatabase`] capability set that adapters
//! implement, and the typed [`Document`] helpers built on it.

pub mod config;
pub mod cursor;
pub mod database;
pub mod document;
pub mod error;
pub mod legacy;
pub mod query;
pub mod validation;

pub use config::{ConfigSource, ConnectionConfig};
pub use cursor::DocumentCursor;
pub use database::{ensure_id, DocumentDatabase, DocumentStream, EngineConnection, UpdateOutcome};
pub use document::Document;
pub use error::{DocBridgeError, Result};
pub use query::{FindSpec, Projection, SortDirection, SortSpec};
pub use validation::ValidatedCollectionName;
