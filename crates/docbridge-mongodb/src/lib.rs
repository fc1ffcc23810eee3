//! MongoDB adapter for docbridge
//!
//! Implements the `DocumentDatabase` capability set from `docbridge-common`
//! on the official async MongoDB driver.
//!
//! # Features
//! - One client per operation, shut down before the call returns
//! - Cursors that own their client and close it on exhaustion or drop
//! - Config from a JSON file or environment variables
//! - Typed documents through the re-exported [`Document`] trait

pub mod connection;
pub mod store;

pub use connection::{connection_uri, ConnectOptions, MongoConnection};
pub use docbridge_common::{
    ConfigSource, ConnectionConfig, DocBridgeError, Document, DocumentCursor, DocumentDatabase,
    FindSpec, Projection, Result, SortDirection, SortSpec,
};
pub use store::MongoDatabase;
