//! Document database abstraction
//!
//! [`EngineConnection`] is the seam to a concrete driver: one method per
//! engine call plus `close`. [`DocumentDatabase`] is the capability set
//! callers use. An adapter only supplies `connect` and the config accessors;
//! every CRUD operation is provided and follows the same shape:
//!
//! 1. validate the collection name
//! 2. open a connection from the stored config
//! 3. perform exactly one engine call
//! 4. release the connection and wait until it is closed
//! 5. return the result
//!
//! `select` is the exception: the connection moves into the returned
//! [`DocumentCursor`], which releases it.

use crate::config::ConnectionConfig;
use crate::cursor::DocumentCursor;
use crate::error::{DocBridgeError, Result};
use crate::query::{set_update, FindSpec, Projection};
use crate::validation::ValidatedCollectionName;
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document as BsonDocument};
use futures::stream::BoxStream;
use futures::StreamExt;

/// Documents streamed back from an engine `find`
pub type DocumentStream = BoxStream<'static, Result<BsonDocument>>;

/// Counts reported by the engine for an update-one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// A live connection to a document store, scoped to one database
#[async_trait]
pub trait EngineConnection: Send + Sync + 'static {
    async fn find_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        projection: Option<&Projection>,
    ) -> Result<Option<BsonDocument>>;

    async fn find(
        &self,
        collection: &str,
        filter: BsonDocument,
        spec: &FindSpec,
    ) -> Result<DocumentStream>;

    /// Returns the stored `_id`
    async fn insert_one(&self, collection: &str, document: BsonDocument) -> Result<Bson>;

    /// Returns the stored `_id`s in input order
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> Result<Vec<Bson>>;

    async fn count_documents(&self, collection: &str, filter: BsonDocument) -> Result<u64>;

    async fn estimated_document_count(&self, collection: &str) -> Result<u64>;

    /// `update` is a complete update document (e.g. `{"$set": {...}}`)
    async fn update_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<UpdateOutcome>;

    /// Returns the number of deleted documents
    async fn delete_one(&self, collection: &str, filter: BsonDocument) -> Result<u64>;

    async fn delete_many(&self, collection: &str, filter: BsonDocument) -> Result<u64>;

    /// Release the connection; resolves once the driver has shut it down
    async fn close(self);
}

/// Give the document an `_id` if it has none, keeping `_id` as the first key
pub fn ensure_id(document: BsonDocument) -> (Bson, BsonDocument) {
    if let Some(id) = document.get("_id") {
        return (id.clone(), document);
    }

    let id = Bson::ObjectId(ObjectId::new());
    let mut with_id = BsonDocument::new();
    with_id.insert("_id", id.clone());
    with_id.extend(document);
    (id, with_id)
}

/// CRUD capability set over a document store
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    type Connection: EngineConnection;

    fn config(&self) -> &ConnectionConfig;

    /// Switch the database used by subsequent operations
    fn set_db_name(&mut self, db_name: &str);

    fn db_name(&self) -> &str {
        &self.config().db_name
    }

    /// Open a fresh connection using the stored config
    async fn connect(&self) -> Result<Self::Connection>;

    async fn disconnect(&self, connection: Self::Connection) {
        connection.close().await;
    }

    /// Single document matching `query`, or `None`
    async fn select_one(
        &self,
        query: BsonDocument,
        collection: &str,
        projection: Option<&Projection>,
    ) -> Result<Option<BsonDocument>> {
        let collection = ValidatedCollectionName::new(collection)?;
        let connection = self.connect().await?;
        let result = connection
            .find_one(collection.as_str(), query, projection)
            .await;
        self.disconnect(connection).await;

        tracing::debug!(collection = %collection, found = matches!(result, Ok(Some(_))), "select_one");
        result
    }

    /// Cursor over documents matching `query`
    ///
    /// The connection stays open until the cursor is exhausted, closed or dropped.
    async fn select(
        &self,
        query: BsonDocument,
        collection: &str,
        spec: FindSpec,
    ) -> Result<DocumentCursor<Self::Connection>> {
        let collection = ValidatedCollectionName::new(collection)?;
        let connection = self.connect().await?;

        match connection.find(collection.as_str(), query, &spec).await {
            Ok(stream) => {
                tracing::debug!(collection = %collection, limit = spec.limit, "select opened cursor");
                Ok(DocumentCursor::new(connection, stream, collection.into_string()))
            }
            Err(e) => {
                self.disconnect(connection).await;
                Err(e)
            }
        }
    }

    /// Insert one document, generating an `_id` when absent
    async fn insert_one(&self, document: BsonDocument, collection: &str) -> Result<Bson> {
        let collection = ValidatedCollectionName::new(collection)?;
        let (_, document) = ensure_id(document);

        let connection = self.connect().await?;
        let result = connection.insert_one(collection.as_str(), document).await;
        self.disconnect(connection).await;

        tracing::debug!(collection = %collection, ok = result.is_ok(), "insert_one");
        result
    }

    /// Insert documents in order; ids are returned in the same order
    async fn insert_many(
        &self,
        documents: Vec<BsonDocument>,
        collection: &str,
    ) -> Result<Vec<Bson>> {
        let collection = ValidatedCollectionName::new(collection)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<BsonDocument> = documents
            .into_iter()
            .map(|d| ensure_id(d).1)
            .collect();
        let total = documents.len();

        let connection = self.connect().await?;
        let result = connection.insert_many(collection.as_str(), documents).await;
        self.disconnect(connection).await;

        tracing::debug!(collection = %collection, total, ok = result.is_ok(), "insert_many");
        result
    }

    /// Number of documents matching `query`
    async fn count(&self, query: BsonDocument, collection: &str) -> Result<u64> {
        let collection = ValidatedCollectionName::new(collection)?;
        let connection = self.connect().await?;
        let result = connection.count_documents(collection.as_str(), query).await;
        self.disconnect(connection).await;
        result
    }

    /// Estimated number of documents in the collection
    async fn count_all(&self, collection: &str) -> Result<u64> {
        let collection = ValidatedCollectionName::new(collection)?;
        let connection = self.connect().await?;
        let result = connection
            .estimated_document_count(collection.as_str())
            .await;
        self.disconnect(connection).await;
        result
    }

    /// Merge `new_values` into the first document matching `query`
    ///
    /// Returns true iff a document was modified.
    async fn update_one(
        &self,
        query: BsonDocument,
        new_values: BsonDocument,
        collection: &str,
    ) -> Result<bool> {
        let collection = ValidatedCollectionName::new(collection)?;
        let connection = self.connect().await?;
        let result = connection
            .update_one(collection.as_str(), query, set_update(new_values))
            .await;
        self.disconnect(connection).await;

        let outcome = result?;
        tracing::debug!(
            collection = %collection,
            matched = outcome.matched,
            modified = outcome.modified,
            "update_one"
        );
        Ok(outcome.modified == 1)
    }

    /// Document with the greatest `sort_field`
    ///
    /// Fails with [`DocBridgeError::NotFound`] when the collection is empty.
    async fn find_last(
        &self,
        sort_field: &str,
        collection: &str,
        projection: Option<&Projection>,
    ) -> Result<BsonDocument> {
        let collection = ValidatedCollectionName::new(collection)?;
        let spec = FindSpec::last_by(sort_field, projection.cloned());

        let connection = self.connect().await?;
        let last = match connection
            .find(collection.as_str(), BsonDocument::new(), &spec)
            .await
        {
            Ok(mut stream) => stream.next().await.transpose(),
            Err(e) => Err(e),
        };
        self.disconnect(connection).await;

        last?.ok_or_else(|| {
            DocBridgeError::NotFound(format!(
                "No documents in collection '{}' to sort by '{}'",
                collection, sort_field
            ))
        })
    }

    /// Delete the first document matching `query`
    ///
    /// An empty query deletes nothing and does not contact the store.
    async fn delete_one(&self, query: BsonDocument, collection: &str) -> Result<bool> {
        let collection = ValidatedCollectionName::new(collection)?;
        if query.is_empty() {
            tracing::debug!(collection = %collection, "delete_one skipped: empty query");
            return Ok(false);
        }

        let connection = self.connect().await?;
        let result = connection.delete_one(collection.as_str(), query).await;
        self.disconnect(connection).await;

        Ok(result? > 0)
    }

    /// Delete every document matching `query`
    ///
    /// An empty query deletes nothing and does not contact the store.
    async fn delete_many(&self, query: BsonDocument, collection: &str) -> Result<u64> {
        let collection = ValidatedCollectionName::new(collection)?;
        if query.is_empty() {
            tracing::debug!(collection = %collection, "delete_many skipped: empty query");
            return Ok(0);
        }

        let connection = self.connect().await?;
        let result = connection.delete_many(collection.as_str(), query).await;
        self.disconnect(connection).await;

        let deleted = result?;
        tracing::debug!(collection = %collection, deleted, "delete_many");
        Ok(deleted)
    }
}
