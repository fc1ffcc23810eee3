//! Typed documents on top of the untyped capability set
//!
//! The [`Document`] trait maps a serde type to a collection and converts it
//! to and from BSON, so CRUD calls can be made with concrete types instead of
//! raw `bson::Document`s. It works with any [`DocumentDatabase`].

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use crate::database::DocumentDatabase;
use crate::error::{DocBridgeError, Result};
use crate::query::FindSpec;
use serde::{de::DeserializeOwned, Serialize};

/// A serde type stored in a fixed collection
///
/// # Example
///
/// ```ignore
/// use serde::{Deserialize, Serialize};
/// use docbridge_common::Document;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Reading {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     sensor: String,
///     value: i64,
/// }
///
/// impl Document for Reading {
///     fn collection_name() -> &'static str {
///         "readings"
///     }
/// }
///
/// let newest = Reading::find_last(&db, "value").await?;
/// ```
#[async_trait]
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Sized {
    fn collection_name() -> &'static str;

    fn to_bson(&self) -> Result<BsonDocument> {
        bson::to_document(self).map_err(|e| DocBridgeError::Serialization(e.to_string()))
    }

    fn from_bson(doc: BsonDocument) -> Result<Self> {
        bson::from_document(doc).map_err(|e| DocBridgeError::Deserialization(e.to_string()))
    }

    /// Insert this document; returns the stored `_id`
    async fn insert<D: DocumentDatabase>(&self, db: &D) -> Result<Bson> {
        let document = self.to_bson()?;
        db.insert_one(document, Self::collection_name()).await
    }

    async fn insert_all<D: DocumentDatabase>(db: &D, items: &[Self]) -> Result<Vec<Bson>> {
        let documents = items
            .iter()
            .map(Self::to_bson)
            .collect::<Result<Vec<_>>>()?;
        db.insert_many(documents, Self::collection_name()).await
    }

    async fn find_one<D: DocumentDatabase>(db: &D, filter: BsonDocument) -> Result<Option<Self>> {
        match db.select_one(filter, Self::collection_name(), None).await? {
            Some(doc) => Ok(Some(Self::from_bson(doc)?)),
            None => Ok(None),
        }
    }

    /// All matching documents, read through a cursor
    async fn find<D: DocumentDatabase>(
        db: &D,
        filter: BsonDocument,
        spec: FindSpec,
    ) -> Result<Vec<Self>> {
        let cursor = db.select(filter, Self::collection_name(), spec).await?;
        cursor
            .try_collect_all()
            .await?
            .into_iter()
            .map(Self::from_bson)
            .collect()
    }

    /// Document with the greatest `sort_field`
    async fn find_last<D: DocumentDatabase>(db: &D, sort_field: &str) -> Result<Self> {
        let doc = db
            .find_last(sort_field, Self::collection_name(), None)
            .await?;
        Self::from_bson(doc)
    }

    async fn count<D: DocumentDatabase>(db: &D, filter: BsonDocument) -> Result<u64> {
        db.count(filter, Self::collection_name()).await
    }
}
