//! Sentinel-returning wrappers
//!
//! Some callers expect the older contract where a few read/insert operations
//! never fail: they report `false`, `-1`, or an absent document with a
//! success flag instead. These helpers give that contract on top of any
//! [`DocumentDatabase`]; the swallowed error is logged.

use crate::database::DocumentDatabase;
use crate::query::Projection;
use bson::Document as BsonDocument;

/// Value returned by the counting helpers when the store reports an error
pub const COUNT_FAILED: i64 = -1;

/// `(document, success)`; `(None, false)` on any error
pub async fn select_one_or_flag<D: DocumentDatabase>(
    db: &D,
    query: BsonDocument,
    collection: &str,
    projection: Option<&Projection>,
) -> (Option<BsonDocument>, bool) {
    match db.select_one(query, collection, projection).await {
        Ok(document) => (document, true),
        Err(e) => {
            tracing::warn!(collection, error = %e, "select_one failed");
            (None, false)
        }
    }
}

/// `true` when the document was stored
pub async fn insert_one_or_false<D: DocumentDatabase>(
    db: &D,
    document: BsonDocument,
    collection: &str,
) -> bool {
    match db.insert_one(document, collection).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(collection, error = %e, "insert_one failed");
            false
        }
    }
}

/// Matching document count, or [`COUNT_FAILED`]
pub async fn count_or_sentinel<D: DocumentDatabase>(
    db: &D,
    query: BsonDocument,
    collection: &str,
) -> i64 {
    match db.count(query, collection).await {
        Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
        Err(e) => {
            tracing::warn!(collection, error = %e, "count failed");
            COUNT_FAILED
        }
    }
}

/// Estimated collection size, or [`COUNT_FAILED`]
pub async fn count_all_or_sentinel<D: DocumentDatabase>(db: &D, collection: &str) -> i64 {
    match db.count_all(collection).await {
        Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
        Err(e) => {
            tracing::warn!(collection, error = %e, "count_all failed");
            COUNT_FAILED
        }
    }
}
