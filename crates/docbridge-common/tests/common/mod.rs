//! In-memory engine that counts opened and released connections

#![allow(dead_code)]

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use docbridge_common::{
    ConnectionConfig, DocBridgeError, DocumentDatabase, DocumentStream, EngineConnection,
    FindSpec, Projection, Result, UpdateOutcome,
};
use futures::StreamExt;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct Shared {
    collections: Mutex<HashMap<String, Vec<BsonDocument>>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    /// Connections dropped without `close`
    pub leaked: AtomicUsize,
    pub fail_engine: AtomicBool,
    pub fail_connect: AtomicBool,
}

impl Shared {
    pub fn opened(&self) -> usize {
        self.opened.load(AtomicOrdering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(AtomicOrdering::SeqCst)
    }

    pub fn leaked(&self) -> usize {
        self.leaked.load(AtomicOrdering::SeqCst)
    }

    pub fn set_fail_engine(&self, fail: bool) {
        self.fail_engine.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, AtomicOrdering::SeqCst);
    }
}

/// Let tasks spawned by a dropped cursor run to completion
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        ip: "localhost".to_string(),
        port: 27017,
        username: "u".to_string(),
        password: "p".to_string(),
        db_name: "testdb".to_string(),
    }
}

pub struct MemoryDatabase {
    config: ConnectionConfig,
    pub shared: Arc<Shared>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            shared: Arc::new(Shared::default()),
        }
    }
}

#[async_trait]
impl DocumentDatabase for MemoryDatabase {
    type Connection = MemoryConnection;

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn set_db_name(&mut self, db_name: &str) {
        self.config.db_name = db_name.to_string();
    }

    async fn connect(&self) -> Result<MemoryConnection> {
        if self.shared.fail_connect.load(AtomicOrdering::SeqCst) {
            return Err(DocBridgeError::Connection("simulated connect failure".to_string()));
        }
        self.shared.opened.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            db_name: self.config.db_name.clone(),
            released: false,
        })
    }
}

pub struct MemoryConnection {
    shared: Arc<Shared>,
    db_name: String,
    released: bool,
}

impl MemoryConnection {
    fn check(&self) -> Result<()> {
        if self.shared.fail_engine.load(AtomicOrdering::SeqCst) {
            return Err(DocBridgeError::Engine("simulated engine failure".to_string()));
        }
        Ok(())
    }

    fn key(&self, collection: &str) -> String {
        format!("{}.{}", self.db_name, collection)
    }

    fn with_collection<T>(&self, collection: &str, f: impl FnOnce(&mut Vec<BsonDocument>) -> T) -> T {
        let mut collections = self.shared.collections.lock().unwrap();
        f(collections.entry(self.key(collection)).or_default())
    }
}

fn matches(document: &BsonDocument, filter: &BsonDocument) -> bool {
    filter.iter().all(|(k, v)| document.get(k) == Some(v))
}

fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn number(value: &Bson) -> Option<f64> {
        match value {
            Bson::Int32(n) => Some(*n as f64),
            Bson::Int64(n) => Some(*n as f64),
            Bson::Double(n) => Some(*n),
            _ => None,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (number(a), number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => match (a, b) {
                (Bson::String(x), Bson::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            },
        },
    }
}

/// Keep projected fields plus `_id`, as the server does by default
fn project(document: &BsonDocument, projection: Option<&Projection>) -> BsonDocument {
    match projection {
        Some(p) => document
            .iter()
            .filter(|(k, _)| k.as_str() == "_id" || p.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        None => document.clone(),
    }
}

#[async_trait]
impl EngineConnection for MemoryConnection {
    async fn find_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        projection: Option<&Projection>,
    ) -> Result<Option<BsonDocument>> {
        self.check()?;
        Ok(self.with_collection(collection, |docs| {
            docs.iter()
                .find(|d| matches(d, &filter))
                .map(|d| project(d, projection))
        }))
    }

    async fn find(
        &self,
        collection: &str,
        filter: BsonDocument,
        spec: &FindSpec,
    ) -> Result<DocumentStream> {
        self.check()?;
        let mut found: Vec<BsonDocument> = self.with_collection(collection, |docs| {
            docs.iter().filter(|d| matches(d, &filter)).cloned().collect()
        });

        found.sort_by(|a, b| {
            for (field, direction) in spec.sort.fields() {
                let ordering = compare(a.get(field), b.get(field));
                let ordering = if direction.as_i32() < 0 { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        if let Some(limit) = spec.effective_limit() {
            found.truncate(limit.unsigned_abs() as usize);
        }

        let projection = spec.projection.clone();
        let items: Vec<Result<BsonDocument>> = found
            .iter()
            .map(|d| Ok(project(d, projection.as_ref())))
            .collect();
        Ok(futures::stream::iter(items).boxed())
    }

    async fn insert_one(&self, collection: &str, document: BsonDocument) -> Result<Bson> {
        self.check()?;
        let id = document
            .get("_id")
            .cloned()
            .ok_or_else(|| DocBridgeError::Engine("document has no _id".to_string()))?;
        self.with_collection(collection, |docs| docs.push(document));
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> Result<Vec<Bson>> {
        self.check()?;
        let ids = documents
            .iter()
            .map(|d| d.get("_id").cloned().unwrap_or(Bson::Null))
            .collect();
        self.with_collection(collection, |docs| docs.extend(documents));
        Ok(ids)
    }

    async fn count_documents(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        self.check()?;
        Ok(self.with_collection(collection, |docs| {
            docs.iter().filter(|d| matches(d, &filter)).count() as u64
        }))
    }

    async fn estimated_document_count(&self, collection: &str) -> Result<u64> {
        self.check()?;
        Ok(self.with_collection(collection, |docs| docs.len() as u64))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<UpdateOutcome> {
        self.check()?;
        let set = update
            .get_document("$set")
            .map_err(|e| DocBridgeError::Engine(format!("unsupported update: {}", e)))?
            .clone();

        Ok(self.with_collection(collection, |docs| {
            let Some(target) = docs.iter_mut().find(|d| matches(d, &filter)) else {
                return UpdateOutcome::default();
            };
            let mut modified = 0;
            for (k, v) in set {
                if target.get(&k) != Some(&v) {
                    target.insert(k, v);
                    modified = 1;
                }
            }
            UpdateOutcome { matched: 1, modified }
        }))
    }

    async fn delete_one(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        self.check()?;
        Ok(self.with_collection(collection, |docs| {
            match docs.iter().position(|d| matches(d, &filter)) {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            }
        }))
    }

    async fn delete_many(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        self.check()?;
        Ok(self.with_collection(collection, |docs| {
            let before = docs.len();
            docs.retain(|d| !matches(d, &filter));
            (before - docs.len()) as u64
        }))
    }

    async fn close(mut self) {
        self.released = true;
        self.shared.closed.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if !self.released {
            self.shared.leaked.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }
}
