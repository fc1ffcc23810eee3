//! Per-operation MongoDB connections

use async_trait::async_trait;
use bson::{doc, Bson, Document as BsonDocument};
use docbridge_common::{
    ConnectionConfig, DocBridgeError, DocumentStream, EngineConnection, FindSpec, Projection,
    Result, UpdateOutcome,
};
use futures::StreamExt;
use mongodb::{
    options::{ClientOptions, FindOneOptions, FindOptions},
    Client, Collection, Database,
};
use std::time::Duration;

/// Build `mongodb://<username>:<password>@<ip>:<port>`
///
/// Credentials are inserted as-is; reserved URI characters in the username
/// or password are not percent-encoded.
pub fn connection_uri(config: &ConnectionConfig) -> String {
    format!(
        "mongodb://{}:{}@{}:{}",
        config.username, config.password, config.ip, config.port
    )
}

/// Driver settings applied to every connection
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Connection timeout (default: 10s)
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout (default: 30s)
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            app_name: Some("docbridge".to_string()),
        }
    }
}

/// A MongoDB client scoped to one database, opened for a single operation
pub struct MongoConnection {
    client: Client,
    database: Database,
}

impl MongoConnection {
    /// Build a client for the configured server and select the configured database
    pub async fn open(config: &ConnectionConfig, options: &ConnectOptions) -> Result<Self> {
        let uri = connection_uri(config);
        let mut client_options = ClientOptions::parse(uri.as_str())
            .await
            .map_err(|e| DocBridgeError::Connection(format!("Failed to parse MongoDB options: {}", e)))?;

        if let Some(connect) = options.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = options.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = options.app_name.clone() {
            client_options.app_name = Some(app);
        }
        // one operation per client, no idle connections to keep warm
        client_options.min_pool_size = Some(0);

        let client = Client::with_options(client_options)
            .map_err(|e| DocBridgeError::Connection(format!("Failed to create MongoDB client: {}", e)))?;
        let database = client.database(&config.db_name);

        tracing::debug!(host = %config.ip, port = config.port, db = %config.db_name, "opened MongoDB connection");
        Ok(Self { client, database })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get a collection by name (untyped BsonDocument collection)
    pub fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    /// Check that the server answers
    pub async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocBridgeError::Connection(format!("Ping failed: {}", e)))?;
        Ok(())
    }
}

/// Driver find options for a [`FindSpec`]
pub fn find_options(spec: &FindSpec) -> FindOptions {
    let mut options = FindOptions::default();
    options.projection = spec.projection.as_ref().map(Projection::to_document);
    if !spec.sort.is_empty() {
        options.sort = Some(spec.sort.to_document());
    }
    options.limit = spec.effective_limit();
    options
}

#[async_trait]
impl EngineConnection for MongoConnection {
    async fn find_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        projection: Option<&Projection>,
    ) -> Result<Option<BsonDocument>> {
        let mut options = FindOneOptions::default();
        options.projection = projection.map(Projection::to_document);

        let document = self
            .collection(collection)
            .find_one(filter)
            .with_options(options)
            .await?;
        Ok(document)
    }

    async fn find(
        &self,
        collection: &str,
        filter: BsonDocument,
        spec: &FindSpec,
    ) -> Result<DocumentStream> {
        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(find_options(spec))
            .await?;
        Ok(cursor.map(|item| item.map_err(DocBridgeError::from)).boxed())
    }

    async fn insert_one(&self, collection: &str, document: BsonDocument) -> Result<Bson> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> Result<Vec<Bson>> {
        let total = documents.len();
        let mut result = self.collection(collection).insert_many(documents).await?;
        Ok((0..total)
            .map(|i| result.inserted_ids.remove(&i).unwrap_or(Bson::Null))
            .collect())
    }

    async fn count_documents(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn estimated_document_count(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection).estimated_document_count().await?)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<UpdateOutcome> {
        let result = self
            .collection(collection)
            .update_one(filter, update)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        Ok(self.collection(collection).delete_one(filter).await?.deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        Ok(self.collection(collection).delete_many(filter).await?.deleted_count)
    }

    async fn close(self) {
        tracing::debug!(db = %self.database.name(), "closing MongoDB connection");
        let Self { client, database } = self;
        drop(database);
        // waits for the monitors and pool workers to stop
        client.shutdown().await;
    }
}
