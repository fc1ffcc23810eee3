//! MongoDB implementation of the document database capability set

use crate::connection::{ConnectOptions, MongoConnection};
use async_trait::async_trait;
use docbridge_common::{ConfigSource, ConnectionConfig, DocumentDatabase, Result};

/// Document database backed by MongoDB
///
/// Holds only the config; every operation opens its own client and shuts it
/// down before returning (cursors shut it down when exhausted or dropped).
///
/// # Example
///
/// ```ignore
/// use bson::doc;
/// use docbridge_common::{ConfigSource, DocumentDatabase};
/// use docbridge_mongodb::MongoDatabase;
///
/// let db = MongoDatabase::from_source(ConfigSource::from(Some("db.json")))?;
/// db.insert_one(doc! { "name": "a", "value": 1 }, "items").await?;
/// assert_eq!(db.count(doc! {}, "items").await?, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MongoDatabase {
    config: ConnectionConfig,
    options: ConnectOptions,
}

impl MongoDatabase {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_options(config, ConnectOptions::default())
    }

    pub fn with_options(config: ConnectionConfig, options: ConnectOptions) -> Self {
        Self { config, options }
    }

    /// Load the config from a file or the environment
    pub fn from_source(source: ConfigSource) -> Result<Self> {
        Ok(Self::new(ConnectionConfig::load(source)?))
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Open a connection, ping the server, and close it again
    pub async fn ping(&self) -> Result<()> {
        let connection = self.connect().await?;
        let result = connection.ping().await;
        self.disconnect(connection).await;
        result
    }
}

#[async_trait]
impl DocumentDatabase for MongoDatabase {
    type Connection = MongoConnection;

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn set_db_name(&mut self, db_name: &str) {
        self.config.db_name = db_name.to_string();
    }

    async fn connect(&self) -> Result<MongoConnection> {
        MongoConnection::open(&self.config, &self.options).await
    }
}
