//! docbridge CLI - run single document-store operations
//!
//! Usage:
//!   docbridge ping
//!   docbridge find-one items '{"name": "a"}' --fields name,value
//!   docbridge find items '{}' --sort value:desc --limit 2
//!   docbridge insert items '{"name": "a", "value": 1}'
//!   docbridge insert-many items '[{"value": 1}, {"value": 2}]'
//!   docbridge count items '{"name": "a"}'
//!   docbridge count-all items
//!   docbridge update items '{"name": "a"}' '{"value": 2}'
//!   docbridge find-last items value
//!   docbridge delete items '{"name": "a"}'
//!   docbridge delete-many items '{"value": 1}'
//!
//! Connection settings come from `--config <file>` or, without it, from the
//! `ip`, `port`, `username`, `password` and `db_name` environment variables.

use anyhow::{bail, Context, Result};
use bson::{Bson, Document as BsonDocument};
use clap::{Parser, Subcommand};
use docbridge_common::{ConfigSource, DocumentDatabase, FindSpec, Projection, SortDirection, SortSpec};
use docbridge_mongodb::MongoDatabase;
use futures::StreamExt;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docbridge")]
#[command(about = "Run single operations against a document database", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file (ip, port, username, password, db_name); env vars when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured database name
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server answers
    Ping,

    /// Print the first document matching a query
    FindOne {
        collection: String,
        #[arg(default_value = "{}")]
        query: String,
        /// Comma separated fields to return
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Print every document matching a query, one per line
    Find {
        collection: String,
        #[arg(default_value = "{}")]
        query: String,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Sort key as field[:asc|:desc]; repeat for secondary keys
        #[arg(long, value_parser = parse_sort_key)]
        sort: Vec<(String, SortDirection)>,
        /// Maximum number of documents (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },

    /// Insert one document and print its _id
    Insert { collection: String, document: String },

    /// Insert a JSON array of documents and print their _ids
    InsertMany { collection: String, documents: String },

    /// Count documents matching a query
    Count {
        collection: String,
        #[arg(default_value = "{}")]
        query: String,
    },

    /// Estimated number of documents in a collection
    CountAll { collection: String },

    /// Set fields on the first document matching a query
    Update {
        collection: String,
        query: String,
        values: String,
    },

    /// Print the document with the greatest value of a field
    FindLast {
        collection: String,
        sort_field: String,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Delete the first document matching a (non-empty) query
    Delete { collection: String, query: String },

    /// Delete every document matching a (non-empty) query
    DeleteMany { collection: String, query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut db = MongoDatabase::from_source(ConfigSource::from(cli.config.clone()))
        .context("Failed to load connection config")?;
    if let Some(name) = &cli.db {
        db.set_db_name(name);
    }
    tracing::debug!(host = %db.config().ip, db = %db.db_name(), "connection config loaded");

    run(&db, cli.command).await
}

async fn run(db: &MongoDatabase, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => {
            db.ping().await?;
            println!("ok");
        }
        Commands::FindOne { collection, query, fields } => {
            let projection = projection_from(fields);
            let found = db
                .select_one(parse_document(&query)?, &collection, projection.as_ref())
                .await?;
            match found {
                Some(doc) => print_document(doc),
                None => println!("null"),
            }
        }
        Commands::Find { collection, query, fields, sort, limit } => {
            let mut spec = FindSpec::new().sort(sort.into_iter().collect::<SortSpec>()).limit(limit);
            if let Some(p) = projection_from(fields) {
                spec = spec.projection(p);
            }
            let mut cursor = db.select(parse_document(&query)?, &collection, spec).await?;
            while let Some(doc) = cursor.next().await {
                print_document(doc?);
            }
        }
        Commands::Insert { collection, document } => {
            let id = db.insert_one(parse_document(&document)?, &collection).await?;
            print_bson(id);
        }
        Commands::InsertMany { collection, documents } => {
            let ids = db
                .insert_many(parse_documents(&documents)?, &collection)
                .await?;
            for id in ids {
                print_bson(id);
            }
        }
        Commands::Count { collection, query } => {
            println!("{}", db.count(parse_document(&query)?, &collection).await?);
        }
        Commands::CountAll { collection } => {
            println!("{}", db.count_all(&collection).await?);
        }
        Commands::Update { collection, query, values } => {
            let modified = db
                .update_one(parse_document(&query)?, parse_document(&values)?, &collection)
                .await?;
            println!("{}", modified);
        }
        Commands::FindLast { collection, sort_field, fields } => {
            let projection = projection_from(fields);
            let doc = db
                .find_last(&sort_field, &collection, projection.as_ref())
                .await?;
            print_document(doc);
        }
        Commands::Delete { collection, query } => {
            println!("{}", db.delete_one(parse_document(&query)?, &collection).await?);
        }
        Commands::DeleteMany { collection, query } => {
            println!("{}", db.delete_many(parse_document(&query)?, &collection).await?);
        }
    }

    Ok(())
}

fn projection_from(fields: Vec<String>) -> Option<Projection> {
    (!fields.is_empty()).then(|| Projection::new(fields))
}

/// Parse `field`, `field:asc` or `field:desc`
fn parse_sort_key(raw: &str) -> std::result::Result<(String, SortDirection), String> {
    let (field, direction) = match raw.rsplit_once(':') {
        Some((field, "asc")) | Some((field, "1")) => (field, SortDirection::Ascending),
        Some((field, "desc")) | Some((field, "-1")) => (field, SortDirection::Descending),
        Some((_, other)) => return Err(format!("unknown sort direction '{}'", other)),
        None => (raw, SortDirection::Ascending),
    };
    if field.is_empty() {
        return Err("sort field cannot be empty".to_string());
    }
    Ok((field.to_string(), direction))
}

/// Parse a JSON object (relaxed extended JSON allowed, e.g. `{"$oid": ...}`)
fn parse_document(raw: &str) -> Result<BsonDocument> {
    let json: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON: {}", raw))?;
    match Bson::try_from(json).context("Invalid extended JSON")? {
        Bson::Document(doc) => Ok(doc),
        other => bail!("Expected a JSON object, got {}", other),
    }
}

/// Parse a JSON array of objects
fn parse_documents(raw: &str) -> Result<Vec<BsonDocument>> {
    let json: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON: {}", raw))?;
    let serde_json::Value::Array(items) = json else {
        bail!("Expected a JSON array of objects");
    };
    items
        .into_iter()
        .map(|item| -> Result<BsonDocument> {
            match Bson::try_from(item).context("Invalid extended JSON")? {
                Bson::Document(doc) => Ok(doc),
                other => bail!("Expected a JSON object in the array, got {}", other),
            }
        })
        .collect()
}

fn print_document(doc: BsonDocument) {
    print_bson(Bson::Document(doc));
}

fn print_bson(value: Bson) {
    println!("{}", value.into_relaxed_extjson());
}

/// Initialize logging based on log level
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_parse_sort_key() {
        assert_eq!(
            parse_sort_key("value:desc").unwrap(),
            ("value".to_string(), SortDirection::Descending)
        );
        assert_eq!(
            parse_sort_key("name").unwrap(),
            ("name".to_string(), SortDirection::Ascending)
        );
        assert_eq!(
            parse_sort_key("a.b:1").unwrap(),
            ("a.b".to_string(), SortDirection::Ascending)
        );
        assert!(parse_sort_key("value:sideways").is_err());
        assert!(parse_sort_key(":desc").is_err());
    }

    #[test]
    fn test_parse_document() {
        assert_eq!(
            parse_document(r#"{"name": "a", "value": 1}"#).unwrap(),
            doc! { "name": "a", "value": 1 }
        );
        assert!(parse_document("[1, 2]").is_err());
        assert!(parse_document("{oops").is_err());
    }

    #[test]
    fn test_parse_document_extended_json() {
        let doc = parse_document(r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#).unwrap();
        assert!(matches!(doc.get("_id"), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn test_parse_documents() {
        let docs = parse_documents(r#"[{"value": 1}, {"value": 2}]"#).unwrap();
        assert_eq!(docs, vec![doc! { "value": 1 }, doc! { "value": 2 }]);
        assert!(parse_documents(r#"{"value": 1}"#).is_err());
        assert!(parse_documents(r#"[{"value": 1}, 2]"#).is_err());

        let docs = parse_documents(r#"[{"_id": {"$oid": "507f1f77bcf86cd799439011"}}]"#).unwrap();
        assert!(matches!(docs[0].get("_id"), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn test_cli_parses_find() {
        let cli = Cli::try_parse_from([
            "docbridge", "--config", "db.json", "find", "items", "--sort", "value:desc", "--limit",
            "2", "--fields", "name,value",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("db.json")));
        match cli.command {
            Commands::Find { collection, query, fields, sort, limit } => {
                assert_eq!(collection, "items");
                assert_eq!(query, "{}");
                assert_eq!(fields, vec!["name".to_string(), "value".to_string()]);
                assert_eq!(sort, vec![("value".to_string(), SortDirection::Descending)]);
                assert_eq!(limit, 2);
            }
            _ => panic!("expected find"),
        }
    }

    #[test]
    fn test_projection_empty_is_none() {
        assert!(projection_from(Vec::new()).is_none());
        assert_eq!(
            projection_from(vec!["a".to_string()]).unwrap().fields(),
            &["a".to_string()]
        );
    }
}
