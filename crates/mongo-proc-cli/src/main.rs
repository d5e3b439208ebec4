//! mproc - command-line access to the mongo-proc facade
//!
//! Usage:
//!   mproc create <collection> '<json>'                 Insert with timestamps
//!   mproc find-one <collection> ['<json-query>']       First match or null
//!   mproc find <collection> ['<json-query>'] --limit 5 --skip 2
//!   mproc distinct <collection> <field> ['<json-query>']
//!   mproc update <collection> '<json-query>' '<json-instruction>' [--single] [--upsert]
//!   mproc remove <collection> '<json-query>'
//!   mproc index <collection> <field | '<json-keys>'> [--unique] [--name NAME]
//!   mproc id <hex>
//!   mproc ping
//!
//! Connection:
//!   --dsn URL     falls back to MONGODB_URL, then mongodb://localhost:27017/
//!   --db NAME     falls back to MONGODB_DATABASE

use anyhow::{Context, Result};
use bson::{Bson, Document as BsonDocument};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use mongo_proc::{document_from_json, document_to_json, Connection, IndexKeys, UpdateOptions};
use mongodb::options::IndexOptions;

#[derive(Parser, Debug)]
#[command(name = "mproc")]
#[command(about = "Procedural MongoDB CRUD with automatic timestamps", long_about = None)]
#[command(version)]
struct Cli {
    /// MongoDB connection string
    #[arg(long, global = true)]
    dsn: Option<String>,

    /// Database name
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a document, stamping created_at/updated_at
    Create {
        collection: String,
        /// Document as (extended) JSON
        document: String,
    },

    /// Print the first matching document, or null
    FindOne {
        collection: String,
        /// Query as JSON (default: match everything)
        query: Option<String>,
    },

    /// Print matching documents, one per line
    Find {
        collection: String,
        query: Option<String>,

        /// Maximum number of documents (0 = no limit)
        #[arg(long, default_value = "0")]
        limit: i64,

        /// Documents to skip (0 = none)
        #[arg(long, default_value = "0")]
        skip: u64,
    },

    /// Print distinct values of a field
    Distinct {
        collection: String,
        field: String,
        query: Option<String>,
    },

    /// Update matching documents, stamping $set.updated_at
    Update {
        collection: String,
        query: String,
        instruction: String,

        /// Update only the first match
        #[arg(long)]
        single: bool,

        /// Insert when nothing matches
        #[arg(long)]
        upsert: bool,
    },

    /// Remove matching documents
    Remove { collection: String, query: String },

    /// Ensure an index on a field or a JSON key spec
    Index {
        collection: String,
        keys: String,

        #[arg(long)]
        unique: bool,

        #[arg(long)]
        name: Option<String>,
    },

    /// Validate and normalize an ObjectId
    Id { hex: String },

    /// Check the server is reachable
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    // Identifiers are parsed locally; no server needed
    if let Commands::Id { hex } = &cli.command {
        return print_id(hex);
    }

    let database = resolve_database(cli.db.clone(), std::env::var("MONGODB_DATABASE").ok())?;
    let dsn = cli.dsn.clone().or_else(|| {
        std::env::var("MONGODB_URL")
            .ok()
            .filter(|url| !url.is_empty())
    });

    tracing::debug!(database = %database, "connecting");
    let conn = Connection::init(dsn.as_deref(), &database)
        .await
        .context("Failed to create MongoDB client")?;

    let outcome = run(&conn, cli.command).await;
    conn.close().await?;
    outcome
}

async fn run(conn: &Connection, command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            collection,
            document,
        } => {
            let document = parse_document(&document, "document")?;
            let created = mongo_proc::create(conn, &collection, document, None).await?;
            print_document(&created)?;
        }

        Commands::FindOne { collection, query } => {
            let query = parse_query(query.as_deref())?;
            match mongo_proc::find_one(conn, &collection, query).await? {
                Some(doc) => print_document(&doc)?,
                None => println!("null"),
            }
        }

        Commands::Find {
            collection,
            query,
            limit,
            skip,
        } => {
            let query = parse_query(query.as_deref())?;
            let mut cursor = mongo_proc::find(conn, &collection, query, limit, skip).await?;
            while let Some(doc) = cursor.try_next().await? {
                println!("{}", serde_json::to_string(&document_to_json(&doc))?);
            }
        }

        Commands::Distinct {
            collection,
            field,
            query,
        } => {
            let query = parse_query(query.as_deref())?;
            let values = mongo_proc::distinct(conn, &collection, &field, query).await?;
            let json: Vec<serde_json::Value> =
                values.into_iter().map(Bson::into_relaxed_extjson).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }

        Commands::Update {
            collection,
            query,
            instruction,
            single,
            upsert,
        } => {
            let query = parse_document(&query, "query")?;
            let instruction = parse_document(&instruction, "instruction")?;
            let mut options = UpdateOptions::default().multiple(!single);
            if upsert {
                options = options.upsert(true);
            }

            let result = mongo_proc::update(conn, &collection, query, instruction, options).await?;
            let summary = serde_json::json!({
                "matched": result.matched_count,
                "modified": result.modified_count,
                "upserted_id": result.upserted_id.map(Bson::into_relaxed_extjson),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Remove { collection, query } => {
            let query = parse_document(&query, "query")?;
            let result = mongo_proc::remove(conn, &collection, query).await?;
            println!("{}", serde_json::json!({ "deleted": result.deleted_count }));
        }

        Commands::Index {
            collection,
            keys,
            unique,
            name,
        } => {
            let keys = parse_index_keys(&keys)?;
            let mut options = IndexOptions::default();
            if unique {
                options.unique = Some(true);
            }
            options.name = name;

            let result = mongo_proc::index(conn, &collection, keys, options).await?;
            println!("{}", result.index_name);
        }

        Commands::Ping => {
            conn.ping().await.context("Ping failed")?;
            println!("ok");
        }

        Commands::Id { hex } => print_id(&hex)?,
    }

    Ok(())
}

/// Pick the database from the flag, then the environment
fn resolve_database(flag: Option<String>, env: Option<String>) -> Result<String> {
    flag.or(env)
        .filter(|name| !name.is_empty())
        .context("No database given. Pass --db or set MONGODB_DATABASE.")
}

fn parse_document(text: &str, what: &str) -> Result<BsonDocument> {
    document_from_json(text).with_context(|| format!("Invalid {} JSON: {}", what, text))
}

fn parse_query(text: Option<&str>) -> Result<BsonDocument> {
    match text {
        Some(text) => parse_document(text, "query"),
        None => Ok(BsonDocument::new()),
    }
}

/// A JSON object is a key spec; anything else is a field name
fn parse_index_keys(text: &str) -> Result<IndexKeys> {
    if text.trim_start().starts_with('{') {
        Ok(IndexKeys::Spec(parse_document(text, "index keys")?))
    } else {
        Ok(IndexKeys::Field(text.to_string()))
    }
}

fn print_id(hex: &str) -> Result<()> {
    let oid = mongo_proc::id(hex).with_context(|| format!("Invalid ObjectId: {}", hex))?;
    println!("{}", oid.to_hex());
    Ok(())
}

fn print_document(doc: &BsonDocument) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&document_to_json(doc))?);
    Ok(())
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
