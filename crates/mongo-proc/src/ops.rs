//! The procedural facade
//!
//! Each function derives the collection from the connection, applies the
//! write policies where they exist, and makes exactly one driver call.
//! Driver errors are returned unchanged.

use bson::{oid::ObjectId, Bson, DateTime, Document as BsonDocument};
use mongo_proc_common::Result;
use mongodb::{
    options::{IndexOptions, InsertOneOptions},
    results::{CreateIndexResult, DeleteResult, UpdateResult},
    Cursor, IndexModel,
};

use crate::connection::Connection;
use crate::options::{IndexKeys, UpdateOptions, UpdatePlan};
use crate::query::{coerce_query, FindQuery};
use crate::timestamps::stamp_created;

/// Connect and select `database`; `None` uses the local default server
pub async fn init(connection_string: Option<&str>, database: &str) -> Result<Connection> {
    Connection::init(connection_string, database).await
}

/// Close a connection returned by [`init`]
pub async fn close(conn: Connection) -> Result<()> {
    conn.close().await
}

/// Insert `document` into `collection` with fresh timestamps
///
/// `created_at` and `updated_at` are overwritten with the same instant.
/// The returned document carries the store-assigned `_id` when the input
/// had none.
pub async fn create(
    conn: &Connection,
    collection: &str,
    mut document: BsonDocument,
    options: impl Into<Option<InsertOneOptions>>,
) -> Result<BsonDocument> {
    stamp_created(&mut document, DateTime::now());

    tracing::debug!(collection = collection, "create");
    let result = conn
        .collection(collection)
        .insert_one(&document)
        .with_options(options)
        .await?;

    if !document.contains_key("_id") {
        document.insert("_id", result.inserted_id);
    }

    Ok(document)
}

/// Fetch the first document matching `query`
///
/// `Ok(None)` means nothing matched.
pub async fn find_one(
    conn: &Connection,
    collection: &str,
    query: impl Into<Bson>,
) -> Result<Option<BsonDocument>> {
    let filter = coerce_query(query)?;

    tracing::debug!(collection = collection, "find_one");
    let found = conn.collection(collection).find_one(filter).await?;
    Ok(found)
}

/// Open a cursor over documents matching `query`
///
/// `skip` and `limit` are applied only when positive.
pub async fn find(
    conn: &Connection,
    collection: &str,
    query: BsonDocument,
    limit: i64,
    skip: u64,
) -> Result<Cursor<BsonDocument>> {
    FindQuery::new(collection)
        .filter(query)
        .skip(skip)
        .limit(limit)
        .cursor(conn)
        .await
}

/// Distinct values of `field` among documents matching `query`
pub async fn distinct(
    conn: &Connection,
    collection: &str,
    field: &str,
    query: BsonDocument,
) -> Result<Vec<Bson>> {
    tracing::debug!(collection = collection, field = field, "distinct");
    let values = conn.collection(collection).distinct(field, query).await?;
    Ok(values)
}

/// Update documents matching `query`, stamping `$set.updated_at`
///
/// Every match is updated unless `options.multiple` is explicitly `false`.
pub async fn update(
    conn: &Connection,
    collection: &str,
    query: BsonDocument,
    instruction: BsonDocument,
    options: UpdateOptions,
) -> Result<UpdateResult> {
    let plan = UpdatePlan::new(query, instruction, options, DateTime::now())?;

    tracing::debug!(collection = collection, multiple = plan.multiple, "update");
    let coll = conn.collection(collection);
    let result = if plan.multiple {
        coll.update_many(plan.filter, plan.instruction)
            .with_options(plan.options)
            .await?
    } else {
        coll.update_one(plan.filter, plan.instruction)
            .with_options(plan.options)
            .await?
    };

    Ok(result)
}

/// Delete every document matching `query`
pub async fn remove(
    conn: &Connection,
    collection: &str,
    query: BsonDocument,
) -> Result<DeleteResult> {
    tracing::debug!(collection = collection, "remove");
    let result = conn.collection(collection).delete_many(query).await?;
    Ok(result)
}

/// Ensure an index exists on `collection`
///
/// A bare field name indexes that field ascending. Creating an index that
/// already exists with the same spec is a no-op on the server.
pub async fn index(
    conn: &Connection,
    collection: &str,
    keys: impl Into<IndexKeys>,
    options: impl Into<Option<IndexOptions>>,
) -> Result<CreateIndexResult> {
    let options: Option<IndexOptions> = options.into();
    let model = IndexModel::builder()
        .keys(keys.into().into_document())
        .options(options)
        .build();

    tracing::debug!(collection = collection, keys = %model.keys, "index");
    let result = conn.collection(collection).create_index(model).await?;
    Ok(result)
}

/// Wrap a 24-character hex string as an identifier
///
/// Pure: no I/O, same input gives an equal value.
pub fn id(raw: &str) -> Result<ObjectId> {
    Ok(ObjectId::parse_str(raw)?)
}
