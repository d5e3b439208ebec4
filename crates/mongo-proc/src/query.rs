//! Query coercion and the find builder

use bson::{Bson, Document as BsonDocument};
use futures::TryStreamExt;
use mongo_proc_common::{MongoProcError, Result};
use mongodb::{options::FindOptions, Cursor};

use crate::connection::Connection;

/// Turn a loosely typed query value into a query document
///
/// Documents pass through, `Null` becomes the empty (match-all) query.
pub fn coerce_query(query: impl Into<Bson>) -> Result<BsonDocument> {
    match query.into() {
        Bson::Document(doc) => Ok(doc),
        Bson::Null => Ok(BsonDocument::new()),
        other => Err(MongoProcError::Query(format!(
            "query must be a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Find builder
///
/// `skip` and `limit` are only recorded when positive, so a zero means
/// "do not apply" rather than "skip none" or "return none".
#[derive(Debug, Clone)]
pub struct FindQuery {
    collection_name: String,
    filter: BsonDocument,
    sort: Option<BsonDocument>,
    skip: Option<u64>,
    limit: Option<i64>,
}

impl FindQuery {
    /// Create a new find over `collection_name` matching everything
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            filter: BsonDocument::new(),
            sort: None,
            skip: None,
            limit: None,
        }
    }

    /// Set the filter document
    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.filter = filter;
        self
    }

    /// Set the sort order
    pub fn sort(mut self, sort: BsonDocument) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Skip `skip` documents; zero leaves the cursor untouched
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = (skip > 0).then_some(skip);
        self
    }

    /// Return at most `limit` documents; zero or negative leaves the cursor untouched
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn get_filter(&self) -> &BsonDocument {
        &self.filter
    }

    pub fn get_sort(&self) -> Option<&BsonDocument> {
        self.sort.as_ref()
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }

    /// Driver options for this find
    ///
    /// The server always applies skip before limit.
    pub fn to_options(&self) -> FindOptions {
        let mut find_options = FindOptions::default();
        if let Some(sort) = &self.sort {
            find_options.sort = Some(sort.clone());
        }
        if let Some(skip) = self.skip {
            find_options.skip = Some(skip);
        }
        if let Some(limit) = self.limit {
            find_options.limit = Some(limit);
        }
        find_options
    }

    /// Open a lazy cursor over the matching documents
    pub async fn cursor(self, conn: &Connection) -> Result<Cursor<BsonDocument>> {
        let find_options = self.to_options();
        tracing::debug!(
            collection = %self.collection_name,
            skip = ?self.skip,
            limit = ?self.limit,
            "find"
        );

        let cursor = conn
            .collection(&self.collection_name)
            .find(self.filter)
            .with_options(find_options)
            .await?;

        Ok(cursor)
    }

    /// Execute the query and return all matching documents
    pub async fn to_list(self, conn: &Connection) -> Result<Vec<BsonDocument>> {
        let cursor = self.cursor(conn).await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs)
    }
}
