//! Typed documents on top of the facade
//!
//! Implement [`Model`] for a serde type to get the facade's CRUD calls with
//! automatic BSON conversion. The same timestamp and multi-update policies
//! apply because every method goes through the free functions.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document as BsonDocument};
use mongo_proc_common::{MongoProcError, Result};
use mongodb::options::InsertOneOptions;
use serde::{de::DeserializeOwned, Serialize};

use crate::connection::Connection;
use crate::ops;
use crate::options::UpdateOptions;
use crate::query::FindQuery;
use crate::timestamps::CREATED_AT;

/// A serde type stored in one collection
///
/// # Example
///
/// ```ignore
/// use serde::{Deserialize, Serialize};
/// use bson::{oid::ObjectId, DateTime};
/// use mongo_proc::Model;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Project {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     name: String,
///     author: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     created_at: Option<DateTime>,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     updated_at: Option<DateTime>,
/// }
///
/// impl Model for Project {
///     fn collection_name() -> &'static str {
///         "projects"
///     }
///
///     fn get_id(&self) -> Option<ObjectId> {
///         self.id
///     }
/// }
/// ```
#[async_trait]
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// Get the collection name for this type
    fn collection_name() -> &'static str;

    /// Get the document's ObjectId (if it has one)
    fn get_id(&self) -> Option<ObjectId> {
        None
    }

    /// Convert to BSON
    fn to_bson(&self) -> Result<BsonDocument> {
        Ok(bson::to_document(self)?)
    }

    /// Create from BSON
    fn from_bson(doc: BsonDocument) -> Result<Self> {
        Ok(bson::from_document(doc)?)
    }

    /// Insert this value, then reload it from the stored document so the
    /// assigned `_id` and timestamps are visible on `self`
    async fn create(&mut self, conn: &Connection) -> Result<()> {
        let stored = ops::create(
            conn,
            Self::collection_name(),
            self.to_bson()?,
            None::<InsertOneOptions>,
        )
        .await?;
        *self = Self::from_bson(stored)?;
        Ok(())
    }

    /// Find a single value matching the filter
    async fn find_one(conn: &Connection, filter: BsonDocument) -> Result<Option<Self>> {
        match ops::find_one(conn, Self::collection_name(), filter).await? {
            Some(doc) => Ok(Some(Self::from_bson(doc)?)),
            None => Ok(None),
        }
    }

    /// Find a value by its ObjectId
    async fn find_by_id(conn: &Connection, id: ObjectId) -> Result<Option<Self>> {
        Self::find_one(conn, doc! { "_id": id }).await
    }

    /// Find all values matching the filter
    async fn find(conn: &Connection, filter: BsonDocument) -> Result<Vec<Self>> {
        let docs = FindQuery::new(Self::collection_name())
            .filter(filter)
            .to_list(conn)
            .await?;
        docs.into_iter().map(Self::from_bson).collect()
    }

    /// Write this value's fields back to its document
    ///
    /// `_id` and `created_at` are left untouched; `updated_at` is stamped.
    /// Returns true if a document was modified.
    async fn save(&self, conn: &Connection) -> Result<bool> {
        let id = self
            .get_id()
            .ok_or_else(|| MongoProcError::Query("Document has no _id".to_string()))?;

        let mut fields = self.to_bson()?;
        fields.remove("_id");
        fields.remove(CREATED_AT);

        let result = ops::update(
            conn,
            Self::collection_name(),
            doc! { "_id": id },
            doc! { "$set": fields },
            UpdateOptions::single(),
        )
        .await?;

        Ok(result.modified_count > 0)
    }

    /// Delete this value's document
    ///
    /// Returns true if a document was deleted.
    async fn remove(&self, conn: &Connection) -> Result<bool> {
        let id = self
            .get_id()
            .ok_or_else(|| MongoProcError::Query("Document has no _id".to_string()))?;

        let result = ops::remove(conn, Self::collection_name(), doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Project {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        name: String,
        author: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        updated_at: Option<DateTime>,
    }

    impl Model for Project {
        fn collection_name() -> &'static str {
            "projects"
        }

        fn get_id(&self) -> Option<ObjectId> {
            self.id
        }
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(Project::collection_name(), "projects");
    }

    #[test]
    fn test_to_bson_skips_missing_id() {
        let project = Project {
            id: None,
            name: "noodlehaus/mongo".to_string(),
            author: "noodlehaus".to_string(),
            updated_at: None,
        };

        let bson = project.to_bson().unwrap();
        assert!(!bson.contains_key("_id"));
        assert_eq!(bson.get_str("name").unwrap(), "noodlehaus/mongo");
        assert_eq!(bson.get_str("author").unwrap(), "noodlehaus");
    }

    #[test]
    fn test_from_bson_ignores_unknown_fields() {
        let id = ObjectId::new();
        let now = DateTime::now();
        let stored = doc! {
            "_id": id,
            "name": "x",
            "author": "a",
            "created_at": now,
            "updated_at": now,
        };

        let project = Project::from_bson(stored).unwrap();
        assert_eq!(project.id, Some(id));
        assert_eq!(project.updated_at, Some(now));
    }

    #[test]
    fn test_from_bson_missing_field_is_serialization_error() {
        let err = Project::from_bson(doc! { "name": "x" }).unwrap_err();
        assert!(matches!(err, MongoProcError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_save_without_id_fails_before_io() {
        let project = Project {
            id: None,
            name: "x".to_string(),
            author: "a".to_string(),
            updated_at: None,
        };
        let conn = Connection::init(Some("mongodb://127.0.0.1:1/"), "mydb")
            .await
            .unwrap();

        let err = project.save(&conn).await.unwrap_err();
        assert!(matches!(err, MongoProcError::Query(_)));
        let err = project.remove(&conn).await.unwrap_err();
        assert!(matches!(err, MongoProcError::Query(_)));
    }
}
