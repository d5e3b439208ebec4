//! Write timestamp policy
//!
//! `create` stamps both fields; `update` stamps `updated_at` inside `$set`.

use bson::{Bson, DateTime, Document as BsonDocument};
use mongo_proc_common::{MongoProcError, Result};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

const SET: &str = "$set";

/// Set `created_at` and `updated_at` to `now`, overwriting caller values
pub fn stamp_created(document: &mut BsonDocument, now: DateTime) {
    document.insert(CREATED_AT, now);
    document.insert(UPDATED_AT, now);
}

/// Set `$set.updated_at` to `now`, merging into an existing `$set`
///
/// A missing or null `$set` is created. A `$set` holding anything other
/// than a document is rejected.
pub fn stamp_updated(instruction: &mut BsonDocument, now: DateTime) -> Result<()> {
    match instruction.get_mut(SET) {
        Some(Bson::Document(set)) => {
            set.insert(UPDATED_AT, now);
            return Ok(());
        }
        Some(Bson::Null) | None => {}
        Some(other) => {
            return Err(MongoProcError::Query(format!(
                "$set must be a document, got {:?}",
                other.element_type()
            )));
        }
    }

    let mut set = BsonDocument::new();
    set.insert(UPDATED_AT, now);
    instruction.insert(SET, set);
    Ok(())
}
