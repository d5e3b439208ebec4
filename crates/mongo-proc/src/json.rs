//! Extended JSON conversion for documents

use bson::{Bson, Document as BsonDocument};
use mongo_proc_common::{MongoProcError, Result};

/// Parse (extended) JSON text into a document
///
/// `{"$oid": ...}` and `{"$date": ...}` wrappers become native BSON values.
pub fn document_from_json(text: &str) -> Result<BsonDocument> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(MongoProcError::Serialization(format!(
            "expected a JSON object, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(MongoProcError::Serialization(e.to_string())),
    }
}

/// Render a document as relaxed extended JSON
pub fn document_to_json(document: &BsonDocument) -> serde_json::Value {
    Bson::Document(document.clone()).into_relaxed_extjson()
}
