//! Option types for update and index calls

use bson::{DateTime, Document as BsonDocument};
use mongo_proc_common::Result;
use mongodb::options::{UpdateOptions as DriverUpdateOptions, WriteConcern};

use crate::timestamps::stamp_updated;

/// Options accepted by [`update`](crate::update)
///
/// `multiple` is presence-checked: `None` means "affect every match",
/// while an explicit `Some(false)` is honored and updates one document.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub multiple: Option<bool>,
    pub upsert: Option<bool>,
    pub array_filters: Option<Vec<BsonDocument>>,
    pub write_concern: Option<WriteConcern>,
}

impl UpdateOptions {
    /// Update only the first matching document
    pub fn single() -> Self {
        Self {
            multiple: Some(false),
            ..Self::default()
        }
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    /// Resolved `multiple` flag
    pub fn is_multiple(&self) -> bool {
        self.multiple.unwrap_or(true)
    }

    fn into_driver_options(self) -> DriverUpdateOptions {
        let mut options = DriverUpdateOptions::default();
        options.upsert = self.upsert;
        options.array_filters = self.array_filters;
        options.write_concern = self.write_concern;
        options
    }
}

/// An update ready to hand to the driver, with both policies applied
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub filter: BsonDocument,
    pub instruction: BsonDocument,
    pub multiple: bool,
    pub options: DriverUpdateOptions,
}

impl UpdatePlan {
    pub fn new(
        filter: BsonDocument,
        mut instruction: BsonDocument,
        options: UpdateOptions,
        now: DateTime,
    ) -> Result<Self> {
        stamp_updated(&mut instruction, now)?;
        let multiple = options.is_multiple();

        Ok(Self {
            filter,
            instruction,
            multiple,
            options: options.into_driver_options(),
        })
    }
}

/// Keys for [`index`](crate::index): a single field or a full key spec
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKeys {
    /// One ascending field
    Field(String),
    /// Field to direction (or index type) mapping, e.g. `{author: 1, license: 1}`
    Spec(BsonDocument),
}

impl IndexKeys {
    pub fn into_document(self) -> BsonDocument {
        match self {
            IndexKeys::Field(field) => {
                let mut keys = BsonDocument::new();
                keys.insert(field, 1);
                keys
            }
            IndexKeys::Spec(keys) => keys,
        }
    }
}

impl From<&str> for IndexKeys {
    fn from(field: &str) -> Self {
        IndexKeys::Field(field.to_string())
    }
}

impl From<String> for IndexKeys {
    fn from(field: String) -> Self {
        IndexKeys::Field(field)
    }
}

impl From<BsonDocument> for IndexKeys {
    fn from(keys: BsonDocument) -> Self {
        IndexKeys::Spec(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamps::UPDATED_AT;
    use bson::doc;

    #[test]
    fn test_multiple_defaults_to_true_when_absent() {
        let options = UpdateOptions::default();
        assert!(options.multiple.is_none());
        assert!(options.is_multiple());
    }

    #[test]
    fn test_explicit_false_is_honored() {
        assert!(!UpdateOptions::single().is_multiple());
        assert!(!UpdateOptions::default().multiple(false).is_multiple());
        assert!(UpdateOptions::default().multiple(true).is_multiple());
    }

    #[test]
    fn test_plan_stamps_and_merges_set() {
        let now = DateTime::now();
        let plan = UpdatePlan::new(
            doc! { "name": "x" },
            doc! { "$set": { "license": "MIT" } },
            UpdateOptions::default(),
            now,
        )
        .unwrap();

        assert!(plan.multiple);
        assert_eq!(plan.filter, doc! { "name": "x" });
        assert_eq!(
            plan.instruction,
            doc! { "$set": { "license": "MIT", "updated_at": now } }
        );
    }

    #[test]
    fn test_plan_creates_set_for_other_operators() {
        let now = DateTime::now();
        let plan = UpdatePlan::new(
            doc! {},
            doc! { "$unset": { "url": "" } },
            UpdateOptions::single(),
            now,
        )
        .unwrap();

        assert!(!plan.multiple);
        let set = plan.instruction.get_document("$set").unwrap();
        assert_eq!(set.get_datetime(UPDATED_AT).unwrap(), &now);
        assert!(plan.instruction.contains_key("$unset"));
    }

    #[test]
    fn test_plan_forwards_driver_options() {
        let options = UpdateOptions {
            upsert: Some(true),
            array_filters: Some(vec![doc! { "elem.grade": { "$gte": 85 } }]),
            ..UpdateOptions::default()
        };
        let plan = UpdatePlan::new(doc! {}, doc! {}, options, DateTime::now()).unwrap();

        assert!(plan.multiple);
        assert_eq!(plan.options.upsert, Some(true));
        assert_eq!(plan.options.array_filters.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_plan_rejects_scalar_set() {
        let result = UpdatePlan::new(
            doc! {},
            doc! { "$set": 5 },
            UpdateOptions::default(),
            DateTime::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_index_keys_from_field() {
        let keys: IndexKeys = "name".into();
        assert_eq!(keys.into_document(), doc! { "name": 1 });
    }

    #[test]
    fn test_index_keys_from_spec() {
        let spec = doc! { "author": 1, "license": 1 };
        let keys: IndexKeys = spec.clone().into();
        assert_eq!(keys, IndexKeys::Spec(spec.clone()));
        assert_eq!(keys.into_document(), spec);
    }
}
