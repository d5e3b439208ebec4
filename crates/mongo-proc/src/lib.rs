//! Procedural MongoDB facade
//!
//! A thin layer of free functions over the `mongodb` driver for CRUD on a
//! single database. Two policies are added on top of the driver:
//!
//! - `create` stamps `created_at` and `updated_at`; `update` stamps
//!   `$set.updated_at`.
//! - `update` affects every match unless `multiple` is explicitly `false`.
//!
//! Everything else is delegated as-is.
//!
//! ```ignore
//! use bson::doc;
//! use mongo_proc::{create, find_one, update, remove, UpdateOptions};
//!
//! let conn = mongo_proc::init(Some("mongodb://localhost"), "mydb").await?;
//! let project = create(&conn, "projects", doc! { "name": "x", "author": "a" }, None).await?;
//! let found = find_one(&conn, "projects", doc! { "author": "a" }).await?;
//! update(&conn, "projects", doc! { "_id": project.get("_id").cloned() },
//!        doc! { "$set": { "license": "MIT" } }, UpdateOptions::default()).await?;
//! remove(&conn, "projects", doc! { "name": "x" }).await?;
//! ```

pub mod connection;
pub mod json;
pub mod model;
pub mod ops;
pub mod options;
pub mod query;
pub mod timestamps;

pub use connection::{Connection, ConnectionSlot, PoolConfig, DEFAULT_DSN};
pub use json::{document_from_json, document_to_json};
pub use model::Model;
pub use mongo_proc_common::{MongoProcError, Result};
pub use ops::{close, create, distinct, find, find_one, id, index, init, remove, update};
pub use options::{IndexKeys, UpdateOptions, UpdatePlan};
pub use query::{coerce_query, FindQuery};
pub use timestamps::{CREATED_AT, UPDATED_AT};
