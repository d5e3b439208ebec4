//! Walk through the facade against a local server
//!
//! Run with: cargo run --example projects
//! Override the server with MONGODB_URL.

use bson::doc;
use mongo_proc::{create, find_one, index, remove, update, Result, UpdateOptions};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let uri = std::env::var("MONGODB_URL").ok();
    let conn = mongo_proc::init(uri.as_deref(), "mydb").await?;

    index(&conn, "projects", "name", None).await?;
    index(&conn, "projects", doc! { "author": 1, "license": 1 }, None).await?;

    let project = create(
        &conn,
        "projects",
        doc! {
            "name": "noodlehaus/mongo",
            "author": "noodlehaus",
            "url": "http://github.com/noodlehaus/mongo.git",
        },
        None,
    )
    .await?;
    println!("created: {}", project);

    let project = find_one(&conn, "projects", doc! { "author": project.get("author").cloned() })
        .await?
        .expect("project was just created");

    let result = update(
        &conn,
        "projects",
        doc! { "_id": project.get("_id").cloned() },
        doc! { "$set": { "license": "MIT" } },
        UpdateOptions::default(),
    )
    .await?;
    println!("updated {} document(s)", result.modified_count);

    let result = remove(&conn, "projects", doc! { "name": "noodlehaus/mongo" }).await?;
    println!("removed {} document(s)", result.deleted_count);

    mongo_proc::close(conn).await
}

