//! # MongoDB
//!
//! Document store for the whole platform.
//!
//! ## Collections
//!
//! - `users`: accounts, unique on **email**
//! - `committees`: unique on **name**; the embedded member list is the single
//!   source of truth for membership
//! - `meetings`: participants, motions, votes, and discussion all embedded in
//!   the one meeting document, so every mutation is a single-document update;
//!   **code** is unique among active meetings (partial index)
//!
//! The client is built once at startup and shared for the process lifetime.
//! There is no teardown; the driver's connection pool owns reconnection.

use std::time::Duration;

use bson::doc;
use mongodb::{
    Client, Database, IndexModel,
    options::{ClientOptions, IndexOptions},
};
use tracing::info;

pub async fn init_mongo(mongo_url: &str, db_name: &str) -> Database {
    let mut options = ClientOptions::parse(mongo_url).await.unwrap();
    options.app_name = Some("gavel".to_string());
    options.connect_timeout = Some(Duration::from_secs(5));
    options.server_selection_timeout = Some(Duration::from_secs(5));

    let client = Client::with_options(options).unwrap();
    let db = client.database(db_name);

    ensure_indexes(&db).await;
    info!("Connected to {db_name}");

    db
}

async fn ensure_indexes(db: &Database) {
    let unique_email = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<bson::Document>("users")
        .create_index(unique_email)
        .await
        .unwrap();

    let unique_name = IndexModel::builder()
        .keys(doc! { "name": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<bson::Document>("committees")
        .create_index(unique_name)
        .await
        .unwrap();

    // Join codes only need to be unique while the meeting is active; closed
    // meetings keep their code for the record.
    let unique_active_code = IndexModel::builder()
        .keys(doc! { "code": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! { "active": true })
                .build(),
        )
        .build();
    db.collection::<bson::Document>("meetings")
        .create_index(unique_active_code)
        .await
        .unwrap();
}
