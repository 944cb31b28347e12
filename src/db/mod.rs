//! Database module: SQLite persistence behind a single actor.
//!
//! Layout:
//! - `actor.rs`: the `DbActor` and its cloneable handle (implements `MetricsStore`)
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)

pub mod actor;
pub mod models;
pub mod schema;

pub use models::{DbConnectionRow, DbRecordRow};
pub use schema::SQLITE_INIT;

pub use actor::{DbActorHandle, spawn};
