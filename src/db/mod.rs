//! Database module: generic record persistence on a single SQLite file.
//!
//! Layout:
//! - `models.rs`: the `Record` schema trait and store value types
//! - `schema.rs`: SQL generated from a record's schema declaration
//! - `sqlite.rs`: the lazily opened `RecordStore`

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Column, DatabaseInfo, Record, SaveMode, SqlValue, SqliteQuery};
pub use schema::create_table_sql;
pub use sqlite::{RecordStore, SqlitePool};
