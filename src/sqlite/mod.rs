//! SQLite provider
//!
//! Reads `sqlite_master` and the table-valued pragma functions of every
//! attached schema. SQLite has no sequences, synonyms, routines or comments.

pub mod connection;
pub mod pragma;
pub mod ddl;
pub mod dialect;
mod catalog;
pub mod database;

pub use connection::SqliteConnection;
pub use database::SqliteRelationalDatabase;
pub use dialect::SqliteDialect;
pub use pragma::{JournalMode, SqliteDatabasePragma, TextEncoding};
