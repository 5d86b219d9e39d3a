//! SQL Server provider
//!
//! Reads the `sys` catalog views of the database a tiberius session is
//! using. Comments come from `MS_Description` extended properties.

pub mod connection;
pub mod queries;
pub mod rows;
pub mod dialect;
mod catalog;
mod mapping;
pub mod database;
pub mod comments;

pub use catalog::DEFAULT_SCHEMA;
pub use comments::SqlServerRelationalDatabaseCommentProvider;
pub use connection::SqlServerConnection;
pub use database::SqlServerRelationalDatabase;
pub use dialect::SqlServerDialect;
