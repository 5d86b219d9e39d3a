//! # Schematic - Relational Database Schema Introspection
//!
//! Discovers what exists in a live database and models it as a typed object graph.
//!
//! Schematic provides:
//! - Qualified identifiers with pluggable resolution strategies
//! - Tables, views, columns, keys, indexes, checks, triggers, sequences, synonyms and routines
//! - Catalog-backed providers for SQLite and SQL Server
//! - Memoizing and snapshot compositions over any provider
//! - Comment (description) providers alongside the structural ones

pub mod identifier;
pub mod resolution;
pub mod cache;
pub mod model;
pub mod dialect;
pub mod database;
pub mod snapshot;
pub mod sqlite;
pub mod sqlserver;
pub mod config;
pub mod connect;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use identifier::{Identifier, IdentifierDefaults};
pub use resolution::{
    DefaultSchemaIdentifierResolutionStrategy, IdentifierResolutionStrategy,
    SearchPathIdentifierResolutionStrategy, VerbatimIdentifierResolutionStrategy,
};
pub use database::{RelationalDatabase, RelationalDatabaseCommentProvider};
pub use dialect::DatabaseDialect;
pub use snapshot::{CommentSnapshot, RelationalDatabaseSnapshot};

/// Result type alias for Schematic operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Schematic operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("SQL Server error: {0}")]
    SqlServer(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("SQL parse error: {0}")]
    Sql(#[from] sqlparser::parser::ParserError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}
