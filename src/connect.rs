//! Turns a connection profile into a ready database and comment provider

use crate::config::ConnectionProfile;
use crate::database::{
    CachedRelationalDatabase, EmptyRelationalDatabaseCommentProvider, RelationalDatabase,
    RelationalDatabaseCommentProvider,
};
use crate::dialect::DatabaseDialect;
use crate::resolution::{
    DefaultSchemaIdentifierResolutionStrategy, IdentifierResolutionStrategy, SearchPathIdentifierResolutionStrategy,
};
use crate::snapshot::SnapshotFile;
use crate::sqlite::database::search_order;
use crate::sqlite::{SqliteConnection, SqliteDialect, SqliteRelationalDatabase};
use crate::sqlserver::{
    SqlServerConnection, SqlServerDialect, SqlServerRelationalDatabase,
    SqlServerRelationalDatabaseCommentProvider, DEFAULT_SCHEMA,
};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

/// A connected database with everything the CLI reads from it.
pub struct ConnectedDatabase {
    pub database: Arc<dyn RelationalDatabase>,
    pub comments: Arc<dyn RelationalDatabaseCommentProvider>,
    pub dialect: Arc<dyn DatabaseDialect>,
    /// Schemas searched for unqualified names; empty for SQL Server, which
    /// resolves against its default schema instead
    pub search_path: Vec<String>,
}

impl std::fmt::Debug for ConnectedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedDatabase")
            .field("dialect", &self.dialect.name())
            .field("defaults", self.database.identifier_defaults())
            .field("search_path", &self.search_path)
            .finish()
    }
}

/// Dialect by its short name, as stored in snapshot files
pub fn dialect_named(name: &str) -> Option<Arc<dyn DatabaseDialect>> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" => Some(Arc::new(SqliteDialect::new())),
        "sqlserver" => Some(Arc::new(SqlServerDialect::new())),
        _ => None,
    }
}

#[tracing::instrument(skip(profile), fields(kind = profile.kind()))]
pub async fn connect(profile: &ConnectionProfile) -> anyhow::Result<ConnectedDatabase> {
    match profile {
        ConnectionProfile::Sqlite { path, attach } => {
            let connection = open_sqlite(path)?;
            for (schema, file) in attach {
                connection
                    .attach(schema, file)
                    .with_context(|| format!("failed to attach {} as {}", file.display(), schema))?;
            }
            sqlite(connection).await
        }
        ConnectionProfile::Sqlserver {
            connection_string,
            default_schema,
        } => {
            let connection = Arc::new(
                SqlServerConnection::connect(connection_string)
                    .await
                    .context("failed to connect to SQL Server")?,
            );
            let mut database = SqlServerRelationalDatabase::new(connection.clone()).await?;
            let mut comments = SqlServerRelationalDatabaseCommentProvider::new(connection).await?;
            if let Some(schema) = default_schema {
                database = database.with_default_schema(schema.clone());
                comments = comments.with_default_schema(schema.clone());
            }
            Ok(ConnectedDatabase {
                database: Arc::new(CachedRelationalDatabase::new(database)),
                comments: Arc::new(comments),
                dialect: Arc::new(SqlServerDialect::new()),
                search_path: Vec::new(),
            })
        }
        ConnectionProfile::Snapshot { path } => load_snapshot(path),
    }
}

/// Open an existing SQLite file; a missing file is an error rather than a new database
pub fn open_sqlite(path: &Path) -> anyhow::Result<SqliteConnection> {
    if !path.exists() {
        anyhow::bail!("SQLite database {} does not exist", path.display());
    }
    SqliteConnection::open(path).with_context(|| format!("failed to open {}", path.display()))
}

pub async fn sqlite(connection: SqliteConnection) -> anyhow::Result<ConnectedDatabase> {
    let database = SqliteRelationalDatabase::new(connection);
    let search_path = database.search_path().await?;
    let comments = EmptyRelationalDatabaseCommentProvider::new(database.identifier_defaults().clone());
    Ok(ConnectedDatabase {
        database: Arc::new(CachedRelationalDatabase::new(database)),
        comments: Arc::new(comments),
        dialect: Arc::new(SqliteDialect::new()),
        search_path,
    })
}

/// Strategy a loaded snapshot resolves names with, matching its source database
fn snapshot_strategy(file: &SnapshotFile, dialect: &str) -> Option<Arc<dyn IdentifierResolutionStrategy>> {
    match dialect {
        "sqlserver" => Some(Arc::new(DefaultSchemaIdentifierResolutionStrategy::new(DEFAULT_SCHEMA))),
        "sqlite" => {
            let search_path = if file.search_path.is_empty() {
                search_order(file.captured_schemas())
            } else {
                file.search_path.clone()
            };
            Some(Arc::new(SearchPathIdentifierResolutionStrategy::new(search_path)))
        }
        _ => None,
    }
}

pub fn load_snapshot(path: &Path) -> anyhow::Result<ConnectedDatabase> {
    let file = SnapshotFile::load(path).with_context(|| format!("failed to load snapshot {}", path.display()))?;
    let dialect = dialect_named(&file.dialect)
        .with_context(|| format!("snapshot {} was taken from unknown dialect '{}'", path.display(), file.dialect))?;
    let strategy = snapshot_strategy(&file, dialect.name());
    let search_path = file.search_path.clone();

    let (mut database, mut comments) = file.into_snapshots();
    if let Some(strategy) = strategy {
        database = database.with_strategy(strategy.clone());
        comments = comments.with_strategy(strategy);
    }
    tracing::debug!(objects = database.object_count(), "loaded snapshot");

    Ok(ConnectedDatabase {
        database: Arc::new(database),
        comments: Arc::new(comments),
        dialect,
        search_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use indexmap::IndexMap;

    fn create_database(path: &Path, sql: &str) {
        let connection = SqliteConnection::open(path).unwrap();
        connection.execute_batch(sql).unwrap();
    }

    #[tokio::test]
    async fn test_connect_sqlite_profile_with_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("app.db");
        let audit = dir.path().join("audit.db");
        create_database(&main, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);");
        create_database(&audit, "CREATE TABLE events (id INTEGER PRIMARY KEY, user_id INTEGER);");

        let mut attach = IndexMap::new();
        attach.insert("audit".to_string(), audit);
        let connected = connect(&ConnectionProfile::Sqlite { path: main, attach }).await.unwrap();

        assert_eq!(connected.dialect.name(), "sqlite");
        let events = connected
            .database
            .get_table(&Identifier::new("events").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(events.name.to_string(), "audit.events");
        assert!(connected
            .comments
            .get_table_comments(&Identifier::new("users").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_sqlite_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ConnectionProfile::Sqlite {
            path: dir.path().join("missing.db"),
            attach: IndexMap::new(),
        };
        assert!(connect(&profile).await.is_err());
        assert!(!dir.path().join("missing.db").exists());
    }

    #[tokio::test]
    async fn test_snapshot_profile_serves_captured_objects() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.db");
        create_database(&db_path, "CREATE TABLE users (id INTEGER PRIMARY KEY);");

        let live = sqlite(SqliteConnection::open(&db_path).unwrap()).await.unwrap();
        let file = SnapshotFile::capture("sqlite", live.database.as_ref(), live.comments.as_ref())
            .await
            .unwrap();
        let snapshot_path = dir.path().join("app.json");
        file.save(&snapshot_path).unwrap();

        let connected = connect(&ConnectionProfile::Snapshot { path: snapshot_path }).await.unwrap();
        assert_eq!(connected.dialect.name(), "sqlite");
        let tables = connected.database.get_all_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert!(connected
            .database
            .get_table(&Identifier::new("users").unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_sqlite_snapshot_keeps_attached_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("app.db");
        let audit = dir.path().join("audit.db");
        create_database(&main, "CREATE TABLE users (id INTEGER PRIMARY KEY);");
        create_database(&audit, "CREATE TABLE events (id INTEGER PRIMARY KEY);");

        let mut attach = IndexMap::new();
        attach.insert("audit".to_string(), audit);
        let live = connect(&ConnectionProfile::Sqlite { path: main, attach }).await.unwrap();
        assert_eq!(live.search_path.last().map(String::as_str), Some("audit"));

        let file = SnapshotFile::capture("sqlite", live.database.as_ref(), live.comments.as_ref())
            .await
            .unwrap()
            .with_search_path(live.search_path.clone());
        let snapshot_path = dir.path().join("app.json");
        file.save(&snapshot_path).unwrap();

        let offline = connect(&ConnectionProfile::Snapshot { path: snapshot_path }).await.unwrap();
        let events = Identifier::new("events").unwrap();
        let from_live = live.database.get_table(&events).await.unwrap().map(|t| t.name.to_string());
        let from_snapshot = offline.database.get_table(&events).await.unwrap().map(|t| t.name.to_string());
        assert_eq!(from_live.as_deref(), Some("audit.events"));
        assert_eq!(from_snapshot, from_live);
    }

    #[tokio::test]
    async fn test_sqlite_snapshot_without_search_path_uses_captured_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("app.db");
        let audit = dir.path().join("audit.db");
        create_database(&main, "CREATE TABLE users (id INTEGER PRIMARY KEY);");
        create_database(&audit, "CREATE TABLE events (id INTEGER PRIMARY KEY);");

        let mut attach = IndexMap::new();
        attach.insert("audit".to_string(), audit);
        let live = connect(&ConnectionProfile::Sqlite { path: main, attach }).await.unwrap();
        let file = SnapshotFile::capture("sqlite", live.database.as_ref(), live.comments.as_ref())
            .await
            .unwrap();
        let snapshot_path = dir.path().join("app.json");
        file.save(&snapshot_path).unwrap();

        let offline = connect(&ConnectionProfile::Snapshot { path: snapshot_path }).await.unwrap();
        let events = offline
            .database
            .get_table(&Identifier::new("events").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(events.name.to_string(), "audit.events");
    }

    #[test]
    fn test_dialect_named() {
        assert_eq!(dialect_named("SQLite").unwrap().name(), "sqlite");
        assert_eq!(dialect_named("sqlserver").unwrap().name(), "sqlserver");
        assert!(dialect_named("oracle").is_none());
    }
}
