//! Pragma access
//!
//! Two layers:
//! - row readers over the table-valued pragma functions, used by the catalog
//! - `SqliteDatabasePragma`, typed database settings for one schema

use super::connection::SqliteConnection;
use crate::Result;
use rusqlite::{Connection, DatabaseName};

/// Row of `pragma_database_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseListRow {
    pub seq: i64,
    pub name: String,
    pub file: String,
}

/// Row of `pragma_table_xinfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumnRow {
    pub cid: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it
    pub pk: i64,
    /// 0 normal, 1 hidden virtual-table column, 2/3 generated column
    pub hidden: i64,
}

impl TableColumnRow {
    pub fn is_generated(&self) -> bool {
        matches!(self.hidden, 2 | 3)
    }
}

/// Row of `pragma_index_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexListRow {
    pub name: String,
    pub is_unique: bool,
    /// `c` CREATE INDEX, `u` UNIQUE constraint, `pk` PRIMARY KEY
    pub origin: String,
    pub is_partial: bool,
}

/// Row of `pragma_index_xinfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnRow {
    pub seqno: i64,
    /// Table column id; -1 for rowid, -2 for an expression
    pub cid: i64,
    pub name: Option<String>,
    pub is_descending: bool,
    pub is_key: bool,
}

/// Row of `pragma_foreign_key_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub id: i64,
    pub seq: i64,
    pub parent_table: String,
    pub from: String,
    /// `None` when the parent primary key is implied
    pub to: Option<String>,
    pub on_update: String,
    pub on_delete: String,
}

pub fn database_list(conn: &Connection) -> Result<Vec<DatabaseListRow>> {
    let mut stmt = conn.prepare("SELECT seq, name, file FROM pragma_database_list ORDER BY seq")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DatabaseListRow {
                seq: row.get(0)?,
                name: row.get(1)?,
                file: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn table_columns(conn: &Connection, schema: &str, table: &str) -> Result<Vec<TableColumnRow>> {
    let mut stmt = conn.prepare(
        r#"SELECT cid, name, type, "notnull", dflt_value, pk, hidden
           FROM pragma_table_xinfo(?1, ?2)
           ORDER BY cid"#,
    )?;
    let rows = stmt
        .query_map([table, schema], |row| {
            Ok(TableColumnRow {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get(3)?,
                default_value: row.get(4)?,
                pk: row.get(5)?,
                hidden: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn index_list(conn: &Connection, schema: &str, table: &str) -> Result<Vec<IndexListRow>> {
    let mut stmt = conn.prepare(
        r#"SELECT name, "unique", origin, partial
           FROM pragma_index_list(?1, ?2)
           ORDER BY seq DESC"#,
    )?;
    let rows = stmt
        .query_map([table, schema], |row| {
            Ok(IndexListRow {
                name: row.get(0)?,
                is_unique: row.get(1)?,
                origin: row.get(2)?,
                is_partial: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn index_columns(conn: &Connection, schema: &str, index: &str) -> Result<Vec<IndexColumnRow>> {
    let mut stmt = conn.prepare(
        r#"SELECT seqno, cid, name, "desc", "key"
           FROM pragma_index_xinfo(?1, ?2)
           ORDER BY seqno"#,
    )?;
    let rows = stmt
        .query_map([index, schema], |row| {
            Ok(IndexColumnRow {
                seqno: row.get(0)?,
                cid: row.get(1)?,
                name: row.get(2)?,
                is_descending: row.get(3)?,
                is_key: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn foreign_keys(conn: &Connection, schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>> {
    let mut stmt = conn.prepare(
        r#"SELECT id, seq, "table", "from", "to", on_update, on_delete
           FROM pragma_foreign_key_list(?1, ?2)
           ORDER BY id, seq"#,
    )?;
    let rows = stmt
        .query_map([table, schema], |row| {
            Ok(ForeignKeyRow {
                id: row.get(0)?,
                seq: row.get(1)?,
                parent_table: row.get(2)?,
                from: row.get(3)?,
                to: row.get(4)?,
                on_update: row.get(5)?,
                on_delete: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Text encoding of a database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16le,
    Utf16be,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16le => "UTF-16le",
            TextEncoding::Utf16be => "UTF-16be",
        }
    }

    fn from_pragma(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "UTF-8" => Some(TextEncoding::Utf8),
            "UTF-16LE" => Some(TextEncoding::Utf16le),
            "UTF-16BE" => Some(TextEncoding::Utf16be),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "delete",
            JournalMode::Truncate => "truncate",
            JournalMode::Persist => "persist",
            JournalMode::Memory => "memory",
            JournalMode::Wal => "wal",
            JournalMode::Off => "off",
        }
    }

    fn from_pragma(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "delete" => Some(JournalMode::Delete),
            "truncate" => Some(JournalMode::Truncate),
            "persist" => Some(JournalMode::Persist),
            "memory" => Some(JournalMode::Memory),
            "wal" => Some(JournalMode::Wal),
            "off" => Some(JournalMode::Off),
            _ => None,
        }
    }
}

/// Typed database-level pragmas of one schema.
#[derive(Debug, Clone)]
pub struct SqliteDatabasePragma {
    connection: SqliteConnection,
    schema: String,
}

impl SqliteDatabasePragma {
    pub fn new(connection: SqliteConnection, schema: impl Into<String>) -> Self {
        Self {
            connection,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    async fn query_value<T>(&self, pragma: &'static str) -> Result<T>
    where
        T: rusqlite::types::FromSql + Send + 'static,
    {
        let schema = self.schema.clone();
        self.connection
            .call(move |conn| {
                let value = conn.pragma_query_value(Some(DatabaseName::Attached(&schema)), pragma, |row| {
                    row.get(0)
                })?;
                Ok(value)
            })
            .await
    }

    pub async fn page_size(&self) -> Result<i64> {
        self.query_value("page_size").await
    }

    pub async fn page_count(&self) -> Result<i64> {
        self.query_value("page_count").await
    }

    /// `None` for an encoding this crate does not recognise
    pub async fn encoding(&self) -> Result<Option<TextEncoding>> {
        let value: String = self.query_value("encoding").await?;
        Ok(TextEncoding::from_pragma(&value))
    }

    pub async fn journal_mode(&self) -> Result<Option<JournalMode>> {
        let value: String = self.query_value("journal_mode").await?;
        Ok(JournalMode::from_pragma(&value))
    }

    pub async fn user_version(&self) -> Result<i64> {
        self.query_value("user_version").await
    }

    pub async fn application_id(&self) -> Result<i64> {
        self.query_value("application_id").await
    }

    pub async fn schema_version(&self) -> Result<i64> {
        self.query_value("schema_version").await
    }

    /// Foreign key enforcement; connection-wide rather than per schema
    pub async fn foreign_keys_enabled(&self) -> Result<bool> {
        self.connection
            .call(|conn| Ok(conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?))
            .await
    }

    /// Database file size in bytes
    pub async fn size_in_bytes(&self) -> Result<i64> {
        Ok(self.page_size().await? * self.page_count().await?)
    }
}
