//! Typed catalog rows decoded from tiberius rows

use crate::{Error, Result};
use tiberius::Row;

fn missing(column: &str) -> Error {
    Error::Catalog(format!("catalog column {} is null", column))
}

fn opt_text(row: &Row, column: &str) -> Result<Option<String>> {
    Ok(row.try_get::<&str, _>(column)?.map(String::from))
}

fn text(row: &Row, column: &str) -> Result<String> {
    opt_text(row, column)?.ok_or_else(|| missing(column))
}

fn opt_int(row: &Row, column: &str) -> Result<Option<i32>> {
    Ok(row.try_get::<i32, _>(column)?)
}

fn int(row: &Row, column: &str) -> Result<i32> {
    opt_int(row, column)?.ok_or_else(|| missing(column))
}

fn opt_bigint(row: &Row, column: &str) -> Result<Option<i64>> {
    Ok(row.try_get::<i64, _>(column)?)
}

fn flag(row: &Row, column: &str) -> Result<bool> {
    Ok(row.try_get::<bool, _>(column)?.unwrap_or(false))
}

/// A row of `sys.objects`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRow {
    pub object_id: i32,
    pub schema_name: String,
    pub name: String,
    pub object_type: String,
}

impl ObjectRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            object_id: int(row, "object_id")?,
            schema_name: text(row, "schema_name")?,
            name: text(row, "name")?,
            object_type: text(row, "object_type")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRow {
    pub name: String,
    pub type_schema: Option<String>,
    pub type_name: String,
    pub base_type_name: Option<String>,
    pub is_user_defined: bool,
    /// Bytes; -1 for `(max)`
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub collation_name: Option<String>,
    pub is_nullable: bool,
    pub default_definition: Option<String>,
    pub computed_definition: Option<String>,
    pub identity_seed: Option<i64>,
    pub identity_increment: Option<i64>,
}

impl ColumnRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: text(row, "name")?,
            type_schema: opt_text(row, "type_schema")?,
            type_name: text(row, "type_name")?,
            base_type_name: opt_text(row, "base_type_name")?,
            is_user_defined: flag(row, "is_user_defined")?,
            max_length: opt_int(row, "max_length")?,
            precision: opt_int(row, "precision")?,
            scale: opt_int(row, "scale")?,
            collation_name: opt_text(row, "collation_name")?,
            is_nullable: flag(row, "is_nullable")?,
            default_definition: opt_text(row, "default_definition")?,
            computed_definition: opt_text(row, "computed_definition")?,
            identity_seed: opt_bigint(row, "identity_seed")?,
            identity_increment: opt_bigint(row, "identity_increment")?,
        })
    }
}

/// One column of a primary key or unique constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumnRow {
    pub key_name: String,
    /// `PK` or `UQ`
    pub key_type: String,
    pub column_name: String,
    pub is_disabled: bool,
}

impl KeyColumnRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            key_name: text(row, "key_name")?,
            key_type: text(row, "key_type")?,
            column_name: text(row, "column_name")?,
            is_disabled: flag(row, "is_disabled")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnRow {
    pub index_name: String,
    pub is_unique: bool,
    pub is_disabled: bool,
    pub column_name: String,
    pub is_descending: bool,
    pub is_included: bool,
}

impl IndexColumnRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            index_name: text(row, "index_name")?,
            is_unique: flag(row, "is_unique")?,
            is_disabled: flag(row, "is_disabled")?,
            column_name: text(row, "column_name")?,
            is_descending: flag(row, "is_descending_key")?,
            is_included: flag(row, "is_included_column")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyColumnRow {
    pub key_name: String,
    pub child_object_id: i32,
    pub child_schema: String,
    pub child_table: String,
    pub parent_object_id: i32,
    pub parent_schema: String,
    pub parent_table: String,
    pub parent_key_name: String,
    pub column_name: String,
    pub delete_action: i32,
    pub update_action: i32,
    pub is_disabled: bool,
}

impl ForeignKeyColumnRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            key_name: text(row, "key_name")?,
            child_object_id: int(row, "child_object_id")?,
            child_schema: text(row, "child_schema")?,
            child_table: text(row, "child_table")?,
            parent_object_id: int(row, "parent_object_id")?,
            parent_schema: text(row, "parent_schema")?,
            parent_table: text(row, "parent_table")?,
            parent_key_name: text(row, "parent_key_name")?,
            column_name: text(row, "column_name")?,
            delete_action: int(row, "delete_action")?,
            update_action: int(row, "update_action")?,
            is_disabled: flag(row, "is_disabled")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRow {
    pub name: String,
    pub definition: String,
    pub is_disabled: bool,
}

impl CheckRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: text(row, "name")?,
            definition: text(row, "definition")?,
            is_disabled: flag(row, "is_disabled")?,
        })
    }
}

/// One event of a trigger; triggers firing on several events span several rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRow {
    pub name: String,
    pub definition: String,
    pub is_instead_of: bool,
    pub is_disabled: bool,
    pub event_name: String,
}

impl TriggerRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: text(row, "name")?,
            definition: text(row, "definition")?,
            is_instead_of: flag(row, "is_instead_of_trigger")?,
            is_disabled: flag(row, "is_disabled")?,
            event_name: text(row, "event_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDefinitionRow {
    pub definition: String,
    pub is_materialized: bool,
}

impl ViewDefinitionRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            definition: text(row, "definition")?,
            is_materialized: flag(row, "is_materialized")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRow {
    pub schema_name: String,
    pub name: String,
    pub start_value: i64,
    pub increment: i64,
    pub minimum_value: Option<i64>,
    pub maximum_value: Option<i64>,
    pub is_cycling: bool,
    pub is_cached: bool,
    pub cache_size: Option<i32>,
}

impl SequenceRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            schema_name: text(row, "schema_name")?,
            name: text(row, "name")?,
            start_value: opt_bigint(row, "start_value")?.ok_or_else(|| missing("start_value"))?,
            increment: opt_bigint(row, "increment")?.ok_or_else(|| missing("increment"))?,
            minimum_value: opt_bigint(row, "minimum_value")?,
            maximum_value: opt_bigint(row, "maximum_value")?,
            is_cycling: flag(row, "is_cycling")?,
            is_cached: flag(row, "is_cached")?,
            cache_size: opt_int(row, "cache_size")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymRow {
    pub schema_name: String,
    pub name: String,
    pub base_object_name: String,
}

impl SynonymRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            schema_name: text(row, "schema_name")?,
            name: text(row, "name")?,
            base_object_name: text(row, "base_object_name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineRow {
    pub schema_name: String,
    pub name: String,
    pub object_type: String,
    /// `None` for encrypted modules
    pub definition: Option<String>,
}

impl RoutineRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            schema_name: text(row, "schema_name")?,
            name: text(row, "name")?,
            object_type: text(row, "object_type")?,
            definition: opt_text(row, "definition")?,
        })
    }
}

/// A comment on a table, view or one of their children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub kind: String,
    pub child_name: Option<String>,
    pub comment: Option<String>,
}

impl CommentRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            kind: text(row, "kind")?,
            child_name: opt_text(row, "child_name")?,
            comment: opt_text(row, "comment")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCommentRow {
    pub schema_name: String,
    pub name: String,
    pub comment: Option<String>,
}

impl ObjectCommentRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            schema_name: text(row, "schema_name")?,
            name: text(row, "name")?,
            comment: opt_text(row, "comment")?,
        })
    }
}

/// Decode every row with `decode`
pub fn decode_all<T>(rows: &[Row], decode: impl Fn(&Row) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(decode).collect()
}
