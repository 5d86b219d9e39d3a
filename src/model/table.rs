//! Tables

use super::check::Check;
use super::column::Column;
use super::index::Index;
use super::key::{DatabaseKey, RelationalKey};
use super::trigger::Trigger;
use crate::identifier::Identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A base table and everything attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: Identifier,
    pub columns: Vec<Column>,
    pub primary_key: Option<DatabaseKey>,
    pub unique_keys: Vec<DatabaseKey>,
    /// Foreign keys declared on this table
    pub parent_keys: Vec<RelationalKey>,
    /// Foreign keys on other tables that reference this one
    pub child_keys: Vec<RelationalKey>,
    pub indexes: Vec<Index>,
    pub checks: Vec<Check>,
    pub triggers: Vec<Trigger>,
}

impl Table {
    pub fn new(name: Identifier, columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidArgument(format!("table {} has no columns", name)));
        }
        Ok(Self {
            name,
            columns,
            primary_key: None,
            unique_keys: Vec::new(),
            parent_keys: Vec::new(),
            child_keys: Vec::new(),
            indexes: Vec::new(),
            checks: Vec::new(),
            triggers: Vec::new(),
        })
    }

    /// Find a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Find an index by local name (case-insensitive)
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|i| i.name.local_name().eq_ignore_ascii_case(name))
    }

    /// Every primary and unique key, primary first
    pub fn candidate_keys(&self) -> impl Iterator<Item = &DatabaseKey> {
        self.primary_key.iter().chain(self.unique_keys.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::key::KeyType;
    use crate::model::types::{DataType, DbType};

    fn column(name: &str) -> Column {
        let ty = DbType::new(Identifier::new("int").unwrap(), DataType::Integer, "int").unwrap();
        Column::new(name, ty, false).unwrap()
    }

    #[test]
    fn test_table_requires_columns() {
        assert!(Table::new(Identifier::new("empty").unwrap(), vec![]).is_err());
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = Table::new(Identifier::new("users").unwrap(), vec![column("Id"), column("email")]).unwrap();
        assert!(table.column("ID").is_some());
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_candidate_keys_primary_first() {
        let mut table = Table::new(Identifier::new("users").unwrap(), vec![column("id"), column("email")]).unwrap();
        table.unique_keys.push(DatabaseKey::new(None, KeyType::Unique, vec![column("email")], true).unwrap());
        table.primary_key = Some(DatabaseKey::new(None, KeyType::Primary, vec![column("id")], true).unwrap());

        let kinds: Vec<KeyType> = table.candidate_keys().map(|k| k.key_type).collect();
        assert_eq!(kinds, vec![KeyType::Primary, KeyType::Unique]);
    }
}
