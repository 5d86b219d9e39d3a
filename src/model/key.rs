//! Keys - primary, unique and foreign
//!
//! A `RelationalKey` pairs the foreign key declared on a child table with the
//! primary or unique key it references on the parent table.

use super::column::Column;
use crate::identifier::Identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Primary,
    Unique,
    Foreign,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Primary => "primary",
            KeyType::Unique => "unique",
            KeyType::Foreign => "foreign",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action taken on child rows when the referenced parent row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

impl FromStr for ReferentialAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase().replace('_', " ");
        match normalized.as_str() {
            "NO ACTION" | "" => Ok(ReferentialAction::NoAction),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            _ => Err(Error::InvalidArgument(format!("Unknown referential action: {}", s))),
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A key over one or more columns of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseKey {
    /// Constraint name; engines like SQLite allow anonymous keys
    pub name: Option<Identifier>,
    pub key_type: KeyType,
    pub columns: Vec<Column>,
    pub is_enabled: bool,
}

impl DatabaseKey {
    pub fn new(name: Option<Identifier>, key_type: KeyType, columns: Vec<Column>, is_enabled: bool) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "{} key must have at least one column",
                key_type
            )));
        }
        Ok(Self {
            name,
            key_type,
            columns,
            is_enabled,
        })
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether the key covers exactly these column names, in order (case-insensitive)
    pub fn has_columns(&self, names: &[&str]) -> bool {
        self.columns.len() == names.len()
            && self
                .columns
                .iter()
                .zip(names)
                .all(|(c, n)| c.name.eq_ignore_ascii_case(n))
    }
}

/// A foreign key together with the key it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalKey {
    pub child_table: Identifier,
    pub child_key: DatabaseKey,
    pub parent_table: Identifier,
    pub parent_key: DatabaseKey,
    pub delete_action: ReferentialAction,
    pub update_action: ReferentialAction,
}

impl RelationalKey {
    pub fn new(
        child_table: Identifier,
        child_key: DatabaseKey,
        parent_table: Identifier,
        parent_key: DatabaseKey,
        delete_action: ReferentialAction,
        update_action: ReferentialAction,
    ) -> Result<Self> {
        if child_key.key_type != KeyType::Foreign {
            return Err(Error::InvalidArgument(format!(
                "child key of {} must be a foreign key, found {}",
                child_table, child_key.key_type
            )));
        }
        if parent_key.key_type == KeyType::Foreign {
            return Err(Error::InvalidArgument(format!(
                "parent key of {} must be a primary or unique key",
                parent_table
            )));
        }
        Ok(Self {
            child_table,
            child_key,
            parent_table,
            parent_key,
            delete_action,
            update_action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{DataType, DbType};

    fn column(name: &str) -> Column {
        let ty = DbType::new(Identifier::new("int").unwrap(), DataType::Integer, "int").unwrap();
        Column::new(name, ty, false).unwrap()
    }

    #[test]
    fn test_key_requires_columns() {
        assert!(DatabaseKey::new(None, KeyType::Primary, vec![], true).is_err());
    }

    #[test]
    fn test_has_columns() {
        let key = DatabaseKey::new(None, KeyType::Unique, vec![column("a"), column("B")], true).unwrap();
        assert!(key.has_columns(&["A", "b"]));
        assert!(!key.has_columns(&["b", "a"]));
        assert!(!key.has_columns(&["a"]));
    }

    #[test]
    fn test_relational_key_guards() {
        let child = DatabaseKey::new(None, KeyType::Foreign, vec![column("parent_id")], true).unwrap();
        let parent = DatabaseKey::new(None, KeyType::Primary, vec![column("id")], true).unwrap();
        let child_table = Identifier::new("child").unwrap();
        let parent_table = Identifier::new("parent").unwrap();

        assert!(RelationalKey::new(
            child_table.clone(),
            parent.clone(),
            parent_table.clone(),
            parent.clone(),
            ReferentialAction::NoAction,
            ReferentialAction::NoAction,
        )
        .is_err());

        assert!(RelationalKey::new(
            child_table.clone(),
            child.clone(),
            parent_table.clone(),
            child.clone(),
            ReferentialAction::NoAction,
            ReferentialAction::NoAction,
        )
        .is_err());

        let key = RelationalKey::new(
            child_table,
            child,
            parent_table,
            parent,
            ReferentialAction::Cascade,
            ReferentialAction::NoAction,
        )
        .unwrap();
        assert_eq!(key.delete_action, ReferentialAction::Cascade);
    }

    #[test]
    fn test_referential_action_parse() {
        assert_eq!(ReferentialAction::from_str("SET NULL").unwrap(), ReferentialAction::SetNull);
        assert_eq!(ReferentialAction::from_str("set_default").unwrap(), ReferentialAction::SetDefault);
        assert_eq!(ReferentialAction::from_str("NO ACTION").unwrap(), ReferentialAction::NoAction);
        assert!(ReferentialAction::from_str("EXPLODE").is_err());
    }
}
