//! Indexes

use super::column::Column;
use crate::identifier::Identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexColumnOrder {
    #[default]
    Ascending,
    Descending,
}

impl IndexColumnOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexColumnOrder::Ascending => "ASC",
            IndexColumnOrder::Descending => "DESC",
        }
    }
}

/// One key element of an index: a plain column or an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// SQL text of the indexed expression (a quoted column name for plain columns)
    pub expression: String,
    pub order: IndexColumnOrder,
    /// Table columns the expression reads
    pub dependent_columns: Vec<Column>,
}

impl IndexColumn {
    pub fn new(expression: impl Into<String>, order: IndexColumnOrder, dependent_columns: Vec<Column>) -> Result<Self> {
        Ok(Self {
            expression: super::require_text("index column expression", expression.into())?,
            order,
            dependent_columns,
        })
    }
}

/// A (non-constraint) index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: Identifier,
    pub is_unique: bool,
    pub columns: Vec<IndexColumn>,
    /// Non-key columns stored in the index leaf level
    pub included_columns: Vec<Column>,
    pub is_enabled: bool,
}

impl Index {
    pub fn new(
        name: Identifier,
        is_unique: bool,
        columns: Vec<IndexColumn>,
        included_columns: Vec<Column>,
        is_enabled: bool,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "index {} must have at least one key column",
                name
            )));
        }
        Ok(Self {
            name,
            is_unique,
            columns,
            included_columns,
            is_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_requires_columns() {
        let name = Identifier::new("ix_users_email").unwrap();
        assert!(Index::new(name.clone(), false, vec![], vec![], true).is_err());

        let col = IndexColumn::new("lower(email)", IndexColumnOrder::Descending, vec![]).unwrap();
        let index = Index::new(name, true, vec![col], vec![], true).unwrap();
        assert!(index.is_unique);
        assert_eq!(index.columns[0].order.as_str(), "DESC");
    }
}
