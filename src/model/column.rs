//! Table and view columns

use super::types::DbType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Identity / autoincrement behaviour of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoIncrement {
    pub initial_value: i64,
    pub increment: i64,
}

impl AutoIncrement {
    pub fn new(initial_value: i64, increment: i64) -> Result<Self> {
        if increment == 0 {
            return Err(Error::InvalidArgument(
                "autoincrement step must not be zero".to_string(),
            ));
        }
        Ok(Self {
            initial_value,
            increment,
        })
    }
}

impl Default for AutoIncrement {
    fn default() -> Self {
        Self {
            initial_value: 1,
            increment: 1,
        }
    }
}

/// A column of a table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub db_type: DbType,
    pub is_nullable: bool,
    /// Default expression as stored by the engine
    pub default_value: Option<String>,
    /// Expression of a computed / generated column
    pub computed_definition: Option<String>,
    pub auto_increment: Option<AutoIncrement>,
}

impl Column {
    pub fn new(name: impl Into<String>, db_type: DbType, is_nullable: bool) -> Result<Self> {
        Ok(Self {
            name: super::require_text("column name", name.into())?,
            db_type,
            is_nullable,
            default_value: None,
            computed_definition: None,
            auto_increment: None,
        })
    }

    pub fn with_default(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_computed_definition(mut self, definition: Option<String>) -> Self {
        self.computed_definition = definition.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: Option<AutoIncrement>) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn is_computed(&self) -> bool {
        self.computed_definition.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::model::types::DataType;

    fn int_type() -> DbType {
        DbType::new(Identifier::new("int").unwrap(), DataType::Integer, "int").unwrap()
    }

    #[test]
    fn test_column_guards() {
        assert!(Column::new("", int_type(), true).is_err());
        assert!(Column::new(" ", int_type(), true).is_err());
        assert!(AutoIncrement::new(1, 0).is_err());
    }

    #[test]
    fn test_computed_column() {
        let col = Column::new("total", int_type(), true)
            .unwrap()
            .with_computed_definition(Some("([qty]*[price])".to_string()))
            .with_default(Some("   ".to_string()));
        assert!(col.is_computed());
        assert_eq!(col.default_value, None);
    }
}
