//! Column data types
//!
//! Engines report type names; dialects map them onto the portable `DataType`
//! families below and keep the engine's own spelling in `DbType::definition`.

use crate::identifier::Identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Portable data type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Unknown,
    BigInteger,
    Binary,
    LargeBinary,
    Boolean,
    Date,
    DateTime,
    Float,
    Integer,
    Interval,
    Numeric,
    SmallInteger,
    String,
    Text,
    Time,
    Unicode,
    UnicodeText,
    Uuid,
}

impl DataType {
    /// Get the string representation of the data type
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::BigInteger => "big_integer",
            DataType::Binary => "binary",
            DataType::LargeBinary => "large_binary",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::DateTime => "date_time",
            DataType::Float => "float",
            DataType::Integer => "integer",
            DataType::Interval => "interval",
            DataType::Numeric => "numeric",
            DataType::SmallInteger => "small_integer",
            DataType::String => "string",
            DataType::Text => "text",
            DataType::Time => "time",
            DataType::Unicode => "unicode",
            DataType::UnicodeText => "unicode_text",
            DataType::Uuid => "uuid",
        }
    }

    /// Whether values of this type are character data
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            DataType::String | DataType::Text | DataType::Unicode | DataType::UnicodeText
        )
    }

    /// Whether values of this type are numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::BigInteger
                | DataType::Integer
                | DataType::SmallInteger
                | DataType::Numeric
                | DataType::Float
        )
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace(['_', '-', ' '], "");
        match normalized.as_str() {
            "unknown" => Ok(DataType::Unknown),
            "biginteger" | "bigint" => Ok(DataType::BigInteger),
            "binary" => Ok(DataType::Binary),
            "largebinary" | "blob" => Ok(DataType::LargeBinary),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "datetime" | "timestamp" => Ok(DataType::DateTime),
            "float" | "real" | "double" => Ok(DataType::Float),
            "integer" | "int" => Ok(DataType::Integer),
            "interval" => Ok(DataType::Interval),
            "numeric" | "decimal" => Ok(DataType::Numeric),
            "smallinteger" | "smallint" => Ok(DataType::SmallInteger),
            "string" => Ok(DataType::String),
            "text" => Ok(DataType::Text),
            "time" => Ok(DataType::Time),
            "unicode" => Ok(DataType::Unicode),
            "unicodetext" => Ok(DataType::UnicodeText),
            "uuid" | "guid" => Ok(DataType::Uuid),
            _ => Err(Error::InvalidArgument(format!("Unknown data type: {}", s))),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Precision and scale of an exact numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumericPrecision {
    pub precision: i32,
    pub scale: i32,
}

impl NumericPrecision {
    pub fn new(precision: i32, scale: i32) -> Result<Self> {
        if precision < 0 || scale < 0 {
            return Err(Error::InvalidArgument(format!(
                "numeric precision ({}, {}) must not be negative",
                precision, scale
            )));
        }
        Ok(Self { precision, scale })
    }
}

/// What a catalog says about a column's type, before dialect mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRequest {
    pub type_name: Identifier,
    /// Declared length; `Some(-1)` means unbounded (`max`)
    pub max_length: Option<i32>,
    pub precision: Option<NumericPrecision>,
    pub collation: Option<Identifier>,
}

impl TypeRequest {
    pub fn new(type_name: Identifier) -> Self {
        Self {
            type_name,
            max_length: None,
            precision: None,
            collation: None,
        }
    }

    pub fn with_max_length(mut self, max_length: Option<i32>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_precision(mut self, precision: Option<NumericPrecision>) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_collation(mut self, collation: Option<Identifier>) -> Self {
        self.collation = collation;
        self
    }
}

/// A column type as modelled by a dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbType {
    /// Engine type name (may be schema-qualified for user types)
    pub type_name: Identifier,
    pub data_type: DataType,
    /// SQL text declaring the type, e.g. `nvarchar(50)`
    pub definition: String,
    pub is_fixed_length: bool,
    /// Maximum length in characters or bytes; `-1` for unbounded
    pub max_length: Option<i32>,
    pub numeric_precision: Option<NumericPrecision>,
    pub collation: Option<Identifier>,
}

impl DbType {
    pub fn new(type_name: Identifier, data_type: DataType, definition: impl Into<String>) -> Result<Self> {
        Ok(Self {
            type_name,
            data_type,
            definition: super::require_text("type definition", definition.into())?,
            is_fixed_length: false,
            max_length: None,
            numeric_precision: None,
            collation: None,
        })
    }

    /// Whether the type has no length limit
    pub fn is_unbounded(&self) -> bool {
        self.max_length == Some(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_from_str() {
        assert_eq!(DataType::from_str("BigInteger").unwrap(), DataType::BigInteger);
        assert_eq!(DataType::from_str("unicode_text").unwrap(), DataType::UnicodeText);
        assert_eq!(DataType::from_str("GUID").unwrap(), DataType::Uuid);
        assert!(DataType::from_str("spaceship").is_err());
    }

    #[test]
    fn test_data_type_families() {
        assert!(DataType::Unicode.is_textual());
        assert!(!DataType::Uuid.is_textual());
        assert!(DataType::Numeric.is_numeric());
        assert!(!DataType::Boolean.is_numeric());
    }

    #[test]
    fn test_db_type_guards() {
        let name = Identifier::new("int").unwrap();
        assert!(DbType::new(name.clone(), DataType::Integer, "").is_err());

        let ty = DbType::new(name, DataType::Integer, "int").unwrap();
        assert!(!ty.is_unbounded());
        assert!(NumericPrecision::new(-1, 0).is_err());
    }
}
