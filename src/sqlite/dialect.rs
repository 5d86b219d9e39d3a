//! SQLite dialect: double-quote quoting and type affinity

use crate::dialect::{db_type, DatabaseDialect};
use crate::identifier::Identifier;
use crate::model::{DataType, DbType, NumericPrecision, TypeRequest};
use crate::Result;

/// Type name reported for columns declared without a type
pub const UNTYPED_COLUMN_TYPE: &str = "BLOB";

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }

    /// Column affinity of a declared type, following SQLite's rules in order
    pub fn affinity(type_name: &str) -> DataType {
        let upper = type_name.to_ascii_uppercase();
        if upper.contains("INT") {
            DataType::BigInteger
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            DataType::UnicodeText
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            DataType::LargeBinary
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            DataType::Float
        } else {
            DataType::Numeric
        }
    }

    /// Split a declared type such as `VARCHAR(20)` or `DECIMAL(10, 2)` into a request
    pub fn parse_declared_type(declared: &str) -> Result<TypeRequest> {
        let declared = declared.trim();
        let (name, arguments) = match declared.find('(') {
            Some(open) => {
                let close = declared.rfind(')').filter(|&c| c > open).unwrap_or(declared.len());
                (declared[..open].trim(), Some(&declared[open + 1..close]))
            }
            None => (declared, None),
        };

        let name = if name.is_empty() { UNTYPED_COLUMN_TYPE } else { name };
        let mut request = TypeRequest::new(Identifier::new(name)?);

        let numbers: Vec<i32> = arguments
            .map(|args| {
                args.split(',')
                    .map(|a| a.trim().trim_start_matches('+').parse::<i32>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        match (Self::affinity(name), numbers.as_slice()) {
            (DataType::UnicodeText | DataType::LargeBinary, [length]) => {
                request = request.with_max_length(Some(*length));
            }
            (_, [precision]) => {
                request = request.with_precision(NumericPrecision::new(*precision, 0).ok());
            }
            (_, [precision, scale]) => {
                request = request.with_precision(NumericPrecision::new(*precision, *scale).ok());
            }
            _ => {}
        }

        Ok(request)
    }
}

impl DatabaseDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn is_reserved_keyword(&self, word: &str) -> bool {
        let upper = word.to_ascii_uppercase();
        KEYWORDS.binary_search(&upper.as_str()).is_ok()
    }

    fn type_for(&self, request: &TypeRequest) -> DbType {
        let name = request.type_name.local_name();
        let data_type = Self::affinity(name);

        let definition = match (request.max_length, request.precision) {
            (_, Some(p)) if p.scale > 0 => format!("{}({}, {})", name, p.precision, p.scale),
            (_, Some(p)) => format!("{}({})", name, p.precision),
            (Some(length), None) if length > 0 => format!("{}({})", name, length),
            _ => name.to_string(),
        };

        db_type(request, data_type, definition, false)
    }
}

/// SQLite keywords, sorted for binary search
const KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN", "WHERE",
    "WINDOW", "WITH", "WITHOUT",
];
