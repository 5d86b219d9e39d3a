//! SQL Server dialect: bracket quoting, catalog type mapping, expression comparison

use crate::dialect::{db_type, normalize_expression, DatabaseDialect};
use crate::model::{DataType, DbType, TypeRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    pub fn new() -> Self {
        Self
    }

    /// Portable family of a system type name
    pub fn data_type(type_name: &str, max_length: Option<i32>) -> DataType {
        let unbounded = max_length == Some(-1);
        match type_name.to_ascii_lowercase().as_str() {
            "bigint" => DataType::BigInteger,
            "int" => DataType::Integer,
            "smallint" | "tinyint" => DataType::SmallInteger,
            "bit" => DataType::Boolean,
            "decimal" | "numeric" | "money" | "smallmoney" => DataType::Numeric,
            "float" | "real" => DataType::Float,
            "date" => DataType::Date,
            "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => DataType::DateTime,
            "time" => DataType::Time,
            "char" => DataType::String,
            "varchar" if unbounded => DataType::Text,
            "varchar" => DataType::String,
            "text" => DataType::Text,
            "nchar" => DataType::Unicode,
            "nvarchar" if unbounded => DataType::UnicodeText,
            "nvarchar" => DataType::Unicode,
            "ntext" | "xml" => DataType::UnicodeText,
            "binary" | "timestamp" | "rowversion" => DataType::Binary,
            "varbinary" if unbounded => DataType::LargeBinary,
            "varbinary" => DataType::Binary,
            "image" => DataType::LargeBinary,
            "uniqueidentifier" => DataType::Uuid,
            _ => DataType::Unknown,
        }
    }

    /// Strip parentheses that wrap an entire expression, as SQL Server stores defaults: `((0))` is `0`
    pub fn strip_wrapping_parens(expression: &str) -> &str {
        let mut current = expression.trim();
        while current.starts_with('(') && current.ends_with(')') && wraps_whole(current) {
            current = current[1..current.len() - 1].trim();
        }
        current
    }
}

/// Whether the opening parenthesis at index 0 closes at the final character
fn wraps_whole(expression: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let last = expression.len() - 1;

    for (i, ch) in expression.char_indices() {
        if let Some(closing) = quote {
            if ch == closing {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' => quote = Some('\''),
            '[' => quote = Some(']'),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == last;
                }
            }
            _ => {}
        }
    }
    false
}

impl DatabaseDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn is_reserved_keyword(&self, word: &str) -> bool {
        let upper = word.to_ascii_uppercase();
        KEYWORDS.binary_search(&upper.as_str()).is_ok()
    }

    fn type_for(&self, request: &TypeRequest) -> DbType {
        let name = request.type_name.local_name().to_ascii_lowercase();
        let data_type = Self::data_type(&name, request.max_length);

        let is_unicode = matches!(name.as_str(), "nchar" | "nvarchar");
        let has_length = matches!(
            name.as_str(),
            "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary"
        );
        let length = match request.max_length {
            Some(-1) => Some(-1),
            Some(bytes) if is_unicode => Some(bytes / 2),
            other => other,
        };

        let definition = match (name.as_str(), length, request.precision) {
            (_, Some(-1), _) if has_length => format!("{}(max)", name),
            (_, Some(length), _) if has_length => format!("{}({})", name, length),
            ("decimal" | "numeric", _, Some(p)) => format!("{}({}, {})", name, p.precision, p.scale),
            ("datetime2" | "datetimeoffset" | "time", _, Some(p)) => format!("{}({})", name, p.scale),
            _ => name.clone(),
        };

        let mut ty = db_type(
            request,
            data_type,
            definition,
            matches!(name.as_str(), "char" | "nchar" | "binary"),
        );
        ty.max_length = if has_length { length } else { None };
        ty
    }

    fn expressions_equal(&self, left: &str, right: &str) -> bool {
        normalize_expression(Self::strip_wrapping_parens(left))
            == normalize_expression(Self::strip_wrapping_parens(right))
    }
}

/// Transact-SQL reserved keywords, sorted for binary search
const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUTHORIZATION", "BACKUP", "BEGIN",
    "BETWEEN", "BREAK", "BROWSE", "BULK", "BY", "CASCADE", "CASE", "CHECK", "CHECKPOINT",
    "CLOSE", "CLUSTERED", "COALESCE", "COLLATE", "COLUMN", "COMMIT", "COMPUTE", "CONSTRAINT",
    "CONTAINS", "CONTAINSTABLE", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CURRENT",
    "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE",
    "DBCC", "DEALLOCATE", "DECLARE", "DEFAULT", "DELETE", "DENY", "DESC", "DISK", "DISTINCT",
    "DISTRIBUTED", "DOUBLE", "DROP", "DUMP", "ELSE", "END", "ERRLVL", "ESCAPE", "EXCEPT", "EXEC",
    "EXECUTE", "EXISTS", "EXIT", "EXTERNAL", "FETCH", "FILE", "FILLFACTOR", "FOR", "FOREIGN",
    "FREETEXT", "FREETEXTTABLE", "FROM", "FULL", "FUNCTION", "GOTO", "GRANT", "GROUP", "HAVING",
    "HOLDLOCK", "IDENTITY", "IDENTITYCOL", "IDENTITY_INSERT", "IF", "IN", "INDEX", "INNER",
    "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "KILL", "LEFT", "LIKE", "LINENO", "LOAD",
    "MERGE", "NATIONAL", "NOCHECK", "NONCLUSTERED", "NOT", "NULL", "NULLIF", "OF", "OFF",
    "OFFSETS", "ON", "OPEN", "OPENDATASOURCE", "OPENQUERY", "OPENROWSET", "OPENXML", "OPTION",
    "OR", "ORDER", "OUTER", "OVER", "PERCENT", "PIVOT", "PLAN", "PRECISION", "PRIMARY", "PRINT",
    "PROC", "PROCEDURE", "PUBLIC", "RAISERROR", "READ", "READTEXT", "RECONFIGURE", "REFERENCES",
    "REPLICATION", "RESTORE", "RESTRICT", "RETURN", "REVERT", "REVOKE", "RIGHT", "ROLLBACK",
    "ROWCOUNT", "ROWGUIDCOL", "RULE", "SAVE", "SCHEMA", "SECURITYAUDIT", "SELECT",
    "SEMANTICKEYPHRASETABLE", "SEMANTICSIMILARITYDETAILSTABLE", "SEMANTICSIMILARITYTABLE",
    "SESSION_USER", "SET", "SETUSER", "SHUTDOWN", "SOME", "STATISTICS", "SYSTEM_USER", "TABLE",
    "TABLESAMPLE", "TEXTSIZE", "THEN", "TO", "TOP", "TRAN", "TRANSACTION", "TRIGGER", "TRUNCATE",
    "TRY_CONVERT", "TSEQUAL", "UNION", "UNIQUE", "UNPIVOT", "UPDATE", "UPDATETEXT", "USE", "USER",
    "VALUES", "VARYING", "VIEW", "WAITFOR", "WHEN", "WHERE", "WHILE", "WITH",
    "WRITETEXT",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::model::NumericPrecision;

    fn request(name: &str) -> TypeRequest {
        TypeRequest::new(Identifier::new(name).unwrap())
    }

    #[test]
    fn test_keywords_sorted() {
        assert!(KEYWORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unicode_lengths_are_halved() {
        let dialect = SqlServerDialect::new();
        let ty = dialect.type_for(&request("nvarchar").with_max_length(Some(100)));
        assert_eq!(ty.max_length, Some(50));
        assert_eq!(ty.definition, "nvarchar(50)");
        assert_eq!(ty.data_type, DataType::Unicode);
        assert!(!ty.is_fixed_length);

        let ty = dialect.type_for(&request("nvarchar").with_max_length(Some(-1)));
        assert!(ty.is_unbounded());
        assert_eq!(ty.definition, "nvarchar(max)");
        assert_eq!(ty.data_type, DataType::UnicodeText);

        let ty = dialect.type_for(&request("char").with_max_length(Some(10)));
        assert!(ty.is_fixed_length);
        assert_eq!(ty.definition, "char(10)");
    }

    #[test]
    fn test_numeric_and_temporal_definitions() {
        let dialect = SqlServerDialect::new();
        let ty = dialect.type_for(
            &request("decimal")
                .with_max_length(Some(9))
                .with_precision(Some(NumericPrecision::new(18, 2).unwrap())),
        );
        assert_eq!(ty.definition, "decimal(18, 2)");
        assert_eq!(ty.max_length, None);
        assert_eq!(ty.data_type, DataType::Numeric);

        let ty = dialect.type_for(&request("datetime2").with_precision(Some(NumericPrecision::new(27, 7).unwrap())));
        assert_eq!(ty.definition, "datetime2(7)");
        assert_eq!(ty.data_type, DataType::DateTime);

        assert_eq!(dialect.type_for(&request("geography")).data_type, DataType::Unknown);
    }

    #[test]
    fn test_expression_comparison() {
        let dialect = SqlServerDialect::new();
        assert!(dialect.expressions_equal("((0))", "0"));
        assert!(dialect.expressions_equal("(getdate())", "getdate()"));
        assert!(!dialect.expressions_equal("(a) + (b)", "a + b"));
        assert!(dialect.expressions_equal("('(x')", "'(x'"));
        assert_eq!(SqlServerDialect::strip_wrapping_parens("(a) + (b)"), "(a) + (b)");
    }

    #[test]
    fn test_quoting() {
        let dialect = SqlServerDialect::new();
        assert_eq!(dialect.quote_identifier("odd]name"), "[odd]]name]");
        let name = Identifier::parse("sales.dbo.orders").unwrap();
        assert_eq!(dialect.quote_name(&name), "[sales].[dbo].[orders]");
        assert!(dialect.is_reserved_keyword("Select"));
        assert!(!dialect.is_reserved_keyword("orders"));
    }
}
