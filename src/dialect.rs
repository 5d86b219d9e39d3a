//! Dialect - Engine-specific quoting, type mapping and expression comparison
//!
//! Each supported engine provides one `DatabaseDialect`:
//! - `sqlite::SqliteDialect`
//! - `sqlserver::SqlServerDialect`

use crate::identifier::Identifier;
use crate::model::{DbType, TypeRequest};

/// Engine-specific strategy for quoting, type mapping and comparisons.
pub trait DatabaseDialect: Send + Sync {
    /// Short engine name, e.g. `sqlite`
    fn name(&self) -> &'static str;

    /// Quote a single name part, escaping embedded quote characters
    fn quote_identifier(&self, name: &str) -> String;

    /// Quote every present part of an identifier, dot-joined
    fn quote_name(&self, name: &Identifier) -> String {
        name.parts()
            .into_iter()
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Whether `word` is reserved and must be quoted (case-insensitive)
    fn is_reserved_keyword(&self, word: &str) -> bool;

    /// Map a catalog type description onto a `DbType`
    fn type_for(&self, request: &TypeRequest) -> DbType;

    /// Whether two SQL expressions stored by the engine mean the same thing
    fn expressions_equal(&self, left: &str, right: &str) -> bool {
        normalize_expression(left) == normalize_expression(right)
    }
}

/// Collapse runs of whitespace outside string literals and quoted names.
pub fn normalize_expression(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for ch in expression.trim().chars() {
        match quote {
            Some(closing) => {
                out.push(ch);
                if ch == closing {
                    quote = None;
                }
            }
            None => {
                if ch.is_whitespace() {
                    pending_space = true;
                    continue;
                }
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                quote = match ch {
                    '\'' => Some('\''),
                    '"' => Some('"'),
                    '[' => Some(']'),
                    '`' => Some('`'),
                    _ => None,
                };
                out.push(ch);
            }
        }
    }

    out
}

/// Build a `DbType` directly; dialects always supply a non-empty definition.
pub(crate) fn db_type(request: &TypeRequest, data_type: crate::model::DataType, definition: String, is_fixed_length: bool) -> DbType {
    DbType {
        type_name: request.type_name.clone(),
        data_type,
        definition,
        is_fixed_length,
        max_length: request.max_length,
        numeric_precision: request.precision,
        collation: request.collation.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_expression() {
        assert_eq!(normalize_expression("  a   +\n b "), "a + b");
        assert_eq!(normalize_expression("'a   b'  ||  c"), "'a   b' || c");
        assert_eq!(normalize_expression("[my   col] > 0"), "[my   col] > 0");
    }
}
