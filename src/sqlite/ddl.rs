//! CREATE statements kept in `sqlite_master`, read with `sqlparser`
//!
//! SQLite only exposes constraint names, CHECK expressions, AUTOINCREMENT,
//! column collations, trigger timing and index expressions through the
//! original CREATE statement, so those are recovered here.

use crate::model::{IndexColumnOrder, TriggerEvent, TriggerTiming};
use crate::{Error, Result};
use sqlparser::ast::{ColumnDef, ColumnOption, Ident, ObjectName, Statement, TableConstraint};
use sqlparser::dialect::{GenericDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::collections::BTreeSet;

/// Parse a single statement; SQLite syntax the SQLite dialect rejects (a
/// COLLATE after other column constraints) is retried with the generic one
fn parse_statement(sql: &str) -> Result<Statement> {
    let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) => statements,
        Err(err) => Parser::parse_sql(&GenericDialect {}, sql).map_err(|_| err)?,
    };
    statements
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("empty statement".to_string()))
}

/// Tokens of `sql` without whitespace and comments
fn significant_tokens(sql: &str) -> Result<Vec<Token>> {
    let tokens = Tokenizer::new(&SQLiteDialect {}, sql)
        .tokenize()
        .map_err(|e| Error::Parse(e.to_string()))?;
    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect())
}

fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
}

fn names(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|i| i.value.clone()).collect()
}

fn constraint_name(name: &Option<Ident>) -> Option<String> {
    name.as_ref().map(|n| n.value.clone())
}

/// Last part of a possibly schema-qualified name
fn local_name(name: &ObjectName) -> String {
    name.0.last().map(|i| i.value.clone()).unwrap_or_default()
}

/// A PRIMARY KEY or UNIQUE constraint as declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCheck {
    pub name: Option<String>,
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedColumn {
    pub name: String,
    pub collation: Option<String>,
    pub is_autoincrement: bool,
    /// Expression of a generated column
    pub generated: Option<String>,
}

/// What a CREATE TABLE statement declares beyond the pragmas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub columns: Vec<ParsedColumn>,
    pub primary_key: Option<ParsedKey>,
    pub unique_keys: Vec<ParsedKey>,
    pub foreign_keys: Vec<ParsedForeignKey>,
    pub checks: Vec<ParsedCheck>,
}

fn same_names<S: AsRef<str>>(left: &[String], right: &[S]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| l.eq_ignore_ascii_case(r.as_ref()))
}

impl ParsedTable {
    pub fn column(&self, name: &str) -> Option<&ParsedColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Name of the UNIQUE constraint over exactly these columns
    pub fn unique_key_name<S: AsRef<str>>(&self, columns: &[S]) -> Option<&str> {
        self.unique_keys
            .iter()
            .find(|k| same_names(&k.columns, columns))
            .and_then(|k| k.name.as_deref())
    }

    /// Name of the foreign key over these columns referencing `parent_table`
    pub fn foreign_key_name<S: AsRef<str>>(&self, columns: &[S], parent_table: &str) -> Option<&str> {
        self.foreign_keys
            .iter()
            .find(|k| k.parent_table.eq_ignore_ascii_case(parent_table) && same_names(&k.columns, columns))
            .and_then(|k| k.name.as_deref())
    }

    fn add_column(&mut self, column: &ColumnDef) {
        let name = column.name.value.clone();
        let mut parsed = ParsedColumn {
            name: name.clone(),
            collation: column.collation.as_ref().map(local_name),
            ..Default::default()
        };

        for option in &column.options {
            let constraint = constraint_name(&option.name);
            match &option.option {
                ColumnOption::Unique { is_primary: true, .. } => {
                    self.primary_key = Some(ParsedKey {
                        name: constraint,
                        columns: vec![name.clone()],
                    });
                }
                ColumnOption::Unique { is_primary: false, .. } => self.unique_keys.push(ParsedKey {
                    name: constraint,
                    columns: vec![name.clone()],
                }),
                ColumnOption::Check(expr) => self.checks.push(ParsedCheck {
                    name: constraint,
                    definition: expr.to_string(),
                }),
                ColumnOption::ForeignKey {
                    foreign_table,
                    referred_columns,
                    ..
                } => self.foreign_keys.push(ParsedForeignKey {
                    name: constraint,
                    columns: vec![name.clone()],
                    parent_table: local_name(foreign_table),
                    parent_columns: names(referred_columns),
                }),
                ColumnOption::Generated {
                    generation_expr: Some(expr),
                    ..
                } => parsed.generated = Some(expr.to_string()),
                ColumnOption::DialectSpecific(tokens) if tokens.iter().any(|t| is_keyword(t, "AUTOINCREMENT")) => {
                    parsed.is_autoincrement = true;
                }
                _ => {}
            }
        }

        self.columns.push(parsed);
    }

    fn add_constraint(&mut self, constraint: &TableConstraint) {
        match constraint {
            TableConstraint::PrimaryKey { name, columns, .. } => {
                self.primary_key = Some(ParsedKey {
                    name: constraint_name(name),
                    columns: names(columns),
                });
            }
            TableConstraint::Unique { name, columns, .. } => self.unique_keys.push(ParsedKey {
                name: constraint_name(name),
                columns: names(columns),
            }),
            TableConstraint::Check { name, expr, .. } => self.checks.push(ParsedCheck {
                name: constraint_name(name),
                definition: expr.to_string(),
            }),
            TableConstraint::ForeignKey {
                name,
                columns,
                foreign_table,
                referred_columns,
                ..
            } => self.foreign_keys.push(ParsedForeignKey {
                name: constraint_name(name),
                columns: names(columns),
                parent_table: local_name(foreign_table),
                parent_columns: names(referred_columns),
            }),
            _ => {}
        }
    }
}

/// Parse a `CREATE TABLE` statement.
///
/// Virtual tables and `CREATE TABLE ... AS SELECT` declare nothing beyond
/// their columns and yield an empty result.
pub fn parse_create_table(sql: &str) -> Result<ParsedTable> {
    // Module arguments of virtual tables are free-form
    if significant_tokens(sql)?.get(1).is_some_and(|t| is_keyword(t, "VIRTUAL")) {
        return Ok(ParsedTable::default());
    }

    let Statement::CreateTable(create) = parse_statement(sql)? else {
        return Err(Error::Parse("not a CREATE TABLE statement".to_string()));
    };

    let mut table = ParsedTable::default();
    for column in &create.columns {
        table.add_column(column);
    }
    for constraint in &create.constraints {
        table.add_constraint(constraint);
    }
    Ok(table)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndexColumn {
    pub expression: String,
    pub order: IndexColumnOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndex {
    pub columns: Vec<ParsedIndexColumn>,
}

/// Parse a `CREATE INDEX` statement.
pub fn parse_create_index(sql: &str) -> Result<ParsedIndex> {
    let Statement::CreateIndex(index) = parse_statement(sql)? else {
        return Err(Error::Parse("not a CREATE INDEX statement".to_string()));
    };

    let columns = index
        .columns
        .iter()
        .map(|column| ParsedIndexColumn {
            expression: column.expr.to_string(),
            order: match column.asc {
                Some(false) => IndexColumnOrder::Descending,
                _ => IndexColumnOrder::Ascending,
            },
        })
        .collect();
    Ok(ParsedIndex { columns })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTrigger {
    pub timing: TriggerTiming,
    pub events: BTreeSet<TriggerEvent>,
    pub table: String,
}

/// Walks the header of a statement the parser has no grammar for.
struct Header {
    tokens: Vec<Token>,
    pos: usize,
}

impl Header {
    fn new(sql: &str) -> Result<Self> {
        Ok(Self {
            tokens: significant_tokens(sql)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).filter(|t| **t != Token::EOF)
    }

    fn eat(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| is_keyword(t, keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, keyword: &str) -> Result<()> {
        if self.eat(keyword) {
            return Ok(());
        }
        Err(Error::Parse(format!(
            "expected {} but found {}",
            keyword,
            self.peek().map_or("end of statement".to_string(), ToString::to_string)
        )))
    }

    fn name(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Word(word)) => {
                let value = word.value.clone();
                self.pos += 1;
                Ok(value)
            }
            Some(Token::SingleQuotedString(value)) => {
                let value = value.clone();
                self.pos += 1;
                Ok(value)
            }
            other => Err(Error::Parse(format!(
                "expected a name but found {}",
                other.map_or("end of statement".to_string(), ToString::to_string)
            ))),
        }
    }

    /// `name` or `schema.name`; the schema part is dropped
    fn qualified_name(&mut self) -> Result<String> {
        let name = self.name()?;
        if self.peek() == Some(&Token::Period) {
            self.pos += 1;
            return self.name();
        }
        Ok(name)
    }
}

/// Parse the header of a `CREATE TRIGGER` statement.
///
/// `sqlparser` has no grammar for SQLite trigger bodies, so only the header
/// is read, token by token.
pub fn parse_create_trigger(sql: &str) -> Result<ParsedTrigger> {
    let mut h = Header::new(sql)?;

    h.expect("CREATE")?;
    let _ = h.eat("TEMP") || h.eat("TEMPORARY");
    h.expect("TRIGGER")?;
    if h.eat("IF") {
        h.expect("NOT")?;
        h.expect("EXISTS")?;
    }
    h.qualified_name()?;

    let timing = if h.eat("BEFORE") {
        TriggerTiming::Before
    } else if h.eat("AFTER") {
        TriggerTiming::After
    } else if h.eat("INSTEAD") {
        h.expect("OF")?;
        TriggerTiming::InsteadOf
    } else {
        TriggerTiming::Before
    };

    let event = match h.peek() {
        Some(Token::Word(word)) if word.quote_style.is_none() => word.value.parse::<TriggerEvent>()?,
        Some(token) => {
            return Err(Error::Parse(format!("expected a trigger event but found {}", token)));
        }
        None => return Err(Error::Parse("trigger has no event".to_string())),
    };
    h.pos += 1;

    if event == TriggerEvent::Update && h.eat("OF") {
        while h.peek().is_some_and(|t| !is_keyword(t, "ON")) {
            h.pos += 1;
        }
    }
    h.expect("ON")?;
    let table = h.qualified_name()?;

    Ok(ParsedTrigger {
        timing,
        events: BTreeSet::from([event]),
        table,
    })
}

/// Every name an expression mentions, unquoted
pub fn referenced_names(expression: &str) -> Result<Vec<String>> {
    Ok(significant_tokens(expression)?
        .into_iter()
        .filter_map(|t| match t {
            Token::Word(word) => Some(word.value),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_constraints() {
        let sql = r#"CREATE TABLE "orders" (
            id INTEGER CONSTRAINT pk_orders PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL REFERENCES customers (id) ON DELETE SET DEFAULT,
            code VARCHAR(20) COLLATE NOCASE CONSTRAINT uq_code UNIQUE,
            qty NUMERIC(10, 2) DEFAULT (0) CHECK (qty >= 0),
            total REAL GENERATED ALWAYS AS (qty * 2) STORED,
            CONSTRAINT ck_code CHECK (length(code) > 2),
            CONSTRAINT fk_region FOREIGN KEY (region, zone) REFERENCES regions (region, zone)
        )"#;

        let table = parse_create_table(sql).unwrap();
        assert_eq!(table.columns.len(), 5);

        let id = table.column("ID").unwrap();
        assert!(id.is_autoincrement);
        assert_eq!(table.primary_key.as_ref().unwrap().name.as_deref(), Some("pk_orders"));

        let code = table.column("code").unwrap();
        assert_eq!(code.collation.as_deref(), Some("NOCASE"));
        assert_eq!(table.unique_key_name(&["CODE"]), Some("uq_code"));

        assert_eq!(table.column("total").unwrap().generated.as_deref(), Some("qty * 2"));

        let checks: Vec<(Option<&str>, &str)> = table
            .checks
            .iter()
            .map(|c| (c.name.as_deref(), c.definition.as_str()))
            .collect();
        assert_eq!(checks, vec![(None, "qty >= 0"), (Some("ck_code"), "length(code) > 2")]);

        assert_eq!(table.foreign_keys.len(), 2);
        assert_eq!(table.foreign_keys[0].parent_table, "customers");
        assert_eq!(table.foreign_keys[0].name, None);
        assert_eq!(table.foreign_key_name(&["region", "zone"], "REGIONS"), Some("fk_region"));
    }

    #[test]
    fn test_collation_after_not_null() {
        let table = parse_create_table(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, email TEXT NOT NULL COLLATE NOCASE)",
        )
        .unwrap();
        assert_eq!(table.column("email").unwrap().collation.as_deref(), Some("NOCASE"));
        assert!(table.primary_key.is_some());
    }

    #[test]
    fn test_parse_table_without_body() {
        assert_eq!(parse_create_table("CREATE TABLE copy AS SELECT * FROM t").unwrap(), ParsedTable::default());
        assert_eq!(
            parse_create_table("CREATE VIRTUAL TABLE docs USING fts5(body, tokenize = 'porter')").unwrap(),
            ParsedTable::default()
        );
    }

    #[test]
    fn test_unparseable_table_is_an_error() {
        assert!(parse_create_table("CREATE TABLE (").is_err());
        assert!(parse_create_table("CREATE INDEX ix ON t (a)").is_err());
    }

    #[test]
    fn test_parse_index() {
        let index = parse_create_index(
            "CREATE UNIQUE INDEX IF NOT EXISTS ix_users ON users (lower(email) DESC, name COLLATE NOCASE) WHERE active = 1",
        )
        .unwrap();
        assert_eq!(index.columns[0].expression, "lower(email)");
        assert_eq!(index.columns[0].order, IndexColumnOrder::Descending);
        assert_eq!(index.columns[1].expression, "name COLLATE NOCASE");
        assert_eq!(index.columns[1].order, IndexColumnOrder::Ascending);
    }

    #[test]
    fn test_parse_trigger() {
        let trigger = parse_create_trigger(
            "CREATE TRIGGER trg_audit AFTER UPDATE OF name, email ON main.users BEGIN SELECT 1; END",
        )
        .unwrap();
        assert_eq!(trigger.timing, TriggerTiming::After);
        assert!(trigger.events.contains(&TriggerEvent::Update));
        assert_eq!(trigger.table, "users");

        let trigger = parse_create_trigger("CREATE TRIGGER t INSTEAD OF DELETE ON v BEGIN SELECT 1; END").unwrap();
        assert_eq!(trigger.timing, TriggerTiming::InsteadOf);

        let trigger = parse_create_trigger(
            "CREATE TEMP TRIGGER IF NOT EXISTS t -- no timing\n INSERT ON \"v\" BEGIN SELECT 1; END",
        )
        .unwrap();
        assert_eq!(trigger.timing, TriggerTiming::Before);
        assert_eq!(trigger.table, "v");

        assert!(parse_create_trigger("CREATE TRIGGER t AFTER ON v BEGIN SELECT 1; END").is_err());
    }

    #[test]
    fn test_referenced_names() {
        assert_eq!(
            referenced_names("lower(\"Email\") || name").unwrap(),
            vec!["lower", "Email", "name"]
        );
    }
}
