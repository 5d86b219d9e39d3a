//! Synchronous catalog reads against one SQLite connection
//!
//! Runs inside `SqliteConnection::call`. A table is assembled from its
//! pragmas plus whatever its CREATE statement declares; foreign keys are
//! resolved across every table of the schema so child keys come for free.

use super::ddl::{self, ParsedTable};
use super::dialect::SqliteDialect;
use super::pragma::{self, ForeignKeyRow, TableColumnRow};
use crate::dialect::DatabaseDialect;
use crate::identifier::Identifier;
use crate::model::{
    AutoIncrement, Check, Column, DatabaseKey, Index, IndexColumn, IndexColumnOrder, KeyType,
    RelationalKey, Table, Trigger, View,
};
use crate::Result;
use rusqlite::Connection;
use std::collections::HashMap;

/// Row of `<schema>.sqlite_master`
#[derive(Debug, Clone)]
struct MasterRow {
    name: String,
    table_name: String,
    sql: Option<String>,
}

/// Columns and candidate keys of one table, before relations are resolved
struct TableShape {
    name: String,
    parsed: ParsedTable,
    columns: Vec<Column>,
    primary_key: Option<DatabaseKey>,
    unique_keys: Vec<DatabaseKey>,
    /// Full `CREATE UNIQUE INDEX`es, which SQLite also accepts as parent keys
    unique_indexes: Vec<DatabaseKey>,
}

fn find_columns(columns: &[Column], names: &[String]) -> Option<Vec<Column>> {
    names
        .iter()
        .map(|n| columns.iter().find(|c| c.name.eq_ignore_ascii_case(n)).cloned())
        .collect()
}

fn optional_name(name: Option<&str>) -> Result<Option<Identifier>> {
    name.map(Identifier::new).transpose()
}

pub(crate) struct CatalogReader<'a> {
    conn: &'a Connection,
    dialect: SqliteDialect,
}

impl<'a> CatalogReader<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            dialect: SqliteDialect::new(),
        }
    }

    /// Schema names in `pragma_database_list` order
    pub fn schemas(&self) -> Result<Vec<String>> {
        Ok(pragma::database_list(self.conn)?
            .into_iter()
            .map(|row| row.name)
            .collect())
    }

    fn master_rows(&self, schema: &str, object_type: &str) -> Result<Vec<MasterRow>> {
        let sql = format!(
            r#"SELECT name, tbl_name, sql FROM {}.sqlite_master
               WHERE type = ?1 AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
               ORDER BY name"#,
            self.dialect.quote_identifier(schema)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([object_type], |row| {
                Ok(MasterRow {
                    name: row.get(0)?,
                    table_name: row.get(1)?,
                    sql: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn parse_table(&self, row: &MasterRow) -> ParsedTable {
        let Some(sql) = row.sql.as_deref() else {
            return ParsedTable::default();
        };
        ddl::parse_create_table(sql).unwrap_or_else(|err| {
            tracing::warn!(table = %row.name, error = %err, "could not parse table definition");
            ParsedTable::default()
        })
    }

    fn columns(&self, schema: &str, rows: &[TableColumnRow], parsed: &ParsedTable) -> Result<Vec<Column>> {
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows.iter().filter(|r| r.hidden != 1) {
            let declared = parsed.column(&row.name);
            let collation = optional_name(declared.and_then(|c| c.collation.as_deref()))?;
            let request = SqliteDialect::parse_declared_type(&row.declared_type)?.with_collation(collation);

            let generated = if row.is_generated() {
                declared.and_then(|c| c.generated.clone())
            } else {
                None
            };
            let auto_increment = declared
                .filter(|c| c.is_autoincrement)
                .map(|_| AutoIncrement::default());

            let column = Column::new(row.name.clone(), self.dialect.type_for(&request), !row.not_null)?
                .with_default(row.default_value.clone())
                .with_computed_definition(generated)
                .with_auto_increment(auto_increment);
            columns.push(column);
        }
        tracing::trace!(schema, count = columns.len(), "read columns");
        Ok(columns)
    }

    fn shape(&self, schema: &str, row: &MasterRow) -> Result<TableShape> {
        let parsed = self.parse_table(row);
        let column_rows = pragma::table_columns(self.conn, schema, &row.name)?;
        let columns = self.columns(schema, &column_rows, &parsed)?;

        let mut pk_rows: Vec<&TableColumnRow> = column_rows.iter().filter(|r| r.pk > 0).collect();
        pk_rows.sort_by_key(|r| r.pk);
        let pk_names: Vec<String> = pk_rows.iter().map(|r| r.name.clone()).collect();
        let primary_key = match find_columns(&columns, &pk_names) {
            Some(pk_columns) if !pk_columns.is_empty() => {
                let name = parsed.primary_key.as_ref().and_then(|k| k.name.as_deref());
                Some(DatabaseKey::new(optional_name(name)?, KeyType::Primary, pk_columns, true)?)
            }
            _ => None,
        };

        let mut unique_keys = Vec::new();
        let mut unique_indexes = Vec::new();
        for index in pragma::index_list(self.conn, schema, &row.name)? {
            let is_constraint = index.origin == "u";
            let is_unique_index = index.origin == "c" && index.is_unique && !index.is_partial;
            if !is_constraint && !is_unique_index {
                continue;
            }

            let names: Vec<String> = pragma::index_columns(self.conn, schema, &index.name)?
                .into_iter()
                .filter(|c| c.is_key)
                .filter_map(|c| c.name)
                .collect();
            let Some(key_columns) = find_columns(&columns, &names).filter(|c| !c.is_empty()) else {
                if is_constraint {
                    tracing::warn!(table = %row.name, index = %index.name, "skipping unique key with unknown columns");
                }
                continue;
            };

            if is_constraint {
                let name = optional_name(parsed.unique_key_name(&names))?;
                unique_keys.push(DatabaseKey::new(name, KeyType::Unique, key_columns, true)?);
            } else {
                let name = Some(Identifier::new(index.name.clone())?);
                unique_indexes.push(DatabaseKey::new(name, KeyType::Unique, key_columns, true)?);
            }
        }

        Ok(TableShape {
            name: row.name.clone(),
            parsed,
            columns,
            primary_key,
            unique_keys,
            unique_indexes,
        })
    }

    /// Foreign keys declared on `child`, resolved against the other shapes of the schema
    fn relational_keys(&self, schema: &str, child: &TableShape, shapes: &[TableShape]) -> Result<Vec<RelationalKey>> {
        let mut groups: Vec<Vec<ForeignKeyRow>> = Vec::new();
        for row in pragma::foreign_keys(self.conn, schema, &child.name)? {
            match groups.last_mut() {
                Some(group) if group[0].id == row.id => group.push(row),
                _ => groups.push(vec![row]),
            }
        }

        let mut keys = Vec::new();
        for group in groups {
            let parent_name = &group[0].parent_table;
            let Some(parent) = shapes.iter().find(|s| s.name.eq_ignore_ascii_case(parent_name)) else {
                tracing::warn!(table = %child.name, parent = %parent_name, "skipping foreign key to unknown table");
                continue;
            };

            let from: Vec<String> = group.iter().map(|r| r.from.clone()).collect();
            let parent_key = if group.iter().all(|r| r.to.is_none()) {
                parent.primary_key.clone()
            } else {
                let to: Vec<&str> = group.iter().map(|r| r.to.as_deref().unwrap_or_default()).collect();
                parent
                    .primary_key
                    .iter()
                    .chain(parent.unique_keys.iter())
                    .chain(parent.unique_indexes.iter())
                    .find(|k| k.has_columns(&to))
                    .cloned()
            };
            let Some(parent_key) = parent_key else {
                tracing::warn!(table = %child.name, parent = %parent.name, "skipping foreign key without a matching parent key");
                continue;
            };
            let Some(child_columns) = find_columns(&child.columns, &from) else {
                tracing::warn!(table = %child.name, "skipping foreign key with unknown columns");
                continue;
            };

            let name = optional_name(child.parsed.foreign_key_name(&from, parent_name))?;
            keys.push(RelationalKey::new(
                Identifier::qualified(schema, &child.name)?,
                DatabaseKey::new(name, KeyType::Foreign, child_columns, true)?,
                Identifier::qualified(schema, &parent.name)?,
                parent_key,
                group[0].on_delete.parse()?,
                group[0].on_update.parse()?,
            )?);
        }
        Ok(keys)
    }

    fn indexes(&self, schema: &str, shape: &TableShape, index_sql: &HashMap<String, String>) -> Result<Vec<Index>> {
        let mut indexes = Vec::new();
        for entry in pragma::index_list(self.conn, schema, &shape.name)?
            .into_iter()
            .filter(|i| i.origin == "c")
        {
            let parsed = index_sql
                .get(&entry.name.to_lowercase())
                .and_then(|sql| match ddl::parse_create_index(sql) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        tracing::warn!(index = %entry.name, error = %err, "could not parse index definition");
                        None
                    }
                });

            let mut columns = Vec::new();
            let key_rows = pragma::index_columns(self.conn, schema, &entry.name)?
                .into_iter()
                .filter(|c| c.is_key);
            for (position, row) in key_rows.enumerate() {
                let order = if row.is_descending {
                    IndexColumnOrder::Descending
                } else {
                    IndexColumnOrder::Ascending
                };

                let column = match (row.cid, row.name) {
                    (-1, _) => IndexColumn::new("rowid", order, Vec::new())?,
                    (cid, Some(name)) if cid >= 0 => {
                        let dependent = find_columns(&shape.columns, std::slice::from_ref(&name)).unwrap_or_default();
                        IndexColumn::new(self.dialect.quote_identifier(&name), order, dependent)?
                    }
                    _ => {
                        let Some(expression) = parsed.as_ref().and_then(|p| p.columns.get(position)) else {
                            tracing::warn!(index = %entry.name, position, "expression column without a definition");
                            continue;
                        };
                        let names = ddl::referenced_names(&expression.expression)?;
                        let dependent = shape
                            .columns
                            .iter()
                            .filter(|c| names.iter().any(|n| n.eq_ignore_ascii_case(&c.name)))
                            .cloned()
                            .collect();
                        IndexColumn::new(expression.expression.clone(), order, dependent)?
                    }
                };
                columns.push(column);
            }

            if columns.is_empty() {
                continue;
            }
            indexes.push(Index::new(
                Identifier::qualified(schema, &entry.name)?,
                entry.is_unique,
                columns,
                Vec::new(),
                true,
            )?);
        }
        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }

    fn triggers(&self, schema: &str, table: &str, trigger_rows: &[MasterRow]) -> Result<Vec<Trigger>> {
        let mut triggers = Vec::new();
        for row in trigger_rows.iter().filter(|r| r.table_name.eq_ignore_ascii_case(table)) {
            let Some(sql) = row.sql.as_deref() else {
                continue;
            };
            match ddl::parse_create_trigger(sql) {
                Ok(parsed) => triggers.push(Trigger::new(
                    Identifier::qualified(schema, &row.name)?,
                    sql,
                    parsed.timing,
                    parsed.events,
                    true,
                )?),
                Err(err) => {
                    tracing::warn!(trigger = %row.name, error = %err, "could not parse trigger definition");
                }
            }
        }
        Ok(triggers)
    }

    /// Tables of `schema`; only the one named `only` when given (case-insensitive)
    pub fn tables(&self, schema: &str, only: Option<&str>) -> Result<Vec<Table>> {
        let rows = self.master_rows(schema, "table")?;
        let wanted = |name: &str| only.is_none_or(|o| o.eq_ignore_ascii_case(name));
        if !rows.iter().any(|r| wanted(&r.name)) {
            return Ok(Vec::new());
        }

        let mut shapes = Vec::with_capacity(rows.len());
        for row in &rows {
            match self.shape(schema, row) {
                Ok(shape) => shapes.push(shape),
                Err(err) if !wanted(&row.name) => {
                    tracing::warn!(table = %row.name, error = %err, "skipping unreadable table");
                }
                Err(err) => return Err(err),
            }
        }

        let mut relations = Vec::new();
        for shape in &shapes {
            relations.extend(self.relational_keys(schema, shape, &shapes)?);
        }

        let index_sql: HashMap<String, String> = self
            .master_rows(schema, "index")?
            .into_iter()
            .filter_map(|r| r.sql.map(|sql| (r.name.to_lowercase(), sql)))
            .collect();
        let trigger_rows = self.master_rows(schema, "trigger")?;

        let mut tables = Vec::new();
        for shape in shapes.iter().filter(|s| wanted(&s.name)) {
            let mut table = Table::new(Identifier::qualified(schema, &shape.name)?, shape.columns.clone())?;
            table.primary_key = shape.primary_key.clone();
            table.unique_keys = shape.unique_keys.clone();
            table.parent_keys = relations
                .iter()
                .filter(|k| k.child_table.local_name().eq_ignore_ascii_case(&shape.name))
                .cloned()
                .collect();
            table.child_keys = relations
                .iter()
                .filter(|k| k.parent_table.local_name().eq_ignore_ascii_case(&shape.name))
                .cloned()
                .collect();
            table.indexes = self.indexes(schema, shape, &index_sql)?;
            table.checks = shape
                .parsed
                .checks
                .iter()
                .map(|c| Check::new(optional_name(c.name.as_deref())?, c.definition.clone(), true))
                .collect::<Result<_>>()?;
            table.triggers = self.triggers(schema, &shape.name, &trigger_rows)?;
            tables.push(table);
        }

        tracing::debug!(schema, count = tables.len(), "read tables");
        Ok(tables)
    }

    /// Views of `schema`; only the one named `only` when given (case-insensitive)
    pub fn views(&self, schema: &str, only: Option<&str>) -> Result<Vec<View>> {
        let mut views = Vec::new();
        for row in self
            .master_rows(schema, "view")?
            .into_iter()
            .filter(|r| only.is_none_or(|o| o.eq_ignore_ascii_case(&r.name)))
        {
            let column_rows = pragma::table_columns(self.conn, schema, &row.name)?;
            let columns = self.columns(schema, &column_rows, &ParsedTable::default())?;
            views.push(View::new(
                Identifier::qualified(schema, &row.name)?,
                row.sql.unwrap_or_default(),
                columns,
                false,
            )?);
        }
        Ok(views)
    }
}
