//! SQL Server implementation of `RelationalDatabase`

use super::catalog::ObjectResolver;
use super::connection::SqlServerConnection;
use super::dialect::SqlServerDialect;
use super::mapping;
use super::queries;
use super::rows::{
    decode_all, CheckRow, ColumnRow, ForeignKeyColumnRow, IndexColumnRow, KeyColumnRow, ObjectRow,
    RoutineRow, SequenceRow, SynonymRow, TriggerRow, ViewDefinitionRow,
};
use crate::database::{sort_by_name, RelationalDatabase};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{Column, DatabaseKey, RelationalKey, Routine, Sequence, Synonym, Table, View};
use crate::resolution::IdentifierResolutionStrategy;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Columns and candidate keys of one table, enough to build either side of a foreign key
#[derive(Debug, Clone)]
struct TableShape {
    name: Identifier,
    columns: Vec<Column>,
    primary_key: Option<DatabaseKey>,
    unique_keys: Vec<DatabaseKey>,
}

impl TableShape {
    fn candidate_key(&self, key_name: &str) -> Option<&DatabaseKey> {
        self.primary_key
            .iter()
            .chain(self.unique_keys.iter())
            .find(|k| k.name.as_ref().is_some_and(|n| n.local_name().eq_ignore_ascii_case(key_name)))
    }
}

/// Schema objects of the database a SQL Server connection is using.
///
/// Names come back fully qualified (`server.database.schema.name`); lookups
/// try the session's default schema, then `dbo`.
#[derive(Debug, Clone)]
pub struct SqlServerRelationalDatabase {
    resolver: ObjectResolver,
    dialect: SqlServerDialect,
}

impl SqlServerRelationalDatabase {
    pub async fn new(connection: Arc<SqlServerConnection>) -> Result<Self> {
        let defaults = connection.identifier_defaults().await?;
        tracing::debug!(?defaults, "SQL Server identifier defaults");
        Ok(Self {
            resolver: ObjectResolver::new(connection, defaults),
            dialect: SqlServerDialect::new(),
        })
    }

    /// Resolve unqualified names in `schema` instead of the session's default schema
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.resolver = self.resolver.with_default_schema(schema);
        self
    }

    /// Replace the strategy used to resolve lookups
    pub fn with_strategy(mut self, strategy: Arc<dyn IdentifierResolutionStrategy>) -> Self {
        self.resolver = self.resolver.with_strategy(strategy);
        self
    }

    pub fn connection(&self) -> &SqlServerConnection {
        self.resolver.connection()
    }

    pub fn dialect(&self) -> &SqlServerDialect {
        &self.dialect
    }

    pub fn resolution_strategy(&self) -> &dyn IdentifierResolutionStrategy {
        self.resolver.strategy().as_ref()
    }

    async fn rows_for<T>(
        &self,
        sql: &str,
        object_id: i32,
        decode: impl Fn(&tiberius::Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let rows = self.connection().query(sql, &[&object_id]).await?;
        decode_all(&rows, decode)
    }

    async fn columns(&self, object_id: i32) -> Result<Vec<Column>> {
        self.rows_for(queries::COLUMNS, object_id, ColumnRow::from_row)
            .await?
            .into_iter()
            .map(|row| mapping::column(&self.dialect, row))
            .collect()
    }

    async fn shape(&self, object_id: i32, schema: &str, name: &str) -> Result<TableShape> {
        let columns = self.columns(object_id).await?;
        let key_rows = self.rows_for(queries::KEY_COLUMNS, object_id, KeyColumnRow::from_row).await?;
        let (primary_key, unique_keys) = mapping::keys(key_rows, &columns)?;
        Ok(TableShape {
            name: mapping::object_name(self.resolver.defaults(), schema, name)?,
            columns,
            primary_key,
            unique_keys,
        })
    }

    /// Foreign keys where the table is the child (`by_child`) or the parent
    async fn relational_keys(
        &self,
        object_id: i32,
        by_child: bool,
        shapes: &mut HashMap<i32, TableShape>,
    ) -> Result<Vec<RelationalKey>> {
        let rows = self
            .rows_for(&queries::foreign_key_columns(by_child), object_id, ForeignKeyColumnRow::from_row)
            .await?;

        let mut keys = Vec::new();
        for group in mapping::foreign_key_groups(rows) {
            let first = group[0].clone();
            for (id, schema, table) in [
                (first.child_object_id, &first.child_schema, &first.child_table),
                (first.parent_object_id, &first.parent_schema, &first.parent_table),
            ] {
                if !shapes.contains_key(&id) {
                    let shape = self.shape(id, schema, table).await?;
                    shapes.insert(id, shape);
                }
            }

            let (Some(child), Some(parent)) = (
                shapes.get(&first.child_object_id),
                shapes.get(&first.parent_object_id),
            ) else {
                continue;
            };
            let Some(parent_key) = parent.candidate_key(&first.parent_key_name) else {
                tracing::warn!(
                    key = %first.key_name,
                    parent = %parent.name,
                    "foreign key references no known key, skipping"
                );
                continue;
            };

            keys.push(RelationalKey::new(
                child.name.clone(),
                mapping::foreign_key(&group, &child.columns)?,
                parent.name.clone(),
                parent_key.clone(),
                mapping::referential_action(first.delete_action),
                mapping::referential_action(first.update_action),
            )?);
        }
        Ok(keys)
    }

    #[tracing::instrument(skip(self, object), fields(table = %object.name))]
    async fn load_table(&self, object: &ObjectRow) -> Result<Table> {
        let shape = self.shape(object.object_id, &object.schema_name, &object.name).await?;
        let mut shapes = HashMap::from([(object.object_id, shape.clone())]);

        let index_rows = self
            .rows_for(queries::INDEX_COLUMNS, object.object_id, IndexColumnRow::from_row)
            .await?;
        let check_rows = self.rows_for(queries::CHECKS, object.object_id, CheckRow::from_row).await?;
        let trigger_rows = self.rows_for(queries::TRIGGERS, object.object_id, TriggerRow::from_row).await?;

        let mut table = Table::new(shape.name, shape.columns)?;
        table.indexes = mapping::indexes(&self.dialect, &object.schema_name, index_rows, &table.columns)?;
        table.primary_key = shape.primary_key;
        table.unique_keys = shape.unique_keys;
        table.checks = mapping::checks(check_rows)?;
        table.triggers = mapping::triggers(&object.schema_name, trigger_rows)?;
        table.parent_keys = self.relational_keys(object.object_id, true, &mut shapes).await?;
        table.child_keys = self.relational_keys(object.object_id, false, &mut shapes).await?;

        tracing::debug!(
            columns = table.columns.len(),
            parent_keys = table.parent_keys.len(),
            child_keys = table.child_keys.len(),
            "loaded table"
        );
        Ok(table)
    }

    #[tracing::instrument(skip(self, object), fields(view = %object.name))]
    async fn load_view(&self, object: &ObjectRow) -> Result<View> {
        let columns = self.columns(object.object_id).await?;
        let definition = self
            .rows_for(queries::VIEW_DEFINITION, object.object_id, ViewDefinitionRow::from_row)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Catalog(format!("view {} has no readable definition", object.name)))?;

        View::new(
            mapping::object_name(self.resolver.defaults(), &object.schema_name, &object.name)?,
            definition.definition,
            columns,
            definition.is_materialized,
        )
    }
}

#[async_trait]
impl RelationalDatabase for SqlServerRelationalDatabase {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        self.resolver.defaults()
    }

    async fn get_table(&self, name: &Identifier) -> Result<Option<Table>> {
        match self.resolver.object(name, queries::TABLE_TYPES).await? {
            Some(object) => Ok(Some(self.load_table(&object).await?)),
            None => Ok(None),
        }
    }

    async fn get_all_tables(&self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        for object in self.resolver.objects(queries::TABLE_TYPES).await? {
            tables.push(self.load_table(&object).await?);
        }
        sort_by_name(&mut tables, |t| &t.name);
        Ok(tables)
    }

    async fn get_view(&self, name: &Identifier) -> Result<Option<View>> {
        match self.resolver.object(name, queries::VIEW_TYPES).await? {
            Some(object) => Ok(Some(self.load_view(&object).await?)),
            None => Ok(None),
        }
    }

    async fn get_all_views(&self) -> Result<Vec<View>> {
        let mut views = Vec::new();
        for object in self.resolver.objects(queries::VIEW_TYPES).await? {
            views.push(self.load_view(&object).await?);
        }
        sort_by_name(&mut views, |v| &v.name);
        Ok(views)
    }

    async fn get_sequence(&self, name: &Identifier) -> Result<Option<Sequence>> {
        let Some(row) = self.resolver.first_row(name, &queries::sequences(true)).await? else {
            return Ok(None);
        };
        Ok(Some(mapping::sequence(self.resolver.defaults(), SequenceRow::from_row(&row)?)?))
    }

    async fn get_all_sequences(&self) -> Result<Vec<Sequence>> {
        let rows = self.connection().query(&queries::sequences(false), &[]).await?;
        let mut sequences = decode_all(&rows, SequenceRow::from_row)?
            .into_iter()
            .map(|row| mapping::sequence(self.resolver.defaults(), row))
            .collect::<Result<Vec<_>>>()?;
        sort_by_name(&mut sequences, |s| &s.name);
        Ok(sequences)
    }

    async fn get_synonym(&self, name: &Identifier) -> Result<Option<Synonym>> {
        let Some(row) = self.resolver.first_row(name, &queries::synonyms(true)).await? else {
            return Ok(None);
        };
        Ok(Some(mapping::synonym(self.resolver.defaults(), SynonymRow::from_row(&row)?)?))
    }

    async fn get_all_synonyms(&self) -> Result<Vec<Synonym>> {
        let rows = self.connection().query(&queries::synonyms(false), &[]).await?;
        let mut synonyms = decode_all(&rows, SynonymRow::from_row)?
            .into_iter()
            .map(|row| mapping::synonym(self.resolver.defaults(), row))
            .collect::<Result<Vec<_>>>()?;
        sort_by_name(&mut synonyms, |s| &s.name);
        Ok(synonyms)
    }

    async fn get_routine(&self, name: &Identifier) -> Result<Option<Routine>> {
        let Some(row) = self.resolver.first_row(name, &queries::routines(true)).await? else {
            return Ok(None);
        };
        mapping::routine(self.resolver.defaults(), RoutineRow::from_row(&row)?)
    }

    async fn get_all_routines(&self) -> Result<Vec<Routine>> {
        let rows = self.connection().query(&queries::routines(false), &[]).await?;
        let mut routines = Vec::new();
        for row in decode_all(&rows, RoutineRow::from_row)? {
            if let Some(routine) = mapping::routine(self.resolver.defaults(), row)? {
                routines.push(routine);
            }
        }
        sort_by_name(&mut routines, |r| &r.name);
        Ok(routines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Live tests run only when `SCHEMATIC_TEST_MSSQL` holds an ADO connection string
    async fn connect() -> Option<SqlServerRelationalDatabase> {
        let connection_string = std::env::var("SCHEMATIC_TEST_MSSQL").ok()?;
        let connection = SqlServerConnection::connect(&connection_string).await.unwrap();
        Some(SqlServerRelationalDatabase::new(Arc::new(connection)).await.unwrap())
    }

    #[tokio::test]
    async fn test_live_tables_are_fully_qualified() {
        let Some(db) = connect().await else {
            return;
        };
        let defaults = db.identifier_defaults().clone();
        for table in db.get_all_tables().await.unwrap() {
            assert_eq!(table.name.database(), defaults.database.as_deref());
            let again = db.get_table(&table.name).await.unwrap().unwrap();
            assert_eq!(again.name, table.name);
        }
    }

    #[tokio::test]
    async fn test_live_missing_objects() {
        let Some(db) = connect().await else {
            return;
        };
        let name = Identifier::parse("dbo.no_such_object_here").unwrap();
        assert!(db.get_table(&name).await.unwrap().is_none());
        assert!(db.get_view(&name).await.unwrap().is_none());
        assert!(db.get_sequence(&name).await.unwrap().is_none());

        let elsewhere = Identifier::parse("some_other_db.dbo.orders").unwrap();
        assert!(db.get_table(&elsewhere).await.unwrap().is_none());
    }

    #[test]
    fn test_candidate_key_lookup_ignores_case() {
        let ty = crate::model::DbType::new(
            Identifier::new("int").unwrap(),
            crate::model::DataType::Integer,
            "int",
        )
        .unwrap();
        let id = Column::new("id", ty, false).unwrap();
        let pk = DatabaseKey::new(
            Some(Identifier::new("PK_orders").unwrap()),
            crate::model::KeyType::Primary,
            vec![id.clone()],
            true,
        )
        .unwrap();
        let shape = TableShape {
            name: Identifier::parse("dbo.orders").unwrap(),
            columns: vec![id],
            primary_key: Some(pk),
            unique_keys: Vec::new(),
        };
        assert!(shape.candidate_key("pk_ORDERS").is_some());
        assert!(shape.candidate_key("UQ_orders").is_none());
    }
}
