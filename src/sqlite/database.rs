//! SQLite implementation of `RelationalDatabase`

use super::catalog::CatalogReader;
use super::connection::SqliteConnection;
use super::dialect::SqliteDialect;
use super::pragma::SqliteDatabasePragma;
use crate::database::{sort_by_name, RelationalDatabase};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{Routine, Sequence, Synonym, Table, View};
use crate::resolution::{IdentifierResolutionStrategy, SearchPathIdentifierResolutionStrategy};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const MAIN_SCHEMA: &str = "main";
pub const TEMP_SCHEMA: &str = "temp";

/// Order SQLite itself searches schemas for unqualified names: temp, main, attached
pub fn search_order(schemas: Vec<String>) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(schemas.len());
    for wanted in [TEMP_SCHEMA, MAIN_SCHEMA] {
        if let Some(found) = schemas.iter().find(|s| s.eq_ignore_ascii_case(wanted)) {
            ordered.push(found.clone());
        }
    }
    for schema in schemas {
        if !ordered.iter().any(|s| s.eq_ignore_ascii_case(&schema)) {
            ordered.push(schema);
        }
    }
    ordered
}

/// Schema objects of a SQLite connection and every database attached to it.
///
/// Without an explicit strategy, unqualified names resolve along the
/// connection's current search path, so later `ATTACH`es are picked up.
pub struct SqliteRelationalDatabase {
    connection: SqliteConnection,
    dialect: SqliteDialect,
    defaults: IdentifierDefaults,
    strategy: Option<Arc<dyn IdentifierResolutionStrategy>>,
}

impl SqliteRelationalDatabase {
    pub fn new(connection: SqliteConnection) -> Self {
        Self {
            connection,
            dialect: SqliteDialect::new(),
            defaults: IdentifierDefaults::with_schema(MAIN_SCHEMA),
            strategy: None,
        }
    }

    /// Replace the strategy used to resolve lookups
    pub fn with_strategy(mut self, strategy: Arc<dyn IdentifierResolutionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn connection(&self) -> &SqliteConnection {
        &self.connection
    }

    pub fn dialect(&self) -> &SqliteDialect {
        &self.dialect
    }

    /// Typed pragmas of one schema
    pub fn pragma(&self, schema: impl Into<String>) -> SqliteDatabasePragma {
        SqliteDatabasePragma::new(self.connection.clone(), schema)
    }

    /// Names of `main`, `temp` (once used) and every attached database
    pub async fn schemas(&self) -> Result<Vec<String>> {
        self.connection.call(|conn| CatalogReader::new(conn).schemas()).await
    }

    /// Schemas in the order SQLite searches them for unqualified names
    pub async fn search_path(&self) -> Result<Vec<String>> {
        Ok(search_order(self.schemas().await?))
    }

    /// Strategy lookups resolve names with: the explicit one, else the live search path
    pub async fn resolution_strategy(&self) -> Result<Arc<dyn IdentifierResolutionStrategy>> {
        match &self.strategy {
            Some(strategy) => Ok(strategy.clone()),
            None => Ok(Arc::new(SearchPathIdentifierResolutionStrategy::new(self.search_path().await?))),
        }
    }

    /// `(schema, name)` pairs to try for `name`, in resolution order
    async fn candidates(&self, name: &Identifier) -> Result<Vec<(String, String)>> {
        let strategy = self.resolution_strategy().await?;
        let schemas = self.schemas().await?;

        let mut candidates: Vec<(String, String)> = Vec::new();
        for candidate in strategy.resolution_order(name) {
            let qualified = self.defaults.qualify(&candidate);
            if qualified.database().is_some() {
                continue;
            }
            let Some(schema) = qualified
                .schema()
                .and_then(|wanted| schemas.iter().find(|s| s.eq_ignore_ascii_case(wanted)))
            else {
                continue;
            };
            let pair = (schema.clone(), qualified.local_name().to_string());
            if !candidates.contains(&pair) {
                candidates.push(pair);
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl RelationalDatabase for SqliteRelationalDatabase {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    #[tracing::instrument(skip(self), fields(name = %name))]
    async fn get_table(&self, name: &Identifier) -> Result<Option<Table>> {
        let candidates = self.candidates(name).await?;
        self.connection
            .call(move |conn| {
                let reader = CatalogReader::new(conn);
                for (schema, local) in &candidates {
                    if let Some(table) = reader.tables(schema, Some(local))?.into_iter().next() {
                        return Ok(Some(table));
                    }
                }
                Ok(None)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_tables(&self) -> Result<Vec<Table>> {
        let mut tables = self
            .connection
            .call(|conn| {
                let reader = CatalogReader::new(conn);
                let mut tables = Vec::new();
                for schema in reader.schemas()? {
                    tables.extend(reader.tables(&schema, None)?);
                }
                Ok(tables)
            })
            .await?;
        sort_by_name(&mut tables, |t| &t.name);
        Ok(tables)
    }

    #[tracing::instrument(skip(self), fields(name = %name))]
    async fn get_view(&self, name: &Identifier) -> Result<Option<View>> {
        let candidates = self.candidates(name).await?;
        self.connection
            .call(move |conn| {
                let reader = CatalogReader::new(conn);
                for (schema, local) in &candidates {
                    if let Some(view) = reader.views(schema, Some(local))?.into_iter().next() {
                        return Ok(Some(view));
                    }
                }
                Ok(None)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_views(&self) -> Result<Vec<View>> {
        let mut views = self
            .connection
            .call(|conn| {
                let reader = CatalogReader::new(conn);
                let mut views = Vec::new();
                for schema in reader.schemas()? {
                    views.extend(reader.views(&schema, None)?);
                }
                Ok(views)
            })
            .await?;
        sort_by_name(&mut views, |v| &v.name);
        Ok(views)
    }

    // SQLite has no sequences, synonyms or routines

    async fn get_sequence(&self, _name: &Identifier) -> Result<Option<Sequence>> {
        Ok(None)
    }

    async fn get_all_sequences(&self) -> Result<Vec<Sequence>> {
        Ok(Vec::new())
    }

    async fn get_synonym(&self, _name: &Identifier) -> Result<Option<Synonym>> {
        Ok(None)
    }

    async fn get_all_synonyms(&self) -> Result<Vec<Synonym>> {
        Ok(Vec::new())
    }

    async fn get_routine(&self, _name: &Identifier) -> Result<Option<Routine>> {
        Ok(None)
    }

    async fn get_all_routines(&self) -> Result<Vec<Routine>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, IndexColumnOrder, KeyType, ReferentialAction, TriggerEvent, TriggerTiming};
    use crate::snapshot::RelationalDatabaseSnapshot;

    const SCHEMA: &str = r#"
        CREATE TABLE customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL COLLATE NOCASE,
            name VARCHAR(100),
            CONSTRAINT uq_customers_email UNIQUE (email)
        );
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL,
            qty NUMERIC(10, 2) DEFAULT 0,
            total REAL GENERATED ALWAYS AS (qty * 2) VIRTUAL,
            CONSTRAINT fk_orders_customer FOREIGN KEY (customer_id)
                REFERENCES customers (id) ON DELETE CASCADE,
            CONSTRAINT ck_orders_qty CHECK (qty >= 0)
        );
        CREATE INDEX ix_orders_customer ON orders (customer_id DESC);
        CREATE INDEX ix_customers_email_lower ON customers (lower(email));
        CREATE TRIGGER trg_orders_insert AFTER INSERT ON orders BEGIN SELECT 1; END;
        CREATE VIEW customer_orders AS
            SELECT c.email, o.qty FROM customers c JOIN orders o ON o.customer_id = c.id;
    "#;

    fn database() -> SqliteRelationalDatabase {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        SqliteRelationalDatabase::new(conn)
    }

    fn id(name: &str) -> Identifier {
        Identifier::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_table_columns() {
        let db = database();
        let orders = db.get_table(&id("ORDERS")).await.unwrap().unwrap();
        assert_eq!(orders.name.to_string(), "main.orders");

        let names: Vec<&str> = orders.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer_id", "qty", "total"]);

        let qty = orders.column("qty").unwrap();
        assert_eq!(qty.db_type.data_type, DataType::Numeric);
        assert_eq!(qty.default_value.as_deref(), Some("0"));
        assert!(qty.is_nullable);

        let total = orders.column("total").unwrap();
        assert_eq!(total.computed_definition.as_deref(), Some("qty * 2"));
        assert!(!orders.column("customer_id").unwrap().is_nullable);

        let customers = db.get_table(&id("customers")).await.unwrap().unwrap();
        assert!(customers.column("id").unwrap().auto_increment.is_some());
        let email = customers.column("email").unwrap();
        assert_eq!(email.db_type.collation.as_ref().map(|c| c.local_name()), Some("NOCASE"));
        assert_eq!(customers.column("name").unwrap().db_type.max_length, Some(100));
    }

    #[tokio::test]
    async fn test_table_keys() {
        let db = database();
        let customers = db.get_table(&id("main.customers")).await.unwrap().unwrap();

        let pk = customers.primary_key.as_ref().unwrap();
        assert!(pk.has_columns(&["id"]));
        assert_eq!(customers.unique_keys.len(), 1);
        assert_eq!(
            customers.unique_keys[0].name.as_ref().map(|n| n.local_name()),
            Some("uq_customers_email")
        );

        assert_eq!(customers.child_keys.len(), 1);
        let relation = &customers.child_keys[0];
        assert_eq!(relation.child_table.to_string(), "main.orders");
        assert_eq!(relation.child_key.name.as_ref().map(|n| n.local_name()), Some("fk_orders_customer"));
        assert_eq!(relation.parent_key.key_type, KeyType::Primary);
        assert_eq!(relation.delete_action, ReferentialAction::Cascade);
        assert_eq!(relation.update_action, ReferentialAction::NoAction);

        let orders = db.get_table(&id("orders")).await.unwrap().unwrap();
        assert_eq!(orders.parent_keys, customers.child_keys);
        assert_eq!(orders.checks.len(), 1);
        assert_eq!(orders.checks[0].definition, "qty >= 0");
    }

    #[tokio::test]
    async fn test_indexes_and_triggers() {
        let db = database();
        let orders = db.get_table(&id("orders")).await.unwrap().unwrap();

        let index = orders.index("ix_orders_customer").unwrap();
        assert_eq!(index.columns[0].expression, "\"customer_id\"");
        assert_eq!(index.columns[0].order, IndexColumnOrder::Descending);
        assert_eq!(index.columns[0].dependent_columns[0].name, "customer_id");

        let trigger = &orders.triggers[0];
        assert_eq!(trigger.name.local_name(), "trg_orders_insert");
        assert_eq!(trigger.timing, TriggerTiming::After);
        assert!(trigger.events.contains(&TriggerEvent::Insert));

        let customers = db.get_table(&id("customers")).await.unwrap().unwrap();
        let index = customers.index("ix_customers_email_lower").unwrap();
        assert_eq!(index.columns[0].expression, "lower(email)");
        assert_eq!(index.columns[0].dependent_columns[0].name, "email");
    }

    #[tokio::test]
    async fn test_views() {
        let db = database();
        let view = db.get_view(&id("customer_orders")).await.unwrap().unwrap();
        assert!(!view.is_materialized);
        assert!(view.definition.starts_with("CREATE VIEW customer_orders"));
        let names: Vec<&str> = view.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["email", "qty"]);

        assert!(db.get_view(&id("customers")).await.unwrap().is_none());
        assert_eq!(db.get_all_views().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_unsupported_objects() {
        let db = database();
        assert!(db.get_table(&id("nope")).await.unwrap().is_none());
        assert!(db.get_table(&id("other.main.orders")).await.unwrap().is_none());
        assert!(db.get_table(&id("archive.orders")).await.unwrap().is_none());
        assert!(db.get_all_sequences().await.unwrap().is_empty());
        assert!(db.get_synonym(&id("orders")).await.unwrap().is_none());
        assert!(db.get_all_routines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attached_schema_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SqliteConnection::open(&dir.path().join("main.db")).unwrap();
        conn.attach("archive", &dir.path().join("archive.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE archive.orders (id INTEGER PRIMARY KEY, archived_at TEXT);
             CREATE TABLE archive.invoices (id INTEGER PRIMARY KEY);
             CREATE TABLE main.orders (id INTEGER PRIMARY KEY);",
        )
        .unwrap();
        let db = SqliteRelationalDatabase::new(conn);

        let orders = db.get_table(&id("orders")).await.unwrap().unwrap();
        assert_eq!(orders.name.to_string(), "main.orders");

        let archived = db.get_table(&id("archive.orders")).await.unwrap().unwrap();
        assert!(archived.column("archived_at").is_some());

        let invoices = db.get_table(&id("invoices")).await.unwrap().unwrap();
        assert_eq!(invoices.name.schema(), Some("archive"));

        let names: Vec<String> = db
            .get_all_tables()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["archive.invoices", "archive.orders", "main.orders"]);

        let path = db.search_path().await.unwrap();
        assert_eq!(path.last().map(String::as_str), Some("archive"));
        assert!(path.iter().position(|s| s == "main") < path.iter().position(|s| s == "archive"));
    }

    #[tokio::test]
    async fn test_explicit_strategy_replaces_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let conn = SqliteConnection::open(&dir.path().join("main.db")).unwrap();
        conn.attach("archive", &dir.path().join("archive.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE archive.orders (id INTEGER PRIMARY KEY, archived_at TEXT);
             CREATE TABLE archive.invoices (id INTEGER PRIMARY KEY);
             CREATE TABLE main.orders (id INTEGER PRIMARY KEY);",
        )
        .unwrap();

        let db = SqliteRelationalDatabase::new(conn.clone())
            .with_strategy(Arc::new(SearchPathIdentifierResolutionStrategy::new(["archive", "main"])));
        let orders = db.get_table(&id("orders")).await.unwrap().unwrap();
        assert_eq!(orders.name.to_string(), "archive.orders");
        assert!(db.get_table(&id("main.orders")).await.unwrap().is_some());

        let verbatim = SqliteRelationalDatabase::new(conn)
            .with_strategy(Arc::new(crate::resolution::VerbatimIdentifierResolutionStrategy));
        assert_eq!(
            verbatim.get_table(&id("orders")).await.unwrap().unwrap().name.to_string(),
            "main.orders"
        );
        assert!(verbatim.get_table(&id("invoices")).await.unwrap().is_none());
        assert!(verbatim.get_table(&id("archive.invoices")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_foreign_key_onto_unique_index() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE regions (id INTEGER PRIMARY KEY, code TEXT NOT NULL);
             CREATE UNIQUE INDEX ux_regions_code ON regions (code);
             CREATE TABLE stores (
                 id INTEGER PRIMARY KEY,
                 region_code TEXT REFERENCES regions (code)
             );",
        )
        .unwrap();
        let db = SqliteRelationalDatabase::new(conn);

        let stores = db.get_table(&id("stores")).await.unwrap().unwrap();
        assert_eq!(stores.parent_keys.len(), 1);
        let parent_key = &stores.parent_keys[0].parent_key;
        assert_eq!(parent_key.key_type, KeyType::Unique);
        assert_eq!(parent_key.name.as_ref().map(|n| n.local_name()), Some("ux_regions_code"));
        assert!(parent_key.has_columns(&["code"]));

        let regions = db.get_table(&id("regions")).await.unwrap().unwrap();
        assert!(regions.unique_keys.is_empty());
        assert_eq!(regions.child_keys.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_of_sqlite_database() {
        let db = database();
        let snapshot = RelationalDatabaseSnapshot::capture(&db).await.unwrap();
        let live = db.get_table(&id("orders")).await.unwrap();
        assert_eq!(snapshot.get_table(&id("orders")).await.unwrap(), live);
    }

    #[test]
    fn test_search_order() {
        let ordered = search_order(vec!["main".into(), "temp".into(), "archive".into()]);
        assert_eq!(ordered, vec!["temp", "main", "archive"]);
    }
}
