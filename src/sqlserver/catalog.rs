//! Name resolution against the `sys` catalog of one database

use super::connection::SqlServerConnection;
use super::queries;
use super::rows::{decode_all, ObjectRow};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::resolution::{DefaultSchemaIdentifierResolutionStrategy, IdentifierResolutionStrategy};
use crate::Result;
use std::sync::Arc;
use tiberius::Row;

pub const DEFAULT_SCHEMA: &str = "dbo";

/// Whether a qualified name points into the connected server and database
fn is_local(defaults: &IdentifierDefaults, name: &Identifier) -> bool {
    let same = |requested: Option<&str>, actual: &Option<String>| match (requested, actual) {
        (Some(requested), Some(actual)) => requested.eq_ignore_ascii_case(actual),
        (Some(_), None) => false,
        (None, _) => true,
    };
    same(name.server(), &defaults.server) && same(name.database(), &defaults.database)
}

/// Candidates qualified with `defaults`; names in other databases are dropped
fn candidates(
    defaults: &IdentifierDefaults,
    strategy: &dyn IdentifierResolutionStrategy,
    name: &Identifier,
) -> Vec<Identifier> {
    let mut candidates: Vec<Identifier> = Vec::new();
    for candidate in strategy.resolution_order(name) {
        let qualified = defaults.qualify(&candidate);
        if qualified.schema().is_none() {
            continue;
        }
        if !is_local(defaults, &qualified) {
            tracing::debug!(name = %qualified, "skipping name outside the connected database");
            continue;
        }
        if !candidates.contains(&qualified) {
            candidates.push(qualified);
        }
    }
    candidates
}

/// Connection plus the defaults and strategy its lookups resolve names with.
///
/// Shared by the structural and the comment provider so both agree on which
/// object a name denotes.
#[derive(Clone)]
pub(crate) struct ObjectResolver {
    connection: Arc<SqlServerConnection>,
    defaults: IdentifierDefaults,
    strategy: Arc<dyn IdentifierResolutionStrategy>,
}

impl std::fmt::Debug for ObjectResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectResolver")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl ObjectResolver {
    pub fn new(connection: Arc<SqlServerConnection>, defaults: IdentifierDefaults) -> Self {
        Self {
            connection,
            defaults,
            strategy: Arc::new(DefaultSchemaIdentifierResolutionStrategy::new(DEFAULT_SCHEMA)),
        }
    }

    /// Resolve unqualified names in `schema` instead of the session's schema
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.defaults.schema = Some(schema.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn IdentifierResolutionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn connection(&self) -> &SqlServerConnection {
        &self.connection
    }

    pub fn defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    pub fn strategy(&self) -> &Arc<dyn IdentifierResolutionStrategy> {
        &self.strategy
    }

    /// Fully qualified candidates for `name`, in resolution order
    pub fn candidates(&self, name: &Identifier) -> Vec<Identifier> {
        candidates(&self.defaults, self.strategy.as_ref(), name)
    }

    /// First row a schema-and-name filtered query returns over the candidates
    pub async fn first_row(&self, name: &Identifier, sql: &str) -> Result<Option<Row>> {
        for candidate in self.candidates(name) {
            let Some(schema) = candidate.schema() else {
                continue;
            };
            let local_name = candidate.local_name();
            let mut rows = self.connection.query(sql, &[&schema, &local_name]).await?;
            if !rows.is_empty() {
                tracing::trace!(requested = %name, resolved = %candidate, "resolved object");
                return Ok(Some(rows.swap_remove(0)));
            }
        }
        Ok(None)
    }

    pub async fn object(&self, name: &Identifier, types: &str) -> Result<Option<ObjectRow>> {
        self.first_row(name, &queries::objects(types, true))
            .await?
            .map(|row| ObjectRow::from_row(&row))
            .transpose()
    }

    pub async fn objects(&self, types: &str) -> Result<Vec<ObjectRow>> {
        let rows = self.connection.query(&queries::objects(types, false), &[]).await?;
        decode_all(&rows, ObjectRow::from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::SearchPathIdentifierResolutionStrategy;

    fn defaults() -> IdentifierDefaults {
        IdentifierDefaults::new(Some("SRV".into()), Some("sales".into()), Some("app".into()))
    }

    fn names(candidates: Vec<Identifier>) -> Vec<String> {
        candidates.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_unqualified_tries_session_schema_then_dbo() {
        let strategy = DefaultSchemaIdentifierResolutionStrategy::new(DEFAULT_SCHEMA);
        let name = Identifier::new("orders").unwrap();
        assert_eq!(
            names(candidates(&defaults(), &strategy, &name)),
            vec!["SRV.sales.app.orders", "SRV.sales.dbo.orders"]
        );

        let dbo_session = IdentifierDefaults::new(None, Some("sales".into()), Some("dbo".into()));
        assert_eq!(
            names(candidates(&dbo_session, &strategy, &name)),
            vec!["sales.dbo.orders"]
        );
    }

    #[test]
    fn test_search_path_strategy_candidates() {
        let strategy = SearchPathIdentifierResolutionStrategy::new(["crm", "dbo"]);
        let name = Identifier::new("customers").unwrap();
        assert_eq!(
            names(candidates(&defaults(), &strategy, &name)),
            vec!["SRV.sales.crm.customers", "SRV.sales.dbo.customers"]
        );
    }

    #[test]
    fn test_other_databases_are_not_candidates() {
        let strategy = DefaultSchemaIdentifierResolutionStrategy::new(DEFAULT_SCHEMA);
        let remote = Identifier::parse("hr.dbo.staff").unwrap();
        assert!(candidates(&defaults(), &strategy, &remote).is_empty());

        let local = Identifier::parse("srv.SALES.crm.customers").unwrap();
        assert_eq!(
            names(candidates(&defaults(), &strategy, &local)),
            vec!["srv.SALES.crm.customers"]
        );
    }
}
