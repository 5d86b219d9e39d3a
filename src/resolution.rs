//! Identifier resolution - Turns a requested name into candidate names
//!
//! Resolution order is the list of names a lookup tries, first hit wins:
//! 1. Verbatim: the name exactly as given
//! 2. Default schema: as given, then inside a fallback schema
//! 3. Search path: inside each schema of a path, in order
//!
//! Candidates are handed back unqualified where the request was unqualified;
//! the database applies its own identifier defaults to each one.

use crate::identifier::Identifier;

/// Strategy deciding which names to try when looking up an object.
pub trait IdentifierResolutionStrategy: Send + Sync {
    /// Candidate names to try, in order, without duplicates
    fn resolution_order(&self, identifier: &Identifier) -> Vec<Identifier>;
}

/// Resolve names exactly as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimIdentifierResolutionStrategy;

impl IdentifierResolutionStrategy for VerbatimIdentifierResolutionStrategy {
    fn resolution_order(&self, identifier: &Identifier) -> Vec<Identifier> {
        vec![identifier.clone()]
    }
}

/// Resolve unqualified names as given first, then inside a default schema.
///
/// Mirrors SQL Server's own lookup: the caller's default schema, then `dbo`.
#[derive(Debug, Clone)]
pub struct DefaultSchemaIdentifierResolutionStrategy {
    default_schema: String,
}

impl DefaultSchemaIdentifierResolutionStrategy {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }
}

impl IdentifierResolutionStrategy for DefaultSchemaIdentifierResolutionStrategy {
    fn resolution_order(&self, identifier: &Identifier) -> Vec<Identifier> {
        if identifier.schema().is_some() {
            return vec![identifier.clone()];
        }

        let mut order = vec![identifier.clone()];
        if let Ok(in_default) = identifier.in_schema(self.default_schema.clone()) {
            push_unique(&mut order, in_default);
        }
        order
    }
}

/// Resolve unqualified names against each schema of a search path in turn.
#[derive(Debug, Clone)]
pub struct SearchPathIdentifierResolutionStrategy {
    schemas: Vec<String>,
}

impl SearchPathIdentifierResolutionStrategy {
    pub fn new<I, S>(schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemas: schemas.into_iter().map(Into::into).collect(),
        }
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }
}

impl IdentifierResolutionStrategy for SearchPathIdentifierResolutionStrategy {
    fn resolution_order(&self, identifier: &Identifier) -> Vec<Identifier> {
        if identifier.schema().is_some() || self.schemas.is_empty() {
            return vec![identifier.clone()];
        }

        let mut order = Vec::with_capacity(self.schemas.len());
        for schema in &self.schemas {
            match identifier.in_schema(schema.clone()) {
                Ok(candidate) => push_unique(&mut order, candidate),
                Err(e) => tracing::debug!("skipping search path entry {:?}: {}", schema, e),
            }
        }
        order
    }
}

fn push_unique(order: &mut Vec<Identifier>, candidate: Identifier) {
    if !order.contains(&candidate) {
        order.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::parse(name).unwrap()
    }

    #[test]
    fn test_verbatim() {
        let order = VerbatimIdentifierResolutionStrategy.resolution_order(&id("users"));
        assert_eq!(order, vec![id("users")]);
    }

    #[test]
    fn test_default_schema_unqualified() {
        let strategy = DefaultSchemaIdentifierResolutionStrategy::new("dbo");
        let order = strategy.resolution_order(&id("users"));
        assert_eq!(order, vec![id("users"), id("dbo.users")]);
    }

    #[test]
    fn test_default_schema_qualified_is_verbatim() {
        let strategy = DefaultSchemaIdentifierResolutionStrategy::new("dbo");
        let order = strategy.resolution_order(&id("audit.users"));
        assert_eq!(order, vec![id("audit.users")]);
    }

    #[test]
    fn test_search_path() {
        let strategy = SearchPathIdentifierResolutionStrategy::new(["temp", "main", "archive", "main"]);
        let order = strategy.resolution_order(&id("users"));
        assert_eq!(order, vec![id("temp.users"), id("main.users"), id("archive.users")]);

        let order = strategy.resolution_order(&id("archive.users"));
        assert_eq!(order, vec![id("archive.users")]);
    }

    #[test]
    fn test_empty_search_path_falls_back_to_verbatim() {
        let strategy = SearchPathIdentifierResolutionStrategy::new(Vec::<String>::new());
        assert_eq!(strategy.resolution_order(&id("users")), vec![id("users")]);
    }
}
