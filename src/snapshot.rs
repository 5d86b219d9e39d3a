//! Snapshots - a whole database (or its comments) loaded once, served from memory
//!
//! A snapshot is itself a `RelationalDatabase` / `RelationalDatabaseCommentProvider`,
//! so it can stand in for the live provider it was captured from. Snapshots
//! persist as JSON for offline introspection.

use crate::database::{RelationalDatabase, RelationalDatabaseCommentProvider};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{ObjectComments, Routine, Sequence, Synonym, Table, TableComments, View, ViewComments};
use crate::resolution::{IdentifierResolutionStrategy, VerbatimIdentifierResolutionStrategy};
use crate::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Current snapshot file format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Objects keyed by canonical name, resolved through a strategy.
struct Catalog<T> {
    objects: IndexMap<Identifier, T>,
}

impl<T: Clone> Catalog<T> {
    fn new(items: Vec<T>, name: impl Fn(&T) -> &Identifier) -> Self {
        let mut objects = IndexMap::with_capacity(items.len());
        for item in items {
            objects.insert(name(&item).clone(), item);
        }
        objects.sort_keys();
        Self { objects }
    }

    /// Resolve `name` through the strategy; exact matches win over case-insensitive ones
    fn resolve(
        &self,
        name: &Identifier,
        defaults: &IdentifierDefaults,
        strategy: &dyn IdentifierResolutionStrategy,
    ) -> Option<&T> {
        for candidate in strategy.resolution_order(name) {
            let qualified = defaults.qualify(&candidate);
            if let Some(found) = self.objects.get(&qualified) {
                return Some(found);
            }

            let mut folded = self
                .objects
                .iter()
                .filter(|(key, _)| key.eq_ignore_case(&qualified));
            if let (Some((_, found)), None) = (folded.next(), folded.next()) {
                return Some(found);
            }
        }
        None
    }

    fn all(&self) -> Vec<T> {
        self.objects.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Serializable form of a `RelationalDatabaseSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshotData {
    pub identifier_defaults: IdentifierDefaults,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub sequences: Vec<Sequence>,
    pub synonyms: Vec<Synonym>,
    pub routines: Vec<Routine>,
}

/// Every schema object of a database, captured once.
pub struct RelationalDatabaseSnapshot {
    defaults: IdentifierDefaults,
    strategy: Arc<dyn IdentifierResolutionStrategy>,
    tables: Catalog<Table>,
    views: Catalog<View>,
    sequences: Catalog<Sequence>,
    synonyms: Catalog<Synonym>,
    routines: Catalog<Routine>,
}

impl RelationalDatabaseSnapshot {
    /// Load every object of `database`; the object families load concurrently
    #[tracing::instrument(skip(database))]
    pub async fn capture(database: &dyn RelationalDatabase) -> Result<Self> {
        let (tables, views, sequences, synonyms, routines) = tokio::try_join!(
            database.get_all_tables(),
            database.get_all_views(),
            database.get_all_sequences(),
            database.get_all_synonyms(),
            database.get_all_routines(),
        )?;

        tracing::debug!(
            tables = tables.len(),
            views = views.len(),
            sequences = sequences.len(),
            synonyms = synonyms.len(),
            routines = routines.len(),
            "captured database snapshot"
        );

        Ok(Self::from_data(DatabaseSnapshotData {
            identifier_defaults: database.identifier_defaults().clone(),
            tables,
            views,
            sequences,
            synonyms,
            routines,
        }))
    }

    pub fn from_data(data: DatabaseSnapshotData) -> Self {
        Self {
            defaults: data.identifier_defaults,
            strategy: Arc::new(VerbatimIdentifierResolutionStrategy),
            tables: Catalog::new(data.tables, |t: &Table| &t.name),
            views: Catalog::new(data.views, |v: &View| &v.name),
            sequences: Catalog::new(data.sequences, |s: &Sequence| &s.name),
            synonyms: Catalog::new(data.synonyms, |s: &Synonym| &s.name),
            routines: Catalog::new(data.routines, |r: &Routine| &r.name),
        }
    }

    /// Replace the strategy used to resolve lookups
    pub fn with_strategy(mut self, strategy: Arc<dyn IdentifierResolutionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn to_data(&self) -> DatabaseSnapshotData {
        DatabaseSnapshotData {
            identifier_defaults: self.defaults.clone(),
            tables: self.tables.all(),
            views: self.views.all(),
            sequences: self.sequences.all(),
            synonyms: self.synonyms.all(),
            routines: self.routines.all(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: DatabaseSnapshotData = serde_json::from_str(json)?;
        Ok(Self::from_data(data))
    }

    /// Number of captured objects of every kind
    pub fn object_count(&self) -> usize {
        self.tables.len()
            + self.views.len()
            + self.sequences.len()
            + self.synonyms.len()
            + self.routines.len()
    }
}

#[async_trait]
impl RelationalDatabase for RelationalDatabaseSnapshot {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    async fn get_table(&self, name: &Identifier) -> Result<Option<Table>> {
        Ok(self.tables.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_tables(&self) -> Result<Vec<Table>> {
        Ok(self.tables.all())
    }

    async fn get_view(&self, name: &Identifier) -> Result<Option<View>> {
        Ok(self.views.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_views(&self) -> Result<Vec<View>> {
        Ok(self.views.all())
    }

    async fn get_sequence(&self, name: &Identifier) -> Result<Option<Sequence>> {
        Ok(self.sequences.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_sequences(&self) -> Result<Vec<Sequence>> {
        Ok(self.sequences.all())
    }

    async fn get_synonym(&self, name: &Identifier) -> Result<Option<Synonym>> {
        Ok(self.synonyms.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_synonyms(&self) -> Result<Vec<Synonym>> {
        Ok(self.synonyms.all())
    }

    async fn get_routine(&self, name: &Identifier) -> Result<Option<Routine>> {
        Ok(self.routines.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_routines(&self) -> Result<Vec<Routine>> {
        Ok(self.routines.all())
    }
}

/// Serializable form of a `CommentSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSnapshotData {
    pub identifier_defaults: IdentifierDefaults,
    pub tables: Vec<TableComments>,
    pub views: Vec<ViewComments>,
    pub sequences: Vec<ObjectComments>,
    pub synonyms: Vec<ObjectComments>,
    pub routines: Vec<ObjectComments>,
}

/// Every object comment of a database, captured once.
pub struct CommentSnapshot {
    defaults: IdentifierDefaults,
    strategy: Arc<dyn IdentifierResolutionStrategy>,
    tables: Catalog<TableComments>,
    views: Catalog<ViewComments>,
    sequences: Catalog<ObjectComments>,
    synonyms: Catalog<ObjectComments>,
    routines: Catalog<ObjectComments>,
}

impl CommentSnapshot {
    #[tracing::instrument(skip(provider))]
    pub async fn capture(provider: &dyn RelationalDatabaseCommentProvider) -> Result<Self> {
        let (tables, views, sequences, synonyms, routines) = tokio::try_join!(
            provider.get_all_table_comments(),
            provider.get_all_view_comments(),
            provider.get_all_sequence_comments(),
            provider.get_all_synonym_comments(),
            provider.get_all_routine_comments(),
        )?;

        Ok(Self::from_data(CommentSnapshotData {
            identifier_defaults: provider.identifier_defaults().clone(),
            tables,
            views,
            sequences,
            synonyms,
            routines,
        }))
    }

    pub fn from_data(data: CommentSnapshotData) -> Self {
        Self {
            defaults: data.identifier_defaults,
            strategy: Arc::new(VerbatimIdentifierResolutionStrategy),
            tables: Catalog::new(data.tables, |c: &TableComments| &c.table_name),
            views: Catalog::new(data.views, |c: &ViewComments| &c.view_name),
            sequences: Catalog::new(data.sequences, |c: &ObjectComments| &c.name),
            synonyms: Catalog::new(data.synonyms, |c: &ObjectComments| &c.name),
            routines: Catalog::new(data.routines, |c: &ObjectComments| &c.name),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn IdentifierResolutionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn to_data(&self) -> CommentSnapshotData {
        CommentSnapshotData {
            identifier_defaults: self.defaults.clone(),
            tables: self.tables.all(),
            views: self.views.all(),
            sequences: self.sequences.all(),
            synonyms: self.synonyms.all(),
            routines: self.routines.all(),
        }
    }
}

#[async_trait]
impl RelationalDatabaseCommentProvider for CommentSnapshot {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    async fn get_table_comments(&self, name: &Identifier) -> Result<Option<TableComments>> {
        Ok(self.tables.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_table_comments(&self) -> Result<Vec<TableComments>> {
        Ok(self.tables.all())
    }

    async fn get_view_comments(&self, name: &Identifier) -> Result<Option<ViewComments>> {
        Ok(self.views.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_view_comments(&self) -> Result<Vec<ViewComments>> {
        Ok(self.views.all())
    }

    async fn get_sequence_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>> {
        Ok(self.sequences.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_sequence_comments(&self) -> Result<Vec<ObjectComments>> {
        Ok(self.sequences.all())
    }

    async fn get_synonym_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>> {
        Ok(self.synonyms.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_synonym_comments(&self) -> Result<Vec<ObjectComments>> {
        Ok(self.synonyms.all())
    }

    async fn get_routine_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>> {
        Ok(self.routines.resolve(name, &self.defaults, self.strategy.as_ref()).cloned())
    }

    async fn get_all_routine_comments(&self) -> Result<Vec<ObjectComments>> {
        Ok(self.routines.all())
    }
}

/// On-disk snapshot: structure and comments of one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub version: u32,
    pub dialect: String,
    /// Schemas unqualified names were searched in, in order; empty when the
    /// source resolved names against a single default schema
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_path: Vec<String>,
    pub database: DatabaseSnapshotData,
    pub comments: CommentSnapshotData,
}

impl SnapshotFile {
    pub async fn capture(
        dialect: &str,
        database: &dyn RelationalDatabase,
        comments: &dyn RelationalDatabaseCommentProvider,
    ) -> Result<Self> {
        let (database, comments) = tokio::try_join!(
            RelationalDatabaseSnapshot::capture(database),
            CommentSnapshot::capture(comments),
        )?;

        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            dialect: dialect.to_string(),
            search_path: Vec::new(),
            database: database.to_data(),
            comments: comments.to_data(),
        })
    }

    pub fn with_search_path(mut self, search_path: Vec<String>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Distinct schemas of the captured tables and views, in name order
    pub fn captured_schemas(&self) -> Vec<String> {
        let mut schemas: Vec<String> = Vec::new();
        let names = self
            .database
            .tables
            .iter()
            .map(|t| &t.name)
            .chain(self.database.views.iter().map(|v| &v.name));
        for name in names {
            if let Some(schema) = name.schema() {
                if !schemas.iter().any(|s| s == schema) {
                    schemas.push(schema.to_string());
                }
            }
        }
        schemas.sort();
        schemas
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: SnapshotFile = serde_json::from_str(&contents)?;
        if file.version != SNAPSHOT_FORMAT_VERSION {
            return Err(crate::Error::Parse(format!(
                "unsupported snapshot version {} in {}",
                file.version,
                path.display()
            )));
        }
        Ok(file)
    }

    /// Split into servable snapshots
    pub fn into_snapshots(self) -> (RelationalDatabaseSnapshot, CommentSnapshot) {
        (
            RelationalDatabaseSnapshot::from_data(self.database),
            CommentSnapshot::from_data(self.comments),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::{sample_table, FixedDatabase};
    use crate::resolution::SearchPathIdentifierResolutionStrategy;
    use std::sync::atomic::Ordering;

    fn id(name: &str) -> Identifier {
        Identifier::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_capture_serves_from_memory() {
        let source = FixedDatabase::new(vec![sample_table("main.users"), sample_table("main.orders")]);
        let snapshot = RelationalDatabaseSnapshot::capture(&source).await.unwrap();
        let calls_after_capture = source.calls.load(Ordering::SeqCst);

        assert!(snapshot.get_table(&id("users")).await.unwrap().is_some());
        assert!(snapshot.get_table(&id("main.orders")).await.unwrap().is_some());
        assert!(snapshot.get_table(&id("missing")).await.unwrap().is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), calls_after_capture);

        let names: Vec<String> = snapshot
            .get_all_tables()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["main.orders", "main.users"]);
        assert_eq!(snapshot.object_count(), 2);
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_case_insensitive() {
        let source = FixedDatabase::new(vec![sample_table("main.Users")]);
        let snapshot = RelationalDatabaseSnapshot::capture(&source).await.unwrap();

        let found = snapshot.get_table(&id("USERS")).await.unwrap().unwrap();
        assert_eq!(found.name.local_name(), "Users");
    }

    #[tokio::test]
    async fn test_strategy_controls_resolution() {
        let source = FixedDatabase::new(vec![sample_table("archive.users")]);
        let snapshot = RelationalDatabaseSnapshot::capture(&source).await.unwrap();
        assert!(snapshot.get_table(&id("users")).await.unwrap().is_none());

        let snapshot = snapshot.with_strategy(Arc::new(SearchPathIdentifierResolutionStrategy::new([
            "main", "archive",
        ])));
        let found = snapshot.get_table(&id("users")).await.unwrap().unwrap();
        assert_eq!(found.name.to_string(), "archive.users");
    }

    #[tokio::test]
    async fn test_json_roundtrip_keeps_lookups() {
        let source = FixedDatabase::new(vec![sample_table("main.users")]);
        let snapshot = RelationalDatabaseSnapshot::capture(&source).await.unwrap();

        let restored = RelationalDatabaseSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored.identifier_defaults().schema.as_deref(), Some("main"));
        assert_eq!(
            restored.get_table(&id("users")).await.unwrap(),
            snapshot.get_table(&id("users")).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_comment_snapshot() {
        let mut users = TableComments::new(id("main.users"));
        users.comment = Some("Registered accounts".to_string());

        let snapshot = CommentSnapshot::from_data(CommentSnapshotData {
            identifier_defaults: IdentifierDefaults::with_schema("main"),
            tables: vec![users],
            views: Vec::new(),
            sequences: Vec::new(),
            synonyms: Vec::new(),
            routines: Vec::new(),
        });

        let found = snapshot.get_table_comments(&id("users")).await.unwrap().unwrap();
        assert_eq!(found.comment.as_deref(), Some("Registered accounts"));
        assert!(snapshot.get_view_comments(&id("users")).await.unwrap().is_none());
        assert_eq!(snapshot.get_all_table_comments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");

        let source = FixedDatabase::new(vec![sample_table("main.users")]);
        let comments = crate::database::EmptyRelationalDatabaseCommentProvider::default();
        let file = SnapshotFile::capture("sqlite", &source, &comments).await.unwrap();
        file.save(&path).unwrap();

        let loaded = SnapshotFile::load(&path).unwrap();
        assert_eq!(loaded.dialect, "sqlite");
        assert!(loaded.search_path.is_empty());
        assert_eq!(loaded.captured_schemas(), vec!["main"]);
        let (database, _) = loaded.into_snapshots();
        assert!(database.get_table(&id("users")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_snapshot_file_keeps_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");

        let source = FixedDatabase::new(vec![sample_table("main.users"), sample_table("audit.events")]);
        let comments = crate::database::EmptyRelationalDatabaseCommentProvider::default();
        let file = SnapshotFile::capture("sqlite", &source, &comments)
            .await
            .unwrap()
            .with_search_path(vec!["main".to_string(), "audit".to_string()]);
        file.save(&path).unwrap();

        let loaded = SnapshotFile::load(&path).unwrap();
        assert_eq!(loaded.search_path, vec!["main", "audit"]);
        assert_eq!(loaded.captured_schemas(), vec!["audit", "main"]);
    }
}
