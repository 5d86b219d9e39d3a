//! Database abstraction - what every provider and composition exposes
//!
//! Providers (`sqlite`, `sqlserver`) query live catalogs. Compositions wrap
//! providers:
//! - `EmptyRelationalDatabase`: finds nothing
//! - `OrderedRelationalDatabase`: first database with a hit wins
//! - `CachedRelationalDatabase`: memoizes every lookup and listing
//! - `snapshot::RelationalDatabaseSnapshot`: everything loaded up front

use crate::cache::{AsyncLazy, KeyedCache};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{ObjectComments, Routine, Sequence, Synonym, Table, TableComments, View, ViewComments};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Read access to the schema objects of one database.
///
/// Lookups return `Ok(None)` when nothing matches; listings are ordered by
/// qualified name.
#[async_trait]
pub trait RelationalDatabase: Send + Sync {
    /// Parts applied to names that omit them
    fn identifier_defaults(&self) -> &IdentifierDefaults;

    async fn get_table(&self, name: &Identifier) -> Result<Option<Table>>;
    async fn get_all_tables(&self) -> Result<Vec<Table>>;

    async fn get_view(&self, name: &Identifier) -> Result<Option<View>>;
    async fn get_all_views(&self) -> Result<Vec<View>>;

    async fn get_sequence(&self, name: &Identifier) -> Result<Option<Sequence>>;
    async fn get_all_sequences(&self) -> Result<Vec<Sequence>>;

    async fn get_synonym(&self, name: &Identifier) -> Result<Option<Synonym>>;
    async fn get_all_synonyms(&self) -> Result<Vec<Synonym>>;

    async fn get_routine(&self, name: &Identifier) -> Result<Option<Routine>>;
    async fn get_all_routines(&self) -> Result<Vec<Routine>>;
}

/// Read access to the comments (descriptions) of one database's objects.
#[async_trait]
pub trait RelationalDatabaseCommentProvider: Send + Sync {
    fn identifier_defaults(&self) -> &IdentifierDefaults;

    async fn get_table_comments(&self, name: &Identifier) -> Result<Option<TableComments>>;
    async fn get_all_table_comments(&self) -> Result<Vec<TableComments>>;

    async fn get_view_comments(&self, name: &Identifier) -> Result<Option<ViewComments>>;
    async fn get_all_view_comments(&self) -> Result<Vec<ViewComments>>;

    async fn get_sequence_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>>;
    async fn get_all_sequence_comments(&self) -> Result<Vec<ObjectComments>>;

    async fn get_synonym_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>>;
    async fn get_all_synonym_comments(&self) -> Result<Vec<ObjectComments>>;

    async fn get_routine_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>>;
    async fn get_all_routine_comments(&self) -> Result<Vec<ObjectComments>>;
}

/// Sort objects by qualified name
pub(crate) fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &Identifier) {
    items.sort_by(|a, b| name(a).cmp(name(b)));
}

// ========== Empty ==========

/// A database with no objects at all.
#[derive(Debug, Clone, Default)]
pub struct EmptyRelationalDatabase {
    defaults: IdentifierDefaults,
}

impl EmptyRelationalDatabase {
    pub fn new(defaults: IdentifierDefaults) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl RelationalDatabase for EmptyRelationalDatabase {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    async fn get_table(&self, _name: &Identifier) -> Result<Option<Table>> {
        Ok(None)
    }

    async fn get_all_tables(&self) -> Result<Vec<Table>> {
        Ok(Vec::new())
    }

    async fn get_view(&self, _name: &Identifier) -> Result<Option<View>> {
        Ok(None)
    }

    async fn get_all_views(&self) -> Result<Vec<View>> {
        Ok(Vec::new())
    }

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

/// A comment provider for engines without object comments.
#[derive(Debug, Clone, Default)]
pub struct EmptyRelationalDatabaseCommentProvider {
    defaults: IdentifierDefaults,
}

impl EmptyRelationalDatabaseCommentProvider {
    pub fn new(defaults: IdentifierDefaults) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl RelationalDatabaseCommentProvider for EmptyRelationalDatabaseCommentProvider {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        &self.defaults
    }

    async fn get_table_comments(&self, _name: &Identifier) -> Result<Option<TableComments>> {
        Ok(None)
    }

    async fn get_all_table_comments(&self) -> Result<Vec<TableComments>> {
        Ok(Vec::new())
    }

    async fn get_view_comments(&self, _name: &Identifier) -> Result<Option<ViewComments>> {
        Ok(None)
    }

    async fn get_all_view_comments(&self) -> Result<Vec<ViewComments>> {
        Ok(Vec::new())
    }

    async fn get_sequence_comments(&self, _name: &Identifier) -> Result<Option<ObjectComments>> {
        Ok(None)
    }

    async fn get_all_sequence_comments(&self) -> Result<Vec<ObjectComments>> {
        Ok(Vec::new())
    }

    async fn get_synonym_comments(&self, _name: &Identifier) -> Result<Option<ObjectComments>> {
        Ok(None)
    }

    async fn get_all_synonym_comments(&self) -> Result<Vec<ObjectComments>> {
        Ok(Vec::new())
    }

    async fn get_routine_comments(&self, _name: &Identifier) -> Result<Option<ObjectComments>> {
        Ok(None)
    }

    async fn get_all_routine_comments(&self) -> Result<Vec<ObjectComments>> {
        Ok(Vec::new())
    }
}

// ========== Ordered ==========

/// Several databases consulted in order; the first one with a match wins.
pub struct OrderedRelationalDatabase {
    databases: Vec<Arc<dyn RelationalDatabase>>,
}

impl OrderedRelationalDatabase {
    pub fn new(databases: Vec<Arc<dyn RelationalDatabase>>) -> Result<Self> {
        if databases.is_empty() {
            return Err(Error::InvalidArgument(
                "an ordered database needs at least one database".to_string(),
            ));
        }
        Ok(Self { databases })
    }

    pub fn databases(&self) -> &[Arc<dyn RelationalDatabase>] {
        &self.databases
    }
}

/// Concatenate listings, dropping later objects whose name was already seen
fn union_first_wins<T>(lists: Vec<Vec<T>>, name: impl Fn(&T) -> &Identifier) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for item in lists.into_iter().flatten() {
        if seen.insert(name(&item).clone()) {
            merged.push(item);
        }
    }
    sort_by_name(&mut merged, name);
    merged
}

#[async_trait]
impl RelationalDatabase for OrderedRelationalDatabase {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        self.databases[0].identifier_defaults()
    }

    async fn get_table(&self, name: &Identifier) -> Result<Option<Table>> {
        for database in &self.databases {
            if let Some(table) = database.get_table(name).await? {
                return Ok(Some(table));
            }
        }
        Ok(None)
    }

    async fn get_all_tables(&self) -> Result<Vec<Table>> {
        let mut lists = Vec::with_capacity(self.databases.len());
        for database in &self.databases {
            lists.push(database.get_all_tables().await?);
        }
        Ok(union_first_wins(lists, |t: &Table| &t.name))
    }

    async fn get_view(&self, name: &Identifier) -> Result<Option<View>> {
        for database in &self.databases {
            if let Some(view) = database.get_view(name).await? {
                return Ok(Some(view));
            }
        }
        Ok(None)
    }

    async fn get_all_views(&self) -> Result<Vec<View>> {
        let mut lists = Vec::with_capacity(self.databases.len());
        for database in &self.databases {
            lists.push(database.get_all_views().await?);
        }
        Ok(union_first_wins(lists, |v: &View| &v.name))
    }

    async fn get_sequence(&self, name: &Identifier) -> Result<Option<Sequence>> {
        for database in &self.databases {
            if let Some(sequence) = database.get_sequence(name).await? {
                return Ok(Some(sequence));
            }
        }
        Ok(None)
    }

    async fn get_all_sequences(&self) -> Result<Vec<Sequence>> {
        let mut lists = Vec::with_capacity(self.databases.len());
        for database in &self.databases {
            lists.push(database.get_all_sequences().await?);
        }
        Ok(union_first_wins(lists, |s: &Sequence| &s.name))
    }

    async fn get_synonym(&self, name: &Identifier) -> Result<Option<Synonym>> {
        for database in &self.databases {
            if let Some(synonym) = database.get_synonym(name).await? {
                return Ok(Some(synonym));
            }
        }
        Ok(None)
    }

    async fn get_all_synonyms(&self) -> Result<Vec<Synonym>> {
        let mut lists = Vec::with_capacity(self.databases.len());
        for database in &self.databases {
            lists.push(database.get_all_synonyms().await?);
        }
        Ok(union_first_wins(lists, |s: &Synonym| &s.name))
    }

    async fn get_routine(&self, name: &Identifier) -> Result<Option<Routine>> {
        for database in &self.databases {
            if let Some(routine) = database.get_routine(name).await? {
                return Ok(Some(routine));
            }
        }
        Ok(None)
    }

    async fn get_all_routines(&self) -> Result<Vec<Routine>> {
        let mut lists = Vec::with_capacity(self.databases.len());
        for database in &self.databases {
            lists.push(database.get_all_routines().await?);
        }
        Ok(union_first_wins(lists, |r: &Routine| &r.name))
    }
}

// ========== Cached ==========

/// Memoizes every lookup (hits and misses) and every listing of a database.
pub struct CachedRelationalDatabase<D> {
    inner: D,
    tables: KeyedCache<Identifier, Option<Table>>,
    all_tables: AsyncLazy<Vec<Table>>,
    views: KeyedCache<Identifier, Option<View>>,
    all_views: AsyncLazy<Vec<View>>,
    sequences: KeyedCache<Identifier, Option<Sequence>>,
    all_sequences: AsyncLazy<Vec<Sequence>>,
    synonyms: KeyedCache<Identifier, Option<Synonym>>,
    all_synonyms: AsyncLazy<Vec<Synonym>>,
    routines: KeyedCache<Identifier, Option<Routine>>,
    all_routines: AsyncLazy<Vec<Routine>>,
}

impl<D: RelationalDatabase> CachedRelationalDatabase<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            tables: KeyedCache::new(),
            all_tables: AsyncLazy::new(),
            views: KeyedCache::new(),
            all_views: AsyncLazy::new(),
            sequences: KeyedCache::new(),
            all_sequences: AsyncLazy::new(),
            synonyms: KeyedCache::new(),
            all_synonyms: AsyncLazy::new(),
            routines: KeyedCache::new(),
            all_routines: AsyncLazy::new(),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: RelationalDatabase> RelationalDatabase for CachedRelationalDatabase<D> {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        self.inner.identifier_defaults()
    }

    async fn get_table(&self, name: &Identifier) -> Result<Option<Table>> {
        self.tables
            .get_or_try_init(name.clone(), || self.inner.get_table(name))
            .await
    }

    async fn get_all_tables(&self) -> Result<Vec<Table>> {
        let tables = self.all_tables.get_or_try_init(|| self.inner.get_all_tables()).await?;
        Ok(tables.clone())
    }

    async fn get_view(&self, name: &Identifier) -> Result<Option<View>> {
        self.views
            .get_or_try_init(name.clone(), || self.inner.get_view(name))
            .await
    }

    async fn get_all_views(&self) -> Result<Vec<View>> {
        let views = self.all_views.get_or_try_init(|| self.inner.get_all_views()).await?;
        Ok(views.clone())
    }

    async fn get_sequence(&self, name: &Identifier) -> Result<Option<Sequence>> {
        self.sequences
            .get_or_try_init(name.clone(), || self.inner.get_sequence(name))
            .await
    }

    async fn get_all_sequences(&self) -> Result<Vec<Sequence>> {
        let sequences = self
            .all_sequences
            .get_or_try_init(|| self.inner.get_all_sequences())
            .await?;
        Ok(sequences.clone())
    }

    async fn get_synonym(&self, name: &Identifier) -> Result<Option<Synonym>> {
        self.synonyms
            .get_or_try_init(name.clone(), || self.inner.get_synonym(name))
            .await
    }

    async fn get_all_synonyms(&self) -> Result<Vec<Synonym>> {
        let synonyms = self
            .all_synonyms
            .get_or_try_init(|| self.inner.get_all_synonyms())
            .await?;
        Ok(synonyms.clone())
    }

    async fn get_routine(&self, name: &Identifier) -> Result<Option<Routine>> {
        self.routines
            .get_or_try_init(name.clone(), || self.inner.get_routine(name))
            .await
    }

    async fn get_all_routines(&self) -> Result<Vec<Routine>> {
        let routines = self
            .all_routines
            .get_or_try_init(|| self.inner.get_all_routines())
            .await?;
        Ok(routines.clone())
    }
}
