//! `MS_Description` extended properties as comments

use super::catalog::ObjectResolver;
use super::connection::SqlServerConnection;
use super::mapping;
use super::queries;
use super::rows::{decode_all, CommentRow, ObjectCommentRow, ObjectRow};
use crate::database::{sort_by_name, RelationalDatabaseCommentProvider};
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{ObjectComments, TableComments, ViewComments};
use crate::resolution::IdentifierResolutionStrategy;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads comments from the `MS_Description` extended property of each object.
#[derive(Debug, Clone)]
pub struct SqlServerRelationalDatabaseCommentProvider {
    resolver: ObjectResolver,
}

impl SqlServerRelationalDatabaseCommentProvider {
    pub async fn new(connection: Arc<SqlServerConnection>) -> Result<Self> {
        let defaults = connection.identifier_defaults().await?;
        Ok(Self {
            resolver: ObjectResolver::new(connection, defaults),
        })
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.resolver = self.resolver.with_default_schema(schema);
        self
    }

    /// Replace the strategy used to resolve lookups
    pub fn with_strategy(mut self, strategy: Arc<dyn IdentifierResolutionStrategy>) -> Self {
        self.resolver = self.resolver.with_strategy(strategy);
        self
    }

    async fn comment_rows(&self, sql: &str, object: &ObjectRow) -> Result<Vec<CommentRow>> {
        let rows = self.resolver.connection().query(sql, &[&object.object_id]).await?;
        decode_all(&rows, CommentRow::from_row)
    }

    async fn table_comments(&self, object: &ObjectRow) -> Result<TableComments> {
        let name = mapping::object_name(self.resolver.defaults(), &object.schema_name, &object.name)?;
        let rows = self.comment_rows(queries::TABLE_COMMENTS, object).await?;
        Ok(mapping::table_comments(name, rows))
    }

    async fn view_comments(&self, object: &ObjectRow) -> Result<ViewComments> {
        let name = mapping::object_name(self.resolver.defaults(), &object.schema_name, &object.name)?;
        let rows = self.comment_rows(queries::VIEW_COMMENTS, object).await?;
        Ok(mapping::view_comments(name, rows))
    }

    async fn object_comments(&self, name: &Identifier, types: &str) -> Result<Option<ObjectComments>> {
        let sql = queries::object_comments(types, true);
        match self.resolver.first_row(name, &sql).await? {
            Some(row) => Ok(Some(mapping::object_comments(
                self.resolver.defaults(),
                ObjectCommentRow::from_row(&row)?,
            )?)),
            None => Ok(None),
        }
    }

    async fn all_object_comments(&self, types: &str) -> Result<Vec<ObjectComments>> {
        let rows = self
            .resolver
            .connection()
            .query(&queries::object_comments(types, false), &[])
            .await?;
        let mut comments = decode_all(&rows, ObjectCommentRow::from_row)?
            .into_iter()
            .map(|row| mapping::object_comments(self.resolver.defaults(), row))
            .collect::<Result<Vec<_>>>()?;
        sort_by_name(&mut comments, |c| &c.name);
        Ok(comments)
    }
}

#[async_trait]
impl RelationalDatabaseCommentProvider for SqlServerRelationalDatabaseCommentProvider {
    fn identifier_defaults(&self) -> &IdentifierDefaults {
        self.resolver.defaults()
    }

    async fn get_table_comments(&self, name: &Identifier) -> Result<Option<TableComments>> {
        match self.resolver.object(name, queries::TABLE_TYPES).await? {
            Some(object) => Ok(Some(self.table_comments(&object).await?)),
            None => Ok(None),
        }
    }

    async fn get_all_table_comments(&self) -> Result<Vec<TableComments>> {
        let mut comments = Vec::new();
        for object in self.resolver.objects(queries::TABLE_TYPES).await? {
            comments.push(self.table_comments(&object).await?);
        }
        sort_by_name(&mut comments, |c| &c.table_name);
        Ok(comments)
    }

    async fn get_view_comments(&self, name: &Identifier) -> Result<Option<ViewComments>> {
        match self.resolver.object(name, queries::VIEW_TYPES).await? {
            Some(object) => Ok(Some(self.view_comments(&object).await?)),
            None => Ok(None),
        }
    }

    async fn get_all_view_comments(&self) -> Result<Vec<ViewComments>> {
        let mut comments = Vec::new();
        for object in self.resolver.objects(queries::VIEW_TYPES).await? {
            comments.push(self.view_comments(&object).await?);
        }
        sort_by_name(&mut comments, |c| &c.view_name);
        Ok(comments)
    }

    async fn get_sequence_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>> {
        self.object_comments(name, queries::SEQUENCE_TYPES).await
    }

    async fn get_all_sequence_comments(&self) -> Result<Vec<ObjectComments>> {
        self.all_object_comments(queries::SEQUENCE_TYPES).await
    }

    async fn get_synonym_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>> {
        self.object_comments(name, queries::SYNONYM_TYPES).await
    }

    async fn get_all_synonym_comments(&self) -> Result<Vec<ObjectComments>> {
        self.all_object_comments(queries::SYNONYM_TYPES).await
    }

    async fn get_routine_comments(&self, name: &Identifier) -> Result<Option<ObjectComments>> {
        self.object_comments(name, queries::ROUTINE_TYPES).await
    }

    async fn get_all_routine_comments(&self) -> Result<Vec<ObjectComments>> {
        self.all_object_comments(queries::ROUTINE_TYPES).await
    }
}
