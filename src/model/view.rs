//! Views

use super::column::Column;
use crate::identifier::Identifier;
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: Identifier,
    /// The view's defining statement as stored by the engine
    pub definition: String,
    pub columns: Vec<Column>,
    /// Indexed (SQL Server) or otherwise persisted view
    pub is_materialized: bool,
}

impl View {
    pub fn new(name: Identifier, definition: impl Into<String>, columns: Vec<Column>, is_materialized: bool) -> Result<Self> {
        Ok(Self {
            name,
            definition: super::require_text("view definition", definition.into())?,
            columns,
            is_materialized,
        })
    }

    /// Find a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
