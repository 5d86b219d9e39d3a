//! Object comments (descriptions)
//!
//! Comment maps are keyed by the local name of the commented child object and
//! keep catalog order. An entry with `None` means the object exists but has
//! no comment.

use crate::identifier::Identifier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Comments on a table and its child objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableComments {
    pub table_name: Identifier,
    pub comment: Option<String>,
    pub primary_key_comment: Option<String>,
    pub column_comments: IndexMap<String, Option<String>>,
    pub check_comments: IndexMap<String, Option<String>>,
    pub unique_key_comments: IndexMap<String, Option<String>>,
    pub foreign_key_comments: IndexMap<String, Option<String>>,
    pub index_comments: IndexMap<String, Option<String>>,
    pub trigger_comments: IndexMap<String, Option<String>>,
}

impl TableComments {
    /// Comments for a table with nothing commented yet
    pub fn new(table_name: Identifier) -> Self {
        Self {
            table_name,
            comment: None,
            primary_key_comment: None,
            column_comments: IndexMap::new(),
            check_comments: IndexMap::new(),
            unique_key_comments: IndexMap::new(),
            foreign_key_comments: IndexMap::new(),
            index_comments: IndexMap::new(),
            trigger_comments: IndexMap::new(),
        }
    }

    pub fn column_comment(&self, column: &str) -> Option<&str> {
        lookup(&self.column_comments, column)
    }

    /// Whether anything at all carries a comment
    pub fn has_comments(&self) -> bool {
        self.comment.is_some()
            || self.primary_key_comment.is_some()
            || [
                &self.column_comments,
                &self.check_comments,
                &self.unique_key_comments,
                &self.foreign_key_comments,
                &self.index_comments,
                &self.trigger_comments,
            ]
            .iter()
            .any(|map| map.values().any(Option::is_some))
    }
}

/// Comments on a view and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewComments {
    pub view_name: Identifier,
    pub comment: Option<String>,
    pub column_comments: IndexMap<String, Option<String>>,
}

impl ViewComments {
    pub fn new(view_name: Identifier) -> Self {
        Self {
            view_name,
            comment: None,
            column_comments: IndexMap::new(),
        }
    }

    pub fn column_comment(&self, column: &str) -> Option<&str> {
        lookup(&self.column_comments, column)
    }
}

/// Comment on an object without children (sequence, synonym, routine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectComments {
    pub name: Identifier,
    pub comment: Option<String>,
}

impl ObjectComments {
    pub fn new(name: Identifier, comment: Option<String>) -> Self {
        Self { name, comment }
    }
}

fn lookup<'a>(map: &'a IndexMap<String, Option<String>>, name: &str) -> Option<&'a str> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, comment)| comment.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_comments() {
        let mut comments = TableComments::new(Identifier::new("users").unwrap());
        assert!(!comments.has_comments());

        comments.column_comments.insert("id".to_string(), None);
        comments
            .column_comments
            .insert("Email".to_string(), Some("Login address".to_string()));
        assert!(comments.has_comments());
        assert_eq!(comments.column_comment("email"), Some("Login address"));
        assert_eq!(comments.column_comment("id"), None);
    }
}
