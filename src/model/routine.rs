//! Stored procedures and functions

use crate::identifier::Identifier;
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "procedure",
            RoutineKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: Identifier,
    pub kind: RoutineKind,
    pub definition: String,
}

impl Routine {
    pub fn new(name: Identifier, kind: RoutineKind, definition: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name,
            kind,
            definition: super::require_text("routine definition", definition.into())?,
        })
    }
}
