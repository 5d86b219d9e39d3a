//! Synonyms

use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};

/// An alias for another object, possibly on another database or server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub name: Identifier,
    pub target: Identifier,
}

impl Synonym {
    pub fn new(name: Identifier, target: Identifier) -> Self {
        Self { name, target }
    }
}
