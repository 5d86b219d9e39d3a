//! Check constraints

use crate::identifier::Identifier;
use crate::Result;
use serde::{Deserialize, Serialize};

/// A CHECK constraint on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: Option<Identifier>,
    /// The boolean expression, without the surrounding `CHECK (...)`
    pub definition: String,
    pub is_enabled: bool,
}

impl Check {
    pub fn new(name: Option<Identifier>, definition: impl Into<String>, is_enabled: bool) -> Result<Self> {
        Ok(Self {
            name,
            definition: super::require_text("check definition", definition.into())?,
            is_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_requires_definition() {
        assert!(Check::new(None, "", true).is_err());
        let check = Check::new(Identifier::new("ck_positive").ok(), "qty > 0", true).unwrap();
        assert_eq!(check.definition, "qty > 0");
    }
}
