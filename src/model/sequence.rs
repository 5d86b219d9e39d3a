//! Sequences

use crate::identifier::Identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Caching behaviour of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceCache {
    /// Values are not cached
    Disabled,
    /// Cached, with an engine-chosen size
    Unknown,
    Size(u32),
}

impl std::fmt::Display for SequenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceCache::Disabled => write!(f, "no cache"),
            SequenceCache::Unknown => write!(f, "cache"),
            SequenceCache::Size(n) => write!(f, "cache {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: Identifier,
    pub start: i64,
    pub increment: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
    pub cache: SequenceCache,
}

impl Sequence {
    pub fn new(
        name: Identifier,
        start: i64,
        increment: i64,
        min_value: Option<i64>,
        max_value: Option<i64>,
        cycle: bool,
        cache: SequenceCache,
    ) -> Result<Self> {
        if increment == 0 {
            return Err(Error::InvalidArgument(format!(
                "sequence {} must not have a zero increment",
                name
            )));
        }
        if let (Some(min), Some(max)) = (min_value, max_value) {
            if min > max {
                return Err(Error::InvalidArgument(format!(
                    "sequence {} has minimum {} above maximum {}",
                    name, min, max
                )));
            }
        }
        Ok(Self {
            name,
            start,
            increment,
            min_value,
            max_value,
            cycle,
            cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_guards() {
        let name = Identifier::qualified("dbo", "order_numbers").unwrap();
        assert!(Sequence::new(name.clone(), 1, 0, None, None, false, SequenceCache::Disabled).is_err());
        assert!(Sequence::new(name.clone(), 1, 1, Some(10), Some(5), false, SequenceCache::Disabled).is_err());

        let seq = Sequence::new(name, 1000, 1, Some(1), Some(i64::MAX), true, SequenceCache::Size(50)).unwrap();
        assert_eq!(seq.cache.to_string(), "cache 50");
    }
}
