//! Triggers

use crate::identifier::Identifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// When a trigger fires relative to the triggering statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

/// Data modification that fires a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

impl FromStr for TriggerEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "INSERT" => Ok(TriggerEvent::Insert),
            "UPDATE" => Ok(TriggerEvent::Update),
            "DELETE" => Ok(TriggerEvent::Delete),
            _ => Err(Error::InvalidArgument(format!("Unknown trigger event: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: Identifier,
    pub definition: String,
    pub timing: TriggerTiming,
    pub events: BTreeSet<TriggerEvent>,
    pub is_enabled: bool,
}

impl Trigger {
    pub fn new(
        name: Identifier,
        definition: impl Into<String>,
        timing: TriggerTiming,
        events: BTreeSet<TriggerEvent>,
        is_enabled: bool,
    ) -> Result<Self> {
        if events.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "trigger {} must fire on at least one event",
                name
            )));
        }
        Ok(Self {
            name,
            definition: super::require_text("trigger definition", definition.into())?,
            timing,
            events,
            is_enabled,
        })
    }

    /// Events joined for display, e.g. `INSERT OR UPDATE`
    pub fn events_label(&self) -> String {
        self.events
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}
