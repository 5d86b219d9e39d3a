//! Schema object model - typed mirror of catalog concepts
//!
//! Every object is a plain owned value built from catalog rows:
//! - `Table`: columns, keys, indexes, checks and triggers
//! - `View`: definition and columns
//! - `Sequence`, `Synonym`, `Routine`: standalone schema objects
//! - `*Comments`: descriptions attached to the objects above

pub mod types;
pub mod column;
pub mod key;
pub mod check;
pub mod index;
pub mod trigger;
pub mod table;
pub mod view;
pub mod sequence;
pub mod synonym;
pub mod routine;
pub mod comment;

pub use types::{DataType, DbType, NumericPrecision, TypeRequest};
pub use column::{AutoIncrement, Column};
pub use key::{DatabaseKey, KeyType, ReferentialAction, RelationalKey};
pub use check::Check;
pub use index::{Index, IndexColumn, IndexColumnOrder};
pub use trigger::{Trigger, TriggerEvent, TriggerTiming};
pub use table::Table;
pub use view::View;
pub use sequence::{Sequence, SequenceCache};
pub use synonym::Synonym;
pub use routine::{Routine, RoutineKind};
pub use comment::{ObjectComments, TableComments, ViewComments};

use crate::{Error, Result};

/// Reject empty or whitespace-only text for a required field
pub(crate) fn require_text(field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(value)
}
