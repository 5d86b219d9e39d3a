//! Catalog rows to schema objects
//!
//! Pure functions over decoded rows; the provider only fetches.

use super::dialect::SqlServerDialect;
use super::rows::{
    CheckRow, ColumnRow, CommentRow, ForeignKeyColumnRow, IndexColumnRow, KeyColumnRow,
    ObjectCommentRow, RoutineRow, SequenceRow, SynonymRow, TriggerRow,
};
use crate::dialect::DatabaseDialect;
use crate::identifier::{Identifier, IdentifierDefaults};
use crate::model::{
    AutoIncrement, Check, Column, DatabaseKey, Index, IndexColumn, IndexColumnOrder, KeyType,
    NumericPrecision, ObjectComments, ReferentialAction, Routine, RoutineKind, Sequence,
    SequenceCache, Synonym, TableComments, Trigger, TriggerEvent, TriggerTiming, TypeRequest,
    ViewComments,
};
use crate::{Error, Result};
use std::collections::BTreeSet;

/// Split rows into runs sharing a key; catalog queries order rows by that key
pub(crate) fn group_by<T, K: PartialEq>(rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<Vec<T>> {
    let mut groups: Vec<Vec<T>> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some(group) if key(&group[0]) == key(&row) => group.push(row),
            _ => groups.push(vec![row]),
        }
    }
    groups
}

/// Canonical name of a schema object on this connection
pub(crate) fn object_name(defaults: &IdentifierDefaults, schema: &str, name: &str) -> Result<Identifier> {
    Ok(defaults.qualify(&Identifier::qualified(schema, name)?))
}

fn find_columns(columns: &[Column], names: &[&str]) -> Result<Vec<Column>> {
    names
        .iter()
        .map(|name| {
            columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| Error::Catalog(format!("key column {} not found", name)))
        })
        .collect()
}

pub(crate) fn column(dialect: &SqlServerDialect, row: ColumnRow) -> Result<Column> {
    let base_name = row.base_type_name.as_deref().unwrap_or(&row.type_name);
    let needs_precision = matches!(
        base_name.to_ascii_lowercase().as_str(),
        "decimal" | "numeric" | "datetime2" | "datetimeoffset" | "time"
    );
    let precision = match (row.precision, row.scale) {
        (Some(p), Some(s)) if needs_precision => Some(NumericPrecision::new(p, s)?),
        _ => None,
    };
    let collation = row.collation_name.as_deref().map(Identifier::new).transpose()?;

    let request = TypeRequest::new(Identifier::new(base_name)?)
        .with_max_length(row.max_length)
        .with_precision(precision)
        .with_collation(collation);
    let mut db_type = dialect.type_for(&request);
    if row.is_user_defined {
        db_type.type_name = match row.type_schema.as_deref() {
            Some(schema) => Identifier::qualified(schema, &row.type_name)?,
            None => Identifier::new(&row.type_name)?,
        };
    }

    let auto_increment = match (row.identity_seed, row.identity_increment) {
        (Some(seed), Some(increment)) => Some(AutoIncrement::new(seed, increment)?),
        _ => None,
    };

    Ok(Column::new(row.name, db_type, row.is_nullable)?
        .with_default(row.default_definition)
        .with_computed_definition(row.computed_definition)
        .with_auto_increment(auto_increment))
}

/// Primary key and unique keys from their column rows
pub(crate) fn keys(rows: Vec<KeyColumnRow>, columns: &[Column]) -> Result<(Option<DatabaseKey>, Vec<DatabaseKey>)> {
    let mut primary_key = None;
    let mut unique_keys = Vec::new();

    for group in group_by(rows, |r| r.key_name.clone()) {
        let first = &group[0];
        let key_type = match first.key_type.trim() {
            "PK" => KeyType::Primary,
            "UQ" => KeyType::Unique,
            other => {
                tracing::warn!(key = %first.key_name, key_type = other, "skipping key of unknown type");
                continue;
            }
        };
        let names: Vec<&str> = group.iter().map(|r| r.column_name.as_str()).collect();
        let key = DatabaseKey::new(
            Some(Identifier::new(&first.key_name)?),
            key_type,
            find_columns(columns, &names)?,
            !first.is_disabled,
        )?;
        match key_type {
            KeyType::Primary => primary_key = Some(key),
            _ => unique_keys.push(key),
        }
    }

    Ok((primary_key, unique_keys))
}

pub(crate) fn indexes(
    dialect: &SqlServerDialect,
    schema: &str,
    rows: Vec<IndexColumnRow>,
    columns: &[Column],
) -> Result<Vec<Index>> {
    let mut indexes = Vec::new();
    for group in group_by(rows, |r| r.index_name.clone()) {
        let first = &group[0];
        let mut key_columns = Vec::new();
        let mut included = Vec::new();

        for row in &group {
            let column = find_columns(columns, &[row.column_name.as_str()])?;
            if row.is_included {
                included.extend(column);
                continue;
            }
            let order = if row.is_descending {
                IndexColumnOrder::Descending
            } else {
                IndexColumnOrder::Ascending
            };
            key_columns.push(IndexColumn::new(
                dialect.quote_identifier(&row.column_name),
                order,
                column,
            )?);
        }

        if key_columns.is_empty() {
            continue;
        }
        indexes.push(Index::new(
            Identifier::qualified(schema, &first.index_name)?,
            first.is_unique,
            key_columns,
            included,
            !first.is_disabled,
        )?);
    }
    Ok(indexes)
}

pub(crate) fn checks(rows: Vec<CheckRow>) -> Result<Vec<Check>> {
    rows.into_iter()
        .map(|row| Check::new(Some(Identifier::new(row.name)?), row.definition, !row.is_disabled))
        .collect()
}

pub(crate) fn triggers(schema: &str, rows: Vec<TriggerRow>) -> Result<Vec<Trigger>> {
    let mut triggers = Vec::new();
    for group in group_by(rows, |r| r.name.clone()) {
        let events = group
            .iter()
            .map(|r| r.event_name.parse::<TriggerEvent>())
            .collect::<Result<BTreeSet<_>>>()?;
        let first = &group[0];
        let timing = if first.is_instead_of {
            TriggerTiming::InsteadOf
        } else {
            TriggerTiming::After
        };
        triggers.push(Trigger::new(
            Identifier::qualified(schema, &first.name)?,
            first.definition.clone(),
            timing,
            events,
            !first.is_disabled,
        )?);
    }
    Ok(triggers)
}

/// `delete_referential_action` / `update_referential_action` codes
pub(crate) fn referential_action(code: i32) -> ReferentialAction {
    match code {
        1 => ReferentialAction::Cascade,
        2 => ReferentialAction::SetNull,
        3 => ReferentialAction::SetDefault,
        _ => ReferentialAction::NoAction,
    }
}

/// Foreign key constraints, one column run per key
pub(crate) fn foreign_key_groups(rows: Vec<ForeignKeyColumnRow>) -> Vec<Vec<ForeignKeyColumnRow>> {
    group_by(rows, |r| (r.child_object_id, r.key_name.clone()))
}

/// Child side of a foreign key
pub(crate) fn foreign_key(group: &[ForeignKeyColumnRow], child_columns: &[Column]) -> Result<DatabaseKey> {
    let first = group
        .first()
        .ok_or_else(|| Error::Catalog("foreign key without columns".to_string()))?;
    let names: Vec<&str> = group.iter().map(|r| r.column_name.as_str()).collect();
    DatabaseKey::new(
        Some(Identifier::new(&first.key_name)?),
        KeyType::Foreign,
        find_columns(child_columns, &names)?,
        !first.is_disabled,
    )
}

pub(crate) fn sequence(defaults: &IdentifierDefaults, row: SequenceRow) -> Result<Sequence> {
    let cache = match (row.is_cached, row.cache_size) {
        (false, _) => SequenceCache::Disabled,
        (true, Some(size)) if size > 0 => SequenceCache::Size(size as u32),
        (true, _) => SequenceCache::Unknown,
    };
    Sequence::new(
        object_name(defaults, &row.schema_name, &row.name)?,
        row.start_value,
        row.increment,
        row.minimum_value,
        row.maximum_value,
        row.is_cycling,
        cache,
    )
}

/// Synonym whose target is qualified with the connection defaults
pub(crate) fn synonym(defaults: &IdentifierDefaults, row: SynonymRow) -> Result<Synonym> {
    let target = Identifier::parse(&row.base_object_name)?;
    Ok(Synonym::new(
        object_name(defaults, &row.schema_name, &row.name)?,
        defaults.qualify(&target),
    ))
}

/// `None` for encrypted modules, which expose no definition
pub(crate) fn routine(defaults: &IdentifierDefaults, row: RoutineRow) -> Result<Option<Routine>> {
    let Some(definition) = row.definition.filter(|d| !d.trim().is_empty()) else {
        tracing::warn!(routine = %row.name, "skipping routine without a readable definition");
        return Ok(None);
    };
    let kind = match row.object_type.trim() {
        "P" => RoutineKind::Procedure,
        _ => RoutineKind::Function,
    };
    Ok(Some(Routine::new(
        object_name(defaults, &row.schema_name, &row.name)?,
        kind,
        definition,
    )?))
}

pub(crate) fn table_comments(table_name: Identifier, rows: Vec<CommentRow>) -> TableComments {
    let mut comments = TableComments::new(table_name);
    for row in rows {
        let comment = row.comment.filter(|c| !c.trim().is_empty());
        let Some(child) = row.child_name else {
            comments.comment = comment;
            continue;
        };
        match row.kind.trim() {
            "COLUMN" => {
                comments.column_comments.insert(child, comment);
            }
            "CHECK" => {
                comments.check_comments.insert(child, comment);
            }
            "PK" => comments.primary_key_comment = comment,
            "UQ" => {
                comments.unique_key_comments.insert(child, comment);
            }
            "FK" => {
                comments.foreign_key_comments.insert(child, comment);
            }
            "INDEX" => {
                comments.index_comments.insert(child, comment);
            }
            "TRIGGER" => {
                comments.trigger_comments.insert(child, comment);
            }
            other => tracing::warn!(kind = other, "ignoring comment on unknown object kind"),
        }
    }
    comments
}

pub(crate) fn view_comments(view_name: Identifier, rows: Vec<CommentRow>) -> ViewComments {
    let mut comments = ViewComments::new(view_name);
    for row in rows {
        let comment = row.comment.filter(|c| !c.trim().is_empty());
        match row.child_name {
            Some(child) => {
                comments.column_comments.insert(child, comment);
            }
            None => comments.comment = comment,
        }
    }
    comments
}

pub(crate) fn object_comments(defaults: &IdentifierDefaults, row: ObjectCommentRow) -> Result<ObjectComments> {
    Ok(ObjectComments::new(
        object_name(defaults, &row.schema_name, &row.name)?,
        row.comment.filter(|c| !c.trim().is_empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;

    fn defaults() -> IdentifierDefaults {
        IdentifierDefaults::new(Some("srv".into()), Some("sales".into()), Some("dbo".into()))
    }

    fn column_row(name: &str, type_name: &str, max_length: i32) -> ColumnRow {
        ColumnRow {
            name: name.to_string(),
            type_schema: Some("sys".to_string()),
            type_name: type_name.to_string(),
            base_type_name: Some(type_name.to_string()),
            max_length: Some(max_length),
            is_nullable: true,
            ..Default::default()
        }
    }

    fn columns() -> Vec<Column> {
        let dialect = SqlServerDialect::new();
        vec![
            column(&dialect, column_row("id", "int", 4)).unwrap(),
            column(&dialect, column_row("email", "nvarchar", 200)).unwrap(),
            column(&dialect, column_row("region", "char", 2)).unwrap(),
        ]
    }

    #[test]
    fn test_column_mapping() {
        let dialect = SqlServerDialect::new();
        let mut row = column_row("id", "int", 4);
        row.identity_seed = Some(100);
        row.identity_increment = Some(5);
        row.default_definition = Some("((0))".to_string());
        let id = column(&dialect, row).unwrap();
        assert_eq!(id.auto_increment, Some(AutoIncrement::new(100, 5).unwrap()));
        assert_eq!(id.db_type.data_type, DataType::Integer);
        assert_eq!(id.default_value.as_deref(), Some("((0))"));

        let mut row = column_row("code", "PostalCode", 20);
        row.type_schema = Some("app".to_string());
        row.base_type_name = Some("varchar".to_string());
        row.is_user_defined = true;
        let code = column(&dialect, row).unwrap();
        assert_eq!(code.db_type.type_name.to_string(), "app.PostalCode");
        assert_eq!(code.db_type.definition, "varchar(20)");

        let mut row = column_row("amount", "decimal", 9);
        row.precision = Some(18);
        row.scale = Some(2);
        let amount = column(&dialect, row).unwrap();
        assert_eq!(amount.db_type.definition, "decimal(18, 2)");
    }

    #[test]
    fn test_keys_grouped_by_constraint() {
        let rows = vec![
            KeyColumnRow {
                key_name: "PK_users".into(),
                key_type: "PK".into(),
                column_name: "id".into(),
                is_disabled: false,
            },
            KeyColumnRow {
                key_name: "UQ_users_email".into(),
                key_type: "UQ".into(),
                column_name: "email".into(),
                is_disabled: false,
            },
            KeyColumnRow {
                key_name: "UQ_users_email".into(),
                key_type: "UQ".into(),
                column_name: "region".into(),
                is_disabled: true,
            },
        ];
        let (pk, unique) = keys(rows, &columns()).unwrap();
        assert!(pk.unwrap().has_columns(&["id"]));
        assert_eq!(unique.len(), 1);
        assert!(unique[0].has_columns(&["email", "region"]));
        assert!(unique[0].is_enabled);
    }

    #[test]
    fn test_indexes_split_included_columns() {
        let row = |column: &str, included: bool| IndexColumnRow {
            index_name: "IX_users_region".into(),
            is_unique: false,
            is_disabled: false,
            column_name: column.into(),
            is_descending: !included,
            is_included: included,
        };
        let indexes = indexes(
            &SqlServerDialect::new(),
            "dbo",
            vec![row("region", false), row("email", true)],
            &columns(),
        )
        .unwrap();

        let index = &indexes[0];
        assert_eq!(index.name.to_string(), "dbo.IX_users_region");
        assert_eq!(index.columns[0].expression, "[region]");
        assert_eq!(index.columns[0].order, IndexColumnOrder::Descending);
        assert_eq!(index.included_columns[0].name, "email");
    }

    #[test]
    fn test_triggers_merge_events() {
        let row = |event: &str| TriggerRow {
            name: "trg_users_audit".into(),
            definition: "CREATE TRIGGER trg_users_audit ...".into(),
            is_instead_of: false,
            is_disabled: true,
            event_name: event.into(),
        };
        let triggers = triggers("dbo", vec![row("INSERT"), row("UPDATE")]).unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].events.len(), 2);
        assert_eq!(triggers[0].timing, TriggerTiming::After);
        assert!(!triggers[0].is_enabled);
    }

    #[test]
    fn test_referential_actions() {
        assert_eq!(referential_action(0), ReferentialAction::NoAction);
        assert_eq!(referential_action(1), ReferentialAction::Cascade);
        assert_eq!(referential_action(2), ReferentialAction::SetNull);
        assert_eq!(referential_action(3), ReferentialAction::SetDefault);
    }

    #[test]
    fn test_synonym_target_is_qualified() {
        let row = SynonymRow {
            schema_name: "dbo".into(),
            name: "customers".into(),
            base_object_name: "[crm].[customers]".into(),
        };
        let local = synonym(&defaults(), row).unwrap();
        assert_eq!(local.name.to_string(), "srv.sales.dbo.customers");
        assert_eq!(local.target.to_string(), "srv.sales.crm.customers");

        let row = SynonymRow {
            schema_name: "dbo".into(),
            name: "remote".into(),
            base_object_name: "[other].[hr].[staff]".into(),
        };
        let remote = synonym(&defaults(), row).unwrap();
        assert_eq!(remote.target.database(), Some("other"));
        assert_eq!(remote.target.server(), Some("srv"));
    }

    #[test]
    fn test_sequence_cache() {
        let row = SequenceRow {
            schema_name: "dbo".into(),
            name: "order_numbers".into(),
            start_value: 1,
            increment: 1,
            minimum_value: Some(1),
            maximum_value: Some(1000),
            is_cycling: false,
            is_cached: true,
            cache_size: None,
        };
        assert_eq!(sequence(&defaults(), row.clone()).unwrap().cache, SequenceCache::Unknown);
        let sized = SequenceRow {
            cache_size: Some(50),
            ..row.clone()
        };
        assert_eq!(sequence(&defaults(), sized).unwrap().cache, SequenceCache::Size(50));
        let uncached = SequenceRow { is_cached: false, ..row };
        assert_eq!(sequence(&defaults(), uncached).unwrap().cache, SequenceCache::Disabled);
    }

    #[test]
    fn test_encrypted_routine_is_skipped() {
        let row = RoutineRow {
            schema_name: "dbo".into(),
            name: "secret".into(),
            object_type: "P".into(),
            definition: None,
        };
        assert!(routine(&defaults(), row).unwrap().is_none());
    }

    #[test]
    fn test_table_comments() {
        let row = |kind: &str, child: Option<&str>, comment: Option<&str>| CommentRow {
            kind: kind.into(),
            child_name: child.map(String::from),
            comment: comment.map(String::from),
        };
        let comments = table_comments(
            Identifier::parse("dbo.users").unwrap(),
            vec![
                row("TABLE", None, Some("Accounts")),
                row("COLUMN", Some("id"), None),
                row("COLUMN", Some("email"), Some("Login")),
                row("PK", Some("PK_users"), Some("Surrogate key")),
                row("INDEX", Some("IX_users_email"), Some("  ")),
            ],
        );
        assert_eq!(comments.comment.as_deref(), Some("Accounts"));
        assert_eq!(comments.column_comment("EMAIL"), Some("Login"));
        assert_eq!(comments.column_comments.len(), 2);
        assert_eq!(comments.primary_key_comment.as_deref(), Some("Surrogate key"));
        assert_eq!(comments.index_comments.get("IX_users_email"), Some(&None));
    }
}
