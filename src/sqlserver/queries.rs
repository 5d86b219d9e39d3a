//! Catalog queries against the `sys` views
//!
//! Parameters are positional (`@P1`, `@P2`). Small integer catalog columns
//! are cast to `int` and sequence values to `bigint` so rows decode into
//! fixed Rust types.

/// `sys.objects` type codes of each object family
pub const TABLE_TYPES: &str = "'U'";
pub const VIEW_TYPES: &str = "'V'";
pub const SEQUENCE_TYPES: &str = "'SO'";
pub const SYNONYM_TYPES: &str = "'SN'";
pub const ROUTINE_TYPES: &str = "'P', 'FN', 'IF', 'TF'";

/// Objects of the given types, optionally filtered to one schema and name
pub fn objects(types: &str, filtered: bool) -> String {
    let filter = if filtered {
        "AND SCHEMA_NAME(o.schema_id) = @P1 AND o.name = @P2"
    } else {
        ""
    };
    format!(
        r#"SELECT o.object_id, SCHEMA_NAME(o.schema_id) AS schema_name, o.name, RTRIM(o.type) AS object_type
FROM sys.objects o
WHERE o.is_ms_shipped = 0 AND o.type IN ({types}) {filter}
ORDER BY schema_name, o.name"#
    )
}

pub const COLUMNS: &str = r#"SELECT
    c.name,
    SCHEMA_NAME(t.schema_id) AS type_schema,
    t.name AS type_name,
    TYPE_NAME(c.system_type_id) AS base_type_name,
    t.is_user_defined,
    CAST(c.max_length AS int) AS max_length,
    CAST(c.precision AS int) AS precision,
    CAST(c.scale AS int) AS scale,
    c.collation_name,
    c.is_nullable,
    dc.definition AS default_definition,
    cc.definition AS computed_definition,
    CAST(ic.seed_value AS bigint) AS identity_seed,
    CAST(ic.increment_value AS bigint) AS identity_increment
FROM sys.columns c
JOIN sys.types t ON t.user_type_id = c.user_type_id
LEFT JOIN sys.default_constraints dc ON dc.parent_object_id = c.object_id AND dc.parent_column_id = c.column_id
LEFT JOIN sys.computed_columns cc ON cc.object_id = c.object_id AND cc.column_id = c.column_id
LEFT JOIN sys.identity_columns ic ON ic.object_id = c.object_id AND ic.column_id = c.column_id
WHERE c.object_id = @P1
ORDER BY c.column_id"#;

pub const KEY_COLUMNS: &str = r#"SELECT
    kc.name AS key_name,
    RTRIM(kc.type) AS key_type,
    col.name AS column_name,
    i.is_disabled
FROM sys.key_constraints kc
JOIN sys.indexes i ON i.object_id = kc.parent_object_id AND i.index_id = kc.unique_index_id
JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
WHERE kc.parent_object_id = @P1 AND ic.is_included_column = 0
ORDER BY kc.name, ic.key_ordinal"#;

pub const INDEX_COLUMNS: &str = r#"SELECT
    i.name AS index_name,
    i.is_unique,
    i.is_disabled,
    col.name AS column_name,
    ic.is_descending_key,
    ic.is_included_column
FROM sys.indexes i
JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
WHERE i.object_id = @P1
    AND i.is_primary_key = 0
    AND i.is_unique_constraint = 0
    AND i.is_hypothetical = 0
    AND i.type <> 0
ORDER BY i.name, ic.key_ordinal, ic.index_column_id"#;

/// Foreign key columns; `@P1` matches the child table (`parent_object_id`)
/// or the referenced table depending on `by_child`
pub fn foreign_key_columns(by_child: bool) -> String {
    let filter = if by_child {
        "fk.parent_object_id = @P1"
    } else {
        "fk.referenced_object_id = @P1"
    };
    format!(
        r#"SELECT
    fk.name AS key_name,
    fk.parent_object_id AS child_object_id,
    SCHEMA_NAME(ct.schema_id) AS child_schema,
    ct.name AS child_table,
    fk.referenced_object_id AS parent_object_id,
    SCHEMA_NAME(pt.schema_id) AS parent_schema,
    pt.name AS parent_table,
    pk.name AS parent_key_name,
    cc.name AS column_name,
    CAST(fk.delete_referential_action AS int) AS delete_action,
    CAST(fk.update_referential_action AS int) AS update_action,
    fk.is_disabled
FROM sys.foreign_keys fk
JOIN sys.tables ct ON ct.object_id = fk.parent_object_id
JOIN sys.tables pt ON pt.object_id = fk.referenced_object_id
JOIN sys.key_constraints pk ON pk.parent_object_id = fk.referenced_object_id AND pk.unique_index_id = fk.key_index_id
JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
JOIN sys.columns cc ON cc.object_id = fkc.parent_object_id AND cc.column_id = fkc.parent_column_id
WHERE {filter}
ORDER BY fk.name, fkc.constraint_column_id"#
    )
}

pub const CHECKS: &str = r#"SELECT name, definition, is_disabled
FROM sys.check_constraints
WHERE parent_object_id = @P1
ORDER BY name"#;

pub const TRIGGERS: &str = r#"SELECT
    tr.name,
    m.definition,
    tr.is_instead_of_trigger,
    tr.is_disabled,
    te.type_desc AS event_name
FROM sys.triggers tr
JOIN sys.sql_modules m ON m.object_id = tr.object_id
JOIN sys.trigger_events te ON te.object_id = tr.object_id
WHERE tr.parent_id = @P1
ORDER BY tr.name"#;

pub const VIEW_DEFINITION: &str = r#"SELECT
    m.definition,
    CAST(CASE WHEN EXISTS (
        SELECT 1 FROM sys.indexes i WHERE i.object_id = v.object_id AND i.index_id = 1
    ) THEN 1 ELSE 0 END AS bit) AS is_materialized
FROM sys.views v
JOIN sys.sql_modules m ON m.object_id = v.object_id
WHERE v.object_id = @P1"#;

pub fn sequences(filtered: bool) -> String {
    let filter = if filtered {
        "AND SCHEMA_NAME(s.schema_id) = @P1 AND s.name = @P2"
    } else {
        ""
    };
    format!(
        r#"SELECT
    SCHEMA_NAME(s.schema_id) AS schema_name,
    s.name,
    CAST(s.start_value AS bigint) AS start_value,
    CAST(s.increment AS bigint) AS increment,
    CAST(s.minimum_value AS bigint) AS minimum_value,
    CAST(s.maximum_value AS bigint) AS maximum_value,
    s.is_cycling,
    s.is_cached,
    CAST(s.cache_size AS int) AS cache_size
FROM sys.sequences s
WHERE s.is_ms_shipped = 0 {filter}
ORDER BY schema_name, s.name"#
    )
}

pub fn synonyms(filtered: bool) -> String {
    let filter = if filtered {
        "AND SCHEMA_NAME(s.schema_id) = @P1 AND s.name = @P2"
    } else {
        ""
    };
    format!(
        r#"SELECT SCHEMA_NAME(s.schema_id) AS schema_name, s.name, s.base_object_name
FROM sys.synonyms s
WHERE s.is_ms_shipped = 0 {filter}
ORDER BY schema_name, s.name"#
    )
}

pub fn routines(filtered: bool) -> String {
    let filter = if filtered {
        "AND SCHEMA_NAME(o.schema_id) = @P1 AND o.name = @P2"
    } else {
        ""
    };
    format!(
        r#"SELECT SCHEMA_NAME(o.schema_id) AS schema_name, o.name, RTRIM(o.type) AS object_type, m.definition
FROM sys.objects o
JOIN sys.sql_modules m ON m.object_id = o.object_id
WHERE o.is_ms_shipped = 0 AND o.type IN ({ROUTINE_TYPES}) {filter}
ORDER BY schema_name, o.name"#
    )
}

/// `MS_Description` of a table and every child object, one row per object.
///
/// `kind` is one of TABLE, COLUMN, CHECK, PK, UQ, FK, INDEX, TRIGGER.
pub const TABLE_COMMENTS: &str = r#"SELECT CAST('TABLE' AS varchar(16)) AS kind, CAST(NULL AS sysname) AS child_name, CAST(ep.value AS nvarchar(max)) AS comment
FROM sys.tables t
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = t.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE t.object_id = @P1
UNION ALL
SELECT 'COLUMN', c.name, CAST(ep.value AS nvarchar(max))
FROM sys.columns c
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = c.object_id AND ep.minor_id = c.column_id AND ep.name = N'MS_Description'
WHERE c.object_id = @P1
UNION ALL
SELECT 'CHECK', ck.name, CAST(ep.value AS nvarchar(max))
FROM sys.check_constraints ck
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = ck.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE ck.parent_object_id = @P1
UNION ALL
SELECT RTRIM(kc.type), kc.name, CAST(ep.value AS nvarchar(max))
FROM sys.key_constraints kc
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = kc.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE kc.parent_object_id = @P1
UNION ALL
SELECT 'FK', fk.name, CAST(ep.value AS nvarchar(max))
FROM sys.foreign_keys fk
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = fk.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE fk.parent_object_id = @P1
UNION ALL
SELECT 'INDEX', i.name, CAST(ep.value AS nvarchar(max))
FROM sys.indexes i
LEFT JOIN sys.extended_properties ep ON ep.class = 7 AND ep.major_id = i.object_id AND ep.minor_id = i.index_id AND ep.name = N'MS_Description'
WHERE i.object_id = @P1 AND i.name IS NOT NULL AND i.is_primary_key = 0 AND i.is_unique_constraint = 0
UNION ALL
SELECT 'TRIGGER', tr.name, CAST(ep.value AS nvarchar(max))
FROM sys.triggers tr
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = tr.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE tr.parent_id = @P1"#;

/// `MS_Description` of a view and its columns
pub const VIEW_COMMENTS: &str = r#"SELECT CAST('VIEW' AS varchar(16)) AS kind, CAST(NULL AS sysname) AS child_name, CAST(ep.value AS nvarchar(max)) AS comment
FROM sys.views v
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = v.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE v.object_id = @P1
UNION ALL
SELECT 'COLUMN', c.name, CAST(ep.value AS nvarchar(max))
FROM sys.columns c
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = c.object_id AND ep.minor_id = c.column_id AND ep.name = N'MS_Description'
WHERE c.object_id = @P1"#;

/// `MS_Description` of standalone objects of the given types
pub fn object_comments(types: &str, filtered: bool) -> String {
    let filter = if filtered {
        "AND SCHEMA_NAME(o.schema_id) = @P1 AND o.name = @P2"
    } else {
        ""
    };
    format!(
        r#"SELECT SCHEMA_NAME(o.schema_id) AS schema_name, o.name, CAST(ep.value AS nvarchar(max)) AS comment
FROM sys.objects o
LEFT JOIN sys.extended_properties ep ON ep.class = 1 AND ep.major_id = o.object_id AND ep.minor_id = 0 AND ep.name = N'MS_Description'
WHERE o.is_ms_shipped = 0 AND o.type IN ({types}) {filter}
ORDER BY schema_name, o.name"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_queries_bind_schema_and_name() {
        for sql in [
            objects(TABLE_TYPES, true),
            sequences(true),
            synonyms(true),
            routines(true),
            object_comments(SEQUENCE_TYPES, true),
        ] {
            assert!(sql.contains("@P1") && sql.contains("@P2"), "{}", sql);
        }
        assert!(!objects(TABLE_TYPES, false).contains("@P"));
        assert!(routines(false).contains("'P', 'FN', 'IF', 'TF'"));
    }

    #[test]
    fn test_foreign_key_direction() {
        assert!(foreign_key_columns(true).contains("WHERE fk.parent_object_id = @P1"));
        assert!(foreign_key_columns(false).contains("WHERE fk.referenced_object_id = @P1"));
    }
}
