use crate::{emit_success, OutputMode};
use owo_colors::OwoColorize;
use schematic::config::{self, ConnectionProfile, SchematicConfig};
use schematic::connect::{self, ConnectedDatabase};
use schematic::model::{
    DatabaseKey, ObjectComments, RelationalKey, Routine, Sequence, Synonym, Table, TableComments,
    View, ViewComments,
};
use schematic::snapshot::SnapshotFile;
use schematic::sqlite::SqliteDatabasePragma;
use schematic::ui::{self, theme, ColumnLine, Icons, ObjectLine};
use schematic::{Identifier, RelationalDatabase, RelationalDatabaseCommentProvider};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub enum Listing {
    Tables,
    Views,
    Sequences,
    Synonyms,
    Routines,
}

impl Listing {
    fn label(self) -> &'static str {
        match self {
            Listing::Tables => "tables",
            Listing::Views => "views",
            Listing::Sequences => "sequences",
            Listing::Synonyms => "synonyms",
            Listing::Routines => "routines",
        }
    }
}

fn key_columns(key: &DatabaseKey) -> String {
    format!("({})", key.column_names().join(", "))
}

fn key_label(key: &DatabaseKey) -> String {
    let name = key.name.as_ref().map(|n| n.to_string()).unwrap_or_else(|| "<unnamed>".to_string());
    let disabled = if key.is_enabled { "" } else { " [disabled]" };
    format!("{} {}{}", name, key_columns(key), disabled)
}

fn relation_label(key: &RelationalKey) -> String {
    format!(
        "{} {} -> {} {} (on delete {}, on update {})",
        key.child_table,
        key_label(&key.child_key),
        key.parent_table,
        key_columns(&key.parent_key),
        key.delete_action,
        key.update_action
    )
}

fn table_details(table: &Table) -> String {
    let mut parts = vec![format!("{} columns", table.columns.len())];
    if let Some(pk) = &table.primary_key {
        parts.push(format!("pk {}", key_columns(pk)));
    }
    if !table.parent_keys.is_empty() {
        parts.push(format!("{} foreign keys", table.parent_keys.len()));
    }
    if !table.indexes.is_empty() {
        parts.push(format!("{} indexes", table.indexes.len()));
    }
    parts.join(", ")
}

fn view_details(view: &View) -> String {
    let materialized = if view.is_materialized { ", materialized" } else { "" };
    format!("{} columns{}", view.columns.len(), materialized)
}

fn sequence_details(sequence: &Sequence) -> String {
    let bound = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    format!(
        "start {}, increment {}, min {}, max {}{}, {}",
        sequence.start,
        sequence.increment,
        bound(sequence.min_value),
        bound(sequence.max_value),
        if sequence.cycle { ", cycle" } else { "" },
        sequence.cache
    )
}

fn synonym_details(synonym: &Synonym) -> String {
    format!("-> {}", synonym.target)
}

fn routine_details(routine: &Routine) -> String {
    routine.kind.as_str().to_string()
}

fn print_lines(lines: Vec<ObjectLine>, empty: &str) {
    if lines.is_empty() {
        println!("{}", ui::muted(empty));
    } else {
        println!("{}", ui::render(&lines));
    }
}

fn line(name: &Identifier, details: String) -> ObjectLine {
    ObjectLine {
        name: name.to_string(),
        details,
    }
}

pub fn run_init(path: &Path, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let template = SchematicConfig::template();
    config::write_config(path, &template, force)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::summary_row("connections:", &template.connections.keys().cloned().collect::<Vec<_>>().join(", "));
    } else {
        emit_success("init", serde_json::json!({ "path": path.display().to_string() }))?;
    }
    Ok(())
}

pub async fn run_list(db: &ConnectedDatabase, listing: Listing, output_mode: OutputMode) -> anyhow::Result<()> {
    let database = db.database.as_ref();
    let (data, lines) = match listing {
        Listing::Tables => {
            let items = database.get_all_tables().await?;
            let lines = items.iter().map(|t| line(&t.name, table_details(t))).collect::<Vec<_>>();
            (serde_json::to_value(&items)?, lines)
        }
        Listing::Views => {
            let items = database.get_all_views().await?;
            let lines = items.iter().map(|v| line(&v.name, view_details(v))).collect::<Vec<_>>();
            (serde_json::to_value(&items)?, lines)
        }
        Listing::Sequences => {
            let items = database.get_all_sequences().await?;
            let lines = items.iter().map(|s| line(&s.name, sequence_details(s))).collect::<Vec<_>>();
            (serde_json::to_value(&items)?, lines)
        }
        Listing::Synonyms => {
            let items = database.get_all_synonyms().await?;
            let lines = items.iter().map(|s| line(&s.name, synonym_details(s))).collect::<Vec<_>>();
            (serde_json::to_value(&items)?, lines)
        }
        Listing::Routines => {
            let items = database.get_all_routines().await?;
            let lines = items.iter().map(|r| line(&r.name, routine_details(r))).collect::<Vec<_>>();
            (serde_json::to_value(&items)?, lines)
        }
    };

    if !output_mode.is_human() {
        return emit_success(listing.label(), data);
    }
    ui::header(&format!("{} {} ({})", lines.len(), listing.label(), db.dialect.name()));
    print_lines(lines, &format!("no {}", listing.label()));
    Ok(())
}

fn print_table(table: &Table, comments: Option<&TableComments>) {
    ui::header(&format!("Table {}", table.name.style(theme().name.clone())));
    if let Some(comment) = comments.and_then(|c| c.comment.as_deref()) {
        ui::summary_row("comment:", comment);
    }

    let columns: Vec<ColumnLine> = table
        .columns
        .iter()
        .map(|c| ColumnLine::from_column(c, comments.and_then(|cc| cc.column_comment(&c.name))))
        .collect();
    println!("{}", ui::render(&columns));

    if let Some(pk) = &table.primary_key {
        ui::summary_row(&format!("{} primary key:", Icons::KEY), &key_label(pk));
    }
    for key in &table.unique_keys {
        ui::summary_row(&format!("{} unique:", Icons::KEY), &key_label(key));
    }
    if !table.parent_keys.is_empty() {
        ui::section("References");
        for key in &table.parent_keys {
            println!("  {} {}", Icons::LINK, relation_label(key));
        }
    }
    if !table.child_keys.is_empty() {
        ui::section("Referenced by");
        for key in &table.child_keys {
            println!("  {} {}", Icons::LINK, relation_label(key));
        }
    }
    if !table.indexes.is_empty() {
        ui::section("Indexes");
        for index in &table.indexes {
            let columns = index
                .columns
                .iter()
                .map(|c| format!("{} {}", c.expression, c.order.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            let unique = if index.is_unique { "unique " } else { "" };
            let included = if index.included_columns.is_empty() {
                String::new()
            } else {
                let names: Vec<&str> = index.included_columns.iter().map(|c| c.name.as_str()).collect();
                format!(" include ({})", names.join(", "))
            };
            println!("  {} {}{} ({}){}", Icons::INDEX, unique, index.name, columns, included);
        }
    }
    if !table.checks.is_empty() {
        ui::section("Checks");
        for check in &table.checks {
            let name = check.name.as_ref().map(|n| n.to_string()).unwrap_or_default();
            println!("  {} {}", name, ui::dim(&check.definition));
        }
    }
    if !table.triggers.is_empty() {
        ui::section("Triggers");
        for trigger in &table.triggers {
            let disabled = if trigger.is_enabled { "" } else { " [disabled]" };
            println!(
                "  {} {} {} {}{}",
                Icons::BOLT,
                trigger.name,
                trigger.timing.as_str(),
                trigger.events_label(),
                disabled
            );
        }
    }
}

fn print_view(view: &View, comments: Option<&ViewComments>) {
    let kind = if view.is_materialized { "Materialized view" } else { "View" };
    ui::header(&format!("{} {}", kind, view.name.style(theme().name.clone())));
    if let Some(comment) = comments.and_then(|c| c.comment.as_deref()) {
        ui::summary_row("comment:", comment);
    }
    let columns: Vec<ColumnLine> = view
        .columns
        .iter()
        .map(|c| ColumnLine::from_column(c, comments.and_then(|cc| cc.column_comment(&c.name))))
        .collect();
    println!("{}", ui::render(&columns));
    ui::section("Definition");
    println!("{}", view.definition);
}

fn print_object(kind: &str, name: &Identifier, details: &str, comment: Option<&ObjectComments>) {
    ui::header(&format!("{} {}", kind, name.style(theme().name.clone())));
    ui::summary_row("details:", details);
    if let Some(comment) = comment.and_then(|c| c.comment.as_deref()) {
        ui::summary_row("comment:", comment);
    }
}

fn described(kind: &str, object: serde_json::Value, comments: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "kind": kind, "object": object, "comments": comments })
}

pub async fn run_describe(db: &ConnectedDatabase, name: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    let identifier = Identifier::parse(name)?;
    let database = db.database.as_ref();
    let comments = db.comments.as_ref();
    let human = output_mode.is_human();

    if let Some(table) = database.get_table(&identifier).await? {
        let table_comments = comments.get_table_comments(&table.name).await?;
        if human {
            print_table(&table, table_comments.as_ref());
            return Ok(());
        }
        let data = described("table", serde_json::to_value(&table)?, serde_json::to_value(&table_comments)?);
        return emit_success("describe", data);
    }

    if let Some(view) = database.get_view(&identifier).await? {
        let view_comments = comments.get_view_comments(&view.name).await?;
        if human {
            print_view(&view, view_comments.as_ref());
            return Ok(());
        }
        let data = described("view", serde_json::to_value(&view)?, serde_json::to_value(&view_comments)?);
        return emit_success("describe", data);
    }

    if let Some(sequence) = database.get_sequence(&identifier).await? {
        let comment = comments.get_sequence_comments(&sequence.name).await?;
        if human {
            print_object("Sequence", &sequence.name, &sequence_details(&sequence), comment.as_ref());
            return Ok(());
        }
        let data = described("sequence", serde_json::to_value(&sequence)?, serde_json::to_value(&comment)?);
        return emit_success("describe", data);
    }

    if let Some(synonym) = database.get_synonym(&identifier).await? {
        let comment = comments.get_synonym_comments(&synonym.name).await?;
        if human {
            print_object("Synonym", &synonym.name, &synonym_details(&synonym), comment.as_ref());
            return Ok(());
        }
        let data = described("synonym", serde_json::to_value(&synonym)?, serde_json::to_value(&comment)?);
        return emit_success("describe", data);
    }

    if let Some(routine) = database.get_routine(&identifier).await? {
        let comment = comments.get_routine_comments(&routine.name).await?;
        if human {
            print_object("Routine", &routine.name, &routine_details(&routine), comment.as_ref());
            ui::section("Definition");
            println!("{}", routine.definition);
            return Ok(());
        }
        let data = described("routine", serde_json::to_value(&routine)?, serde_json::to_value(&comment)?);
        return emit_success("describe", data);
    }

    anyhow::bail!("no table, view, sequence, synonym or routine named {}", identifier)
}

fn print_child_comments(title: &str, comments: &indexmap::IndexMap<String, Option<String>>) {
    let present: Vec<(&String, &String)> = comments
        .iter()
        .filter_map(|(name, comment)| comment.as_ref().map(|c| (name, c)))
        .collect();
    if present.is_empty() {
        return;
    }
    ui::section(title);
    for (name, comment) in present {
        println!("  {} {}", name.style(theme().name.clone()), comment);
    }
}

pub async fn run_comments(db: &ConnectedDatabase, name: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    let identifier = Identifier::parse(name)?;
    let comments = db.comments.as_ref();
    let human = output_mode.is_human();

    if let Some(table) = comments.get_table_comments(&identifier).await? {
        if !human {
            return emit_success("comments", serde_json::to_value(&table)?);
        }
        ui::header(&format!("{} {}", Icons::NOTE, table.table_name));
        ui::summary_row("table:", table.comment.as_deref().unwrap_or("-"));
        if let Some(pk) = &table.primary_key_comment {
            ui::summary_row("primary key:", pk);
        }
        print_child_comments("Columns", &table.column_comments);
        print_child_comments("Unique keys", &table.unique_key_comments);
        print_child_comments("Foreign keys", &table.foreign_key_comments);
        print_child_comments("Checks", &table.check_comments);
        print_child_comments("Indexes", &table.index_comments);
        print_child_comments("Triggers", &table.trigger_comments);
        return Ok(());
    }

    if let Some(view) = comments.get_view_comments(&identifier).await? {
        if !human {
            return emit_success("comments", serde_json::to_value(&view)?);
        }
        ui::header(&format!("{} {}", Icons::NOTE, view.view_name));
        ui::summary_row("view:", view.comment.as_deref().unwrap_or("-"));
        print_child_comments("Columns", &view.column_comments);
        return Ok(());
    }

    let object = match comments.get_sequence_comments(&identifier).await? {
        Some(found) => Some(found),
        None => match comments.get_synonym_comments(&identifier).await? {
            Some(found) => Some(found),
            None => comments.get_routine_comments(&identifier).await?,
        },
    };
    let Some(object) = object else {
        if human {
            ui::warn(&format!("no comments found for {}", identifier));
            return Ok(());
        }
        return emit_success("comments", serde_json::Value::Null);
    };

    if !human {
        return emit_success("comments", serde_json::to_value(&object)?);
    }
    ui::header(&format!("{} {}", Icons::NOTE, object.name));
    ui::summary_row("comment:", object.comment.as_deref().unwrap_or("-"));
    Ok(())
}

pub async fn run_snapshot(db: &ConnectedDatabase, output: &Path, output_mode: OutputMode) -> anyhow::Result<()> {
    ui::status(Icons::GEAR, "capturing", db.dialect.name());
    let file = SnapshotFile::capture(db.dialect.name(), db.database.as_ref(), db.comments.as_ref())
        .await?
        .with_search_path(db.search_path.clone());
    file.save(output)?;

    let counts = [
        ("tables", file.database.tables.len()),
        ("views", file.database.views.len()),
        ("sequences", file.database.sequences.len()),
        ("synonyms", file.database.synonyms.len()),
        ("routines", file.database.routines.len()),
    ];
    if !output_mode.is_human() {
        let mut data = serde_json::Map::new();
        data.insert("path".to_string(), serde_json::json!(output.display().to_string()));
        for (label, count) in counts {
            data.insert(label.to_string(), serde_json::json!(count));
        }
        return emit_success("snapshot", serde_json::Value::Object(data));
    }

    ui::success(&format!("Snapshot written to {}", output.display()));
    let rendered: Vec<(&str, String)> = counts.iter().map(|(l, c)| (*l, c.to_string())).collect();
    let rows: Vec<(&str, &str)> = rendered.iter().map(|(l, c)| (*l, c.as_str())).collect();
    println!("{}", ui::stats_table(&rows));
    Ok(())
}

pub async fn run_pragmas(profile: &ConnectionProfile, schema: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    let ConnectionProfile::Sqlite { path, attach } = profile else {
        anyhow::bail!("pragmas are only available for SQLite connections, not {}", profile.kind());
    };
    let connection = connect::open_sqlite(path)?;
    for (name, file) in attach {
        connection.attach(name, file)?;
    }
    let pragma = SqliteDatabasePragma::new(connection, schema);

    let encoding = pragma.encoding().await?.map(|e| e.as_str()).unwrap_or("unknown");
    let journal_mode = pragma.journal_mode().await?.map(|m| m.as_str()).unwrap_or("unknown");
    let values = [
        ("page_size", pragma.page_size().await?.to_string()),
        ("page_count", pragma.page_count().await?.to_string()),
        ("size_in_bytes", pragma.size_in_bytes().await?.to_string()),
        ("encoding", encoding.to_string()),
        ("journal_mode", journal_mode.to_string()),
        ("user_version", pragma.user_version().await?.to_string()),
        ("application_id", pragma.application_id().await?.to_string()),
        ("schema_version", pragma.schema_version().await?.to_string()),
        ("foreign_keys", pragma.foreign_keys_enabled().await?.to_string()),
    ];

    if !output_mode.is_human() {
        let data: serde_json::Map<String, serde_json::Value> = values
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
            .collect();
        return emit_success("pragmas", serde_json::Value::Object(data));
    }

    ui::header(&format!("Pragmas of {} ({})", schema, path.display()));
    let rows: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
    println!("{}", ui::stats_table(&rows));
    Ok(())
}
