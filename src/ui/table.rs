use crate::model::Column;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Two-column property/value table
pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let rows: Vec<StatRow> = stats
        .iter()
        .map(|(label, value)| StatRow {
            property: label.to_string(),
            value: value.to_string(),
        })
        .collect();
    render(&rows)
}

/// One schema object in a listing
#[derive(Tabled)]
pub struct ObjectLine {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Details")]
    pub details: String,
}

/// One column of a table or view
#[derive(Tabled)]
pub struct ColumnLine {
    #[tabled(rename = "Column")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub type_definition: String,
    #[tabled(rename = "Null")]
    pub nullable: String,
    #[tabled(rename = "Default")]
    pub default_value: String,
    #[tabled(rename = "Notes")]
    pub notes: String,
}

impl ColumnLine {
    pub fn from_column(column: &Column, comment: Option<&str>) -> Self {
        let mut notes = Vec::new();
        if let Some(auto) = &column.auto_increment {
            notes.push(format!("identity({}, {})", auto.initial_value, auto.increment));
        }
        if let Some(computed) = &column.computed_definition {
            notes.push(format!("computed {}", computed));
        }
        if let Some(comment) = comment {
            notes.push(comment.to_string());
        }
        Self {
            name: column.name.clone(),
            type_definition: column.db_type.definition.clone(),
            nullable: if column.is_nullable { "yes" } else { "no" }.to_string(),
            default_value: column.default_value.clone().unwrap_or_default(),
            notes: notes.join("; "),
        }
    }
}

/// Rounded table, or nothing for no rows
pub fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::model::{AutoIncrement, DataType, DbType};

    #[test]
    fn test_render_empty_and_rows() {
        assert_eq!(render::<ObjectLine>(&[]), "");
        let out = stats_table(&[("tables", "3"), ("views", "1")]);
        assert!(out.contains("Property"));
        assert!(out.contains("tables"));
        assert!(out.contains('╭'));
    }

    #[test]
    fn test_column_line_notes() {
        let ty = DbType::new(Identifier::new("INTEGER").unwrap(), DataType::Integer, "INTEGER").unwrap();
        let column = Column::new("id", ty, false)
            .unwrap()
            .with_auto_increment(Some(AutoIncrement::new(1, 1).unwrap()));
        let line = ColumnLine::from_column(&column, Some("surrogate key"));
        assert_eq!(line.nullable, "no");
        assert_eq!(line.notes, "identity(1, 1); surrogate key");
    }
}
