//! Output formatters for schema reports.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use relmap_core::{Definition, OperationData, OperationValue, Resolution, Schema, ValidationError};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// One-line-per-table overview of a valid schema.
    fn format_summary(&self, schema: &Schema) -> String;

    /// Full description of the given definitions.
    fn format_definitions(&self, schema: &Schema, definitions: &[&Definition]) -> String;

    /// Every violation of a failed finalize pass.
    fn format_violations(&self, error: &ValidationError) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_summary(&self, schema: &Schema) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Table", "Key", "Columns", "Relationships", "Flags"]);

        for def in schema.definitions() {
            table.add_row(vec![
                Cell::new(def.table()),
                Cell::new(def.primary_key().join(", ")),
                Cell::new(def.columns().len()),
                Cell::new(def.relationships().len()),
                Cell::new(flags(def).join(" ")),
            ]);
        }

        format!(
            "{}\n{} table(s), fingerprint {}",
            table,
            schema.len(),
            schema.fingerprint()
        )
    }

    fn format_definitions(&self, schema: &Schema, definitions: &[&Definition]) -> String {
        let mut sections = Vec::new();

        for def in definitions {
            let mut out = format!("{} ({})", def.table(), def.primary_key().join(", "));
            let flags = flags(def);
            if !flags.is_empty() {
                out.push_str(&format!(" [{}]", flags.join(" ")));
            }
            out.push('\n');
            if !def.columns().is_empty() {
                out.push_str(&format!("  columns: {}\n", def.columns().join(", ")));
            }
            if let Some(column) = def.soft_delete_column() {
                out.push_str(&format!("  soft delete: {}\n", column));
            }
            for (label, data) in [
                ("on create", def.creation_data()),
                ("on update", def.modification_data()),
                ("on delete", def.deletion_data()),
            ] {
                if !data.is_empty() {
                    out.push_str(&format!("  {}: {}\n", label, format_data(data)));
                }
            }

            if !def.relationships().is_empty() {
                let mut table = Table::new();
                table.set_header(vec!["Relationship", "Kind", "Path", "Condition"]);
                for rel in def.relationships() {
                    let related = schema.related(rel).map_or("?", Definition::table);
                    let kind = if rel.is_collection() { "many" } else { "one" };
                    let (path, condition) = match rel.resolution() {
                        Resolution::Direct => (
                            format!("{} -> {}", def.table(), related),
                            format!(
                                "{}.{} = {}.{}",
                                def.table(),
                                rel.local_column(),
                                related,
                                rel.foreign_column()
                            ),
                        ),
                        Resolution::Join(join) => (
                            format!("{} -> {} -> {}", def.table(), join.table, related),
                            format!(
                                "{}.{} = {}.{} AND {}.{} = {}.{}",
                                def.table(),
                                rel.local_column(),
                                join.table,
                                join.local_column,
                                join.table,
                                join.foreign_column,
                                related,
                                rel.foreign_column()
                            ),
                        ),
                    };
                    table.add_row(vec![
                        Cell::new(rel.name()),
                        Cell::new(kind),
                        Cell::new(path),
                        Cell::new(condition),
                    ]);
                }
                out.push_str(&table.to_string());
            }

            sections.push(out.trim_end().to_string());
        }

        sections.join("\n\n")
    }

    fn format_violations(&self, error: &ValidationError) -> String {
        let mut table = Table::new();
        table.set_header(vec!["#", "Violation"]);
        for (i, violation) in error.iter().enumerate() {
            table.add_row(vec![Cell::new(i + 1), Cell::new(violation)]);
        }
        format!("{}\n{} violation(s)", table, error.len())
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_summary(&self, schema: &Schema) -> String {
        let tables: Vec<_> = schema
            .definitions()
            .iter()
            .map(|def| {
                serde_json::json!({
                    "table": def.table(),
                    "primary_key": def.primary_key(),
                    "columns": def.columns().len(),
                    "relationships": def.relationships().len(),
                    "flags": flags(def),
                })
            })
            .collect();

        pretty(&serde_json::json!({
            "fingerprint": schema.fingerprint(),
            "tables": tables,
        }))
    }

    fn format_definitions(&self, schema: &Schema, definitions: &[&Definition]) -> String {
        let defs: Vec<_> = definitions
            .iter()
            .map(|def| definition_to_json(schema, def))
            .collect();
        pretty(&serde_json::Value::Array(defs))
    }

    fn format_violations(&self, error: &ValidationError) -> String {
        let violations: Vec<_> = error.iter().map(ToString::to_string).collect();
        pretty(&serde_json::json!({ "violations": violations }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({
            "message": message
        })
        .to_string()
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn flags(def: &Definition) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if def.is_auto_increment() {
        flags.push("auto_increment");
    }
    if def.is_read_only() {
        flags.push("read_only");
    }
    if def.has_soft_delete() {
        flags.push("soft_delete");
    }
    flags
}

/// Convert a definition to JSON, naming related tables instead of ids.
fn definition_to_json(schema: &Schema, def: &Definition) -> serde_json::Value {
    let relationships: Vec<_> = def
        .relationships()
        .iter()
        .map(|rel| {
            let join = rel.join_info().map(|j| {
                serde_json::json!({
                    "table": j.table,
                    "local_column": j.local_column,
                    "foreign_column": j.foreign_column,
                })
            });
            serde_json::json!({
                "name": rel.name(),
                "collection": rel.is_collection(),
                "related": schema.related(rel).map(Definition::table),
                "local_column": rel.local_column(),
                "foreign_column": rel.foreign_column(),
                "join": join,
            })
        })
        .collect();

    serde_json::json!({
        "table": def.table(),
        "primary_key": def.primary_key(),
        "auto_increment": def.is_auto_increment(),
        "read_only": def.is_read_only(),
        "columns": def.columns(),
        "soft_delete_column": def.soft_delete_column(),
        "creation_data": def.creation_data(),
        "modification_data": def.modification_data(),
        "deletion_data": def.deletion_data(),
        "relationships": relationships,
    })
}

fn format_data(data: &OperationData) -> String {
    data.iter()
        .map(|(column, value)| format!("{} = {}", column, format_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a value as it would appear in a statement.
fn format_value(value: &OperationValue) -> String {
    match value {
        OperationValue::Null => "NULL".to_string(),
        OperationValue::Bool(b) => b.to_string(),
        OperationValue::Int(i) => i.to_string(),
        OperationValue::Float(f) => f.to_string(),
        OperationValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        OperationValue::Bytes(b) => format!("<{} bytes>", b.len()),
        OperationValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        OperationValue::Expression(e) => e.clone(),
    }
}
