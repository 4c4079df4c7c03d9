//! Output formatting for CLI

use serde::Serialize;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Format a single record based on selected format
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> String {
    let value = serde_json::to_value(data).unwrap_or_default();
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table | OutputFormat::Text => {
            let mut out = String::new();
            render_text(&value, 0, &mut out);
            out
        }
    }
}

/// Format a list of rows: a JSON array, or a table otherwise
pub fn format_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table | OutputFormat::Text => table(rows),
    }
}

pub fn table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_text(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::Object(inner) if !inner.is_empty() => {
                        out.push_str(&format!("{}{}:\n", pad, key));
                        render_text(value, indent + 1, out);
                    }
                    _ => out.push_str(&format!("{}{}: {}\n", pad, key, scalar(value))),
                }
            }
        }
        other => out.push_str(&format!("{}{}\n", pad, scalar(other))),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
