use std::io::IsTerminal;

use binstream::codec::json::to_json;
use binstream::Value;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print decoded values. JSON output is a single array that `write` accepts back.
pub fn print_values(values: &[Value], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let array = serde_json::Value::Array(values.iter().map(to_json).collect());
            println!("{array}");
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INDEX", "KIND", "VALUE"]);
            for (index, value) in values.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    value.type_name().to_string(),
                    to_json(value).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (index, value) in values.iter().enumerate() {
                println!("[{index}] {}", to_json(value));
            }
        }
    }
}

/// Print a flat report: a JSON object, a two-column table, or `key=value` pairs.
pub fn print_report<T: Serialize>(report: &T, format: OutputFormat) {
    let json = serde_json::to_value(report).unwrap_or(serde_json::Value::Null);
    match format {
        OutputFormat::Json => {
            println!("{json}");
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in report_fields(&json) {
                table.add_row(vec![key, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = report_fields(&json)
                .into_iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
    }
}

fn report_fields(json: &serde_json::Value) -> Vec<(String, String)> {
    let Some(object) = json.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => "-".to_string(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        path: &'static str,
        values: u64,
        min: Option<u64>,
    }

    #[test]
    fn report_fields_flatten_scalars() {
        let json = serde_json::to_value(Sample {
            path: "a.bin",
            values: 3,
            min: None,
        })
        .unwrap();
        let fields = report_fields(&json);
        assert_eq!(
            fields,
            vec![
                ("path".to_string(), "a.bin".to_string()),
                ("values".to_string(), "3".to_string()),
                ("min".to_string(), "-".to_string()),
            ]
        );
    }
}
