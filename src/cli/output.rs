//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{OutputFormat, RestockArgs};
use crate::error::Result;

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &RestockArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &RestockArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    // Convert to JSON value for easier manipulation
    let value = serde_json::to_value(result)?;
    for line in render_human(&value, 0) {
        println!("{line}");
    }
    Ok(())
}

/// Indented `key: value` lines; nested objects become sections.
fn render_human(value: &serde_json::Value, indent: usize) -> Vec<String> {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(obj) => {
            let mut lines = Vec::new();
            for (key, val) in obj {
                if val.is_object() {
                    lines.push(format!("{pad}{key}:"));
                    lines.extend(render_human(val, indent + 1));
                } else {
                    lines.push(format!("{pad}{key}: {}", format_value(val)));
                }
            }
            lines
        }
        _ => vec![format!("{pad}{}", format_value(value))],
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &RestockArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("dataset")), "dataset");
        assert_eq!(format_value(&json!(80)), "80");
        assert_eq!(format_value(&json!(0.912345)), "0.9123");
        assert_eq!(format_value(&json!(["Stock", "Region_South"])), "[Stock, Region_South]");
        assert_eq!(format_value(&json!(null)), "null");
    }

    #[test]
    fn test_render_nested_sections() {
        let value = json!({"train": {"accuracy": 0.5, "tuned": false}, "rows": 10});
        let lines = render_human(&value, 0);
        assert!(lines.contains(&"train:".to_string()));
        assert!(lines.contains(&"  accuracy: 0.5000".to_string()));
        assert!(lines.contains(&"  tuned: false".to_string()));
        assert!(lines.contains(&"rows: 10".to_string()));
    }
}
