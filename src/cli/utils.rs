use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::filter::Counts;
use crate::models::ItemView;
use crate::screen::Notice;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert("success".into(), json!(true));
            response.insert("message".into(), json!(message));
            merge(&mut response, data);
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output the notices a screen produced, plus optional extra data in JSON mode
pub fn output_notices(
    output_format: &OutputFormat,
    notices: &[Notice],
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert("success".into(), json!(true));
            response.insert("notices".into(), serde_json::to_value(notices)?);
            merge(&mut response, data);
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            for notice in notices {
                if notice.is_error() {
                    eprintln!("! {}: {}", notice.title, notice.description);
                } else {
                    println!("✓ {} {}", notice.title, notice.description);
                }
            }
        }
    }
    Ok(())
}

/// Output items with their counters
pub fn output_items(
    output_format: &OutputFormat,
    items: &[ItemView],
    counts: Counts,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                "items": items,
                "counts": counts,
            }))?);
        }
        OutputFormat::Text => {
            for view in items {
                println!("{}", item_line(view));
                if let Some(content) = view.item.content.as_deref() {
                    println!("    {}", content);
                }
            }
            println!("{}", counts_line(counts));
        }
    }
    Ok(())
}

/// Output just the counters
pub fn output_counts(output_format: &OutputFormat, counts: Counts) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "counts": counts }))?);
        }
        OutputFormat::Text => {
            println!("{}", counts_line(counts));
        }
    }
    Ok(())
}

fn item_line(view: &ItemView) -> String {
    let mark = if view.item.completed { "x" } else { " " };
    let mut line = format!(
        "[{}] {}  {}  ({})",
        mark,
        view.item.id,
        view.item.title,
        view.item.created_at.format("%Y-%m-%d")
    );
    if let Some(owner) = &view.owner_label {
        line.push_str(&format!("  by {}", owner));
    }
    line
}

fn counts_line(counts: Counts) -> String {
    format!(
        "{} total, {} active, {} completed",
        counts.total, counts.active, counts.completed
    )
}

fn merge(response: &mut Map<String, Value>, data: Option<Value>) {
    if let Some(Value::Object(extra)) = data {
        response.extend(extra);
    }
}
