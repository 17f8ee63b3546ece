//! Query command - run read-only SQL against the gradebook

use std::io::{self, IsTerminal, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::get_context;
use crate::output::create_table;

pub fn run(sql: Option<&str>, file: Option<&Path>, format: &str) -> Result<()> {
    // SQL comes from the argument, a file, or piped stdin
    let sql_content = if let Some(sql) = sql {
        sql.to_string()
    } else if let Some(file_path) = file {
        std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read SQL file: {:?}", file_path))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read SQL from stdin")?;
        buffer
    } else {
        bail!("No SQL query provided. Use positional argument, --file, or pipe from stdin.");
    };

    let ctx = get_context()?;
    let result = ctx.query_service.execute(&sql_content)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "csv" => {
            println!("{}", result.columns.join(","));
            for row in &result.rows {
                let values: Vec<String> = row.iter().map(value_to_csv).collect();
                println!("{}", values.join(","));
            }
        }
        _ => {
            let mut table = create_table();
            table.set_header(&result.columns);
            for row in &result.rows {
                let values: Vec<String> = row.iter().map(value_to_string).collect();
                table.add_row(values);
            }

            println!("{}", table);
            println!();
            println!("{} row(s) returned", result.row_count);
        }
    }

    Ok(())
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => v.to_string(),
    }
}

fn value_to_csv(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) if s.contains([',', '"', '\n']) => {
            format!("\"{}\"", s.replace('"', "\"\""))
        }
        serde_json::Value::String(s) => s.clone(),
        _ => v.to_string(),
    }
}
