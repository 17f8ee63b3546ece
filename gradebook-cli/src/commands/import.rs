//! Import command - load corrections from CSV

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;

use super::get_context;
use crate::output::{self, create_table, print_json};

pub fn run(file: &Path, dry_run: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.import_service.import_corrections(file, dry_run)?;

    if json {
        print_json(&result)?;
    } else {
        if dry_run {
            println!("{}", "Dry run - nothing was written".yellow());
        }
        println!("Rows read: {}", result.rows_read);
        if dry_run {
            println!("Rows valid: {}", result.rows_read - result.errors.len());
        } else {
            output::success(&format!("Imported {} correction(s)", result.imported));
        }

        if !result.errors.is_empty() {
            println!();
            output::warning(&format!("{} row(s) rejected:", result.errors.len()));
            let mut table = create_table();
            table.set_header(vec!["Line", "Problem"]);
            for err in &result.errors {
                table.add_row(vec![err.line.to_string(), err.message.clone()]);
            }
            println!("{}", table);
        }

        if result.imported > 0 {
            output::info("Run `gb recompute` to refresh stored averages.");
        }
    }

    if result.rows_read > 0 && result.errors.len() == result.rows_read {
        bail!("No valid rows in {}", file.display());
    }
    Ok(())
}
