//! Status command - show gradebook summary

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output::{create_table, print_json};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        return print_json(&status);
    }

    println!("{}", "Gradebook Status".bold());
    println!();

    let mut table = create_table();
    table.add_row(vec!["Users", &status.total_users.to_string()]);
    table.add_row(vec!["Users with an average", &status.scored_users.to_string()]);
    table.add_row(vec!["Users without an average", &status.unscored_users.to_string()]);
    table.add_row(vec!["Projects", &status.total_projects.to_string()]);
    table.add_row(vec!["Corrections", &status.total_corrections.to_string()]);
    println!("{}", table);

    if let Some(db) = &status.database {
        println!();
        println!("Database: {}", db.dimmed());
    }

    Ok(())
}
