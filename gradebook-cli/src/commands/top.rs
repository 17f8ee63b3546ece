//! Top command - ranking by stored average score

use anyhow::Result;

use super::get_context;
use crate::output::{create_table, print_json};

pub fn run(limit: Option<usize>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let limit = limit.unwrap_or(ctx.config.default_top_limit);
    let ranked = ctx.ranking_service.top_users(limit)?;

    if json {
        return print_json(&ranked);
    }
    if ranked.is_empty() {
        println!("No users have an average yet. Run `gb recompute` first.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Rank", "ID", "Email", "Name", "Average"]);
    for r in &ranked {
        table.add_row(vec![
            r.rank.to_string(),
            r.user_id.to_string(),
            r.email.clone(),
            r.name.clone().unwrap_or_default(),
            format!("{:.2}", r.average_score),
        ]);
    }
    println!("{}", table);
    Ok(())
}
