//! Score commands - read-only views of a user's average

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_context;
use crate::output::{create_table, format_score, print_json};

#[derive(Subcommand)]
pub enum ScoreCommands {
    /// Show how a user's average would be computed, without storing it
    Preview {
        /// User id
        user_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ScoreCommands) -> Result<()> {
    match command {
        ScoreCommands::Preview { user_id, json } => {
            let ctx = get_context()?;
            let breakdown = ctx.score_service.preview_for_user(user_id)?;
            let stored = ctx.user_service.get_user(user_id)?.average_score;

            if json {
                return print_json(&serde_json::json!({
                    "breakdown": breakdown,
                    "stored_average": stored,
                }));
            }

            let mut table = create_table();
            table.set_header(vec!["Project", "Name", "Score", "Weight", "Score x Weight"]);
            for line in &breakdown.lines {
                table.add_row(vec![
                    line.project_id.to_string(),
                    line.project_name.clone(),
                    line.score.to_string(),
                    line.weight.to_string(),
                    format!("{:.2}", line.score * line.weight),
                ]);
            }
            println!("{}", table);
            println!();
            println!("Total weight: {}", breakdown.total_weight());
            println!(
                "Computed average: {}",
                format_score(breakdown.average).bold()
            );
            println!("Stored average: {}", format_score(stored));
        }
    }

    Ok(())
}
