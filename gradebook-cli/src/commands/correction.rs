//! Correction commands

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output::{self, create_table, print_json};

#[derive(Subcommand)]
pub enum CorrectionCommands {
    /// Record a score for a user on a project
    Add {
        /// User id
        user_id: i64,
        /// Project id
        project_id: i64,
        /// Score obtained
        score: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a user's corrections
    List {
        /// User id
        user_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CorrectionCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        CorrectionCommands::Add { user_id, project_id, score, json } => {
            let correction = ctx.course_service.add_correction(user_id, project_id, score)?;
            if json {
                return print_json(&correction);
            }
            output::success(&format!(
                "Recorded score {} for user {} on project {}",
                correction.score, correction.user_id, correction.project_id
            ));
            output::info("Run `gb recompute` to refresh stored averages.");
        }
        CorrectionCommands::List { user_id, json } => {
            let lines = ctx.course_service.list_corrections(user_id)?;
            if json {
                return print_json(&lines);
            }
            if lines.is_empty() {
                println!("No corrections for user {}.", user_id);
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Project", "Name", "Score", "Weight"]);
            for line in &lines {
                table.add_row(vec![
                    line.project_id.to_string(),
                    line.project_name.clone(),
                    line.score.to_string(),
                    line.weight.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
