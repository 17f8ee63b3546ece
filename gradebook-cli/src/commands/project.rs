//! Project commands

use anyhow::Result;
use clap::Subcommand;

use gradebook_core::Project;

use super::get_context;
use crate::output::{self, create_table, print_json};

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project
    Add {
        /// Project name
        name: String,
        /// Weight of the project in averages
        #[arg(long, default_value_t = Project::DEFAULT_WEIGHT)]
        weight: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all projects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ProjectCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ProjectCommands::Add { name, weight, json } => {
            let project = ctx.course_service.add_project(&name, weight)?;
            if json {
                return print_json(&project);
            }
            output::success(&format!(
                "Created project {} \"{}\" (weight {})",
                project.id, project.name, project.weight
            ));
        }
        ProjectCommands::List { json } => {
            let projects = ctx.course_service.list_projects()?;
            if json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                println!("No projects found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Name", "Weight"]);
            for p in &projects {
                table.add_row(vec![p.id.to_string(), p.name.clone(), p.weight.to_string()]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
