//! Recompute command - refresh stored weighted averages

use anyhow::Result;

use gradebook_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output::{self, print_json};

pub fn run(user: Option<i64>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    match user {
        Some(user_id) => match ctx.score_service.recompute_for_user(user_id) {
            Ok(average) => {
                log_event(&logger, LogEvent::new("recompute_completed").with_user(user_id));
                if json {
                    return print_json(&serde_json::json!({
                        "user_id": user_id,
                        "average_score": average,
                    }));
                }
                output::success(&format!("User {}: average score {:.2}", user_id, average));
            }
            Err(e) => {
                log_event(
                    &logger,
                    LogEvent::new("recompute_failed")
                        .with_user(user_id)
                        .with_error(e.to_string()),
                );
                return Err(e.into());
            }
        },
        None => match ctx.score_service.recompute_for_all_users() {
            Ok(summary) => {
                log_event(&logger, LogEvent::new("recompute_completed"));
                if json {
                    return print_json(&summary);
                }
                output::success(&format!("Updated {} user(s)", summary.updated));
                if summary.unchanged > 0 {
                    output::warning(&format!(
                        "{} user(s) without corrections left unchanged",
                        summary.unchanged
                    ));
                }
            }
            Err(e) => {
                log_event(&logger, LogEvent::new("recompute_failed").with_error(e.to_string()));
                return Err(e.into());
            }
        },
    }

    Ok(())
}
