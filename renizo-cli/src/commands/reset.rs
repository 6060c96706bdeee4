//! Reset command - forget everything stored on this machine

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use renizo_core::{LogEvent, OperationResult};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if !force && !json {
        println!(
            "\n{}",
            "This will sign you out and forget the selected town.".yellow()
        );
        println!("{}\n", "Settings and the event log are kept.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.reset();
    log_event(&get_logger(), LogEvent::new("reset").with_command("reset"));

    if json {
        return output::json(&OperationResult::ok(ctx.storage_status()));
    }
    output::success("Local data cleared");
    Ok(())
}
