//! Town command - list, show, select and clear the town

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Select;

use renizo_core::ports::TownCatalog;
use renizo_core::{LogEvent, OperationResult, Town, TownId};

use super::{get_context, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum TownCommands {
    /// List the towns Renizo serves
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the selected town
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Select a town (prompted from the catalog if omitted)
    Set {
        /// Town id, e.g. "porto"
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the selected town
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TownCommands) -> Result<()> {
    match command {
        TownCommands::List { json } => list(json),
        TownCommands::Show { json } => show(json),
        TownCommands::Set { id, json } => set(id, json),
        TownCommands::Clear { json } => clear(json),
    }
}

fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let towns = ctx.catalog.list_towns();
    let selected = ctx.locality.get_selected_town_id();

    if json {
        return output::json(&towns);
    }

    let mut table = output::create_table();
    table.set_header(vec!["", "Id", "Name"]);
    for town in &towns {
        let marker = if selected.as_ref() == Some(&town.id) {
            "*".green().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![marker, town.id.to_string(), town.name.clone()]);
    }
    println!("{}", table);
    Ok(())
}

fn show(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let stored = ctx.locality.get_selected_town_id();
    let town = ctx.selected_town();

    if json {
        return output::json(&town);
    }

    match (town, stored) {
        (Some(town), _) => println!("{} ({})", town.name.bold(), town.id),
        (None, Some(id)) => output::warning(&format!(
            "Selected town '{}' is not in the catalog. Run 'renizo town set' to choose another.",
            id
        )),
        (None, None) => println!("{}", "No town selected".dimmed()),
    }
    Ok(())
}

fn set(id: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let id = match id {
        // Catalog ids never carry surrounding whitespace; typed input might
        Some(id) => TownId::new(id.trim())?,
        None => {
            let towns = ctx.catalog.list_towns();
            let names: Vec<&str> = towns.iter().map(|t| t.name.as_str()).collect();
            let choice = Select::new()
                .with_prompt("Town")
                .items(&names)
                .default(0)
                .interact()?;
            towns[choice].id.clone()
        }
    };

    let town: Town = match ctx.select_town(&id) {
        Ok(town) => town,
        Err(e) => {
            if json {
                output::json(&OperationResult::<Town>::fail(e.to_string()))?;
                std::process::exit(1);
            }
            let known: Vec<String> = ctx
                .catalog
                .list_towns()
                .iter()
                .map(|t| t.id.to_string())
                .collect();
            output::error(&e.to_string());
            eprintln!("{}", format!("Known towns: {}", known.join(", ")).dimmed());
            std::process::exit(1);
        }
    };

    log_event(
        &get_logger(),
        LogEvent::new("town_selected")
            .with_command("town set")
            .with_town(&town.id),
    );

    if !ctx.locality.is_persistent() {
        output::warning("Storage is unavailable: the selection will not be remembered");
    }

    if json {
        return output::json(&OperationResult::ok(town));
    }
    output::success(&format!("Selected {}", town.name));
    Ok(())
}

fn clear(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let had_town = ctx.locality.has_selected_town();
    ctx.locality.clear_selected_town_id();

    log_event(
        &get_logger(),
        LogEvent::new("town_cleared").with_command("town clear"),
    );

    if json {
        return output::json(&OperationResult::ok(serde_json::json!({ "hadTown": had_town })));
    }
    if had_town {
        output::success("Town selection cleared");
    } else {
        output::info("No town was selected");
    }
    Ok(())
}
