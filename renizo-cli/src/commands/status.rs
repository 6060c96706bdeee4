//! Status command - storage backend, selected town and session at a glance

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use renizo_core::{StorageStatus, Town};

use super::auth::SessionSummary;
use super::get_context;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    storage: StorageStatus,
    selected_town: Option<Town>,
    /// Stored id the catalog no longer knows about
    #[serde(skip_serializing_if = "Option::is_none")]
    unknown_town_id: Option<String>,
    session: SessionSummary,
}

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;

    let selected_town = ctx.selected_town();
    let unknown_town_id = match (&selected_town, ctx.locality.get_selected_town_id()) {
        (None, Some(id)) => Some(id.to_string()),
        _ => None,
    };
    let report = StatusReport {
        storage: ctx.storage_status(),
        selected_town,
        unknown_town_id,
        session: SessionSummary::of(&ctx.sessions),
    };

    if json {
        return output::json(&report);
    }

    println!("{}", "Renizo Status".bold());
    println!();

    let mut table = output::create_table();
    let storage_label = if report.storage.persistent {
        report.storage.backend.clone()
    } else {
        format!("{} (not persistent)", report.storage.backend)
    };
    table.add_row(vec!["Storage".to_string(), storage_label]);
    table.add_row(vec![
        "Session persistence".to_string(),
        if report.storage.persist_session { "on" } else { "off" }.to_string(),
    ]);
    table.add_row(vec![
        "Town".to_string(),
        match (&report.selected_town, &report.unknown_town_id) {
            (Some(town), _) => format!("{} ({})", town.name, town.id),
            (None, Some(id)) => format!("{} (not in catalog)", id),
            (None, None) => "none".to_string(),
        },
    ]);
    table.add_row(vec!["Session".to_string(), report.session.describe()]);
    println!("{}", table);

    if let Some(reason) = &report.storage.unavailable_reason {
        println!();
        output::warning(&format!("Nothing is being persisted: {}", reason));
    }

    if report.session.expired {
        // Don't keep an expired session lying around once it has been reported
        ctx.sessions.clear_if_expired();
    }

    Ok(())
}
