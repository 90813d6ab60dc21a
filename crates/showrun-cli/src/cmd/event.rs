use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use showrun_core::paths;
use showrun_core::store::EventRecord;
use std::path::Path;

#[derive(Subcommand)]
pub enum EventSubcommand {
    /// Create an event
    Create {
        event_id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Performance dates, YYYY-MM-DD (repeatable)
        #[arg(long = "date")]
        dates: Vec<String>,
    },
    /// List events
    List,
}

pub fn run(root: &Path, subcmd: EventSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EventSubcommand::Create {
            event_id,
            name,
            dates,
        } => create(root, &event_id, &name, &dates, json),
        EventSubcommand::List => list(root, json),
    }
}

fn create(
    root: &Path,
    event_id: &str,
    name: &str,
    dates: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let coord = super::coordinator(root)?;
    let dates = dates
        .iter()
        .map(|d| paths::parse_date(d))
        .collect::<Result<Vec<_>, _>>()?;
    let event = EventRecord::new(event_id, name, dates);
    coord
        .create_event(&event)
        .with_context(|| format!("failed to create event '{event_id}'"))?;

    if json {
        print_json(&event)?;
    } else {
        println!("Created event '{event_id}'");
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let events = super::coordinator(root)?.list_events()?;
    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }
    let rows = events
        .iter()
        .map(|e| {
            let dates: Vec<String> = e.dates.iter().map(|d| d.to_string()).collect();
            vec![e.id.clone(), e.name.clone(), dates.join(", ")]
        })
        .collect();
    print_table(&["ID", "NAME", "DATES"], rows);
    Ok(())
}
