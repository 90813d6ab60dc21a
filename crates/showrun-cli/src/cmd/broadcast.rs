use crate::output::{print_json, print_table};
use clap::Subcommand;
use showrun_core::emergency::{EmergencyBroadcast, EmergencyCode};
use std::path::Path;

#[derive(Subcommand)]
pub enum BroadcastSubcommand {
    /// Raise an emergency alert on every dashboard watching the event
    Create {
        event_id: String,
        message: String,
        /// red, orange, yellow, blue, or green
        #[arg(long, default_value = "red")]
        code: String,
    },
    /// List active alerts (or all with --all)
    List {
        event_id: String,
        #[arg(long)]
        all: bool,
    },
    /// Clear an alert
    Deactivate { event_id: String, id: String },
}

pub fn run(root: &Path, subcmd: BroadcastSubcommand, json: bool) -> anyhow::Result<()> {
    let coord = super::coordinator(root)?;
    match subcmd {
        BroadcastSubcommand::Create {
            event_id,
            message,
            code,
        } => {
            let code: EmergencyCode = code.parse()?;
            let broadcast = coord.create_broadcast(&event_id, &message, code)?;
            if json {
                print_json(&broadcast)
            } else {
                println!("Raised {} [{}]: {}", broadcast.id, code, broadcast.message);
                Ok(())
            }
        }
        BroadcastSubcommand::List { event_id, all } => {
            let broadcasts = if all {
                coord.broadcast_history(&event_id)?
            } else {
                coord.list_broadcasts(&event_id)?
            };
            if json {
                return print_json(&broadcasts);
            }
            if broadcasts.is_empty() {
                println!("No alerts.");
                return Ok(());
            }
            print_table(
                &["ID", "CODE", "ACTIVE", "RAISED", "MESSAGE"],
                broadcasts.iter().map(row).collect(),
            );
            Ok(())
        }
        BroadcastSubcommand::Deactivate { event_id, id } => {
            let result = coord.deactivate_broadcast(&event_id, &id)?;
            if json {
                print_json(&result)
            } else if result.was_active {
                println!("Cleared {id}");
                Ok(())
            } else {
                println!("{id} was already cleared");
                Ok(())
            }
        }
    }
}

fn row(b: &EmergencyBroadcast) -> Vec<String> {
    vec![
        b.id.clone(),
        b.code.to_string(),
        if b.is_active { "yes" } else { "no" }.to_string(),
        b.created_at.format("%H:%M:%S").to_string(),
        b.message.clone(),
    ]
}
