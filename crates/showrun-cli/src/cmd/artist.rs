use crate::output::{minutes, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use showrun_core::store::{ArtistSlotRecord, SlotPatch};
use std::path::Path;

#[derive(Subcommand)]
pub enum ArtistSubcommand {
    /// Register an artist for an event
    Add {
        event_id: String,
        artist_id: String,
        /// Name shown on stage boards
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        style: String,
        /// Planned set length in minutes
        #[arg(long, default_value_t = 0)]
        duration: u32,
    },
    /// List an event's artists
    List { event_id: String },
    /// Update an artist's metadata
    Update {
        event_id: String,
        artist_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        style: Option<String>,
        /// Planned set length in minutes
        #[arg(long)]
        duration: Option<u32>,
        /// Minutes actually played
        #[arg(long)]
        actual: Option<u32>,
        #[arg(long)]
        rehearsed: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ArtistSubcommand, json: bool) -> anyhow::Result<()> {
    let coord = super::coordinator(root)?;
    match subcmd {
        ArtistSubcommand::Add {
            event_id,
            artist_id,
            name,
            style,
            duration,
        } => {
            let mut record = ArtistSlotRecord::new(&artist_id, name);
            record.style = style;
            record.planned_duration = duration;
            coord
                .register_artist(&event_id, &record)
                .with_context(|| format!("failed to register '{artist_id}'"))?;
            if json {
                print_json(&record)
            } else {
                println!("Registered '{artist_id}' for '{event_id}'");
                Ok(())
            }
        }
        ArtistSubcommand::List { event_id } => {
            let artists = coord.list_artists(&event_id)?;
            if json {
                return print_json(&artists);
            }
            if artists.is_empty() {
                println!("No artists registered for '{event_id}'.");
                return Ok(());
            }
            let rows = artists
                .iter()
                .map(|a| {
                    vec![
                        a.artist_id.clone(),
                        a.display_name.clone(),
                        a.style.clone(),
                        minutes(a.planned_duration),
                        a.performance_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        a.status.to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "STYLE", "PLANNED", "DATE", "STATUS"], rows);
            Ok(())
        }
        ArtistSubcommand::Update {
            event_id,
            artist_id,
            name,
            style,
            duration,
            actual,
            rehearsed,
            notes,
        } => {
            let patch = SlotPatch {
                display_name: name,
                style,
                planned_duration: duration,
                actual_duration: actual,
                rehearsal_completed: rehearsed,
                notes,
            };
            let record = coord
                .update_artist(&event_id, &artist_id, &patch)
                .with_context(|| format!("failed to update '{artist_id}'"))?;
            if json {
                print_json(&record)
            } else {
                println!("Updated '{artist_id}'");
                Ok(())
            }
        }
    }
}
