use crate::output::{print_json, print_lineup};
use anyhow::Context;
use clap::Subcommand;
use showrun_core::coordinator::{Coordinator, LineupUpdate, NewItem};
use showrun_core::paths;
use showrun_core::show_order::Cursor;
use showrun_core::store::CuePatch;
use showrun_core::types::{CueType, ItemStatus};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum OrderSubcommand {
    /// Print the running order with the current spotlight
    Show { event_id: String, date: String },
    /// Bring the next item on stage
    Advance {
        event_id: String,
        date: String,
        /// Cursor the operator saw: `pre-show` or a 1-based position.
        /// A repeated command from the same cursor is ignored.
        #[arg(long, value_parser = parse_cursor)]
        from: Option<Cursor>,
    },
    /// Step back to the previous item
    Retreat {
        event_id: String,
        date: String,
        /// Cursor the operator saw: `pre-show` or a 1-based position
        #[arg(long, value_parser = parse_cursor)]
        from: Option<Cursor>,
    },
    /// Schedule a registered artist
    AddArtist {
        event_id: String,
        date: String,
        artist_id: String,
        /// Place before the item currently holding this order number
        #[arg(long)]
        order: Option<u32>,
    },
    /// Schedule a cue (MC break, video, intermission, ...)
    AddCue {
        event_id: String,
        date: String,
        /// mc_break, video_break, intermission, announcement, or changeover
        #[arg(long = "type")]
        cue_type: String,
        #[arg(long)]
        title: String,
        /// Planned length in minutes
        #[arg(long, default_value_t = 0)]
        duration: u32,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        order: Option<u32>,
    },
    /// Edit a cue without moving it
    UpdateCue {
        event_id: String,
        cue_id: String,
        #[arg(long = "type")]
        cue_type: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Take an item off the running order
    Remove {
        event_id: String,
        date: String,
        item_id: String,
    },
    /// Move an item to a 1-based position
    Move {
        event_id: String,
        date: String,
        item_id: String,
        position: usize,
    },
    /// Force an item's status; the rest of the lineup follows
    SetStatus {
        event_id: String,
        item_id: String,
        /// not_started, next_on_deck, next_on_stage, currently_on_stage, or completed
        status: String,
        /// Performance date; looked up when omitted
        #[arg(long)]
        date: Option<String>,
    },
}

/// Parse an operator cursor: `pre-show`, `3` or `#3` (1-based).
fn parse_cursor(raw: &str) -> Result<Cursor, String> {
    if raw == "pre-show" {
        return Ok(Cursor::PreShow);
    }
    match raw.trim_start_matches('#').parse::<usize>() {
        Ok(n) if n > 0 => Ok(Cursor::OnStage(n - 1)),
        _ => Err(format!(
            "invalid cursor '{raw}': expected `pre-show` or a position starting at 1"
        )),
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: OrderSubcommand, json: bool) -> anyhow::Result<()> {
    let coord = super::coordinator(root)?;
    match subcmd {
        OrderSubcommand::Show { event_id, date } => {
            let lineup = coord.load(&event_id, paths::parse_date(&date)?)?;
            if json {
                print_json(&serde_json::json!({
                    "lineup": lineup,
                    "spotlight": lineup.spotlight(),
                }))
            } else {
                print_lineup(&lineup);
                Ok(())
            }
        }
        OrderSubcommand::Advance {
            event_id,
            date,
            from,
        } => {
            let update = coord
                .advance(&event_id, paths::parse_date(&date)?, from)
                .context("advance failed")?;
            report(update, json)
        }
        OrderSubcommand::Retreat {
            event_id,
            date,
            from,
        } => {
            let update = coord
                .retreat(&event_id, paths::parse_date(&date)?, from)
                .context("retreat failed")?;
            report(update, json)
        }
        OrderSubcommand::AddArtist {
            event_id,
            date,
            artist_id,
            order,
        } => insert(
            &coord,
            &event_id,
            &date,
            NewItem::Artist { artist_id, order },
            json,
        ),
        OrderSubcommand::AddCue {
            event_id,
            date,
            cue_type,
            title,
            duration,
            notes,
            order,
        } => {
            let item = NewItem::Cue {
                cue_type: cue_type.parse()?,
                title,
                planned_duration: duration,
                notes,
                order,
            };
            insert(&coord, &event_id, &date, item, json)
        }
        OrderSubcommand::UpdateCue {
            event_id,
            cue_id,
            cue_type,
            title,
            duration,
            notes,
        } => {
            let patch = CuePatch {
                cue_type: cue_type.as_deref().map(str::parse::<CueType>).transpose()?,
                title,
                planned_duration: duration,
                notes,
            };
            let record = coord
                .update_cue(&event_id, &cue_id, &patch)
                .with_context(|| format!("failed to update '{cue_id}'"))?;
            if json {
                print_json(&record)
            } else {
                println!("Updated '{cue_id}'");
                Ok(())
            }
        }
        OrderSubcommand::Remove {
            event_id,
            date,
            item_id,
        } => {
            let update = coord
                .remove(&event_id, paths::parse_date(&date)?, &item_id)
                .with_context(|| format!("failed to remove '{item_id}'"))?;
            report(update, json)
        }
        OrderSubcommand::Move {
            event_id,
            date,
            item_id,
            position,
        } => {
            if position == 0 {
                anyhow::bail!("positions start at 1");
            }
            let update = coord
                .move_item(&event_id, paths::parse_date(&date)?, &item_id, position - 1)
                .with_context(|| format!("failed to move '{item_id}'"))?;
            report(update, json)
        }
        OrderSubcommand::SetStatus {
            event_id,
            item_id,
            status,
            date,
        } => {
            let status: ItemStatus = status.parse()?;
            let date = date.as_deref().map(paths::parse_date).transpose()?;
            let update = coord
                .set_status(&event_id, &item_id, date, status)
                .with_context(|| format!("failed to set status of '{item_id}'"))?;
            report(update, json)
        }
    }
}

fn insert(
    coord: &Coordinator,
    event_id: &str,
    date: &str,
    item: NewItem,
    json: bool,
) -> anyhow::Result<()> {
    let update = coord
        .insert(event_id, paths::parse_date(date)?, item)
        .context("failed to schedule item")?;
    if !json {
        if let Some(id) = &update.item_id {
            println!("Scheduled '{id}'");
        }
    }
    report(update, json)
}

fn report(update: LineupUpdate, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&update);
    }
    if !update.changed {
        println!("Already applied; nothing changed.");
    }
    print_lineup(&update.lineup);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_accepts_pre_show_and_positions() {
        assert_eq!(parse_cursor("pre-show"), Ok(Cursor::PreShow));
        assert_eq!(parse_cursor("1"), Ok(Cursor::OnStage(0)));
        assert_eq!(parse_cursor("#3"), Ok(Cursor::OnStage(2)));
        assert!(parse_cursor("0").is_err());
        assert!(parse_cursor("soon").is_err());
    }
}
