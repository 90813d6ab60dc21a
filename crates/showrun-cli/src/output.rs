use serde::Serialize;
use showrun_core::show_order::Lineup;
use showrun_core::types::{ItemKind, ItemStatus};

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:w$}"))
        .collect();
    println!("{}", padded.join("  ").trim_end());
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    print_row(headers.iter().copied(), &widths);
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));
    for row in &rows {
        print_row(row.iter().map(String::as_str), &widths);
    }
}

/// Stage-board marker for a status.
pub fn marker(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::CurrentlyOnStage => ">>",
        ItemStatus::NextOnStage => " >",
        ItemStatus::NextOnDeck => " .",
        ItemStatus::Completed => " x",
        ItemStatus::NotStarted => "  ",
    }
}

pub fn minutes(m: u32) -> String {
    if m == 0 {
        "-".to_string()
    } else {
        format!("{m}m")
    }
}

pub fn print_lineup(lineup: &Lineup) {
    println!(
        "{} {}  (revision {}, cursor {})",
        lineup.event_id(),
        lineup.date(),
        lineup.revision(),
        lineup.cursor()
    );
    if lineup.is_empty() {
        println!("No items scheduled.");
        return;
    }
    let rows = lineup
        .items()
        .iter()
        .map(|item| {
            let kind = match &item.kind {
                ItemKind::ArtistSlot(_) => "artist".to_string(),
                ItemKind::Cue(cue) => cue.cue_type.to_string(),
            };
            vec![
                marker(item.status).to_string(),
                item.order.to_string(),
                item.id.clone(),
                kind,
                item.label().to_string(),
                minutes(item.planned_duration()),
                item.status.to_string(),
            ]
        })
        .collect();
    print_table(&["", "#", "ID", "KIND", "LABEL", "PLANNED", "STATUS"], rows);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_stage_marker_stands_out() {
        assert_eq!(marker(ItemStatus::CurrentlyOnStage), ">>");
        assert_eq!(marker(ItemStatus::NotStarted).trim(), "");
    }

    #[test]
    fn zero_minutes_renders_dash() {
        assert_eq!(minutes(0), "-");
        assert_eq!(minutes(25), "25m");
    }
}
