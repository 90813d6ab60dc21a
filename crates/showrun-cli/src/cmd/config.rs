use crate::output::print_json;
use showrun_core::config::{Config, WarnLevel};
use std::path::Path;

/// Print the effective config and any validation findings. Errors fail the command.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({
            "config": config,
            "warnings": warnings,
        }))?;
    } else {
        println!("show:   {}", config.show.name);
        println!("port:   {}", config.server.port);
        println!(
            "sync:   reconnect {}s, poll {}s, buffer {}, prune {}s, watch {}ms",
            config.sync.reconnect_interval_secs,
            config.sync.poll_interval_secs,
            config.sync.session_buffer,
            config.sync.prune_interval_secs,
            config.sync.watch_interval_ms
        );
        println!("store:  timeout {}ms", config.store.timeout_ms);
        for w in &warnings {
            let level = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{level}: {}", w.message);
        }
    }

    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config has {errors} error(s)");
    }
    Ok(())
}
