use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::ArgMatches;

use super::{engine_from_matches, load_config};
use crate::ui::formatters::print_snapshot;

/// Rates and CPU usage need two readings; wait at least this long between them
const MIN_SETTLE: Duration = Duration::from_millis(500);

/// Take two ticks a short interval apart and print the second.
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let mut engine = engine_from_matches(&config, matches)?;

    engine.tick(Utc::now());
    std::thread::sleep(engine.interval().max(MIN_SETTLE));
    let snapshot = engine.tick(Utc::now());

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}
