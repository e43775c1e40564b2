// src/cli/schedule.rs — The `schedule` subcommand: preview work units

use chrono::NaiveDate;

use crate::core::schedule::build_schedule;

pub fn show_schedule(start_date: NaiveDate, end_date: NaiveDate) -> anyhow::Result<()> {
    let units = build_schedule(start_date, end_date);
    if units.is_empty() {
        anyhow::bail!("no working days in range");
    }
    for unit in &units {
        println!("{} {}", unit.date, unit.shift);
    }
    println!("{} work units", units.len());
    Ok(())
}
