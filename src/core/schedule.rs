// src/core/schedule.rs — Work-unit schedule builder

use chrono::{Datelike, NaiveDate, Weekday};

use super::types::{Shift, WorkUnit};

/// Maximum consecutive weekdays assigned before the block counter resets.
const BLOCK_LEN: u32 = 5;

/// Expand an inclusive date range into an ordered sequence of work units.
///
/// Weekend days are never assigned and do not advance the shift rotation.
/// Assigned weekdays take shifts in strict round-robin order
/// morning → evening → night, independent of weekends skipped in between.
/// A weekend-only range yields an empty schedule; the orchestrator treats
/// that as a "no working days in range" error.
pub fn build_schedule(start: NaiveDate, end: NaiveDate) -> Vec<WorkUnit> {
    let mut units = Vec::new();
    let mut shift_idx = 0usize;
    let mut block = 0u32;

    let mut day = start;
    while day <= end {
        if is_weekend(day) {
            block = 0;
        } else {
            if block == BLOCK_LEN {
                block = 0;
            }
            units.push(WorkUnit {
                date: day,
                shift: Shift::CYCLE[shift_idx % Shift::CYCLE.len()],
            });
            shift_idx += 1;
            block += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    units
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
