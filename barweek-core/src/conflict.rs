//! Arrival-time conflict detection.
//!
//! Two agenda entries conflict when they fall on the same calendar date and
//! their arrival instants are less than the threshold apart. Entries on other
//! dates never conflict, however close their clock times are.

use std::fmt;

use tracing::{debug, warn};

use crate::constants::MIN_MINUTES_BETWEEN_ARRIVALS;
use crate::event::Event;
use crate::time_slots::arrival_instant;

/// An existing agenda entry joined with its event.
#[derive(Debug, Clone)]
pub struct ScheduledEntry<'a> {
    pub event: &'a Event,
    /// Stored arrival time; `None` means the event's own start time.
    pub arrival_time: Option<&'a str>,
}

impl ScheduledEntry<'_> {
    fn effective_arrival(&self) -> Option<&str> {
        self.arrival_time.or(self.event.time.as_deref())
    }
}

/// The first existing entry found too close to a candidate arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub event_id: String,
    pub event_name: String,
    pub arrival_time: String,
    pub minutes_apart: i64,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Arrival time conflict with \"{}\" (arrival: {}). Please choose an arrival time at least {} minutes apart.",
            self.event_name, self.arrival_time, MIN_MINUTES_BETWEEN_ARRIVALS
        )
    }
}

/// Find the first same-date entry whose arrival is within the threshold.
///
/// Entries for the candidate event itself are skipped, so the same check
/// serves both adding and moving an arrival time.
pub fn find_conflict<'a, I>(candidate: &Event, arrival: &str, existing: I) -> Option<Conflict>
where
    I: IntoIterator<Item = ScheduledEntry<'a>>,
{
    let candidate_date = candidate.parsed_date()?;
    let candidate_instant = arrival_instant(candidate, arrival)?;

    for entry in existing {
        if entry.event.id == candidate.id || entry.event.parsed_date() != Some(candidate_date) {
            continue;
        }

        let Some(existing_arrival) = entry.effective_arrival() else {
            continue;
        };
        let Some(existing_instant) = arrival_instant(entry.event, existing_arrival) else {
            warn!(
                event = %entry.event.id,
                arrival = existing_arrival,
                "Skipping agenda entry with unparseable arrival time"
            );
            continue;
        };

        let minutes_apart = (candidate_instant - existing_instant).num_minutes().abs();
        if minutes_apart < MIN_MINUTES_BETWEEN_ARRIVALS {
            debug!(
                candidate = %candidate.id,
                existing = %entry.event.id,
                minutes_apart,
                "Arrival time conflict"
            );
            return Some(Conflict {
                event_id: entry.event.id.clone(),
                event_name: entry.event.name.clone(),
                arrival_time: existing_arrival.to_string(),
                minutes_apart,
            });
        }
    }

    None
}

pub fn has_conflict<'a, I>(candidate: &Event, arrival: &str, existing: I) -> bool
where
    I: IntoIterator<Item = ScheduledEntry<'a>>,
{
    find_conflict(candidate, arrival, existing).is_some()
}
