//! Event end times and arrival slots.
//!
//! The end of an event is derived from its start and the free-text range
//! visitors see ("8pm - 11pm", "7pm till late"). Arrival slots are offered
//! every 30 minutes from the start, stopping short of the end buffer.

use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::warn;

use crate::constants::{
    DEFAULT_EVENT_DURATION_MINUTES, END_BUFFER_MINUTES, LATE_NIGHT_END,
    MIN_DURATION_FOR_TWO_SLOTS_MINUTES, SLOT_INTERVAL_MINUTES,
};
use crate::event::{Event, format_clock_time, parse_clock_time, parse_date};

/// "<start> - <end> am|pm", with optional minutes and an optional period on the start.
static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}):?(\d{0,2})\s*(am|pm)?\s*[-–]\s*(\d{1,2}):?(\d{0,2})\s*(am|pm)")
        .expect("time range pattern is valid")
});

const OPEN_ENDED_PHRASES: [&str; 2] = ["till late", "till sold out"];

/// Compute when an event ends.
///
/// Never fails: a TBA event or an unparseable date yields the current time,
/// and an unparseable start time falls back to the default duration from
/// midnight of the event date.
pub fn compute_event_end(event: &Event) -> NaiveDateTime {
    let (Some(date_str), Some(time_str)) = (event.date.as_deref(), event.time.as_deref()) else {
        return Local::now().naive_local();
    };

    let Some(date) = parse_date(date_str) else {
        warn!(event = %event.id, date = date_str, "Unparseable event date, using current time");
        return Local::now().naive_local();
    };

    let start = match parse_clock_time(time_str) {
        Some(time) => date.and_time(time),
        None => {
            warn!(event = %event.id, time = time_str, "Unparseable start time, using default duration");
            return date.and_time(NaiveTime::MIN) + Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES);
        }
    };

    let range = event
        .time_range_display
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    if OPEN_ENDED_PHRASES.iter().any(|phrase| range.contains(phrase)) {
        let next_day = date + Duration::days(1);
        return next_day.and_time(LATE_NIGHT_END);
    }

    if let Some(caps) = TIME_RANGE.captures(&range) {
        match parse_range_end(&caps[4], &caps[5], &caps[6]) {
            Some(end_time) => {
                let end = date.and_time(end_time);
                return if end <= start { end + Duration::days(1) } else { end };
            }
            None => {
                warn!(event = %event.id, range = %range, "Time range end is out of bounds, using default duration");
            }
        }
    }

    start + Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES)
}

/// Convert the end half of a range ("11", "30", "pm") to a clock time.
fn parse_range_end(hour: &str, minute: &str, period: &str) -> Option<NaiveTime> {
    let mut hours: u32 = hour.parse().ok()?;
    let minutes: u32 = if minute.is_empty() { 0 } else { minute.parse().ok()? };

    match period {
        "pm" if hours != 12 => hours += 12,
        "am" if hours == 12 => hours = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// Arrival instants for an event, strictly increasing.
///
/// Empty for TBA events. Events lasting at least an hour always get a second
/// slot, even when the 30-minute stride alone would only produce one.
pub fn arrival_slot_instants(event: &Event) -> Vec<NaiveDateTime> {
    if event.is_tba() {
        return Vec::new();
    }
    let Some(start) = event.start() else {
        warn!(event = %event.id, "Event start does not parse, no arrival slots offered");
        return Vec::new();
    };

    let end = compute_event_end(event);
    let cutoff = end - Duration::minutes(END_BUFFER_MINUTES);
    let step = Duration::minutes(SLOT_INTERVAL_MINUTES);

    let mut slots = Vec::new();
    let mut current = start;
    while current < cutoff {
        slots.push(current);
        current += step;
    }

    if (end - start).num_minutes() >= MIN_DURATION_FOR_TWO_SLOTS_MINUTES {
        while slots.len() < 2 {
            let next = slots.last().map_or(start, |last| *last + step);
            slots.push(next);
        }
    }

    slots
}

/// Arrival slots formatted as "HH:mm".
pub fn generate_arrival_slots(event: &Event) -> Vec<String> {
    arrival_slot_instants(event)
        .iter()
        .map(|slot| format_clock_time(&slot.time()))
        .collect()
}

/// Anchor an arrival clock time to an event's date.
///
/// A time earlier than the event's start stays on the event date unless it
/// is one of the event's own slots past midnight, so "00:30" at a 23:00-2am
/// event sorts after the start while "19:45" at a 20:00 event does not.
pub fn arrival_instant(event: &Event, arrival: &str) -> Option<NaiveDateTime> {
    let date = event.parsed_date()?;
    let time = parse_clock_time(arrival)?;
    let instant = date.and_time(time);

    match event.parsed_time() {
        Some(start) if time < start => {
            let next_day = instant + Duration::days(1);
            if arrival_slot_instants(event).contains(&next_day) {
                Some(next_day)
            } else {
                Some(instant)
            }
        }
        _ => Some(instant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(date: Option<&str>, time: Option<&str>, range: Option<&str>) -> Event {
        let mut e = Event::new("evt", "Test Event", date, time);
        e.time_range_display = range.map(str::to_string);
        e
    }

    fn at(date: (i32, u32, u32), hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    // --- compute_event_end ---

    #[test]
    fn explicit_range_same_day() {
        let e = event(Some("2025-10-07"), Some("20:00"), Some("8pm-11pm"));
        assert_eq!(compute_event_end(&e), at((2025, 10, 7), 23, 0));
    }

    #[test]
    fn explicit_range_crossing_midnight() {
        let e = event(Some("2025-10-07"), Some("23:00"), Some("11pm-2am"));
        assert_eq!(compute_event_end(&e), at((2025, 10, 8), 2, 0));
    }

    #[test]
    fn range_with_minutes_and_spaces() {
        let e = event(Some("2025-10-07"), Some("15:00"), Some("3pm - 7:30pm"));
        assert_eq!(compute_event_end(&e), at((2025, 10, 7), 19, 30));
    }

    #[test]
    fn twelve_hour_edge_cases() {
        let noon = event(Some("2025-10-07"), Some("09:00"), Some("9am - 12pm"));
        assert_eq!(compute_event_end(&noon), at((2025, 10, 7), 12, 0));

        let midnight = event(Some("2025-10-07"), Some("20:00"), Some("8pm - 12am"));
        assert_eq!(compute_event_end(&midnight), at((2025, 10, 8), 0, 0));
    }

    #[test]
    fn till_late_ends_at_two_next_day_regardless_of_start() {
        for start in ["12:00", "19:00", "23:30"] {
            let e = event(Some("2025-10-07"), Some(start), Some("7pm Till Late"));
            assert_eq!(compute_event_end(&e), at((2025, 10, 8), 2, 0));
        }
        let sold_out = event(Some("2025-10-07"), Some("18:00"), Some("6pm till sold out"));
        assert_eq!(compute_event_end(&sold_out), at((2025, 10, 8), 2, 0));
    }

    #[test]
    fn no_range_defaults_to_three_hours() {
        let e = event(Some("2025-10-07"), Some("18:00"), Some("6pm onwards"));
        assert_eq!(compute_event_end(&e), at((2025, 10, 7), 21, 0));

        let bare = event(Some("2025-10-07"), Some("18:00"), None);
        assert_eq!(compute_event_end(&bare), at((2025, 10, 7), 21, 0));
    }

    #[test]
    fn out_of_bounds_range_end_falls_back_to_default() {
        let e = event(Some("2025-10-07"), Some("18:00"), Some("6pm - 13pm"));
        assert_eq!(compute_event_end(&e), at((2025, 10, 7), 21, 0));
    }

    #[test]
    fn malformed_time_falls_back_from_midnight() {
        let e = event(Some("2025-10-07"), Some("late-ish"), None);
        assert_eq!(compute_event_end(&e), at((2025, 10, 7), 3, 0));
    }

    #[test]
    fn malformed_date_does_not_panic() {
        let before = Local::now().naive_local();
        let e = event(Some("next tuesday"), Some("18:00"), None);
        assert!(compute_event_end(&e) >= before);
    }

    // --- generate_arrival_slots ---

    #[test]
    fn tba_has_no_slots() {
        assert!(generate_arrival_slots(&event(None, Some("20:00"), None)).is_empty());
        assert!(generate_arrival_slots(&event(Some("2025-10-07"), None, None)).is_empty());
    }

    #[test]
    fn slots_stop_before_end_buffer() {
        let e = event(Some("2025-10-07"), Some("20:00"), Some("8pm-11pm"));
        assert_eq!(
            generate_arrival_slots(&e),
            vec!["20:00", "20:30", "21:00", "21:30", "22:00"]
        );
    }

    #[test]
    fn one_hour_event_gets_two_slots() {
        let e = event(Some("2025-10-07"), Some("20:00"), Some("8pm - 9pm"));
        assert_eq!(generate_arrival_slots(&e), vec!["20:00", "20:30"]);
    }

    #[test]
    fn short_event_keeps_single_slot() {
        let e = event(Some("2025-10-07"), Some("20:00"), Some("8pm - 8:45pm"));
        assert_eq!(generate_arrival_slots(&e), vec!["20:00"]);
    }

    #[test]
    fn slots_are_increasing_and_within_buffer() {
        let ranges = [
            Some("8pm-11pm"),
            Some("11pm-2am"),
            Some("7pm till late"),
            Some("5pm - 6pm"),
            None,
        ];
        for range in ranges {
            let e = event(Some("2025-10-07"), Some("19:00"), range);
            let end = compute_event_end(&e);
            let slots = arrival_slot_instants(&e);

            assert!(!slots.is_empty(), "range {:?} should offer slots", range);
            assert!(slots.windows(2).all(|w| w[0] < w[1]));
            assert!(
                slots
                    .iter()
                    .all(|s| *s <= end - Duration::minutes(END_BUFFER_MINUTES))
            );
        }
    }

    #[test]
    fn slots_crossing_midnight_format_as_clock_time() {
        let e = event(Some("2025-10-07"), Some("23:00"), Some("11pm-2am"));
        assert_eq!(
            generate_arrival_slots(&e),
            vec!["23:00", "23:30", "00:00", "00:30", "01:00"]
        );
    }

    // --- arrival_instant ---

    #[test]
    fn after_midnight_slot_rolls_to_next_day() {
        let e = event(Some("2025-10-07"), Some("23:00"), Some("11pm-2am"));
        assert_eq!(arrival_instant(&e, "00:30"), Some(at((2025, 10, 8), 0, 30)));
        assert_eq!(arrival_instant(&e, "23:30"), Some(at((2025, 10, 7), 23, 30)));
        assert_eq!(arrival_instant(&e, "half past"), None);
    }

    #[test]
    fn early_arrival_outside_slots_stays_on_event_date() {
        let e = event(Some("2025-10-07"), Some("20:00"), Some("8pm-11pm"));
        assert_eq!(arrival_instant(&e, "19:45"), Some(at((2025, 10, 7), 19, 45)));

        let late = event(Some("2025-10-07"), Some("23:00"), Some("11pm-2am"));
        assert_eq!(arrival_instant(&late, "03:00"), Some(at((2025, 10, 7), 3, 0)));
    }

    #[test]
    fn late_night_end_is_two_am() {
        assert_eq!(LATE_NIGHT_END, NaiveTime::from_hms_opt(2, 0, 0).unwrap());
    }
}
