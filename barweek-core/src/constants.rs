use chrono::NaiveTime;

/// Minimum gap between two arrival times on the same date.
pub const MIN_MINUTES_BETWEEN_ARRIVALS: i64 = 30;

/// Stride between offered arrival slots.
pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// The last offered slot leaves at least this much time before the event ends.
pub const END_BUFFER_MINUTES: i64 = 30;

/// Assumed duration when the time range text names no end.
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 180;

/// Open-ended events ("till late") end at this time on the following day.
pub const LATE_NIGHT_END: NaiveTime = match NaiveTime::from_hms_opt(2, 0, 0) {
    Some(time) => time,
    None => panic!("late night end is a valid clock time"),
};

/// Events at least this long always offer a second arrival slot.
pub const MIN_DURATION_FOR_TWO_SLOTS_MINUTES: i64 = 60;

pub const MAX_PREDICTIONS: usize = 5;
