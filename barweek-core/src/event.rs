//! Event and bar records as stored by the backend.
//!
//! Dates and times are kept as the raw strings the backend hands out
//! ("YYYY-MM-DD" and "HH:mm"). Parsing happens lazily so a malformed value
//! degrades to a fallback instead of failing the whole catalog load.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A scheduled event during the awards week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    /// Calendar date, `None` while the event is still TBA.
    pub date: Option<String>,
    /// Start clock time ("HH:mm"), `None` while the event is still TBA.
    pub time: Option<String>,
    /// Free-text range shown to visitors, e.g. "8pm - 11pm" or "7pm till late".
    #[serde(default)]
    pub time_range_display: Option<String>,
    pub venue: String,
    /// Location tag (district or city).
    pub location: String,
    #[serde(default)]
    pub feature_bar: String,
    #[serde(default)]
    pub description: String,
    /// Edition the event belongs to (e.g. "world_2025").
    #[serde(default)]
    pub event_version: Option<String>,
}

impl Event {
    pub fn new(id: &str, name: &str, date: Option<&str>, time: Option<&str>) -> Self {
        Event {
            id: id.to_string(),
            name: name.to_string(),
            date: date.map(str::to_string),
            time: time.map(str::to_string),
            time_range_display: None,
            venue: String::new(),
            location: String::new(),
            feature_bar: String::new(),
            description: String::new(),
            event_version: None,
        }
    }

    /// An event without a confirmed date or time can never be scheduled.
    pub fn is_tba(&self) -> bool {
        self.date.is_none() || self.time.is_none()
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_date)
    }

    pub fn parsed_time(&self) -> Option<NaiveTime> {
        self.time.as_deref().and_then(parse_clock_time)
    }

    /// Start instant, if both date and time parse.
    pub fn start(&self) -> Option<NaiveDateTime> {
        Some(self.parsed_date()?.and_time(self.parsed_time()?))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A ranked bar that visitors can tick off or predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rank_2024: Option<u32>,
    #[serde(default)]
    pub rank_2025: Option<u32>,
    pub city: String,
    pub country: String,
}

/// Parse a sortable ISO date. Accepts a bare date or a full timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Parse a wall-clock "HH:mm" (or "HH:mm:ss", as databases return it).
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Format a time the way arrival slots are stored.
pub fn format_clock_time(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOption {
    #[default]
    Date,
    Name,
    Venue,
}

impl SortOption {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" => Some(Self::Date),
            "name" => Some(Self::Name),
            "venue" => Some(Self::Venue),
            _ => None,
        }
    }
}

/// Listing filters. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub location: Option<String>,
    /// Matches events whose date starts with this prefix ("2025-07" or "2025-07-02").
    pub date_prefix: Option<String>,
    pub search: Option<String>,
    pub sort: SortOption,
}

impl EventFilter {
    fn matches(&self, event: &Event) -> bool {
        let location_ok = self
            .location
            .as_ref()
            .is_none_or(|loc| event.location.eq_ignore_ascii_case(loc));

        let date_ok = self.date_prefix.as_ref().is_none_or(|prefix| {
            event
                .date
                .as_ref()
                .is_some_and(|date| date.starts_with(prefix.as_str()))
        });

        let search_ok = self.search.as_ref().is_none_or(|query| {
            let query = query.to_lowercase();
            [&event.name, &event.venue, &event.feature_bar]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        });

        location_ok && date_ok && search_ok
    }
}

/// Events loaded once from the backend and consulted for every agenda decision.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
    index: HashMap<String, usize>,
}

impl EventCatalog {
    pub fn new(events: Vec<Event>) -> Self {
        let index = events
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        EventCatalog { events, index }
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.index.get(id).map(|&i| &self.events[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filtered and sorted view for listings. TBA events sort last by date.
    pub fn list(&self, filter: &EventFilter) -> Vec<&Event> {
        let mut listed: Vec<&Event> = self.events.iter().filter(|e| filter.matches(e)).collect();

        match filter.sort {
            SortOption::Date => listed.sort_by(|a, b| compare_by_start(a, b)),
            SortOption::Name => listed.sort_by(|a, b| a.name.cmp(&b.name)),
            SortOption::Venue => listed.sort_by(|a, b| a.venue.cmp(&b.venue)),
        }

        listed
    }
}

fn compare_by_start(a: &Event, b: &Event) -> Ordering {
    match (a.start(), b.start()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
