use anyhow::{Result, bail};
use barweek_core::time_slots::generate_arrival_slots;
use barweek_core::{EventFilter, Planner, SortOption};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(
    planner: &Planner,
    location: Option<String>,
    date: Option<String>,
    search: Option<String>,
    sort: &str,
) -> Result<()> {
    let Some(sort) = SortOption::from_str(sort) else {
        bail!("Unknown sort '{}'. Use one of: date, name, venue", sort);
    };

    let filter = EventFilter {
        location,
        date_prefix: date,
        search,
        sort,
    };
    let events = planner.agenda().catalog().list(&filter);

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    let agenda = planner.agenda().view();
    for event in events {
        let marker = if agenda.contains_key(&event.id) {
            "●".green().to_string()
        } else {
            " ".to_string()
        };
        println!("{} {}", marker, event.render());
    }

    Ok(())
}

/// Print the arrival times offered for an event.
pub fn slots(planner: &Planner, event_id: &str) -> Result<()> {
    let Some(event) = planner.agenda().catalog().get(event_id) else {
        bail!("Event '{}' not found", event_id);
    };

    if event.is_tba() {
        println!("{}", "Date and time to be announced".dimmed());
        return Ok(());
    }

    let slots = generate_arrival_slots(event);
    if slots.is_empty() {
        println!("{}", "No arrival times available".dimmed());
        return Ok(());
    }

    println!("{}", event.render());
    println!("  {}", slots.join("  "));
    Ok(())
}
