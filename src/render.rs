//! Colored terminal rendering for barweek types.

use barweek_core::guest::GuestSummary;
use barweek_core::{AddOutcome, Event, MigrationResult};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for AddOutcome {
    fn render(&self) -> String {
        match self {
            AddOutcome::Added { .. } => format!("{} {}", "✓".green(), self),
            AddOutcome::Conflict(_) | AddOutcome::Tba => format!("{} {}", "!".yellow(), self.yellow()),
            _ => format!("{} {}", "✗".red(), self.red()),
        }
    }
}

impl Render for Event {
    fn render(&self) -> String {
        let when = match (&self.date, &self.time) {
            (Some(date), Some(time)) => format!("{} {}", date, time),
            (Some(date), None) => format!("{} TBA", date),
            _ => "TBA".to_string(),
        };
        let range = self
            .time_range_display
            .as_deref()
            .map(|r| format!(" ({})", r))
            .unwrap_or_default();

        format!(
            "{:<16} {} {}{} {}",
            when.dimmed(),
            self.name.bold(),
            self.venue,
            range.dimmed(),
            format!("[{}]", self.id).dimmed()
        )
    }
}

impl Render for GuestSummary {
    fn render(&self) -> String {
        if !self.has_any_data {
            return "No guest data".dimmed().to_string();
        }
        format!(
            "{} on agenda, {} bars visited, {}",
            pluralize("event", self.agenda_count),
            self.visited_bars_count,
            pluralize("prediction", self.predictions_count)
        )
    }
}

impl Render for MigrationResult {
    fn render(&self) -> String {
        let items = self.migrated_items;
        if self.success {
            if items.total() == 0 {
                return "Nothing to migrate".dimmed().to_string();
            }
            format!(
                "{} Migrated {}, {} and {}",
                "✓".green(),
                pluralize("agenda item", items.agenda),
                pluralize("bar visit", items.bar_visits),
                pluralize("prediction", items.predictions)
            )
        } else {
            let reason = self.error.as_deref().unwrap_or("unknown error");
            format!(
                "{} Guest data was not migrated: {}. It is kept and can be migrated later.",
                "✗".red(),
                reason
            )
        }
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_counts() {
        assert_eq!(pluralize("event", 1), "1 event");
        assert_eq!(pluralize("event", 0), "0 events");
    }
}
