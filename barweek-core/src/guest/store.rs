//! Typed guest data on top of a key-value store.
//!
//! Each collection lives in its own blob. A missing or corrupt blob reads as
//! empty so a damaged entry never locks a visitor out of guest mode.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{BarweekError, BarweekResult};
use crate::guest::kv::KeyValueStore;

const AGENDA_KEY: &str = "barweek_guest_agenda";
const BAR_VISITS_KEY: &str = "barweek_guest_bar_visits";
const PREDICTIONS_KEY: &str = "barweek_guest_predictions";
const SESSION_ID_KEY: &str = "barweek_guest_session_id";

const ALL_KEYS: [&str; 4] = [AGENDA_KEY, BAR_VISITS_KEY, PREDICTIONS_KEY, SESSION_ID_KEY];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestAgendaItem {
    pub event_id: String,
    pub arrival_time: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestBarVisit {
    pub bar_id: String,
    pub visited: bool,
    pub visited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictionsBlob {
    #[serde(default)]
    predictions: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Everything a guest has recorded, captured at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSnapshot {
    pub session_id: String,
    pub agenda: Vec<GuestAgendaItem>,
    pub bar_visits: Vec<GuestBarVisit>,
    pub predictions: Vec<String>,
    pub exported_at: DateTime<Utc>,
}

impl GuestSnapshot {
    pub fn is_empty(&self) -> bool {
        self.agenda.is_empty() && self.bar_visits.is_empty() && self.predictions.is_empty()
    }
}

/// Counts shown to a guest before they sign up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GuestSummary {
    pub agenda_count: usize,
    pub visited_bars_count: usize,
    pub predictions_count: usize,
    pub has_any_data: bool,
}

#[derive(Clone)]
pub struct GuestStore {
    kv: Arc<dyn KeyValueStore>,
}

impl GuestStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        GuestStore { kv }
    }

    fn read_blob<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.kv.get(key) else {
            return T::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "Corrupt guest data, treating as empty");
            T::default()
        })
    }

    fn write_blob<T: Serialize>(&self, key: &str, value: &T) -> BarweekResult<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, &raw)
    }

    // SESSION:

    /// The anonymous session id, generated on first use.
    pub fn session_id(&self) -> String {
        if let Some(id) = self.kv.get(SESSION_ID_KEY).filter(|id| !id.is_empty()) {
            return id;
        }

        let random = Uuid::new_v4().simple().to_string();
        let id = format!("guest_{}_{}", Utc::now().timestamp_millis(), &random[..9]);
        if let Err(e) = self.kv.set(SESSION_ID_KEY, &id) {
            warn!(error = %e, "Could not persist guest session id");
        }
        id
    }

    // AGENDA:

    pub fn agenda_items(&self) -> Vec<GuestAgendaItem> {
        self.read_blob(AGENDA_KEY)
    }

    /// Event id -> arrival time.
    pub fn agenda(&self) -> BTreeMap<String, String> {
        self.agenda_items()
            .into_iter()
            .map(|item| (item.event_id, item.arrival_time))
            .collect()
    }

    pub fn add_agenda(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()> {
        self.session_id();
        let mut items = self.agenda_items();
        if items.iter().any(|i| i.event_id == event_id) {
            return Err(BarweekError::Duplicate(format!("agenda entry for event '{}'", event_id)));
        }

        items.push(GuestAgendaItem {
            event_id: event_id.to_string(),
            arrival_time: arrival_time.to_string(),
            added_at: Utc::now(),
        });
        self.write_blob(AGENDA_KEY, &items)
    }

    pub fn replace_agenda(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()> {
        let mut items = self.agenda_items();
        let item = items
            .iter_mut()
            .find(|i| i.event_id == event_id)
            .ok_or_else(|| BarweekError::NotFound(format!("agenda entry for event '{}'", event_id)))?;

        item.arrival_time = arrival_time.to_string();
        self.write_blob(AGENDA_KEY, &items)
    }

    pub fn remove_agenda(&self, event_id: &str) -> BarweekResult<()> {
        let mut items = self.agenda_items();
        let before = items.len();
        items.retain(|i| i.event_id != event_id);

        if items.len() == before {
            return Ok(());
        }
        self.write_blob(AGENDA_KEY, &items)
    }

    // BAR VISITS:

    pub fn bar_visit_items(&self) -> Vec<GuestBarVisit> {
        self.read_blob(BAR_VISITS_KEY)
    }

    /// Bar id -> visited flag.
    pub fn bar_visits(&self) -> BTreeMap<String, bool> {
        self.bar_visit_items()
            .into_iter()
            .map(|v| (v.bar_id, v.visited))
            .collect()
    }

    pub fn set_bar_visit(&self, bar_id: &str, visited: bool) -> BarweekResult<()> {
        self.session_id();
        let mut items = self.bar_visit_items();
        let visited_at = visited.then(Utc::now);

        match items.iter_mut().find(|v| v.bar_id == bar_id) {
            Some(existing) if existing.visited == visited => return Ok(()),
            Some(existing) => {
                existing.visited = visited;
                existing.visited_at = visited_at;
            }
            None => items.push(GuestBarVisit {
                bar_id: bar_id.to_string(),
                visited,
                visited_at,
            }),
        }

        self.write_blob(BAR_VISITS_KEY, &items)
    }

    /// Flip a bar's visited flag, returning the new state.
    pub fn toggle_bar_visit(&self, bar_id: &str) -> BarweekResult<bool> {
        let visited = !self.bar_visits().get(bar_id).copied().unwrap_or(false);
        self.set_bar_visit(bar_id, visited)?;
        Ok(visited)
    }

    // PREDICTIONS:

    pub fn predictions(&self) -> Vec<String> {
        self.read_blob::<PredictionsBlob>(PREDICTIONS_KEY).predictions
    }

    pub fn save_predictions(&self, predictions: &[String]) -> BarweekResult<()> {
        self.session_id();
        self.write_blob(
            PREDICTIONS_KEY,
            &PredictionsBlob {
                predictions: predictions.to_vec(),
                updated_at: Some(Utc::now()),
            },
        )
    }

    // WHOLE SESSION:

    pub fn has_data(&self) -> bool {
        self.summary().has_any_data
    }

    pub fn summary(&self) -> GuestSummary {
        let agenda_count = self.agenda_items().len();
        let visited_bars_count = self.bar_visit_items().iter().filter(|v| v.visited).count();
        let predictions_count = self.predictions().len();

        GuestSummary {
            agenda_count,
            visited_bars_count,
            predictions_count,
            has_any_data: agenda_count > 0 || visited_bars_count > 0 || predictions_count > 0,
        }
    }

    /// Capture the current guest data. Reading never creates a session id.
    pub fn snapshot(&self) -> GuestSnapshot {
        GuestSnapshot {
            session_id: self.kv.get(SESSION_ID_KEY).unwrap_or_default(),
            agenda: self.agenda_items(),
            bar_visits: self.bar_visit_items(),
            predictions: self.predictions(),
            exported_at: Utc::now(),
        }
    }

    /// Drop every guest key, including the session id.
    pub fn clear(&self) -> BarweekResult<()> {
        for key in ALL_KEYS {
            self.kv.remove(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::kv::MemoryKv;

    fn store() -> (GuestStore, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        (GuestStore::new(kv.clone()), kv)
    }

    #[test]
    fn agenda_add_and_remove() {
        let (guest, _) = store();
        guest.add_agenda("e1", "20:00").unwrap();
        guest.add_agenda("e2", "21:30").unwrap();
        assert_eq!(guest.agenda().get("e2").map(String::as_str), Some("21:30"));

        guest.remove_agenda("e1").unwrap();
        guest.remove_agenda("missing").unwrap();
        assert_eq!(guest.agenda().len(), 1);
    }

    #[test]
    fn duplicate_agenda_entry_is_rejected() {
        let (guest, _) = store();
        guest.add_agenda("e1", "20:00").unwrap();
        assert!(matches!(
            guest.add_agenda("e1", "21:00"),
            Err(BarweekError::Duplicate(_))
        ));
        assert_eq!(guest.agenda().get("e1").map(String::as_str), Some("20:00"));
    }

    #[test]
    fn replace_keeps_added_at() {
        let (guest, _) = store();
        guest.add_agenda("e1", "20:00").unwrap();
        let added_at = guest.agenda_items()[0].added_at;

        guest.replace_agenda("e1", "20:30").unwrap();
        let items = guest.agenda_items();
        assert_eq!(items[0].arrival_time, "20:30");
        assert_eq!(items[0].added_at, added_at);
        assert!(guest.replace_agenda("nope", "20:30").is_err());
    }

    #[test]
    fn corrupt_blob_reads_as_empty() {
        let (guest, kv) = store();
        kv.set(AGENDA_KEY, "{not json").unwrap();
        kv.set(PREDICTIONS_KEY, "[1, 2").unwrap();
        assert!(guest.agenda().is_empty());
        assert!(guest.predictions().is_empty());
    }

    #[test]
    fn blobs_use_camel_case_wire_format() {
        let (guest, kv) = store();
        guest.add_agenda("e1", "20:00").unwrap();
        guest.set_bar_visit("bar-1", true).unwrap();
        guest.save_predictions(&["bar-1".to_string()]).unwrap();

        let agenda: serde_json::Value = serde_json::from_str(&kv.get(AGENDA_KEY).unwrap()).unwrap();
        assert_eq!(agenda[0]["eventId"], "e1");
        assert_eq!(agenda[0]["arrivalTime"], "20:00");

        let visits: serde_json::Value =
            serde_json::from_str(&kv.get(BAR_VISITS_KEY).unwrap()).unwrap();
        assert_eq!(visits[0]["barId"], "bar-1");
        assert!(visits[0]["visitedAt"].is_string());

        let predictions: serde_json::Value =
            serde_json::from_str(&kv.get(PREDICTIONS_KEY).unwrap()).unwrap();
        assert_eq!(predictions["predictions"][0], "bar-1");
    }

    #[test]
    fn toggle_flips_visit() {
        let (guest, _) = store();
        assert!(guest.toggle_bar_visit("bar-1").unwrap());
        assert!(!guest.toggle_bar_visit("bar-1").unwrap());
        assert_eq!(guest.bar_visits().get("bar-1"), Some(&false));
        assert_eq!(guest.bar_visit_items()[0].visited_at, None);
    }

    #[test]
    fn summary_counts_only_visited_bars() {
        let (guest, _) = store();
        assert!(!guest.has_data());

        guest.set_bar_visit("bar-1", true).unwrap();
        guest.set_bar_visit("bar-2", false).unwrap();
        guest.add_agenda("e1", "20:00").unwrap();

        let summary = guest.summary();
        assert_eq!(summary.agenda_count, 1);
        assert_eq!(summary.visited_bars_count, 1);
        assert_eq!(summary.predictions_count, 0);
        assert!(summary.has_any_data);
    }

    #[test]
    fn session_id_is_stable_until_clear() {
        let (guest, _) = store();
        let id = guest.session_id();
        assert!(id.starts_with("guest_"));
        assert_eq!(guest.session_id(), id);

        guest.add_agenda("e1", "20:00").unwrap();
        guest.clear().unwrap();
        assert!(guest.snapshot().is_empty());
        assert_ne!(guest.session_id(), id);
    }

    #[test]
    fn snapshot_of_empty_store_leaves_no_trace() {
        let (guest, kv) = store();

        let snapshot = guest.snapshot();

        assert!(snapshot.is_empty());
        assert!(snapshot.session_id.is_empty());
        assert_eq!(kv.get(SESSION_ID_KEY), None);
    }

    #[test]
    fn snapshot_carries_existing_session_id() {
        let (guest, _) = store();
        guest.add_agenda("e1", "20:00").unwrap();

        assert_eq!(guest.snapshot().session_id, guest.session_id());
    }
}
