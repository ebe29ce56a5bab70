//! Agenda add/remove/fetch for guests and signed-in users.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::backend::Backend;
use crate::conflict::{Conflict, ScheduledEntry, find_conflict};
use crate::error::{BarweekError, BarweekResult};
use crate::event::{Event, EventCatalog, format_clock_time, parse_clock_time};
use crate::guest::GuestStore;
use crate::identity::Identity;
use crate::storage::{AgendaMap, plan_store_for};
use crate::time_slots::arrival_instant;
use crate::tracking::{Tracker, TrackingEvent};

pub const TBA_MESSAGE: &str = "This event cannot be added to your agenda as the date and time are still to be announced (TBA).";

/// Result of adding an event or moving its arrival time.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added {
        event_id: String,
        arrival_time: String,
    },
    UnknownEvent(String),
    Tba,
    InvalidArrivalTime(String),
    AlreadyOnAgenda,
    NotOnAgenda,
    Conflict(Conflict),
    PersistenceFailed(String),
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added { .. })
    }
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddOutcome::Added { arrival_time, .. } => write!(f, "Added (arrival {})", arrival_time),
            AddOutcome::UnknownEvent(id) => write!(f, "Event '{}' not found", id),
            AddOutcome::Tba => write!(f, "{}", TBA_MESSAGE),
            AddOutcome::InvalidArrivalTime(time) => {
                write!(f, "'{}' is not a valid arrival time (expected HH:mm)", time)
            }
            AddOutcome::AlreadyOnAgenda => write!(f, "This event is already on your agenda"),
            AddOutcome::NotOnAgenda => write!(f, "This event is not on your agenda"),
            AddOutcome::Conflict(conflict) => write!(f, "{}", conflict),
            AddOutcome::PersistenceFailed(_) => {
                write!(f, "Could not update your agenda. Please try again.")
            }
        }
    }
}

pub struct AgendaService {
    backend: Arc<dyn Backend>,
    guest: GuestStore,
    tracker: Arc<dyn Tracker>,
    catalog: EventCatalog,
    view: AgendaMap,
}

impl AgendaService {
    pub fn new(backend: Arc<dyn Backend>, guest: GuestStore, tracker: Arc<dyn Tracker>) -> Self {
        AgendaService {
            backend,
            guest,
            tracker,
            catalog: EventCatalog::default(),
            view: AgendaMap::new(),
        }
    }

    /// Load the event catalog, keeping only one edition when `event_version` is set.
    pub async fn load_events(&mut self, event_version: Option<&str>) -> BarweekResult<&EventCatalog> {
        let events = self.backend.events().await?;
        let events = events
            .into_iter()
            .filter(|e| event_version.is_none_or(|v| e.event_version.as_deref() == Some(v)))
            .collect();

        self.catalog = EventCatalog::new(events);
        Ok(&self.catalog)
    }

    pub fn set_catalog(&mut self, catalog: EventCatalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// The agenda as last fetched or modified.
    pub fn view(&self) -> &AgendaMap {
        &self.view
    }

    /// Agenda entries joined with their events, ordered by arrival.
    pub fn itinerary(&self) -> Vec<(&Event, String)> {
        let mut entries: Vec<(&Event, String)> = self
            .view
            .iter()
            .filter_map(|(event_id, arrival)| {
                let event = self.catalog.get(event_id)?;
                let arrival = arrival.clone().or_else(|| event.time.clone())?;
                Some((event, arrival))
            })
            .collect();

        entries.sort_by_key(|(event, arrival)| arrival_instant(event, arrival));
        entries
    }

    /// Add an event to the agenda.
    ///
    /// The arrival time defaults to the event's start. TBA events are refused
    /// before any storage is touched, and the arrival must be at least the
    /// conflict threshold away from every other entry on the same date.
    pub async fn add(
        &mut self,
        identity: &Identity,
        event_id: &str,
        arrival_time: Option<&str>,
    ) -> AddOutcome {
        let (event, arrival) = match self.validate(event_id, arrival_time) {
            Ok(validated) => validated,
            Err(outcome) => return outcome,
        };

        let store = plan_store_for(identity, &self.backend, &self.guest);

        let existing = match store.agenda().await {
            Ok(existing) => existing,
            Err(e) => {
                error!(event = %event_id, error = %e, "Could not read agenda for conflict check");
                return AddOutcome::PersistenceFailed(e.to_string());
            }
        };

        if existing.contains_key(event_id) {
            return AddOutcome::AlreadyOnAgenda;
        }
        if let Some(conflict) = self.conflict_with(&event, &arrival, &existing) {
            return AddOutcome::Conflict(conflict);
        }

        match store.insert_agenda(event_id, &arrival).await {
            Ok(()) => {}
            Err(BarweekError::Duplicate(_)) => return AddOutcome::AlreadyOnAgenda,
            Err(e) => {
                error!(event = %event_id, error = %e, "Error adding to agenda");
                return AddOutcome::PersistenceFailed(e.to_string());
            }
        }

        self.tracker
            .track(TrackingEvent::new("agenda", "add_event").label(event.name.clone()));
        self.view.insert(event_id.to_string(), Some(arrival.clone()));

        AddOutcome::Added {
            event_id: event_id.to_string(),
            arrival_time: arrival,
        }
    }

    /// Move an existing entry to a new arrival time in a single write.
    pub async fn change_arrival(
        &mut self,
        identity: &Identity,
        event_id: &str,
        arrival_time: &str,
    ) -> AddOutcome {
        let (event, arrival) = match self.validate(event_id, Some(arrival_time)) {
            Ok(validated) => validated,
            Err(outcome) => return outcome,
        };

        let store = plan_store_for(identity, &self.backend, &self.guest);

        let existing = match store.agenda().await {
            Ok(existing) => existing,
            Err(e) => {
                error!(event = %event_id, error = %e, "Could not read agenda for conflict check");
                return AddOutcome::PersistenceFailed(e.to_string());
            }
        };

        if !existing.contains_key(event_id) {
            return AddOutcome::NotOnAgenda;
        }
        if let Some(conflict) = self.conflict_with(&event, &arrival, &existing) {
            return AddOutcome::Conflict(conflict);
        }

        match store.replace_arrival(event_id, &arrival).await {
            Ok(()) => {}
            Err(BarweekError::NotFound(_)) => return AddOutcome::NotOnAgenda,
            Err(e) => {
                error!(event = %event_id, error = %e, "Error changing arrival time");
                return AddOutcome::PersistenceFailed(e.to_string());
            }
        }

        self.view.insert(event_id.to_string(), Some(arrival.clone()));

        AddOutcome::Added {
            event_id: event_id.to_string(),
            arrival_time: arrival,
        }
    }

    /// Remove an event from the agenda. Removing an absent event is a no-op.
    pub async fn remove(&mut self, identity: &Identity, event_id: &str) -> BarweekResult<()> {
        let store = plan_store_for(identity, &self.backend, &self.guest);

        if let Err(e) = store.remove_agenda(event_id).await {
            error!(event = %event_id, error = %e, "Error removing from agenda");
            return Err(e);
        }

        if self.view.remove(event_id).is_some() {
            let label = self
                .catalog
                .get(event_id)
                .map_or_else(|| event_id.to_string(), |e| e.name.clone());
            self.tracker
                .track(TrackingEvent::new("agenda", "remove_event").label(label));
        }
        Ok(())
    }

    /// Reload the agenda from the active store, replacing the current view.
    pub async fn fetch(&mut self, identity: &Identity) -> BarweekResult<&AgendaMap> {
        let store = plan_store_for(identity, &self.backend, &self.guest);
        self.view = store.agenda().await.inspect_err(|e| {
            error!(error = %e, "Error fetching agenda");
        })?;
        Ok(&self.view)
    }

    /// Forget the current view, e.g. after signing out.
    pub fn reset(&mut self) {
        self.view.clear();
    }

    /// Resolve the event and normalized arrival time, or the rejection.
    fn validate(&self, event_id: &str, arrival_time: Option<&str>) -> Result<(Event, String), AddOutcome> {
        let event = self
            .catalog
            .get(event_id)
            .ok_or_else(|| AddOutcome::UnknownEvent(event_id.to_string()))?;

        if event.is_tba() {
            return Err(AddOutcome::Tba);
        }

        let requested = arrival_time
            .filter(|t| !t.trim().is_empty())
            .or(event.time.as_deref())
            .unwrap_or_default();

        let arrival = parse_clock_time(requested)
            .ok_or_else(|| AddOutcome::InvalidArrivalTime(requested.to_string()))?;

        Ok((event.clone(), format_clock_time(&arrival)))
    }

    fn conflict_with(&self, event: &Event, arrival: &str, existing: &AgendaMap) -> Option<Conflict> {
        let entries = existing.iter().filter_map(|(event_id, arrival)| {
            let Some(existing_event) = self.catalog.get(event_id) else {
                warn!(event = %event_id, "Agenda entry refers to an unknown event");
                return None;
            };
            Some(ScheduledEntry {
                event: existing_event,
                arrival_time: arrival.as_deref(),
            })
        });

        find_conflict(event, arrival, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LocalBackend, UserAccount};
    use crate::guest::MemoryKv;
    use crate::tracking::NoopTracker;
    use chrono::Utc;

    fn event(id: &str, date: Option<&str>, time: Option<&str>) -> Event {
        Event::new(id, &format!("Event {}", id), date, time)
    }

    fn catalog() -> EventCatalog {
        EventCatalog::new(vec![
            event("a", Some("2025-10-07"), Some("19:00")),
            event("b", Some("2025-10-07"), Some("19:00")),
            event("c", Some("2025-10-08"), Some("19:00")),
            event("tba", None, None),
        ])
    }

    fn user() -> Identity {
        Identity::User(UserAccount {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            created_at: Utc::now(),
        })
    }

    fn service() -> (AgendaService, Arc<LocalBackend>, GuestStore) {
        let backend = Arc::new(LocalBackend::in_memory());
        let guest = GuestStore::new(Arc::new(MemoryKv::new()));
        let mut service = AgendaService::new(backend.clone(), guest.clone(), Arc::new(NoopTracker));
        service.set_catalog(catalog());
        (service, backend, guest)
    }

    #[tokio::test]
    async fn tba_event_is_rejected_without_writing() {
        let (mut service, backend, guest) = service();

        assert_eq!(service.add(&user(), "tba", Some("20:00")).await, AddOutcome::Tba);
        assert_eq!(service.add(&Identity::Guest, "tba", None).await, AddOutcome::Tba);

        assert!(backend.all_agenda().await.unwrap().is_empty());
        assert!(guest.agenda().is_empty());
        assert!(service.view().is_empty());
    }

    #[tokio::test]
    async fn arrival_defaults_to_event_start() {
        let (mut service, backend, _) = service();

        let outcome = service.add(&user(), "a", None).await;
        assert!(outcome.is_added());

        let rows = backend.agenda_for("user-1").await.unwrap();
        assert_eq!(rows[0].arrival_time.as_deref(), Some("19:00"));
        assert_eq!(service.view().get("a"), Some(&Some("19:00".to_string())));
    }

    #[tokio::test]
    async fn conflicting_arrival_is_rejected_for_users() {
        let (mut service, backend, _) = service();
        service.add(&user(), "a", Some("19:00")).await;

        let outcome = service.add(&user(), "b", Some("19:20")).await;
        let AddOutcome::Conflict(conflict) = outcome else {
            panic!("expected conflict, got {:?}", outcome);
        };
        assert_eq!(conflict.event_id, "a");
        assert_eq!(backend.agenda_for("user-1").await.unwrap().len(), 1);

        assert!(service.add(&user(), "b", Some("19:30")).await.is_added());
    }

    #[tokio::test]
    async fn guests_get_the_same_conflict_check() {
        let (mut service, _, guest) = service();
        assert!(service.add(&Identity::Guest, "a", Some("19:00")).await.is_added());

        let outcome = service.add(&Identity::Guest, "b", Some("19:10")).await;
        assert!(matches!(outcome, AddOutcome::Conflict(_)));
        assert_eq!(guest.agenda().len(), 1);
    }

    #[tokio::test]
    async fn different_dates_do_not_conflict() {
        let (mut service, _, _) = service();
        assert!(service.add(&user(), "a", Some("19:00")).await.is_added());
        assert!(service.add(&user(), "c", Some("19:00")).await.is_added());
    }

    #[tokio::test]
    async fn invalid_arrival_and_unknown_event() {
        let (mut service, _, _) = service();
        assert!(matches!(
            service.add(&user(), "a", Some("7pm")).await,
            AddOutcome::InvalidArrivalTime(_)
        ));
        assert!(matches!(
            service.add(&user(), "zzz", None).await,
            AddOutcome::UnknownEvent(_)
        ));
    }

    #[tokio::test]
    async fn adding_twice_reports_already_on_agenda() {
        let (mut service, _, _) = service();
        service.add(&user(), "a", None).await;
        assert_eq!(service.add(&user(), "a", Some("20:00")).await, AddOutcome::AlreadyOnAgenda);
    }

    #[tokio::test]
    async fn guest_add_remove_visible_in_fetch() {
        let (mut service, _, _) = service();
        service.add(&Identity::Guest, "a", Some("19:30")).await;
        service.add(&Identity::Guest, "c", None).await;

        let fetched = service.fetch(&Identity::Guest).await.unwrap().clone();
        assert_eq!(fetched.len(), 2);

        service.remove(&Identity::Guest, "a").await.unwrap();
        let fetched = service.fetch(&Identity::Guest).await.unwrap();
        assert_eq!(fetched.keys().collect::<Vec<_>>(), vec!["c"]);
    }

    #[tokio::test]
    async fn removing_absent_event_is_a_no_op() {
        let (mut service, _, _) = service();
        service.add(&user(), "a", None).await;
        let before = service.view().clone();

        service.remove(&user(), "c").await.unwrap();
        assert_eq!(service.view(), &before);
        assert_eq!(service.fetch(&user()).await.unwrap(), &before);
    }

    #[tokio::test]
    async fn fetch_replaces_view() {
        let (mut service, backend, _) = service();
        service.add(&Identity::Guest, "a", None).await;
        backend
            .insert_agenda(crate::backend::AgendaRow {
                user_id: "user-1".to_string(),
                event_id: "c".to_string(),
                arrival_time: None,
                added_at: Utc::now(),
            })
            .await
            .unwrap();

        let view = service.fetch(&user()).await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.get("c"), Some(&None));
    }

    #[tokio::test]
    async fn change_arrival_ignores_own_entry() {
        let (mut service, backend, _) = service();
        service.add(&user(), "a", Some("19:00")).await;
        service.add(&user(), "b", Some("20:00")).await;

        // Moving 'a' by 10 minutes only conflicts with itself, which is skipped
        assert!(service.change_arrival(&user(), "a", "19:10").await.is_added());
        // Moving next to 'b' conflicts
        assert!(matches!(
            service.change_arrival(&user(), "a", "19:45").await,
            AddOutcome::Conflict(_)
        ));

        let rows = backend.agenda_for("user-1").await.unwrap();
        let a = rows.iter().find(|r| r.event_id == "a").unwrap();
        assert_eq!(a.arrival_time.as_deref(), Some("19:10"));

        assert_eq!(
            service.change_arrival(&user(), "c", "19:00").await,
            AddOutcome::NotOnAgenda
        );
    }

    #[tokio::test]
    async fn itinerary_orders_by_arrival() {
        let (mut service, _, _) = service();
        service.add(&Identity::Guest, "c", Some("18:00")).await;
        service.add(&Identity::Guest, "b", Some("20:00")).await;
        service.add(&Identity::Guest, "a", Some("19:00")).await;

        let order: Vec<_> = service.itinerary().iter().map(|(e, _)| e.id.clone()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn early_arrival_conflicts_with_same_date_entry() {
        let (mut service, _, guest) = service();
        assert!(service.add(&Identity::Guest, "a", Some("19:00")).await.is_added());

        let outcome = service.add(&Identity::Guest, "b", Some("18:45")).await;

        assert!(matches!(outcome, AddOutcome::Conflict(ref c) if c.minutes_apart == 15));
        assert!(!guest.agenda().contains_key("b"));
    }
}
