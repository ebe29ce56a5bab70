//! Carry guest data into a newly created account.
//!
//! Replay is best effort: each agenda entry, visit and the prediction list is
//! written through the normal account path, one at a time. An item that fails
//! is logged and counted as not migrated. Guest data is only cleared when the
//! replay as a whole completes, so a failed run can be retried.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::agenda::AgendaService;
use crate::error::{BarweekError, BarweekResult};
use crate::guest::{GuestSnapshot, GuestStore};
use crate::identity::Identity;
use crate::predictions::PredictionService;
use crate::tracking::{Tracker, TrackingEvent};
use crate::visits::BarVisitService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigratedItems {
    pub agenda: usize,
    pub bar_visits: usize,
    pub predictions: usize,
}

impl MigratedItems {
    pub fn total(&self) -> usize {
        self.agenda + self.bar_visits + self.predictions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    pub success: bool,
    pub migrated_items: MigratedItems,
    pub error: Option<String>,
}

impl MigrationResult {
    fn succeeded(migrated_items: MigratedItems) -> Self {
        MigrationResult {
            success: true,
            migrated_items,
            error: None,
        }
    }
}

pub struct MigrationEngine<'a> {
    pub agenda: &'a mut AgendaService,
    pub visits: &'a mut BarVisitService,
    pub predictions: &'a mut PredictionService,
    pub guest: &'a GuestStore,
    pub tracker: &'a dyn Tracker,
}

impl MigrationEngine<'_> {
    /// Replay a snapshot taken before sign-up under the new account identity.
    pub async fn run(&mut self, snapshot: &GuestSnapshot, identity: &Identity) -> MigrationResult {
        if snapshot.is_empty() {
            return MigrationResult::succeeded(MigratedItems::default());
        }

        let mut migrated = MigratedItems::default();

        match self.replay(snapshot, identity, &mut migrated).await {
            Ok(()) => {
                if let Err(e) = self.guest.clear() {
                    warn!(error = %e, "Guest data migrated but could not be cleared");
                }

                info!(
                    session = %snapshot.session_id,
                    agenda = migrated.agenda,
                    bar_visits = migrated.bar_visits,
                    predictions = migrated.predictions,
                    "Guest data migrated"
                );
                self.tracker.track(
                    TrackingEvent::new("authentication", "migrate_guest_data")
                        .value(migrated.total() as i64),
                );

                MigrationResult::succeeded(migrated)
            }
            Err(e) => {
                error!(session = %snapshot.session_id, error = %e, "Guest data migration failed");
                MigrationResult {
                    success: false,
                    migrated_items: migrated,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn replay(
        &mut self,
        snapshot: &GuestSnapshot,
        identity: &Identity,
        migrated: &mut MigratedItems,
    ) -> BarweekResult<()> {
        if identity.is_guest() {
            return Err(BarweekError::NotAuthenticated);
        }
        if !snapshot.agenda.is_empty() && self.agenda.catalog().is_empty() {
            return Err(BarweekError::Storage(
                "Event catalog is not loaded, cannot replay agenda".into(),
            ));
        }

        for item in &snapshot.agenda {
            let outcome = self
                .agenda
                .add(identity, &item.event_id, Some(&item.arrival_time))
                .await;
            if outcome.is_added() {
                migrated.agenda += 1;
            } else {
                warn!(event = %item.event_id, outcome = %outcome, "Agenda entry not migrated");
            }
        }

        for visit in snapshot.bar_visits.iter().filter(|v| v.visited) {
            match self.visits.set_visited(identity, &visit.bar_id, true).await {
                Ok(()) => migrated.bar_visits += 1,
                Err(e) => warn!(bar = %visit.bar_id, error = %e, "Bar visit not migrated"),
            }
        }

        if !snapshot.predictions.is_empty() {
            match self
                .predictions
                .save(identity, snapshot.predictions.clone())
                .await
            {
                Ok(()) => migrated.predictions = snapshot.predictions.len(),
                Err(e) => warn!(error = %e, "Predictions not migrated"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{LocalBackend, UserAccount};
    use crate::guest::MemoryKv;
    use crate::tracking::NoopTracker;
    use chrono::Utc;

    struct Services {
        agenda: AgendaService,
        visits: BarVisitService,
        predictions: PredictionService,
        guest: GuestStore,
    }

    fn services() -> Services {
        let backend = Arc::new(LocalBackend::in_memory());
        let guest = GuestStore::new(Arc::new(MemoryKv::new()));
        let tracker = Arc::new(NoopTracker);
        Services {
            agenda: AgendaService::new(backend.clone(), guest.clone(), tracker.clone()),
            visits: BarVisitService::new(backend.clone(), guest.clone(), tracker.clone()),
            predictions: PredictionService::new(backend, guest.clone(), tracker),
            guest,
        }
    }

    fn user() -> Identity {
        Identity::User(UserAccount {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            created_at: Utc::now(),
        })
    }

    async fn run(s: &mut Services, identity: &Identity) -> MigrationResult {
        let snapshot = s.guest.snapshot();
        MigrationEngine {
            agenda: &mut s.agenda,
            visits: &mut s.visits,
            predictions: &mut s.predictions,
            guest: &s.guest,
            tracker: &NoopTracker,
        }
        .run(&snapshot, identity)
        .await
    }

    #[tokio::test]
    async fn missing_catalog_fails_and_keeps_guest_data() {
        let mut s = services();
        s.guest.add_agenda("e1", "20:00").unwrap();

        let result = run(&mut s, &user()).await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(result.migrated_items, MigratedItems::default());
        assert!(s.guest.has_data());
    }

    #[tokio::test]
    async fn guest_identity_cannot_receive_migration() {
        let mut s = services();
        s.guest.toggle_bar_visit("b1").unwrap();

        let result = run(&mut s, &Identity::Guest).await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(s.guest.has_data());
    }

    #[tokio::test]
    async fn empty_snapshot_succeeds_without_writes() {
        let mut s = services();

        let result = run(&mut s, &user()).await;

        assert!(result.success);
        assert_eq!(result.migrated_items.total(), 0);
        assert!(!s.guest.has_data());
    }
}
