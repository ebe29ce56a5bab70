//! One storage interface for both guest and signed-in planning data.
//!
//! Services pick an implementation once per operation from the current
//! identity, so business rules (TBA checks, default arrival, conflicts) live
//! in one place instead of being repeated per mode.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::backend::{AgendaRow, Backend, BarVisitRow, PredictionRow, UserAccount};
use crate::error::BarweekResult;
use crate::guest::GuestStore;
use crate::identity::Identity;

/// Event id -> arrival time. Older account rows may have no arrival time.
pub type AgendaMap = BTreeMap<String, Option<String>>;

/// Bar id -> visited flag.
pub type VisitMap = BTreeMap<String, bool>;

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn agenda(&self) -> BarweekResult<AgendaMap>;
    /// Fails with `Duplicate` if the event is already on the agenda.
    async fn insert_agenda(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()>;
    /// Change an existing entry's arrival time in one write.
    async fn replace_arrival(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()>;
    async fn remove_agenda(&self, event_id: &str) -> BarweekResult<()>;

    async fn visits(&self) -> BarweekResult<VisitMap>;
    async fn set_visit(&self, bar_id: &str, visited: bool) -> BarweekResult<()>;

    async fn predictions(&self) -> BarweekResult<Vec<String>>;
    async fn save_predictions(&self, predictions: &[String]) -> BarweekResult<()>;
}

/// Storage for the given identity.
pub fn plan_store_for<'a>(
    identity: &'a Identity,
    backend: &'a Arc<dyn Backend>,
    guest: &'a GuestStore,
) -> Box<dyn PlanStore + 'a> {
    match identity {
        Identity::Guest => Box::new(GuestPlanStore { guest }),
        Identity::User(account) => Box::new(AccountPlanStore { backend, account }),
    }
}

pub struct GuestPlanStore<'a> {
    guest: &'a GuestStore,
}

#[async_trait]
impl PlanStore for GuestPlanStore<'_> {
    async fn agenda(&self) -> BarweekResult<AgendaMap> {
        Ok(self
            .guest
            .agenda()
            .into_iter()
            .map(|(event_id, arrival)| (event_id, Some(arrival)))
            .collect())
    }

    async fn insert_agenda(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()> {
        self.guest.add_agenda(event_id, arrival_time)
    }

    async fn replace_arrival(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()> {
        self.guest.replace_agenda(event_id, arrival_time)
    }

    async fn remove_agenda(&self, event_id: &str) -> BarweekResult<()> {
        self.guest.remove_agenda(event_id)
    }

    async fn visits(&self) -> BarweekResult<VisitMap> {
        Ok(self.guest.bar_visits())
    }

    async fn set_visit(&self, bar_id: &str, visited: bool) -> BarweekResult<()> {
        self.guest.set_bar_visit(bar_id, visited)
    }

    async fn predictions(&self) -> BarweekResult<Vec<String>> {
        Ok(self.guest.predictions())
    }

    async fn save_predictions(&self, predictions: &[String]) -> BarweekResult<()> {
        self.guest.save_predictions(predictions)
    }
}

pub struct AccountPlanStore<'a> {
    backend: &'a Arc<dyn Backend>,
    account: &'a UserAccount,
}

#[async_trait]
impl PlanStore for AccountPlanStore<'_> {
    async fn agenda(&self) -> BarweekResult<AgendaMap> {
        let rows = self.backend.agenda_for(&self.account.id).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.event_id, row.arrival_time))
            .collect())
    }

    async fn insert_agenda(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()> {
        self.backend
            .insert_agenda(AgendaRow {
                user_id: self.account.id.clone(),
                event_id: event_id.to_string(),
                arrival_time: Some(arrival_time.to_string()),
                added_at: Utc::now(),
            })
            .await
    }

    async fn replace_arrival(&self, event_id: &str, arrival_time: &str) -> BarweekResult<()> {
        self.backend
            .update_agenda_arrival(&self.account.id, event_id, arrival_time)
            .await
    }

    async fn remove_agenda(&self, event_id: &str) -> BarweekResult<()> {
        self.backend.delete_agenda(&self.account.id, event_id).await
    }

    async fn visits(&self) -> BarweekResult<VisitMap> {
        let rows = self.backend.visits_for(&self.account.id).await?;
        Ok(rows.into_iter().map(|row| (row.bar_id, row.visited)).collect())
    }

    async fn set_visit(&self, bar_id: &str, visited: bool) -> BarweekResult<()> {
        self.backend
            .upsert_visit(BarVisitRow {
                user_id: self.account.id.clone(),
                bar_id: bar_id.to_string(),
                visited,
                visited_at: visited.then(Utc::now),
            })
            .await
    }

    async fn predictions(&self) -> BarweekResult<Vec<String>> {
        let Some(row) = self.backend.prediction_for(&self.account.id).await? else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&row.prediction_json).unwrap_or_else(|e| {
            warn!(user = %self.account.id, error = %e, "Unreadable prediction record");
            Vec::new()
        }))
    }

    async fn save_predictions(&self, predictions: &[String]) -> BarweekResult<()> {
        self.backend
            .upsert_prediction(PredictionRow {
                user_id: self.account.id.clone(),
                prediction_json: serde_json::to_string(predictions)?,
                updated_at: Utc::now(),
            })
            .await
    }
}
