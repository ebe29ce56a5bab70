//! Persistence and authentication collaborators.
//!
//! The hosted database and auth provider sit behind these traits. The agenda
//! table must reject a second row for the same (user, event) pair and the
//! visits table keeps one row per (user, bar).

mod local;

pub use local::LocalBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BarweekResult;
use crate::event::{Bar, Event};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaRow {
    pub user_id: String,
    pub event_id: String,
    pub arrival_time: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarVisitRow {
    pub user_id: String,
    pub bar_id: String,
    pub visited: bool,
    pub visited_at: Option<DateTime<Utc>>,
}

/// One record per user; `prediction_json` holds the ordered bar ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub user_id: String,
    pub prediction_json: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn events(&self) -> BarweekResult<Vec<Event>>;
    async fn bars(&self) -> BarweekResult<Vec<Bar>>;

    async fn agenda_for(&self, user_id: &str) -> BarweekResult<Vec<AgendaRow>>;
    async fn all_agenda(&self) -> BarweekResult<Vec<AgendaRow>>;
    /// Fails with `Duplicate` if the (user, event) pair already exists.
    async fn insert_agenda(&self, row: AgendaRow) -> BarweekResult<()>;
    /// Single-statement arrival time update. Fails with `NotFound` if absent.
    async fn update_agenda_arrival(
        &self,
        user_id: &str,
        event_id: &str,
        arrival_time: &str,
    ) -> BarweekResult<()>;
    /// Deleting an absent row succeeds.
    async fn delete_agenda(&self, user_id: &str, event_id: &str) -> BarweekResult<()>;

    async fn visits_for(&self, user_id: &str) -> BarweekResult<Vec<BarVisitRow>>;
    async fn all_visits(&self) -> BarweekResult<Vec<BarVisitRow>>;
    /// Insert or replace on (user, bar).
    async fn upsert_visit(&self, row: BarVisitRow) -> BarweekResult<()>;

    async fn prediction_for(&self, user_id: &str) -> BarweekResult<Option<PredictionRow>>;
    async fn all_predictions(&self) -> BarweekResult<Vec<PredictionRow>>;
    /// Insert or replace on user.
    async fn upsert_prediction(&self, row: PredictionRow) -> BarweekResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> BarweekResult<UserAccount>;
    async fn sign_in(&self, credentials: &Credentials) -> BarweekResult<UserAccount>;
}
