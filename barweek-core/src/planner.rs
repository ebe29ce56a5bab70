//! The planner a visitor interacts with: current identity plus the agenda,
//! visit and prediction services, and the sign-up flow that migrates guest data.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agenda::{AddOutcome, AgendaService};
use crate::backend::{AuthProvider, Backend, Credentials, UserAccount};
use crate::error::{BarweekError, BarweekResult};
use crate::guest::GuestStore;
use crate::identity::Identity;
use crate::migration::{MigrationEngine, MigrationResult};
use crate::predictions::PredictionService;
use crate::tracking::{Tracker, TrackingEvent};
use crate::visits::BarVisitService;

pub struct Planner {
    identity: Identity,
    auth: Arc<dyn AuthProvider>,
    guest: GuestStore,
    tracker: Arc<dyn Tracker>,
    agenda: AgendaService,
    visits: BarVisitService,
    predictions: PredictionService,
}

impl Planner {
    pub fn new(
        backend: Arc<dyn Backend>,
        auth: Arc<dyn AuthProvider>,
        guest: GuestStore,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        Planner {
            identity: Identity::Guest,
            agenda: AgendaService::new(backend.clone(), guest.clone(), tracker.clone()),
            visits: BarVisitService::new(backend.clone(), guest.clone(), tracker.clone()),
            predictions: PredictionService::new(backend, guest.clone(), tracker.clone()),
            auth,
            guest,
            tracker,
        }
    }

    /// Resume as a previously signed-in identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn guest(&self) -> &GuestStore {
        &self.guest
    }

    pub fn agenda(&self) -> &AgendaService {
        &self.agenda
    }

    pub fn visits(&self) -> &BarVisitService {
        &self.visits
    }

    pub fn predictions(&self) -> &PredictionService {
        &self.predictions
    }

    /// Load the event catalog and the current identity's plans.
    pub async fn refresh(&mut self, event_version: Option<&str>) -> BarweekResult<()> {
        self.agenda.load_events(event_version).await?;
        self.reload_plans().await
    }

    async fn reload_plans(&mut self) -> BarweekResult<()> {
        self.agenda.fetch(&self.identity).await?;
        self.visits.fetch(&self.identity).await?;
        self.predictions.fetch(&self.identity).await?;
        Ok(())
    }

    pub async fn add_to_agenda(&mut self, event_id: &str, arrival_time: Option<&str>) -> AddOutcome {
        self.agenda.add(&self.identity, event_id, arrival_time).await
    }

    pub async fn change_arrival(&mut self, event_id: &str, arrival_time: &str) -> AddOutcome {
        self.agenda
            .change_arrival(&self.identity, event_id, arrival_time)
            .await
    }

    pub async fn remove_from_agenda(&mut self, event_id: &str) -> BarweekResult<()> {
        self.agenda.remove(&self.identity, event_id).await
    }

    pub async fn toggle_visit(&mut self, bar_id: &str) -> BarweekResult<bool> {
        self.visits.toggle(&self.identity, bar_id).await
    }

    pub async fn save_predictions(&mut self, predictions: Vec<String>) -> BarweekResult<()> {
        self.predictions.save(&self.identity, predictions).await
    }

    /// Create an account and carry the guest's data into it.
    ///
    /// Guest data is captured before the account exists. If account creation
    /// fails the error is returned and nothing is migrated.
    pub async fn sign_up(&mut self, credentials: &Credentials) -> BarweekResult<MigrationResult> {
        if !self.identity.is_guest() {
            return Err(BarweekError::Validation(
                "Already signed in, sign out before creating an account".into(),
            ));
        }

        let snapshot = self.guest.snapshot();

        let account = self.auth.sign_up(credentials).await?;
        info!(user = %account.id, "Account created");
        self.tracker
            .track(TrackingEvent::new("authentication", "sign_up"));
        self.identity = Identity::User(account);

        let result = MigrationEngine {
            agenda: &mut self.agenda,
            visits: &mut self.visits,
            predictions: &mut self.predictions,
            guest: &self.guest,
            tracker: self.tracker.as_ref(),
        }
        .run(&snapshot, &self.identity)
        .await;

        if let Err(e) = self.reload_plans().await {
            warn!(error = %e, "Could not reload plans after sign-up");
        }
        Ok(result)
    }

    pub async fn sign_in(&mut self, credentials: &Credentials) -> BarweekResult<&UserAccount> {
        let account = self.auth.sign_in(credentials).await?;
        self.tracker
            .track(TrackingEvent::new("authentication", "sign_in"));
        self.identity = Identity::User(account);
        self.reload_plans().await?;

        self.identity.account().ok_or(BarweekError::NotAuthenticated)
    }

    pub fn sign_out(&mut self) {
        if self.identity.is_guest() {
            return;
        }
        self.tracker
            .track(TrackingEvent::new("authentication", "sign_out"));
        self.identity = Identity::Guest;
        self.agenda.reset();
        self.visits.reset();
        self.predictions.reset();
    }
}
