//! Top-5 predictions.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::error;

use crate::backend::Backend;
use crate::constants::MAX_PREDICTIONS;
use crate::error::{BarweekError, BarweekResult};
use crate::guest::GuestStore;
use crate::identity::Identity;
use crate::storage::plan_store_for;
use crate::tracking::{Tracker, TrackingEvent};

pub struct PredictionService {
    backend: Arc<dyn Backend>,
    guest: GuestStore,
    tracker: Arc<dyn Tracker>,
    view: Vec<String>,
}

impl PredictionService {
    pub fn new(backend: Arc<dyn Backend>, guest: GuestStore, tracker: Arc<dyn Tracker>) -> Self {
        PredictionService {
            backend,
            guest,
            tracker,
            view: Vec::new(),
        }
    }

    pub fn view(&self) -> &[String] {
        &self.view
    }

    /// Replace the ordered prediction list (at most five distinct bars).
    pub async fn save(&mut self, identity: &Identity, predictions: Vec<String>) -> BarweekResult<()> {
        validate(&predictions)?;

        let store = plan_store_for(identity, &self.backend, &self.guest);
        store.save_predictions(&predictions).await.inspect_err(|e| {
            error!(error = %e, "Error updating predictions");
        })?;

        self.tracker.track(
            TrackingEvent::new("predictions", "save_predictions").value(predictions.len() as i64),
        );
        self.view = predictions;
        Ok(())
    }

    pub async fn fetch(&mut self, identity: &Identity) -> BarweekResult<&[String]> {
        let store = plan_store_for(identity, &self.backend, &self.guest);
        self.view = store.predictions().await.inspect_err(|e| {
            error!(error = %e, "Error fetching predictions");
        })?;
        Ok(&self.view)
    }

    pub fn reset(&mut self) {
        self.view.clear();
    }
}

fn validate(predictions: &[String]) -> BarweekResult<()> {
    if predictions.len() > MAX_PREDICTIONS {
        return Err(BarweekError::Validation(format!(
            "At most {} predictions allowed, got {}",
            MAX_PREDICTIONS,
            predictions.len()
        )));
    }
    if predictions.iter().any(|p| p.trim().is_empty()) {
        return Err(BarweekError::Validation("Prediction bar id is empty".into()));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = predictions.iter().find(|p| !seen.insert(p.as_str())) {
        return Err(BarweekError::Validation(format!("Bar '{}' predicted twice", dup)));
    }
    Ok(())
}
