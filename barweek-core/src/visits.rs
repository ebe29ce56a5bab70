//! Bar visit tracking.

use std::sync::Arc;

use tracing::error;

use crate::backend::Backend;
use crate::error::BarweekResult;
use crate::guest::GuestStore;
use crate::identity::Identity;
use crate::storage::{VisitMap, plan_store_for};
use crate::tracking::{Tracker, TrackingEvent};

pub struct BarVisitService {
    backend: Arc<dyn Backend>,
    guest: GuestStore,
    tracker: Arc<dyn Tracker>,
    view: VisitMap,
}

impl BarVisitService {
    pub fn new(backend: Arc<dyn Backend>, guest: GuestStore, tracker: Arc<dyn Tracker>) -> Self {
        BarVisitService {
            backend,
            guest,
            tracker,
            view: VisitMap::new(),
        }
    }

    pub fn view(&self) -> &VisitMap {
        &self.view
    }

    pub fn visited_count(&self) -> usize {
        self.view.values().filter(|visited| **visited).count()
    }

    /// Share of all bars visited, as a rounded percentage.
    pub fn visited_percentage(&self, total_bars: usize) -> u32 {
        if total_bars == 0 {
            return 0;
        }
        ((self.visited_count() as f64 / total_bars as f64) * 100.0).round() as u32
    }

    /// Flip a bar's visited flag and return the new state.
    pub async fn toggle(&mut self, identity: &Identity, bar_id: &str) -> BarweekResult<bool> {
        let visited = !self.view.get(bar_id).copied().unwrap_or(false);
        self.set_visited(identity, bar_id, visited).await?;
        Ok(visited)
    }

    pub async fn set_visited(
        &mut self,
        identity: &Identity,
        bar_id: &str,
        visited: bool,
    ) -> BarweekResult<()> {
        let store = plan_store_for(identity, &self.backend, &self.guest);
        store.set_visit(bar_id, visited).await.inspect_err(|e| {
            error!(bar = %bar_id, error = %e, "Error updating bar visit");
        })?;

        let action = if visited { "mark_visited" } else { "mark_unvisited" };
        self.tracker
            .track(TrackingEvent::new("bar_tracker", action).label(bar_id));
        self.view.insert(bar_id.to_string(), visited);
        Ok(())
    }

    pub async fn fetch(&mut self, identity: &Identity) -> BarweekResult<&VisitMap> {
        let store = plan_store_for(identity, &self.backend, &self.guest);
        self.view = store.visits().await.inspect_err(|e| {
            error!(error = %e, "Error fetching bar visits");
        })?;
        Ok(&self.view)
    }

    pub fn reset(&mut self) {
        self.view.clear();
    }
}
