//! Aggregate statistics for admin accounts.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::backend::Backend;
use crate::error::{BarweekError, BarweekResult};
use crate::event::{Bar, Event};
use crate::identity::Identity;

const UNKNOWN_BAR: &str = "Unknown Bar";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionAggregate {
    pub bar_id: String,
    pub bar_name: String,
    pub prediction_count: usize,
    pub rank_2025: Option<u32>,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarVisitAggregate {
    pub bar_id: String,
    pub bar_name: String,
    pub total_visits: usize,
    pub rank_2025: Option<u32>,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAgendaAggregate {
    pub event_id: String,
    pub event_name: String,
    pub total_users_added: usize,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: String,
    pub venue: String,
}

pub struct AdminStats {
    backend: Arc<dyn Backend>,
    admin_emails: Vec<String>,
}

impl AdminStats {
    pub fn new(backend: Arc<dyn Backend>, admin_emails: &[String]) -> Self {
        AdminStats {
            backend,
            admin_emails: admin_emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        identity
            .account()
            .is_some_and(|a| self.admin_emails.contains(&a.email.to_lowercase()))
    }

    fn authorize(&self, identity: &Identity) -> BarweekResult<()> {
        if self.is_admin(identity) {
            Ok(())
        } else {
            Err(BarweekError::Unauthorized)
        }
    }

    async fn bar_index(&self) -> BarweekResult<HashMap<String, Bar>> {
        Ok(self
            .backend
            .bars()
            .await?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect())
    }

    /// How many users placed each bar in their predictions, most predicted first.
    pub async fn top_predictions(&self, identity: &Identity) -> BarweekResult<Vec<PredictionAggregate>> {
        self.authorize(identity)?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in self.backend.all_predictions().await? {
            match serde_json::from_str::<Vec<String>>(&row.prediction_json) {
                Ok(bar_ids) => {
                    for bar_id in bar_ids {
                        *counts.entry(bar_id).or_default() += 1;
                    }
                }
                Err(e) => warn!(user = %row.user_id, error = %e, "Skipping unreadable prediction record"),
            }
        }

        let bars = self.bar_index().await?;
        let mut aggregates: Vec<PredictionAggregate> = counts
            .into_iter()
            .map(|(bar_id, prediction_count)| {
                let bar = bars.get(&bar_id);
                PredictionAggregate {
                    bar_name: bar.map_or(UNKNOWN_BAR.into(), |b| b.name.clone()),
                    rank_2025: bar.and_then(|b| b.rank_2025),
                    city: bar.map_or(UNKNOWN.into(), |b| b.city.clone()),
                    country: bar.map_or(UNKNOWN.into(), |b| b.country.clone()),
                    bar_id,
                    prediction_count,
                }
            })
            .collect();

        aggregates.sort_by(|a, b| b.prediction_count.cmp(&a.prediction_count));
        Ok(aggregates)
    }

    /// Distinct users who marked each bar visited, most visited first.
    pub async fn bar_visit_stats(&self, identity: &Identity) -> BarweekResult<Vec<BarVisitAggregate>> {
        self.authorize(identity)?;

        let mut visitors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in self.backend.all_visits().await?.into_iter().filter(|r| r.visited) {
            visitors.entry(row.bar_id).or_default().insert(row.user_id);
        }

        let bars = self.bar_index().await?;
        let mut aggregates: Vec<BarVisitAggregate> = visitors
            .into_iter()
            .map(|(bar_id, users)| {
                let bar = bars.get(&bar_id);
                BarVisitAggregate {
                    bar_name: bar.map_or(UNKNOWN_BAR.into(), |b| b.name.clone()),
                    rank_2025: bar.and_then(|b| b.rank_2025),
                    city: bar.map_or(UNKNOWN.into(), |b| b.city.clone()),
                    country: bar.map_or(UNKNOWN.into(), |b| b.country.clone()),
                    bar_id,
                    total_visits: users.len(),
                }
            })
            .collect();

        aggregates.sort_by(|a, b| b.total_visits.cmp(&a.total_visits));
        Ok(aggregates)
    }

    /// Distinct users who put each event on their agenda, most popular first.
    pub async fn event_agenda_stats(&self, identity: &Identity) -> BarweekResult<Vec<EventAgendaAggregate>> {
        self.authorize(identity)?;

        let mut attendees: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in self.backend.all_agenda().await? {
            attendees.entry(row.event_id).or_default().insert(row.user_id);
        }

        let events: HashMap<String, Event> = self
            .backend
            .events()
            .await?
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();

        let mut aggregates: Vec<EventAgendaAggregate> = attendees
            .into_iter()
            .map(|(event_id, users)| {
                let event = events.get(&event_id);
                EventAgendaAggregate {
                    event_name: event.map_or("Unknown Event".into(), |e| e.name.clone()),
                    date: event.and_then(|e| e.date.clone()),
                    time: event.and_then(|e| e.time.clone()),
                    location: event.map_or(UNKNOWN.into(), |e| e.location.clone()),
                    venue: event.map_or(UNKNOWN.into(), |e| e.venue.clone()),
                    event_id,
                    total_users_added: users.len(),
                }
            })
            .collect();

        aggregates.sort_by(|a, b| b.total_users_added.cmp(&a.total_users_added));
        Ok(aggregates)
    }
}
