//! Core library for barweek: awards-week event agendas with arrival-time
//! conflict checks, bar visits and predictions, for guests and accounts.

pub mod agenda;
pub mod backend;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod error;
pub mod event;
pub mod guest;
pub mod identity;
pub mod migration;
pub mod planner;
pub mod predictions;
pub mod stats;
pub mod storage;
pub mod time_slots;
pub mod tracking;
pub mod visits;

pub use agenda::{AddOutcome, AgendaService};
pub use config::BarweekConfig;
pub use error::{BarweekError, BarweekResult};
pub use event::{Bar, Event, EventCatalog, EventFilter, SortOption};
pub use identity::Identity;
pub use migration::{MigratedItems, MigrationResult};
pub use planner::Planner;
