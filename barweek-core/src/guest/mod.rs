//! Guest mode storage for visitors without an account.

mod kv;
mod store;

pub use kv::{DirKv, KeyValueStore, MemoryKv};
pub use store::{GuestAgendaItem, GuestBarVisit, GuestSnapshot, GuestStore, GuestSummary};
