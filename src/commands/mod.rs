pub mod account;
pub mod agenda;
pub mod config;
pub mod events;
pub mod import;
pub mod predictions;
pub mod stats;
pub mod visits;
