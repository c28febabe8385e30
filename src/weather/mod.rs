//! Open-Meteo weather module
//!
//! Contains types, the HTTP client, and the lookup flow that turns a place
//! name into a current-conditions report.

pub mod client;
pub mod lookup;
pub mod types;
