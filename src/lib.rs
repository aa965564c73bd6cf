//! Farewatch - travel price tracking and alerting system.
//!
//! Scrapes travel providers for current prices, stores immutable price
//! snapshots per trip, and fires alerts when a scraped price drops at or
//! below a user-defined watch target.

pub mod cli;
pub mod config;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod services;
