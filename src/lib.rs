//! Material requirement planner
//!
//! Picks the smallest set of characters and weapons whose upgrade materials
//! cover every material, simulates farming them in bulk through the remote
//! calculator, and turns the surplus into a GOOD inventory export.

pub mod calculator;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod models;
pub mod planner;
pub mod selector;

pub use error::PlannerError;
