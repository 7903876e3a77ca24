//! Cradle screener: EMA cradle pullbacks filtered by market structure.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod exchange;
pub mod analysis;
pub mod engine;
pub mod report;
pub mod dashboard;
