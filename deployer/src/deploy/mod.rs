//! Deployment pipeline
//!
//! `progress` tracks how far a run has advanced; `orchestrator` executes
//! the steps in order against the HTTP clients.

pub mod orchestrator;
pub mod progress;
