//! coldswap library
//!
//! Core modules for stop-and-swap redeployment of hosted sites: acquire
//! credentials, stop the site, confirm it has quiesced, swap the bundle,
//! start it again.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod probe;
pub mod utils;
