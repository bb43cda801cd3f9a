//! HTTP clients for the three surfaces the deployer talks to
//!
//! - `arm`: the management plane (site start/stop, publish profile)
//! - `kudu`: the per-site deployment plane (zip upload, commands, webjobs)
//! - `site`: the site's public host (readiness probing only)

pub mod arm;
pub mod kudu;
pub mod site;
