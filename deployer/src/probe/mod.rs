//! Site readiness probing
//!
//! Checks answer "does this condition hold right now"; the poller repeats
//! a whole set of them until all hold at once.

pub mod checks;
pub mod poller;
