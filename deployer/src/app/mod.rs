//! Application composition layer

pub mod options;
pub mod run;
