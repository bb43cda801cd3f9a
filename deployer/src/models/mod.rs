//! Data models for the coldswap deployer

pub mod command;
pub mod session;
pub mod target;
