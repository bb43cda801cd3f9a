//! Credential acquisition for the management and deployment planes

pub mod bearer;
pub mod provider;
pub mod publish_profile;
