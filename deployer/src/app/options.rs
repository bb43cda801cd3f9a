//! Application options

use crate::deploy::orchestrator::DeployOptions;
use crate::logs::LogOptions;
use crate::models::target::PlatformEndpoints;

/// Everything configurable about one invocation, minus the target itself.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Platform hosts and API version
    pub endpoints: PlatformEndpoints,

    /// Orchestrator settings
    pub deploy: DeployOptions,

    /// Logging settings
    pub logs: LogOptions,
}
