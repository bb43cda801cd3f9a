//! Remote command execution result

use serde::{Deserialize, Serialize};

/// Outcome of a command run on the instance through the deployment plane.
///
/// The wire form uses the platform's PascalCase field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteCommandResult {
    /// Captured standard output
    pub output: String,
    /// Captured standard error
    pub error: String,
    /// Exit code of the remote command
    pub exit_code: i32,
}

impl RemoteCommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
