//! Linear progression of one deployment run
//!
//! Unlike a long-lived workflow machine, a deployment run only ever moves
//! forward: each step completes exactly once and there is no retry edge
//! at this level. The table exists so a step finishing out of order is
//! caught as a bug instead of silently reordering the pipeline.

use std::fmt;

/// One step of the deployment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    /// Exchange configuration for credentials on both planes
    AcquireCredentials,

    /// Stop continuous webjobs before touching the site
    StopWebjobs,

    /// Ask the management plane to stop the site
    StopSite,

    /// Wait until the readiness checks agree the site is down
    ConfirmStopped,

    /// Upload and extract the zip bundle
    UploadBundle,

    /// Ask the management plane to start the site again
    StartSite,

    /// Restart continuous webjobs
    StartWebjobs,
}

impl DeployStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::AcquireCredentials => "acquire-credentials",
            DeployStep::StopWebjobs => "stop-webjobs",
            DeployStep::StopSite => "stop-site",
            DeployStep::ConfirmStopped => "confirm-stopped",
            DeployStep::UploadBundle => "upload-bundle",
            DeployStep::StartSite => "start-site",
            DeployStep::StartWebjobs => "start-webjobs",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    /// Nothing has happened yet
    Init,

    /// Both planes are reachable with working credentials
    CredentialsAcquired,

    /// Stop has been requested but not yet confirmed
    Stopping,

    /// The readiness checks confirmed the site is down
    Stopped,

    /// The bundle is extracted into the site's file tree
    Uploaded,

    /// The site is running the new bundle
    Started,
}

/// Tracks the progression of one run
#[derive(Debug, Clone)]
pub struct DeployProgress {
    phase: DeployPhase,
}

impl DeployProgress {
    pub fn new() -> Self {
        Self {
            phase: DeployPhase::Init,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    /// Record a completed step and advance the phase.
    ///
    /// The webjob steps are optional bracketing work: they complete
    /// without moving the phase, so runs with and without webjobs walk
    /// the same phase sequence.
    pub fn complete(&mut self, step: DeployStep) -> Result<(), String> {
        let new_phase = match (self.phase, step) {
            (DeployPhase::Init, DeployStep::AcquireCredentials) => DeployPhase::CredentialsAcquired,

            (DeployPhase::CredentialsAcquired, DeployStep::StopWebjobs) => {
                DeployPhase::CredentialsAcquired
            }
            (DeployPhase::CredentialsAcquired, DeployStep::StopSite) => DeployPhase::Stopping,

            (DeployPhase::Stopping, DeployStep::ConfirmStopped) => DeployPhase::Stopped,

            (DeployPhase::Stopped, DeployStep::UploadBundle) => DeployPhase::Uploaded,

            (DeployPhase::Uploaded, DeployStep::StartSite) => DeployPhase::Started,

            (DeployPhase::Started, DeployStep::StartWebjobs) => DeployPhase::Started,

            // Invalid completions
            (phase, step) => {
                return Err(format!("step {} cannot complete while {:?}", step, phase));
            }
        };

        self.phase = new_phase;
        Ok(())
    }
}

impl Default for DeployProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_walks_forward() {
        let mut progress = DeployProgress::new();
        assert_eq!(progress.phase(), DeployPhase::Init);

        progress.complete(DeployStep::AcquireCredentials).unwrap();
        assert_eq!(progress.phase(), DeployPhase::CredentialsAcquired);

        progress.complete(DeployStep::StopSite).unwrap();
        assert_eq!(progress.phase(), DeployPhase::Stopping);

        progress.complete(DeployStep::ConfirmStopped).unwrap();
        assert_eq!(progress.phase(), DeployPhase::Stopped);

        progress.complete(DeployStep::UploadBundle).unwrap();
        assert_eq!(progress.phase(), DeployPhase::Uploaded);

        progress.complete(DeployStep::StartSite).unwrap();
        assert_eq!(progress.phase(), DeployPhase::Started);
    }

    #[test]
    fn test_webjob_steps_keep_the_phase() {
        let mut progress = DeployProgress::new();
        progress.complete(DeployStep::AcquireCredentials).unwrap();

        progress.complete(DeployStep::StopWebjobs).unwrap();
        assert_eq!(progress.phase(), DeployPhase::CredentialsAcquired);

        progress.complete(DeployStep::StopSite).unwrap();
        progress.complete(DeployStep::ConfirmStopped).unwrap();
        progress.complete(DeployStep::UploadBundle).unwrap();
        progress.complete(DeployStep::StartSite).unwrap();

        progress.complete(DeployStep::StartWebjobs).unwrap();
        assert_eq!(progress.phase(), DeployPhase::Started);
    }

    #[test]
    fn test_out_of_order_step_is_rejected() {
        let mut progress = DeployProgress::new();
        assert!(progress.complete(DeployStep::UploadBundle).is_err());

        progress.complete(DeployStep::AcquireCredentials).unwrap();
        assert!(progress.complete(DeployStep::StartSite).is_err());
        // the failed completion must not move the phase
        assert_eq!(progress.phase(), DeployPhase::CredentialsAcquired);
    }
}
