//! Readiness checks
//!
//! A check answers one question about the target site: does a condition
//! hold right now. The poll loop in [`crate::probe::poller`] composes a
//! set of checks with AND semantics; every check is evaluated on every
//! iteration so logs show the full picture of what is still pending.

use async_trait::async_trait;
use http::StatusCode;

use crate::errors::CheckError;
use crate::http::kudu::KuduClient;
use crate::http::site::SiteProbe;
use crate::models::session::DeploymentSession;

/// Status the platform answers with for a stopped site.
pub const DEFAULT_DISABLED_STATUS: StatusCode = StatusCode::FORBIDDEN;

/// Marker in the body of the stopped-site page, matched case-insensitively.
pub const DEFAULT_DISABLED_MARKER: &str = "site disabled";

/// Process whose exit signals that the site has released its file handles.
pub const DEFAULT_SITE_PROCESS: &str = "w3wp";

/// One observable condition on the target site.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Short name used in poll logs.
    fn name(&self) -> &str;

    /// Whether the condition holds right now.
    async fn holds(&self, session: &DeploymentSession) -> Result<bool, CheckError>;
}

/// Holds when the public host answers with the platform's stopped-site
/// signal: the configured status plus a body carrying the marker.
pub struct SiteStopped {
    probe: SiteProbe,
    status: StatusCode,
    marker: String,
}

impl SiteStopped {
    pub fn new(probe: SiteProbe) -> Self {
        Self::with_signal(probe, DEFAULT_DISABLED_STATUS, DEFAULT_DISABLED_MARKER)
    }

    pub fn with_signal(probe: SiteProbe, status: StatusCode, marker: &str) -> Self {
        Self {
            probe,
            status,
            marker: marker.to_lowercase(),
        }
    }
}

#[async_trait]
impl ReadinessCheck for SiteStopped {
    fn name(&self) -> &str {
        "site-stopped"
    }

    async fn holds(&self, _session: &DeploymentSession) -> Result<bool, CheckError> {
        let (status, body) = self.probe.fetch_status().await?;
        Ok(status == self.status && body.to_lowercase().contains(&self.marker))
    }
}

/// Holds when the named process is no longer running on the instance.
///
/// Runs a probe command through the deployment plane that is built to
/// exit 0 exactly when the process is absent.
pub struct ProcessDrained {
    kudu: KuduClient,
    process: String,
}

impl ProcessDrained {
    pub fn new(kudu: KuduClient, process: impl Into<String>) -> Self {
        Self {
            kudu,
            process: process.into(),
        }
    }

    fn drain_command(process: &str) -> String {
        format!(
            "powershell -NoProfile -Command \"if (Get-Process -Name '{}' -ErrorAction SilentlyContinue) {{ exit 1 }} else {{ exit 0 }}\"",
            process
        )
    }
}

#[async_trait]
impl ReadinessCheck for ProcessDrained {
    fn name(&self) -> &str {
        "process-drained"
    }

    async fn holds(&self, session: &DeploymentSession) -> Result<bool, CheckError> {
        let result = self
            .kudu
            .run_command(session, &Self::drain_command(&self.process), "")
            .await?;
        Ok(result.success())
    }
}

/// Which checks a deployment waits on before uploading.
#[derive(Debug, Clone, Default)]
pub enum CheckSet {
    /// Public stopped-site signal only
    #[default]
    Basic,
    /// Stopped-site signal plus process drain on the instance
    ProcessDrain { process: String },
}

impl CheckSet {
    /// Materialize the set against concrete clients.
    pub fn build(&self, probe: &SiteProbe, kudu: &KuduClient) -> Vec<Box<dyn ReadinessCheck>> {
        match self {
            CheckSet::Basic => vec![Box::new(SiteStopped::new(probe.clone()))],
            CheckSet::ProcessDrain { process } => vec![
                Box::new(SiteStopped::new(probe.clone())),
                Box::new(ProcessDrained::new(kudu.clone(), process.clone())),
            ],
        }
    }
}
