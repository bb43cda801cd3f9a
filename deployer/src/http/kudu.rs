//! Deployment plane client
//!
//! Talks to the site's SCM host with the Basic credentials derived from
//! the publish profile: zip upload into the site's file tree, remote
//! command execution, and continuous webjob start/stop.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use tracing::{debug, error};

use crate::errors::TransferError;
use crate::models::command::RemoteCommandResult;
use crate::models::session::DeploymentSession;
use crate::utils::body_prefix;

/// Marker the plane puts in 5xx bodies when extraction hit an open file
/// handle on the instance.
pub(crate) const LOCK_MARKER: &str = "being used by another process";

const LOG_BODY_LIMIT: usize = 2048;

/// HTTP Basic authorization header value for a credential pair.
pub fn basic_auth_header(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

/// Client for the per-site SCM endpoint.
#[derive(Clone)]
pub struct KuduClient {
    client: Client,
    base_url: String,
}

impl KuduClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth(&self, session: &DeploymentSession) -> String {
        let credentials = session.credentials();
        basic_auth_header(
            &credentials.deploy_user,
            credentials.deploy_password.expose_secret(),
        )
    }

    /// Upload a zip bundle; the plane extracts it into the session's
    /// deploy path, overwriting files in place.
    ///
    /// A 5xx whose body carries the lock marker comes back as
    /// [`TransferError::Locked`] so callers can retry once the site has
    /// actually quiesced.
    pub async fn upload_zip(
        &self,
        session: &DeploymentSession,
        bundle: Vec<u8>,
    ) -> Result<(), TransferError> {
        let url = format!("{}/api/zip/{}", self.base_url, session.target().deploy_path);
        debug!("PUT {} ({} bytes)", url, bundle.len());

        let response = self
            .client
            .put(&url)
            .header(header::AUTHORIZATION, self.auth(session))
            .body(bundle)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() && body.to_lowercase().contains(LOCK_MARKER) {
            error!("zip upload blocked by an open file handle (status {})", status);
            return Err(TransferError::Locked { status });
        }

        error!("zip upload failed: {} - {}", status, body_prefix(&body, LOG_BODY_LIMIT));
        Err(TransferError::Unexpected(status))
    }

    /// Run a command on the instance and decode its result.
    pub async fn run_command(
        &self,
        session: &DeploymentSession,
        command: &str,
        dir: &str,
    ) -> Result<RemoteCommandResult, TransferError> {
        let url = format!("{}/api/command", self.base_url);
        debug!("POST {} ({})", url, command);

        let payload = serde_json::json!({ "command": command, "dir": dir });
        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth(session))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("remote command failed: {} - {}", status, body_prefix(&body, LOG_BODY_LIMIT));
            return Err(TransferError::Unexpected(status));
        }

        response
            .json::<RemoteCommandResult>()
            .await
            .map_err(|e| TransferError::BadResponse(e.to_string()))
    }

    /// Stop a continuous webjob.
    pub async fn stop_continuous_webjob(
        &self,
        session: &DeploymentSession,
        name: &str,
    ) -> Result<(), TransferError> {
        self.webjob_action(session, name, "stop").await
    }

    /// Start a continuous webjob.
    pub async fn start_continuous_webjob(
        &self,
        session: &DeploymentSession,
        name: &str,
    ) -> Result<(), TransferError> {
        self.webjob_action(session, name, "start").await
    }

    async fn webjob_action(
        &self,
        session: &DeploymentSession,
        name: &str,
        action: &str,
    ) -> Result<(), TransferError> {
        let url = format!("{}/api/continuouswebjobs/{}/{}", self.base_url, name, action);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth(session))
            .body(Vec::new())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "webjob {} {} failed: {} - {}",
                name,
                action,
                status,
                body_prefix(&body, LOG_BODY_LIMIT)
            );
            return Err(TransferError::Unexpected(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header_encoding() {
        // base64("deployer:secret")
        assert_eq!(
            basic_auth_header("deployer", "secret"),
            "Basic ZGVwbG95ZXI6c2VjcmV0"
        );
    }

    #[test]
    fn test_lock_marker_matches_platform_wording() {
        let body = "The process cannot access the file 'app.dll' because it \
                    is being used by another process.";
        assert!(body.to_lowercase().contains(LOCK_MARKER));
    }
}
