//! Management plane client
//!
//! Every site-level operation is one POST (or GET) against the same URL
//! template, differing only in its final action segment. The closed
//! `SiteAction` enum is what keeps callers from composing arbitrary
//! management URLs.

use std::time::Duration;

use http::{Method, StatusCode};
use reqwest::{header, Client};
use tracing::{debug, error};

use crate::authn::bearer::BearerToken;
use crate::errors::ControlPlaneError;
use crate::models::session::DeploymentSession;
use crate::models::target::DeployTarget;

/// Site-level actions the management plane exposes to the deployer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteAction {
    /// Start the site
    Start,
    /// Stop the site
    Stop,
    /// Fetch the publish profile document
    PublishXml,
}

impl SiteAction {
    pub fn segment(&self) -> &'static str {
        match self {
            SiteAction::Start => "start",
            SiteAction::Stop => "stop",
            SiteAction::PublishXml => "publishxml",
        }
    }
}

/// Client for ARM site actions.
#[derive(Clone)]
pub struct ArmClient {
    client: Client,
    base_url: String,
    api_version: String,
}

impl ArmClient {
    pub fn new(base_url: &str, api_version: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    /// URL for one action on the target's site resource.
    pub fn site_action_url(&self, target: &DeployTarget, action: SiteAction) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{}/providers/Microsoft.Web/sites/{}/{}?api-version={}",
            self.base_url,
            target.subscription_id,
            target.resource_group,
            target.site_name,
            action.segment(),
            self.api_version
        )
    }

    /// Invoke an action with an explicit bearer token.
    ///
    /// This is the path the credential provider uses before a session
    /// exists; everything after acquisition goes through [`Self::invoke`].
    pub(crate) async fn invoke_with_bearer(
        &self,
        target: &DeployTarget,
        bearer: &BearerToken,
        verb: Method,
        action: SiteAction,
    ) -> Result<String, ControlPlaneError> {
        let url = self.site_action_url(target, action);
        debug!("{} {}", verb, url);

        let mut request = self
            .client
            .request(verb.clone(), &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer.raw));
        if verb != Method::GET {
            // Action triggers take an empty body
            request = request.body(Vec::new());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            // A body cut short mid-read is a transport failure, not an
            // empty 2xx
            return Ok(response.text().await?);
        }

        let body = response.text().await.unwrap_or_default();
        error!("management plane {} failed: {} - {}", action.segment(), status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ControlPlaneError::Unauthorized(status))
            }
            StatusCode::NOT_FOUND => Err(ControlPlaneError::NotFound(target.site_name.clone())),
            _ => Err(ControlPlaneError::Unexpected(status)),
        }
    }

    /// Invoke an action with the session's bearer token.
    pub async fn invoke(
        &self,
        session: &DeploymentSession,
        verb: Method,
        action: SiteAction,
    ) -> Result<String, ControlPlaneError> {
        self.invoke_with_bearer(session.target(), &session.credentials().bearer, verb, action)
            .await
    }

    /// Stop the site. Stopping an already stopped site succeeds.
    pub async fn stop_site(&self, session: &DeploymentSession) -> Result<(), ControlPlaneError> {
        self.invoke(session, Method::POST, SiteAction::Stop).await?;
        Ok(())
    }

    /// Start the site. Starting an already running site succeeds.
    pub async fn start_site(&self, session: &DeploymentSession) -> Result<(), ControlPlaneError> {
        self.invoke(session, Method::POST, SiteAction::Start).await?;
        Ok(())
    }
}
