//! Credential provider
//!
//! Turns a validated target into a `DeploymentSession` in two round trips:
//! a client-credentials token exchange against the tenant's authority, then
//! a publish profile fetch on the management plane to derive the deployment
//! plane's Basic auth pair.

use std::time::Duration;

use http::Method;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::authn::bearer::BearerToken;
use crate::authn::publish_profile::{deployment_username, parse_publish_data};
use crate::errors::AuthError;
use crate::http::arm::{ArmClient, SiteAction};
use crate::models::session::{AccessCredentials, DeploymentSession};
use crate::models::target::DeployTarget;

/// Response from the OAuth2 token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "de_lenient_u64")]
    expires_in: Option<u64>,
}

// The authority reports expires_in sometimes as a number, sometimes as a
// quoted string. Take either, drop anything else.
fn de_lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }))
}

/// Acquires credentials for both planes of a site.
pub struct CredentialProvider {
    client: reqwest::Client,
    authority_base: String,
    management_resource: String,
}

impl CredentialProvider {
    pub fn new(authority_base: &str, management_resource: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            authority_base: authority_base.trim_end_matches('/').to_string(),
            management_resource: management_resource.to_string(),
        })
    }

    /// Acquire a session for the target.
    ///
    /// The publish profile is fetched with the bearer token that was just
    /// exchanged, so a session that comes back is known to work against
    /// both planes.
    pub async fn acquire(
        &self,
        target: DeployTarget,
        arm: &ArmClient,
    ) -> Result<DeploymentSession, AuthError> {
        // 1. Exchange client credentials for a management plane token
        let bearer = self.exchange_token(&target).await?;

        // 2. Fetch the publish profile with it
        let xml = arm
            .invoke_with_bearer(&target, &bearer, Method::POST, SiteAction::PublishXml)
            .await?;

        // 3. Derive the deployment plane credentials from the FTP entry
        let profile = parse_publish_data(&xml)?.ftp_profile()?;
        let deploy_user = deployment_username(&profile.user_name)?.to_string();
        info!(
            "acquired deployment credentials for site {} (user {})",
            target.site_name, deploy_user
        );

        Ok(DeploymentSession::new(
            target,
            AccessCredentials {
                bearer,
                deploy_user,
                deploy_password: profile.user_pwd,
            },
        ))
    }

    async fn exchange_token(&self, target: &DeployTarget) -> Result<BearerToken, AuthError> {
        let url = format!("{}/{}/oauth2/token", self.authority_base, target.tenant_id);
        debug!("POST {} (client credentials)", url);

        let form = [
            ("grant_type", "client_credentials"),
            ("resource", self.management_resource.as_str()),
            ("client_id", target.client_id.as_str()),
            ("client_secret", target.client_secret.expose_secret()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("token exchange failed: {} - {}", status, body);
            return Err(AuthError::TokenExchangeFailed(format!("{}: {}", status, body)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(format!("bad token response: {}", e)))?;

        Ok(BearerToken::from_response(body.access_token, body.expires_in))
    }
}
