//! Deployment target description
//!
//! A `DeployTarget` names one site and the service principal allowed to
//! manage it. It is validated and normalized when built and never mutated
//! afterwards; anything derived from it (URLs, credentials) is computed
//! elsewhere.

use secrecy::SecretString;
use thiserror::Error;

/// Environment variables the target is read from.
const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
const ENV_RESOURCE_GROUP: &str = "AZURE_RESOURCE_GROUP";
const ENV_SITE_NAME: &str = "AZURE_SITE_NAME";
const ENV_DEPLOY_PATH: &str = "AZURE_DEPLOY_PATH";

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// One site and the identity used to manage it.
#[derive(Debug)]
pub struct DeployTarget {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub subscription_id: String,
    pub resource_group: String,
    pub site_name: String,
    /// Remote path under the site's home directory, no leading or
    /// trailing slashes; empty means the site root.
    pub deploy_path: String,
}

impl DeployTarget {
    /// Read the target from the `AZURE_*` environment variables.
    pub fn from_env() -> Result<Self, TargetError> {
        // Missing AZURE_DEPLOY_PATH means the site root.
        let deploy_path = std::env::var(ENV_DEPLOY_PATH).unwrap_or_default();

        let mut target = Self {
            tenant_id: required_env(ENV_TENANT_ID)?,
            client_id: required_env(ENV_CLIENT_ID)?,
            client_secret: SecretString::from(required_env(ENV_CLIENT_SECRET)?),
            subscription_id: required_env(ENV_SUBSCRIPTION_ID)?,
            resource_group: required_env(ENV_RESOURCE_GROUP)?,
            site_name: required_env(ENV_SITE_NAME)?,
            deploy_path,
        };
        target.validate()?;
        Ok(target)
    }

    /// Check the invariants a target must hold before any plane is called
    /// and normalize the deploy path. However the target was built, a
    /// validated one never carries leading or trailing slashes.
    pub fn validate(&mut self) -> Result<(), TargetError> {
        if self.tenant_id.trim().is_empty() {
            return Err(TargetError::EmptyField("tenant id"));
        }
        if self.client_id.trim().is_empty() {
            return Err(TargetError::EmptyField("client id"));
        }
        if self.subscription_id.trim().is_empty() {
            return Err(TargetError::EmptyField("subscription id"));
        }
        if self.resource_group.trim().is_empty() {
            return Err(TargetError::EmptyField("resource group"));
        }
        if self.site_name.trim().is_empty() {
            return Err(TargetError::EmptyField("site name"));
        }
        self.deploy_path = normalize_deploy_path(&self.deploy_path);
        Ok(())
    }
}

fn required_env(name: &'static str) -> Result<String, TargetError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(TargetError::MissingVar(name)),
    }
}

fn normalize_deploy_path(raw: &str) -> String {
    raw.trim().trim_matches('/').to_string()
}

/// Hosts and versions of the hosting platform.
///
/// Defaults cover the public cloud; sovereign clouds or local emulators
/// swap the hosts out here and nothing downstream changes.
#[derive(Debug, Clone)]
pub struct PlatformEndpoints {
    /// Token authority, e.g. `https://login.microsoftonline.com`
    pub authority_host: String,
    /// Management plane base, e.g. `https://management.azure.com`
    pub management_host: String,
    /// Resource identifier the bearer token is requested for
    pub management_resource: String,
    /// Host suffix of the per-site deployment plane
    pub scm_host_suffix: String,
    /// Host suffix of the public site
    pub site_host_suffix: String,
    /// Management plane API version
    pub api_version: String,
}

impl Default for PlatformEndpoints {
    fn default() -> Self {
        Self {
            authority_host: "https://login.microsoftonline.com".to_string(),
            management_host: "https://management.azure.com".to_string(),
            management_resource: "https://management.azure.com/".to_string(),
            scm_host_suffix: "scm.azurewebsites.net".to_string(),
            site_host_suffix: "azurewebsites.net".to_string(),
            api_version: "2016-08-01".to_string(),
        }
    }
}

impl PlatformEndpoints {
    /// Deployment plane base URL for a site.
    pub fn scm_base(&self, site_name: &str) -> String {
        format!("https://{}.{}", site_name, self.scm_host_suffix)
    }

    /// Public base URL for a site.
    pub fn site_base(&self, site_name: &str) -> String {
        format!("https://{}.{}", site_name, self.site_host_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DeployTarget {
        DeployTarget {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: SecretString::from("secret".to_string()),
            subscription_id: "sub".to_string(),
            resource_group: "rg".to_string(),
            site_name: "mysite".to_string(),
            deploy_path: "site/wwwroot".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_target() {
        assert!(target().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_site_name() {
        let mut t = target();
        t.site_name = "  ".to_string();
        assert!(matches!(t.validate(), Err(TargetError::EmptyField("site name"))));
    }

    #[test]
    fn test_normalize_deploy_path() {
        assert_eq!(normalize_deploy_path("/site/wwwroot/"), "site/wwwroot");
        assert_eq!(normalize_deploy_path("  app "), "app");
        assert_eq!(normalize_deploy_path("/"), "");
    }

    #[test]
    fn test_validate_normalizes_deploy_path() {
        let mut t = target();
        t.deploy_path = "/site/wwwroot/".to_string();
        t.validate().unwrap();
        assert_eq!(t.deploy_path, "site/wwwroot");
    }

    #[test]
    fn test_default_endpoints_compose_site_hosts() {
        let endpoints = PlatformEndpoints::default();
        assert_eq!(
            endpoints.scm_base("mysite"),
            "https://mysite.scm.azurewebsites.net"
        );
        assert_eq!(endpoints.site_base("mysite"), "https://mysite.azurewebsites.net");
    }
}
