//! Deployment session
//!
//! The session pairs a validated target with the credentials acquired for
//! it. It exists for one deployment run: it is never persisted and never
//! refreshed in place. A caller that outlives the bearer token acquires a
//! fresh session instead.

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::authn::bearer::BearerToken;
use crate::models::target::DeployTarget;

/// Credentials for both planes of one site.
pub struct AccessCredentials {
    /// Bearer token for the management plane
    pub bearer: BearerToken,
    /// Deployment plane user, already stripped of its site prefix
    pub deploy_user: String,
    /// Deployment plane password from the publish profile
    pub deploy_password: SecretString,
}

/// Everything one deployment run needs to talk to a site.
pub struct DeploymentSession {
    target: DeployTarget,
    credentials: AccessCredentials,
    acquired_at: DateTime<Utc>,
}

impl DeploymentSession {
    // Sessions only come out of CredentialProvider::acquire.
    pub(crate) fn new(target: DeployTarget, credentials: AccessCredentials) -> Self {
        Self {
            target,
            credentials,
            acquired_at: Utc::now(),
        }
    }

    pub fn target(&self) -> &DeployTarget {
        &self.target
    }

    pub fn credentials(&self) -> &AccessCredentials {
        &self.credentials
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

// Manual impl: the raw bearer token and the publish password must never
// reach a log line. The expiry is enough to identify a stale session.
impl fmt::Debug for DeploymentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentSession")
            .field("site", &self.target.site_name)
            .field("deploy_user", &self.credentials.deploy_user)
            .field("token_expires_at", &self.credentials.bearer.expires_at())
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
