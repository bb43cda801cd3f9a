//! Public site probe
//!
//! Unauthenticated GET against the site's public host. When the platform
//! has a site stopped it answers 403 with a short "Site disabled" page;
//! the probe hands back the status plus a bounded body prefix and leaves
//! the interpretation to the readiness checks.

use std::time::Duration;

use http::StatusCode;
use reqwest::Client;
use tracing::debug;

use crate::utils::body_prefix;

/// How much of the response body is worth keeping for matching.
const BODY_PREFIX_LIMIT: usize = 2048;

#[derive(Clone)]
pub struct SiteProbe {
    client: Client,
    base_url: String,
}

impl SiteProbe {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the site's public status line and a prefix of its body.
    pub async fn fetch_status(&self) -> Result<(StatusCode, String), reqwest::Error> {
        let url = format!("{}/", self.base_url);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body_prefix(&body, BODY_PREFIX_LIMIT).to_string()))
    }
}
