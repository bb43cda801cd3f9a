//! Application entry points
//!
//! Thin composition layer: resolve the platform endpoints for the target,
//! build the clients, hand everything to the orchestrator.

use std::future::Future;
use std::path::Path;

use anyhow::Context;
use http::StatusCode;
use tracing::info;
use url::Url;

use crate::app::options::AppOptions;
use crate::authn::provider::CredentialProvider;
use crate::deploy::orchestrator::{DeployReport, Deployer};
use crate::http::arm::ArmClient;
use crate::http::kudu::KuduClient;
use crate::http::site::SiteProbe;
use crate::models::target::DeployTarget;

/// Run one deployment of `bundle_path` to the target.
pub async fn run_deploy(
    target: DeployTarget,
    bundle_path: &Path,
    options: AppOptions,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<DeployReport> {
    info!(
        "deploying {} to site {}",
        bundle_path.display(),
        target.site_name
    );

    let deployer = build_deployer(&target, &options)?;
    let report = deployer
        .deploy(target, bundle_path, Box::pin(shutdown))
        .await?;
    Ok(report)
}

/// Probe the target's public host and return its status line and body.
pub async fn site_status(
    target: &DeployTarget,
    options: &AppOptions,
) -> anyhow::Result<(StatusCode, String)> {
    let site_base = options.endpoints.site_base(&target.site_name);
    Url::parse(&site_base).with_context(|| format!("invalid endpoint {}", site_base))?;

    let probe = SiteProbe::new(&site_base).context("building site probe")?;
    let (status, body) = probe.fetch_status().await.context("probing site")?;
    Ok((status, body))
}

/// Reject a bundle path that cannot be uploaded, before anything remote
/// is touched. A bad path found after the stop would leave the site down.
pub fn verify_bundle(bundle_path: &Path) -> anyhow::Result<()> {
    let meta = std::fs::metadata(bundle_path)
        .with_context(|| format!("bundle {} is not readable", bundle_path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("bundle {} is not a file", bundle_path.display());
    }
    Ok(())
}

fn build_deployer(target: &DeployTarget, options: &AppOptions) -> anyhow::Result<Deployer> {
    let endpoints = &options.endpoints;
    let scm_base = endpoints.scm_base(&target.site_name);
    let site_base = endpoints.site_base(&target.site_name);

    // Catch endpoint overrides that do not even parse before any plane
    // sees a request
    for base in [
        &endpoints.authority_host,
        &endpoints.management_host,
        &scm_base,
        &site_base,
    ] {
        Url::parse(base).with_context(|| format!("invalid endpoint {}", base))?;
    }

    let provider =
        CredentialProvider::new(&endpoints.authority_host, &endpoints.management_resource)
            .context("building credential provider")?;
    let arm = ArmClient::new(&endpoints.management_host, &endpoints.api_version)
        .context("building management plane client")?;
    let kudu = KuduClient::new(&scm_base).context("building deployment plane client")?;
    let probe = SiteProbe::new(&site_base).context("building site probe")?;

    Ok(Deployer::new(
        provider,
        arm,
        kudu,
        probe,
        options.deploy.clone(),
    ))
}
