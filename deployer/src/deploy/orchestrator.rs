//! Deployment orchestrator
//!
//! Drives one run end to end: acquire credentials, stop the site, wait
//! until it has actually quiesced, swap the bundle, start it again. Steps
//! run strictly in order and a failed step aborts the run with the site
//! left in whatever state it reached; the caller decides whether to
//! re-run or intervene.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span, warn, Instrument};

use crate::authn::provider::CredentialProvider;
use crate::deploy::progress::{DeployProgress, DeployStep};
use crate::errors::{DeploymentError, PollError, StepError, TransferError};
use crate::http::arm::ArmClient;
use crate::http::kudu::KuduClient;
use crate::http::site::SiteProbe;
use crate::models::target::DeployTarget;
use crate::probe::checks::CheckSet;
use crate::probe::poller::{poll_until, PollOptions};
use crate::utils::{calc_exp_backoff, generate_uuid, sha256_hash, CooldownOptions};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Readiness poll loop settings
    pub poll: PollOptions,

    /// Which readiness checks gate the upload
    pub checks: CheckSet,

    /// How many times a locked upload is retried before giving up
    pub upload_lock_retries: u32,

    /// Backoff between locked-upload retries
    pub lock_retry_backoff: CooldownOptions,

    /// Continuous webjobs stopped before the run and restarted after
    pub webjobs: Vec<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            poll: PollOptions::default(),
            checks: CheckSet::default(),
            upload_lock_retries: 3,
            lock_retry_backoff: CooldownOptions {
                base_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(60),
                multiplier: 2.0,
            },
            webjobs: Vec::new(),
        }
    }
}

/// Wall-clock cost of one completed step
#[derive(Debug, Clone, Copy)]
pub struct StepTiming {
    pub step: DeployStep,
    pub elapsed: Duration,
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Correlation id carried by every span of the run
    pub run_id: String,
    pub site_name: String,
    pub bundle_bytes: usize,
    pub bundle_sha256: String,
    pub elapsed: Duration,
    pub steps: Vec<StepTiming>,
}

/// Drives deployment runs against one platform.
pub struct Deployer {
    provider: CredentialProvider,
    arm: ArmClient,
    kudu: KuduClient,
    probe: SiteProbe,
    options: DeployOptions,
}

impl Deployer {
    pub fn new(
        provider: CredentialProvider,
        arm: ArmClient,
        kudu: KuduClient,
        probe: SiteProbe,
        options: DeployOptions,
    ) -> Self {
        Self {
            provider,
            arm,
            kudu,
            probe,
            options,
        }
    }

    /// Run one deployment.
    ///
    /// `cancel` aborts the run while it waits for the site to quiesce;
    /// the individual HTTP calls around it are short-lived and finish on
    /// their own timeouts. On any error the site is left as-is and the
    /// logs say what to do next.
    pub async fn deploy(
        &self,
        target: DeployTarget,
        bundle_path: &Path,
        cancel: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Result<DeployReport, DeploymentError> {
        let run_id = generate_uuid();
        let site_name = target.site_name.clone();
        let run_started = Instant::now();
        let mut progress = DeployProgress::new();
        let mut timings: Vec<StepTiming> = Vec::new();

        info!("deployment run {} starting for site {}", run_id, site_name);

        // 1. Acquire credentials for both planes
        let session = run_step(
            DeployStep::AcquireCredentials,
            &run_id,
            &site_name,
            &mut progress,
            &mut timings,
            move || async move { Ok(self.provider.acquire(target, &self.arm).await?) },
        )
        .await?;
        let session = &session;

        // 2. Stop continuous webjobs so they release their file handles
        if !self.options.webjobs.is_empty() {
            run_step(
                DeployStep::StopWebjobs,
                &run_id,
                &site_name,
                &mut progress,
                &mut timings,
                move || async move {
                    for name in &self.options.webjobs {
                        self.kudu.stop_continuous_webjob(session, name).await?;
                    }
                    Ok(())
                },
            )
            .await?;
        }

        // 3. Ask the management plane to stop the site
        run_step(
            DeployStep::StopSite,
            &run_id,
            &site_name,
            &mut progress,
            &mut timings,
            move || async move {
                self.arm.stop_site(session).await?;
                Ok(())
            },
        )
        .await?;

        // 4. Wait until the readiness checks confirm the site is down
        {
            let span = info_span!(
                "deploy_step",
                run = %run_id,
                site = %site_name,
                step = %DeployStep::ConfirmStopped
            );
            let step_started = Instant::now();
            let checks = self.options.checks.build(&self.probe, &self.kudu);
            let result = poll_until(
                &checks,
                session,
                &self.options.poll,
                tokio::time::sleep,
                cancel,
            )
            .instrument(span)
            .await;

            match result {
                Ok(()) => {
                    complete_step(&mut progress, DeployStep::ConfirmStopped)?;
                    timings.push(StepTiming {
                        step: DeployStep::ConfirmStopped,
                        elapsed: step_started.elapsed(),
                    });
                }
                Err(PollError::DeadlineExceeded { waited }) => {
                    error!(
                        "site {} did not quiesce within {:?}; it stays stopped, nothing was uploaded",
                        site_name, waited
                    );
                    return Err(DeploymentError::Timeout { waited });
                }
                Err(PollError::Cancelled) => {
                    warn!(
                        "deployment run {} cancelled; site {} stays stopped, nothing was uploaded",
                        run_id, site_name
                    );
                    return Err(DeploymentError::Cancelled);
                }
            }
        }

        // 5. Upload the bundle, retrying while remote handles drain
        let upload = run_step(
            DeployStep::UploadBundle,
            &run_id,
            &site_name,
            &mut progress,
            &mut timings,
            move || async move {
                let bundle = tokio::fs::read(bundle_path).await?;
                let bundle_bytes = bundle.len();
                let bundle_sha256 = sha256_hash(&bundle);
                info!(
                    "uploading {} ({} bytes, sha256 {})",
                    bundle_path.display(),
                    bundle_bytes,
                    bundle_sha256
                );

                let mut attempt = 0;
                let outcome = loop {
                    match self.kudu.upload_zip(session, bundle.clone()).await {
                        Ok(()) => break Ok(()),
                        Err(TransferError::Locked { status })
                            if attempt < self.options.upload_lock_retries =>
                        {
                            let delay = calc_exp_backoff(&self.options.lock_retry_backoff, attempt);
                            attempt += 1;
                            warn!(
                                "remote files still locked (status {}), retrying upload in {:?} ({}/{})",
                                status, delay, attempt, self.options.upload_lock_retries
                            );
                            tokio::time::sleep(delay).await;
                        }
                        Err(e) => break Err(StepError::Transfer(e)),
                    }
                };
                outcome?;
                Ok((bundle_sha256, bundle_bytes))
            },
        )
        .await;

        let (bundle_sha256, bundle_bytes) = match upload {
            Ok(value) => value,
            Err(e) => {
                error!(
                    "site {} remains stopped; re-run the deployment once the cause is fixed",
                    site_name
                );
                return Err(e);
            }
        };

        // 6. Ask the management plane to start the site again
        if session.credentials().bearer.is_expired() {
            warn!("bearer token expired while waiting; the start request will likely be rejected");
        }
        let start = run_step(
            DeployStep::StartSite,
            &run_id,
            &site_name,
            &mut progress,
            &mut timings,
            move || async move {
                self.arm.start_site(session).await?;
                Ok(())
            },
        )
        .await;
        if let Err(e) = start {
            error!(
                "site {} is still stopped with the new bundle in place; start it manually or re-run",
                site_name
            );
            return Err(e);
        }

        // 7. Restart continuous webjobs
        if !self.options.webjobs.is_empty() {
            run_step(
                DeployStep::StartWebjobs,
                &run_id,
                &site_name,
                &mut progress,
                &mut timings,
                move || async move {
                    for name in &self.options.webjobs {
                        self.kudu.start_continuous_webjob(session, name).await?;
                    }
                    Ok(())
                },
            )
            .await?;
        }

        let elapsed = run_started.elapsed();
        info!(
            "deployment run {} finished for site {} in {:?}",
            run_id, site_name, elapsed
        );

        Ok(DeployReport {
            run_id,
            site_name,
            bundle_bytes,
            bundle_sha256,
            elapsed,
            steps: timings,
        })
    }
}

/// Run one step inside its own span, record its timing, advance progress.
async fn run_step<T, F, Fut>(
    step: DeployStep,
    run_id: &str,
    site_name: &str,
    progress: &mut DeployProgress,
    timings: &mut Vec<StepTiming>,
    f: F,
) -> Result<T, DeploymentError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, StepError>>,
{
    let span = info_span!("deploy_step", run = %run_id, site = %site_name, step = %step);
    let step_started = Instant::now();
    let result = f().instrument(span).await;
    let elapsed = step_started.elapsed();

    match result {
        Ok(value) => {
            complete_step(progress, step)?;
            timings.push(StepTiming { step, elapsed });
            info!("step {} completed in {:?}", step, elapsed);
            Ok(value)
        }
        Err(source) => {
            error!("step {} failed after {:?}: {}", step, elapsed, source);
            Err(DeploymentError::StepFailed { step, source })
        }
    }
}

fn complete_step(progress: &mut DeployProgress, step: DeployStep) -> Result<(), DeploymentError> {
    progress.complete(step).map_err(|e| DeploymentError::StepFailed {
        step,
        source: StepError::Sequence(e),
    })
}
