//! Error types for the coldswap deployer
//!
//! Each plane the deployer talks to gets its own error enum so callers can
//! react to what actually went wrong: a rejected bearer token is not the
//! same failure as a locked file tree on the instance.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::deploy::progress::DeployStep;

/// Errors raised while turning service-principal configuration into
/// usable deployment credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("publish profile fetch failed: {0}")]
    ProfileFetch(#[from] ControlPlaneError),

    #[error("publish profile is not parseable XML: {0}")]
    ProfileParse(String),

    #[error("publish profile has no entry with method {0}")]
    NoMatchingPublishProfile(String),

    #[error("publish profile user name {0:?} has no site\\user separator")]
    MalformedPublishUser(String),
}

/// Errors from the management plane (ARM site actions).
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("management plane rejected the bearer token (status {0})")]
    Unauthorized(StatusCode),

    #[error("site not found on the management plane: {0}")]
    NotFound(String),

    #[error("unexpected management plane status: {0}")]
    Unexpected(StatusCode),

    #[error("management plane request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from the deployment plane (zip upload, remote commands, webjobs).
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("remote files are locked by a running process (status {status})")]
    Locked { status: StatusCode },

    #[error("unexpected deployment plane status: {0}")]
    Unexpected(StatusCode),

    #[error("deployment plane response could not be decoded: {0}")]
    BadResponse(String),

    #[error("deployment plane request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from a single readiness check evaluation.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("health probe failed: {0}")]
    Probe(#[from] reqwest::Error),

    #[error("remote check failed: {0}")]
    Transfer(#[from] TransferError),
}

/// Errors from the readiness poll loop.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("readiness not reached after waiting {waited:?}")]
    DeadlineExceeded { waited: Duration },

    #[error("polling cancelled by caller")]
    Cancelled,
}

/// Cause of a failed deployment step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Control(#[from] ControlPlaneError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("bundle read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("deploy sequence error: {0}")]
    Sequence(String),
}

/// Top-level outcome of a deployment run.
#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("deploy step {step} failed: {source}")]
    StepFailed {
        step: DeployStep,
        #[source]
        source: StepError,
    },

    #[error("timed out waiting for the site to quiesce after {waited:?}")]
    Timeout { waited: Duration },

    #[error("deployment cancelled")]
    Cancelled,
}
