//! coldswap - Entry Point
//!
//! Redeploys a bundle to a hosted site by stopping the site, swapping the
//! files while nothing holds them, and starting it again. The target is
//! read from `AZURE_*` environment variables; everything else is flags.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use tracing::{error, info};

use coldswap::app::options::AppOptions;
use coldswap::app::run::{run_deploy, site_status, verify_bundle};
use coldswap::logs::{init_logging, LogOptions};
use coldswap::models::target::DeployTarget;
use coldswap::probe::checks::{
    CheckSet, DEFAULT_DISABLED_MARKER, DEFAULT_DISABLED_STATUS, DEFAULT_SITE_PROCESS,
};
use coldswap::probe::poller::PollDeadline;
use coldswap::utils::version_info;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version).unwrap());
        return;
    }

    // Initialize logging
    let log_options = match build_log_options(&cli_args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let _log_guard = match init_logging(log_options.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Read the target from the environment
    let target = match DeployTarget::from_env() {
        Ok(target) => target,
        Err(e) => {
            error!("Target configuration incomplete: {}", e);
            error!(
                "Set AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET, \
                 AZURE_SUBSCRIPTION_ID, AZURE_RESOURCE_GROUP and AZURE_SITE_NAME"
            );
            std::process::exit(2);
        }
    };

    let options = match build_options(&cli_args, log_options) {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    // Status mode: probe the public host and report, deploy nothing
    if cli_args.contains_key("status") {
        match site_status(&target, &options).await {
            Ok((status, body)) => {
                let stopped = status == DEFAULT_DISABLED_STATUS
                    && body.to_lowercase().contains(DEFAULT_DISABLED_MARKER);
                if stopped {
                    println!("site {}: {}", target.site_name, "stopped".red());
                } else if status.is_success() {
                    println!("site {}: {}", target.site_name, "running".green());
                } else {
                    println!("site {}: {} ({})", target.site_name, "unknown".yellow(), status);
                }
            }
            Err(e) => {
                error!("Status probe failed: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    // Deploy mode
    let bundle = match cli_args.get("bundle") {
        Some(path) => PathBuf::from(path),
        None => {
            error!("No bundle given");
            error!("Run: coldswap --bundle=<path-to-zip> [--checks=process] [--webjobs=a,b]");
            std::process::exit(2);
        }
    };

    // A bundle that cannot be read is a configuration problem; catch it
    // before the site is stopped
    if let Err(e) = verify_bundle(&bundle) {
        error!("{:#}", e);
        std::process::exit(2);
    }

    info!("Running coldswap with options: {:?}", options);
    let result = run_deploy(target, &bundle, options, await_shutdown_signal()).await;
    match result {
        Ok(report) => {
            println!(
                "{} site {} is running the new bundle",
                "deployed".green().bold(),
                report.site_name
            );
            println!("  run id      {}", report.run_id);
            println!(
                "  bundle      {} bytes, sha256 {}",
                report.bundle_bytes, report.bundle_sha256
            );
            println!("  total time  {:?}", report.elapsed);
            for timing in &report.steps {
                println!("  {:<20}{:?}", timing.step.as_str(), timing.elapsed);
            }
        }
        Err(e) => {
            error!("Deployment failed: {e}");
            println!("{} {}", "failed".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn build_log_options(cli_args: &HashMap<String, String>) -> Result<LogOptions, String> {
    let mut logs = LogOptions::default();
    if let Some(raw) = cli_args.get("log-level") {
        logs.log_level = raw.parse()?;
    }
    if cli_args.contains_key("log-json") {
        logs.json_format = true;
    }
    if let Some(dir) = cli_args.get("log-dir") {
        logs.log_dir = Some(PathBuf::from(dir));
    }
    Ok(logs)
}

fn build_options(
    cli_args: &HashMap<String, String>,
    logs: LogOptions,
) -> Result<AppOptions, String> {
    let mut options = AppOptions {
        logs,
        ..Default::default()
    };

    if let Some(raw) = cli_args.get("poll-interval") {
        let secs: u64 = raw
            .parse()
            .map_err(|_| format!("Invalid --poll-interval: {}", raw))?;
        options.deploy.poll.interval = Duration::from_secs(secs);
    }

    // --timeout=0 means wait forever (until cancelled)
    if let Some(raw) = cli_args.get("timeout") {
        let secs: u64 = raw
            .parse()
            .map_err(|_| format!("Invalid --timeout: {}", raw))?;
        options.deploy.poll.deadline = if secs == 0 {
            PollDeadline::Unbounded
        } else {
            PollDeadline::Bounded(Duration::from_secs(secs))
        };
    }

    if let Some(raw) = cli_args.get("checks") {
        options.deploy.checks = match raw.as_str() {
            "basic" => CheckSet::Basic,
            "process" => CheckSet::ProcessDrain {
                process: cli_args
                    .get("process")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_SITE_PROCESS.to_string()),
            },
            other => {
                return Err(format!(
                    "Invalid --checks: {} (expected basic or process)",
                    other
                ))
            }
        };
    }

    if let Some(raw) = cli_args.get("webjobs") {
        options.deploy.webjobs = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(raw) = cli_args.get("lock-retries") {
        options.deploy.upload_lock_retries = raw
            .parse()
            .map_err(|_| format!("Invalid --lock-retries: {}", raw))?;
    }

    Ok(options)
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
