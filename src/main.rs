// Hub Validations - Command Line Entry Point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hub_validations::models::config::EVENT_PATH_ENV;
use hub_validations::{build_pull_request_run, ConfigService, GitHubRemote, PullRequestSource};

/// Validate a pull request against a forecast hub.
#[derive(Debug, Parser)]
#[command(name = "hub-validations", version, about)]
struct Cli {
    /// Directory holding validation-config.json
    config_dir: PathBuf,

    /// Pull request number; defaults to the one in the GitHub event payload
    #[arg(long)]
    pr: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn pull_request_source(pr: Option<u64>) -> Result<PullRequestSource> {
    if let Some(number) = pr {
        return Ok(PullRequestSource::Number(number));
    }
    let path = std::env::var(EVENT_PATH_ENV)
        .with_context(|| format!("no --pr given and {} is not set", EVENT_PATH_ENV))?;
    Ok(PullRequestSource::EventFile(PathBuf::from(path)))
}

/// Run the validation; `Ok(true)` when the pull request passed.
fn run(cli: &Cli) -> Result<bool> {
    let service = ConfigService::load(&cli.config_dir)
        .with_context(|| format!("failed to load configuration from {}", cli.config_dir.display()))?;
    let token = service.github_token(|name| std::env::var(name).ok());
    if token.is_none() {
        info!("no GitHub token configured; using unauthenticated requests");
    }
    let config = service.into_config();

    let remote = GitHubRemote::new(&config.hub_repository_name, &config.baseline_branch, token)
        .context("failed to build GitHub client")?;
    let source = pull_request_source(cli.pr)?;
    let mut validation = build_pull_request_run(config, Arc::new(remote), source)
        .context("failed to prepare validation run")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = runtime
        .block_on(validation.run())
        .context("validation run aborted")?;

    info!(
        success = outcome.success,
        executed_steps = outcome.executed_steps,
        skipped_at = outcome.skipped_at.as_deref().unwrap_or("-"),
        "validation finished"
    );
    Ok(outcome.success)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("pull request validation found errors");
            ExitCode::from(1)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "fatal error");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
