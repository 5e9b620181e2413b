//! github-activity: fetch users' GitHub history and write statistics reports

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use github::GitHubClient;
use processor::{
    ActivityFetcher, BatchCoordinator, ContributionWindow, CoordinatorConfig, StatisticsCalculator,
};
use report::ReportWriter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod args;

use args::{dedupe, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cli=info".parse()?)
                .add_directive("processor=info".parse()?)
                .add_directive("github=info".parse()?)
                .add_directive("report=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = common::Config::from_env();

    let token = config
        .github_token
        .clone()
        .ok_or_else(|| common::Error::Config("GITHUB_TOKEN is not set".to_string()))?;

    let client = Arc::new(GitHubClient::new(
        config.graphql_url.clone(),
        Some(token),
        config.requests_per_hour,
    ));
    let window = ContributionWindow::since_year(config.history_start_year, Utc::now());
    let fetcher = Arc::new(ActivityFetcher::new(client.clone(), window));

    let cancel = CancellationToken::new();
    spawn_shutdown_triggers(cancel.clone(), config.timeout_minutes);

    let usernames = resolve_usernames(&args, &fetcher, &cancel).await?;
    info!(
        "📊 Analyzing {} users ({} to {})",
        usernames.len(),
        window.from.format("%Y-%m-%d"),
        window.to.format("%Y-%m-%d")
    );

    let coordinator = BatchCoordinator::new(
        fetcher,
        StatisticsCalculator::new(),
        CoordinatorConfig {
            max_concurrent_users: config.max_concurrent_users,
            include_private: args.private,
        },
    );
    let outcome = coordinator.run(&usernames, &cancel).await;

    let writer = ReportWriter::new(&args.output);
    for stats in &outcome.succeeded {
        if let Err(e) = writer.write_user(stats) {
            error!("Failed to write reports for {}: {}", stats.user.login, e);
        }
    }
    if !outcome.succeeded.is_empty() {
        writer
            .write_combined(&outcome.succeeded)
            .context("writing combined report")?;
    }

    for failure in &outcome.failed {
        error!("❌ {}: {}", failure.username, failure.error);
    }

    if !cancel.is_cancelled() {
        if let Err(e) = client.rate_limit_status(&cancel).await {
            warn!("Could not read rate limit status: {}", e);
        }
    }

    info!(
        "✅ Done: {} succeeded, {} failed, reports in {}",
        outcome.succeeded.len(),
        outcome.failed.len(),
        writer.output_dir().display()
    );

    if outcome.succeeded.is_empty() && !outcome.failed.is_empty() {
        anyhow::bail!("every user failed");
    }
    Ok(())
}

/// Users from `--users`, or the members of `--org`
async fn resolve_usernames(
    args: &Args,
    fetcher: &ActivityFetcher,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<String>> {
    if let Some(org) = &args.org {
        let members = fetcher
            .fetch_organization_members(org, cancel)
            .await
            .with_context(|| format!("listing members of {}", org))?;
        let members = dedupe(members.iter().map(String::as_str));
        if members.is_empty() {
            let message = format!("organization {} has no members", org);
            return Err(common::Error::Config(message).into());
        }
        info!("Organization {} has {} members", org, members.len());
        return Ok(members);
    }

    let usernames = args.usernames();
    if usernames.is_empty() {
        return Err(common::Error::Config("pass --users or --org".to_string()).into());
    }
    Ok(usernames)
}

/// Cancel all work on the run timeout or Ctrl-C, whichever comes first
fn spawn_shutdown_triggers(cancel: CancellationToken, timeout_minutes: u64) {
    let timeout = Duration::from_secs(timeout_minutes * 60);
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                warn!("Run timed out after {} minutes, cancelling", timeout_minutes);
                cancel.cancel();
            }
            Ok(()) = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });
}
