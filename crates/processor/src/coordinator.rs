//! Run the fetch and aggregation pipeline over a batch of users

use std::sync::Arc;

use common::models::UserStatistics;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::fetcher::{ActivityFetcher, FetchError};
use crate::statistics::StatisticsCalculator;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Users processed at the same time; the rest wait for a permit
    pub max_concurrent_users: usize,
    /// Keep private repositories at the listing stage
    pub include_private: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_users: 4,
            include_private: false,
        }
    }
}

#[derive(Debug)]
pub struct UserFailure {
    pub username: String,
    pub error: FetchError,
}

/// Results of a batch run, each list in input order
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<UserStatistics>,
    pub failed: Vec<UserFailure>,
}

pub struct BatchCoordinator {
    fetcher: Arc<ActivityFetcher>,
    calculator: StatisticsCalculator,
    config: CoordinatorConfig,
}

impl BatchCoordinator {
    pub fn new(
        fetcher: Arc<ActivityFetcher>,
        calculator: StatisticsCalculator,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            fetcher,
            calculator,
            config,
        }
    }

    /// Fetch and aggregate a single user
    pub async fn process_user(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<UserStatistics, FetchError> {
        process_user(
            &self.fetcher,
            &self.calculator,
            username,
            self.config.include_private,
            cancel,
        )
        .await
    }

    /// Process every user concurrently. A failing user never affects its siblings.
    pub async fn run(&self, usernames: &[String], cancel: &CancellationToken) -> BatchOutcome {
        info!(
            "Processing {} users (max {} at a time)",
            usernames.len(),
            self.config.max_concurrent_users
        );

        let (tx, mut rx) = mpsc::channel(usernames.len().max(1));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_users.max(1)));

        for username in usernames {
            let tx = tx.clone();
            let fetcher = self.fetcher.clone();
            let calculator = self.calculator;
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let username = username.clone();
            let include_private = self.config.include_private;

            tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };

                let result = match permit {
                    Some(_permit) => {
                        process_user(&fetcher, &calculator, &username, include_private, &cancel)
                            .await
                    }
                    None => Err(FetchError::Cancelled),
                };

                if tx.send((username, result)).await.is_err() {
                    warn!("Batch result receiver dropped");
                }
            });
        }
        drop(tx);

        let mut outcome = BatchOutcome::default();
        let mut reported = Vec::with_capacity(usernames.len());

        while let Some((username, result)) = rx.recv().await {
            match result {
                Ok(stats) => {
                    info!("Finished {}", username);
                    outcome.succeeded.push(stats);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", username, e);
                    outcome.failed.push(UserFailure {
                        username: username.clone(),
                        error: e,
                    });
                }
            }
            reported.push(username);
        }

        // A task that panicked never reports back
        for username in usernames {
            if !reported.contains(username) {
                error!("No result for {}", username);
                outcome.failed.push(UserFailure {
                    username: username.clone(),
                    error: FetchError::Incomplete,
                });
                reported.push(username.clone());
            }
        }

        let position = |login: &str| {
            usernames
                .iter()
                .position(|u| u.eq_ignore_ascii_case(login))
                .unwrap_or(usize::MAX)
        };
        outcome
            .succeeded
            .sort_by_key(|stats| position(&stats.user.login));
        outcome.failed.sort_by_key(|f| position(&f.username));

        info!(
            "Batch complete: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        outcome
    }
}

async fn process_user(
    fetcher: &ActivityFetcher,
    calculator: &StatisticsCalculator,
    username: &str,
    include_private: bool,
    cancel: &CancellationToken,
) -> Result<UserStatistics, FetchError> {
    let data = fetcher
        .fetch_all_user_activity(username, include_private, cancel)
        .await?;
    Ok(calculator.calculate(&data))
}
