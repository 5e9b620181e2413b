//! Fetch a user's full activity history from the GraphQL API
//!
//! Pull requests, issues and repositories are flat connections walked cursor by
//! cursor. Commit and review contributions are grouped by repository, and each
//! repository paginates independently once the first page has been read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::models::{Activity, User, UserActivityData};
use github::queries::{
    Connection, ContributionsData, IssuesData, OrganizationMembersData, PullRequestsData,
    RepositoriesData, RepositoryContributions, UserInfoData, COMMIT_CONTRIBUTIONS_QUERY,
    ISSUES_QUERY, ORGANIZATION_MEMBERS_QUERY, PAGE_SIZE, PULL_REQUESTS_QUERY,
    REVIEW_CONTRIBUTIONS_QUERY, USER_INFO_QUERY, USER_REPOSITORIES_QUERY,
};
use github::{ClientError, GitHubClient};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pagination::{ContributionWindow, PageState, RepoContinuation, MAX_PAGES};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),
    #[error("Failed to fetch {what}: {source}")]
    Query {
        what: String,
        #[source]
        source: ClientError,
    },
    #[error("Cancelled")]
    Cancelled,
    #[error("Task ended without reporting a result")]
    Incomplete,
}

impl FetchError {
    fn query(what: impl Into<String>, source: ClientError) -> Self {
        if source.is_cancelled() {
            FetchError::Cancelled
        } else {
            FetchError::Query {
                what: what.into(),
                source,
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Contribution kinds that come back grouped by repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionCategory {
    Commits,
    Reviews,
}

impl ContributionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ContributionCategory::Commits => "commit contributions",
            ContributionCategory::Reviews => "review contributions",
        }
    }

    fn query(&self) -> &'static str {
        match self {
            ContributionCategory::Commits => COMMIT_CONTRIBUTIONS_QUERY,
            ContributionCategory::Reviews => REVIEW_CONTRIBUTIONS_QUERY,
        }
    }

    fn activity(&self, repository: &str, occurred_at: DateTime<Utc>) -> Activity {
        match self {
            ContributionCategory::Commits => Activity::commit(repository, occurred_at),
            ContributionCategory::Reviews => Activity::review(repository, occurred_at),
        }
    }
}

pub struct ActivityFetcher {
    client: Arc<GitHubClient>,
    window: ContributionWindow,
}

impl ActivityFetcher {
    pub fn new(client: Arc<GitHubClient>, window: ContributionWindow) -> Self {
        Self { client, window }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn window(&self) -> ContributionWindow {
        self.window
    }

    /// Everything needed to compute statistics for one user.
    ///
    /// The user lookup runs first so an unknown login fails fast. The listing
    /// and the four activity categories then run concurrently; the first
    /// failure aborts the rest.
    pub async fn fetch_all_user_activity(
        &self,
        username: &str,
        include_private: bool,
        cancel: &CancellationToken,
    ) -> Result<UserActivityData, FetchError> {
        let user = self.fetch_user_info(username, cancel).await?;
        info!("Fetching activity for {}", user.login);

        let (repositories, commits, pull_requests, issues, reviews) = tokio::try_join!(
            self.fetch_user_repositories(username, include_private, cancel),
            self.fetch_commits(username, cancel),
            self.fetch_pull_requests(username, cancel),
            self.fetch_issues(username, cancel),
            self.fetch_reviews(username, cancel),
        )?;

        info!(
            "Fetched {}: {} commits, {} PRs, {} issues, {} reviews across {} repositories",
            user.login,
            commits.len(),
            pull_requests.len(),
            issues.len(),
            reviews.len(),
            repositories.len()
        );

        Ok(UserActivityData {
            user,
            commits,
            pull_requests,
            issues,
            reviews,
            repositories,
        })
    }

    pub async fn fetch_user_info(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<User, FetchError> {
        let data: UserInfoData = match self
            .client
            .execute("user info", USER_INFO_QUERY, json!({ "login": username }), cancel)
            .await
        {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Err(FetchError::UserNotFound(username.to_string()))
            }
            Err(e) => return Err(FetchError::query("user info", e)),
        };

        let node = data
            .user
            .ok_or_else(|| FetchError::UserNotFound(username.to_string()))?;

        Ok(User {
            login: node.login,
            name: node.name.filter(|n| !n.is_empty()),
            created_at: node.created_at,
        })
    }

    /// Names of repositories the user owns, collaborates on or belongs to through
    /// an organization. Private ones are kept only when `include_private` is set.
    pub async fn fetch_user_repositories(
        &self,
        username: &str,
        include_private: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, FetchError> {
        let nodes = self
            .paginate(
                "repositories",
                USER_REPOSITORIES_QUERY,
                json!({ "login": username }),
                cancel,
                |data: RepositoriesData| data.user.map(|u| u.repositories),
            )
            .await?;

        Ok(nodes
            .into_iter()
            .filter(|repo| include_private || !repo.is_private)
            .map(|repo| repo.name_with_owner)
            .collect())
    }

    pub async fn fetch_pull_requests(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Activity>, FetchError> {
        let nodes = self
            .paginate(
                "pull requests",
                PULL_REQUESTS_QUERY,
                json!({ "login": username }),
                cancel,
                |data: PullRequestsData| data.user.map(|u| u.pull_requests),
            )
            .await?;

        Ok(nodes
            .into_iter()
            .map(|pr| {
                Activity::pull_request(
                    pr.repository.name_with_owner,
                    pr.created_at,
                    pr.additions,
                    pr.deletions,
                    pr.merged_at.is_some(),
                )
            })
            .collect())
    }

    pub async fn fetch_issues(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Activity>, FetchError> {
        let nodes = self
            .paginate(
                "issues",
                ISSUES_QUERY,
                json!({ "login": username }),
                cancel,
                |data: IssuesData| data.user.map(|u| u.issues),
            )
            .await?;

        Ok(nodes
            .into_iter()
            .map(|issue| Activity::issue(issue.repository.name_with_owner, issue.created_at))
            .collect())
    }

    pub async fn fetch_commits(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Activity>, FetchError> {
        self.fetch_contributions(username, ContributionCategory::Commits, cancel)
            .await
    }

    pub async fn fetch_reviews(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Activity>, FetchError> {
        self.fetch_contributions(username, ContributionCategory::Reviews, cancel)
            .await
    }

    /// Logins of all members of an organization
    pub async fn fetch_organization_members(
        &self,
        organization: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, FetchError> {
        let result = self
            .paginate(
                "organization members",
                ORGANIZATION_MEMBERS_QUERY,
                json!({ "login": organization }),
                cancel,
                |data: OrganizationMembersData| data.organization.map(|o| o.members_with_role),
            )
            .await;

        match result {
            Ok(members) => Ok(members.into_iter().map(|m| m.login).collect()),
            Err(FetchError::Query { source, .. })
                if source.is_not_found() || matches_missing(&source) =>
            {
                Err(FetchError::OrganizationNotFound(organization.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Walk a flat connection to the end. `connection` picks the connection out
    /// of the decoded `data`; `None` means the owning node was null.
    async fn paginate<D, N>(
        &self,
        what: &str,
        query: &str,
        variables: Value,
        cancel: &CancellationToken,
        connection: impl Fn(D) -> Option<Connection<N>>,
    ) -> Result<Vec<N>, FetchError>
    where
        D: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut state = PageState::start();
        let mut pages = 0u32;

        while let PageState::Fetching { after } = &state {
            let data: D = self
                .client
                .execute(what, query, page_variables(&variables, after.as_deref()), cancel)
                .await
                .map_err(|e| FetchError::query(what, e))?;

            let Some(conn) = connection(data) else {
                return Err(FetchError::query(
                    what,
                    ClientError::MissingData(what.to_string()),
                ));
            };

            let (page, nodes) = conn.into_parts();
            items.extend(nodes);
            pages += 1;
            state = PageState::next(&page);

            if pages >= MAX_PAGES && !state.is_exhausted() {
                warn!("Stopping {} after {} pages", what, pages);
                break;
            }
        }

        debug!("Fetched {} {} in {} pages", items.len(), what, pages);
        Ok(items)
    }

    async fn fetch_contributions(
        &self,
        username: &str,
        category: ContributionCategory,
        cancel: &CancellationToken,
    ) -> Result<Vec<Activity>, FetchError> {
        let mut activities = Vec::new();

        for window in self.window.slices() {
            let repositories = self
                .contributions_page(username, category, &window, None, cancel)
                .await
                .map_err(|e| FetchError::query(category.label(), e))?;

            let mut continuations = Vec::new();
            for repo in repositories {
                let name = repo.repository.name_with_owner;
                let (page, nodes) = repo.contributions.into_parts();
                activities.extend(nodes.iter().map(|n| category.activity(&name, n.occurred_at)));

                if let Some(continuation) = RepoContinuation::after_first_page(&name, &page) {
                    continuations.push(continuation);
                }
            }

            for continuation in continuations {
                let repository = continuation.repository.clone();
                match self
                    .drain_repository(username, category, &window, continuation, cancel)
                    .await
                {
                    Ok(more) => activities.extend(more),
                    Err(e) if e.is_cancelled() => return Err(FetchError::Cancelled),
                    Err(e) => warn!(
                        "Skipping remaining {} in {} for {}: {}",
                        category.label(),
                        repository,
                        username,
                        e
                    ),
                }
            }
        }

        debug!(
            "Fetched {} {} for {}",
            activities.len(),
            category.label(),
            username
        );
        Ok(activities)
    }

    /// Follow one repository's cursor until it is exhausted or the repository
    /// no longer shows up in the response.
    async fn drain_repository(
        &self,
        username: &str,
        category: ContributionCategory,
        window: &ContributionWindow,
        mut continuation: RepoContinuation,
        cancel: &CancellationToken,
    ) -> Result<Vec<Activity>, ClientError> {
        let mut activities = Vec::new();

        while let PageState::Fetching { after } = &continuation.state {
            let repositories = self
                .contributions_page(username, category, window, after.as_deref(), cancel)
                .await
                .map_err(|e| e.in_operation(format!("{} continuation", continuation.repository)))?;

            let Some(repo) = repositories
                .into_iter()
                .find(|r| r.repository.name_with_owner == continuation.repository)
            else {
                debug!(
                    "{} no longer in {} results, stopping",
                    continuation.repository,
                    category.label()
                );
                continuation.advance(None);
                break;
            };

            let (page, nodes) = repo.contributions.into_parts();
            activities.extend(
                nodes
                    .iter()
                    .map(|n| category.activity(&continuation.repository, n.occurred_at)),
            );
            if continuation.advance(Some(&page)) {
                warn!(
                    "Stopping {} {} after {} pages",
                    continuation.repository,
                    category.label(),
                    continuation.pages_fetched
                );
            }
        }

        Ok(activities)
    }

    async fn contributions_page(
        &self,
        username: &str,
        category: ContributionCategory,
        window: &ContributionWindow,
        after: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryContributions>, ClientError> {
        let variables = json!({
            "login": username,
            "from": window.from,
            "to": window.to,
            "first": PAGE_SIZE,
            "after": after,
        });

        let data: ContributionsData = self
            .client
            .execute(category.label(), category.query(), variables, cancel)
            .await?;

        let user = data
            .user
            .ok_or_else(|| ClientError::MissingData(format!("user {}", username)))?;
        Ok(user.contributions_collection.by_repository)
    }
}

fn page_variables(base: &Value, after: Option<&str>) -> Value {
    let mut variables = base.clone();
    if let Some(map) = variables.as_object_mut() {
        map.insert("first".to_string(), json!(PAGE_SIZE));
        map.insert("after".to_string(), json!(after));
    }
    variables
}

fn matches_missing(error: &ClientError) -> bool {
    match error {
        ClientError::MissingData(_) => true,
        ClientError::Query { source, .. } => matches_missing(source),
        _ => false,
    }
}
