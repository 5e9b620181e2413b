//! Domain models

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A GitHub user whose activity is being analyzed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Commit,
    PullRequest,
    Issue,
    Review,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Commit => "commit",
            ActivityKind::PullRequest => "pull_request",
            ActivityKind::Issue => "issue",
            ActivityKind::Review => "review",
        }
    }
}

/// A single contribution.
///
/// `additions` and `deletions` are only populated for pull requests. Issues,
/// reviews and commits read from the contributions collection always carry
/// zero because the GraphQL API does not expose line counts there; a zero
/// does not mean the contribution changed nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub kind: ActivityKind,
    /// `owner/name`
    pub repository: String,
    pub occurred_at: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub is_merged: bool,
    pub is_review: bool,
}

impl Activity {
    pub fn commit(repository: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self::new(ActivityKind::Commit, repository, occurred_at)
    }

    pub fn pull_request(
        repository: impl Into<String>,
        created_at: DateTime<Utc>,
        additions: u64,
        deletions: u64,
        is_merged: bool,
    ) -> Self {
        Self {
            additions,
            deletions,
            is_merged,
            ..Self::new(ActivityKind::PullRequest, repository, created_at)
        }
    }

    pub fn issue(repository: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::new(ActivityKind::Issue, repository, created_at)
    }

    pub fn review(repository: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            is_review: true,
            ..Self::new(ActivityKind::Review, repository, occurred_at)
        }
    }

    fn new(kind: ActivityKind, repository: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            repository: repository.into(),
            occurred_at,
            additions: 0,
            deletions: 0,
            is_merged: false,
            is_review: false,
        }
    }

    /// Calendar year of the activity, always taken in UTC
    pub fn year(&self) -> i32 {
        self.occurred_at.year()
    }
}

/// Activity folded per repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryActivity {
    pub repository: String,
    pub commit_count: u64,
    pub pr_count: u64,
    pub issue_count: u64,
    pub review_count: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl RepositoryActivity {
    /// Start an aggregate from the first activity seen for a repository
    pub fn from_activity(activity: &Activity) -> Self {
        let mut repo = Self {
            repository: activity.repository.clone(),
            commit_count: 0,
            pr_count: 0,
            issue_count: 0,
            review_count: 0,
            total_additions: 0,
            total_deletions: 0,
            first_activity: activity.occurred_at,
            last_activity: activity.occurred_at,
        };
        repo.record(activity);
        repo
    }

    /// Fold one more activity in. The first/last window only ever widens.
    pub fn record(&mut self, activity: &Activity) {
        match activity.kind {
            ActivityKind::Commit => self.commit_count += 1,
            ActivityKind::PullRequest => self.pr_count += 1,
            ActivityKind::Issue => self.issue_count += 1,
            ActivityKind::Review => self.review_count += 1,
        }
        self.total_additions += activity.additions;
        self.total_deletions += activity.deletions;

        if activity.occurred_at < self.first_activity {
            self.first_activity = activity.occurred_at;
        }
        if activity.occurred_at > self.last_activity {
            self.last_activity = activity.occurred_at;
        }
    }

    pub fn tenure(&self) -> Duration {
        self.last_activity - self.first_activity
    }

    pub fn tenure_days(&self) -> i64 {
        self.tenure().num_days()
    }
}

/// Activity rolled up per calendar year
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearlyStatistics {
    pub year: i32,
    pub commit_count: u64,
    pub pr_created: u64,
    pub pr_merged: u64,
    pub issue_count: u64,
    pub review_count: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
}

impl YearlyStatistics {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }
}

/// Coarse development-vs-review balance for one year
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    NoActivity,
    ReviewOnly,
    DevelopmentOnly,
    DevelopmentWithReviews,
    Balanced,
    ReviewWeighted,
    ReviewFocused,
}

impl RoleCategory {
    pub fn description(&self) -> &'static str {
        match self {
            RoleCategory::NoActivity => "no activity",
            RoleCategory::ReviewOnly => "review-focused activity",
            RoleCategory::DevelopmentOnly => "development-focused activity",
            RoleCategory::DevelopmentWithReviews => "development-focused, some reviewing",
            RoleCategory::Balanced => "balanced development and review",
            RoleCategory::ReviewWeighted => "review-weighted activity",
            RoleCategory::ReviewFocused => "review-focused, strong quality contribution",
        }
    }
}

impl std::fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleTransitionPoint {
    pub year: i32,
    pub pr_created: u64,
    pub review_count: u64,
    /// reviews / PRs created, 0 when no PRs were created
    pub ratio: f64,
    pub role: RoleCategory,
    pub description: String,
}

/// Everything fetched for one user, grouped by category
#[derive(Debug, Clone)]
pub struct UserActivityData {
    pub user: User,
    pub commits: Vec<Activity>,
    pub pull_requests: Vec<Activity>,
    pub issues: Vec<Activity>,
    pub reviews: Vec<Activity>,
    /// Repositories visible at the listing stage after the private filter
    pub repositories: Vec<String>,
}

impl UserActivityData {
    pub fn empty(user: User) -> Self {
        Self {
            user,
            commits: Vec::new(),
            pull_requests: Vec::new(),
            issues: Vec::new(),
            reviews: Vec::new(),
            repositories: Vec::new(),
        }
    }

    /// All activities in category order: commits, PRs, issues, reviews
    pub fn all_activities(&self) -> impl Iterator<Item = &Activity> {
        self.commits
            .iter()
            .chain(&self.pull_requests)
            .chain(&self.issues)
            .chain(&self.reviews)
    }
}

/// Aggregated statistics for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStatistics {
    pub user: User,
    pub total_commits: u64,
    pub total_pr_created: u64,
    pub total_pr_merged: u64,
    pub total_issues: u64,
    pub total_reviews: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    /// 0 when the user has no activity
    pub first_activity_year: i32,
    /// 0 when no year has any commits
    pub peak_activity_year: i32,
    pub peak_activity_commits: u64,
    pub pr_to_review_ratio: f64,
    pub visible_repository_count: usize,
    pub yearly_stats: BTreeMap<i32, YearlyStatistics>,
    pub top_repositories: Vec<RepositoryActivity>,
    pub long_term_repositories: Vec<RepositoryActivity>,
    pub role_transition: Vec<RoleTransitionPoint>,
}

impl UserStatistics {
    pub fn new(user: User) -> Self {
        Self {
            user,
            total_commits: 0,
            total_pr_created: 0,
            total_pr_merged: 0,
            total_issues: 0,
            total_reviews: 0,
            total_additions: 0,
            total_deletions: 0,
            first_activity_year: 0,
            peak_activity_year: 0,
            peak_activity_commits: 0,
            pr_to_review_ratio: 0.0,
            visible_repository_count: 0,
            yearly_stats: BTreeMap::new(),
            top_repositories: Vec::new(),
            long_term_repositories: Vec::new(),
            role_transition: Vec::new(),
        }
    }

    /// reviews / PRs created; exactly 0 when no PRs were created
    pub fn calculate_pr_to_review_ratio(&mut self) {
        self.pr_to_review_ratio = review_ratio(self.total_reviews, self.total_pr_created);
    }
}

/// reviews / PRs created, defined as 0 for a zero denominator
pub fn review_ratio(reviews: u64, prs_created: u64) -> f64 {
    if prs_created == 0 {
        0.0
    } else {
        reviews as f64 / prs_created as f64
    }
}
