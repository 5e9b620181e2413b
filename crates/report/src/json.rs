//! Structured JSON report

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::models::{RepositoryActivity, RoleTransitionPoint, UserStatistics, YearlyStatistics};
use common::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatisticsReport<'a> {
    pub user: &'a str,
    pub name: Option<&'a str>,
    pub account_created_at: DateTime<Utc>,
    pub total_commits: u64,
    pub total_pr_created: u64,
    pub total_pr_merged: u64,
    pub total_issues: u64,
    pub total_reviews: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub first_activity_year: i32,
    pub peak_activity_year: i32,
    pub peak_activity_commits: u64,
    pub pr_to_review_ratio: f64,
    pub visible_repository_count: usize,
    pub yearly_stats: &'a BTreeMap<i32, YearlyStatistics>,
    pub top_repositories: &'a [RepositoryActivity],
    pub long_term_repositories: Vec<LongTermEntry<'a>>,
    pub role_transition: &'a [RoleTransitionPoint],
}

#[derive(Debug, Serialize)]
pub struct LongTermEntry<'a> {
    pub repository: &'a str,
    pub commit_count: u64,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub duration_days: i64,
}

impl<'a> StatisticsReport<'a> {
    pub fn new(stats: &'a UserStatistics) -> Self {
        Self {
            user: &stats.user.login,
            name: stats.user.name.as_deref(),
            account_created_at: stats.user.created_at,
            total_commits: stats.total_commits,
            total_pr_created: stats.total_pr_created,
            total_pr_merged: stats.total_pr_merged,
            total_issues: stats.total_issues,
            total_reviews: stats.total_reviews,
            total_additions: stats.total_additions,
            total_deletions: stats.total_deletions,
            first_activity_year: stats.first_activity_year,
            peak_activity_year: stats.peak_activity_year,
            peak_activity_commits: stats.peak_activity_commits,
            pr_to_review_ratio: stats.pr_to_review_ratio,
            visible_repository_count: stats.visible_repository_count,
            yearly_stats: &stats.yearly_stats,
            top_repositories: &stats.top_repositories,
            long_term_repositories: stats
                .long_term_repositories
                .iter()
                .map(|repo| LongTermEntry {
                    repository: &repo.repository,
                    commit_count: repo.commit_count,
                    first_activity: repo.first_activity,
                    last_activity: repo.last_activity,
                    duration_days: repo.tenure_days(),
                })
                .collect(),
            role_transition: &stats.role_transition,
        }
    }
}

pub fn render_json(stats: &UserStatistics) -> Result<String> {
    Ok(serde_json::to_string_pretty(&StatisticsReport::new(stats))?)
}

/// One document for a whole batch, keyed by login
pub fn render_combined(all: &[UserStatistics]) -> Result<String> {
    let reports: BTreeMap<&str, StatisticsReport<'_>> = all
        .iter()
        .map(|stats| (stats.user.login.as_str(), StatisticsReport::new(stats)))
        .collect();
    Ok(serde_json::to_string_pretty(&reports)?)
}
