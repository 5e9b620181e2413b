//! Aggregate a user's raw activity into [`UserStatistics`]

use std::collections::HashMap;

use chrono::{Datelike, Duration};
use common::models::{
    Activity, ActivityKind, RepositoryActivity, UserActivityData, UserStatistics, YearlyStatistics,
};
use tracing::debug;

use crate::roles::transition_point;

/// Number of repositories kept in the top ranking
pub const TOP_REPOSITORY_COUNT: usize = 3;

/// Minimum first-to-last activity span for a long-term repository
pub const LONG_TERM_TENURE_DAYS: i64 = 365;

/// Pure computation over fetched activity. Identical input always gives
/// identical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsCalculator;

impl StatisticsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, data: &UserActivityData) -> UserStatistics {
        let mut stats = UserStatistics::new(data.user.clone());
        stats.visible_repository_count = data.repositories.len();

        self.calculate_basic_statistics(&mut stats, data);
        self.calculate_yearly_statistics(&mut stats, data);
        self.calculate_repository_statistics(&mut stats, data);
        self.analyze_role_transition(&mut stats);

        debug!(
            "Calculated statistics for {}: {} years, {} top repositories",
            stats.user.login,
            stats.yearly_stats.len(),
            stats.top_repositories.len()
        );
        stats
    }

    fn calculate_basic_statistics(&self, stats: &mut UserStatistics, data: &UserActivityData) {
        stats.total_commits = data.commits.len() as u64;
        stats.total_pr_created = data.pull_requests.len() as u64;
        stats.total_pr_merged = data.pull_requests.iter().filter(|pr| pr.is_merged).count() as u64;
        stats.total_issues = data.issues.len() as u64;
        stats.total_reviews = data.reviews.len() as u64;

        // Issues and reviews carry no line counts
        for activity in data.pull_requests.iter().chain(&data.commits) {
            stats.total_additions += activity.additions;
            stats.total_deletions += activity.deletions;
        }

        stats.first_activity_year = data
            .all_activities()
            .map(|a| a.occurred_at)
            .min()
            .map(|at| at.year())
            .unwrap_or(0);

        stats.calculate_pr_to_review_ratio();
    }

    fn calculate_yearly_statistics(&self, stats: &mut UserStatistics, data: &UserActivityData) {
        for activity in data.all_activities() {
            let year = activity.year();
            let entry = stats
                .yearly_stats
                .entry(year)
                .or_insert_with(|| YearlyStatistics::new(year));

            match activity.kind {
                ActivityKind::Commit => entry.commit_count += 1,
                ActivityKind::PullRequest => {
                    entry.pr_created += 1;
                    if activity.is_merged {
                        entry.pr_merged += 1;
                    }
                }
                ActivityKind::Issue => entry.issue_count += 1,
                ActivityKind::Review => entry.review_count += 1,
            }
            entry.total_additions += activity.additions;
            entry.total_deletions += activity.deletions;
        }

        // Ascending years with a strict comparison: the earliest year wins a tie
        for (year, yearly) in &stats.yearly_stats {
            if yearly.commit_count > stats.peak_activity_commits {
                stats.peak_activity_year = *year;
                stats.peak_activity_commits = yearly.commit_count;
            }
        }
    }

    fn calculate_repository_statistics(&self, stats: &mut UserStatistics, data: &UserActivityData) {
        let mut repositories = fold_repositories(data.all_activities());

        // Stable: equal commit counts keep first-encountered order
        repositories.sort_by(|a, b| b.commit_count.cmp(&a.commit_count));
        repositories.truncate(TOP_REPOSITORY_COUNT);

        // Only the top repositories are candidates for long-term
        let mut long_term: Vec<RepositoryActivity> = repositories
            .iter()
            .filter(|repo| repo.tenure() >= Duration::days(LONG_TERM_TENURE_DAYS))
            .cloned()
            .collect();
        long_term.sort_by(|a, b| b.tenure().cmp(&a.tenure()));

        stats.top_repositories = repositories;
        stats.long_term_repositories = long_term;
    }

    fn analyze_role_transition(&self, stats: &mut UserStatistics) {
        stats.role_transition = stats.yearly_stats.values().map(transition_point).collect();
    }
}

/// Fold activities per repository, in order of first appearance
pub fn fold_repositories<'a>(
    activities: impl Iterator<Item = &'a Activity>,
) -> Vec<RepositoryActivity> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut repositories: Vec<RepositoryActivity> = Vec::new();

    for activity in activities {
        match index.get(activity.repository.as_str()) {
            Some(&i) => repositories[i].record(activity),
            None => {
                index.insert(activity.repository.as_str(), repositories.len());
                repositories.push(RepositoryActivity::from_activity(activity));
            }
        }
    }

    repositories
}
