//! Per-year development-vs-review classification

use common::models::{review_ratio, RoleCategory, RoleTransitionPoint, YearlyStatistics};

/// Below this reviews-per-PR ratio a year is mostly development
pub const BALANCED_RATIO: f64 = 0.5;
/// At or above this ratio reviews outnumber created PRs
pub const REVIEW_WEIGHTED_RATIO: f64 = 1.0;
/// At or above this ratio the year is dominated by reviewing
pub const REVIEW_FOCUSED_RATIO: f64 = 2.0;

/// Classify a year by its created-PR and review counts. The first matching rule wins.
pub fn classify_role(pr_created: u64, reviews: u64) -> RoleCategory {
    let ratio = review_ratio(reviews, pr_created);

    match (pr_created, reviews) {
        (0, 0) => RoleCategory::NoActivity,
        (0, _) => RoleCategory::ReviewOnly,
        (_, 0) => RoleCategory::DevelopmentOnly,
        _ if ratio < BALANCED_RATIO => RoleCategory::DevelopmentWithReviews,
        _ if ratio < REVIEW_WEIGHTED_RATIO => RoleCategory::Balanced,
        _ if ratio < REVIEW_FOCUSED_RATIO => RoleCategory::ReviewWeighted,
        _ => RoleCategory::ReviewFocused,
    }
}

pub fn transition_point(year: &YearlyStatistics) -> RoleTransitionPoint {
    let role = classify_role(year.pr_created, year.review_count);
    RoleTransitionPoint {
        year: year.year,
        pr_created: year.pr_created,
        review_count: year.review_count,
        ratio: review_ratio(year.review_count, year.pr_created),
        role,
        description: role.description().to_string(),
    }
}
