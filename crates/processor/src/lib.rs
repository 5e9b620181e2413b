//! Activity fetching, statistics aggregation and batch coordination

pub mod coordinator;
pub mod fetcher;
pub mod pagination;
pub mod roles;
pub mod statistics;

pub use coordinator::{BatchCoordinator, BatchOutcome, CoordinatorConfig, UserFailure};
pub use fetcher::{ActivityFetcher, FetchError};
pub use pagination::ContributionWindow;
pub use statistics::StatisticsCalculator;

#[cfg(test)]
mod fetcher_test;
