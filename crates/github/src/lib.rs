//! GitHub GraphQL access layer: rate-limited client, query documents and response types

pub mod client;
pub mod queries;
pub mod rate_limit;

pub use client::{ClientError, GitHubClient, GraphqlRequest, GraphqlTransport, HttpTransport};
pub use queries::{PageInfo, RateLimitStatus};
pub use rate_limit::RateLimiter;
pub use tokio_util::sync::CancellationToken;
