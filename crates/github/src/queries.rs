//! GraphQL documents and the response shapes they decode into

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Page size used for every connection
pub const PAGE_SIZE: u32 = 100;

pub const USER_INFO_QUERY: &str = r#"
query UserInfo($login: String!) {
  user(login: $login) {
    login
    name
    createdAt
  }
}
"#;

pub const USER_REPOSITORIES_QUERY: &str = r#"
query UserRepositories($login: String!, $first: Int!, $after: String) {
  user(login: $login) {
    repositories(
      first: $first,
      after: $after,
      ownerAffiliations: [OWNER, COLLABORATOR, ORGANIZATION_MEMBER]
    ) {
      pageInfo { hasNextPage endCursor }
      nodes {
        nameWithOwner
        isPrivate
      }
    }
  }
}
"#;

pub const PULL_REQUESTS_QUERY: &str = r#"
query UserPullRequests($login: String!, $first: Int!, $after: String) {
  user(login: $login) {
    pullRequests(first: $first, after: $after, states: [OPEN, CLOSED, MERGED]) {
      pageInfo { hasNextPage endCursor }
      nodes {
        createdAt
        mergedAt
        additions
        deletions
        repository { nameWithOwner }
      }
    }
  }
}
"#;

pub const ISSUES_QUERY: &str = r#"
query UserIssues($login: String!, $first: Int!, $after: String) {
  user(login: $login) {
    issues(first: $first, after: $after, states: [OPEN, CLOSED]) {
      pageInfo { hasNextPage endCursor }
      nodes {
        createdAt
        repository { nameWithOwner }
      }
    }
  }
}
"#;

// Both contribution queries alias their per-repository list to `byRepository`
// so they decode into the same `ContributionsData`.

pub const COMMIT_CONTRIBUTIONS_QUERY: &str = r#"
query CommitContributions(
  $login: String!,
  $from: DateTime!,
  $to: DateTime!,
  $first: Int!,
  $after: String
) {
  user(login: $login) {
    contributionsCollection(from: $from, to: $to) {
      byRepository: commitContributionsByRepository(maxRepositories: 100) {
        repository { nameWithOwner }
        contributions(first: $first, after: $after) {
          pageInfo { hasNextPage endCursor }
          nodes { occurredAt }
        }
      }
    }
  }
}
"#;

pub const REVIEW_CONTRIBUTIONS_QUERY: &str = r#"
query ReviewContributions(
  $login: String!,
  $from: DateTime!,
  $to: DateTime!,
  $first: Int!,
  $after: String
) {
  user(login: $login) {
    contributionsCollection(from: $from, to: $to) {
      byRepository: pullRequestReviewContributionsByRepository(maxRepositories: 100) {
        repository { nameWithOwner }
        contributions(first: $first, after: $after) {
          pageInfo { hasNextPage endCursor }
          nodes { occurredAt }
        }
      }
    }
  }
}
"#;

pub const ORGANIZATION_MEMBERS_QUERY: &str = r#"
query OrganizationMembers($login: String!, $first: Int!, $after: String) {
  organization(login: $login) {
    membersWithRole(first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes { login }
    }
  }
}
"#;

pub const RATE_LIMIT_QUERY: &str = r#"
query RateLimit {
  rateLimit {
    limit
    remaining
    resetAt
  }
}
"#;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A GraphQL connection. Null entries in `nodes` are dropped by [`Connection::into_parts`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<N>>,
}

impl<N> Connection<N> {
    pub fn into_parts(self) -> (PageInfo, Vec<N>) {
        (self.page_info, self.nodes.into_iter().flatten().collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct UserInfoData {
    pub user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub login: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesData {
    pub user: Option<RepositoriesUser>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesUser {
    pub repositories: Connection<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name_with_owner: String,
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestsData {
    pub user: Option<PullRequestsUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestsUser {
    pub pull_requests: Connection<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: u64,
    pub deletions: u64,
    pub repository: RepositoryRef,
}

#[derive(Debug, Deserialize)]
pub struct IssuesData {
    pub user: Option<IssuesUser>,
}

#[derive(Debug, Deserialize)]
pub struct IssuesUser {
    pub issues: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    pub created_at: DateTime<Utc>,
    pub repository: RepositoryRef,
}

#[derive(Debug, Deserialize)]
pub struct ContributionsData {
    pub user: Option<ContributionsUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsUser {
    pub contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
    #[serde(default)]
    pub by_repository: Vec<RepositoryContributions>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryContributions {
    pub repository: RepositoryRef,
    pub contributions: Connection<ContributionNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionNode {
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationMembersData {
    pub organization: Option<OrganizationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationNode {
    pub members_with_role: Connection<MemberNode>,
}

#[derive(Debug, Deserialize)]
pub struct MemberNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitData {
    pub rate_limit: RateLimitStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}
