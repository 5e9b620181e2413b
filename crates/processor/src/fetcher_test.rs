#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Utc};
    use common::models::ActivityKind;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::fetcher::{ActivityFetcher, FetchError};
    use crate::pagination::ContributionWindow;
    use crate::tests::transport::*;

    #[tokio::test]
    async fn test_nested_pagination_follows_each_repository() {
        let transport = ScriptedTransport::new(|req| match cursor(req) {
            None => data(contributions(vec![
                repo_contributions(
                    "o/busy",
                    &["2020-01-10T00:00:00Z", "2020-01-11T00:00:00Z"],
                    Some("busy-1"),
                ),
                repo_contributions("o/quiet", &["2020-05-01T00:00:00Z"], None),
            ])),
            Some("busy-1") => data(contributions(vec![
                repo_contributions("o/busy", &["2020-02-10T00:00:00Z"], Some("busy-2")),
                // other repositories in a continuation response are ignored
                repo_contributions("o/quiet", &["2020-05-01T00:00:00Z"], None),
            ])),
            Some("busy-2") => data(contributions(vec![repo_contributions(
                "o/busy",
                &["2020-03-10T00:00:00Z"],
                None,
            )])),
            Some(other) => panic!("unexpected cursor {other}"),
        });
        let fetcher = fetcher(transport.clone());

        let commits = fetcher
            .fetch_commits("octocat", &CancellationToken::new())
            .await
            .unwrap();

        let busy = commits.iter().filter(|c| c.repository == "o/busy").count();
        let quiet = commits.iter().filter(|c| c.repository == "o/quiet").count();
        assert_eq!(busy, 4);
        assert_eq!(quiet, 1);
        assert!(commits.iter().all(|c| c.kind == ActivityKind::Commit));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_continuation_keeps_other_repositories() {
        let transport = ScriptedTransport::new(|req| match cursor(req) {
            None => data(contributions(vec![
                repo_contributions("o/broken", &["2020-01-10T00:00:00Z"], Some("b1")),
                repo_contributions(
                    "o/fine",
                    &["2020-06-01T00:00:00Z", "2020-07-01T00:00:00Z"],
                    None,
                ),
            ])),
            Some(_) => graphql_error("Something went wrong while executing your query"),
        });
        let fetcher = fetcher(transport);

        let reviews = fetcher
            .fetch_reviews("octocat", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews.iter().filter(|r| r.repository == "o/fine").count(), 2);
        assert!(reviews.iter().all(|r| r.is_review));
    }

    #[tokio::test]
    async fn test_repository_missing_from_continuation_stops_it() {
        let transport = ScriptedTransport::new(|req| match cursor(req) {
            None => data(contributions(vec![repo_contributions(
                "o/gone",
                &["2020-01-10T00:00:00Z"],
                Some("g1"),
            )])),
            Some(_) => data(contributions(vec![repo_contributions(
                "o/other",
                &["2020-02-10T00:00:00Z"],
                Some("o1"),
            )])),
        });
        let fetcher = fetcher(transport.clone());

        let commits = fetcher
            .fetch_commits("octocat", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_during_continuation_is_not_swallowed() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let transport = ScriptedTransport::new(move |req| match cursor(req) {
            None => data(contributions(vec![repo_contributions(
                "o/r",
                &["2020-01-10T00:00:00Z"],
                Some("c1"),
            )])),
            Some(_) => {
                trigger.cancel();
                data(contributions(vec![repo_contributions(
                    "o/r",
                    &["2020-01-11T00:00:00Z"],
                    Some("c2"),
                )]))
            }
        });
        let fetcher = fetcher(transport.clone());

        let result = fetcher.fetch_commits("octocat", &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_contribution_queries_carry_window() {
        let transport = ScriptedTransport::new(|_| data(contributions(vec![])));
        let fetcher = fetcher(transport.clone());

        fetcher
            .fetch_commits("octocat", &CancellationToken::new())
            .await
            .unwrap();

        let calls = transport.calls_to("CommitContributions");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].variables["login"], "octocat");
        assert_eq!(calls[0].variables["from"], json!(window_2020().from));
        assert_eq!(calls[0].variables["to"], json!(window_2020().to));
        assert_eq!(calls[0].variables["after"], json!(null));
    }

    #[tokio::test]
    async fn test_multi_year_window_is_sliced() {
        let transport = ScriptedTransport::new(|_| data(contributions(vec![])));
        let window = ContributionWindow::since_year(
            2018,
            Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap(),
        );
        let fetcher = ActivityFetcher::new(client(transport.clone()), window);

        fetcher
            .fetch_reviews("octocat", &CancellationToken::new())
            .await
            .unwrap();

        let calls = transport.calls_to("ReviewContributions");
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].variables["from"], json!(window.from));
        assert_eq!(calls[2].variables["to"], json!(window.to));
    }

    #[tokio::test]
    async fn test_flat_pagination_pull_requests() {
        let transport = ScriptedTransport::new(|req| {
            let pr = |created: &str, merged: Option<&str>, additions: u64| {
                json!({
                    "createdAt": created,
                    "mergedAt": merged,
                    "additions": additions,
                    "deletions": 1,
                    "repository": { "nameWithOwner": "o/r" }
                })
            };
            match cursor(req) {
                None => data(user_connection(
                    "pullRequests",
                    vec![
                        pr("2019-01-01T00:00:00Z", Some("2019-01-02T00:00:00Z"), 10),
                        serde_json::Value::Null,
                    ],
                    Some("p1"),
                )),
                Some("p1") => data(user_connection(
                    "pullRequests",
                    vec![pr("2020-01-01T00:00:00Z", None, 5)],
                    None,
                )),
                Some(other) => panic!("unexpected cursor {other}"),
            }
        });
        let fetcher = fetcher(transport.clone());

        let prs = fetcher
            .fetch_pull_requests("octocat", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(prs.len(), 2);
        assert!(prs[0].is_merged);
        assert_eq!(prs[0].additions, 10);
        assert!(!prs[1].is_merged);
        assert_eq!(prs[1].occurred_at.year(), 2020);
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.calls()[1].variables["after"], "p1");
    }

    #[tokio::test]
    async fn test_repository_listing_filters_private() {
        let transport = ScriptedTransport::new(|_| {
            data(user_connection(
                "repositories",
                vec![
                    json!({ "nameWithOwner": "o/public", "isPrivate": false }),
                    json!({ "nameWithOwner": "o/secret", "isPrivate": true }),
                ],
                None,
            ))
        });
        let fetcher = fetcher(transport);
        let cancel = CancellationToken::new();

        let public = fetcher
            .fetch_user_repositories("octocat", false, &cancel)
            .await
            .unwrap();
        let all = fetcher
            .fetch_user_repositories("octocat", true, &cancel)
            .await
            .unwrap();

        assert_eq!(public, vec!["o/public".to_string()]);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let transport = ScriptedTransport::new(|_| {
            Ok(json!({
                "data": { "user": null },
                "errors": [{
                    "type": "NOT_FOUND",
                    "message": "Could not resolve to a User with the login of 'ghost'."
                }]
            }))
        });
        let fetcher = fetcher(transport.clone());

        let result = fetcher
            .fetch_all_user_activity("ghost", false, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(FetchError::UserNotFound(login)) if login == "ghost"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_user_activity() {
        let transport = ScriptedTransport::new(quiet_user_response);
        let fetcher = fetcher(transport);

        let activity = fetcher
            .fetch_all_user_activity("octocat", false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(activity.user.login, "octocat");
        assert_eq!(activity.user.name.as_deref(), Some("Test User"));
        assert_eq!(activity.commits.len(), 2);
        assert_eq!(activity.pull_requests.len(), 1);
        assert!(activity.issues.is_empty());
        assert!(activity.reviews.is_empty());
        assert_eq!(activity.repositories, vec!["octocat/app".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_category_fails_the_user() {
        let transport = ScriptedTransport::new(|req| {
            if is(req, "UserIssues") {
                graphql_error("Timeout on issues")
            } else {
                quiet_user_response(req)
            }
        });
        let fetcher = fetcher(transport);

        let err = fetcher
            .fetch_all_user_activity("octocat", false, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            FetchError::Query { what, source } => {
                assert_eq!(what, "issues");
                assert!(source.to_string().contains("Timeout on issues"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_nothing() {
        let transport = ScriptedTransport::new(quiet_user_response);
        let fetcher = fetcher(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetcher.fetch_all_user_activity("octocat", false, &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_organization_members() {
        let transport = ScriptedTransport::new(|req| {
            let members = |logins: &[&str]| -> Vec<serde_json::Value> {
                logins.iter().map(|l| json!({ "login": l })).collect()
            };
            let page = match cursor(req) {
                None => connection(members(&["alice", "bob"]), Some("m1")),
                Some(_) => connection(members(&["carol"]), None),
            };
            data(json!({ "organization": { "membersWithRole": page } }))
        });
        let fetcher = fetcher(transport);

        let members = fetcher
            .fetch_organization_members("acme", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(members, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_unknown_organization() {
        let transport = ScriptedTransport::new(|_| data(json!({ "organization": null })));
        let fetcher = fetcher(transport);

        let result = fetcher
            .fetch_organization_members("nope", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(FetchError::OrganizationNotFound(org)) if org == "nope"));
    }
}
