//! Flat tabular report: a metric/value block followed by a per-year table

use common::models::UserStatistics;

const YEARLY_HEADER: [&str; 8] = [
    "Year",
    "Commits",
    "PR Created",
    "PR Merged",
    "Issues",
    "Reviews",
    "Additions",
    "Deletions",
];

pub fn render_csv(stats: &UserStatistics) -> String {
    let mut out = String::new();

    push_row(&mut out, &["Metric", "Value"]);
    let metrics = [
        ("Total Commits", stats.total_commits.to_string()),
        ("Total PR Created", stats.total_pr_created.to_string()),
        ("Total PR Merged", stats.total_pr_merged.to_string()),
        ("Total Issues", stats.total_issues.to_string()),
        ("Total Reviews", stats.total_reviews.to_string()),
        ("Total Additions", stats.total_additions.to_string()),
        ("Total Deletions", stats.total_deletions.to_string()),
        ("First Activity Year", stats.first_activity_year.to_string()),
        ("Peak Activity Year", stats.peak_activity_year.to_string()),
        ("Peak Activity Commits", stats.peak_activity_commits.to_string()),
        ("PR to Review Ratio", format!("{:.2}", stats.pr_to_review_ratio)),
    ];
    for (metric, value) in &metrics {
        push_row(&mut out, &[*metric, value.as_str()]);
    }

    push_row(&mut out, &["", ""]);
    push_row(&mut out, &["Yearly Statistics", ""]);
    push_row(&mut out, &YEARLY_HEADER);

    for (year, yearly) in &stats.yearly_stats {
        let row = [
            year.to_string(),
            yearly.commit_count.to_string(),
            yearly.pr_created.to_string(),
            yearly.pr_merged.to_string(),
            yearly.issue_count.to_string(),
            yearly.review_count.to_string(),
            yearly.total_additions.to_string(),
            yearly.total_deletions.to_string(),
        ];
        let fields: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&mut out, &fields);
    }

    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    let escaped: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
