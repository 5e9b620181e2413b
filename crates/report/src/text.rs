//! Narrative reports: a full summary and a short presentation blurb

use std::fmt::{self, Write};

use common::models::UserStatistics;

/// Bullet lines kept on the presentation slide
pub const MAX_PRESENTATION_BULLETS: usize = 4;

/// Calendar years from the first activity up to `current_year`, inclusive
pub fn years_active(stats: &UserStatistics, current_year: i32) -> i32 {
    if stats.first_activity_year == 0 {
        0
    } else {
        (current_year - stats.first_activity_year + 1).max(1)
    }
}

pub fn render_summary(stats: &UserStatistics, current_year: i32) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_summary(&mut out, stats, current_year);
    out
}

pub fn render_presentation(stats: &UserStatistics, current_year: i32) -> String {
    let mut out = String::new();
    let _ = write_presentation(&mut out, stats, current_year);
    out
}

fn write_summary<W: Write>(out: &mut W, stats: &UserStatistics, current_year: i32) -> fmt::Result {
    let years = years_active(stats, current_year);

    writeln!(out, "=== GitHub activity for {} ===\n", stats.user.login)?;

    writeln!(out, "By the numbers")?;
    writeln!(out, "- {} commits over {} years", stats.total_commits, years)?;
    writeln!(
        out,
        "- {} pull requests created, {} merged",
        stats.total_pr_created, stats.total_pr_merged
    )?;
    writeln!(out, "- {} issues opened", stats.total_issues)?;
    writeln!(out, "- {} pull request reviews", stats.total_reviews)?;
    writeln!(
        out,
        "- {} lines added, {} lines deleted\n",
        stats.total_additions, stats.total_deletions
    )?;

    writeln!(out, "Characteristics")?;
    if stats.total_reviews > stats.total_pr_created {
        writeln!(out, "- Active reviewer, a major contributor to team code quality")?;
    }
    if stats.pr_to_review_ratio > 1.0 {
        writeln!(out, "- Reviews more pull requests than they open, a mentoring role")?;
    }
    if !stats.long_term_repositories.is_empty() {
        writeln!(
            out,
            "- Involved in {} repositories for over a year",
            stats.long_term_repositories.len()
        )?;
    }
    if stats.peak_activity_commits > 0 {
        writeln!(
            out,
            "- Most active in {} with {} commits",
            stats.peak_activity_year, stats.peak_activity_commits
        )?;
    }

    writeln!(out, "\nRole transitions")?;
    for point in &stats.role_transition {
        if point.pr_created > 0 || point.review_count > 0 {
            writeln!(
                out,
                "- {}: {} (PRs: {}, reviews: {})",
                point.year, point.description, point.pr_created, point.review_count
            )?;
        }
    }

    writeln!(out, "\nTop repositories")?;
    for (i, repo) in stats.top_repositories.iter().enumerate() {
        writeln!(out, "{}. {}: {} commits", i + 1, repo.repository, repo.commit_count)?;
    }

    if !stats.long_term_repositories.is_empty() {
        writeln!(out, "\nLong-term repositories")?;
        for repo in &stats.long_term_repositories {
            writeln!(
                out,
                "- {}: {} days (first: {}, last: {})",
                repo.repository,
                repo.tenure_days(),
                repo.first_activity.format("%Y-%m-%d"),
                repo.last_activity.format("%Y-%m-%d")
            )?;
        }
    }

    Ok(())
}

fn write_presentation<W: Write>(
    out: &mut W,
    stats: &UserStatistics,
    current_year: i32,
) -> fmt::Result {
    let mut bullets = vec![format!(
        "- {} commits over {} years",
        stats.total_commits,
        years_active(stats, current_year)
    )];
    if stats.total_pr_created > 0 {
        bullets.push(format!(
            "- {} pull requests created, {} merged",
            stats.total_pr_created, stats.total_pr_merged
        ));
    }
    if stats.total_reviews > 0 {
        bullets.push(format!(
            "- {} pull request reviews raising the team's quality bar",
            stats.total_reviews
        ));
    }
    if stats.total_additions > 0 || stats.total_deletions > 0 {
        bullets.push(format!(
            "- {} lines added and {} deleted",
            stats.total_additions, stats.total_deletions
        ));
    }
    if !stats.long_term_repositories.is_empty() {
        bullets.push(format!(
            "- Sustained contributions to {} long-term repositories",
            stats.long_term_repositories.len()
        ));
    }
    bullets.truncate(MAX_PRESENTATION_BULLETS);

    writeln!(out, "=== Presentation notes for {} ===\n", stats.user.login)?;
    writeln!(out, "Slide summary\n")?;
    for bullet in &bullets {
        writeln!(out, "{}", bullet)?;
    }

    writeln!(out, "\nSupplementary")?;
    writeln!(
        out,
        "- Most active year: {} ({} commits)",
        stats.peak_activity_year, stats.peak_activity_commits
    )?;
    if let Some(top) = stats.top_repositories.first() {
        writeln!(
            out,
            "- Top repository: {} ({} commits)",
            top.repository, top.commit_count
        )?;
    }

    Ok(())
}
