//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Summarize the GitHub activity history of users or organization members
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Comma-separated GitHub logins to analyze
    #[arg(short, long, value_delimiter = ',', conflicts_with = "org")]
    pub users: Vec<String>,

    /// Analyze every member of this organization
    #[arg(long)]
    pub org: Option<String>,

    /// Directory for generated reports
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Include private repositories in the repository listing
    #[arg(long)]
    pub private: bool,
}

impl Args {
    /// Trimmed, non-empty logins in the order given, without duplicates
    pub fn usernames(&self) -> Vec<String> {
        dedupe(self.users.iter().map(String::as_str))
    }
}

pub fn dedupe<'a>(logins: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for login in logins.map(str::trim).filter(|l| !l.is_empty()) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(login)) {
            out.push(login.to_string());
        }
    }
    out
}
