//! Write report files into an output directory

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use common::models::UserStatistics;
use common::Result;
use tracing::{debug, info};

use crate::csv::render_csv;
use crate::json::{render_combined, render_json};
use crate::text::{render_presentation, render_summary};

pub const COMBINED_FILE_NAME: &str = "combined_statistics.json";

pub struct ReportWriter {
    output_dir: PathBuf,
    current_year: i32,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            current_year: Utc::now().year(),
        }
    }

    /// Year used for "years active" figures
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write JSON, CSV, summary and presentation files for one user
    pub fn write_user(&self, stats: &UserStatistics) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;
        let login = &stats.user.login;

        let files = [
            (format!("{}_statistics.json", login), render_json(stats)?),
            (format!("{}_statistics.csv", login), render_csv(stats)),
            (
                format!("{}_summary.txt", login),
                render_summary(stats, self.current_year),
            ),
            (
                format!("{}_presentation.txt", login),
                render_presentation(stats, self.current_year),
            ),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = self.output_dir.join(name);
            fs::write(&path, contents)?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }

        info!("Reports for {} written to {}", login, self.output_dir.display());
        Ok(written)
    }

    /// Write one JSON document covering every user in the batch
    pub fn write_combined(&self, all: &[UserStatistics]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(COMBINED_FILE_NAME);
        fs::write(&path, render_combined(all)?)?;
        info!("Combined report for {} users: {}", all.len(), path.display());
        Ok(path)
    }
}
