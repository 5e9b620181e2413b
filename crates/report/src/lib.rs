//! Render [`UserStatistics`](common::models::UserStatistics) as JSON, CSV and text reports

pub mod csv;
pub mod json;
pub mod text;
pub mod writer;

pub use writer::ReportWriter;
