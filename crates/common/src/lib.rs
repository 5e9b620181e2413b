//! Common types and utilities for GitHub activity statistics

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};
