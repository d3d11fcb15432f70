//! Export functionality for domain_status data.
//!
//! This module provides functions to export data from the SQLite database
//! into various formats (CSV, JSONL, Parquet) for different use cases.

mod csv;
mod jsonl;
mod queries;
mod row;
mod types;

pub use csv::export_csv;
pub use jsonl::export_jsonl;
pub use types::{ExportFormat, ExportOptions};
