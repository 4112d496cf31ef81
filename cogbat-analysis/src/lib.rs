//! Group-level summary of battery workbooks: one row per subject with
//! descriptive RT statistics, accuracy counts and treatment-coded OLS
//! slopes per task.

pub mod error;
pub mod stats;
pub mod summary;
pub mod tasks;

pub use error::{AnalysisError, Result};
pub use summary::{SUMMARY_FILE, SubjectSummary, analyze, merge, summarize_workbook, write_summary};
pub use tasks::{Group, Measures, ResponseFilter, aggregate};
