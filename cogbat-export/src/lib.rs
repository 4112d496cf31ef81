//! Per-subject workbooks: one CSV file per task sheet and a manifest that
//! keeps sheet order.

pub mod error;
pub mod subject;
pub mod workbook;

pub use error::{ExportError, Result};
pub use subject::SubjectInfo;
pub use workbook::{MANIFEST_FILE, Manifest, Workbook, list_workbooks, subject_exists};
