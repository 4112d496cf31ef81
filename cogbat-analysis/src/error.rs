use cogbat_export::ExportError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[derive(Error, Debug, Diagnostic)]
pub enum AnalysisError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),

    #[error("Sheet '{sheet}' has no column '{column}'")]
    #[diagnostic(
        code(cogbat::analysis::missing_column),
        help("The sheet was not written by this battery version")
    )]
    MissingColumn { sheet: String, column: String },

    #[error("Sheet '{sheet}' row {row}: '{value}' in column '{column}' is not a number")]
    #[diagnostic(code(cogbat::analysis::bad_value))]
    BadValue {
        sheet: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Info sheet of subject {0} is empty")]
    #[diagnostic(code(cogbat::analysis::empty_info))]
    EmptyInfo(String),

    #[error("No workbooks found under {0}")]
    #[diagnostic(code(cogbat::analysis::no_workbooks), help("Point --data at the battery's data directory"))]
    NoWorkbooks(PathBuf),

    #[error("Failed to write summary {path}")]
    #[diagnostic(code(cogbat::analysis::csv))]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
