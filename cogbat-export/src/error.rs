use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ExportError> = std::result::Result<T, E>;

#[derive(Error, Debug, Diagnostic)]
pub enum ExportError {
    #[error("I/O error at {path}")]
    #[diagnostic(code(cogbat::export::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed sheet file {path}")]
    #[diagnostic(code(cogbat::export::csv))]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed workbook manifest {path}")]
    #[diagnostic(code(cogbat::export::manifest))]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Subject {subject} already has a workbook at {dir}")]
    #[diagnostic(
        code(cogbat::export::subject_exists),
        help("Pick another subject number; existing data is never overwritten")
    )]
    SubjectExists { subject: String, dir: PathBuf },

    #[error("Workbook already has a sheet named '{0}'")]
    #[diagnostic(code(cogbat::export::duplicate_sheet))]
    DuplicateSheet(String),

    #[error("No sheet named '{sheet}' in {dir}")]
    #[diagnostic(code(cogbat::export::missing_sheet))]
    MissingSheet { sheet: String, dir: PathBuf },

    #[error("{0} is not a workbook directory")]
    #[diagnostic(code(cogbat::export::not_a_workbook))]
    NotAWorkbook(PathBuf),

    #[error("Subject number must not be empty")]
    #[diagnostic(code(cogbat::export::subject))]
    EmptySubject,

    #[error("Invalid {field} '{value}'")]
    #[diagnostic(
        code(cogbat::export::subject_field),
        help("Subject number and condition name a directory; '_', '/', '\\' and '..' are not allowed")
    )]
    InvalidSubjectField { field: &'static str, value: String },
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}
