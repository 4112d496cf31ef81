use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ExperimentError> = std::result::Result<T, E>;

#[derive(Error, Debug, Diagnostic)]
pub enum ExperimentError {
    #[error("Session aborted by the operator")]
    #[diagnostic(
        code(cogbat::aborted),
        help("Tasks finished before the abort key was pressed are already saved")
    )]
    Aborted,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] cogbat_export::ExportError),

    #[error("Display failed: {0}")]
    #[diagnostic(code(cogbat::display))]
    Display(String),

    #[error("Stimulus asset {path} could not be loaded: {reason}")]
    #[diagnostic(
        code(cogbat::asset),
        help("Check general.assets in the battery config")
    )]
    Asset { path: PathBuf, reason: String },

    #[error("Trial {index} of block {block} ended without a response phase")]
    #[diagnostic(code(cogbat::sequence))]
    IncompleteTrial { block: usize, index: usize },
}

impl ExperimentError {
    pub fn is_abort(&self) -> bool {
        matches!(self, ExperimentError::Aborted)
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    #[diagnostic(code(cogbat::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    #[diagnostic(
        code(cogbat::config::parse),
        help("Run `cognitive-battery init-config` to write a file with every default")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file {path}")]
    #[diagnostic(code(cogbat::config::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config")]
    #[diagnostic(code(cogbat::config::serialize))]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid setting {field}: {reason}")]
    #[diagnostic(code(cogbat::config::invalid))]
    Invalid { field: &'static str, reason: String },

    #[error("Unknown task '{0}'")]
    #[diagnostic(
        code(cogbat::config::unknown_task),
        help("Run `cognitive-battery tasks` to list the available tasks")
    )]
    UnknownTask(String),
}
