mod app;

use anyhow::{Context, Result};
use app::WinitFrontend;
use clap::{Args, Parser, Subcommand};
use cogbat_experiment::{
    Battery, BatteryConfig, BatteryReport, ExperimentError, HeadlessFrontend, MonkeyParticipant,
    TaskKind, parse_task_list,
};
use cogbat_export::SubjectInfo;
use cogbat_timing::{HighPrecisionTimer, VirtualTimer};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "cognitive-battery.log";
const DEFAULT_LOG_FILTER: &str = "cognitive_battery=info,cogbat_experiment=info,cogbat_export=info";

/// Exit status after the operator aborts a session.
const ABORT_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "cognitive-battery", version, about = "Timed cognitive task battery")]
struct Cli {
    /// Battery settings; defaults are used when the file does not exist
    #[arg(long, short, global = true, default_value = "battery.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a session in a window with the real clock
    Run(SessionArgs),
    /// Run a session headless on a virtual clock with a random participant
    Simulate {
        #[command(flatten)]
        session: SessionArgs,
        /// Seed for the simulated participant
        #[arg(long, default_value_t = 1)]
        participant_seed: u64,
    },
    /// Write the default settings to the config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List the available tasks
    Tasks,
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Subject number; a subject can only be run once
    #[arg(long)]
    subject: String,
    #[arg(long, default_value = "1")]
    condition: String,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    sex: Option<String>,
    /// Research assistant running the session
    #[arg(long)]
    ra: Option<String>,
    /// Comma separated tasks in run order; all tasks when omitted
    #[arg(long)]
    tasks: Option<String>,
    /// Shuffle the task order
    #[arg(long)]
    random_order: bool,
}

impl SessionArgs {
    fn subject(&self) -> SubjectInfo {
        let mut info = SubjectInfo::new(self.subject.trim(), self.condition.trim());
        info.age = self.age;
        info.sex = self.sex.clone();
        info.ra = self.ra.clone();
        info
    }

    fn battery(&self, config: BatteryConfig) -> cogbat_experiment::Result<Battery> {
        let tasks = match &self.tasks {
            Some(raw) => parse_task_list(raw)?,
            None => TaskKind::ALL.to_vec(),
        };
        Ok(Battery::new(config, tasks)?.random_order(self.random_order))
    }
}

/// Daily rolling log file under `dir`, created if missing.
fn log_appender(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .with_context(|| format!("opening log file in {}", dir.display()))
}

fn init_logging() -> Result<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let (non_blocking, guard) = tracing_appender::non_blocking(log_appender(Path::new(LOG_DIR))?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();
    Ok(guard)
}

fn run_session(cli: &Cli, session: &SessionArgs, headless_seed: Option<u64>) -> Result<BatteryReport, ExperimentError> {
    let config = BatteryConfig::load(&cli.config)?;
    let battery = session.battery(config)?;
    match headless_seed {
        Some(seed) => {
            let timer = VirtualTimer::new();
            let size = (battery.config().general.width, battery.config().general.height);
            let mut frontend = HeadlessFrontend::new(timer.clone(), size, MonkeyParticipant::new(seed));
            let report = battery.run(&mut frontend, timer.clone(), session.subject())?;
            tracing::info!(simulated_ms = timer.now_ms(), "simulation finished");
            Ok(report)
        }
        None => {
            let mut frontend =
                WinitFrontend::open(&battery.config().general).map_err(|e| ExperimentError::Display(format!("{e:#}")))?;
            battery.run(&mut frontend, HighPrecisionTimer::new(), session.subject())
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let (session, headless_seed) = match &cli.command {
        Command::Tasks => {
            for task in TaskKind::ALL {
                println!("{:<12} {}", task.key(), task.title());
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::InitConfig { force } => {
            if cli.config.exists() && !force {
                anyhow::bail!("{} already exists; pass --force to overwrite", cli.config.display());
            }
            BatteryConfig::default()
                .save(&cli.config)
                .with_context(|| format!("writing {}", cli.config.display()))?;
            tracing::info!(path = %cli.config.display(), "default config written");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Run(session) => (session, None),
        Command::Simulate {
            session,
            participant_seed,
        } => (session, Some(*participant_seed)),
    };

    match run_session(&cli, session, headless_seed) {
        Ok(report) => {
            for (task, rows) in &report.completed {
                tracing::info!(task = task.key(), rows, "saved");
            }
            tracing::info!(workbook = %report.workbook.display(), "session complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_abort() => {
            tracing::warn!("session aborted, finished tasks are saved");
            Ok(ExitCode::from(ABORT_EXIT))
        }
        Err(e) => Err(anyhow::Error::new(e).context("battery session failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_directory_errors_are_reported() {
        let root = std::env::temp_dir().join(format!("cognitive-battery-logs-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        assert!(log_appender(&root.join("logs")).is_ok());
        assert!(root.join("logs").is_dir());

        let blocker = root.join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let err = log_appender(&blocker.join("logs")).unwrap_err();
        assert!(format!("{err:#}").contains("creating log directory"), "{err:#}");
    }
}
