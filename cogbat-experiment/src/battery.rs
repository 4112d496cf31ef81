//! Runs the selected tasks back to back and saves each sheet as soon as
//! its task finishes.

use crate::clock::StimulusClock;
use crate::config::BatteryConfig;
use crate::error::{ConfigError, Result};
use crate::screen::Frontend;
use crate::session::SessionController;
use crate::tasks::{self, gate};
use cogbat_core::{SessionTable, WHITE};
use cogbat_export::{SubjectInfo, Workbook};
use cogbat_timing::Timer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Ant,
    DigitSpan,
    Flanker,
    Mrt,
    Ravens,
    Sternberg,
    Sart,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        Self::Ant,
        Self::DigitSpan,
        Self::Flanker,
        Self::Mrt,
        Self::Ravens,
        Self::Sternberg,
        Self::Sart,
    ];

    /// Name used on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ant => "ant",
            Self::DigitSpan => "digit-span",
            Self::Flanker => "flanker",
            Self::Mrt => "mrt",
            Self::Ravens => "ravens",
            Self::Sternberg => "sternberg",
            Self::Sart => "sart",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Ant => "Attention Network Test (ANT)",
            Self::DigitSpan => "Digit Span (backwards)",
            Self::Flanker => "Eriksen Flanker Task",
            Self::Mrt => "Mental Rotation Task",
            Self::Ravens => "Raven's Progressive Matrices",
            Self::Sternberg => "Sternberg Task",
            Self::Sart => "Sustained Attention to Response Task (SART)",
        }
    }

    /// Sheet the task's table is saved under.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Ant => "ANT",
            Self::DigitSpan => "Digit span (backwards)",
            Self::Flanker => "Eriksen Flanker",
            Self::Mrt => "MRT",
            Self::Ravens => "Ravens Matrices",
            Self::Sternberg => "Sternberg",
            Self::Sart => "SART",
        }
    }

    pub fn run<F, T>(&self, ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
    where
        F: Frontend + ?Sized,
        T: Timer,
    {
        match self {
            Self::Ant => tasks::ant::run(ctl),
            Self::DigitSpan => tasks::digit_span::run(ctl),
            Self::Flanker => tasks::flanker::run(ctl),
            Self::Mrt => tasks::mrt::run(ctl),
            Self::Ravens => tasks::ravens::run(ctl),
            Self::Sternberg => tasks::sternberg::run(ctl),
            Self::Sart => tasks::sart::run(ctl),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TaskKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Ok(match norm.as_str() {
            "ant" => Self::Ant,
            "digit-span" | "digitspan" => Self::DigitSpan,
            "flanker" => Self::Flanker,
            "mrt" => Self::Mrt,
            "ravens" => Self::Ravens,
            "sternberg" => Self::Sternberg,
            "sart" => Self::Sart,
            _ => return Err(ConfigError::UnknownTask(s.to_string())),
        })
    }
}

/// Comma separated task list in run order.
pub fn parse_task_list(raw: &str) -> std::result::Result<Vec<TaskKind>, ConfigError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(TaskKind::from_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryReport {
    pub workbook: PathBuf,
    /// Tasks in the order they ran, with recorded row counts.
    pub completed: Vec<(TaskKind, usize)>,
}

pub struct Battery {
    config: BatteryConfig,
    tasks: Vec<TaskKind>,
    random_order: bool,
}

impl Battery {
    /// Checks the config and task list before any window opens.
    pub fn new(config: BatteryConfig, tasks: Vec<TaskKind>) -> Result<Self> {
        config.validate()?;
        if tasks.is_empty() {
            return Err(ConfigError::Invalid {
                field: "tasks",
                reason: "no tasks selected".into(),
            }
            .into());
        }
        Ok(Self {
            config,
            tasks,
            random_order: false,
        })
    }

    pub fn random_order(mut self, random: bool) -> Self {
        self.random_order = random;
        self
    }

    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    /// Runs every task in order. Each sheet is on disk before the next task
    /// starts, so an abort keeps everything already finished.
    pub fn run<F, T>(&self, frontend: &mut F, timer: T, mut subject: SubjectInfo) -> Result<BatteryReport>
    where
        F: Frontend + ?Sized,
        T: Timer,
    {
        let mut rng = match self.config.general.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut order = self.tasks.clone();
        if self.random_order {
            order.shuffle(&mut rng);
        }
        subject.tasks = order.iter().map(|t| t.title().to_string()).collect();

        let mut workbook = Workbook::create(&self.config.general.data_dir, &subject)?;
        tracing::info!(
            subject = %subject.sub_num,
            condition = %subject.condition,
            tasks = ?order.iter().map(TaskKind::key).collect::<Vec<_>>(),
            "battery start"
        );

        let clock = StimulusClock::new(timer, self.config.poll_interval());
        let mut ctl = SessionController::new(frontend, clock, rng, &self.config);
        let mut completed = Vec::with_capacity(order.len());
        for task in order {
            tracing::info!(task = task.key(), "task start");
            let table = task.run(&mut ctl)?;
            workbook.append_sheet(&table)?;
            tracing::info!(task = task.key(), rows = table.len(), "task complete");
            completed.push((task, table.len()));
        }

        gate(&mut ctl, WHITE, "End of Experiment")?;
        Ok(BatteryReport {
            workbook: workbook.dir().to_path_buf(),
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn task_names_parse_loosely() {
        assert_eq!("ANT".parse::<TaskKind>().unwrap(), TaskKind::Ant);
        assert_eq!("digitspan".parse::<TaskKind>().unwrap(), TaskKind::DigitSpan);
        assert_eq!("digit_span".parse::<TaskKind>().unwrap(), TaskKind::DigitSpan);
        assert!(matches!(
            "stroop".parse::<TaskKind>(),
            Err(ConfigError::UnknownTask(name)) if name == "stroop"
        ));
    }

    #[test]
    fn task_list_keeps_operator_order() {
        assert_eq!(
            parse_task_list("sart, ant,,flanker").unwrap(),
            vec![TaskKind::Sart, TaskKind::Ant, TaskKind::Flanker]
        );
    }

    #[test]
    fn sheet_names_are_distinct() {
        let mut names: Vec<&str> = TaskKind::ALL.iter().map(TaskKind::sheet_name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TaskKind::ALL.len());
    }

    #[test]
    fn empty_task_list_is_rejected() {
        assert!(Battery::new(BatteryConfig::default(), Vec::new()).is_err());
    }
}
