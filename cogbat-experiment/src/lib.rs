pub mod battery;
pub mod block;
pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod recorder;
pub mod screen;
pub mod sequencer;
pub mod session;
pub mod simulate;
pub mod tasks;

pub use battery::{Battery, BatteryReport, TaskKind, parse_task_list};
pub use block::{Block, build_block};
pub use clock::StimulusClock;
pub use config::{AbortKey, BatteryConfig, BlockOrder};
pub use error::{ConfigError, ExperimentError, Result};
pub use input::InputSampler;
pub use recorder::ResultRecorder;
pub use screen::{Frontend, Screen};
pub use sequencer::{
    Countdown, EntryEcho, Frame, Outcome, Paradigm, ResponseMode, ResponseWindow, Tabulate,
    collect_response, run_trial, self_correcting_iti,
};
pub use session::{CONTINUE_PROMPT, SessionController, instruction_page};
pub use simulate::{HeadlessFrontend, MonkeyParticipant, Participant, ScriptedParticipant, Step};
