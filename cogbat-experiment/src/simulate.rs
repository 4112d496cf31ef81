//! Windowless frontend driven by a virtual clock and a simulated participant.

use crate::error::{ExperimentError, Result};
use crate::input::InputSampler;
use crate::screen::Screen;
use crate::session::CONTINUE_PROMPT;
use cogbat_core::{ImageHandle, Key, Scene, WHITE};
use cogbat_timing::{Timer, VirtualTimer};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Decides which keys to press in answer to a scene.
///
/// Asked once per input clear, i.e. at the start of every response window
/// and manual gate. Delays are measured from that moment.
pub trait Participant {
    fn react(&mut self, scene: &Scene) -> Vec<(Duration, Key)>;

    /// Asked when a screen has waited a while with nothing pending, e.g.
    /// an untimed entry after a skipped answer.
    fn nudge(&mut self, _scene: &Scene) -> Vec<(Duration, Key)> {
        Vec::new()
    }
}

/// One scripted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Press(Vec<(Duration, Key)>),
    Miss,
}

impl Step {
    pub fn key(after_ms: u64, key: Key) -> Self {
        Step::Press(vec![(Duration::from_millis(after_ms), key)])
    }

    pub fn keys(keys: &[(u64, Key)]) -> Self {
        Step::Press(
            keys.iter()
                .map(|&(ms, k)| (Duration::from_millis(ms), k))
                .collect(),
        )
    }

    /// Types `digits` 100 ms apart starting at `after_ms`, then Return.
    pub fn typed(after_ms: u64, digits: &str) -> Self {
        let mut keys: Vec<(u64, Key)> = digits
            .bytes()
            .filter(u8::is_ascii_digit)
            .enumerate()
            .map(|(i, b)| (after_ms + 100 * i as u64, Key::Digit(b - b'0')))
            .collect();
        let done = after_ms + 100 * keys.len() as u64;
        keys.push((done, Key::Return));
        Step::keys(&keys)
    }
}

/// Plays back a fixed list of answers. Continue gates are passed
/// automatically and do not consume a step.
#[derive(Debug, Clone)]
pub struct ScriptedParticipant {
    steps: VecDeque<Step>,
    gate_delay: Duration,
}

impl ScriptedParticipant {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            gate_delay: Duration::from_millis(500),
        }
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Participant for ScriptedParticipant {
    fn react(&mut self, scene: &Scene) -> Vec<(Duration, Key)> {
        if scene.contains_text(CONTINUE_PROMPT) {
            return vec![(self.gate_delay, Key::Space)];
        }
        match self.steps.pop_front() {
            Some(Step::Press(keys)) => keys,
            Some(Step::Miss) | None => Vec::new(),
        }
    }
}

const MONKEY_KEYS: [Key; 12] = [
    Key::Left,
    Key::Right,
    Key::Space,
    Key::Digit(1),
    Key::Digit(2),
    Key::Digit(3),
    Key::Digit(4),
    Key::Digit(5),
    Key::Digit(6),
    Key::Digit(7),
    Key::Digit(8),
    Key::Digit(9),
];

/// Presses random keys after random delays, occasionally not at all.
#[derive(Debug, Clone)]
pub struct MonkeyParticipant {
    rng: StdRng,
    miss_rate: f64,
}

impl MonkeyParticipant {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            miss_rate: 0.05,
        }
    }
}

impl Participant for MonkeyParticipant {
    fn react(&mut self, scene: &Scene) -> Vec<(Duration, Key)> {
        let first = self.rng.random_range(150..1200u64);
        if scene.contains_text(CONTINUE_PROMPT) {
            return vec![(Duration::from_millis(first), Key::Space)];
        }
        if self.rng.random_bool(self.miss_rate) {
            return Vec::new();
        }
        let key = MONKEY_KEYS.choose(&mut self.rng).copied().unwrap_or(Key::Space);
        // Return closes entries; Digit(1) settles any choice screen.
        vec![
            (Duration::from_millis(first), key),
            (Duration::from_millis(first + 40), Key::Return),
            (Duration::from_millis(first + 80), Key::Digit(1)),
        ]
    }

    fn nudge(&mut self, scene: &Scene) -> Vec<(Duration, Key)> {
        let saved = self.miss_rate;
        self.miss_rate = 0.0;
        let keys = self.react(scene);
        self.miss_rate = saved;
        keys
    }
}

/// Screen and keyboard stand-in for tests and `simulate` runs.
pub struct HeadlessFrontend<P> {
    timer: VirtualTimer,
    size: (u32, u32),
    participant: P,
    current: Scene,
    pending: VecDeque<(u64, Key)>,
    presented: Vec<Scene>,
    max_log: usize,
    images: Vec<PathBuf>,
    nudge_after: Duration,
    idle_limit: Duration,
    last_activity: u64,
    last_nudge: u64,
}

impl<P: Participant> HeadlessFrontend<P> {
    pub fn new(timer: VirtualTimer, size: (u32, u32), participant: P) -> Self {
        let last_activity = timer.now();
        Self {
            timer,
            size,
            participant,
            current: Scene::new(WHITE),
            pending: VecDeque::new(),
            presented: Vec::new(),
            max_log: 4096,
            images: Vec::new(),
            nudge_after: Duration::from_secs(5),
            idle_limit: Duration::from_secs(30 * 60),
            last_activity,
            last_nudge: last_activity,
        }
    }

    /// With nothing pending for this long, `poll` reports an abort so a
    /// stuck gate cannot spin forever.
    pub fn with_idle_limit(mut self, limit: Duration) -> Self {
        self.idle_limit = limit;
        self
    }

    /// Most recent presented scenes, oldest first.
    pub fn presented(&self) -> &[Scene] {
        &self.presented
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn participant(&self) -> &P {
        &self.participant
    }

    pub fn timer(&self) -> &VirtualTimer {
        &self.timer
    }
}

impl<P> HeadlessFrontend<P> {
    fn schedule(&mut self, now: u64, keys: Vec<(Duration, Key)>) {
        let mut keys: Vec<(u64, Key)> = keys
            .into_iter()
            .map(|(d, k)| (now + d.as_nanos() as u64, k))
            .collect();
        keys.sort_by_key(|(at, _)| *at);
        self.pending = keys.into();
    }
}

impl<P: Participant> Screen for HeadlessFrontend<P> {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self, scene: &Scene) -> Result<()> {
        if self.presented.len() >= self.max_log {
            self.presented.drain(..self.max_log / 2);
        }
        self.current = scene.clone();
        self.presented.push(scene.clone());
        Ok(())
    }

    fn load_image(&mut self, path: &Path) -> Result<ImageHandle> {
        if path.as_os_str().is_empty() {
            return Err(ExperimentError::Asset {
                path: path.to_path_buf(),
                reason: "empty path".into(),
            });
        }
        self.images.push(path.to_path_buf());
        Ok(ImageHandle(self.images.len() - 1))
    }
}

impl<P: Participant> InputSampler for HeadlessFrontend<P> {
    fn poll(&mut self) -> Vec<Key> {
        let now = self.timer.now();
        let mut due = Vec::new();
        while let Some(&(at, key)) = self.pending.front() {
            if at > now {
                break;
            }
            due.push(key);
            self.pending.pop_front();
        }
        if !due.is_empty() {
            self.last_activity = now;
            self.last_nudge = now;
            return due;
        }
        if !self.pending.is_empty() {
            return due;
        }
        if Duration::from_nanos(now.saturating_sub(self.last_activity)) > self.idle_limit {
            tracing::warn!(idle_s = self.idle_limit.as_secs(), "simulated participant went idle");
            due.push(Key::Abort);
        } else if Duration::from_nanos(now.saturating_sub(self.last_nudge)) > self.nudge_after {
            self.last_nudge = now;
            let keys = self.participant.nudge(&self.current);
            self.schedule(now, keys);
        }
        due
    }

    fn clear(&mut self) {
        let now = self.timer.now();
        self.pending.clear();
        self.last_activity = now;
        self.last_nudge = now;
        let keys = self.participant.react(&self.current);
        self.schedule(now, keys);
    }
}
