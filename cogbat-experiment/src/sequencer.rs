//! Drives a single trial through its phases.
//!
//! Tasks describe *what* each phase shows through [`Paradigm`]; the loop in
//! [`run_trial`] owns *when* things happen: it holds fixed frames, opens the
//! response window, scores once and paces the inter-trial interval.

use crate::clock::StimulusClock;
use crate::error::{ExperimentError, Result};
use crate::screen::Frontend;
use cogbat_core::{
    Cell, CompletedTrial, Element, Key, Phase, Position, Response, Rgba, Scene, Trial,
    TrialPhase, TrialResult,
};
use cogbat_timing::Timer;
use std::time::Duration;

/// A scene held for a fixed time.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub scene: Scene,
    pub duration: Duration,
}

impl Frame {
    pub fn new(scene: Scene, duration: Duration) -> Self {
        Self { scene, duration }
    }

    pub fn ms(scene: Scene, ms: u64) -> Self {
        Self::new(scene, Duration::from_millis(ms))
    }
}

/// Where typed digits are echoed while an entry is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEcho {
    pub size: f32,
    pub color: Rgba,
    pub at: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseMode {
    /// The first accepted key ends the window.
    FirstKey,
    /// The first accepted key is kept but the window runs to its deadline.
    FullWindow,
    /// Digits build a string, Backspace edits, Return submits. A non-empty
    /// `accept` list restricts which digits are taken.
    Entry { max_len: usize, echo: EntryEcho },
}

/// Remaining-time overlay, redrawn once per second.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    pub size: f32,
    pub color: Rgba,
    pub at: Position,
}

impl Countdown {
    pub fn label(remaining: Duration) -> String {
        let secs = remaining.as_millis().div_ceil(1000) as u64;
        format!("Time left: {:02}:{:02}", secs / 60, secs % 60)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseWindow {
    pub stimulus: Scene,
    pub accept: Vec<Key>,
    pub deadline: Option<Duration>,
    pub mode: ResponseMode,
    /// Replaces the stimulus after the given time while still collecting.
    pub offset: Option<(Duration, Scene)>,
    pub countdown: Option<Countdown>,
}

impl ResponseWindow {
    pub fn new(stimulus: Scene, accept: impl Into<Vec<Key>>) -> Self {
        Self {
            stimulus,
            accept: accept.into(),
            deadline: None,
            mode: ResponseMode::FirstKey,
            offset: None,
            countdown: None,
        }
    }

    pub fn deadline_ms(mut self, ms: u64) -> Self {
        self.deadline = Some(Duration::from_millis(ms));
        self
    }

    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn offset_ms(mut self, ms: u64, scene: Scene) -> Self {
        self.offset = Some((Duration::from_millis(ms), scene));
        self
    }

    pub fn countdown(mut self, countdown: Countdown) -> Self {
        self.countdown = Some(countdown);
        self
    }
}

/// What the response window observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub response: Option<Response>,
    pub rt_ms: Option<u64>,
    /// How long the window stayed open.
    pub elapsed_ms: u64,
}

/// Sheet layout for a task's completed trials.
pub trait Tabulate {
    type Spec: Clone;

    fn sheet_name(&self) -> &'static str;
    fn columns(&self) -> &'static [&'static str];
    /// One row for the `number`-th recorded trial (1-based).
    fn row(&self, number: usize, trial: &CompletedTrial<Self::Spec>) -> Vec<Cell>;
}

/// Task-specific content of a trial.
pub trait Paradigm: Tabulate {
    /// Fixed frames for a hold phase. An empty list skips the phase.
    /// `result` is present from `Feedback` onwards.
    fn frames(
        &self,
        phase: TrialPhase,
        trial: &Trial<Self::Spec>,
        result: Option<&TrialResult>,
    ) -> Vec<Frame>;

    fn response_window(&self, trial: &Trial<Self::Spec>) -> ResponseWindow;

    fn score(&self, trial: &Trial<Self::Spec>, response: Option<&Response>) -> bool;

    /// `None` skips the interval entirely.
    fn inter_trial_interval(&self, trial: &Trial<Self::Spec>, outcome: &Outcome) -> Option<Duration>;

    fn iti_scene(&self, trial: &Trial<Self::Spec>) -> Scene;
}

/// Rest of a fixed per-trial budget once the response and pre-response
/// phases are spent, clamped at zero.
pub fn self_correcting_iti(total: Duration, response: Duration, pre_response: Duration) -> Duration {
    total.saturating_sub(response + pre_response)
}

pub fn run_trial<P, F, T>(
    paradigm: &P,
    trial: &Trial<P::Spec>,
    frontend: &mut F,
    clock: &StimulusClock<T>,
) -> Result<TrialResult>
where
    P: Paradigm + ?Sized,
    F: Frontend + ?Sized,
    T: Timer,
{
    let mut phase = TrialPhase::default();
    let mut result: Option<TrialResult> = None;

    loop {
        tracing::trace!(phase = phase.label(), block = trial.block, index = trial.index, "phase");
        match phase {
            TrialPhase::StimulusResponse => {
                let window = paradigm.response_window(trial);
                let outcome = collect_response(frontend, clock, &window)?;
                let correct = paradigm.score(trial, outcome.response.as_ref());
                let iti = paradigm.inter_trial_interval(trial, &outcome);
                result = Some(TrialResult {
                    response: outcome.response,
                    rt_ms: outcome.rt_ms,
                    correct,
                    iti_ms: iti.map(|d| d.as_millis() as u64),
                });
            }
            TrialPhase::InterTrialInterval => {
                if let Some(ms) = result.as_ref().and_then(|r| r.iti_ms) {
                    frontend.present(&paradigm.iti_scene(trial))?;
                    clock.hold(frontend, Duration::from_millis(ms))?;
                }
            }
            TrialPhase::Done => break,
            hold_phase => {
                for frame in paradigm.frames(hold_phase, trial, result.as_ref()) {
                    frontend.present(&frame.scene)?;
                    clock.hold(frontend, frame.duration)?;
                }
            }
        }
        match phase.next() {
            Some(next) => phase = next,
            None => break,
        }
    }

    let result = result.ok_or(ExperimentError::IncompleteTrial {
        block: trial.block,
        index: trial.index,
    })?;
    let response = result
        .response
        .as_ref()
        .map(Response::label)
        .unwrap_or_else(|| "NA".to_string());
    tracing::debug!(
        block = trial.block,
        index = trial.index,
        response = %response,
        rt_ms = ?result.rt_ms,
        correct = result.correct,
        "trial complete"
    );
    Ok(result)
}

fn compose(base: &Scene, overlay: &[Element]) -> Scene {
    let mut scene = base.clone();
    scene.elements.extend_from_slice(overlay);
    scene
}

/// Presents the stimulus, clears stale input and polls until a response,
/// the deadline, or an abort.
pub fn collect_response<F, T>(
    frontend: &mut F,
    clock: &StimulusClock<T>,
    window: &ResponseWindow,
) -> Result<Outcome>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    frontend.present(&window.stimulus)?;
    let onset = clock.now();
    frontend.clear();

    let mut base = &window.stimulus;
    let mut offset_shown = false;
    let mut shown_countdown: Option<String> = None;
    let mut entry = String::new();
    let mut response: Option<Response> = None;
    let mut rt_ms: Option<u64> = None;
    let mut finished = false;

    loop {
        let elapsed = clock.elapsed(onset);
        if let Some(deadline) = window.deadline {
            if elapsed >= deadline {
                break;
            }
        }

        let mut redraw = false;
        if let Some((after, scene)) = &window.offset {
            if !offset_shown && elapsed >= *after {
                base = scene;
                offset_shown = true;
                redraw = true;
            }
        }
        if let (Some(_), Some(deadline)) = (&window.countdown, window.deadline) {
            let label = Countdown::label(deadline - elapsed);
            if shown_countdown.as_deref() != Some(label.as_str()) {
                shown_countdown = Some(label);
                redraw = true;
            }
        }

        for key in frontend.poll() {
            if key == Key::Abort {
                tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "abort key during response window");
                return Err(ExperimentError::Aborted);
            }
            let at_ms = clock.elapsed(onset).as_millis() as u64;
            match &window.mode {
                ResponseMode::FirstKey => {
                    if window.accept.contains(&key) {
                        response = Some(Response::Key(key));
                        rt_ms = Some(at_ms);
                        finished = true;
                        break;
                    }
                }
                ResponseMode::FullWindow => {
                    if response.is_none() && window.accept.contains(&key) {
                        response = Some(Response::Key(key));
                        rt_ms = Some(at_ms);
                        if window.deadline.is_none() {
                            finished = true;
                            break;
                        }
                    }
                }
                ResponseMode::Entry { max_len, .. } => match key {
                    Key::Digit(d)
                        if entry.len() < *max_len
                            && (window.accept.is_empty() || window.accept.contains(&key)) =>
                    {
                        entry.push(char::from(b'0' + d));
                        redraw = true;
                    }
                    Key::Backspace => {
                        redraw |= entry.pop().is_some();
                    }
                    Key::Return => {
                        response = Some(Response::Entry(entry.clone()));
                        rt_ms = Some(at_ms);
                        finished = true;
                        break;
                    }
                    _ => {}
                },
            }
        }
        if finished {
            break;
        }

        if redraw {
            let mut overlay = Vec::new();
            if let (Some(cd), Some(label)) = (&window.countdown, &shown_countdown) {
                overlay.push(Element::text(label.clone(), cd.size, cd.color).at(cd.at));
            }
            if let ResponseMode::Entry { echo, .. } = &window.mode {
                if !entry.is_empty() {
                    overlay.push(Element::text(entry.clone(), echo.size, echo.color).at(echo.at));
                }
            }
            frontend.present(&compose(base, &overlay))?;
        }

        let remaining = window.deadline.map(|d| d.saturating_sub(clock.elapsed(onset)));
        clock.pause(remaining);
    }

    Ok(Outcome {
        response,
        rt_ms,
        elapsed_ms: clock.elapsed(onset).as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{HeadlessFrontend, ScriptedParticipant, Step};
    use cogbat_core::{TrialType, WHITE};
    use cogbat_timing::VirtualTimer;
    use pretty_assertions::assert_eq;

    fn clock(timer: &VirtualTimer) -> StimulusClock<VirtualTimer> {
        StimulusClock::new(timer.clone(), Duration::from_millis(1))
    }

    fn frontend(steps: Vec<Step>) -> (VirtualTimer, HeadlessFrontend<ScriptedParticipant>) {
        let timer = VirtualTimer::new();
        let fe = HeadlessFrontend::new(timer.clone(), (800, 600), ScriptedParticipant::new(steps));
        (timer, fe)
    }

    fn stimulus() -> Scene {
        Scene::new(WHITE).with(Element::text("<", 50.0, [0, 0, 0, 255]))
    }

    #[test]
    fn self_correcting_iti_spends_the_rest_of_the_budget() {
        let ms = Duration::from_millis;
        assert_eq!(self_correcting_iti(ms(3500), ms(450), ms(600)), ms(2450));
        assert_eq!(self_correcting_iti(ms(3500), ms(1700), ms(1599)), ms(201));
        assert_eq!(self_correcting_iti(ms(1000), ms(900), ms(400)), Duration::ZERO);
    }

    #[test]
    fn first_key_ends_the_window() {
        let (timer, mut fe) = frontend(vec![Step::key(450, Key::Left)]);
        let window = ResponseWindow::new(stimulus(), [Key::Left, Key::Right]).deadline_ms(1700);
        let out = collect_response(&mut fe, &clock(&timer), &window).unwrap();
        assert_eq!(out.response, Some(Response::Key(Key::Left)));
        assert_eq!(out.rt_ms, Some(450));
        assert_eq!(timer.now_ms(), 450);
    }

    #[test]
    fn unaccepted_keys_are_ignored_and_deadline_means_missed() {
        let (timer, mut fe) = frontend(vec![Step::key(100, Key::Space)]);
        let window = ResponseWindow::new(stimulus(), [Key::Left, Key::Right]).deadline_ms(1500);
        let out = collect_response(&mut fe, &clock(&timer), &window).unwrap();
        assert_eq!(out.response, None);
        assert_eq!(out.rt_ms, None);
        assert_eq!(out.elapsed_ms, 1500);
    }

    #[test]
    fn full_window_keeps_the_first_press_and_runs_on() {
        let (timer, mut fe) = frontend(vec![Step::keys(&[(300, Key::Space), (350, Key::Space)])]);
        let window = ResponseWindow::new(stimulus(), [Key::Space])
            .deadline_ms(900)
            .mode(ResponseMode::FullWindow)
            .offset_ms(250, Scene::new(WHITE));
        let out = collect_response(&mut fe, &clock(&timer), &window).unwrap();
        assert_eq!(out.rt_ms, Some(300));
        assert_eq!(timer.now_ms(), 900);
        assert!(fe.presented().last().is_some_and(Scene::is_blank));
    }

    #[test]
    fn entry_mode_edits_and_submits() {
        let keys = [
            (200, Key::Digit(9)),
            (250, Key::Digit(4)),
            (300, Key::Backspace),
            (350, Key::Digit(7)),
            (400, Key::Return),
        ];
        let (timer, mut fe) = frontend(vec![Step::keys(&keys)]);
        let echo = EntryEcho {
            size: 40.0,
            color: [0, 0, 0, 255],
            at: Position::CENTER,
        };
        let window = ResponseWindow::new(stimulus(), Vec::new())
            .mode(ResponseMode::Entry { max_len: 9, echo });
        let out = collect_response(&mut fe, &clock(&timer), &window).unwrap();
        assert_eq!(out.response, Some(Response::Entry("97".into())));
        assert_eq!(out.rt_ms, Some(400));
        assert!(fe.presented().iter().any(|s| s.contains_text("94")));
    }

    #[test]
    fn countdown_is_drawn_from_the_deadline() {
        assert_eq!(Countdown::label(Duration::from_secs(60)), "Time left: 01:00");
        assert_eq!(Countdown::label(Duration::from_millis(59_001)), "Time left: 01:00");
        assert_eq!(Countdown::label(Duration::from_millis(180_000)), "Time left: 03:00");
    }

    #[test]
    fn abort_in_response_window_is_an_error() {
        let (timer, mut fe) = frontend(vec![Step::key(10, Key::Abort)]);
        let window = ResponseWindow::new(stimulus(), [Key::Left]).deadline_ms(1700);
        let err = collect_response(&mut fe, &clock(&timer), &window).unwrap_err();
        assert!(err.is_abort());
        assert_eq!(timer.now_ms(), 10);
    }

    struct Tiny;

    impl Tabulate for Tiny {
        type Spec = Key;
        fn sheet_name(&self) -> &'static str {
            "tiny"
        }
        fn columns(&self) -> &'static [&'static str] {
            &["trial", "response"]
        }
        fn row(&self, number: usize, t: &CompletedTrial<Key>) -> Vec<Cell> {
            vec![number.into(), t.result.response.as_ref().map(Response::label).into()]
        }
    }

    impl Paradigm for Tiny {
        fn frames(&self, phase: TrialPhase, _: &Trial<Key>, result: Option<&TrialResult>) -> Vec<Frame> {
            match phase {
                TrialPhase::Fixation => vec![Frame::ms(Scene::new(WHITE).with(Element::fixation([0; 4])), 500)],
                TrialPhase::Feedback if result.is_some() => vec![Frame::ms(Scene::new(WHITE), 100)],
                _ => Vec::new(),
            }
        }
        fn response_window(&self, _: &Trial<Key>) -> ResponseWindow {
            ResponseWindow::new(stimulus(), [Key::Left, Key::Right]).deadline_ms(1000)
        }
        fn score(&self, trial: &Trial<Key>, response: Option<&Response>) -> bool {
            response.and_then(Response::key) == Some(trial.spec)
        }
        fn inter_trial_interval(&self, _: &Trial<Key>, outcome: &Outcome) -> Option<Duration> {
            Some(self_correcting_iti(
                Duration::from_millis(2000),
                Duration::from_millis(outcome.elapsed_ms),
                Duration::from_millis(500),
            ))
        }
        fn iti_scene(&self, _: &Trial<Key>) -> Scene {
            Scene::new(WHITE)
        }
    }

    fn trial(spec: Key) -> Trial<Key> {
        Trial {
            spec,
            block: 1,
            trial_type: TrialType::Main,
            index: 0,
            block_len: 1,
        }
    }

    #[test]
    fn trial_keeps_a_constant_budget() {
        let (timer, mut fe) = frontend(vec![Step::key(300, Key::Right)]);
        let result = run_trial(&Tiny, &trial(Key::Right), &mut fe, &clock(&timer)).unwrap();
        assert!(result.correct);
        assert_eq!(result.rt_ms, Some(300));
        assert_eq!(result.iti_ms, Some(1200));
        // 500 fixation + 300 response + 100 feedback + 1200 iti
        assert_eq!(timer.now_ms(), 2100);
    }

    #[test]
    fn missed_trial_is_incorrect_with_no_rt() {
        let (timer, mut fe) = frontend(vec![Step::Miss]);
        let result = run_trial(&Tiny, &trial(Key::Left), &mut fe, &clock(&timer)).unwrap();
        assert!(result.missed());
        assert!(!result.correct);
        assert_eq!(result.rt_ms, None);
        assert_eq!(result.iti_ms, Some(500));
    }
}
