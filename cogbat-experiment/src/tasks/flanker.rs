//! Eriksen flanker with compatible and incompatible response mappings.

use super::{end_of_task, gate};
use crate::block::Block;
use crate::config::{BlockOrder, FlankerConfig};
use crate::error::Result;
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Frame, Outcome, Paradigm, ResponseWindow, Tabulate};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE, foreground_for};
use cogbat_core::{
    ArrowDirection, BLACK, Cell, CompletedTrial, Coord, Element, GREEN, Key, Position, RED,
    Response, Rgba, Scene, SessionTable, Trial, TrialPhase, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use std::time::Duration;

const FIXATION_MS: u64 = 1000;
const STIMULUS_MS: u64 = 200;
const RESPONSE_MS: u64 = 1500;
const FEEDBACK_MS: u64 = 1500;
const ITI_MS: u64 = 1500;
const STIMULUS_SIZE: f32 = 100.0;
const TEXT_SIZE: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Congruency {
    Congruent,
    Incongruent,
}

impl Congruency {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Congruent => "congruent",
            Self::Incongruent => "incongruent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compatibility {
    Compatible,
    Incompatible,
}

impl Compatibility {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compatible => "compatible",
            Self::Incompatible => "incompatible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlankerTrial {
    pub congruency: Congruency,
    pub direction: ArrowDirection,
    pub compatibility: Compatibility,
}

/// Congruency x direction.
pub fn conditions() -> Vec<(Congruency, ArrowDirection)> {
    let mut out = Vec::with_capacity(4);
    for c in [Congruency::Congruent, Congruency::Incongruent] {
        for d in [ArrowDirection::Left, ArrowDirection::Right] {
            out.push((c, d));
        }
    }
    out
}

pub fn stimulus_text(congruency: Congruency, direction: ArrowDirection) -> &'static str {
    match (direction, congruency) {
        (ArrowDirection::Left, Congruency::Congruent) => "< < < < <",
        (ArrowDirection::Left, Congruency::Incongruent) => "> > < > >",
        (ArrowDirection::Right, Congruency::Congruent) => "> > > > >",
        (ArrowDirection::Right, Congruency::Incongruent) => "< < > < <",
    }
}

/// Compatible: answer with the centre arrow. Incompatible: answer against
/// it. A missed response is wrong under both mappings.
pub fn is_correct(compatibility: Compatibility, direction: ArrowDirection, response: Option<Key>) -> bool {
    let expected = match direction {
        ArrowDirection::Left => Key::Left,
        ArrowDirection::Right => Key::Right,
    };
    match response {
        Some(k @ (Key::Left | Key::Right)) => match compatibility {
            Compatibility::Compatible => k == expected,
            Compatibility::Incompatible => k != expected,
        },
        _ => false,
    }
}

/// Resolves `choose` (and a zero count on either side) into a concrete
/// ordering of the two halves.
pub fn resolve_order(config: &FlankerConfig, chosen: Option<Compatibility>) -> Vec<Compatibility> {
    let first = if config.blocks_compat == 0 {
        Compatibility::Incompatible
    } else if config.blocks_incompat == 0 {
        Compatibility::Compatible
    } else {
        match config.block_order {
            BlockOrder::Compatible => Compatibility::Compatible,
            BlockOrder::Incompatible => Compatibility::Incompatible,
            BlockOrder::Choose => chosen.unwrap_or(Compatibility::Compatible),
        }
    };
    let second = match first {
        Compatibility::Compatible => Compatibility::Incompatible,
        Compatibility::Incompatible => Compatibility::Compatible,
    };
    let mut order = vec![first];
    if count_for(config, second) > 0 {
        order.push(second);
    }
    order
}

fn count_for(config: &FlankerConfig, c: Compatibility) -> usize {
    match c {
        Compatibility::Compatible => config.blocks_compat,
        Compatibility::Incompatible => config.blocks_incompat,
    }
}

pub struct Flanker {
    background: Rgba,
    foreground: Rgba,
    sets_practice: usize,
    sets_main: usize,
}

impl Flanker {
    pub fn new(config: &FlankerConfig) -> Self {
        let background = if config.dark_mode { BLACK } else { WHITE };
        Self {
            background,
            foreground: foreground_for(background),
            sets_practice: config.sets_practice,
            sets_main: config.sets_main,
        }
    }

    fn fixation_scene(&self) -> Scene {
        Scene::new(self.background).with(Element::text("+", TEXT_SIZE, self.foreground))
    }

    /// Every condition `sets` times, shuffled, under one mapping.
    pub fn block<R: rand::Rng + ?Sized>(
        index: usize,
        trial_type: TrialType,
        compatibility: Compatibility,
        sets: usize,
        rng: &mut R,
    ) -> Block<FlankerTrial> {
        let pool: Vec<FlankerTrial> = (0..sets)
            .flat_map(|_| conditions())
            .map(|(congruency, direction)| FlankerTrial {
                congruency,
                direction,
                compatibility,
            })
            .collect();
        Block::shuffled(index, trial_type, pool, rng)
    }
}

impl Tabulate for Flanker {
    type Spec = FlankerTrial;

    fn sheet_name(&self) -> &'static str {
        "Eriksen Flanker"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "trial",
            "block",
            "compatibility",
            "congruency",
            "direction",
            "response",
            "correct",
            "RT",
        ]
    }

    fn row(&self, number: usize, done: &CompletedTrial<FlankerTrial>) -> Vec<Cell> {
        let s = &done.trial.spec;
        let r = &done.result;
        vec![
            number.into(),
            done.trial.block.into(),
            s.compatibility.label().into(),
            s.congruency.label().into(),
            s.direction.label().into(),
            r.response.as_ref().map(Response::label).into(),
            r.correct.into(),
            r.rt_ms.into(),
        ]
    }
}

impl Paradigm for Flanker {
    fn frames(&self, phase: TrialPhase, _trial: &Trial<FlankerTrial>, result: Option<&TrialResult>) -> Vec<Frame> {
        match (phase, result) {
            (TrialPhase::Fixation, _) => vec![Frame::ms(self.fixation_scene(), FIXATION_MS)],
            (TrialPhase::Feedback, Some(r)) => {
                let (text, color) = if r.missed() {
                    ("too slow", self.foreground)
                } else if r.correct {
                    ("correct", GREEN)
                } else {
                    ("incorrect", RED)
                };
                let scene = Scene::new(self.background).with(Element::text(text, TEXT_SIZE, color));
                vec![Frame::ms(scene, FEEDBACK_MS)]
            }
            _ => Vec::new(),
        }
    }

    fn response_window(&self, trial: &Trial<FlankerTrial>) -> ResponseWindow {
        let s = &trial.spec;
        let stimulus = Scene::new(self.background).with(Element::text(
            stimulus_text(s.congruency, s.direction),
            STIMULUS_SIZE,
            self.foreground,
        ));
        ResponseWindow::new(stimulus, [Key::Left, Key::Right])
            .deadline_ms(RESPONSE_MS)
            .offset_ms(STIMULUS_MS, Scene::new(self.background))
    }

    fn score(&self, trial: &Trial<FlankerTrial>, response: Option<&Response>) -> bool {
        is_correct(trial.spec.compatibility, trial.spec.direction, response.and_then(Response::key))
    }

    fn inter_trial_interval(&self, trial: &Trial<FlankerTrial>, _outcome: &Outcome) -> Option<Duration> {
        (!trial.is_last_in_block()).then(|| Duration::from_millis(ITI_MS))
    }

    fn iti_scene(&self, _trial: &Trial<FlankerTrial>) -> Scene {
        self.fixation_scene()
    }
}

impl Flanker {
    fn instructions(&self, screen_h: u32, first: Compatibility) -> Scene {
        let (bg, fg) = (self.background, self.foreground);
        let line = |text: &str, dy: f32| Element::text(text, BODY_SIZE, fg).at(Position::center_x(dy));
        let (rule, example) = match first {
            Compatibility::Compatible => (
                "Use the Left / Right arrow keys to indicate the direction of the CENTER arrow.",
                "In example above, you should press the Left arrow.",
            ),
            Compatibility::Incompatible => (
                "Use the Left / Right arrow keys to indicate the OPPOSITE direction of the CENTER arrow.",
                "In example above, you should press the Right arrow.",
            ),
        };
        Scene::new(bg)
            .with(
                Element::text("Eriksen Flanker Task", TITLE_SIZE, fg)
                    .at(Position::new(Coord::Center, Coord::At(screen_h as f32 * 0.5 - 300.0))),
            )
            .with(line("Keep your eyes on the fixation cross at the start of each trial:", -200.0))
            .with(Element::text("+", TEXT_SIZE, fg).at(Position::center_x(-150.0)))
            .with(line("A set of arrows will appear:", -100.0))
            .with(
                Element::text(
                    stimulus_text(Congruency::Incongruent, ArrowDirection::Left),
                    STIMULUS_SIZE,
                    fg,
                )
                .at(Position::center_x(-50.0)),
            )
            .with(line(rule, 70.0))
            .with(line(example, 120.0))
    }

    fn choose_scene(&self, screen_h: u32) -> Scene {
        let fg = self.foreground;
        let at = |dy: f32| Position::new(Coord::At(100.0), Coord::At(screen_h as f32 * 0.5 + dy));
        Scene::new(self.background)
            .with(Element::text("Choose block order:", BODY_SIZE, fg).at(at(-300.0)))
            .with(Element::text("1 - Compatible first", BODY_SIZE, fg).at(at(-200.0)))
            .with(Element::text("2 - Incompatible first", BODY_SIZE, fg).at(at(-150.0)))
    }
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let config = ctl.config().flanker.clone();
    let flanker = Flanker::new(&config);
    let bg = flanker.background;
    let (_, h) = ctl.screen_size();

    let needs_choice =
        config.block_order == BlockOrder::Choose && config.blocks_compat > 0 && config.blocks_incompat > 0;
    let chosen = if needs_choice {
        let key = ctl.choose(&flanker.choose_scene(h), &[Key::Digit(1), Key::Digit(2)])?;
        Some(if key == Key::Digit(2) {
            Compatibility::Incompatible
        } else {
            Compatibility::Compatible
        })
    } else {
        None
    };
    let order = resolve_order(&config, chosen);
    tracing::info!(order = ?order.iter().map(Compatibility::label).collect::<Vec<_>>(), "flanker block order");

    let total_blocks = config.blocks_compat + config.blocks_incompat;
    let mut recorder = ResultRecorder::new();
    let mut block_offset = 0;

    for (half, &compatibility) in order.iter().enumerate() {
        if half == 0 {
            ctl.instructions(flanker.instructions(h, compatibility))?;
            gate(ctl, bg, "We'll begin with some practice trials...")?;
        } else {
            gate(ctl, bg, "Second half instructions")?;
        }

        let practice = Flanker::block(0, TrialType::Practice, compatibility, flanker.sets_practice, ctl.rng());
        ctl.run_block(&flanker, &practice, &mut recorder)?;
        gate(ctl, bg, "We will now begin the main trials...")?;

        let blocks = count_for(&config, compatibility);
        for i in 1..=blocks {
            let number = block_offset + i;
            let block = Flanker::block(number, TrialType::Main, compatibility, flanker.sets_main, ctl.rng());
            ctl.run_block(&flanker, &block, &mut recorder)?;
            // the first half ends on its own gate, the second on the task's
            let last = if half == 0 { blocks } else { total_blocks };
            ctl.rest_between_blocks(if half == 0 { i } else { number }, last, bg)?;
        }
        block_offset += blocks;
    }

    end_of_task(ctl, bg)?;
    Ok(recorder.finalize(&flanker))
}
