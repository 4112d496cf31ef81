//! Attention Network Test (Fan et al., 2002).

use super::{end_of_task, feedback_scene, gate};
use crate::block::{Block, build_block};
use crate::config::AntConfig;
use crate::error::Result;
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Frame, Outcome, Paradigm, ResponseWindow, Tabulate, self_correcting_iti};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE};
use cogbat_core::{
    ArrowDirection, BLACK, Cell, CompletedTrial, Coord, Element, Key, Position, Response, Scene,
    SessionTable, Trial, TrialPhase, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use rand::Rng;
use std::time::Duration;

const FIXATION_MS: std::ops::Range<u64> = 400..1600;
const CUE_MS: u64 = 100;
const PRE_STIMULUS_MS: u64 = 400;
const RESPONSE_MS: u64 = 1700;
const FEEDBACK_MS: u64 = 1000;
const TRIAL_BUDGET_MS: u64 = 3500;

/// Vertical gap between fixation and the arrow row.
const TARGET_OFFSET: f32 = 31.0;
const ARROW_SIZE: f32 = 50.0;
const ARROW_HEIGHT: f32 = ARROW_SIZE * 0.6;
const ARROW_GAP: f32 = 10.0;
const CUE_SIZE: f32 = 40.0;
const FIXATION_SIZE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Congruency {
    Congruent,
    Incongruent,
    Neutral,
}

impl Congruency {
    pub const ALL: [Congruency; 3] = [Self::Congruent, Self::Incongruent, Self::Neutral];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Congruent => "congruent",
            Self::Incongruent => "incongruent",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    NoCue,
    Center,
    Spatial,
    Double,
}

impl Cue {
    pub const ALL: [Cue; 4] = [Self::NoCue, Self::Center, Self::Spatial, Self::Double];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoCue => "nocue",
            Self::Center => "center",
            Self::Spatial => "spatial",
            Self::Double => "double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Top,
    Bottom,
}

impl Location {
    pub const ALL: [Location; 2] = [Self::Top, Self::Bottom];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AntCondition {
    pub congruency: Congruency,
    pub cue: Cue,
    pub location: Location,
    pub direction: ArrowDirection,
}

/// 3 x 4 x 2 x 2 = 48 conditions.
pub fn conditions() -> Vec<AntCondition> {
    let mut out = Vec::with_capacity(48);
    for congruency in Congruency::ALL {
        for cue in Cue::ALL {
            for location in Location::ALL {
                for direction in [ArrowDirection::Left, ArrowDirection::Right] {
                    out.push(AntCondition {
                        congruency,
                        cue,
                        location,
                        direction,
                    });
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntTrial {
    pub condition: AntCondition,
    pub fixation_ms: u64,
}

fn flip(d: ArrowDirection) -> ArrowDirection {
    match d {
        ArrowDirection::Left => ArrowDirection::Right,
        ArrowDirection::Right => ArrowDirection::Left,
    }
}

fn key_for(d: ArrowDirection) -> Key {
    match d {
        ArrowDirection::Left => Key::Left,
        ArrowDirection::Right => Key::Right,
    }
}

pub struct Ant {
    blocks: usize,
}

impl Ant {
    pub fn new(config: &AntConfig) -> Self {
        Self {
            blocks: config.blocks,
        }
    }

    fn fixation() -> Element {
        Element::Fixation {
            size: FIXATION_SIZE,
            color: BLACK,
            at: Position::CENTER,
        }
    }

    fn fixation_scene() -> Scene {
        Scene::new(WHITE).with(Self::fixation())
    }

    fn cue_at(location: Location) -> Element {
        let dy = match location {
            Location::Top => -FIXATION_SIZE - TARGET_OFFSET,
            Location::Bottom => TARGET_OFFSET,
        };
        Element::text("*", CUE_SIZE, BLACK).at(Position::center_x(dy))
    }

    fn cue_scene(cue: Cue, location: Location) -> Scene {
        match cue {
            Cue::NoCue => Self::fixation_scene(),
            Cue::Center => Scene::new(WHITE).with(Element::text("*", CUE_SIZE, BLACK)),
            Cue::Double => Self::fixation_scene()
                .with(Self::cue_at(Location::Top))
                .with(Self::cue_at(Location::Bottom)),
            Cue::Spatial => Self::fixation_scene().with(Self::cue_at(location)),
        }
    }

    /// Five arrows, the centre one pointing in `direction`. Neutral
    /// flankers are plain dashes.
    pub fn flanker_row(condition: &AntCondition) -> Vec<Element> {
        let top = match condition.location {
            Location::Top => -ARROW_HEIGHT - TARGET_OFFSET,
            Location::Bottom => TARGET_OFFSET,
        };
        let row_width = 5.0 * ARROW_SIZE + 4.0 * ARROW_GAP;
        (0..5)
            .map(|i| {
                let x = -row_width * 0.5 + i as f32 * (ARROW_SIZE + ARROW_GAP);
                let at = Position::new(Coord::FromCenter(x), Coord::FromCenter(top));
                if i == 2 {
                    return Element::Arrow {
                        direction: condition.direction,
                        size: ARROW_SIZE,
                        color: BLACK,
                        at,
                    };
                }
                match condition.congruency {
                    Congruency::Congruent => Element::Arrow {
                        direction: condition.direction,
                        size: ARROW_SIZE,
                        color: BLACK,
                        at,
                    },
                    Congruency::Incongruent => Element::Arrow {
                        direction: flip(condition.direction),
                        size: ARROW_SIZE,
                        color: BLACK,
                        at,
                    },
                    Congruency::Neutral => {
                        let h = ARROW_HEIGHT * 0.3;
                        Element::Rectangle {
                            width: ARROW_SIZE,
                            height: h,
                            color: BLACK,
                            at: Position::new(
                                Coord::FromCenter(x),
                                Coord::FromCenter(top + (ARROW_HEIGHT - h) * 0.5),
                            ),
                        }
                    }
                }
            })
            .collect()
    }

    fn with_fixation_ms<R: Rng + ?Sized>(block: Block<AntCondition>, rng: &mut R) -> Block<AntTrial> {
        block.map_with(|condition| AntTrial {
            condition,
            fixation_ms: rng.random_range(FIXATION_MS),
        })
    }
}

impl Tabulate for Ant {
    type Spec = AntTrial;

    fn sheet_name(&self) -> &'static str {
        "ANT"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "trial",
            "block",
            "congruency",
            "cue",
            "location",
            "fixationTime",
            "ITI",
            "direction",
            "response",
            "correct",
            "RT",
        ]
    }

    fn row(&self, number: usize, done: &CompletedTrial<AntTrial>) -> Vec<Cell> {
        let c = &done.trial.spec.condition;
        let r = &done.result;
        vec![
            number.into(),
            done.trial.block.into(),
            c.congruency.label().into(),
            c.cue.label().into(),
            c.location.label().into(),
            done.trial.spec.fixation_ms.into(),
            r.iti_ms.into(),
            c.direction.label().into(),
            r.response.as_ref().map(Response::label).into(),
            r.correct.into(),
            r.rt_ms.into(),
        ]
    }
}

impl Paradigm for Ant {
    fn frames(&self, phase: TrialPhase, trial: &Trial<AntTrial>, result: Option<&TrialResult>) -> Vec<Frame> {
        let spec = &trial.spec;
        match phase {
            TrialPhase::Fixation => vec![Frame::ms(Self::fixation_scene(), spec.fixation_ms)],
            TrialPhase::Cue => vec![Frame::ms(
                Self::cue_scene(spec.condition.cue, spec.condition.location),
                CUE_MS,
            )],
            TrialPhase::PreStimulus => vec![Frame::ms(Self::fixation_scene(), PRE_STIMULUS_MS)],
            TrialPhase::Feedback => match result {
                Some(r) if trial.is_practice() => vec![Frame::ms(feedback_scene(WHITE, r.correct, false), FEEDBACK_MS)],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn response_window(&self, trial: &Trial<AntTrial>) -> ResponseWindow {
        let mut stimulus = Self::fixation_scene();
        stimulus.elements.extend(Self::flanker_row(&trial.spec.condition));
        ResponseWindow::new(stimulus, [Key::Left, Key::Right]).deadline_ms(RESPONSE_MS)
    }

    fn score(&self, trial: &Trial<AntTrial>, response: Option<&Response>) -> bool {
        response.and_then(Response::key) == Some(key_for(trial.spec.condition.direction))
    }

    fn inter_trial_interval(&self, trial: &Trial<AntTrial>, outcome: &Outcome) -> Option<Duration> {
        Some(self_correcting_iti(
            Duration::from_millis(TRIAL_BUDGET_MS),
            Duration::from_millis(outcome.elapsed_ms),
            Duration::from_millis(trial.spec.fixation_ms),
        ))
    }

    fn iti_scene(&self, _trial: &Trial<AntTrial>) -> Scene {
        Self::fixation_scene()
    }
}

fn instructions_scene(screen_h: u32) -> Scene {
    let mid = screen_h as f32 * 0.5;
    let line = |text: &str, dy: f32| Element::text(text, BODY_SIZE, BLACK).at(Position::center_x(dy));
    let mut scene = Scene::new(WHITE)
        .with(Element::text("Attentional Network Test", TITLE_SIZE, BLACK).at(Position::new(Coord::Center, Coord::At(mid - 300.0))))
        .with(line("Keep your eyes on the fixation cross at the start of each trial:", -200.0))
        .with(Ant::fixation().at(Position::center_x(-150.0)))
        .with(line("A set of arrows will appear somewhere on the screen:", -100.0));
    let example = AntCondition {
        congruency: Congruency::Incongruent,
        cue: Cue::NoCue,
        location: Location::Bottom,
        direction: ArrowDirection::Left,
    };
    for e in Ant::flanker_row(&example) {
        // shift the example row up to sit under its caption
        scene.push(match e.position() {
            Position { x, y: Coord::FromCenter(dy) } => e.at(Position::new(x, Coord::FromCenter(dy - 81.0))),
            _ => e,
        });
    }
    scene
        .with(line("Use the Left / Right arrow keys to indicate the direction of the CENTER arrow.", 50.0))
        .with(line("In example above, you should press the Left arrow.", 100.0))
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let ant = Ant::new(&ctl.config().ant);
    let combos = conditions();
    let (_, h) = ctl.screen_size();

    ctl.instructions(instructions_scene(h))?;
    gate(ctl, WHITE, "We'll begin with some practice trials...")?;

    let practice = build_block(&combos, 1, TrialType::Practice, 0, ctl.rng());
    let practice = Ant::with_fixation_ms(practice, ctl.rng());
    let mut recorder = ResultRecorder::new();
    ctl.run_block(&ant, &practice, &mut recorder)?;

    gate(
        ctl,
        WHITE,
        "We will now begin the main trials...\nYou will not receive feedback after each trial.",
    )?;

    for n in 1..=ant.blocks {
        let block = build_block(&combos, 2, TrialType::Main, n, ctl.rng());
        let block = Ant::with_fixation_ms(block, ctl.rng());
        ctl.run_block(&ant, &block, &mut recorder)?;
        ctl.rest_between_blocks(n, ant.blocks, WHITE)?;
    }

    end_of_task(ctl, WHITE)?;
    Ok(recorder.finalize(&ant))
}
