//! Sternberg memory scanning: hold a digit set, then judge a probe.

use super::{end_of_task, feedback_scene, gate};
use crate::block::{Block, build_block};
use crate::error::Result;
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Frame, Outcome, Paradigm, ResponseWindow, Tabulate};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE, instruction_page};
use cogbat_core::{
    BLACK, BLUE, Cell, CompletedTrial, Coord, Element, Key, Position, Response, Scene, SessionTable,
    Trial, TrialPhase, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;

const DIGIT_MS: u64 = 1200;
const DIGIT_GAP_MS: u64 = 250;
const WARNING_MS: u64 = 2000;
const PRE_PROBE_MS: u64 = 250;
const PROBE_MS: u64 = 2250;
const FEEDBACK_GAP_MS: u64 = 250;
const FEEDBACK_MS: u64 = 1000;
const ITI_MS: u64 = 1500;
const DIGIT_SIZE: f32 = 50.0;
const PRACTICE_SETS: usize = 6;
const BLOCK_SETS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeType {
    Present,
    Absent,
}

impl ProbeType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    fn key(&self) -> Key {
        match self {
            Self::Present => Key::Left,
            Self::Absent => Key::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SternbergCondition {
    pub set_size: usize,
    pub probe_type: ProbeType,
}

pub fn conditions() -> Vec<SternbergCondition> {
    let mut out = Vec::with_capacity(4);
    for set_size in [2, 6] {
        for probe_type in [ProbeType::Present, ProbeType::Absent] {
            out.push(SternbergCondition { set_size, probe_type });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SternbergTrial {
    pub condition: SternbergCondition,
    pub set: Vec<u8>,
    pub probe: u8,
}

impl SternbergTrial {
    /// Draws `set_size` distinct digits and a probe from inside or outside
    /// the set.
    pub fn draw<R: Rng + ?Sized>(condition: SternbergCondition, rng: &mut R) -> Self {
        let mut digits: Vec<u8> = (0..=9).collect();
        digits.shuffle(rng);
        let (set, unused) = digits.split_at(condition.set_size);
        let pool = match condition.probe_type {
            ProbeType::Present => set,
            ProbeType::Absent => unused,
        };
        let probe = pool[rng.random_range(0..pool.len())];
        Self {
            condition,
            set: set.to_vec(),
            probe,
        }
    }

    pub fn set_label(&self) -> String {
        self.set.iter().map(u8::to_string).collect()
    }
}

fn response_label(response: &Response) -> String {
    match response.key() {
        Some(Key::Left) => ProbeType::Present.label().into(),
        Some(Key::Right) => ProbeType::Absent.label().into(),
        _ => response.label(),
    }
}

pub struct Sternberg {
    blocks: usize,
}

impl Sternberg {
    pub fn new(blocks: usize) -> Self {
        Self { blocks }
    }

    fn block<R: Rng + ?Sized>(index: usize, trial_type: TrialType, rng: &mut R) -> Block<SternbergTrial> {
        let sets = if trial_type.is_practice() {
            PRACTICE_SETS
        } else {
            BLOCK_SETS
        };
        // build_block halves practice pools, so double the sets going in
        let reps = if trial_type.is_practice() { sets * 2 } else { sets };
        build_block(&conditions(), reps, trial_type, index, rng).map_with(|c| SternbergTrial::draw(c, rng))
    }

    fn instructions(screen_h: u32) -> Scene {
        let line = |text: &str, dy: f32| Element::text(text, BODY_SIZE, BLACK).at(Position::center_x(dy));
        Scene::new(WHITE)
            .with(
                Element::text("Sternberg Task", TITLE_SIZE, BLACK)
                    .at(Position::new(Coord::Center, Coord::At(screen_h as f32 * 0.5 - 300.0))),
            )
            .with(line("You will see a sequence of numbers, one at a time.", -200.0))
            .with(line("Try your best to memorize them.", -150.0))
            .with(line("After a short pause you will see a number in blue.", -100.0))
            .with(line("Press the Left arrow if it was in the sequence,", -50.0))
            .with(line("or the Right arrow if it was not.", 0.0))
            .with(line("Respond as quickly and accurately as you can.", 50.0))
    }
}

impl Tabulate for Sternberg {
    type Spec = SternbergTrial;

    fn sheet_name(&self) -> &'static str {
        "Sternberg"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "trialNum",
            "block",
            "setSize",
            "probeType",
            "set",
            "probe",
            "response",
            "RT",
            "correct",
        ]
    }

    fn row(&self, number: usize, done: &CompletedTrial<SternbergTrial>) -> Vec<Cell> {
        let s = &done.trial.spec;
        let r = &done.result;
        vec![
            number.into(),
            done.trial.block.into(),
            s.condition.set_size.into(),
            s.condition.probe_type.label().into(),
            s.set_label().into(),
            s.probe.into(),
            r.response.as_ref().map(response_label).into(),
            r.rt_ms.into(),
            r.correct.into(),
        ]
    }
}

impl Paradigm for Sternberg {
    fn frames(&self, phase: TrialPhase, trial: &Trial<SternbergTrial>, result: Option<&TrialResult>) -> Vec<Frame> {
        match phase {
            TrialPhase::Fixation => trial
                .spec
                .set
                .iter()
                .flat_map(|d| {
                    [
                        Frame::ms(Scene::new(WHITE).with(Element::text(d.to_string(), DIGIT_SIZE, BLACK)), DIGIT_MS),
                        Frame::ms(Scene::new(WHITE), DIGIT_GAP_MS),
                    ]
                })
                .collect(),
            TrialPhase::Cue => vec![Frame::ms(
                Scene::new(WHITE).with(Element::text("+", DIGIT_SIZE, BLACK)),
                WARNING_MS,
            )],
            TrialPhase::PreStimulus => vec![Frame::ms(Scene::new(WHITE), PRE_PROBE_MS)],
            TrialPhase::Feedback => match result {
                Some(r) => vec![
                    Frame::ms(Scene::new(WHITE), FEEDBACK_GAP_MS),
                    Frame::ms(feedback_scene(WHITE, r.correct, false), FEEDBACK_MS),
                ],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn response_window(&self, trial: &Trial<SternbergTrial>) -> ResponseWindow {
        let mut probe = Scene::new(WHITE).with(Element::text(trial.spec.probe.to_string(), DIGIT_SIZE, BLUE));
        if trial.is_practice() {
            probe.push(Element::text("(yes)", BODY_SIZE, BLACK).at(Position::new(Coord::At(100.0), Coord::Center)));
            probe.push(
                Element::text("(no)", BODY_SIZE, BLACK)
                    .at(Position::new(Coord::FromCenter(300.0), Coord::Center)),
            );
        }
        ResponseWindow::new(probe, [Key::Left, Key::Right]).deadline_ms(PROBE_MS)
    }

    fn score(&self, trial: &Trial<SternbergTrial>, response: Option<&Response>) -> bool {
        response.and_then(Response::key) == Some(trial.spec.condition.probe_type.key())
    }

    fn inter_trial_interval(&self, _trial: &Trial<SternbergTrial>, _outcome: &Outcome) -> Option<Duration> {
        Some(Duration::from_millis(ITI_MS))
    }

    fn iti_scene(&self, _trial: &Trial<SternbergTrial>) -> Scene {
        Scene::new(WHITE)
    }
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let sternberg = Sternberg::new(ctl.config().sternberg.blocks);
    let (_, h) = ctl.screen_size();
    let mut recorder = ResultRecorder::new();

    ctl.instructions(Sternberg::instructions(h))?;
    gate(ctl, WHITE, "We'll begin with some practice trials...")?;
    let practice = Sternberg::block(0, TrialType::Practice, ctl.rng());
    ctl.run_block(&sternberg, &practice, &mut recorder)?;
    gate(ctl, WHITE, "We will now begin the main trials...")?;

    for index in 1..=sternberg.blocks {
        let block = Sternberg::block(index, TrialType::Main, ctl.rng());
        ctl.run_block(&sternberg, &block, &mut recorder)?;
        if index < sternberg.blocks {
            ctl.instructions(instruction_page(
                WHITE,
                h,
                "End of block.",
                "Take a short break, and press space when you're ready to start the next block...",
            ))?;
        }
    }

    end_of_task(ctl, WHITE)?;
    Ok(recorder.finalize(&sternberg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn trial(spec: SternbergTrial, trial_type: TrialType) -> Trial<SternbergTrial> {
        Trial {
            spec,
            block: 1,
            trial_type,
            index: 0,
            block_len: 48,
        }
    }

    #[test]
    fn probe_respects_its_type() {
        let mut rng = StdRng::seed_from_u64(11);
        for c in conditions() {
            for _ in 0..50 {
                let t = SternbergTrial::draw(c, &mut rng);
                assert_eq!(t.set.len(), c.set_size);
                let mut sorted = t.set.clone();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), c.set_size, "digits repeat in {:?}", t.set);
                assert_eq!(t.set.contains(&t.probe), c.probe_type == ProbeType::Present);
            }
        }
    }

    #[test]
    fn block_sizes() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(Sternberg::block(0, TrialType::Practice, &mut rng).len(), 24);
        assert_eq!(Sternberg::block(1, TrialType::Main, &mut rng).len(), 48);
    }

    #[test]
    fn encoding_shows_each_digit_then_a_blank() {
        let spec = SternbergTrial {
            condition: SternbergCondition {
                set_size: 2,
                probe_type: ProbeType::Absent,
            },
            set: vec![4, 7],
            probe: 1,
        };
        let frames = Sternberg::new(2).frames(TrialPhase::Fixation, &trial(spec, TrialType::Main), None);
        assert_eq!(frames.len(), 4);
        assert!(frames[0].scene.contains_text("4"));
        assert!(frames[1].scene.is_blank());
        assert!(frames[2].scene.contains_text("7"));
        let total: Duration = frames.iter().map(|f| f.duration).sum();
        assert_eq!(total, Duration::from_millis(2 * (1200 + 250)));
    }

    #[test]
    fn left_means_present() {
        let spec = SternbergTrial {
            condition: SternbergCondition {
                set_size: 6,
                probe_type: ProbeType::Present,
            },
            set: vec![0, 1, 2, 3, 4, 5],
            probe: 3,
        };
        let t = trial(spec, TrialType::Main);
        let s = Sternberg::new(2);
        assert!(s.score(&t, Some(&Response::Key(Key::Left))));
        assert!(!s.score(&t, Some(&Response::Key(Key::Right))));
        assert!(!s.score(&t, None));
        assert_eq!(response_label(&Response::Key(Key::Right)), "absent");
    }

    #[test]
    fn practice_probe_carries_reminders() {
        let spec = SternbergTrial {
            condition: SternbergCondition {
                set_size: 2,
                probe_type: ProbeType::Present,
            },
            set: vec![8, 9],
            probe: 9,
        };
        let s = Sternberg::new(2);
        let practice = s.response_window(&trial(spec.clone(), TrialType::Practice));
        assert!(practice.stimulus.contains_text("(yes)"));
        let main = s.response_window(&trial(spec, TrialType::Main));
        assert!(!main.stimulus.contains_text("(no)"));
    }
}
