//! Backwards digit span. Sequences grow from three to nine digits and are
//! typed back in reverse.

use super::{digits_of, end_of_task, feedback_scene, gate};
use crate::block::Block;
use crate::error::Result;
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{EntryEcho, Frame, Outcome, Paradigm, ResponseMode, ResponseWindow, Tabulate};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE};
use cogbat_core::{
    BLACK, Cell, CompletedTrial, Coord, Element, Key, Position, Response, Scene, SessionTable, Trial,
    TrialPhase, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::time::Duration;

const DIGIT_MS: u64 = 1000;
const DIGIT_GAP_MS: u64 = 100;
const FEEDBACK_MS: u64 = 2000;
const STIMULUS_SIZE: f32 = 80.0;
const LENGTHS: std::ops::RangeInclusive<usize> = 3..=9;
const REPEATS: usize = 2;
const PRACTICE_SEQUENCE: &str = "13579";
const MAX_ENTRY: usize = 20;

/// One sequence, stored as its digit string, e.g. "5831".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence(pub String);

impl Sequence {
    /// `length` distinct digits from 1-9.
    pub fn draw<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Self {
        let digits: Vec<u8> = (1..=9).collect();
        Self(digits.choose_multiple(rng, length).map(u8::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Correct iff the entry read backwards is the shown sequence.
pub fn is_correct(sequence: &str, entry: &str) -> bool {
    entry.chars().rev().eq(sequence.chars())
}

pub struct DigitSpan {
    screen_h: u32,
}

impl DigitSpan {
    pub fn new(screen_h: u32) -> Self {
        Self { screen_h }
    }

    /// Two sequences per length, shortest first.
    pub fn main_block<R: Rng + ?Sized>(rng: &mut R) -> Block<Sequence> {
        let specs = LENGTHS
            .flat_map(|len| std::iter::repeat_n(len, REPEATS))
            .map(|len| Sequence::draw(len, rng))
            .collect();
        Block::fixed(1, TrialType::Main, specs)
    }

    fn instructions(&self) -> Scene {
        let mid = self.screen_h as f32 * 0.5;
        let left = |text: &str, y: f32| Element::text(text, BODY_SIZE, BLACK).at(Position::new(Coord::At(100.0), Coord::At(y)));
        let centred = |text: &str, y: f32| Element::text(text, BODY_SIZE, BLACK).at(Position::new(Coord::Center, Coord::At(y)));
        Scene::new(WHITE)
            .with(Element::text("Backwards Digit Span", TITLE_SIZE, BLACK).at(Position::new(Coord::Center, Coord::At(mid - 300.0))))
            .with(left("You will be shown a number sequence, one number at a time", mid - 200.0))
            .with(left("Memorize the number sequence", mid - 100.0))
            .with(
                Element::text(
                    "You will then be asked to type the sequence in reverse/backwards order. For example...",
                    BODY_SIZE,
                    BLACK,
                )
                .at(Position::new(Coord::At(100.0), Coord::Center)),
            )
            .with(centred("Sequence: 1 2 3 4 5", mid + 100.0))
            .with(centred("Correct: 5 4 3 2 1", mid + 150.0))
            .with(left("The sequences will get longer throughout the experiment", mid + 250.0))
    }
}

impl Tabulate for DigitSpan {
    type Spec = Sequence;

    fn sheet_name(&self) -> &'static str {
        "Digit span (backwards)"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["trial", "length", "sequence", "user_sequence", "correct"]
    }

    fn row(&self, number: usize, done: &CompletedTrial<Sequence>) -> Vec<Cell> {
        let seq = &done.trial.spec;
        vec![
            number.into(),
            seq.len().into(),
            seq.0.clone().into(),
            done.result.response.as_ref().map(Response::label).into(),
            done.result.correct.into(),
        ]
    }
}

impl Paradigm for DigitSpan {
    fn frames(&self, phase: TrialPhase, trial: &Trial<Sequence>, result: Option<&TrialResult>) -> Vec<Frame> {
        match (phase, result) {
            (TrialPhase::Fixation, _) => digits_of(&trial.spec.0)
                .into_iter()
                .flat_map(|d| {
                    [
                        Frame::ms(Scene::new(WHITE).with(Element::text(d.to_string(), STIMULUS_SIZE, BLACK)), DIGIT_MS),
                        Frame::ms(Scene::new(WHITE), DIGIT_GAP_MS),
                    ]
                })
                .collect(),
            (TrialPhase::Feedback, Some(r)) if trial.is_practice() => {
                vec![Frame::ms(feedback_scene(WHITE, r.correct, true), FEEDBACK_MS)]
            }
            _ => Vec::new(),
        }
    }

    fn response_window(&self, _trial: &Trial<Sequence>) -> ResponseWindow {
        let prompt = Scene::new(WHITE).with(
            Element::text("Type the sequence in backwards order:", BODY_SIZE, BLACK)
                .at(Position::new(Coord::At(50.0), Coord::At(self.screen_h as f32 / 4.0))),
        );
        let digits: Vec<Key> = (1..=9).map(Key::Digit).collect();
        ResponseWindow::new(prompt, digits).mode(ResponseMode::Entry {
            max_len: MAX_ENTRY,
            echo: EntryEcho {
                size: STIMULUS_SIZE,
                color: BLACK,
                at: Position::CENTER,
            },
        })
    }

    fn score(&self, trial: &Trial<Sequence>, response: Option<&Response>) -> bool {
        match response {
            Some(Response::Entry(entry)) => is_correct(&trial.spec.0, entry),
            _ => false,
        }
    }

    fn inter_trial_interval(&self, _trial: &Trial<Sequence>, _outcome: &Outcome) -> Option<Duration> {
        None
    }

    fn iti_scene(&self, _trial: &Trial<Sequence>) -> Scene {
        Scene::new(WHITE)
    }
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let (_, h) = ctl.screen_size();
    let span = DigitSpan::new(h);
    let mut recorder = ResultRecorder::new();

    ctl.instructions(span.instructions())?;
    gate(ctl, WHITE, "We will begin with a practice trial...")?;
    let practice = Block::fixed(0, TrialType::Practice, vec![Sequence(PRACTICE_SEQUENCE.into())]);
    ctl.run_block(&span, &practice, &mut recorder)?;
    gate(ctl, WHITE, "We will now begin the main trials...")?;

    let main = DigitSpan::main_block(ctl.rng());
    ctl.run_block(&span, &main, &mut recorder)?;

    end_of_task(ctl, WHITE)?;
    Ok(recorder.finalize(&span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn reversed_entry_is_correct() {
        assert!(is_correct("123", "321"));
        assert!(!is_correct("123", "123"));
        assert!(!is_correct("123", "32"));
        assert!(!is_correct("123", ""));
    }

    #[test]
    fn main_block_grows_by_length() {
        let mut rng = StdRng::seed_from_u64(5);
        let block = DigitSpan::main_block(&mut rng);
        let lengths: Vec<usize> = block.specs.iter().map(Sequence::len).collect();
        assert_eq!(lengths, vec![3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9]);
        for seq in &block.specs {
            let mut digits = digits_of(&seq.0);
            assert!(digits.iter().all(|d| (1..=9).contains(d)));
            digits.sort_unstable();
            digits.dedup();
            assert_eq!(digits.len(), seq.len());
        }
    }

    #[test]
    fn entry_window_takes_only_one_to_nine() {
        let span = DigitSpan::new(600);
        let trial = Trial {
            spec: Sequence("975".into()),
            block: 1,
            trial_type: TrialType::Main,
            index: 0,
            block_len: 14,
        };
        let window = span.response_window(&trial);
        assert!(!window.accept.contains(&Key::Digit(0)));
        assert!(window.deadline.is_none());
        assert!(span.score(&trial, Some(&Response::Entry("579".into()))));
        assert!(span.frames(TrialPhase::Feedback, &trial, None).is_empty());
    }
}
