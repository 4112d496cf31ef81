//! Raven's progressive matrices, one timed item per trial.

use super::{end_of_task, feedback_scene, gate};
use crate::block::Block;
use crate::config::{RAVENS_ITEMS, RavensConfig};
use crate::error::Result;
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Countdown, Frame, Outcome, Paradigm, ResponseWindow, Tabulate};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE};
use cogbat_core::{
    BLACK, Cell, CompletedTrial, Coord, Element, ImageHandle, Key, Position, Response, Scene,
    SessionTable, Trial, TrialPhase, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use std::path::PathBuf;
use std::time::Duration;

const ITEM_MS: u64 = 60_000;
const FEEDBACK_MS: u64 = 2000;
const ITI_MS: u64 = 1000;
const PRACTICE_ANSWER: u8 = 2;
const COUNTDOWN_SIZE: f32 = 20.0;

/// Correct option for items 1..=36 of set II.
pub const ANSWER_KEY: [u8; RAVENS_ITEMS] = [
    5, 1, 7, 4, 3, 1, 6, 1, 8, 4, 5, 6, 2, 1, 2, 4, 6, 7, 3, 8, 8, 7, 6, 3, 7, 2, 7, 5, 6, 5, 4, 8, 5,
    1, 3, 2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RavensItem {
    /// 1-based item number; 0 for the practice item.
    pub image: usize,
    pub answer: u8,
    pub handle: ImageHandle,
}

pub fn item_path(image: usize) -> PathBuf {
    PathBuf::from("ravens").join(format!("{image}.png"))
}

/// Item numbers run by a config, in order.
pub fn item_numbers(config: &RavensConfig) -> std::ops::Range<usize> {
    config.start_image..config.start_image + config.num_trials
}

pub fn answer_for(image: usize) -> Option<u8> {
    image.checked_sub(1).and_then(|i| ANSWER_KEY.get(i)).copied()
}

pub struct Ravens;

impl Ravens {
    fn instructions(screen_h: u32, example: ImageHandle, answers: ImageHandle) -> Scene {
        let mid = screen_h as f32 * 0.5;
        let line = |text: &str, y: f32| {
            Element::text(text, BODY_SIZE, BLACK).at(Position::new(Coord::At(100.0), Coord::At(mid + y)))
        };
        Scene::new(WHITE)
            .with(
                Element::text("Raven's Progressive Matrices", TITLE_SIZE, BLACK)
                    .at(Position::new(Coord::Center, Coord::At(mid - 400.0))),
            )
            .with(line("You will see a grid of items with one item missing:", -350.0))
            .with(Element::image(example).at(Position::new(Coord::Center, Coord::At(mid - 300.0))))
            .with(line("There will be a set of 8 possible answer options:", -100.0))
            .with(Element::image(answers).at(Position::new(Coord::Center, Coord::At(mid - 50.0))))
            .with(line("Determine which option is the missing item.", 150.0))
            .with(line("In example above, the correct answer is 4.", 180.0))
            .with(line(
                "Select your answer by pressing the corresponding number on the keyboard.",
                250.0,
            ))
            .with(line("You will have 1 minute to complete each question.", 280.0))
    }
}

impl Tabulate for Ravens {
    type Spec = RavensItem;

    fn sheet_name(&self) -> &'static str {
        "Ravens Matrices"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["trial", "image", "correctAnswer", "userAnswer", "correct", "RT"]
    }

    fn row(&self, number: usize, done: &CompletedTrial<RavensItem>) -> Vec<Cell> {
        let r = &done.result;
        vec![
            number.into(),
            done.trial.spec.image.into(),
            done.trial.spec.answer.into(),
            r.response.as_ref().and_then(Response::key).and_then(|k| k.digit()).into(),
            r.correct.into(),
            r.rt_ms.into(),
        ]
    }
}

impl Paradigm for Ravens {
    fn frames(&self, phase: TrialPhase, trial: &Trial<RavensItem>, result: Option<&TrialResult>) -> Vec<Frame> {
        match (phase, result) {
            (TrialPhase::Feedback, Some(r)) if trial.is_practice() => {
                vec![Frame::ms(feedback_scene(WHITE, r.correct, true), FEEDBACK_MS)]
            }
            _ => Vec::new(),
        }
    }

    fn response_window(&self, trial: &Trial<RavensItem>) -> ResponseWindow {
        let item = Scene::new(WHITE).with(Element::image(trial.spec.handle));
        let options: Vec<Key> = (1..=8).map(Key::Digit).collect();
        ResponseWindow::new(item, options)
            .deadline_ms(ITEM_MS)
            .countdown(Countdown {
                size: COUNTDOWN_SIZE,
                color: BLACK,
                at: Position::center_x(400.0),
            })
    }

    fn score(&self, trial: &Trial<RavensItem>, response: Option<&Response>) -> bool {
        response.and_then(Response::key) == Some(Key::Digit(trial.spec.answer))
    }

    fn inter_trial_interval(&self, trial: &Trial<RavensItem>, _outcome: &Outcome) -> Option<Duration> {
        (!trial.is_practice()).then(|| Duration::from_millis(ITI_MS))
    }

    fn iti_scene(&self, _trial: &Trial<RavensItem>) -> Scene {
        Scene::new(WHITE)
    }
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let config = ctl.config().ravens.clone();
    let (_, h) = ctl.screen_size();

    // Everything is loaded before the first screen so a missing file fails
    // before any trial starts.
    let mut items = Vec::with_capacity(config.num_trials);
    for image in item_numbers(&config) {
        let handle = ctl.load_image(item_path(image))?;
        let answer = answer_for(image).unwrap_or_default();
        items.push(RavensItem { image, answer, handle });
    }
    let practice_handle = ctl.load_image("ravens/practice/practice.png")?;
    let example = ctl.load_image("ravens/practice/example.png")?;
    let example_answers = ctl.load_image("ravens/practice/example_answers.png")?;
    tracing::debug!(items = items.len(), first = config.start_image, "ravens items loaded");

    let mut recorder = ResultRecorder::new();
    ctl.instructions(Ravens::instructions(h, example, example_answers))?;
    gate(ctl, WHITE, "We will begin with a practice trial...")?;
    let practice = Block::fixed(
        0,
        TrialType::Practice,
        vec![RavensItem {
            image: 0,
            answer: PRACTICE_ANSWER,
            handle: practice_handle,
        }],
    );
    ctl.run_block(&Ravens, &practice, &mut recorder)?;
    gate(ctl, WHITE, "We will now begin the main trials...")?;

    let main = Block::fixed(1, TrialType::Main, items);
    ctl.run_block(&Ravens, &main, &mut recorder)?;

    end_of_task(ctl, WHITE)?;
    Ok(recorder.finalize(&Ravens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_range_is_items_13_to_24() {
        let cfg = RavensConfig::default();
        let items: Vec<usize> = item_numbers(&cfg).collect();
        assert_eq!(items.first(), Some(&13));
        assert_eq!(items.last(), Some(&24));
        assert_eq!(answer_for(13), Some(2));
        assert_eq!(answer_for(36), Some(2));
        assert_eq!(answer_for(0), None);
        assert_eq!(answer_for(37), None);
    }

    #[test]
    fn timeout_is_incorrect_and_images_load_from_ravens_dir() {
        let t = Trial {
            spec: RavensItem {
                image: 13,
                answer: 2,
                handle: ImageHandle(0),
            },
            block: 1,
            trial_type: TrialType::Main,
            index: 0,
            block_len: 12,
        };
        assert!(!Ravens.score(&t, None));
        assert!(Ravens.score(&t, Some(&Response::Key(Key::Digit(2)))));
        assert_eq!(item_path(13), PathBuf::from("ravens/13.png"));
        let window = Ravens.response_window(&t);
        assert_eq!(window.deadline, Some(Duration::from_secs(60)));
        assert!(window.countdown.is_some());
    }
}
