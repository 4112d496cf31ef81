//! Vandenberg & Kuse mental rotation test, keyboard edition.
//!
//! Items are answered on free-navigation pages rather than as paced
//! trials: Left/Right move between the items of a section, 1-4 toggle a
//! figure (at most two at once) and Return on the last item hands the
//! section in early. Each section closes on its own after three minutes.

use super::{end_of_task, gate};
use crate::block::Block;
use crate::error::{ExperimentError, Result};
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Countdown, Tabulate};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE};
use cogbat_core::{
    BLACK, BLUE, Cell, CompletedTrial, Coord, Element, ImageHandle, Key, Position, RED, Scene,
    SessionTable, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use std::path::PathBuf;
use std::time::Duration;

const SECTION_SECS: u64 = 180;
const SECTION_LEN: usize = 12;
const LABEL_SIZE: f32 = 20.0;
const SLOT_WIDTH: f32 = 180.0;
const SLOT_GAP: f32 = 40.0;
const DOT_RADIUS: f32 = 12.0;

/// Matching figures per item, 1 = a .. 4 = d.
pub const ANSWERS: [[u8; 2]; 24] = [
    [1, 3],
    [1, 4],
    [2, 4],
    [2, 3],
    [1, 3],
    [1, 4],
    [2, 4],
    [2, 3],
    [2, 4],
    [1, 4],
    [3, 4],
    [2, 3],
    [1, 2],
    [2, 4],
    [2, 3],
    [1, 4],
    [2, 4],
    [2, 3],
    [1, 3],
    [1, 4],
    [2, 4],
    [2, 3],
    [1, 4],
    [1, 3],
];

const PRACTICE_ANSWERS: [[u8; 2]; 3] = [[2, 3], [1, 4], [1, 3]];

/// Up to two chosen figures; 0 marks an empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub first: u8,
    pub second: u8,
}

impl Selection {
    /// Picking a chosen figure again drops it; a third pick is ignored.
    pub fn toggle(&mut self, option: u8) {
        if self.first == option {
            self.first = 0;
        } else if self.second == option {
            self.second = 0;
        } else if self.first == 0 {
            self.first = option;
        } else if self.second == 0 {
            self.second = option;
        }
    }

    pub fn contains(&self, option: u8) -> bool {
        option != 0 && (self.first == option || self.second == option)
    }

    pub fn is_complete(&self) -> bool {
        self.first != 0 && self.second != 0
    }

    /// Both matching figures chosen, in any order.
    pub fn matches(&self, answer: [u8; 2]) -> bool {
        self.is_complete() && answer.iter().all(|a| self.contains(*a))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemImages {
    pub question: ImageHandle,
    pub options: [ImageHandle; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MrtItem {
    /// Shown as "Q{label}".
    pub label: usize,
    pub answer: [u8; 2],
    pub images: ItemImages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MrtAnswer {
    pub item: MrtItem,
    pub selection: Selection,
}

fn image_paths(prefix: &str) -> (PathBuf, [PathBuf; 4]) {
    let dir = PathBuf::from("mrt");
    (
        dir.join(format!("{prefix}q.png")),
        ["a", "b", "c", "d"].map(|o| dir.join(format!("{prefix}{o}.png"))),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Ignored,
    Moved,
    Toggled,
    Finished,
}

/// Navigation state over one section.
#[derive(Debug, Clone)]
pub struct Pager {
    pub current: usize,
    pub selections: Vec<Selection>,
    /// Return only hands in once every item has two figures.
    require_complete: bool,
}

impl Pager {
    pub fn new(len: usize, require_complete: bool) -> Self {
        Self {
            current: 0,
            selections: vec![Selection::default(); len],
            require_complete,
        }
    }

    pub fn handle(&mut self, key: Key) -> PageEvent {
        let last = self.selections.len().saturating_sub(1);
        match key {
            Key::Left if self.current > 0 => {
                self.current -= 1;
                PageEvent::Moved
            }
            Key::Right if self.current < last => {
                self.current += 1;
                PageEvent::Moved
            }
            Key::Digit(d @ 1..=4) => {
                self.selections[self.current].toggle(d);
                PageEvent::Toggled
            }
            Key::Return if self.current == last => {
                if self.require_complete && !self.selections.iter().all(Selection::is_complete) {
                    PageEvent::Ignored
                } else {
                    PageEvent::Finished
                }
            }
            _ => PageEvent::Ignored,
        }
    }
}

pub struct Mrt {
    screen: (u32, u32),
}

impl Mrt {
    pub fn new(screen: (u32, u32)) -> Self {
        Self { screen }
    }

    /// One item with its selection boxes and the section's progress row.
    pub fn page(&self, items: &[MrtItem], pager: &Pager, timer: Option<(&str, bool)>) -> Scene {
        let (w, h) = (self.screen.0 as f32, self.screen.1 as f32);
        let (cx, cy) = (w * 0.5, h * 0.5);
        let item = &items[pager.current];
        let selection = pager.selections[pager.current];
        let label = |text: String, x: f32| {
            Element::text(text, LABEL_SIZE, BLACK).at(Position::new(Coord::At(x), Coord::At(cy - SLOT_WIDTH * 0.5 - 35.0)))
        };
        let slot = |x: f32| Position::new(Coord::At(x), Coord::At(cy - SLOT_WIDTH * 0.5));

        let mut scene = Scene::new(WHITE);
        let question_x = cx - 500.0;
        scene.push(Element::image(item.images.question).at(slot(question_x)));
        scene.push(label(format!("Q{}", item.label), question_x));

        let answer_x = cx - 200.0;
        for (i, handle) in item.images.options.iter().enumerate() {
            let x = answer_x + i as f32 * (SLOT_WIDTH + SLOT_GAP);
            let option = i as u8 + 1;
            scene.push(Element::image(*handle).at(slot(x)));
            scene.push(label(format!("{} ({})", option, char::from(b'a' + i as u8)), x));
            if selection.contains(option) {
                scene.push(Element::Outline {
                    width: SLOT_WIDTH,
                    height: SLOT_WIDTH,
                    thickness: 5.0,
                    color: BLUE,
                    at: slot(x),
                });
            }
        }

        // progress dots, filled once an item has two figures
        let n = pager.selections.len() as f32;
        for (i, s) in pager.selections.iter().enumerate() {
            let x = cx - n * DOT_RADIUS * 1.5 + i as f32 * DOT_RADIUS * 3.0;
            let at = Position::new(Coord::At(x), Coord::At(cy - 350.0));
            if s.is_complete() {
                scene.push(Element::Circle {
                    radius: DOT_RADIUS,
                    color: BLUE,
                    at,
                });
            } else {
                scene.push(Element::Outline {
                    width: DOT_RADIUS * 2.0,
                    height: DOT_RADIUS * 2.0,
                    thickness: 2.0,
                    color: BLACK,
                    at,
                });
            }
            if i == pager.current {
                scene.push(
                    Element::text("v", LABEL_SIZE, BLACK).at(Position::new(Coord::At(x + DOT_RADIUS * 0.5), Coord::At(cy - 400.0))),
                );
            }
        }

        let last = pager.current + 1 == pager.selections.len();
        let hint = if last {
            "Left / Right to move, 1-4 to choose, Return to finish"
        } else {
            "Left / Right to move, 1-4 to choose"
        };
        scene.push(Element::text(hint, LABEL_SIZE, BLACK).at(Position::center_x(250.0)));

        if let Some((text, warn)) = timer {
            let color = if warn { RED } else { BLACK };
            scene.push(Element::text(text, LABEL_SIZE, color).at(Position::center_x(300.0)));
        }
        scene
    }

    fn instructions(&self, figures: ImageHandle, different: ImageHandle) -> Scene {
        let mid = self.screen.1 as f32 * 0.5;
        let line = |text: &str, y: f32| Element::text(text, LABEL_SIZE, BLACK).at(Position::new(Coord::At(100.0), Coord::At(mid + y)));
        Scene::new(WHITE)
            .with(Element::text("Mental Rotation Task", TITLE_SIZE, BLACK).at(Position::new(Coord::Center, Coord::At(mid - 400.0))))
            .with(line("Please look at these five figures:", -300.0))
            .with(Element::image(figures).at(Position::new(Coord::Center, Coord::At(mid - 260.0))))
            .with(line(
                "Note that these are all pictures of the same object which is shown from different angles.",
                -60.0,
            ))
            .with(line(
                "Try to imagine moving the object (or yourself with respect to the object), as you look from one drawing to the next.",
                -10.0,
            ))
            .with(Element::image(different).at(Position::new(Coord::Center, Coord::At(mid + 80.0))))
            .with(line(
                "Above are two drawings of a new figure that is different from the one shown in the first 5 drawings.",
                280.0,
            ))
            .with(line(
                "Satisfy yourself that these two drawings show an object that is different, and cannot be rotated to be identical.",
                330.0,
            ))
    }

    fn practice_answers(&self) -> Scene {
        let mid = self.screen.1 as f32 * 0.5;
        let line = |text: String, y: f32| Element::text(text, BODY_SIZE, BLACK).at(Position::new(Coord::At(100.0), Coord::At(mid + y)));
        let mut scene = Scene::new(WHITE).with(line("The correct answers were:".into(), -200.0));
        for (i, [a, b]) in PRACTICE_ANSWERS.iter().enumerate() {
            let letter = |o: u8| char::from(b'a' + o - 1);
            scene.push(line(format!("Q{}: {} and {}", i + 1, letter(*a), letter(*b)), -120.0 + i as f32 * 60.0));
        }
        scene
    }
}

/// Runs one set of pages until Return on the last item or the time limit.
fn run_pages<F, T>(
    ctl: &mut SessionController<'_, F, T>,
    mrt: &Mrt,
    items: &[MrtItem],
    limit: Option<Duration>,
    require_complete: bool,
) -> Result<Vec<Selection>>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let mut pager = Pager::new(items.len(), require_complete);
    let start = ctl.clock().now();
    let mut shown_timer: Option<String> = None;
    let mut dirty = true;
    let mut new_page = true;

    loop {
        let elapsed = ctl.clock().elapsed(start);
        let remaining = limit.map(|l| l.saturating_sub(elapsed));
        if remaining == Some(Duration::ZERO) {
            tracing::info!(items = items.len(), "mrt section timed out");
            break;
        }

        let timer = remaining.map(|r| {
            let secs = r.as_millis().div_ceil(1000) as u64;
            let warn = secs % 60 == 0 || (secs <= 10 && secs % 2 == 0);
            (Countdown::label(r), warn)
        });
        if let Some((label, _)) = &timer {
            if shown_timer.as_ref() != Some(label) {
                shown_timer = Some(label.clone());
                dirty = true;
            }
        }

        if dirty {
            let page = mrt.page(items, &pager, timer.as_ref().map(|(l, w)| (l.as_str(), *w)));
            ctl.present(&page)?;
            if new_page {
                ctl.clear_input();
                new_page = false;
            }
            dirty = false;
        }

        let mut finished = false;
        for key in ctl.poll_keys() {
            if key == Key::Abort {
                tracing::warn!("abort key during mrt section");
                return Err(ExperimentError::Aborted);
            }
            match pager.handle(key) {
                PageEvent::Moved => {
                    dirty = true;
                    new_page = true;
                    // stale keys belong to the previous page
                    break;
                }
                PageEvent::Toggled => dirty = true,
                PageEvent::Finished => {
                    finished = true;
                    break;
                }
                PageEvent::Ignored => {}
            }
        }
        if finished {
            break;
        }
        if !dirty {
            ctl.clock().pause(remaining);
        }
    }
    Ok(pager.selections)
}

impl Tabulate for Mrt {
    type Spec = MrtAnswer;

    fn sheet_name(&self) -> &'static str {
        "MRT"
    }

    fn columns(&self) -> &'static [&'static str] {
        &[
            "trial",
            "correct_answer1",
            "correct_answer2",
            "user_answer1",
            "user_answer2",
            "correct",
        ]
    }

    fn row(&self, number: usize, done: &CompletedTrial<MrtAnswer>) -> Vec<Cell> {
        let MrtAnswer { item, selection } = done.trial.spec;
        vec![
            number.into(),
            item.answer[0].into(),
            item.answer[1].into(),
            selection.first.into(),
            selection.second.into(),
            done.result.correct.into(),
        ]
    }
}

fn load_item<F, T>(ctl: &mut SessionController<'_, F, T>, prefix: &str, label: usize, answer: [u8; 2]) -> Result<MrtItem>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let (q, opts) = image_paths(prefix);
    let question = ctl.load_image(q)?;
    let mut options = [ImageHandle(0); 4];
    for (slot, path) in options.iter_mut().zip(opts) {
        *slot = ctl.load_image(path)?;
    }
    Ok(MrtItem {
        label,
        answer,
        images: ItemImages { question, options },
    })
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let mrt = Mrt::new(ctl.screen_size());

    let figures = ctl.load_image("mrt/0a.png")?;
    let different = ctl.load_image("mrt/0b.png")?;
    let mut practice = Vec::with_capacity(PRACTICE_ANSWERS.len());
    for (i, answer) in PRACTICE_ANSWERS.iter().enumerate() {
        practice.push(load_item(ctl, &format!("p{}", i + 1), i + 1, *answer)?);
    }
    let mut items = Vec::with_capacity(ANSWERS.len());
    for (i, answer) in ANSWERS.iter().enumerate() {
        items.push(load_item(ctl, &(i + 1).to_string(), i + 1, *answer)?);
    }

    ctl.instructions(mrt.instructions(figures, different))?;
    gate(
        ctl,
        WHITE,
        "Here are 3 practice questions. For each question, 2 of the 4 pictures show the same object.",
    )?;
    run_pages(ctl, &mrt, &practice, None, true)?;
    ctl.instructions(mrt.practice_answers())?;
    gate(
        ctl,
        WHITE,
        "You will have 3 minutes to complete 12 questions. Choose the 2 matching figures for each question.",
    )?;
    gate(ctl, WHITE, "Ready?")?;

    let mut recorder = ResultRecorder::new();
    let limit = Duration::from_secs(SECTION_SECS);
    for (section, chunk) in items.chunks(SECTION_LEN).enumerate() {
        if section > 0 {
            gate(
                ctl,
                WHITE,
                "Take a quick break. We will do another block of 12 questions when you're ready.",
            )?;
        }
        let selections = run_pages(ctl, &mrt, chunk, Some(limit), false)?;
        let answers: Vec<MrtAnswer> = chunk
            .iter()
            .zip(selections)
            .map(|(item, selection)| MrtAnswer { item: *item, selection })
            .collect();
        let block = Block::fixed(section + 1, TrialType::Main, answers);
        for trial in block.trials() {
            let correct = trial.spec.selection.matches(trial.spec.item.answer);
            recorder.record(
                trial,
                TrialResult {
                    response: None,
                    rt_ms: None,
                    correct,
                    iti_ms: None,
                },
            );
        }
    }

    end_of_task(ctl, WHITE)?;
    Ok(recorder.finalize(&mrt))
}
