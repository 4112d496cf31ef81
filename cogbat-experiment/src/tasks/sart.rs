//! Sustained Attention to Response Task (Robertson et al., 1997).
//!
//! Go on every digit except 3. Each digit is shown briefly at a random
//! font size, then masked; a press anywhere in the 900 ms window counts.

use super::end_of_task;
use crate::block::Block;
use crate::error::Result;
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Frame, Outcome, Paradigm, ResponseMode, ResponseWindow, Tabulate};
use crate::session::{BODY_SIZE, SessionController, TITLE_SIZE, instruction_page};
use cogbat_core::{
    BLACK, Cell, CompletedTrial, Coord, Element, Key, Position, Response, Scene, SessionTable, Trial,
    TrialPhase, TrialResult, TrialType, WHITE,
};
use cogbat_timing::Timer;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::time::Duration;

const BLANK_MS: u64 = 500;
const STIMULUS_MS: u64 = 250;
const WINDOW_MS: u64 = 900;
const STIM_SIZES: [u32; 5] = [48, 72, 94, 100, 120];
const MASK_SIZE: f32 = 110.0;
const NO_GO: u8 = 3;
const PRACTICE_DIGITS: [u8; 10] = [5, 7, 7, 3, 9, 2, 1, 3, 8, 6];
const MAIN_REPEATS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SartTrial {
    pub digit: u8,
    pub size: u32,
}

fn with_sizes<R: Rng + ?Sized>(digits: impl IntoIterator<Item = u8>, rng: &mut R) -> Vec<SartTrial> {
    digits
        .into_iter()
        .map(|digit| SartTrial {
            digit,
            size: *STIM_SIZES.choose(rng).unwrap_or(&STIM_SIZES[0]),
        })
        .collect()
}

/// Press on go digits, withhold on the no-go digit.
pub fn is_correct(digit: u8, pressed: bool) -> bool {
    pressed != (digit == NO_GO)
}

pub struct Sart;

impl Sart {
    pub fn practice_block<R: Rng + ?Sized>(rng: &mut R) -> Block<SartTrial> {
        Block::fixed(0, TrialType::Practice, with_sizes(PRACTICE_DIGITS, rng))
    }

    pub fn main_block<R: Rng + ?Sized>(rng: &mut R) -> Block<SartTrial> {
        let digits = (0..MAIN_REPEATS).flat_map(|_| 1..=9u8);
        let pool = with_sizes(digits, rng);
        Block::shuffled(1, TrialType::Main, pool, rng)
    }

    fn instructions(screen_h: u32) -> Scene {
        let mid = screen_h as f32 * 0.5;
        let line = |text: &str, y: f32| Element::text(text, BODY_SIZE, WHITE).at(Position::new(Coord::At(100.0), Coord::At(y)));
        Scene::new(BLACK)
            .with(Element::text("SART", TITLE_SIZE, WHITE).at(Position::new(Coord::Center, Coord::At(mid - 250.0))))
            .with(line("Numbers will appear in the center of the screen.", mid - 150.0))
            .with(line("Press the spacebar after you see a number.", mid - 50.0))
            .with(line("However, if the number is a 3, do NOT press the spacebar.", mid + 50.0))
            .with(line("Please respond as quickly, and as accurately, as possible", mid + 150.0))
    }
}

impl Tabulate for Sart {
    type Spec = SartTrial;

    fn sheet_name(&self) -> &'static str {
        "SART"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["trial", "stimulus", "stimSize", "RT", "key press", "accuracy"]
    }

    fn row(&self, number: usize, done: &CompletedTrial<SartTrial>) -> Vec<Cell> {
        let r = &done.result;
        vec![
            number.into(),
            done.trial.spec.digit.into(),
            done.trial.spec.size.into(),
            r.rt_ms.into(),
            r.response.is_some().into(),
            r.correct.into(),
        ]
    }
}

impl Paradigm for Sart {
    fn frames(&self, _phase: TrialPhase, _trial: &Trial<SartTrial>, _result: Option<&TrialResult>) -> Vec<Frame> {
        Vec::new()
    }

    fn response_window(&self, trial: &Trial<SartTrial>) -> ResponseWindow {
        let digit = Scene::new(BLACK).with(Element::text(
            trial.spec.digit.to_string(),
            trial.spec.size as f32,
            WHITE,
        ));
        let mask = Scene::new(BLACK).with(Element::Mask {
            size: MASK_SIZE,
            color: WHITE,
            at: Position::CENTER,
        });
        ResponseWindow::new(digit, [Key::Space])
            .deadline_ms(WINDOW_MS)
            .mode(ResponseMode::FullWindow)
            .offset_ms(STIMULUS_MS, mask)
    }

    fn score(&self, trial: &Trial<SartTrial>, response: Option<&Response>) -> bool {
        is_correct(trial.spec.digit, response.is_some())
    }

    fn inter_trial_interval(&self, _trial: &Trial<SartTrial>, _outcome: &Outcome) -> Option<Duration> {
        None
    }

    fn iti_scene(&self, _trial: &Trial<SartTrial>) -> Scene {
        Scene::new(BLACK)
    }
}

pub fn run<F, T>(ctl: &mut SessionController<'_, F, T>) -> Result<SessionTable>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let (_, h) = ctl.screen_size();
    let mut recorder = ResultRecorder::new();

    ctl.instructions(Sart::instructions(h))?;
    ctl.instructions(instruction_page(BLACK, h, "", "We will begin with a few practice trials..."))?;
    ctl.blank(BLACK, Duration::from_millis(BLANK_MS))?;
    let practice = Sart::practice_block(ctl.rng());
    ctl.run_block(&Sart, &practice, &mut recorder)?;

    ctl.instructions(instruction_page(
        BLACK,
        h,
        "End of practice trials",
        "We will now begin the main trials...",
    ))?;
    ctl.blank(BLACK, Duration::from_millis(BLANK_MS))?;
    let main = Sart::main_block(ctl.rng());
    ctl.run_block(&Sart, &main, &mut recorder)?;

    end_of_task(ctl, BLACK)?;
    Ok(recorder.finalize(&Sart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::StimulusClock;
    use crate::config::BatteryConfig;
    use crate::simulate::{HeadlessFrontend, ScriptedParticipant, Step};
    use cogbat_timing::VirtualTimer;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn withholding_on_three_is_correct() {
        assert!(is_correct(3, false));
        assert!(!is_correct(3, true));
        assert!(is_correct(7, true));
        assert!(!is_correct(7, false));
    }

    #[test]
    fn main_block_has_each_digit_25_times() {
        let mut rng = StdRng::seed_from_u64(9);
        let block = Sart::main_block(&mut rng);
        assert_eq!(block.len(), 225);
        for d in 1..=9u8 {
            assert_eq!(block.specs.iter().filter(|t| t.digit == d).count(), 25);
        }
        assert!(block.specs.iter().all(|t| STIM_SIZES.contains(&t.size)));
    }

    #[test]
    fn no_go_trial_without_press_scores_na_but_correct() {
        let timer = VirtualTimer::new();
        let mut fe = HeadlessFrontend::new(
            timer.clone(),
            (800, 600),
            ScriptedParticipant::new(vec![Step::Miss, Step::key(400, Key::Space)]),
        );
        let cfg = BatteryConfig::default();
        let clock = StimulusClock::new(timer.clone(), Duration::from_millis(1));
        let mut ctl = SessionController::new(&mut fe, clock, StdRng::seed_from_u64(1), &cfg);
        let block = Block::fixed(
            1,
            TrialType::Main,
            vec![SartTrial { digit: 3, size: 48 }, SartTrial { digit: 4, size: 72 }],
        );
        let mut recorder = ResultRecorder::new();
        ctl.run_block(&Sart, &block, &mut recorder).unwrap();
        // each trial fills its whole window
        assert_eq!(timer.now_ms(), 1800);

        let table = recorder.finalize(&Sart);
        assert_eq!(table.rows[0][3], Cell::Na);
        assert_eq!(table.rows[0][4], Cell::Int(0));
        assert_eq!(table.rows[0][5], Cell::Int(1));
        assert_eq!(table.rows[1][3], Cell::Int(400));
        assert_eq!(table.rows[1][5], Cell::Int(1));
    }
}
