use cogbat_core::{ArrowDirection, Cell, Key, Scene, TrialType};
use cogbat_experiment::config::FlankerConfig;
use cogbat_experiment::tasks::flanker;
use cogbat_experiment::simulate::Participant;
use cogbat_experiment::tasks::flanker::{Compatibility, Flanker};
use cogbat_experiment::{
    BatteryConfig, BlockOrder, CONTINUE_PROMPT, HeadlessFrontend, ResultRecorder, SessionController,
    StimulusClock,
};
use cogbat_timing::VirtualTimer;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

/// Answers the centre arrow after 400 ms, except on the third stimulus.
struct CentreReader {
    seen: usize,
}

impl Participant for CentreReader {
    fn react(&mut self, scene: &Scene) -> Vec<(Duration, Key)> {
        let Some(arrows) = scene.texts().find(|t| t.contains('<') || t.contains('>')) else {
            return Vec::new();
        };
        self.seen += 1;
        if self.seen == 3 {
            return Vec::new();
        }
        let centre = arrows.chars().filter(|c| !c.is_whitespace()).nth(2);
        let key = if centre == Some('<') { Key::Left } else { Key::Right };
        vec![(Duration::from_millis(400), key)]
    }
}

#[test]
fn eight_trial_block_numbers_rows_and_marks_the_miss() {
    let timer = VirtualTimer::new();
    let mut fe = HeadlessFrontend::new(timer.clone(), (1280, 1024), CentreReader { seen: 0 });
    let cfg = BatteryConfig::default();
    let clock = StimulusClock::new(timer.clone(), Duration::from_millis(1));
    let mut ctl = SessionController::new(&mut fe, clock, StdRng::seed_from_u64(42), &cfg);

    let flanker = Flanker::new(&FlankerConfig::default());
    let block = Flanker::block(1, TrialType::Main, Compatibility::Compatible, 2, ctl.rng());
    assert_eq!(block.len(), 8);
    let lefts = block
        .specs
        .iter()
        .filter(|s| s.direction == ArrowDirection::Left)
        .count();
    assert_eq!(lefts, 4);

    let mut recorder = ResultRecorder::new();
    ctl.run_block(&flanker, &block, &mut recorder).unwrap();
    let table = recorder.finalize(&flanker);

    assert_eq!(table.len(), 8);
    let numbers: Vec<String> = table
        .column("trial")
        .unwrap()
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(numbers, vec!["1", "2", "3", "4", "5", "6", "7", "8"]);

    let correct: Vec<&Cell> = table.column("correct").unwrap();
    let rts: Vec<&Cell> = table.column("RT").unwrap();
    let responses: Vec<&Cell> = table.column("response").unwrap();
    for i in 0..8 {
        if i == 2 {
            assert_eq!(correct[i], &Cell::Int(0));
            assert_eq!(rts[i], &Cell::Na);
            assert_eq!(responses[i], &Cell::Na);
        } else {
            assert_eq!(correct[i], &Cell::Int(1), "row {}", i + 1);
            assert_eq!(rts[i], &Cell::Int(400));
        }
    }

    // fixation 1000 + response + feedback 1500 + ITI 1500 (none after the last)
    let expected = 8 * 1000 + (7 * 400 + 1500) + 8 * 1500 + 7 * 1500;
    assert_eq!(timer.now_ms(), expected);
}

/// Passes every gate with Space, answers every stimulus with Left and keeps
/// the body text of each gate it passed.
#[derive(Default)]
struct GateLog {
    gates: Vec<String>,
}

impl Participant for GateLog {
    fn react(&mut self, scene: &Scene) -> Vec<(Duration, Key)> {
        if scene.contains_text(CONTINUE_PROMPT) {
            let body = if scene.contains_text("Eriksen Flanker Task") {
                "Eriksen Flanker Task"
            } else {
                scene.texts().find(|t| !t.is_empty() && *t != CONTINUE_PROMPT).unwrap_or("")
            };
            self.gates.push(body.to_string());
            return vec![(Duration::from_millis(50), Key::Space)];
        }
        if scene.texts().any(|t| t.contains('<') || t.contains('>')) {
            return vec![(Duration::from_millis(300), Key::Left)];
        }
        Vec::new()
    }
}

#[test]
fn second_half_opens_on_its_own_gate() {
    let timer = VirtualTimer::new();
    let mut fe = HeadlessFrontend::new(timer.clone(), (1280, 1024), GateLog::default());
    let mut cfg = BatteryConfig::default();
    cfg.flanker = FlankerConfig {
        sets_practice: 1,
        sets_main: 1,
        blocks_compat: 1,
        blocks_incompat: 1,
        block_order: BlockOrder::Compatible,
        ..FlankerConfig::default()
    };
    let clock = StimulusClock::new(timer.clone(), Duration::from_millis(1));
    let mut ctl = SessionController::new(&mut fe, clock, StdRng::seed_from_u64(7), &cfg);

    let table = flanker::run(&mut ctl).unwrap();
    // practice rows are not kept: two main blocks of one four-trial set
    assert_eq!(table.len(), 8);
    drop(ctl);

    assert_eq!(
        fe.participant().gates,
        vec![
            "Eriksen Flanker Task",
            "We'll begin with some practice trials...",
            "We will now begin the main trials...",
            "Second half instructions",
            "We will now begin the main trials...",
            "End of task",
        ]
    );
}
