use cogbat_core::{Key, Scene};
use cogbat_experiment::simulate::Participant;
use cogbat_experiment::{
    Battery, BatteryConfig, CONTINUE_PROMPT, ExperimentError, HeadlessFrontend, MonkeyParticipant,
    TaskKind,
};
use cogbat_export::{SubjectInfo, Workbook};
use cogbat_timing::VirtualTimer;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::time::Duration;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cogbat-battery-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn small_config(data_dir: PathBuf) -> BatteryConfig {
    let mut cfg = BatteryConfig::default();
    cfg.general.seed = Some(7);
    cfg.general.data_dir = data_dir;
    cfg.ant.blocks = 1;
    cfg.sternberg.blocks = 1;
    cfg.flanker.sets_main = 2;
    cfg.flanker.sets_practice = 1;
    cfg.ravens.num_trials = 2;
    cfg
}

#[test]
fn monkey_runs_the_whole_battery() {
    let data = scratch_dir("monkey");
    let cfg = small_config(data.clone());
    let battery = Battery::new(cfg, TaskKind::ALL.to_vec()).unwrap();

    let timer = VirtualTimer::new();
    let mut fe = HeadlessFrontend::new(timer.clone(), (1280, 1024), MonkeyParticipant::new(3));
    let report = battery
        .run(&mut fe, timer.clone(), SubjectInfo::new("1", "1"))
        .unwrap();

    let rows: Vec<(TaskKind, usize)> = report.completed.clone();
    assert_eq!(
        rows,
        vec![
            (TaskKind::Ant, 96),
            (TaskKind::DigitSpan, 14),
            (TaskKind::Flanker, 8),
            (TaskKind::Mrt, 24),
            (TaskKind::Ravens, 2),
            (TaskKind::Sternberg, 48),
            (TaskKind::Sart, 225),
        ]
    );

    let book = Workbook::open(&report.workbook).unwrap();
    let mut expected = vec!["info"];
    expected.extend(TaskKind::ALL.iter().map(TaskKind::sheet_name));
    assert_eq!(book.sheet_names(), expected);
    assert!(fe.images().iter().any(|p| p.ends_with("ravens/13.png")));
    assert!(fe.presented().last().unwrap().contains_text("End of Experiment"));
}

/// Presses space on everything and aborts at the first digit entry.
struct AbortAtEntry;

impl Participant for AbortAtEntry {
    fn react(&mut self, scene: &Scene) -> Vec<(Duration, Key)> {
        if scene.contains_text("Type the sequence") {
            return vec![(Duration::from_millis(100), Key::Abort)];
        }
        let delay = if scene.contains_text(CONTINUE_PROMPT) { 200 } else { 300 };
        vec![(Duration::from_millis(delay), Key::Space)]
    }
}

#[test]
fn abort_keeps_finished_sheets() {
    let data = scratch_dir("abort");
    let battery = Battery::new(small_config(data.clone()), vec![TaskKind::Sart, TaskKind::DigitSpan]).unwrap();
    let timer = VirtualTimer::new();
    let mut fe = HeadlessFrontend::new(timer.clone(), (1280, 1024), AbortAtEntry);

    let err = battery
        .run(&mut fe, timer, SubjectInfo::new("2", "1"))
        .unwrap_err();
    assert!(matches!(err, ExperimentError::Aborted));

    let book = Workbook::open(&data.join("2_1")).unwrap();
    assert_eq!(book.sheet_names(), vec!["info", "SART"]);
    let sart = book.read_table("SART").unwrap();
    assert_eq!(sart.len(), 225);
}

#[test]
fn second_run_for_a_subject_is_refused() {
    let data = scratch_dir("dup");
    let battery = Battery::new(small_config(data.clone()), vec![TaskKind::Ravens]).unwrap();
    let timer = VirtualTimer::new();
    let mut fe = HeadlessFrontend::new(timer.clone(), (1280, 1024), MonkeyParticipant::new(1));
    battery
        .run(&mut fe, timer.clone(), SubjectInfo::new("5", "1"))
        .unwrap();
    let err = battery
        .run(&mut fe, timer, SubjectInfo::new("5", "2"))
        .unwrap_err();
    assert!(matches!(err, ExperimentError::Export(_)));
}
