use cogbat_analysis::{AnalysisError, ResponseFilter, analyze, write_summary};
use cogbat_core::{Cell, SessionTable};
use cogbat_export::{SubjectInfo, Workbook};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

fn scratch_dir(tag: &str) -> PathBuf {
    static N: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "cogbat-analysis-{tag}-{}-{}",
        std::process::id(),
        N.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn mrt(correct: &[bool]) -> SessionTable {
    let mut t = SessionTable::new("MRT", &["trial", "correct"]);
    for (i, c) in correct.iter().enumerate() {
        t.push_row(vec![(i + 1).into(), (*c).into()]);
    }
    t
}

fn sart() -> SessionTable {
    let mut t = SessionTable::new("SART", &["trial", "stimulus", "stimSize", "RT", "key press", "accuracy"]);
    t.push_row(vec![1usize.into(), 5u8.into(), 48u8.into(), 310u64.into(), true.into(), true.into()]);
    t.push_row(vec![2usize.into(), 3u8.into(), 72u8.into(), Cell::Na, false.into(), true.into()]);
    t.push_row(vec![3usize.into(), 8u8.into(), 94u8.into(), 290u64.into(), true.into(), true.into()]);
    t
}

fn column<'a>(table: &'a SessionTable, name: &str) -> Vec<&'a Cell> {
    table.column(name).unwrap_or_else(|| panic!("no column {name}"))
}

#[test]
fn subjects_merge_sorted_with_na_for_missing_tasks() {
    let data = scratch_dir("merge");
    let mut ten = SubjectInfo::new("10", "2");
    ten.age = Some(24);
    let mut book = Workbook::create(&data, &ten).unwrap();
    book.append_sheet(&sart()).unwrap();
    book.append_sheet(&mrt(&[true, true, false, true])).unwrap();

    let mut book = Workbook::create(&data, &SubjectInfo::new("9", "1")).unwrap();
    book.append_sheet(&mrt(&[false, true])).unwrap();

    let table = analyze(&data, ResponseFilter::Full).unwrap();
    assert_eq!(column(&table, "sub_num"), vec![&Cell::Int(9), &Cell::Int(10)]);
    assert_eq!(column(&table, "age"), vec![&Cell::Na, &Cell::Int(24)]);
    assert_eq!(column(&table, "mrt_count"), vec![&Cell::Int(1), &Cell::Int(3)]);
    assert_eq!(column(&table, "mrt_prop"), vec![&Cell::Float(0.5), &Cell::Float(0.75)]);
    assert_eq!(column(&table, "sart_total_rt"), vec![&Cell::Na, &Cell::Float(300.0)]);
    assert_eq!(column(&table, "sart_error_count"), vec![&Cell::Na, &Cell::Int(0)]);
    assert!(table.column("ant_conflict_slope").is_none());

    let out = data.join("summary.csv");
    write_summary(&table, &out).unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    let mut lines = written.lines();
    assert!(lines.next().unwrap().starts_with("sub_num,datetime,condition,age,sex,RA,mrt_count"));
    assert!(lines.next().unwrap().starts_with("9,"));
    assert!(lines.next().unwrap().contains(",NA,"));
}

#[test]
fn empty_data_dir_is_an_error() {
    let data = scratch_dir("empty");
    assert!(matches!(
        analyze(&data, ResponseFilter::Correct),
        Err(AnalysisError::NoWorkbooks(dir)) if dir == data
    ));
}
