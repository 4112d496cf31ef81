use cogbat_core::{Cell, SessionTable};
use cogbat_export::{ExportError, SubjectInfo, Workbook, list_workbooks, subject_exists};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

fn scratch_dir(tag: &str) -> PathBuf {
    static N: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "cogbat-export-{tag}-{}-{}",
        std::process::id(),
        N.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn sart_table() -> SessionTable {
    let mut t = SessionTable::new("SART", &["trial", "stimulus", "RT"]);
    t.push_row(vec![1usize.into(), 3u8.into(), Cell::Na]);
    t.push_row(vec![2usize.into(), 7u8.into(), 412u64.into()]);
    t
}

#[test]
fn sheets_keep_their_order_and_values() {
    let data = scratch_dir("order");
    let mut book = Workbook::create(&data, &SubjectInfo::new("7", "1")).unwrap();
    book.append_sheet(&sart_table()).unwrap();
    book.append_sheet(&SessionTable::new("Digit span (backwards)", &["trial"]))
        .unwrap();

    let reopened = Workbook::open(book.dir()).unwrap();
    assert_eq!(reopened.sheet_names(), vec!["info", "SART", "Digit span (backwards)"]);
    assert_eq!(reopened.subject(), "7");

    let sart = reopened.read_table("SART").unwrap();
    assert_eq!(sart, sart_table());
    let info = reopened.info().unwrap();
    assert_eq!(info.column("sub_num").unwrap(), vec![&Cell::Int(7)]);
}

#[test]
fn existing_subject_is_refused() {
    let data = scratch_dir("dup");
    Workbook::create(&data, &SubjectInfo::new("12", "1")).unwrap();
    assert!(subject_exists(&data, "12").unwrap());
    assert!(!subject_exists(&data, "1").unwrap());
    let err = Workbook::create(&data, &SubjectInfo::new("12", "2")).unwrap_err();
    assert!(matches!(err, ExportError::SubjectExists { .. }));
}

#[test]
fn duplicate_sheet_names_are_rejected() {
    let data = scratch_dir("sheet");
    let mut book = Workbook::create(&data, &SubjectInfo::new("3", "1")).unwrap();
    book.append_sheet(&sart_table()).unwrap();
    let err = book.append_sheet(&sart_table()).unwrap_err();
    assert!(matches!(err, ExportError::DuplicateSheet(name) if name == "SART"));
}

#[test]
fn workbooks_list_by_numeric_subject() {
    let data = scratch_dir("list");
    for sub in ["10", "9", "100"] {
        Workbook::create(&data, &SubjectInfo::new(sub, "1")).unwrap();
    }
    std::fs::write(data.join("notes.txt"), "ignore me").unwrap();
    let subjects: Vec<String> = list_workbooks(&data)
        .unwrap()
        .iter()
        .map(|b| b.subject().to_string())
        .collect();
    assert_eq!(subjects, vec!["9", "10", "100"]);
}

#[derive(Debug, Deserialize, PartialEq)]
struct SartRow {
    trial: u32,
    stimulus: u8,
    #[serde(rename = "RT")]
    rt: String,
}

#[test]
fn typed_rows_by_column_name() {
    let data = scratch_dir("typed");
    let mut book = Workbook::create(&data, &SubjectInfo::new("5", "1")).unwrap();
    book.append_sheet(&sart_table()).unwrap();
    let rows: Vec<SartRow> = book.read_sheet("SART").unwrap();
    assert_eq!(
        rows[0],
        SartRow {
            trial: 1,
            stimulus: 3,
            rt: "NA".into()
        }
    );
    assert!(matches!(
        book.read_sheet::<SartRow>("ANT"),
        Err(ExportError::MissingSheet { .. })
    ));
}

#[test]
fn zero_padded_labels_read_back_as_text() {
    let data = scratch_dir("padded");
    let mut book = Workbook::create(&data, &SubjectInfo::new("8", "1")).unwrap();
    let mut sternberg = SessionTable::new("Sternberg", &["trial", "set"]);
    sternberg.push_row(vec![1usize.into(), Cell::Text("0385".into())]);
    sternberg.push_row(vec![2usize.into(), Cell::Text("0".into())]);
    book.append_sheet(&sternberg).unwrap();

    let reopened = Workbook::open(book.dir()).unwrap();
    let read = reopened.read_table("Sternberg").unwrap();
    assert_eq!(read.rows[0], vec![Cell::Int(1), Cell::Text("0385".into())]);
    assert_eq!(read.rows[1], vec![Cell::Int(2), Cell::Int(0)]);
}

#[test]
fn unsafe_identities_never_touch_the_disk() {
    let data = scratch_dir("unsafe");
    for (sub, cond) in [("4_1", "1"), ("../4", "1"), ("4", "a/b")] {
        let err = Workbook::create(&data, &SubjectInfo::new(sub, cond)).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSubjectField { .. }), "{sub}/{cond}: {err}");
    }
    assert_eq!(std::fs::read_dir(&data).unwrap().count(), 0);
    assert!(matches!(
        Workbook::create(&data, &SubjectInfo::new("", "1")),
        Err(ExportError::EmptySubject)
    ));
}
