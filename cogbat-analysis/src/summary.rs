use crate::error::{AnalysisError, Result};
use crate::tasks::{Group, Measures, ResponseFilter, aggregate};
use cogbat_core::{Cell, SessionTable};
use cogbat_export::{Workbook, list_workbooks};
use csv::WriterBuilder;
use std::collections::BTreeMap;
use std::path::Path;

pub const SUMMARY_FILE: &str = "battery_data.csv";

/// Info sheet columns carried into the summary, in output order.
const INFO_COLUMNS: [&str; 6] = ["sub_num", "datetime", "condition", "age", "sex", "RA"];

/// Everything one subject contributes to the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSummary {
    pub info: Vec<Cell>,
    pub groups: BTreeMap<Group, Measures>,
}

impl SubjectSummary {
    pub fn sub_num(&self) -> String {
        self.info.first().map(Cell::to_string).unwrap_or_default()
    }
}

/// Reads the info sheet and aggregates every task sheet of one workbook.
pub fn summarize_workbook(book: &Workbook, filter: ResponseFilter) -> Result<SubjectSummary> {
    let info = book.info()?;
    let first = info
        .rows
        .first()
        .ok_or_else(|| AnalysisError::EmptyInfo(book.subject().to_string()))?;
    let info: Vec<Cell> = INFO_COLUMNS
        .iter()
        .map(|c| info.column_index(c).map_or(Cell::Na, |i| first[i].clone()))
        .collect();

    let mut groups = BTreeMap::new();
    for sheet in book.sheet_names().into_iter().filter(|s| *s != "info") {
        let table = book.read_table(sheet)?;
        for (group, measures) in aggregate(&table, filter)? {
            groups.insert(group, measures);
        }
    }
    tracing::debug!(subject = book.subject(), groups = groups.len(), "workbook summarized");
    Ok(SubjectSummary { info, groups })
}

/// Joins subjects on the info columns. A task group appears only if some
/// subject has it; subjects without it get `NA`.
pub fn merge(subjects: &[SubjectSummary]) -> SessionTable {
    let mut layout: BTreeMap<Group, Vec<String>> = BTreeMap::new();
    for s in subjects {
        for (group, measures) in &s.groups {
            layout
                .entry(*group)
                .or_insert_with(|| measures.iter().map(|(name, _)| name.clone()).collect());
        }
    }

    let mut columns: Vec<&str> = INFO_COLUMNS.to_vec();
    columns.extend(layout.values().flatten().map(String::as_str));
    let mut table = SessionTable::new("battery_data", &columns);
    for s in subjects {
        let mut row = s.info.clone();
        for (group, names) in &layout {
            match s.groups.get(group) {
                Some(measures) => row.extend(names.iter().map(|name| {
                    measures
                        .iter()
                        .find(|(n, _)| n == name)
                        .map_or(Cell::Na, |(_, v)| v.clone())
                })),
                None => row.extend(names.iter().map(|_| Cell::Na)),
            }
        }
        table.push_row(row);
    }
    table
}

/// Summarizes every workbook under `data_dir`, sorted by subject number.
pub fn analyze(data_dir: &Path, filter: ResponseFilter) -> Result<SessionTable> {
    let books = list_workbooks(data_dir)?;
    if books.is_empty() {
        return Err(AnalysisError::NoWorkbooks(data_dir.to_path_buf()));
    }
    let mut subjects = Vec::with_capacity(books.len());
    for book in &books {
        tracing::info!(subject = book.subject(), "summarizing");
        subjects.push(summarize_workbook(book, filter)?);
    }
    Ok(merge(&subjects))
}

pub fn write_summary(table: &SessionTable, path: &Path) -> Result<()> {
    let csv_err = |source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new().from_path(path).map_err(csv_err)?;
    writer.write_record(&table.columns).map_err(csv_err)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::to_string)).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| csv_err(e.into()))?;
    tracing::info!(path = %path.display(), subjects = table.len(), "summary written");
    Ok(())
}
