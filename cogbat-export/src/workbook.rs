use crate::error::{ExportError, Result};
use crate::subject::{INFO_SHEET, SubjectInfo};
use cogbat_core::{Cell, SessionTable};
use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub name: String,
    pub file: String,
}

/// Sheet order and subject identity, stored next to the sheet files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub subject: String,
    pub condition: String,
    pub sheets: Vec<SheetEntry>,
}

/// A subject's workbook directory.
#[derive(Debug, Clone)]
pub struct Workbook {
    dir: PathBuf,
    manifest: Manifest,
}

/// Writes through a sibling temp file so a crash never leaves a torn file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| ExportError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ExportError::io(path, e))
}

/// File-system safe sheet file name, e.g. "Digit span (backwards)" ->
/// "digit_span_backwards.csv".
fn sheet_file_name(sheet: &str) -> String {
    let mut out = String::with_capacity(sheet.len());
    for c in sheet.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    format!("{}.csv", if trimmed.is_empty() { "sheet" } else { trimmed })
}

/// Whether any workbook in `data_dir` belongs to `sub_num`, whatever its
/// condition.
pub fn subject_exists(data_dir: &Path, sub_num: &str) -> Result<bool> {
    if !data_dir.exists() {
        return Ok(false);
    }
    let entries = fs::read_dir(data_dir).map_err(|e| ExportError::io(data_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ExportError::io(data_dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.split_once('_').is_some_and(|(sub, _)| sub == sub_num) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Every workbook directly under `data_dir`, sorted by subject number
/// (numerically when both are numbers). Other entries are skipped.
pub fn list_workbooks(data_dir: &Path) -> Result<Vec<Workbook>> {
    let entries = fs::read_dir(data_dir).map_err(|e| ExportError::io(data_dir, e))?;
    let mut books = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ExportError::io(data_dir, e))?.path();
        if path.join(MANIFEST_FILE).is_file() {
            books.push(Workbook::open(&path)?);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-workbook entry");
        }
    }
    books.sort_by(|a, b| {
        match (a.subject().parse::<i64>(), b.subject().parse::<i64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.subject().cmp(b.subject()),
        }
    });
    Ok(books)
}

impl Workbook {
    /// Creates `<data_dir>/<sub_num>_<condition>/` and writes the info
    /// sheet. Refuses a subject number that already has a workbook.
    pub fn create(data_dir: &Path, info: &SubjectInfo) -> Result<Self> {
        info.validate()?;
        let dir = data_dir.join(info.workbook_name());
        if subject_exists(data_dir, &info.sub_num)? {
            return Err(ExportError::SubjectExists {
                subject: info.sub_num.clone(),
                dir,
            });
        }
        fs::create_dir_all(&dir).map_err(|e| ExportError::io(&dir, e))?;
        let mut book = Self {
            dir,
            manifest: Manifest {
                subject: info.sub_num.clone(),
                condition: info.condition.clone(),
                sheets: Vec::new(),
            },
        };
        book.append_sheet(&info.to_table())?;
        tracing::info!(dir = %book.dir.display(), subject = %info.sub_num, "workbook created");
        Ok(book)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(ExportError::NotAWorkbook(dir.to_path_buf()));
        }
        let raw = fs::read(&path).map_err(|e| ExportError::io(&path, e))?;
        let manifest = serde_json::from_slice(&raw).map_err(|source| ExportError::Manifest { path, source })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn subject(&self) -> &str {
        &self.manifest.subject
    }

    pub fn condition(&self) -> &str {
        &self.manifest.condition
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.manifest.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.manifest.sheets.iter().any(|s| s.name == name)
    }

    /// Writes the sheet file, then records it in the manifest.
    pub fn append_sheet(&mut self, table: &SessionTable) -> Result<()> {
        if self.has_sheet(&table.sheet) {
            return Err(ExportError::DuplicateSheet(table.sheet.clone()));
        }
        let mut file = sheet_file_name(&table.sheet);
        let mut n = 2;
        while self.manifest.sheets.iter().any(|s| s.file == file) {
            file = format!("{}_{n}.csv", file.trim_end_matches(".csv"));
            n += 1;
        }
        let path = self.dir.join(&file);

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        let csv_err = |source| ExportError::Csv {
            path: path.clone(),
            source,
        };
        writer.write_record(&table.columns).map_err(csv_err)?;
        for row in &table.rows {
            writer
                .write_record(row.iter().map(Cell::to_string))
                .map_err(csv_err)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::io(&path, e.into_error()))?;
        write_atomic(&path, &bytes)?;

        self.manifest.sheets.push(SheetEntry {
            name: table.sheet.clone(),
            file,
        });
        self.save_manifest()?;
        tracing::info!(sheet = %table.sheet, rows = table.len(), dir = %self.dir.display(), "sheet saved");
        Ok(())
    }

    fn save_manifest(&self) -> Result<()> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&self.manifest).map_err(|source| ExportError::Manifest {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &json)
    }

    fn sheet_path(&self, name: &str) -> Result<PathBuf> {
        self.manifest
            .sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| self.dir.join(&s.file))
            .ok_or_else(|| ExportError::MissingSheet {
                sheet: name.to_string(),
                dir: self.dir.clone(),
            })
    }

    /// Reads a sheet back as cells. `NA` and empty fields become `Cell::Na`.
    pub fn read_table(&self, name: &str) -> Result<SessionTable> {
        let path = self.sheet_path(name)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|source| ExportError::Csv {
                path: path.clone(),
                source,
            })?;
        let headers = reader
            .headers()
            .map_err(|source| ExportError::Csv {
                path: path.clone(),
                source,
            })?
            .clone();
        let columns: Vec<&str> = headers.iter().collect();
        let mut table = SessionTable::new(name, &columns);
        for record in reader.records() {
            let record = record.map_err(|source| ExportError::Csv {
                path: path.clone(),
                source,
            })?;
            table.rows.push(record.iter().map(Cell::parse).collect());
        }
        Ok(table)
    }

    /// Deserializes each row of a sheet into `T` by column name.
    pub fn read_sheet<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.sheet_path(name)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|source| ExportError::Csv {
                path: path.clone(),
                source,
            })?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|source| ExportError::Csv { path, source })
    }

    pub fn info(&self) -> Result<SessionTable> {
        self.read_table(INFO_SHEET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sheet_files_are_filesystem_safe() {
        assert_eq!(sheet_file_name("Digit span (backwards)"), "digit_span_backwards.csv");
        assert_eq!(sheet_file_name("ANT"), "ant.csv");
        assert_eq!(sheet_file_name("Raven's Matrices"), "raven_s_matrices.csv");
        assert_eq!(sheet_file_name("!!"), "sheet.csv");
    }
}
