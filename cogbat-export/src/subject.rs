use crate::error::{ExportError, Result};
use chrono::{DateTime, Local};
use cogbat_core::{Cell, SessionTable};
use serde::{Deserialize, Serialize};

pub const INFO_SHEET: &str = "info";

/// Who ran, when, and which tasks in which order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub datetime: DateTime<Local>,
    pub sub_num: String,
    pub condition: String,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub ra: Option<String>,
    /// Sheet names in run order.
    pub tasks: Vec<String>,
}

impl SubjectInfo {
    pub fn new(sub_num: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            datetime: Local::now(),
            sub_num: sub_num.into(),
            condition: condition.into(),
            age: None,
            sex: None,
            ra: None,
            tasks: Vec::new(),
        }
    }

    /// Both identity fields become one directory name, so neither may hold
    /// the `_` joiner, a path separator or `..`.
    pub fn validate(&self) -> Result<()> {
        if self.sub_num.trim().is_empty() {
            return Err(ExportError::EmptySubject);
        }
        for (field, value) in [("subject number", &self.sub_num), ("condition", &self.condition)] {
            let bad = value.is_empty() || value.contains(['_', '/', '\\']) || value.contains("..");
            if bad {
                return Err(ExportError::InvalidSubjectField {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// `<sub_num>_<condition>`, the workbook's directory name.
    pub fn workbook_name(&self) -> String {
        format!("{}_{}", self.sub_num, self.condition)
    }

    pub fn to_table(&self) -> SessionTable {
        let mut table = SessionTable::new(
            INFO_SHEET,
            &["datetime", "sub_num", "condition", "age", "sex", "RA", "tasks"],
        );
        table.push_row(vec![
            self.datetime.format("%Y-%m-%d %H:%M").to_string().into(),
            Cell::Text(self.sub_num.clone()),
            Cell::Text(self.condition.clone()),
            self.age.into(),
            self.sex.clone().into(),
            self.ra.clone().into(),
            self.tasks.join(", ").into(),
        ]);
        table
    }
}
