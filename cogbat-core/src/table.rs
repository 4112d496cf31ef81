use std::fmt;

/// A single sheet value. Missing values print as `NA`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Na,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(s) => s.parse().ok(),
            Cell::Na => None,
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Cell::Na)
    }

    /// Parses a value read back from a sheet file. Zero-padded digit
    /// strings such as "0385" stay text.
    pub fn parse(raw: &str) -> Cell {
        if raw.is_empty() || raw == "NA" {
            return Cell::Na;
        }
        let digits = raw.strip_prefix('-').unwrap_or(raw);
        let zero_padded = digits.len() > 1 && digits.starts_with('0') && digits.bytes().all(|b| b.is_ascii_digit());
        if zero_padded {
            return Cell::Text(raw.to_string());
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Cell::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return Cell::Float(v);
        }
        Cell::Text(raw.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) if v.is_finite() => write!(f, "{v}"),
            Cell::Float(_) => f.write_str("NA"),
            Cell::Text(s) => f.write_str(s),
            Cell::Na => f.write_str("NA"),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<u64> for Cell {
    fn from(v: u64) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<u8> for Cell {
    fn from(v: u8) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Na, Into::into)
    }
}

/// Ordered rows with named columns, one per completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTable {
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SessionTable {
    pub fn new(sheet: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            sheet: sheet.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn na_for_missing_values() {
        assert_eq!(Cell::from(None::<u64>).to_string(), "NA");
        assert_eq!(Cell::from(Some(450u64)).to_string(), "450");
        assert_eq!(Cell::from(f64::NAN).to_string(), "NA");
        assert_eq!(Cell::from(true), Cell::Int(1));
    }

    #[test]
    fn parse_round_trips_sheet_text() {
        assert_eq!(Cell::parse("NA"), Cell::Na);
        assert_eq!(Cell::parse(""), Cell::Na);
        assert_eq!(Cell::parse("12"), Cell::Int(12));
        assert_eq!(Cell::parse("0"), Cell::Int(0));
        assert_eq!(Cell::parse("0.5"), Cell::Float(0.5));
        assert_eq!(Cell::parse("0385"), Cell::Text("0385".into()));
        assert_eq!(Cell::parse("left"), Cell::Text("left".into()));
    }

    #[test]
    fn columns_by_name() {
        let mut t = SessionTable::new("SART", &["trial", "RT"]);
        t.push_row(vec![1usize.into(), Cell::Na]);
        t.push_row(vec![2usize.into(), 300u64.into()]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("RT").unwrap(), vec![&Cell::Na, &Cell::Int(300)]);
        assert!(t.column("missing").is_none());
    }
}
