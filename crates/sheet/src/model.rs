use thiserror::Error;

/// Longest worksheet title the xlsx format accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_TITLE_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Failed to open workbook: {0}")]
    Open(String),
    #[error("Failed to read sheet '{sheet}': {detail}")]
    Read { sheet: String, detail: String },
    #[error("Sheet exceeds the worksheet row/column limits")]
    Limits,
    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// The value as a user would read it; used for column sizing.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// A named table: one header row followed by data rows, columns in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_header<I, V>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.header = header.into_iter().map(Into::into).collect();
        self
    }

    pub fn push_row<I, V>(&mut self, row: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Build a sheet from raw rows, promoting the first one to the header.
    pub fn from_rows(
        name: impl Into<String>,
        rows: impl IntoIterator<Item = Vec<CellValue>>,
    ) -> Self {
        let mut rows = rows.into_iter();
        let header = rows.next().unwrap_or_default();
        Sheet {
            name: name.into(),
            header,
            rows: rows.collect(),
        }
    }

    /// Header first, then data rows.
    pub fn all_rows(&self) -> impl Iterator<Item = &Vec<CellValue>> {
        std::iter::once(&self.header)
            .filter(|h| !h.is_empty())
            .chain(self.rows.iter())
    }

    pub fn column_count(&self) -> usize {
        self.all_rows().map(Vec::len).max().unwrap_or(0)
    }
}

/// Make a name acceptable as a worksheet title: forbidden characters become
/// `_`, surrounding apostrophes are dropped, and the result is truncated.
/// Distinct names may collide after truncation; that is not resolved here.
pub fn sheet_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_TITLE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'');
    let title: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();
    if title.trim().is_empty() {
        "Sheet".to_string()
    } else {
        title
    }
}

/// Anything the workbook writer can pull sheets from, one at a time.
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;
    fn read_sheet(&mut self, name: &str) -> Result<Sheet, SheetError>;
}

/// In-memory source. Entries can be registered as failing to exercise the
/// writer's per-sheet recovery.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sheets: Vec<(String, Result<Sheet, String>)>,
}

impl MemorySource {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self {
            sheets: sheets.into_iter().map(|s| (s.name.clone(), Ok(s))).collect(),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push((sheet.name.clone(), Ok(sheet)));
        self
    }

    pub fn with_failure(mut self, name: &str, detail: &str) -> Self {
        self.sheets.push((name.to_string(), Err(detail.to_string())));
        self
    }
}

impl SheetSource for MemorySource {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet, SheetError> {
        match self.sheets.iter().find(|(n, _)| n == name) {
            Some((_, Ok(sheet))) => Ok(sheet.clone()),
            Some((_, Err(detail))) => Err(SheetError::Read {
                sheet: name.to_string(),
                detail: detail.clone(),
            }),
            None => Err(SheetError::Read {
                sheet: name.to_string(),
                detail: "no such sheet".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_truncated_to_limit() {
        let long = "Relatorio consolidado de vendas do trimestre";
        let title = sheet_title(long);
        assert_eq!(title.chars().count(), MAX_SHEET_NAME_LEN);
        assert!(long.starts_with(&title));
    }

    #[test]
    fn title_truncation_counts_chars_not_bytes() {
        let name = "Ação".repeat(10);
        assert_eq!(sheet_title(&name).chars().count(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn title_replaces_forbidden_chars() {
        assert_eq!(sheet_title("Q1/Q2 [draft]"), "Q1_Q2 _draft_");
        assert_eq!(sheet_title("'quoted'"), "quoted");
        assert_eq!(sheet_title("   "), "Sheet");
    }

    #[test]
    fn display_text_for_numbers() {
        assert_eq!(CellValue::Number(1200.0).display_text(), "1200");
        assert_eq!(CellValue::Number(12.5).display_text(), "12.5");
        assert_eq!(CellValue::Bool(true).display_text(), "TRUE");
    }

    #[test]
    fn from_rows_promotes_header() {
        let sheet = Sheet::from_rows(
            "Data",
            vec![
                vec![CellValue::from("Name"), CellValue::from("Qty")],
                vec![CellValue::from("Apple"), CellValue::from(3i64)],
            ],
        );
        assert_eq!(sheet.header, vec![CellValue::from("Name"), CellValue::from("Qty")]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.column_count(), 2);
    }

    #[test]
    fn memory_source_reports_failures() {
        let mut source =
            MemorySource::new(vec![Sheet::new("Ok")]).with_failure("Broken", "corrupt");
        assert_eq!(source.sheet_names(), vec!["Ok".to_string(), "Broken".to_string()]);
        assert!(source.read_sheet("Ok").is_ok());
        let err = source.read_sheet("Broken").unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }
}
