use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader, Sheets};
use chrono::{NaiveTime, TimeDelta};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::model::{CellValue, Sheet, SheetError, SheetSource};

/// Workbook on disk, read through calamine (xlsb, xlsx, xls, ods).
pub struct CalamineSource {
    workbook: Sheets<BufReader<File>>,
    names: Vec<String>,
}

impl CalamineSource {
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let workbook = open_workbook_auto(path).map_err(|e| SheetError::Open(e.to_string()))?;
        let names = workbook.sheet_names().to_vec();
        Ok(Self { workbook, names })
    }
}

impl SheetSource for CalamineSource {
    fn sheet_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet, SheetError> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| SheetError::Read {
                sheet: name.to_string(),
                detail: e.to_string(),
            })?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_value).collect::<Vec<_>>());
        Ok(Sheet::from_rows(name, rows))
    }
}

pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) if f.is_finite() => CellValue::Number(*f),
        Data::Float(f) => CellValue::Text(f.to_string()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => date_cell(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{e:?}")),
    }
}

/// Largest serial (in days) handed to chrono; year 9999 is below 3 million.
const MAX_SERIAL_DAYS: f64 = 3.0e6;

/// Date cells become `YYYY-MM-DD` (time appended only when present) and
/// duration cells `[h]:mm:ss`. Serials chrono cannot represent stay numbers.
fn date_cell(dt: &ExcelDateTime) -> CellValue {
    let raw = dt.as_f64();
    if !raw.is_finite() || raw.abs() > MAX_SERIAL_DAYS {
        return CellValue::Number(raw);
    }
    let text = if dt.is_duration() {
        dt.as_duration().map(format_duration)
    } else {
        dt.as_datetime().map(|stamp| {
            if stamp.time() == NaiveTime::MIN {
                stamp.format("%Y-%m-%d").to_string()
            } else {
                stamp.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        })
    };
    text.map_or(CellValue::Number(raw), CellValue::Text)
}

fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    format!("{sign}{}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60)
}
