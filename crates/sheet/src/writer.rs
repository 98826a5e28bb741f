use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::format::infer_formatting;
use crate::model::{
    sheet_title, CellValue, MemorySource, Sheet, SheetError, SheetSource, MAX_SHEET_NAME_LEN,
};

pub const MIN_COLUMN_WIDTH: usize = 8;
pub const MAX_COLUMN_WIDTH: usize = 50;
const COLUMN_PADDING: usize = 2;

/// A sheet that could not be converted and was replaced by a one-cell notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSheet {
    pub source: String,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookReport {
    pub sheets_written: Vec<String>,
    pub placeholders: Vec<PlaceholderSheet>,
}

impl WorkbookReport {
    pub fn total_sheets(&self) -> usize {
        self.sheets_written.len() + self.placeholders.len()
    }
}

/// Width for a column whose longest value has `max_text_len` characters.
pub fn column_width(max_text_len: usize) -> usize {
    (max_text_len + COLUMN_PADDING).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

/// Formatted conversion. Every sheet of `source` is written with inferred
/// formatting, sized columns and bordered cells. A sheet that fails to read
/// or build is replaced by a placeholder carrying the error and the writer
/// moves on; only a failure to save the document is returned as an error.
///
/// `on_sheet(index, total, name)` fires before each sheet is processed.
pub fn write_workbook<S, F>(
    source: &mut S,
    destination: &Path,
    mut on_sheet: F,
) -> Result<WorkbookReport, SheetError>
where
    S: SheetSource + ?Sized,
    F: FnMut(usize, usize, &str),
{
    let names = source.sheet_names();
    let mut workbook = Workbook::new();
    let mut report = WorkbookReport::default();
    let mut used_titles: HashSet<String> = HashSet::new();

    for (index, name) in names.iter().enumerate() {
        on_sheet(index, names.len(), name);

        match source.read_sheet(name).and_then(|sheet| formatted_worksheet(&sheet)) {
            Ok(worksheet) => {
                debug!("Sheet converted: {name}");
                workbook.push_worksheet(worksheet);
                let title = sheet_title(name);
                used_titles.insert(title.to_lowercase());
                report.sheets_written.push(title);
            }
            Err(e) => {
                warn!("Sheet '{name}' replaced by placeholder: {e}");
                let title = placeholder_title(name, &used_titles);
                used_titles.insert(title.to_lowercase());
                workbook.push_worksheet(placeholder_worksheet(&title, name, &e.to_string())?);
                report.placeholders.push(PlaceholderSheet {
                    source: name.clone(),
                    title,
                    error: e.to_string(),
                });
            }
        }
    }

    if names.is_empty() {
        workbook.add_worksheet();
    }

    workbook.save(destination)?;
    Ok(report)
}

/// Formatted write of sheets already held in memory.
pub fn write_sheets(sheets: &[Sheet], destination: &Path) -> Result<WorkbookReport, SheetError> {
    let mut source = MemorySource::new(sheets.to_vec());
    write_workbook(&mut source, destination, |_, _, _| {})
}

/// Minimal transcription: values only, no formatting, no column sizing and
/// no per-sheet recovery. The first failing sheet aborts the write.
/// Returns the number of sheets written.
pub fn write_direct<S>(source: &mut S, destination: &Path) -> Result<usize, SheetError>
where
    S: SheetSource + ?Sized,
{
    let names = source.sheet_names();
    let mut workbook = Workbook::new();

    for name in &names {
        let sheet = source.read_sheet(name)?;
        let mut worksheet = Worksheet::new();
        worksheet.set_name(sheet_title(name))?;
        for (r, row) in sheet.all_rows().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (row_num, col_num) = cell_position(r, c)?;
                write_cell(&mut worksheet, row_num, col_num, value, None)?;
            }
        }
        workbook.push_worksheet(worksheet);
    }

    if names.is_empty() {
        workbook.add_worksheet();
    }

    workbook.save(destination)?;
    Ok(names.len())
}

fn formatted_worksheet(sheet: &Sheet) -> Result<Worksheet, SheetError> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_title(&sheet.name))?;

    let mut longest = vec![0usize; sheet.column_count()];
    for (r, row) in sheet.all_rows().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let (row_num, col_num) = cell_position(r, c)?;
            let mut spec = infer_formatting(value);
            spec.border = true;
            write_cell(&mut worksheet, row_num, col_num, value, Some(&spec.to_format()))?;
            longest[c] = longest[c].max(value.display_text().chars().count());
        }
    }

    for (c, len) in longest.into_iter().enumerate() {
        let (_, col_num) = cell_position(0, c)?;
        worksheet.set_column_width(col_num, column_width(len) as f64)?;
    }

    Ok(worksheet)
}

/// `Error_<name>`, made unique against titles already in the workbook
/// (case-insensitively) by a ` (n)` suffix that survives truncation.
fn placeholder_title(source: &str, used: &HashSet<String>) -> String {
    let base = sheet_title(&format!("Error_{source}"));
    if !used.contains(&base.to_lowercase()) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
            let head: String = base.chars().take(keep).collect();
            format!("{head}{suffix}")
        })
        .find(|title| !used.contains(&title.to_lowercase()))
        .unwrap_or(base)
}

fn placeholder_worksheet(title: &str, source: &str, error: &str) -> Result<Worksheet, SheetError> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(title)?;
    worksheet.write_string(0, 0, format!("Failed to convert sheet '{source}': {error}"))?;
    worksheet.set_column_width(0, MAX_COLUMN_WIDTH as f64)?;
    Ok(worksheet)
}

fn cell_position(row: usize, col: usize) -> Result<(u32, u16), SheetError> {
    let row = u32::try_from(row).map_err(|_| SheetError::Limits)?;
    let col = u16::try_from(col).map_err(|_| SheetError::Limits)?;
    Ok((row, col))
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (CellValue::Empty, _) => {}
        (CellValue::Number(n), Some(f)) => {
            worksheet.write_number_with_format(row, col, *n, f)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
        (CellValue::Text(s), Some(f)) => {
            worksheet.write_string_with_format(row, col, s, f)?;
        }
        (CellValue::Text(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (CellValue::Bool(b), Some(f)) => {
            worksheet.write_boolean_with_format(row, col, *b, f)?;
        }
        (CellValue::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CalamineSource;
    use std::io::Read;

    fn package_part(path: &Path, part: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut xml = String::new();
        archive.by_name(part).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    fn sales_sheet(name: &str) -> Sheet {
        let mut sheet = Sheet::new(name).with_header(["Produto", "Quantidade", "Valor"]);
        sheet.push_row([
            CellValue::from("Cafe"),
            CellValue::Number(3.0),
            CellValue::Number(12.5),
        ]);
        sheet.push_row([
            CellValue::from("TOTAL"),
            CellValue::Empty,
            CellValue::Number(12.5),
        ]);
        sheet
    }

    #[test]
    fn column_width_is_clamped() {
        assert_eq!(column_width(0), 8);
        assert_eq!(column_width(6), 8);
        assert_eq!(column_width(10), 12);
        assert_eq!(column_width(48), 50);
        assert_eq!(column_width(300), 50);
    }

    #[test]
    fn formatted_write_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");

        let report = write_sheets(&[sales_sheet("Vendas"), sales_sheet("Compras")], &out).unwrap();
        assert_eq!(report.sheets_written, vec!["Vendas".to_string(), "Compras".to_string()]);
        assert!(report.placeholders.is_empty());

        let mut back = CalamineSource::open(&out).unwrap();
        assert_eq!(back.sheet_names(), vec!["Vendas".to_string(), "Compras".to_string()]);
        let sheet = back.read_sheet("Vendas").unwrap();
        assert_eq!(sheet.header, sales_sheet("x").header);
        assert_eq!(sheet.rows[0][2], CellValue::Number(12.5));
        assert_eq!(sheet.rows[1][0], CellValue::from("TOTAL"));
    }

    #[test]
    fn formatting_reaches_the_package() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        write_sheets(&[sales_sheet("Vendas")], &out).unwrap();

        // Widths 9, 12 and 8 in Calibri 11 character units.
        let sheet = package_part(&out, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<col min="1" max="1" width="9.7109375" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<col min="2" max="2" width="12.7109375" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<col min="3" max="3" width="8.7109375" customWidth="1"/>"#));

        // Eight non-empty cells, each carrying a style.
        assert_eq!(sheet.matches("<c r=").count(), 8);
        assert_eq!(sheet.matches(r#" s=""#).count(), 8);

        let styles = package_part(&out, "xl/styles.xml");
        assert!(styles.contains(r##"formatCode="#,##0""##));
        assert!(styles.contains(r##"formatCode="#,##0.00""##));
        assert!(styles.contains(r#"<left style="thin">"#));
        assert!(styles.contains(r#"<bottom style="thin">"#));
        assert!(styles.contains(r#"rgb="FFD3D3D3""#));
    }

    #[test]
    fn failing_sheet_becomes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let mut source = MemorySource::new(vec![sales_sheet("Jan")])
            .with_failure("Fev", "corrupt record stream")
            .with_sheet(sales_sheet("Mar"));

        let mut seen = Vec::new();
        let report = write_workbook(&mut source, &out, |i, total, name| {
            seen.push((i, total, name.to_string()))
        })
        .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(report.sheets_written, vec!["Jan".to_string(), "Mar".to_string()]);
        assert_eq!(report.placeholders.len(), 1);
        assert_eq!(report.placeholders[0].title, "Error_Fev");
        assert!(report.placeholders[0].error.contains("corrupt record stream"));

        let mut back = CalamineSource::open(&out).unwrap();
        assert_eq!(
            back.sheet_names(),
            vec!["Jan".to_string(), "Error_Fev".to_string(), "Mar".to_string()]
        );
        let notice = back.read_sheet("Error_Fev").unwrap();
        match &notice.header[0] {
            CellValue::Text(t) => assert!(t.contains("corrupt record stream")),
            other => panic!("unexpected placeholder cell: {other:?}"),
        }
        assert_eq!(back.read_sheet("Mar").unwrap().rows.len(), 2);
    }

    #[test]
    fn failing_sheets_with_shared_prefix_get_distinct_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let mut source = MemorySource::new(vec![sales_sheet("Resumo")])
            .with_failure("Relatorio mensal de vendas - Jan", "bad jan")
            .with_failure("Relatorio mensal de vendas - Fev", "bad fev")
            .with_failure("Relatorio mensal de vendas - Mar", "bad mar");

        let report = write_workbook(&mut source, &out, |_, _, _| {}).unwrap();

        let titles: Vec<_> = report.placeholders.iter().map(|p| p.title.clone()).collect();
        assert_eq!(
            titles,
            vec![
                "Error_Relatorio mensal de venda".to_string(),
                "Error_Relatorio mensal de v (2)".to_string(),
                "Error_Relatorio mensal de v (3)".to_string(),
            ]
        );
        assert!(titles.iter().all(|t| t.chars().count() <= MAX_SHEET_NAME_LEN));

        let back = CalamineSource::open(&out).unwrap();
        assert_eq!(back.sheet_names().len(), 4);
    }

    #[test]
    fn placeholder_title_avoids_converted_sheet_titles() {
        let used: HashSet<String> = ["error_fev".to_string()].into_iter().collect();
        assert_eq!(placeholder_title("Fev", &used), "Error_Fev (2)");
        assert_eq!(placeholder_title("Mar", &used), "Error_Mar");
    }

    #[test]
    fn direct_write_aborts_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let mut source = MemorySource::new(vec![sales_sheet("Jan")]).with_failure("Fev", "bad");
        assert!(matches!(
            write_direct(&mut source, &out),
            Err(SheetError::Read { .. })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn direct_write_transcribes_values() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let mut source = MemorySource::new(vec![sales_sheet("Jan")]);
        assert_eq!(write_direct(&mut source, &out).unwrap(), 1);
        let mut back = CalamineSource::open(&out).unwrap();
        assert_eq!(back.read_sheet("Jan").unwrap().rows.len(), 2);
    }

    #[test]
    fn long_sheet_names_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let name = "Demonstrativo de resultados do exercicio";
        let report = write_sheets(&[sales_sheet(name)], &out).unwrap();
        assert_eq!(report.sheets_written[0].chars().count(), 31);
        let back = CalamineSource::open(&out).unwrap();
        assert_eq!(back.sheet_names(), report.sheets_written);
    }
}
