pub mod format;
pub mod model;
pub mod reader;
pub mod writer;

pub use format::{infer_formatting, FormattingSpec, NumberFormat};
pub use model::{sheet_title, CellValue, MemorySource, Sheet, SheetError, SheetSource};
pub use reader::CalamineSource;
pub use writer::{
    column_width, write_direct, write_sheets, write_workbook, PlaceholderSheet, WorkbookReport,
};
