use std::path::PathBuf;

use ledgerport_extract::ExtractError;
use ledgerport_import::StatementError;
use ledgerport_sheet::SheetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Input file not found: {}", .0.display())]
    InputMissing(PathBuf),
    #[error("Could not read source: {0}")]
    ParseFailure(String),
    #[error("Formatted conversion failed: {primary}; direct conversion failed: {fallback}")]
    ConversionFailure { primary: String, fallback: String },
    #[error("Output file missing after write: {}", .0.display())]
    OutputWriteFailure(PathBuf),
    #[error("Worker panicked")]
    WorkerPanicked,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),
}

impl From<StatementError> for ConvertError {
    fn from(e: StatementError) -> Self {
        match e {
            StatementError::NoTransactions => ConvertError::ParseFailure(e.to_string()),
            StatementError::Io(io) => ConvertError::Io(io),
        }
    }
}

impl ConvertError {
    /// Stable label recorded in task details.
    pub fn kind_label(&self) -> &'static str {
        match self {
            ConvertError::InputMissing(_) => "input_missing",
            ConvertError::ParseFailure(_) => "parse_failure",
            ConvertError::ConversionFailure { .. } => "conversion_failure",
            ConvertError::OutputWriteFailure(_) => "output_write_failure",
            ConvertError::WorkerPanicked => "worker_panicked",
            ConvertError::Io(_) => "io",
            ConvertError::Sheet(_) => "sheet",
            ConvertError::Extraction(_) => "extraction",
        }
    }

    /// Text shown to pollers in the task's `message` field.
    pub fn task_message(&self) -> String {
        match self {
            ConvertError::WorkerPanicked => self.to_string(),
            other => format!("Conversion failed: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_transactions_is_parse_failure() {
        let e: ConvertError = StatementError::NoTransactions.into();
        assert_eq!(e.kind_label(), "parse_failure");
    }

    #[test]
    fn conversion_failure_names_both_causes() {
        let e = ConvertError::ConversionFailure {
            primary: "disk full".into(),
            fallback: "still full".into(),
        };
        let msg = e.task_message();
        assert!(msg.starts_with("Conversion failed: "));
        assert!(msg.contains("disk full") && msg.contains("still full"));
    }

    #[test]
    fn panic_message_is_bare() {
        assert_eq!(ConvertError::WorkerPanicked.task_message(), "Worker panicked");
    }
}
