//! One converter per conversion kind. A converter owns the task's progress
//! between 0 and 90; the dispatcher drives the rest of the lifecycle.

mod document;
mod spreadsheet;
mod statement;

use std::path::Path;
use std::sync::Arc;

use ledgerport_core::{ConversionKind, ConversionRequest, TaskDetails};
use ledgerport_sheet::{write_direct, write_workbook, PlaceholderSheet, SheetSource};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ConvertError;
use crate::progress::{ProgressReporter, ProgressSpan};

pub use document::DocumentConverter;
pub use spreadsheet::{SourceOpener, SpreadsheetConverter};
pub use statement::{statement_sheets, StatementConverter};

/// What a successful conversion reports back to the task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub message: String,
    pub details: TaskDetails,
}

pub trait Converter: Send + Sync {
    fn kind(&self) -> ConversionKind;

    /// Runs on a blocking thread. Must write `request.output_path` on success.
    fn convert(
        &self,
        request: &ConversionRequest,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, ConvertError>;
}

// ── Write methods ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodReport {
    pub sheets: usize,
    pub placeholders: Vec<PlaceholderSheet>,
}

/// One way of turning a sheet source into an output workbook.
pub trait ConversionMethod: Send + Sync {
    fn name(&self) -> &'static str;

    fn write(
        &self,
        source: &mut dyn SheetSource,
        destination: &Path,
        reporter: &ProgressReporter,
        span: ProgressSpan,
    ) -> Result<MethodReport, ConvertError>;
}

/// Inferred formatting, sized columns, per-sheet recovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormattedMethod;

impl ConversionMethod for FormattedMethod {
    fn name(&self) -> &'static str {
        "formatted"
    }

    fn write(
        &self,
        source: &mut dyn SheetSource,
        destination: &Path,
        reporter: &ProgressReporter,
        span: ProgressSpan,
    ) -> Result<MethodReport, ConvertError> {
        let report = write_workbook(source, destination, |index, total, name| {
            reporter.report(
                span.at(index, total),
                format!("Converting sheet {}/{}: {name}", index + 1, total),
            );
        })?;
        Ok(MethodReport {
            sheets: report.total_sheets(),
            placeholders: report.placeholders,
        })
    }
}

/// Values only. Used when the formatted method fails outright.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectMethod;

impl ConversionMethod for DirectMethod {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn write(
        &self,
        source: &mut dyn SheetSource,
        destination: &Path,
        reporter: &ProgressReporter,
        span: ProgressSpan,
    ) -> Result<MethodReport, ConvertError> {
        reporter.report(span.start, "Copying values without formatting");
        let sheets = write_direct(source, destination)?;
        Ok(MethodReport {
            sheets,
            placeholders: Vec::new(),
        })
    }
}

/// Primary method plus the fallback tried when it fails.
pub struct MethodChain {
    primary: Box<dyn ConversionMethod>,
    fallback: Box<dyn ConversionMethod>,
}

impl Default for MethodChain {
    fn default() -> Self {
        Self::new(Box::new(FormattedMethod), Box::new(DirectMethod))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainResult {
    pub method: &'static str,
    pub report: MethodReport,
    /// Why the primary method was abandoned, when the fallback ran.
    pub fallback_reason: Option<String>,
}

impl ChainResult {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }

    pub fn completion_message(&self) -> String {
        let sheets = self.report.sheets;
        let placeholders = self.report.placeholders.len();
        if self.used_fallback() {
            format!("Conversion completed: {sheets} sheet(s) (fallback method)")
        } else if placeholders > 0 {
            format!(
                "Conversion completed: {sheets} sheet(s), {placeholders} replaced by error placeholders"
            )
        } else {
            format!("Conversion completed: {sheets} sheet(s)")
        }
    }

    pub fn details(&self) -> TaskDetails {
        let mut details = TaskDetails::new();
        details.insert("method".into(), Value::from(self.method));
        details.insert("sheets".into(), Value::from(self.report.sheets));
        if !self.report.placeholders.is_empty() {
            let names: Vec<Value> = self
                .report
                .placeholders
                .iter()
                .map(|p| Value::from(p.source.as_str()))
                .collect();
            details.insert("placeholder_sheets".into(), Value::Array(names));
        }
        if let Some(reason) = &self.fallback_reason {
            details.insert("fallback_reason".into(), Value::from(reason.as_str()));
        }
        details
    }
}

impl MethodChain {
    pub fn new(primary: Box<dyn ConversionMethod>, fallback: Box<dyn ConversionMethod>) -> Self {
        Self { primary, fallback }
    }

    pub fn run(
        &self,
        source: &mut dyn SheetSource,
        destination: &Path,
        reporter: &ProgressReporter,
        span: ProgressSpan,
    ) -> Result<ChainResult, ConvertError> {
        let primary_err = match self.primary.write(source, destination, reporter, span) {
            Ok(report) => {
                return Ok(ChainResult {
                    method: self.primary.name(),
                    report,
                    fallback_reason: None,
                })
            }
            Err(e) => e,
        };

        warn!(
            "Task {}: {} method failed ({primary_err}), trying {}",
            reporter.task_id(),
            self.primary.name(),
            self.fallback.name()
        );
        discard_partial(destination);
        reporter.report(
            span.start,
            format!("Retrying with {} method", self.fallback.name()),
        );

        match self.fallback.write(source, destination, reporter, span) {
            Ok(report) => {
                info!(
                    "Task {}: {} method succeeded",
                    reporter.task_id(),
                    self.fallback.name()
                );
                Ok(ChainResult {
                    method: self.fallback.name(),
                    report,
                    fallback_reason: Some(primary_err.to_string()),
                })
            }
            Err(fallback_err) => {
                discard_partial(destination);
                Err(ConvertError::ConversionFailure {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }
}

fn discard_partial(destination: &Path) {
    match std::fs::remove_file(destination) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {e}", destination.display()),
    }
}

// ── Converter set ─────────────────────────────────────────────────────────────

/// The converter used for each conversion kind.
#[derive(Clone)]
pub struct ConverterSet {
    spreadsheet: Arc<dyn Converter>,
    statement: Arc<dyn Converter>,
    document: Arc<dyn Converter>,
}

impl Default for ConverterSet {
    fn default() -> Self {
        Self {
            spreadsheet: Arc::new(SpreadsheetConverter::new()),
            statement: Arc::new(StatementConverter::new()),
            document: Arc::new(DocumentConverter::new()),
        }
    }
}

impl ConverterSet {
    pub fn get(&self, kind: ConversionKind) -> Arc<dyn Converter> {
        match kind {
            ConversionKind::SpreadsheetToSpreadsheet => Arc::clone(&self.spreadsheet),
            ConversionKind::StatementToSpreadsheet => Arc::clone(&self.statement),
            ConversionKind::DocumentToStatement => Arc::clone(&self.document),
        }
    }

    /// Replace the converter registered for `converter.kind()`.
    pub fn with(mut self, converter: Arc<dyn Converter>) -> Self {
        match converter.kind() {
            ConversionKind::SpreadsheetToSpreadsheet => self.spreadsheet = converter,
            ConversionKind::StatementToSpreadsheet => self.statement = converter,
            ConversionKind::DocumentToStatement => self.document = converter,
        }
        self
    }
}
