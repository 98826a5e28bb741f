use std::path::Path;

use ledgerport_core::{ConversionKind, ConversionRequest, TaskDetails};
use ledgerport_sheet::{CalamineSource, SheetError, SheetSource};
use serde_json::Value;
use tracing::info;

use super::{Converter, MethodChain, Outcome};
use crate::error::ConvertError;
use crate::progress::{ProgressReporter, ProgressSpan};

const SHEET_SPAN: ProgressSpan = ProgressSpan::new(20, 90);

/// Opens the workbook a conversion reads from.
pub type SourceOpener =
    Box<dyn Fn(&Path) -> Result<Box<dyn SheetSource>, SheetError> + Send + Sync>;

fn open_with_calamine(path: &Path) -> Result<Box<dyn SheetSource>, SheetError> {
    Ok(Box::new(CalamineSource::open(path)?))
}

/// Binary workbook to formatted `.xlsx`.
pub struct SpreadsheetConverter {
    open: SourceOpener,
    methods: MethodChain,
}

impl Default for SpreadsheetConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetConverter {
    pub fn new() -> Self {
        Self {
            open: Box::new(open_with_calamine),
            methods: MethodChain::default(),
        }
    }

    pub fn with_methods(mut self, methods: MethodChain) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_source(mut self, open: SourceOpener) -> Self {
        self.open = open;
        self
    }
}

impl Converter for SpreadsheetConverter {
    fn kind(&self) -> ConversionKind {
        ConversionKind::SpreadsheetToSpreadsheet
    }

    fn convert(
        &self,
        request: &ConversionRequest,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, ConvertError> {
        reporter.report(10, "Opening workbook");
        let mut source = (self.open)(&request.input_path)
            .map_err(|e| ConvertError::ParseFailure(e.to_string()))?;

        let names = source.sheet_names();
        info!(
            "Task {}: {} sheet(s) in {}",
            reporter.task_id(),
            names.len(),
            request.input_path.display()
        );
        reporter.report(20, format!("Found {} sheet(s)", names.len()));

        let result = self
            .methods
            .run(source.as_mut(), &request.output_path, reporter, SHEET_SPAN)?;

        let mut details: TaskDetails = result.details();
        details.insert(
            "source_sheets".into(),
            Value::Array(names.into_iter().map(Value::from).collect()),
        );
        Ok(Outcome {
            message: result.completion_message(),
            details,
        })
    }
}
