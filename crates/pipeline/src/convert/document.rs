use std::fs;
use std::sync::Arc;

use ledgerport_core::{ConversionKind, ConversionRequest, TaskDetails};
use ledgerport_extract::{document_digest, DocumentExtractor, PlaceholderExtractor};
use ledgerport_import::generate_now;
use serde_json::Value;
use tracing::{info, warn};

use super::{Converter, Outcome};
use crate::error::ConvertError;
use crate::progress::ProgressReporter;

/// Document to OFX statement through a pluggable [`DocumentExtractor`].
pub struct DocumentConverter {
    extractor: Arc<dyn DocumentExtractor>,
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter {
    pub fn new() -> Self {
        Self::with_extractor(Arc::new(PlaceholderExtractor))
    }

    pub fn with_extractor(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { extractor }
    }
}

impl Converter for DocumentConverter {
    fn kind(&self) -> ConversionKind {
        ConversionKind::DocumentToStatement
    }

    fn convert(
        &self,
        request: &ConversionRequest,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, ConvertError> {
        reporter.report(10, "Reading document");
        let digest = document_digest(&request.input_path)?;

        reporter.report(
            30,
            format!("Extracting transactions ({})", self.extractor.name()),
        );
        let extraction = self.extractor.extract(&request.input_path)?;
        if extraction.placeholder {
            warn!(
                "Task {}: {} extractor used, output holds sample data",
                reporter.task_id(),
                self.extractor.name()
            );
        }
        if extraction.transactions.is_empty() {
            return Err(ConvertError::ParseFailure(
                "No transactions extracted from document".to_string(),
            ));
        }

        reporter.report(60, "Generating statement");
        let text = generate_now(&extraction.transactions, &extraction.account);

        reporter.report(80, "Writing statement");
        fs::write(&request.output_path, text)?;
        info!(
            "Task {}: statement with {} transaction(s) written to {}",
            reporter.task_id(),
            extraction.transactions.len(),
            request.output_path.display()
        );

        let mut details = TaskDetails::new();
        details.insert("extractor".into(), Value::from(self.extractor.name()));
        details.insert("placeholder".into(), Value::from(extraction.placeholder));
        details.insert("source_sha256".into(), Value::from(digest));
        details.insert(
            "transactions".into(),
            Value::from(extraction.transactions.len()),
        );

        let message = if extraction.placeholder {
            format!(
                "Statement generated from sample data: {} transaction(s)",
                extraction.transactions.len()
            )
        } else {
            format!(
                "Statement generated: {} transaction(s)",
                extraction.transactions.len()
            )
        };
        Ok(Outcome { message, details })
    }
}
