use std::path::Path;

use ledgerport_core::{AccountInfo, TransactionRecord};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Document not readable: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("Extraction engine error: {0}")]
    Engine(String),
}

/// Transactions pulled out of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub account: AccountInfo,
    pub transactions: Vec<TransactionRecord>,
    /// True when the records are canned sample data rather than document
    /// content.
    pub placeholder: bool,
}

/// Strategy for turning a document into statement transactions.
/// Implementations receive the path of the uploaded file.
pub trait DocumentExtractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError>;
}

// ── Placeholder (no layout analysis) ──────────────────────────────────────────

/// Not a real extractor: checks that the document is readable and returns a
/// fixed sample statement regardless of its content.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderExtractor;

impl PlaceholderExtractor {
    pub const NAME: &'static str = "placeholder";

    pub fn sample_transactions() -> Vec<TransactionRecord> {
        vec![
            sample(
                "2024-01-05",
                "DEBIT",
                Decimal::new(-15000, 2),
                "Pagamento de boleto",
                "DOC0001",
            ),
            sample(
                "2024-01-10",
                "CREDIT",
                Decimal::new(250000, 2),
                "Transferencia recebida",
                "DOC0002",
            ),
            sample(
                "2024-01-15",
                "DEBIT",
                Decimal::new(-8990, 2),
                "Compra cartao de debito",
                "DOC0003",
            ),
        ]
    }

    pub fn sample_account() -> AccountInfo {
        AccountInfo {
            bank_id: "0001".to_string(),
            account_id: "00000-0".to_string(),
            ..AccountInfo::default()
        }
    }
}

fn sample(
    date: &str,
    trn_type: &str,
    amount: Decimal,
    memo: &str,
    fit_id: &str,
) -> TransactionRecord {
    let mut trx = TransactionRecord::new(date, trn_type, amount, memo);
    trx.external_id = fit_id.to_string();
    trx
}

impl DocumentExtractor for PlaceholderExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let meta = std::fs::metadata(path)?;
        debug!(
            "Placeholder extraction for {} ({} bytes)",
            path.display(),
            meta.len()
        );
        Ok(Extraction {
            account: Self::sample_account(),
            transactions: Self::sample_transactions(),
            placeholder: true,
        })
    }
}

// ── Fixed extractor (tests) ───────────────────────────────────────────────────

/// Returns a preset result or error; lets callers exercise the converter path
/// without any document logic.
pub struct FixedExtractor {
    result: Result<Extraction, String>,
}

impl FixedExtractor {
    pub fn new(extraction: Extraction) -> Self {
        Self {
            result: Ok(extraction),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            result: Err(reason.into()),
        }
    }
}

impl DocumentExtractor for FixedExtractor {
    fn name(&self) -> &str {
        "fixed"
    }

    fn extract(&self, _path: &Path) -> Result<Extraction, ExtractError> {
        self.result.clone().map_err(ExtractError::Engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_returns_sample_statement() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let out = PlaceholderExtractor.extract(f.path()).unwrap();
        assert!(out.placeholder);
        assert_eq!(out.transactions.len(), 3);
        assert_eq!(out.transactions[0].amount, Decimal::new(-15000, 2));
        assert_eq!(out.account.bank_id, "0001");
    }

    #[test]
    fn placeholder_ignores_content() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut a, b"%PDF-1.4 whatever").unwrap();
        let b = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            PlaceholderExtractor.extract(a.path()).unwrap(),
            PlaceholderExtractor.extract(b.path()).unwrap()
        );
    }

    #[test]
    fn placeholder_requires_readable_file() {
        let err = PlaceholderExtractor
            .extract(Path::new("/nonexistent/doc.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn fixed_extractor_reports_engine_error() {
        let err = FixedExtractor::failing("layout model missing")
            .extract(Path::new("x.pdf"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Extraction engine error: layout model missing");
    }

    #[test]
    fn extractors_are_object_safe() {
        let boxed: Vec<Box<dyn DocumentExtractor>> =
            vec![Box::new(PlaceholderExtractor), Box::new(FixedExtractor::failing("x"))];
        assert_eq!(boxed[0].name(), "placeholder");
        assert_eq!(boxed[1].name(), "fixed");
    }
}
