use std::fs;

use ledgerport_core::{amount_to_f64, ConversionKind, ConversionRequest, StatementTotals};
use ledgerport_import::{parse_transactions, ParsedStatement};
use ledgerport_sheet::{CellValue, MemorySource, Sheet};
use serde_json::Value;
use tracing::{info, warn};

use super::{Converter, MethodChain, Outcome};
use crate::error::ConvertError;
use crate::progress::{ProgressReporter, ProgressSpan};

const WRITE_SPAN: ProgressSpan = ProgressSpan::new(60, 90);

const TRANSACTION_HEADER: [&str; 8] = [
    "Date",
    "Type",
    "Amount",
    "Description",
    "FITID",
    "Check Number",
    "Bank ID",
    "Account ID",
];

/// OFX/QFX statement to a `.xlsx` with a transaction list and a summary.
#[derive(Default)]
pub struct StatementConverter {
    methods: MethodChain,
}

impl StatementConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_methods(mut self, methods: MethodChain) -> Self {
        self.methods = methods;
        self
    }
}

/// `Transactions` and `Summary` sheets for a parsed statement.
pub fn statement_sheets(statement: &ParsedStatement) -> Vec<Sheet> {
    let mut transactions = Sheet::new("Transactions").with_header(TRANSACTION_HEADER);
    for t in &statement.transactions {
        transactions.push_row([
            CellValue::from(t.date.as_str()),
            CellValue::from(t.trn_type.as_str()),
            CellValue::from(amount_to_f64(t.amount)),
            CellValue::from(t.description.as_str()),
            CellValue::from(t.external_id.as_str()),
            CellValue::from(t.check_number.as_str()),
            CellValue::from(t.bank_id.as_str()),
            CellValue::from(t.account_id.as_str()),
        ]);
    }

    let totals = StatementTotals::from_records(&statement.transactions);
    let mut summary = Sheet::new("Summary").with_header(["Item", "Value"]);
    summary.push_row([CellValue::from("Transactions"), CellValue::from(totals.count as i64)]);
    summary.push_row([CellValue::from("Credits"), CellValue::from(amount_to_f64(totals.credits))]);
    summary.push_row([CellValue::from("Debits"), CellValue::from(amount_to_f64(totals.debits))]);
    summary.push_row([CellValue::from("TOTAL"), CellValue::from(amount_to_f64(totals.net()))]);

    vec![transactions, summary]
}

impl Converter for StatementConverter {
    fn kind(&self) -> ConversionKind {
        ConversionKind::StatementToSpreadsheet
    }

    fn convert(
        &self,
        request: &ConversionRequest,
        reporter: &ProgressReporter,
    ) -> Result<Outcome, ConvertError> {
        reporter.report(10, "Reading statement");
        let data = fs::read(&request.input_path)?;

        reporter.report(30, "Parsing transactions");
        let statement = parse_transactions(&data)?;
        for w in &statement.warnings {
            warn!("Task {}: {w}", reporter.task_id());
        }
        info!(
            "Task {}: {} transaction(s), {} warning(s)",
            reporter.task_id(),
            statement.transactions.len(),
            statement.warnings.len()
        );

        reporter.report(
            50,
            format!("Building workbook for {} transaction(s)", statement.transactions.len()),
        );
        let mut source = MemorySource::new(statement_sheets(&statement));
        let result = self
            .methods
            .run(&mut source, &request.output_path, reporter, WRITE_SPAN)?;

        let mut details = result.details();
        details.insert("transactions".into(), Value::from(statement.transactions.len()));
        details.insert("warnings".into(), Value::from(statement.warnings.len()));
        details.insert("bank_id".into(), Value::from(statement.account.bank_id.as_str()));
        details.insert("account_id".into(), Value::from(statement.account.account_id.as_str()));

        let message = if result.used_fallback() {
            format!(
                "Statement converted: {} transaction(s) (fallback method)",
                statement.transactions.len()
            )
        } else {
            format!("Statement converted: {} transaction(s)", statement.transactions.len())
        };
        Ok(Outcome { message, details })
    }
}
