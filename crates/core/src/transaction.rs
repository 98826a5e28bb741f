use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One statement transaction, with the textual fields exactly as the source
/// document carried them (dates already normalized to `YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: String,
    #[serde(rename = "type")]
    pub trn_type: String,
    pub amount: Decimal,
    pub description: String,
    pub external_id: String,
    pub check_number: String,
    pub bank_id: String,
    pub account_id: String,
}

impl TransactionRecord {
    pub fn new(date: &str, trn_type: &str, amount: Decimal, description: &str) -> Self {
        TransactionRecord {
            date: date.to_string(),
            trn_type: trn_type.to_string(),
            amount,
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn is_credit(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }
}

/// Account identification carried in a statement header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub bank_id: String,
    pub account_id: String,
    pub account_type: String,
    pub currency: String,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            bank_id: String::new(),
            account_id: String::new(),
            account_type: "CHECKING".to_string(),
            currency: "BRL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatementTotals {
    pub count: usize,
    pub credits: Decimal,
    pub debits: Decimal,
}

impl StatementTotals {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.count += 1;
            if r.amount.is_sign_negative() {
                acc.debits += r.amount;
            } else {
                acc.credits += r.amount;
            }
            acc
        })
    }

    pub fn net(&self) -> Decimal {
        self.credits + self.debits
    }
}
