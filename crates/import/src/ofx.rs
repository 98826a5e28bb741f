//! Statement parser for OFX/QFX text.
//!
//! One tokenizer serves every layout seen in the wild: SGML with one open tag
//! per line and no closing tags, XML with `<TAG>value</TAG>`, and either of
//! those squeezed onto a single line. Tolerance policy for transaction blocks:
//!
//! * field order inside `<STMTTRN>` is free, blank lines and indentation are
//!   ignored, tag names are case-insensitive;
//! * a block is kept only when `TRNTYPE`, `DTPOSTED` and `TRNAMT` are present
//!   and non-empty;
//! * a block still open when another starts, or when the text ends, is
//!   dropped;
//! * an amount that cannot be read becomes zero.
//!
//! Every dropped block or unreadable amount is reported as a [`ParseWarning`].

use std::fmt;
use std::sync::OnceLock;

use ledgerport_core::{normalize_amount, normalize_date, AccountInfo, TransactionRecord};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_tag, r"<\s*(/?)\s*([A-Za-z][A-Za-z0-9_.]*)\s*>([^<]*)");

const BLOCK_TAG: &str = "STMTTRN";

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("No valid transactions found in statement")]
    NoTransactions,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// The amount text could not be read; the record carries zero instead.
    AmountFormat { block: usize, raw: String },
    /// The block lacked one of the required fields and was dropped.
    MissingFields { block: usize, missing: Vec<&'static str> },
    /// The block was never closed and was dropped.
    UnterminatedBlock { block: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::AmountFormat { block, raw } => {
                write!(f, "block {block}: unreadable amount '{raw}', using 0")
            }
            ParseWarning::MissingFields { block, missing } => {
                write!(f, "block {block}: missing {}", missing.join(", "))
            }
            ParseWarning::UnterminatedBlock { block } => {
                write!(f, "block {block}: no closing </{BLOCK_TAG}>")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedStatement {
    pub account: AccountInfo,
    pub transactions: Vec<TransactionRecord>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open { name: &'a str, value: &'a str },
    Close { name: &'a str },
}

fn tokenize(text: &str) -> impl Iterator<Item = Token<'_>> {
    re_tag().captures_iter(text).filter_map(|c| {
        let name = c.get(2)?.as_str();
        if c.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            Some(Token::Close { name })
        } else {
            let value = c.get(3).map_or("", |m| m.as_str().trim());
            Some(Token::Open { name, value })
        }
    })
}

#[derive(Default)]
struct BuildingTrx {
    trn_type: Option<String>,
    date: Option<String>,
    amount: Option<String>,
    memo: Option<String>,
    name: Option<String>,
    fit_id: Option<String>,
    check_number: Option<String>,
    bank_id: Option<String>,
    account_id: Option<String>,
}

impl BuildingTrx {
    fn set(&mut self, tag: &str, value: &str) {
        let slot = match tag {
            "TRNTYPE" => &mut self.trn_type,
            "DTPOSTED" => &mut self.date,
            "TRNAMT" => &mut self.amount,
            "MEMO" => &mut self.memo,
            "NAME" => &mut self.name,
            "FITID" => &mut self.fit_id,
            "CHECKNUM" => &mut self.check_number,
            "BANKID" => &mut self.bank_id,
            "ACCTID" => &mut self.account_id,
            _ => return,
        };
        *slot = Some(decode_entities(value));
    }

    fn finish(self, block: usize, warnings: &mut Vec<ParseWarning>) -> Option<TransactionRecord> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let missing: Vec<&'static str> = [
            ("TRNTYPE", present(&self.trn_type)),
            ("DTPOSTED", present(&self.date)),
            ("TRNAMT", present(&self.amount)),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(tag, _)| tag)
        .collect();
        if !missing.is_empty() {
            warnings.push(ParseWarning::MissingFields { block, missing });
            return None;
        }

        let raw_amount = self.amount.unwrap_or_default();
        let amount = normalize_amount(&raw_amount).unwrap_or_else(|e| {
            warn!("Statement block {block}: {e}, defaulting to 0");
            warnings.push(ParseWarning::AmountFormat {
                block,
                raw: raw_amount.clone(),
            });
            Decimal::ZERO
        });

        let description = self
            .memo
            .filter(|m| !m.is_empty())
            .or(self.name)
            .unwrap_or_default();

        Some(TransactionRecord {
            date: normalize_date(&self.date.unwrap_or_default()),
            trn_type: self.trn_type.unwrap_or_default(),
            amount,
            description,
            external_id: self.fit_id.unwrap_or_default(),
            check_number: self.check_number.unwrap_or_default(),
            bank_id: self.bank_id.unwrap_or_default(),
            account_id: self.account_id.unwrap_or_default(),
        })
    }
}

pub struct OfxParser;

impl OfxParser {
    /// Extract every well-formed transaction block. Never fails; problems are
    /// reported through [`ParsedStatement::warnings`].
    pub fn parse(text: &str) -> ParsedStatement {
        let mut statement = ParsedStatement::default();
        let mut current: Option<(usize, BuildingTrx)> = None;
        let mut blocks = 0usize;

        for token in tokenize(text) {
            match token {
                Token::Open { name, value } => {
                    let tag = name.to_uppercase();
                    if tag == BLOCK_TAG {
                        if let Some((block, _)) = current.take() {
                            statement
                                .warnings
                                .push(ParseWarning::UnterminatedBlock { block });
                        }
                        blocks += 1;
                        current = Some((blocks, BuildingTrx::default()));
                    } else if let Some((_, ref mut trx)) = current {
                        trx.set(&tag, value);
                    } else {
                        set_account_field(&mut statement.account, &tag, value);
                    }
                }
                Token::Close { name } => {
                    if name.eq_ignore_ascii_case(BLOCK_TAG) {
                        if let Some((block, trx)) = current.take() {
                            if let Some(record) = trx.finish(block, &mut statement.warnings) {
                                statement.transactions.push(record);
                            }
                        }
                    }
                }
            }
        }

        if let Some((block, _)) = current {
            statement
                .warnings
                .push(ParseWarning::UnterminatedBlock { block });
        }

        for record in &mut statement.transactions {
            if record.bank_id.is_empty() {
                record.bank_id = statement.account.bank_id.clone();
            }
            if record.account_id.is_empty() {
                record.account_id = statement.account.account_id.clone();
            }
        }

        statement
    }
}

fn set_account_field(account: &mut AccountInfo, tag: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    match tag {
        "BANKID" => account.bank_id = decode_entities(value),
        "ACCTID" => account.account_id = decode_entities(value),
        "ACCTTYPE" => account.account_type = decode_entities(value),
        "CURDEF" => account.currency = decode_entities(value),
        _ => {}
    }
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn parse(data: &[u8]) -> ParsedStatement {
    let content = String::from_utf8_lossy(data);
    OfxParser::parse(&content)
}

/// Like [`parse`], but a statement without a single accepted transaction is
/// an error.
pub fn parse_transactions(data: &[u8]) -> Result<ParsedStatement, StatementError> {
    let statement = parse(data);
    if statement.transactions.is_empty() {
        return Err(StatementError::NoTransactions);
    }
    Ok(statement)
}
