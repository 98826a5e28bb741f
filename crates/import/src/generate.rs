//! OFX 1.02 (SGML) statement encoder.

use chrono::{Local, NaiveDateTime};
use ledgerport_core::{compact_date, encode_amount, AccountInfo, StatementTotals, TransactionRecord};

const OFX_HEADER: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102
SECURITY:NONE
ENCODING:USASCII
CHARSET:1252
COMPRESSION:NONE
OLDFILEUID:NONE
NEWFILEUID:NONE
";

const DEFAULT_TRNTYPE: &str = "OTHER";
const SERVER_STAMP: &str = "%Y%m%d%H%M%S";

/// A statement ready to be written out.
pub struct StatementDocument<'a> {
    pub account: &'a AccountInfo,
    pub transactions: &'a [TransactionRecord],
    pub generated_at: NaiveDateTime,
}

impl<'a> StatementDocument<'a> {
    pub fn new(
        transactions: &'a [TransactionRecord],
        account: &'a AccountInfo,
        generated_at: NaiveDateTime,
    ) -> Self {
        Self {
            account,
            transactions,
            generated_at,
        }
    }

    pub fn encode(&self) -> String {
        let stamp = self.generated_at.format(SERVER_STAMP).to_string();
        let fallback_day = self.generated_at.format("%Y%m%d").to_string();
        let mut enc = Encoder::default();

        enc.raw(OFX_HEADER);
        enc.raw("\n");
        enc.open("OFX");

        enc.open("SIGNONMSGSRSV1");
        enc.open("SONRS");
        enc.status_ok();
        enc.field("DTSERVER", &stamp);
        enc.field("LANGUAGE", "POR");
        enc.close("SONRS");
        enc.close("SIGNONMSGSRSV1");

        enc.open("BANKMSGSRSV1");
        enc.open("STMTTRNRS");
        enc.field("TRNUID", "1");
        enc.status_ok();
        enc.open("STMTRS");
        enc.field("CURDEF", &self.account.currency);
        enc.open("BANKACCTFROM");
        enc.field("BANKID", &self.account.bank_id);
        enc.field("ACCTID", &self.account.account_id);
        enc.field("ACCTTYPE", &self.account.account_type);
        enc.close("BANKACCTFROM");

        enc.open("BANKTRANLIST");
        let days: Vec<String> = self
            .transactions
            .iter()
            .map(|t| posted_day(t, &fallback_day))
            .collect();
        let start = days.iter().min().unwrap_or(&fallback_day);
        let end = days.iter().max().unwrap_or(&fallback_day);
        enc.field("DTSTART", start);
        enc.field("DTEND", end);

        for (idx, (trx, day)) in self.transactions.iter().zip(&days).enumerate() {
            enc.open("STMTTRN");
            let trn_type = if trx.trn_type.trim().is_empty() {
                DEFAULT_TRNTYPE
            } else {
                trx.trn_type.trim()
            };
            enc.field("TRNTYPE", trn_type);
            enc.field("DTPOSTED", day);
            enc.field("TRNAMT", &encode_amount(trx.amount));
            let fit_id = if trx.external_id.is_empty() {
                format!("{:06}", idx + 1)
            } else {
                trx.external_id.clone()
            };
            enc.field("FITID", &fit_id);
            if !trx.check_number.is_empty() {
                enc.field("CHECKNUM", &trx.check_number);
            }
            if !trx.description.is_empty() {
                enc.field("MEMO", &trx.description);
            }
            enc.close("STMTTRN");
        }
        enc.close("BANKTRANLIST");

        let totals = StatementTotals::from_records(self.transactions);
        enc.open("LEDGERBAL");
        enc.field("BALAMT", &encode_amount(totals.net()));
        enc.field("DTASOF", &stamp);
        enc.close("LEDGERBAL");

        enc.close("STMTRS");
        enc.close("STMTTRNRS");
        enc.close("BANKMSGSRSV1");
        enc.close("OFX");
        enc.out
    }
}

/// Records without a usable date are posted on the generation day.
fn posted_day(trx: &TransactionRecord, fallback: &str) -> String {
    let day = compact_date(&trx.date);
    if day.is_empty() {
        fallback.to_string()
    } else {
        day
    }
}

#[derive(Default)]
struct Encoder {
    out: String,
}

impl Encoder {
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn open(&mut self, tag: &str) {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn field(&mut self, tag: &str, value: &str) {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.out.push_str(&escape(value));
        self.out.push('\n');
    }

    fn status_ok(&mut self) {
        self.open("STATUS");
        self.field("CODE", "0");
        self.field("SEVERITY", "INFO");
        self.close("STATUS");
    }
}

fn escape(value: &str) -> String {
    value
        .replace(['\r', '\n'], " ")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn generate(
    transactions: &[TransactionRecord],
    account: &AccountInfo,
    generated_at: NaiveDateTime,
) -> String {
    StatementDocument::new(transactions, account, generated_at).encode()
}

/// [`generate`] stamped with the local clock.
pub fn generate_now(transactions: &[TransactionRecord], account: &AccountInfo) -> String {
    generate(transactions, account, Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ofx::OfxParser;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const GOLDEN: &str = include_str!("../tests/fixtures/golden_statement.ofx");

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn account() -> AccountInfo {
        AccountInfo {
            bank_id: "0341".into(),
            account_id: "12345-6".into(),
            ..AccountInfo::default()
        }
    }

    fn records() -> Vec<TransactionRecord> {
        let mut salary =
            TransactionRecord::new("2024-01-10", "CREDIT", dec("1500.01"), "Salario <jan>");
        salary.external_id = "ABC123".into();
        salary.check_number = "000451".into();
        vec![
            TransactionRecord::new("2024-01-05", "DEBIT", dec("-150"), "Farmacia"),
            salary,
            TransactionRecord::new("2024-01-20", "DEBIT", dec("-0.5"), ""),
        ]
    }

    #[test]
    fn output_matches_golden_fixture() {
        assert_eq!(generate(&records(), &account(), stamp()), GOLDEN);
    }

    #[test]
    fn output_round_trips_through_parser() {
        let text = generate(&records(), &account(), stamp());
        let parsed = OfxParser::parse(&text);
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(parsed.account, account());
        assert_eq!(parsed.transactions.len(), 3);

        let t1 = &parsed.transactions[1];
        assert_eq!(t1.date, "2024-01-10");
        assert_eq!(t1.amount, dec("1500.01"));
        assert_eq!(t1.description, "Salario <jan>");
        assert_eq!(t1.external_id, "ABC123");
        assert_eq!(t1.check_number, "000451");
        assert_eq!(parsed.transactions[2].external_id, "000003");
        assert_eq!(parsed.transactions[2].amount, dec("-0.50"));
    }

    #[test]
    fn empty_statement_is_still_well_formed() {
        let text = generate(&[], &account(), stamp());
        assert!(text.contains("<DTSTART>20240131\n<DTEND>20240131\n"));
        assert!(text.contains("<BALAMT>0,00\n"));
        assert!(!text.contains("<STMTTRN>"));
        assert!(text.ends_with("</OFX>\n"));
    }

    #[test]
    fn blank_type_and_date_get_defaults() {
        let trx = TransactionRecord::new("", " ", dec("10"), "line\nbreak");
        let text = generate(&[trx], &account(), stamp());
        assert!(text.contains("<TRNTYPE>OTHER\n<DTPOSTED>20240131\n<TRNAMT>10,00\n"));
        assert!(text.contains("<MEMO>line break\n"));
    }

    #[test]
    fn amounts_use_comma_without_grouping() {
        let trx = TransactionRecord::new("2024-02-01", "DEBIT", dec("-1234567.891"), "x");
        let text = generate(&[trx], &account(), stamp());
        assert!(text.contains("<TRNAMT>-1234567,89\n"));
    }
}
