//! Best-effort presentation rules inferred from a cell's raw value.
//!
//! Nothing here is guaranteed to be right for every workbook; the rules only
//! aim to make a converted sheet readable without a manual pass.

use rust_xlsxwriter::{Format, FormatBorder};

use crate::model::CellValue;

/// Texts longer than this many characters wrap.
pub const WRAP_THRESHOLD: usize = 20;

/// Labels containing any of these (case-insensitive) are emphasized.
pub const EMPHASIS_KEYWORDS: [&str; 4] = ["total", "soma", "quantidade", "valor"];

/// Light gray.
pub const EMPHASIS_FILL: u32 = 0xD3D3D3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberFormat {
    #[default]
    General,
    /// Thousands-grouped integer.
    Integer,
    /// Thousands-grouped, two decimals.
    TwoDecimals,
}

impl NumberFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::Integer => "#,##0",
            NumberFormat::TwoDecimals => "#,##0.00",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormattingSpec {
    pub number_format: NumberFormat,
    pub bold: bool,
    pub fill: bool,
    pub wrap: bool,
    pub border: bool,
}

impl FormattingSpec {
    pub fn is_plain(&self) -> bool {
        *self == FormattingSpec::default()
    }

    pub fn to_format(&self) -> Format {
        let mut format = Format::new();
        if self.number_format != NumberFormat::General {
            format = format.set_num_format(self.number_format.pattern());
        }
        if self.bold {
            format = format.set_bold();
        }
        if self.fill {
            format = format.set_background_color(EMPHASIS_FILL);
        }
        if self.wrap {
            format = format.set_text_wrap();
        }
        if self.border {
            format = format.set_border(FormatBorder::Thin);
        }
        format
    }
}

/// Infer presentation for one value. Each axis is decided independently, so a
/// long upper-case label both wraps and gets emphasis.
pub fn infer_formatting(value: &CellValue) -> FormattingSpec {
    let mut spec = FormattingSpec::default();
    match value {
        CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
            spec.number_format = NumberFormat::Integer;
        }
        CellValue::Number(_) => {
            spec.number_format = NumberFormat::TwoDecimals;
        }
        CellValue::Text(text) if !text.is_empty() => {
            if text.chars().count() > WRAP_THRESHOLD {
                spec.wrap = true;
            }
            if is_upper_case(text) || has_emphasis_keyword(text) {
                spec.bold = true;
                spec.fill = true;
            }
        }
        CellValue::Text(_) | CellValue::Empty | CellValue::Bool(_) => {}
    }
    spec
}

/// At least one cased letter and no lower-case letters.
fn is_upper_case(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

fn has_emphasis_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EMPHASIS_KEYWORDS.iter().any(|k| lowered.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn whole_number_gets_grouped_integer() {
        let spec = infer_formatting(&CellValue::Number(1500.0));
        assert_eq!(spec.number_format, NumberFormat::Integer);
        assert_eq!(spec.number_format.pattern(), "#,##0");
        assert!(!spec.bold && !spec.wrap);
    }

    #[test]
    fn fractional_number_gets_two_decimals() {
        let spec = infer_formatting(&CellValue::Number(-49.99));
        assert_eq!(spec.number_format.pattern(), "#,##0.00");
    }

    #[test]
    fn long_text_wraps() {
        let spec = infer_formatting(&text("a description well over twenty chars"));
        assert!(spec.wrap);
        assert!(!spec.bold);
        assert!(!infer_formatting(&text("exactly twenty chars")).wrap);
    }

    #[test]
    fn upper_case_text_is_emphasized() {
        let spec = infer_formatting(&text("RECEITAS 2024"));
        assert!(spec.bold && spec.fill);
        assert!(!infer_formatting(&text("2024")).bold);
    }

    #[test]
    fn keyword_text_is_emphasized_case_insensitively() {
        for label in ["Total geral", "soma", "Quantidade vendida", "VALOR"] {
            let spec = infer_formatting(&text(label));
            assert!(spec.bold && spec.fill, "{label}");
        }
        assert!(!infer_formatting(&text("Descrição")).bold);
    }

    #[test]
    fn long_upper_case_text_gets_both_axes() {
        let spec = infer_formatting(&text("TOTAL DAS RECEITAS OPERACIONAIS"));
        assert!(spec.wrap && spec.bold && spec.fill);
    }

    #[test]
    fn empty_and_bool_stay_general() {
        assert!(infer_formatting(&CellValue::Empty).is_plain());
        assert!(infer_formatting(&text("")).is_plain());
        assert!(infer_formatting(&CellValue::Bool(true)).is_plain());
    }
}
