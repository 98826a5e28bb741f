use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    SpreadsheetToSpreadsheet,
    StatementToSpreadsheet,
    DocumentToStatement,
}

impl ConversionKind {
    pub const ALL: [ConversionKind; 3] = [
        ConversionKind::SpreadsheetToSpreadsheet,
        ConversionKind::StatementToSpreadsheet,
        ConversionKind::DocumentToStatement,
    ];

    /// Short name of the source family, as used by upload forms.
    pub fn source_label(self) -> &'static str {
        match self {
            ConversionKind::SpreadsheetToSpreadsheet => "spreadsheet",
            ConversionKind::StatementToSpreadsheet => "statement",
            ConversionKind::DocumentToStatement => "document",
        }
    }

    /// Lowercase extensions (without the dot) accepted for this kind.
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            ConversionKind::SpreadsheetToSpreadsheet => &["xlsb"],
            ConversionKind::StatementToSpreadsheet => &["ofx", "qfx"],
            ConversionKind::DocumentToStatement => &["pdf"],
        }
    }

    pub fn output_extension(self) -> &'static str {
        match self {
            ConversionKind::SpreadsheetToSpreadsheet | ConversionKind::StatementToSpreadsheet => {
                "xlsx"
            }
            ConversionKind::DocumentToStatement => "ofx",
        }
    }

    pub fn accepts(self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.allowed_extensions().contains(&ext.as_str())
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.accepts(extension))
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionKind::SpreadsheetToSpreadsheet => write!(f, "spreadsheet_to_spreadsheet"),
            ConversionKind::StatementToSpreadsheet => write!(f, "statement_to_spreadsheet"),
            ConversionKind::DocumentToStatement => write!(f, "document_to_statement"),
        }
    }
}

impl std::str::FromStr for ConversionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.source_label() == s || k.to_string() == s)
            .ok_or_else(|| format!("Unknown conversion kind: '{s}'"))
    }
}

/// One accepted conversion, before the dispatcher binds it to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub kind: ConversionKind,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl ConversionRequest {
    pub fn new(
        kind: ConversionKind,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    /// Request whose output sits next to the input, with the kind's extension.
    pub fn beside_input(kind: ConversionKind, input_path: &Path) -> Self {
        let output_path = input_path.with_extension(kind.output_extension());
        Self::new(kind, input_path, output_path)
    }

    pub fn output_filename(&self) -> Option<String> {
        self.output_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub from: &'static str,
    pub to: &'static str,
    pub description: &'static str,
}

pub const CAPABILITIES: &[Capability] = &[
    Capability {
        from: "xlsb",
        to: "xlsx",
        description: "Binary Excel workbook to Open XML workbook, with formatting",
    },
    Capability {
        from: "ofx",
        to: "xlsx",
        description: "OFX/QFX bank statement to a transactions spreadsheet",
    },
    Capability {
        from: "pdf",
        to: "ofx",
        description: "PDF bank statement to OFX (placeholder extractor, sample data only)",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn extension_allow_list() {
        assert!(ConversionKind::SpreadsheetToSpreadsheet.accepts("xlsb"));
        assert!(ConversionKind::SpreadsheetToSpreadsheet.accepts(".XLSB"));
        assert!(!ConversionKind::SpreadsheetToSpreadsheet.accepts("xlsx"));
        assert!(ConversionKind::StatementToSpreadsheet.accepts("qfx"));
        assert!(ConversionKind::DocumentToStatement.accepts("pdf"));
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(
            ConversionKind::from_extension("ofx"),
            Some(ConversionKind::StatementToSpreadsheet)
        );
        assert_eq!(ConversionKind::from_extension("docx"), None);
    }

    #[test]
    fn kind_from_str_accepts_label_and_full_name() {
        assert_eq!(
            ConversionKind::from_str("statement").unwrap(),
            ConversionKind::StatementToSpreadsheet
        );
        assert_eq!(
            ConversionKind::from_str("document_to_statement").unwrap(),
            ConversionKind::DocumentToStatement
        );
        assert!(ConversionKind::from_str("audio").is_err());
    }

    #[test]
    fn request_beside_input() {
        let req = ConversionRequest::beside_input(
            ConversionKind::SpreadsheetToSpreadsheet,
            Path::new("/tmp/work/report.xlsb"),
        );
        assert_eq!(req.output_path, PathBuf::from("/tmp/work/report.xlsx"));
        assert_eq!(req.output_filename().as_deref(), Some("report.xlsx"));
    }

    #[test]
    fn one_capability_per_kind() {
        assert_eq!(CAPABILITIES.len(), ConversionKind::ALL.len());
        for kind in ConversionKind::ALL {
            assert!(CAPABILITIES
                .iter()
                .any(|c| c.to == kind.output_extension() && kind.accepts(c.from)));
        }
    }
}
