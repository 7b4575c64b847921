//! Per-file extraction result for a TISS batch.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tiss::rules::lote::{lote_from_filename, lote_matches};

/// Kind of TISS document, decided by which guide element is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Office visit guides (guiaConsulta).
    #[default]
    Consulta,
    /// Diagnostic/therapeutic support guides (guiaSP-SADT).
    SpSadt,
}

impl DocumentType {
    /// Element name of a single guide for this document type.
    pub fn guide_element(&self) -> &'static str {
        match self {
            DocumentType::Consulta => "guiaConsulta",
            DocumentType::SpSadt => "guiaSP-SADT",
        }
    }

    /// Upper-case label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Consulta => "CONSULTA",
            DocumentType::SpSadt => "SP-SADT",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the total value of a file was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalSource {
    /// Sum of valorProcedimento over Consulta guides.
    ProcedureSum,
    /// Document-level valorTotalGeral.
    DeclaredTotal,
    /// Every SP-SADT guide carried its own valorTotalGeral.
    GuideTotals,
    /// Every SP-SADT guide was reconstructed from its items.
    ItemSum,
    /// Some guides declared a total, others were reconstructed.
    Mixed,
    /// Nothing to sum; the total defaulted to zero.
    Empty,
}

impl TotalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalSource::ProcedureSum => "procedure_sum",
            TotalSource::DeclaredTotal => "declared_total",
            TotalSource::GuideTotals => "guide_totals",
            TotalSource::ItemSum => "item_sum",
            TotalSource::Mixed => "mixed",
            TotalSource::Empty => "empty",
        }
    }
}

/// Batch number, guide count and total value of one TISS file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Batch number (numeroLote); empty when the document has none.
    pub batch_number: String,

    /// Number of guides of the detected type.
    pub guide_count: usize,

    /// Total monetary value of the batch.
    pub total_value: Decimal,

    /// Detected document type.
    pub document_type: DocumentType,

    /// How `total_value` was computed.
    pub total_source: TotalSource,

    /// Non-fatal notes collected during extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Version of the parser that produced this result.
    pub parser_version: String,
}

impl ExtractionResult {
    /// A file with guides but a zero total is most likely missing values.
    pub fn is_suspicious(&self) -> bool {
        self.guide_count > 0 && self.total_value.is_zero()
    }
}

/// Extraction result of one uploaded file, with file name checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Original file name.
    pub file_name: String,

    #[serde(flatten)]
    pub result: ExtractionResult,

    /// Batch number read from the file name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_lote: Option<String>,

    /// Whether the file name batch number equals the document's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lote_matches: Option<bool>,

    /// Guides present but total is zero.
    pub suspicious: bool,
}

impl FileReport {
    /// Build a report, optionally cross-checking the batch number in the file name.
    pub fn new(file_name: impl Into<String>, result: ExtractionResult, check_filename: bool) -> Self {
        let file_name = file_name.into();
        let (filename_lote, matches) = if check_filename {
            let lote = lote_from_filename(&file_name);
            let matches = lote
                .as_deref()
                .map(|l| lote_matches(l, &result.batch_number));
            (lote, matches)
        } else {
            (None, None)
        };

        Self {
            suspicious: result.is_suspicious(),
            file_name,
            result,
            filename_lote,
            lote_matches: matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(batch: &str, guides: usize, total: Decimal) -> ExtractionResult {
        ExtractionResult {
            batch_number: batch.to_string(),
            guide_count: guides,
            total_value: total,
            document_type: DocumentType::Consulta,
            total_source: TotalSource::ProcedureSum,
            warnings: Vec::new(),
            parser_version: "test".to_string(),
        }
    }

    #[test]
    fn test_suspicious_when_guides_without_value() {
        assert!(result("1", 3, Decimal::ZERO).is_suspicious());
        assert!(!result("1", 0, Decimal::ZERO).is_suspicious());
        assert!(!result("1", 3, Decimal::new(10, 0)).is_suspicious());
    }

    #[test]
    fn test_file_report_checks_lote() {
        let report = FileReport::new("LOTE_123.xml", result("123", 1, Decimal::ONE), true);
        assert_eq!(report.filename_lote.as_deref(), Some("123"));
        assert_eq!(report.lote_matches, Some(true));

        let report = FileReport::new("lote-77.xml", result("123", 1, Decimal::ONE), true);
        assert_eq!(report.lote_matches, Some(false));

        let report = FileReport::new("envio.xml", result("123", 1, Decimal::ONE), true);
        assert_eq!(report.filename_lote, None);
        assert_eq!(report.lote_matches, None);
    }

    #[test]
    fn test_file_report_serializes_flat() {
        let report = FileReport::new("lote_5.xml", result("5", 2, Decimal::new(15050, 2)), false);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["file_name"], "lote_5.xml");
        assert_eq!(json["batch_number"], "5");
        assert_eq!(json["guide_count"], 2);
        assert_eq!(json["document_type"], "consulta");
        assert!(json.get("filename_lote").is_none());
    }

    #[test]
    fn test_document_type_labels() {
        assert_eq!(DocumentType::SpSadt.to_string(), "SP-SADT");
        assert_eq!(DocumentType::Consulta.guide_element(), "guiaConsulta");
        assert_eq!(DocumentType::default(), DocumentType::Consulta);
    }
}
