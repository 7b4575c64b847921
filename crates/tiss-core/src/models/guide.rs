//! Guide-level audit rows and billed items.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::batch::DocumentType;
use crate::error::{ExtractionError, Result};

/// Audit of a single guide: declared total against reconstructed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideAudit {
    /// Type of the guide.
    pub document_type: DocumentType,

    /// Provider-side guide number (numeroGuiaPrestador).
    pub guide_provider_number: String,

    /// Operator-side guide number (numeroGuiaOperadora).
    pub guide_operator_number: String,

    /// Total declared in the guide, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_total: Option<Decimal>,

    /// Sum of executed procedures.
    pub procedures_subtotal: Decimal,

    /// Sum of other expenses.
    pub other_expenses_subtotal: Decimal,

    /// Procedures plus other expenses.
    pub items_subtotal: Decimal,

    /// Whether the declared total equals the item subtotal; absent without a declared total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_declared: Option<bool>,
}

impl GuideAudit {
    /// Build an audit row, summing the item subtotals.
    pub fn new(
        document_type: DocumentType,
        guide_provider_number: String,
        guide_operator_number: String,
        declared_total: Option<Decimal>,
        procedures_subtotal: Decimal,
        other_expenses_subtotal: Decimal,
    ) -> Result<Self> {
        let items_subtotal = procedures_subtotal
            .checked_add(other_expenses_subtotal)
            .ok_or_else(|| ExtractionError::AmountOverflow {
                field: "items_subtotal".to_string(),
            })?;

        Ok(Self {
            document_type,
            guide_provider_number,
            guide_operator_number,
            declared_total,
            procedures_subtotal,
            other_expenses_subtotal,
            items_subtotal,
            matches_declared: declared_total.map(|total| total == items_subtotal),
        })
    }
}

/// Kind of billed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Executed procedure.
    Procedure,
    /// Other expense (materials, drugs, fees).
    OtherExpense,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Procedure => "procedure",
            ItemKind::OtherExpense => "other_expense",
        }
    }
}

/// A single billed item inside a guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Procedure or other expense.
    pub kind: ItemKind,

    /// Expense identifier (identificadorDespesa); empty for procedures.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expense_id: String,

    /// Procedure table code (codigoTabela).
    pub table_code: String,

    /// Procedure code (codigoProcedimento).
    pub procedure_code: String,

    /// Procedure description.
    pub description: String,

    /// Executed quantity, at least 1.
    pub quantity: Decimal,

    /// Unit value.
    pub unit_value: Decimal,

    /// Total value of the item.
    pub total_value: Decimal,

    /// Provider-side guide number.
    pub guide_provider_number: String,

    /// Operator-side guide number.
    pub guide_operator_number: String,

    /// Beneficiary name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub patient: String,

    /// Responsible professional.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub professional: String,

    /// Date of service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TissError;

    fn audit(declared: Option<Decimal>, procedures: Decimal, others: Decimal) -> Result<GuideAudit> {
        GuideAudit::new(
            DocumentType::SpSadt,
            "1".to_string(),
            "2".to_string(),
            declared,
            procedures,
            others,
        )
    }

    #[test]
    fn test_matches_declared() {
        let row = audit(None, Decimal::TEN, Decimal::ZERO).unwrap();
        assert_eq!(row.matches_declared, None);

        let row = audit(Some(Decimal::new(11, 0)), Decimal::TEN, Decimal::ONE).unwrap();
        assert_eq!(row.items_subtotal, Decimal::new(11, 0));
        assert_eq!(row.matches_declared, Some(true));

        let row = audit(Some(Decimal::ONE), Decimal::TEN, Decimal::ZERO).unwrap();
        assert_eq!(row.matches_declared, Some(false));
    }

    #[test]
    fn test_matches_declared_is_serialized() {
        let json = serde_json::to_value(audit(Some(Decimal::ONE), Decimal::TEN, Decimal::ZERO).unwrap())
            .unwrap();
        assert_eq!(json["matches_declared"], false);

        let json = serde_json::to_value(audit(None, Decimal::TEN, Decimal::ZERO).unwrap()).unwrap();
        assert!(json.get("matches_declared").is_none());
    }

    #[test]
    fn test_subtotal_overflow_is_error() {
        let err = audit(None, Decimal::MAX, Decimal::MAX).unwrap_err();
        assert!(matches!(
            err,
            TissError::Extraction(ExtractionError::AmountOverflow { .. })
        ));
    }
}
