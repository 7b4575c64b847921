//! TISS batch parser: document detection, totals, guide audits and items.

use std::time::Instant;

use chrono::NaiveDate;
use roxmltree::{Document, Node};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::models::batch::{DocumentType, ExtractionResult, TotalSource};
use crate::models::guide::{GuideAudit, ItemKind, LineItem};

use super::rules::parse_br_amount;
use super::xml::{child, descendant, elements, find_path, is_element, path, text};
use super::{TissExtractor, PARSER_VERSION};

/// Locations of the batch number, in order of preference.
const LOTE_PATHS: &[&[&str]] = &[
    &["prestadorParaOperadora", "loteGuias", "numeroLote"],
    &["prestadorParaOperadora", "recursoGlosa", "guiaRecursoGlosa", "numeroLote"],
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Add two amounts, failing instead of overflowing.
fn checked_sum(field: &str, a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| {
        ExtractionError::AmountOverflow {
            field: field.to_string(),
        }
        .into()
    })
}

/// Reads amount fields, failing or recording a warning on unreadable text.
struct AmountReader {
    strict: bool,
    warnings: Vec<String>,
}

impl AmountReader {
    fn new(strict: bool) -> Self {
        Self {
            strict,
            warnings: Vec::new(),
        }
    }

    /// `Ok(None)` for empty text, or for unreadable text in lenient mode.
    fn parse_optional(&mut self, field: &str, raw: &str) -> Result<Option<Decimal>> {
        if raw.is_empty() {
            return Ok(None);
        }

        match parse_br_amount(raw) {
            Some(value) => Ok(Some(value)),
            None if self.strict => Err(ExtractionError::InvalidAmount {
                field: field.to_string(),
                value: raw.to_string(),
            }
            .into()),
            None => {
                warn!("Unreadable {} value {:?}, ignoring it", field, raw);
                self.warnings
                    .push(format!("unreadable {} value {:?} ignored", field, raw));
                Ok(None)
            }
        }
    }

    fn read(&mut self, field: &str, node: Option<Node<'_, '_>>) -> Result<Decimal> {
        let raw = text(node);
        Ok(self.parse_optional(field, &raw)?.unwrap_or(Decimal::ZERO))
    }
}

/// Quantity and values of one executed procedure or expense.
#[derive(Debug, Clone, Copy)]
struct ItemValues {
    quantity: Decimal,
    unit_value: Decimal,
    total_value: Decimal,
}

impl ItemValues {
    /// Read `quantidadeExecutada`, `valorUnitario` and `valorTotal` under `node`.
    ///
    /// A missing or zero total is rebuilt as unit value times quantity.
    fn read(reader: &mut AmountReader, node: Option<Node<'_, '_>>) -> Result<Self> {
        let Some(node) = node else {
            return Ok(Self {
                quantity: Decimal::ZERO,
                unit_value: Decimal::ZERO,
                total_value: Decimal::ZERO,
            });
        };

        let quantity = reader.read("quantidadeExecutada", child(node, "quantidadeExecutada"))?;
        let unit_value = reader.read("valorUnitario", child(node, "valorUnitario"))?;
        let mut total_value = reader.read("valorTotal", child(node, "valorTotal"))?;

        if total_value.is_zero() && unit_value > Decimal::ZERO && quantity > Decimal::ZERO {
            total_value = unit_value.checked_mul(quantity).ok_or_else(|| {
                ExtractionError::AmountOverflow {
                    field: "valorUnitario x quantidadeExecutada".to_string(),
                }
            })?;
        }

        Ok(Self {
            quantity,
            unit_value,
            total_value,
        })
    }

    /// Values for display: quantity at least one, unit value falls back to the total.
    fn normalized(self) -> Self {
        Self {
            quantity: if self.quantity > Decimal::ZERO { self.quantity } else { Decimal::ONE },
            unit_value: if self.unit_value > Decimal::ZERO {
                self.unit_value
            } else {
                self.total_value
            },
            total_value: self.total_value,
        }
    }
}

/// Guide-level fields repeated on every item of the guide.
struct GuideContext {
    provider_number: String,
    operator_number: String,
    patient: String,
    professional: String,
    service_date: Option<NaiveDate>,
}

impl GuideContext {
    fn read(guide: Node<'_, '_>, document_type: DocumentType) -> Self {
        let provider_number = provider_number(guide);
        let operator_number = operator_number(guide, document_type, &provider_number);

        let professional = {
            let named = text(find_path(
                guide,
                &["dadosProfissionaisResponsaveis", "nomeProfissional"],
            ));
            if named.is_empty() {
                text(descendant(guide, "nomeProfissional"))
            } else {
                named
            }
        };

        let service_date = ["dataAtendimento", "dataExecucao"]
            .iter()
            .map(|name| text(descendant(guide, name)))
            .find(|s| !s.is_empty())
            .and_then(|s| parse_date(&s));

        Self {
            provider_number,
            operator_number,
            patient: text(find_path(guide, &["dadosBeneficiario", "nomeBeneficiario"])),
            professional,
            service_date,
        }
    }

    fn item(
        &self,
        kind: ItemKind,
        expense_id: String,
        code_node: Option<Node<'_, '_>>,
        values: ItemValues,
    ) -> LineItem {
        let code = |name: &str| text(code_node.and_then(|n| child(n, name)));

        LineItem {
            kind,
            expense_id,
            table_code: code("codigoTabela"),
            procedure_code: code("codigoProcedimento"),
            description: code("descricaoProcedimento"),
            quantity: values.quantity,
            unit_value: values.unit_value,
            total_value: values.total_value,
            guide_provider_number: self.provider_number.clone(),
            guide_operator_number: self.operator_number.clone(),
            patient: self.patient.clone(),
            professional: self.professional.clone(),
            service_date: self.service_date,
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_document(xml: &str) -> Result<Document<'_>> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    Ok(Document::parse(xml)?)
}

fn document_type(root: Node<'_, '_>) -> DocumentType {
    if descendant(root, DocumentType::SpSadt.guide_element()).is_some() {
        DocumentType::SpSadt
    } else {
        DocumentType::Consulta
    }
}

fn batch_number(root: Node<'_, '_>) -> String {
    LOTE_PATHS
        .iter()
        .map(|steps| text(find_path(root, steps)))
        .find(|lote| !lote.is_empty())
        .unwrap_or_default()
}

fn provider_number(guide: Node<'_, '_>) -> String {
    let direct = text(child(guide, "numeroGuiaPrestador"));
    if direct.is_empty() {
        text(path(guide, &["cabecalhoGuia", "numeroGuiaPrestador"]))
    } else {
        direct
    }
}

fn operator_number(guide: Node<'_, '_>, document_type: DocumentType, provider: &str) -> String {
    [
        path(guide, &["dadosAutorizacao", "numeroGuiaOperadora"]),
        path(guide, &["cabecalhoGuia", "numeroGuiaOperadora"]),
        child(guide, "numeroGuiaOperadora"),
    ]
    .into_iter()
    .map(text)
    .find(|number| !number.is_empty())
    .unwrap_or_else(|| match document_type {
        DocumentType::Consulta => provider.to_string(),
        DocumentType::SpSadt => String::new(),
    })
}

/// `procedimentosExecutados/procedimentoExecutado` entries of an SP-SADT guide.
fn executed_procedures<'a, 'input>(guide: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    elements(guide, "procedimentosExecutados")
        .flat_map(|group| group.children().filter(|n| is_element(n, "procedimentoExecutado")))
        .collect()
}

/// `outrasDespesas/despesa` entries of an SP-SADT guide.
fn other_expenses<'a, 'input>(guide: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    elements(guide, "outrasDespesas")
        .flat_map(|group| group.children().filter(|n| is_element(n, "despesa")))
        .collect()
}

/// Parser for TISS XML batches.
#[derive(Debug, Clone)]
pub struct TissParser {
    /// Fail on unreadable amounts instead of ignoring them.
    strict_amounts: bool,
}

impl TissParser {
    /// Create a new parser with strict amount handling.
    pub fn new() -> Self {
        Self {
            strict_amounts: true,
        }
    }

    /// Set strict amount handling.
    pub fn with_strict_amounts(mut self, strict: bool) -> Self {
        self.strict_amounts = strict;
        self
    }

    /// List every guide with its declared total and item subtotals.
    pub fn audit(&self, xml: &str) -> Result<Vec<GuideAudit>> {
        let doc = parse_document(xml)?;
        let root = doc.root_element();
        let document_type = document_type(root);
        let mut reader = AmountReader::new(self.strict_amounts);

        elements(root, document_type.guide_element())
            .map(|guide| self.audit_guide(&mut reader, guide, document_type))
            .collect()
    }

    /// List every billed item of every guide.
    pub fn items(&self, xml: &str) -> Result<Vec<LineItem>> {
        let doc = parse_document(xml)?;
        let root = doc.root_element();
        let document_type = document_type(root);
        let mut reader = AmountReader::new(self.strict_amounts);
        let mut items = Vec::new();

        for guide in elements(root, document_type.guide_element()) {
            let context = GuideContext::read(guide, document_type);

            match document_type {
                DocumentType::Consulta => {
                    // A consultation bills exactly one procedure
                    let procedure = descendant(guide, "procedimento");
                    let value = reader.read(
                        "valorProcedimento",
                        procedure.and_then(|p| child(p, "valorProcedimento")),
                    )?;
                    let values = ItemValues {
                        quantity: Decimal::ONE,
                        unit_value: value,
                        total_value: value,
                    };
                    items.push(context.item(ItemKind::Procedure, String::new(), procedure, values));
                }
                DocumentType::SpSadt => {
                    for executed in executed_procedures(guide) {
                        let values = ItemValues::read(&mut reader, Some(executed))?.normalized();
                        items.push(context.item(
                            ItemKind::Procedure,
                            String::new(),
                            child(executed, "procedimento"),
                            values,
                        ));
                    }

                    for expense in other_expenses(guide) {
                        let services = child(expense, "servicosExecutados");
                        let values = ItemValues::read(&mut reader, services)?.normalized();
                        items.push(context.item(
                            ItemKind::OtherExpense,
                            text(child(expense, "identificadorDespesa")),
                            services,
                            values,
                        ));
                    }
                }
            }
        }

        debug!("Listed {} items", items.len());
        Ok(items)
    }

    fn audit_guide(
        &self,
        reader: &mut AmountReader,
        guide: Node<'_, '_>,
        document_type: DocumentType,
    ) -> Result<GuideAudit> {
        let provider = provider_number(guide);
        let operator = operator_number(guide, document_type, &provider);

        let (declared_total, procedures, others) = match document_type {
            DocumentType::Consulta => (None, self.procedure_values(reader, guide)?, Decimal::ZERO),
            DocumentType::SpSadt => {
                let declared = self.declared_guide_total(reader, guide)?;
                let (procedures, others) = self.item_subtotals(reader, guide)?;
                (declared, procedures, others)
            }
        };

        GuideAudit::new(document_type, provider, operator, declared_total, procedures, others)
    }

    /// Sum of every `valorProcedimento` in a Consulta guide.
    fn procedure_values(&self, reader: &mut AmountReader, guide: Node<'_, '_>) -> Result<Decimal> {
        let mut sum = Decimal::ZERO;
        for value in elements(guide, "valorProcedimento") {
            let value = reader.read("valorProcedimento", Some(value))?;
            sum = checked_sum("valorProcedimento", sum, value)?;
        }
        Ok(sum)
    }

    /// First non-empty `valorTotalGeral` inside an SP-SADT guide.
    fn declared_guide_total(
        &self,
        reader: &mut AmountReader,
        guide: Node<'_, '_>,
    ) -> Result<Option<Decimal>> {
        match elements(guide, "valorTotalGeral")
            .map(|n| text(Some(n)))
            .find(|raw| !raw.is_empty())
        {
            Some(raw) => reader.parse_optional("valorTotalGeral", &raw),
            None => Ok(None),
        }
    }

    /// Procedure and other-expense subtotals of an SP-SADT guide.
    fn item_subtotals(
        &self,
        reader: &mut AmountReader,
        guide: Node<'_, '_>,
    ) -> Result<(Decimal, Decimal)> {
        let mut procedures = Decimal::ZERO;
        for executed in executed_procedures(guide) {
            let value = ItemValues::read(reader, Some(executed))?.total_value;
            procedures = checked_sum("procedimentosExecutados", procedures, value)?;
        }

        let mut others = Decimal::ZERO;
        for expense in other_expenses(guide) {
            let value = ItemValues::read(reader, child(expense, "servicosExecutados"))?.total_value;
            others = checked_sum("outrasDespesas", others, value)?;
        }

        Ok((procedures, others))
    }

    fn consulta_total(
        &self,
        reader: &mut AmountReader,
        guides: &[Node<'_, '_>],
    ) -> Result<(Decimal, TotalSource)> {
        if guides.is_empty() {
            return Ok((Decimal::ZERO, TotalSource::Empty));
        }

        let mut total = Decimal::ZERO;
        let mut values_found = false;
        for guide in guides {
            values_found |= elements(*guide, "valorProcedimento").any(|n| !text(Some(n)).is_empty());
            let value = self.procedure_values(reader, *guide)?;
            total = checked_sum("valorProcedimento", total, value)?;
        }

        let source = if values_found {
            TotalSource::ProcedureSum
        } else {
            TotalSource::Empty
        };

        Ok((total, source))
    }

    fn sadt_total(
        &self,
        reader: &mut AmountReader,
        root: Node<'_, '_>,
        guides: &[Node<'_, '_>],
    ) -> Result<(Decimal, TotalSource)> {
        let guide_element = DocumentType::SpSadt.guide_element();

        // A valorTotalGeral outside every guide is the document total
        let document_total = elements(root, "valorTotalGeral")
            .filter(|n| !n.ancestors().any(|a| is_element(&a, guide_element)))
            .map(|n| text(Some(n)))
            .find(|raw| !raw.is_empty());

        if let Some(raw) = document_total {
            if let Some(total) = reader.parse_optional("valorTotalGeral", &raw)? {
                debug!("Using document-level valorTotalGeral {}", total);
                return Ok((total, TotalSource::DeclaredTotal));
            }
        }

        let mut total = Decimal::ZERO;
        let mut declared = 0usize;
        let mut rebuilt = 0usize;
        let mut items_found = false;

        for guide in guides {
            match self.declared_guide_total(reader, *guide)? {
                Some(value) => {
                    declared += 1;
                    total = checked_sum("valorTotalGeral", total, value)?;
                }
                None => {
                    rebuilt += 1;
                    items_found |= !executed_procedures(*guide).is_empty()
                        || !other_expenses(*guide).is_empty();
                    let (procedures, others) = self.item_subtotals(reader, *guide)?;
                    let rebuilt_total = checked_sum("items_subtotal", procedures, others)?;
                    total = checked_sum("valorTotalGeral", total, rebuilt_total)?;
                }
            }
        }

        let source = match (declared, rebuilt) {
            (0, 0) => TotalSource::Empty,
            (_, 0) => TotalSource::GuideTotals,
            (0, _) if !items_found => TotalSource::Empty,
            (0, _) => TotalSource::ItemSum,
            _ => TotalSource::Mixed,
        };

        debug!(
            "SP-SADT total {} from {} declared and {} rebuilt guides",
            total, declared, rebuilt
        );

        Ok((total, source))
    }
}

impl Default for TissParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TissExtractor for TissParser {
    fn extract(&self, xml: &str) -> Result<ExtractionResult> {
        let start = Instant::now();

        let doc = parse_document(xml)?;
        let root = doc.root_element();
        let document_type = document_type(root);
        let batch_number = batch_number(root);
        let guides: Vec<Node<'_, '_>> = elements(root, document_type.guide_element()).collect();

        debug!("Detected {} document with {} guides", document_type, guides.len());

        let mut reader = AmountReader::new(self.strict_amounts);
        let (total_value, total_source) = match document_type {
            DocumentType::Consulta => self.consulta_total(&mut reader, &guides)?,
            DocumentType::SpSadt => self.sadt_total(&mut reader, root, &guides)?,
        };

        let mut warnings = reader.warnings;
        if batch_number.is_empty() {
            warnings.push("numeroLote not found".to_string());
        }
        if guides.is_empty() {
            warnings.push(format!("no {} elements found", document_type.guide_element()));
        } else if total_source == TotalSource::Empty {
            let missing = match document_type {
                DocumentType::Consulta => "no valorProcedimento values found; total is zero",
                DocumentType::SpSadt => "no valorTotalGeral or item values found; total is zero",
            };
            warnings.push(missing.to_string());
        }

        debug!(
            "Extracted batch {:?}: {} guides, total {} ({}) in {:?}",
            batch_number,
            guides.len(),
            total_value,
            total_source.as_str(),
            start.elapsed()
        );

        Ok(ExtractionResult {
            batch_number,
            guide_count: guides.len(),
            total_value,
            document_type,
            total_source,
            warnings,
            parser_version: PARSER_VERSION.to_string(),
        })
    }
}

/// Detect whether a document holds Consulta or SP-SADT guides.
pub fn detect_document_type(xml: &str) -> Result<DocumentType> {
    let doc = parse_document(xml)?;
    Ok(document_type(doc.root_element()))
}
