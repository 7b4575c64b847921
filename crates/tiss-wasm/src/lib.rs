//! WASM bindings for reading TISS XML billing batches.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.

use wasm_bindgen::prelude::*;

use tiss_core::models::batch::FileReport;
use tiss_core::{decode_xml, TissExtractor, TissParser};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    tiss_core::PARSER_VERSION.to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn report(parser: &TissParser, data: &[u8], file_name: Option<String>) -> Result<FileReport, JsValue> {
    let result = parser.extract_bytes(data).map_err(js_error)?;

    for warning in &result.warnings {
        web_sys::console::warn_1(&JsValue::from_str(warning));
    }

    // Only uploads with a real name can be checked against their batch number
    let check_filename = file_name.is_some();
    Ok(FileReport::new(
        file_name.unwrap_or_else(|| "upload.xml".to_string()),
        result,
        check_filename,
    ))
}

/// Extract batch number, guide count and total value from raw XML bytes.
///
/// `file_name` is the uploaded file's name; when given, its batch number is
/// compared with the document's.
#[wasm_bindgen]
pub fn extract_from_xml(data: &[u8], file_name: Option<String>) -> Result<JsValue, JsValue> {
    let report = report(&TissParser::new(), data, file_name)?;
    serde_wasm_bindgen::to_value(&report).map_err(js_error)
}

/// Same as `extract_from_xml`, serialized as a JSON string.
#[wasm_bindgen]
pub fn extract_json_from_xml(data: &[u8], file_name: Option<String>) -> Result<String, JsValue> {
    let report = report(&TissParser::new(), data, file_name)?;
    serde_json::to_string(&report).map_err(js_error)
}

/// Per-guide declared totals and item subtotals.
#[wasm_bindgen]
pub fn audit_from_xml(data: &[u8]) -> Result<JsValue, JsValue> {
    TissReader::new().audit(data)
}

/// Every billed item of the document.
#[wasm_bindgen]
pub fn items_from_xml(data: &[u8]) -> Result<JsValue, JsValue> {
    TissReader::new().items(data)
}

/// Parse a Brazilian-formatted amount (e.g., "1.234,56").
#[wasm_bindgen]
pub fn parse_br_amount(amount: &str) -> Option<f64> {
    tiss_core::tiss::rules::parse_br_amount(amount)
        .map(|d| d.to_string().parse().unwrap_or(0.0))
}

/// Format an amount as Brazilian currency (R$ 1.234,56).
///
/// Returns the input unchanged when it is not a readable amount.
#[wasm_bindgen]
pub fn format_currency_br(amount: &str) -> String {
    match tiss_core::tiss::rules::parse_br_amount(amount) {
        Some(value) => tiss_core::tiss::rules::format_currency_br(value),
        None => amount.to_string(),
    }
}

/// TISS reader class for browser use.
#[wasm_bindgen]
pub struct TissReader {
    parser: TissParser,
}

#[wasm_bindgen]
impl TissReader {
    /// Create a reader that rejects unreadable amounts.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: TissParser::new(),
        }
    }

    /// Fail on unreadable amounts (true) or skip them with a warning (false).
    #[wasm_bindgen]
    pub fn set_strict_amounts(&mut self, strict: bool) {
        self.parser = TissParser::new().with_strict_amounts(strict);
    }

    /// Extract the file report.
    #[wasm_bindgen]
    pub fn extract(&self, data: &[u8], file_name: Option<String>) -> Result<JsValue, JsValue> {
        let report = report(&self.parser, data, file_name)?;
        serde_wasm_bindgen::to_value(&report).map_err(js_error)
    }

    /// Audit every guide.
    #[wasm_bindgen]
    pub fn audit(&self, data: &[u8]) -> Result<JsValue, JsValue> {
        let xml = decode_xml(data).map_err(js_error)?;
        let audits = self.parser.audit(&xml).map_err(js_error)?;
        serde_wasm_bindgen::to_value(&audits).map_err(js_error)
    }

    /// List every billed item.
    #[wasm_bindgen]
    pub fn items(&self, data: &[u8]) -> Result<JsValue, JsValue> {
        let xml = decode_xml(data).map_err(js_error)?;
        let items = self.parser.items(&xml).map_err(js_error)?;
        serde_wasm_bindgen::to_value(&items).map_err(js_error)
    }
}

impl Default for TissReader {
    fn default() -> Self {
        Self::new()
    }
}
