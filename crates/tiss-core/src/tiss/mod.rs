//! TISS document extraction module.

mod parser;
pub mod rules;
mod xml;

pub use parser::{detect_document_type, TissParser};
pub use xml::decode_xml;

use crate::error::Result;
use crate::models::batch::ExtractionResult;

/// Version reported in every extraction result.
pub const PARSER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Trait for TISS batch extractors.
pub trait TissExtractor {
    /// Extract batch number, guide count and total value from XML text.
    fn extract(&self, xml: &str) -> Result<ExtractionResult>;

    /// Extract from raw file bytes, decoding them first.
    fn extract_bytes(&self, data: &[u8]) -> Result<ExtractionResult> {
        let text = decode_xml(data)?;
        self.extract(&text)
    }
}
