//! Core library for reading TISS XML billing batches.
//!
//! This crate provides:
//! - Document type detection (Consulta vs SP-SADT)
//! - Batch number, guide count and total value extraction
//! - Per-guide audit and item listing
//! - Brazilian amount parsing and currency formatting

pub mod error;
pub mod models;
pub mod tiss;

pub use error::{ExtractionError, Result, TissError};
pub use models::batch::{DocumentType, ExtractionResult, FileReport, TotalSource};
pub use models::guide::{GuideAudit, ItemKind, LineItem};
pub use models::config::TissConfig;
pub use tiss::{decode_xml, TissExtractor, TissParser, PARSER_VERSION};
