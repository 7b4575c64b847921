//! Error types for the tiss-core library.

use thiserror::Error;

/// Main error type for the tiss library.
#[derive(Error, Debug)]
pub enum TissError {
    /// The input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// The input bytes could not be decoded to text.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to TISS field extraction.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    /// A monetary or quantity field holds unreadable text.
    #[error("invalid amount in {field}: {value:?}")]
    InvalidAmount { field: String, value: String },

    /// A sum or product of amounts does not fit in a decimal.
    #[error("amount overflow while computing {field}")]
    AmountOverflow { field: String },
}

/// Result type for the tiss library.
pub type Result<T> = std::result::Result<T, TissError>;
