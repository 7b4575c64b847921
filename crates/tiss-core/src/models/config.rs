//! Configuration structures for the TISS reader.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TissError};

/// Main configuration for the tiss reader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TissConfig {
    /// Extraction configuration.
    pub extraction: ExtractionConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fail on unreadable amounts instead of counting them as zero.
    pub strict_amounts: bool,

    /// Compare the batch number in the file name with the document's.
    pub check_filename_lote: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strict_amounts: true,
            check_filename_lote: true,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Currency symbol used by the text format.
    pub currency_symbol: String,

    /// Pretty-print JSON output.
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "R$".to_string(),
            pretty_json: false,
        }
    }
}

impl TissConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| TissError::Config(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| TissError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TissConfig::default();
        assert!(config.extraction.strict_amounts);
        assert!(config.extraction.check_filename_lote);
        assert_eq!(config.output.currency_symbol, "R$");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: TissConfig =
            serde_json::from_str(r#"{"extraction": {"strict_amounts": false}}"#).unwrap();
        assert!(!config.extraction.strict_amounts);
        assert!(config.extraction.check_filename_lote);
        assert!(!config.output.pretty_json);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = TissConfig::default();
        config.output.pretty_json = true;
        config.save(&path).unwrap();

        let loaded = TissConfig::from_file(&path).unwrap();
        assert!(loaded.output.pretty_json);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(TissConfig::from_file(&path), Err(TissError::Config(_))));
    }
}
