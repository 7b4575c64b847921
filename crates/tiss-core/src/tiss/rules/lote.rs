//! Batch number (lote) helpers.

use super::patterns::LOTE_IN_FILENAME;

/// Extract the batch number from a file name such as `LOTE_00123.xml`.
pub fn lote_from_filename(name: &str) -> Option<String> {
    LOTE_IN_FILENAME
        .captures(name)
        .map(|caps| caps[1].to_string())
}

/// Compare two batch numbers, ignoring surrounding whitespace and leading zeros.
pub fn lote_matches(file_lote: &str, document_lote: &str) -> bool {
    fn normalize(s: &str) -> &str {
        let s = s.trim();
        let stripped = s.trim_start_matches('0');
        if stripped.is_empty() && !s.is_empty() { "0" } else { stripped }
    }

    normalize(file_lote) == normalize(document_lote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lote_from_filename() {
        assert_eq!(lote_from_filename("LOTE_00123.xml"), Some("00123".to_string()));
        assert_eq!(lote_from_filename("envio-Lote 77 final.xml"), Some("77".to_string()));
        assert_eq!(lote_from_filename("guias.xml"), None);
    }

    #[test]
    fn test_lote_matches() {
        assert!(lote_matches("00123", "123"));
        assert!(lote_matches(" 123 ", "123"));
        assert!(lote_matches("0", "000"));
        assert!(!lote_matches("123", "124"));
        assert!(!lote_matches("123", ""));
        assert!(lote_matches("", ""));
    }
}
