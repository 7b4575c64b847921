//! Common regex patterns.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Batch number embedded in a file name: "LOTE_123.xml", "lote-0456 envio.xml"
    pub static ref LOTE_IN_FILENAME: Regex = Regex::new(
        r"(?i)lote\s*[-_]*\s*(\d+)"
    ).unwrap();

    // Encoding attribute of the XML declaration, matched on raw bytes
    pub static ref XML_ENCODING_DECL: regex::bytes::Regex = regex::bytes::Regex::new(
        r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lote_in_filename() {
        assert_eq!(&LOTE_IN_FILENAME.captures("LOTE_123.xml").unwrap()[1], "123");
        assert_eq!(&LOTE_IN_FILENAME.captures("envio lote - 9.xml").unwrap()[1], "9");
        assert!(LOTE_IN_FILENAME.captures("guias.xml").is_none());
    }

    #[test]
    fn test_xml_encoding_decl() {
        let caps = XML_ENCODING_DECL
            .captures(br#"<?xml version="1.0" encoding='ISO-8859-1'?><a/>"#)
            .unwrap();
        assert_eq!(&caps[1], b"ISO-8859-1");
        assert!(XML_ENCODING_DECL.captures(br#"<?xml version="1.0"?><a/>"#).is_none());
    }
}
