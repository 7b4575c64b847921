//! Value rules for TISS fields.

pub mod amounts;
pub mod lote;
pub mod patterns;

pub use amounts::{format_br_amount, format_currency, format_currency_br, parse_br_amount};
pub use lote::{lote_from_filename, lote_matches};
