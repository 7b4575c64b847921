//! Small navigation helpers over a roxmltree document.
//!
//! TISS files are usually namespaced (`ans:`), but some generators omit the
//! namespace. All lookups match on the local element name only.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use roxmltree::Node;
use tracing::debug;

use crate::error::{Result, TissError};
use super::rules::patterns::XML_ENCODING_DECL;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Whether `node` is an element with the given local name.
pub(crate) fn is_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.has_tag_name(name)
}

/// First direct child element with the given name.
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_element(n, name))
}

/// First descendant element (excluding `node` itself) with the given name.
pub(crate) fn descendant<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    elements(node, name).next()
}

/// All descendant elements (excluding `node` itself) with the given name, in document order.
pub(crate) fn elements<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .filter(move |n| is_element(n, name))
}

/// Follow a chain of direct children starting at `node`.
pub(crate) fn path<'a, 'input>(node: Node<'a, 'input>, steps: &[&str]) -> Option<Node<'a, 'input>> {
    steps.iter().try_fold(node, |current, step| child(current, step))
}

/// Find `steps[0]` anywhere below `node`, then follow the remaining steps as children.
///
/// Equivalent to the XPath `.//a/b/c`; the first complete match wins.
pub(crate) fn find_path<'a, 'input>(
    node: Node<'a, 'input>,
    steps: &[&str],
) -> Option<Node<'a, 'input>> {
    let (first, rest) = steps.split_first()?;
    elements(node, first).find_map(|start| path(start, rest))
}

/// Trimmed text content of an optional element; empty when missing.
pub(crate) fn text(node: Option<Node<'_, '_>>) -> String {
    node.and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Decode raw file bytes into text.
///
/// Honors a UTF-8 BOM and the encoding named in the XML declaration
/// (TISS files are frequently ISO-8859-1). Defaults to UTF-8.
pub fn decode_xml(data: &[u8]) -> Result<Cow<'_, str>> {
    let body = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let encoding = XML_ENCODING_DECL
        .captures(body)
        .and_then(|caps| Encoding::for_label(&caps[1]))
        .unwrap_or(UTF_8);

    debug!("Decoding XML input as {}", encoding.name());

    let (text, used, had_errors) = encoding.decode(data);
    if had_errors {
        return Err(TissError::Encoding(format!(
            "input is not valid {}",
            used.name()
        )));
    }

    Ok(text)
}
