//! Text formats for product batches.
//!
//! Import input is auto-detected from its first non-whitespace byte:
//! `[` is a JSON array; anything else is one JSON object per non-blank line
//! (newline-delimited JSON). A single pretty-printed object is accepted too.

use crate::error::{StoreError, StoreResult};
use crate::product::Product;

/// Shape of an import document, as detected by [`detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// `[ {...}, {...} ]`
    Array,
    /// One object per line, or a single object.
    Lines,
    /// No content at all.
    Empty,
}

/// Detects the import format from the first non-whitespace byte.
#[must_use]
pub fn detect_format(input: &[u8]) -> ImportFormat {
    match input.iter().find(|b| !b.is_ascii_whitespace()) {
        None => ImportFormat::Empty,
        Some(b'[') => ImportFormat::Array,
        Some(_) => ImportFormat::Lines,
    }
}

/// Decodes an import document into products.
///
/// Any malformed line fails the whole decode, so nothing reaches a store
/// from a partially readable document. Empty input decodes to no products.
pub fn decode_products(input: &[u8]) -> StoreResult<Vec<Product>> {
    match detect_format(input) {
        ImportFormat::Empty => Ok(Vec::new()),
        ImportFormat::Array => {
            serde_json::from_slice(input).map_err(|source| StoreError::Decode { line: None, source })
        }
        ImportFormat::Lines => {
            if let Ok(single) = serde_json::from_slice::<Product>(input) {
                return Ok(vec![single]);
            }
            decode_lines(input)
        }
    }
}

fn decode_lines(input: &[u8]) -> StoreResult<Vec<Product>> {
    let mut products = Vec::new();
    for (idx, line) in input.split(|b| *b == b'\n').enumerate() {
        let line = trim_ascii_whitespace(line);
        if line.is_empty() {
            continue;
        }
        let product = serde_json::from_slice(line).map_err(|source| StoreError::Decode {
            line: Some(idx + 1),
            source,
        })?;
        products.push(product);
    }
    Ok(products)
}

fn trim_ascii_whitespace(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Encodes products as a pretty-printed JSON array with a trailing newline.
pub fn encode_products(products: &[Product]) -> StoreResult<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(products).map_err(|source| StoreError::Encode { source })?;
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats() {
        assert_eq!(detect_format(b"  \n\t"), ImportFormat::Empty);
        assert_eq!(detect_format(b"\n  [ ]"), ImportFormat::Array);
        assert_eq!(detect_format(b"{\"id\":\"a\"}"), ImportFormat::Lines);
    }

    #[test]
    fn decodes_array() {
        let input = br#"
            [{"id":"a","name":"A","price":1.5,"quantity":2,"category":"x"},
             {"id":"b","name":"B","price":3,"quantity":4,"category":"y"}]
        "#;
        let products = decode_products(input).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].id.as_str(), "b");
        assert_eq!(products[1].price, 3.0);
    }

    #[test]
    fn decodes_ndjson_skipping_blank_lines() {
        let input = b"{\"id\":\"a\",\"name\":\"A\",\"price\":1,\"quantity\":1}\r\n\n  \n{\"id\":\"b\",\"name\":\"B\",\"price\":2,\"quantity\":2}\n";
        let products = decode_products(input).unwrap();
        let ids: Vec<_> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn decodes_single_pretty_object() {
        let input = b"{\n  \"id\": \"solo\",\n  \"name\": \"Solo\",\n  \"price\": 9.99,\n  \"quantity\": 1\n}\n";
        let products = decode_products(input).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Solo");
    }

    #[test]
    fn bad_line_fails_whole_document_with_line_number() {
        let input = b"{\"id\":\"a\",\"name\":\"A\"}\n\n{not json}\n{\"id\":\"c\",\"name\":\"C\"}";
        let err = decode_products(input).unwrap_err();
        let StoreError::Decode { line, .. } = err else {
            panic!("expected Decode, got {err:?}");
        };
        assert_eq!(line, Some(3));
    }

    #[test]
    fn bad_array_fails() {
        let err = decode_products(b"[{\"id\":\"a\"},").unwrap_err();
        assert!(matches!(err, StoreError::Decode { line: None, .. }));
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        assert!(decode_products(b"").unwrap().is_empty());
        assert!(decode_products(b"   \n").unwrap().is_empty());
    }

    #[test]
    fn encoded_output_reads_back() {
        let products = vec![Product::new("a", "A", 1.25, 3, "c")];
        let bytes = encode_products(&products).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(decode_products(&bytes).unwrap(), products);
    }
}
