//! # Document Numbering
//!
//! Human-readable document numbers: `ORD-0001`, `INV-0042`, `SAL-10000`.
//!
//! The sequence value itself comes from the per-kind counter in erp-db
//! (`document_sequences`), incremented in the same transaction as the
//! document insert. This module only formats and parses.

use crate::error::ValidationError;
use crate::types::DocumentKind;
use crate::NUMBER_PAD_WIDTH;

/// Formats the `seq`-th number for `kind`. Values wider than the padding
/// keep all their digits.
///
/// ## Example
/// ```rust
/// use erp_core::numbering::document_number;
/// use erp_core::types::DocumentKind;
///
/// assert_eq!(document_number(DocumentKind::Order, 1), "ORD-0001");
/// assert_eq!(document_number(DocumentKind::Sale, 12345), "SAL-12345");
/// ```
pub fn document_number(kind: DocumentKind, seq: i64) -> String {
    format!("{}-{:0width$}", kind.prefix(), seq, width = NUMBER_PAD_WIDTH)
}

/// Splits a document number back into its kind and sequence value.
pub fn parse_document_number(number: &str) -> Result<(DocumentKind, i64), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "number".to_string(),
        reason: reason.to_string(),
    };

    let (prefix, digits) = number
        .split_once('-')
        .ok_or_else(|| invalid("expected PREFIX-NNNN"))?;

    let kind = DocumentKind::ALL
        .into_iter()
        .find(|k| k.prefix() == prefix)
        .ok_or_else(|| invalid("unknown prefix"))?;

    if digits.len() < NUMBER_PAD_WIDTH || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("sequence must be at least four digits"));
    }

    let seq: i64 = digits.parse().map_err(|_| invalid("sequence out of range"))?;
    if seq < 1 {
        return Err(invalid("sequence starts at 1"));
    }

    Ok((kind, seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_with_padding() {
        assert_eq!(document_number(DocumentKind::Order, 1), "ORD-0001");
        assert_eq!(document_number(DocumentKind::Invoice, 42), "INV-0042");
        assert_eq!(document_number(DocumentKind::Sale, 9999), "SAL-9999");
        assert_eq!(document_number(DocumentKind::Order, 10000), "ORD-10000");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            parse_document_number("INV-0042").unwrap(),
            (DocumentKind::Invoice, 42)
        );
        assert_eq!(
            parse_document_number("ORD-10000").unwrap(),
            (DocumentKind::Order, 10000)
        );

        assert!(parse_document_number("INV42").is_err());
        assert!(parse_document_number("QUO-0001").is_err());
        assert!(parse_document_number("INV-42").is_err());
        assert!(parse_document_number("INV-00a2").is_err());
        assert!(parse_document_number("INV-0000").is_err());
    }

    #[test]
    fn test_numbers_sort_in_sequence_order_within_padding() {
        let mut numbers: Vec<String> = (1..=12)
            .rev()
            .map(|n| document_number(DocumentKind::Order, n))
            .collect();
        numbers.sort();
        assert_eq!(numbers.first().map(String::as_str), Some("ORD-0001"));
        assert_eq!(numbers.last().map(String::as_str), Some("ORD-0012"));
    }
}
