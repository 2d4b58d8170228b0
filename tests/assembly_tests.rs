//! End-to-end tests for the merge, reorder, and remove operations.
//!
//! Each test builds source documents programmatically, runs an engine
//! operation, and re-parses the output to verify page order and content.


use pdf_weld::{merge, remove_pages, reorder, PdfError};
use test_utils::*;

fn markers_of(output: &[u8]) -> Vec<String> {
    page_markers(output)
        .iter()
        .map(|text| {
            let start = text.find('(').unwrap() + 1;
            let end = text.find(')').unwrap();
            text[start..end].to_string()
        })
        .collect()
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_preserves_order_and_count() {
    let a = multi_page_pdf("A", 3);
    let b = multi_page_pdf("B", 2);
    let output = merge(&[a, b]).unwrap();
    assert_eq!(
        markers_of(&output),
        vec!["page A0", "page A1", "page A2", "page B0", "page B1"]
    );
}

#[test]
fn test_merge_single_document_round_trips() {
    let a = multi_page_pdf("A", 2);
    let output = merge(&[a.clone()]).unwrap();
    assert_eq!(markers_of(&output), markers_of(&merge(&[output.clone()]).unwrap()));
    assert_eq!(markers_of(&a), markers_of(&output));
}

#[test]
fn test_merge_deduplicates_shared_resources() {
    // Source: catalog, pages root, 3 pages, 3 content streams, 1 shared
    // font. The rebuilt document must hold exactly those 9 objects.
    let a = multi_page_pdf("A", 3);
    let output = merge(&[a]).unwrap();
    assert_eq!(trailer_size(&output), 10);
}

#[test]
fn test_merge_accepts_xref_stream_input() {
    let modern = xref_stream_pdf("M");
    let classic = multi_page_pdf("C", 1);
    let output = merge(&[modern, classic]).unwrap();
    assert_eq!(markers_of(&output), vec!["page M0", "page C0"]);
}

// ============================================================================
// Reorder
// ============================================================================

#[test]
fn test_reorder_interleaves_two_documents() {
    let a = multi_page_pdf("A", 2);
    let b = multi_page_pdf("B", 2);
    let output = reorder(&[a, b], "11,21,12,22").unwrap();
    assert_eq!(
        markers_of(&output),
        vec!["page A0", "page B0", "page A1", "page B1"]
    );
}

#[test]
fn test_reorder_identity_is_noop_on_content() {
    let a = multi_page_pdf("A", 3);
    let output = reorder(&[a.clone()], "11,12,13").unwrap();
    assert_eq!(markers_of(&output), markers_of(&a));
}

#[test]
fn test_reorder_can_duplicate_and_drop_pages() {
    let a = multi_page_pdf("A", 3);
    let output = reorder(&[a], "13,13,11").unwrap();
    assert_eq!(markers_of(&output), vec!["page A2", "page A2", "page A0"]);
}

#[test]
fn test_reorder_ignores_spaces_in_order_text() {
    let a = multi_page_pdf("A", 1);
    let b = multi_page_pdf("B", 1);
    let output = reorder(&[a, b], " 2 1 , 1 1 ").unwrap();
    assert_eq!(markers_of(&output), vec!["page B0", "page A0"]);
}

#[test]
fn test_reorder_rejects_malformed_token() {
    let a = multi_page_pdf("A", 1);
    match reorder(&[a], "11,1x") {
        Err(PdfError::InvalidOrderToken(token)) => assert_eq!(token, "1x"),
        other => panic!("expected InvalidOrderToken, got {:?}", other),
    }
}

#[test]
fn test_reorder_rejects_missing_document() {
    let a = multi_page_pdf("A", 1);
    let b = multi_page_pdf("B", 1);
    match reorder(&[a, b], "11,31") {
        Err(PdfError::PageIndexOutOfRange { doc_index, .. }) => assert_eq!(doc_index, 2),
        other => panic!("expected PageIndexOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_reorder_rejects_missing_page() {
    let a = multi_page_pdf("A", 2);
    match reorder(&[a], "11,13") {
        Err(PdfError::PageIndexOutOfRange {
            doc_index,
            page_index,
        }) => assert_eq!((doc_index, page_index), (0, 2)),
        other => panic!("expected PageIndexOutOfRange, got {:?}", other),
    }
}

// ============================================================================
// Remove
// ============================================================================

#[test]
fn test_remove_is_complement_of_keep() {
    let a = multi_page_pdf("A", 3);
    let output = remove_pages(&a, "2").unwrap();
    assert_eq!(markers_of(&output), vec!["page A0", "page A2"]);
}

#[test]
fn test_remove_multiple_pages() {
    let a = multi_page_pdf("A", 5);
    let output = remove_pages(&a, "1,3,5").unwrap();
    assert_eq!(markers_of(&output), vec!["page A1", "page A3"]);
}

#[test]
fn test_remove_ignores_non_numeric_tokens() {
    let a = multi_page_pdf("A", 3);
    let output = remove_pages(&a, "abc, 2 ,,-7").unwrap();
    assert_eq!(markers_of(&output), vec!["page A0", "page A2"]);
}

#[test]
fn test_remove_strips_spaces_before_splitting() {
    // Spaces vanish from the whole text first, so "1 2" is page 12, not a
    // dropped token.
    let a = multi_page_pdf("A", 12);
    let output = remove_pages(&a, "1 2").unwrap();
    let markers = markers_of(&output);
    assert_eq!(markers.len(), 11);
    assert!(!markers.contains(&"page A11".to_string()));
}

#[test]
fn test_remove_ignores_out_of_range_numbers() {
    let a = multi_page_pdf("A", 2);
    let output = remove_pages(&a, "0,9").unwrap();
    assert_eq!(markers_of(&output), vec!["page A0", "page A1"]);
}

#[test]
fn test_remove_everything_yields_empty_document() {
    let a = multi_page_pdf("A", 2);
    let output = remove_pages(&a, "1,2").unwrap();
    assert!(markers_of(&output).is_empty());
    // Still a parseable document with a catalog and empty page tree.
    assert_eq!(trailer_size(&output), 3);
}
