//! The operations callers actually invoke: merge, reorder, remove pages.
//!
//! This is the external boundary: inputs are raw byte buffers and textual
//! page selections in the 1-based notation users type; everything below
//! works with 0-based indices.

use super::assembler::{Assembler, PlanEntry};
use super::document::Document;
use super::error::{PdfError, PdfResult};
use super::writer;

/// Concatenate every page of every input, in input order.
pub fn merge(inputs: &[Vec<u8>]) -> PdfResult<Vec<u8>> {
    if inputs.is_empty() {
        return Err(PdfError::MalformedDocument(
            "merge requires at least one input document".to_string(),
        ));
    }
    let mut docs = open_all(inputs)?;
    let mut assembler = Assembler::new(&mut docs);

    let mut plan = Vec::new();
    for doc_index in 0..inputs.len() {
        for page_index in 0..assembler.page_count(doc_index)? {
            plan.push(PlanEntry {
                doc_index,
                page_index,
            });
        }
    }
    writer::serialize(&assembler.assemble(&plan)?)
}

/// Rebuild a document from an explicit page order.
///
/// `order` is a comma-separated list of two-digit tokens: first digit the
/// 1-based input document, second digit the 1-based page within it, e.g.
/// `11,21,12,22` interleaves the first two pages of two documents. Each
/// malformed token is rejected with the token echoed back; a token naming a
/// missing document or page fails range validation before any cloning.
pub fn reorder(inputs: &[Vec<u8>], order: &str) -> PdfResult<Vec<u8>> {
    // Spaces anywhere in the text are insignificant: "1 1, 2 1" == "11,21".
    let order = order.replace(' ', "");
    let mut plan = Vec::new();
    for token in order.split(',') {
        plan.push(parse_order_token(token)?);
    }

    let mut docs = open_all(inputs)?;
    let output = Assembler::new(&mut docs).assemble(&plan)?;
    writer::serialize(&output)
}

/// Drop the listed pages and keep the rest in original order.
///
/// `pages` is a comma-separated list of 1-based page numbers. Spaces are
/// stripped from the whole text before splitting, so "1 2" reads as page
/// 12. Non-numeric tokens are ignored rather than rejected, as are numbers
/// outside the document's page range.
pub fn remove_pages(input: &[u8], pages: &str) -> PdfResult<Vec<u8>> {
    let pages = pages.replace(' ', "");
    let mut removed = Vec::new();
    for token in pages.split(',') {
        match token.parse::<usize>() {
            Ok(number) if number > 0 => removed.push(number - 1),
            _ => log::debug!("ignoring page-removal token {:?}", token),
        }
    }

    let mut docs = vec![Document::parse(input.to_vec())?];
    let mut assembler = Assembler::new(&mut docs);

    let count = assembler.page_count(0)?;
    let plan: Vec<PlanEntry> = (0..count)
        .filter(|index| !removed.contains(index))
        .map(|page_index| PlanEntry {
            doc_index: 0,
            page_index,
        })
        .collect();
    writer::serialize(&assembler.assemble(&plan)?)
}

fn open_all(inputs: &[Vec<u8>]) -> PdfResult<Vec<Document>> {
    inputs
        .iter()
        .map(|data| Document::parse(data.clone()))
        .collect()
}

/// Tokens are exactly two digits, both nonzero: the notation addresses at
/// most nine documents of nine pages each.
fn parse_order_token(token: &str) -> PdfResult<PlanEntry> {
    let bytes = token.as_bytes();
    if bytes.len() != 2
        || !bytes.iter().all(u8::is_ascii_digit)
        || bytes.contains(&b'0')
    {
        return Err(PdfError::InvalidOrderToken(token.to_string()));
    }
    Ok(PlanEntry {
        doc_index: (bytes[0] - b'1') as usize,
        page_index: (bytes[1] - b'1') as usize,
    })
}
