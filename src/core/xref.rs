//! Cross-reference discovery and parsing.
//!
//! The trailer is located by a bounded backward scan for the `startxref`
//! marker; the PDF format puts it at a fixed distance from end-of-file
//! precisely so readers never need a full-file scan. From there the engine
//! reads classic tables, cross-reference streams, and hybrid files, and
//! follows the `/Prev` chain of incremental updates newest-first. Because
//! scanning is newest-first, an object entry already recorded is never
//! overridden by an older update.

use super::decode::decode_structural_stream;
use super::error::{PdfError, PdfResult};
use super::lexer::{Lexer, Token};
use super::object::{Dict, Object};
use super::parser::Parser;
use rustc_hash::{FxHashMap, FxHashSet};

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free-list entry; reads as null.
    Free,

    /// Uncompressed object at a byte offset.
    InUse { offset: u64 },

    /// Object hosted by an object stream: container object number plus the
    /// index of this object within the container.
    InStream { stream_num: u32, index: u32 },
}

/// Merged cross-reference table for one document.
#[derive(Debug, Default)]
pub struct Xref {
    entries: FxHashMap<u32, XrefEntry>,
    /// Trailer dictionary, merged across the update chain (newest wins).
    pub trailer: Dict,
}

impl Xref {
    /// Locate and read the full cross-reference structure of `data`.
    pub fn parse(data: &[u8]) -> PdfResult<Xref> {
        let start = find_startxref(data)?;

        let mut xref = Xref::default();
        let mut pending = vec![start];
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut cursor = 0;

        // Sections are processed newest-first; `pending` grows at the tail
        // so a hybrid file's /XRefStm is consulted before its /Prev.
        while cursor < pending.len() {
            let offset = pending[cursor];
            cursor += 1;

            if !visited.insert(offset) {
                // An offset loop would otherwise re-read sections forever.
                log::warn!("cross-reference chain revisits offset {}", offset);
                continue;
            }
            if offset as usize >= data.len() {
                return Err(PdfError::TruncatedFile {
                    offset,
                    len: data.len(),
                });
            }

            let section = read_section(data, offset as usize)?;
            for (num, entry) in section.entries {
                xref.entries.entry(num).or_insert(entry);
            }
            for (key, value) in section.trailer {
                xref.trailer.entry(key).or_insert(value);
            }
            pending.extend(section.follow);
        }

        Ok(xref)
    }

    pub fn get(&self, num: u32) -> Option<&XrefEntry> {
        self.entries.get(&num)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, num: u32, entry: XrefEntry) {
        self.entries.insert(num, entry);
    }
}

struct Section {
    entries: Vec<(u32, XrefEntry)>,
    trailer: Dict,
    /// Offsets to process after this section: /XRefStm first, then /Prev.
    follow: Vec<u64>,
}

/// Backward scan for the last `startxref` marker in the file tail.
fn find_startxref(data: &[u8]) -> PdfResult<u64> {
    const TAIL_SCAN: usize = 2048;
    let marker = b"startxref";

    let scan_from = data.len().saturating_sub(TAIL_SCAN);
    let tail = &data[scan_from..];
    let pos = tail
        .windows(marker.len())
        .rposition(|w| w == marker)
        .ok_or_else(|| {
            PdfError::MalformedDocument("startxref marker not found near end of file".to_string())
        })?;

    let mut lexer = Lexer::new_at(data, scan_from + pos + marker.len());
    match lexer.next_token()? {
        Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as u64),
        other => Err(PdfError::MalformedDocument(format!(
            "startxref is not followed by an offset, found {:?}",
            other
        ))),
    }
}

/// Read one cross-reference section (classic table or xref stream).
fn read_section(data: &[u8], offset: usize) -> PdfResult<Section> {
    let mut lexer = Lexer::new_at(data, offset);
    match lexer.next_token()? {
        Token::Command(cmd) if cmd == "xref" => read_classic_table(lexer),
        Token::Number(_) => read_xref_stream(data, offset),
        other => Err(PdfError::MalformedDocument(format!(
            "cross-reference section expected at offset {}, found {:?}",
            offset, other
        ))),
    }
}

/// Classic table: subsections of fixed-format entries, then `trailer`.
fn read_classic_table(mut lexer: Lexer<'_>) -> PdfResult<Section> {
    let mut entries = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::Command(cmd) if cmd == "trailer" => break,
            Token::Number(start) if start >= 0.0 && start.fract() == 0.0 => {
                let count = match lexer.next_token()? {
                    Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as u64,
                    other => {
                        return Err(PdfError::MalformedDocument(format!(
                            "xref subsection count expected, found {:?}",
                            other
                        )));
                    }
                };
                for i in 0..count {
                    let num = start as u64 + i;
                    let field1 = expect_integer(&mut lexer, "xref entry offset")?;
                    let _field2 = expect_integer(&mut lexer, "xref entry generation")?;
                    match lexer.next_token()? {
                        Token::Command(kind) if kind == "n" => {
                            entries.push((num as u32, XrefEntry::InUse { offset: field1 }));
                        }
                        Token::Command(kind) if kind == "f" => {
                            entries.push((num as u32, XrefEntry::Free));
                        }
                        other => {
                            return Err(PdfError::MalformedDocument(format!(
                                "xref entry type must be 'n' or 'f', found {:?}",
                                other
                            )));
                        }
                    }
                }
            }
            other => {
                return Err(PdfError::MalformedDocument(format!(
                    "malformed xref table near {:?}",
                    other
                )));
            }
        }
    }

    let trailer = match Parser::new(lexer)?.parse_object()? {
        Object::Dictionary(dict) => dict,
        other => {
            return Err(PdfError::MalformedDocument(format!(
                "trailer must be a dictionary, found {:?}",
                other
            )));
        }
    };

    let mut follow = Vec::new();
    if let Some(stm) = trailer.get("XRefStm").and_then(Object::as_index) {
        follow.push(stm);
    }
    if let Some(prev) = trailer.get("Prev").and_then(Object::as_index) {
        follow.push(prev);
    }

    Ok(Section {
        entries,
        trailer,
        follow,
    })
}

fn expect_integer(lexer: &mut Lexer<'_>, what: &str) -> PdfResult<u64> {
    match lexer.next_token()? {
        Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as u64),
        other => Err(PdfError::MalformedDocument(format!(
            "{} expected, found {:?}",
            what, other
        ))),
    }
}

/// Cross-reference stream: `/Type /XRef` with binary rows described by /W.
fn read_xref_stream(data: &[u8], offset: usize) -> PdfResult<Section> {
    let mut parser = Parser::new_at(data, offset)?;
    let (id, object) = parser.parse_indirect_object()?;
    let (dict, payload) = match object {
        Object::Stream { dict, data } => (dict, data),
        other => {
            return Err(PdfError::MalformedDocument(format!(
                "cross-reference stream expected at offset {}, found {:?}",
                offset, other
            )));
        }
    };

    if dict.get("Type").and_then(Object::as_name) != Some("XRef") {
        log::warn!("cross-reference stream {} lacks /Type /XRef", id.num);
    }

    let decoded = decode_structural_stream(&dict, &payload)?;

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| entry.as_index().map(|n| n as usize))
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 {
        return Err(PdfError::MalformedDocument(
            "cross-reference stream /W must hold three widths".to_string(),
        ));
    }

    let size = dict.get("Size").and_then(Object::as_index).unwrap_or(0);
    let index: Vec<u64> = match dict.get("Index").and_then(Object::as_array) {
        Some(arr) => arr
            .iter()
            .filter_map(|entry| entry.as_index())
            .collect(),
        None => vec![0, size],
    };
    if index.len() % 2 != 0 {
        return Err(PdfError::MalformedDocument(
            "cross-reference stream /Index must hold pairs".to_string(),
        ));
    }

    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(PdfError::MalformedDocument(
            "cross-reference stream rows have zero width".to_string(),
        ));
    }

    let mut entries = Vec::new();
    let mut rows = decoded.chunks_exact(row_len);
    'subsections: for range in index.chunks_exact(2) {
        let (first, count) = (range[0], range[1]);
        for i in 0..count {
            let row = match rows.next() {
                Some(row) => row,
                None => {
                    log::warn!("cross-reference stream shorter than /Index declares");
                    break 'subsections;
                }
            };
            let (type_field, rest) = row.split_at(widths[0]);
            let (field2, field3) = rest.split_at(widths[1]);

            // A zero-width type field defaults to type 1 (in use).
            let kind = if widths[0] == 0 {
                1
            } else {
                read_be(type_field)
            };
            let num = (first + i) as u32;
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::InUse {
                    offset: read_be(field2),
                },
                2 => XrefEntry::InStream {
                    stream_num: read_be(field2) as u32,
                    index: read_be(field3) as u32,
                },
                other => {
                    log::warn!("unknown xref entry type {} for object {}", other, num);
                    continue;
                }
            };
            entries.push((num, entry));
        }
    }

    let mut follow = Vec::new();
    if let Some(prev) = dict.get("Prev").and_then(Object::as_index) {
        follow.push(prev);
    }

    Ok(Section {
        entries,
        trailer: dict,
        follow,
    })
}

/// Big-endian integer of up to 8 bytes.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
