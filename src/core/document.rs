//! A parsed PDF document: byte buffer, merged cross-reference table, and an
//! object fetch path with caching.

use super::error::{PdfError, PdfResult};
use super::lexer::Lexer;
use super::object::{Dict, Object};
use super::parser::Parser;
use super::xref::{Xref, XrefEntry};
use rustc_hash::FxHashMap;

/// A read-only source document. The byte buffer is never mutated after
/// parse; the only interior state is the fetch cache.
#[derive(Debug)]
pub struct Document {
    data: Vec<u8>,
    xref: Xref,
    cache: FxHashMap<u32, Object>,
}

impl Document {
    /// Parse a PDF byte buffer.
    ///
    /// This reads the cross-reference structure eagerly and validates that
    /// the document is not encrypted; individual objects are parsed lazily
    /// on fetch.
    pub fn parse(data: Vec<u8>) -> PdfResult<Self> {
        if !data.starts_with(b"%PDF-") {
            // Readers are expected to tolerate a missing header line.
            log::warn!("buffer does not start with %PDF- header");
        }

        let xref = Xref::parse(&data)?;

        if xref.trailer.get("Encrypt").is_some_and(|e| !e.is_null()) {
            return Err(PdfError::UnsupportedFeature(
                "encrypted document (/Encrypt present)".to_string(),
            ));
        }

        Ok(Document {
            data,
            xref,
            cache: FxHashMap::default(),
        })
    }

    pub fn trailer(&self) -> &Dict {
        &self.xref.trailer
    }

    /// The document catalog (the dictionary the trailer's /Root points at).
    pub fn catalog(&mut self) -> PdfResult<Dict> {
        let root = self
            .xref
            .trailer
            .get("Root")
            .cloned()
            .ok_or(PdfError::MissingCatalog)?;
        match self.resolve(&root)? {
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(PdfError::MissingCatalog),
        }
    }

    /// Fetch an indirect object by number.
    ///
    /// Unknown and free object numbers resolve to null rather than failing:
    /// real-world files routinely carry dangling references, and the format
    /// defines them to read as null.
    pub fn fetch(&mut self, num: u32) -> PdfResult<Object> {
        if let Some(cached) = self.cache.get(&num) {
            return Ok(cached.clone());
        }

        let entry = match self.xref.get(num) {
            Some(entry) => *entry,
            None => {
                log::warn!("reference to unknown object {}; reading as null", num);
                return Ok(Object::Null);
            }
        };

        let object = match entry {
            XrefEntry::Free => Object::Null,
            XrefEntry::InUse { offset } => self.parse_at(num, offset)?,
            XrefEntry::InStream { stream_num, index } => {
                self.parse_compressed(num, stream_num, index)?
            }
        };

        self.cache.insert(num, object.clone());
        Ok(object)
    }

    /// Resolve one level of indirection: references are fetched, everything
    /// else is returned as-is.
    pub fn resolve(&mut self, object: &Object) -> PdfResult<Object> {
        match object {
            Object::Reference(id) => self.fetch(id.num),
            other => Ok(other.clone()),
        }
    }

    fn parse_at(&mut self, num: u32, offset: u64) -> PdfResult<Object> {
        if offset as usize >= self.data.len() {
            return Err(PdfError::TruncatedFile {
                offset,
                len: self.data.len(),
            });
        }
        let mut parser = Parser::new_at(&self.data, offset as usize)?;
        let (id, object) = parser.parse_indirect_object()?;
        if id.num != num {
            log::warn!(
                "cross-reference entry for object {} points at object {}",
                num,
                id.num
            );
        }
        Ok(object)
    }

    /// Load an object hosted by an object stream (`/Type /ObjStm`).
    fn parse_compressed(&mut self, num: u32, stream_num: u32, index: u32) -> PdfResult<Object> {
        // Containers must themselves be uncompressed; this also rules out
        // container cycles.
        match self.xref.get(stream_num) {
            Some(XrefEntry::InUse { .. }) => {}
            _ => {
                return Err(PdfError::CorruptObjectStream {
                    num,
                    reason: format!("container {} is not an uncompressed object", stream_num),
                });
            }
        }

        let (dict, payload) = match self.fetch(stream_num)? {
            Object::Stream { dict, data } => (dict, data),
            other => {
                return Err(PdfError::CorruptObjectStream {
                    num,
                    reason: format!("container {} is not a stream, found {:?}", stream_num, other),
                });
            }
        };

        if dict.get("Type").and_then(Object::as_name) != Some("ObjStm") {
            log::warn!("object stream {} lacks /Type /ObjStm", stream_num);
        }

        let decoded = super::decode::decode_structural_stream(&dict, &payload).map_err(|e| {
            match e {
                // Unsupported filters keep their own category.
                err @ PdfError::UnsupportedFeature(_) => err,
                other => PdfError::CorruptObjectStream {
                    num,
                    reason: other.to_string(),
                },
            }
        })?;

        let count = dict.get("N").and_then(Object::as_index).ok_or_else(|| {
            PdfError::CorruptObjectStream {
                num,
                reason: "container lacks /N".to_string(),
            }
        })? as usize;
        let first = dict.get("First").and_then(Object::as_index).ok_or_else(|| {
            PdfError::CorruptObjectStream {
                num,
                reason: "container lacks /First".to_string(),
            }
        })? as usize;

        // Header: `N` pairs of (object number, offset relative to /First).
        let mut header = Lexer::new(&decoded);
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let obj_num = header_integer(&mut header, num)?;
            let rel_offset = header_integer(&mut header, num)?;
            pairs.push((obj_num as u32, rel_offset as usize));
        }

        // The xref entry names the index; trust it when consistent, fall
        // back to searching by object number otherwise.
        let pair = match pairs.get(index as usize) {
            Some(&(n, off)) if n == num => (n, off),
            _ => *pairs
                .iter()
                .find(|(n, _)| *n == num)
                .ok_or_else(|| PdfError::CorruptObjectStream {
                    num,
                    reason: format!("object not listed in container {}", stream_num),
                })?,
        };

        let at = first + pair.1;
        if at >= decoded.len() {
            return Err(PdfError::CorruptObjectStream {
                num,
                reason: format!("offset {} past decoded length {}", at, decoded.len()),
            });
        }

        Parser::new_at(&decoded, at)?.parse_object()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(data: Vec<u8>, xref: Xref) -> Self {
        Document {
            data,
            xref,
            cache: FxHashMap::default(),
        }
    }
}

fn header_integer(lexer: &mut Lexer<'_>, num: u32) -> PdfResult<u64> {
    match lexer.next_token()? {
        super::lexer::Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as u64),
        other => Err(PdfError::CorruptObjectStream {
            num,
            reason: format!("malformed container header, found {:?}", other),
        }),
    }
}
