//! Stream filter decoding.
//!
//! The engine never decodes page content for its own sake; it only needs
//! decoded bytes where the file structure itself is compressed, i.e.
//! cross-reference streams and object streams. Those are FlateDecode in
//! practice, optionally with a PNG or TIFF predictor.

use super::error::{PdfError, PdfResult};
use super::object::{Dict, Object};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// Decode a FlateDecode payload. Zlib framing is tried first; some files
/// carry raw deflate data without the zlib header.
pub fn decode_flate(compressed: &[u8]) -> PdfResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut zlib = ZlibDecoder::new(compressed);
    if zlib.read_to_end(&mut out).is_ok() {
        return Ok(out);
    }

    out.clear();
    let mut raw = DeflateDecoder::new(compressed);
    match raw.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) => Err(PdfError::MalformedDocument(format!(
            "FlateDecode failed: {}",
            e
        ))),
    }
}

/// Reverse a predictor applied before compression (ISO 32000-1 table 10).
/// Predictor 2 is the TIFF horizontal differencing predictor; 10..=15 are
/// the PNG filters, selected per row by a leading tag byte.
pub fn undo_predictor(
    data: Vec<u8>,
    predictor: u32,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
) -> PdfResult<Vec<u8>> {
    if predictor <= 1 {
        return Ok(data);
    }

    let pix_bytes = (colors * bits_per_component + 7) / 8;
    let row_bytes = (columns * colors * bits_per_component + 7) / 8;
    if row_bytes == 0 {
        return Ok(data);
    }

    if predictor == 2 {
        if bits_per_component != 8 {
            return Err(PdfError::UnsupportedFeature(format!(
                "TIFF predictor with {} bits per component",
                bits_per_component
            )));
        }
        let mut out = data;
        for row in out.chunks_mut(row_bytes) {
            for i in pix_bytes..row.len() {
                row[i] = row[i].wrapping_add(row[i - pix_bytes]);
            }
        }
        return Ok(out);
    }

    // PNG predictors: each row is one tag byte plus row_bytes of data.
    let stride = row_bytes + 1;
    let rows = data.len() / stride;
    let mut out = Vec::with_capacity(rows * row_bytes);
    let mut prev_row = vec![0u8; row_bytes];

    for row_index in 0..rows {
        let row = &data[row_index * stride..(row_index + 1) * stride];
        let tag = row[0];
        let mut current = row[1..].to_vec();

        match tag {
            0 => {}
            1 => {
                for i in pix_bytes..row_bytes {
                    current[i] = current[i].wrapping_add(current[i - pix_bytes]);
                }
            }
            2 => {
                for i in 0..row_bytes {
                    current[i] = current[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_bytes {
                    let left = if i >= pix_bytes {
                        current[i - pix_bytes] as u16
                    } else {
                        0
                    };
                    let up = prev_row[i] as u16;
                    current[i] = current[i].wrapping_add(((left + up) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_bytes {
                    let left = if i >= pix_bytes {
                        current[i - pix_bytes] as i16
                    } else {
                        0
                    };
                    let up = prev_row[i] as i16;
                    let up_left = if i >= pix_bytes {
                        prev_row[i - pix_bytes] as i16
                    } else {
                        0
                    };
                    current[i] = current[i].wrapping_add(paeth(left, up, up_left));
                }
            }
            other => {
                return Err(PdfError::MalformedDocument(format!(
                    "invalid PNG predictor tag {}",
                    other
                )));
            }
        }

        out.extend_from_slice(&current);
        prev_row = current;
    }

    Ok(out)
}

fn paeth(left: i16, up: i16, up_left: i16) -> u8 {
    let p = left + up - up_left;
    let pa = (p - left).abs();
    let pb = (p - up).abs();
    let pc = (p - up_left).abs();
    if pa <= pb && pa <= pc {
        left as u8
    } else if pb <= pc {
        up as u8
    } else {
        up_left as u8
    }
}

/// Decode a structural stream (xref stream or object stream) according to
/// its /Filter and /DecodeParms entries. Filters other than FlateDecode are
/// rejected: structural streams using exotic filters are out of scope.
pub fn decode_structural_stream(dict: &Dict, data: &[u8]) -> PdfResult<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None => Vec::new(),
        Some(Object::Name(name)) => vec![name.as_str()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|entry| entry.as_name())
            .collect(),
        Some(other) => {
            return Err(PdfError::MalformedDocument(format!(
                "/Filter must be a name or array, found {:?}",
                other
            )));
        }
    };

    let parms: Vec<Option<&Dict>> = match dict.get("DecodeParms") {
        None => vec![None; filters.len()],
        Some(Object::Dictionary(d)) => vec![Some(d)],
        Some(Object::Array(arr)) => arr.iter().map(|entry| entry.as_dict()).collect(),
        Some(Object::Null) => vec![None; filters.len()],
        Some(other) => {
            return Err(PdfError::MalformedDocument(format!(
                "/DecodeParms must be a dictionary or array, found {:?}",
                other
            )));
        }
    };

    let mut out = data.to_vec();
    for (index, filter) in filters.iter().enumerate() {
        match *filter {
            "FlateDecode" | "Fl" => {
                out = decode_flate(&out)?;
                if let Some(Some(parm)) = parms.get(index) {
                    let get = |key: &str, default: u64| {
                        parm.get(key).and_then(Object::as_index).unwrap_or(default)
                    };
                    let predictor = get("Predictor", 1) as u32;
                    out = undo_predictor(
                        out,
                        predictor,
                        get("Colors", 1) as usize,
                        get("BitsPerComponent", 8) as usize,
                        get("Columns", 1) as usize,
                    )?;
                }
            }
            other => {
                return Err(PdfError::UnsupportedFeature(format!(
                    "stream filter {}",
                    other
                )));
            }
        }
    }
    Ok(out)
}
