//! Serialization of an assembled arena into a complete single-section PDF.
//!
//! Output is deterministic: objects are written in ascending number order
//! and dictionary keys are sorted, so identical arenas yield identical
//! bytes.

use super::assembler::OutputDocument;
use super::error::{PdfError, PdfResult};
use super::object::{Dict, Object};

const HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

/// Serialize the arena. Fails if any reference points outside it; the
/// assembler never produces such references, so one indicates arena
/// corruption rather than a bad input file.
pub fn serialize(doc: &OutputDocument) -> PdfResult<Vec<u8>> {
    let count = doc.objects.len() as u32;
    for (index, object) in doc.objects.iter().enumerate() {
        check_references(object, count).map_err(|e| match e {
            PdfError::Serialization(msg) => {
                PdfError::Serialization(format!("object {}: {}", index + 1, msg))
            }
            other => other,
        })?;
    }

    let mut buf = HEADER.to_vec();
    let mut offsets = Vec::with_capacity(doc.objects.len());
    for (index, object) in doc.objects.iter().enumerate() {
        offsets.push(buf.len() as u64);
        buf.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        write_object(&mut buf, object);
        buf.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", doc.objects.len() + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Root 1 0 R /Size {} >>\nstartxref\n{}\n%%EOF\n",
            doc.objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    Ok(buf)
}

fn check_references(object: &Object, count: u32) -> PdfResult<()> {
    match object {
        Object::Reference(id) => {
            if id.num == 0 || id.num > count {
                return Err(PdfError::Serialization(format!(
                    "dangling reference to object {}",
                    id.num
                )));
            }
            Ok(())
        }
        Object::Array(items) => {
            for item in items {
                check_references(item, count)?;
            }
            Ok(())
        }
        Object::Dictionary(dict) | Object::Stream { dict, .. } => {
            for value in dict.values() {
                check_references(value, count)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn write_object(buf: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => buf.extend_from_slice(b"null"),
        Object::Boolean(true) => buf.extend_from_slice(b"true"),
        Object::Boolean(false) => buf.extend_from_slice(b"false"),
        Object::Number(n) => buf.extend_from_slice(format_number(*n).as_bytes()),
        Object::String(bytes) => write_literal_string(buf, bytes),
        Object::HexString(bytes) => {
            buf.push(b'<');
            for b in bytes {
                buf.extend_from_slice(format!("{:02X}", b).as_bytes());
            }
            buf.push(b'>');
        }
        Object::Name(name) => write_name(buf, name),
        Object::Reference(id) => {
            buf.extend_from_slice(format!("{} {} R", id.num, id.gen).as_bytes());
        }
        Object::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_object(buf, item);
            }
            buf.push(b']');
        }
        Object::Dictionary(dict) => write_dict(buf, dict, None),
        Object::Stream { dict, data } => {
            // /Length is rewritten from the actual payload, so stale values
            // in the source dictionary cannot corrupt the output.
            write_dict(buf, dict, Some(data.len()));
            buf.extend_from_slice(b"\nstream\n");
            buf.extend_from_slice(data);
            buf.extend_from_slice(b"\nendstream");
        }
    }
}

fn write_dict(buf: &mut Vec<u8>, dict: &Dict, stream_len: Option<usize>) {
    let mut keys: Vec<&str> = dict.keys().map(String::as_str).collect();
    if stream_len.is_some() && !dict.contains_key("Length") {
        keys.push("Length");
    }
    keys.sort_unstable();

    buf.extend_from_slice(b"<<");
    for key in keys {
        buf.push(b' ');
        write_name(buf, key);
        buf.push(b' ');
        match (key, stream_len) {
            ("Length", Some(len)) => buf.extend_from_slice(len.to_string().as_bytes()),
            _ => {
                if let Some(value) = dict.get(key) {
                    write_object(buf, value)
                }
            }
        }
    }
    buf.extend_from_slice(b" >>");
}

fn write_name(buf: &mut Vec<u8>, name: &str) {
    buf.push(b'/');
    for &b in name.as_bytes() {
        let is_regular = (0x21..=0x7E).contains(&b)
            && !matches!(b, b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%');
        if is_regular {
            buf.push(b);
        } else {
            buf.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}

fn write_literal_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                buf.push(b'\\');
                buf.push(b);
            }
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            other => buf.push(other),
        }
    }
    buf.push(b')');
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let text = format!("{}", n);
    if text.contains('e') || text.contains('E') {
        // PDF syntax has no exponent notation.
        format!("{:.10}", n)
    } else {
        text
    }
}
