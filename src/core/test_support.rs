//! Shared fixture builders for unit tests.

/// Assemble a classic-xref PDF from numbered object bodies, one xref
/// subsection per object so numbering need not be contiguous.
pub(crate) fn build_pdf(objects: &[(u32, &str)]) -> Vec<u8> {
    let mut buf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (num, body) in objects {
        offsets.push((*num, buf.len()));
        buf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", num, body).as_bytes());
    }
    let xref_offset = buf.len();
    buf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
    for (num, offset) in &offsets {
        buf.extend_from_slice(format!("{} 1\n{:010} 00000 n \n", num, offset).as_bytes());
    }
    let size = objects.iter().map(|(n, _)| n + 1).max().unwrap_or(1);
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, xref_offset
        )
        .as_bytes(),
    );
    buf
}

/// A document with `n` pages whose content streams hold distinguishable
/// markers, all sharing one font resource object.
pub(crate) fn multi_page_pdf(marker: &str, n: usize) -> Vec<u8> {
    let mut bodies: Vec<(u32, String)> = Vec::new();
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    bodies.push((1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()));
    bodies.push((
        2,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] >>",
            kids.join(" "),
            n
        ),
    ));
    let font_num = (3 + 2 * n) as u32;
    for i in 0..n {
        let page_num = (3 + 2 * i) as u32;
        let content_num = page_num + 1;
        bodies.push((
            page_num,
            format!(
                "<< /Type /Page /Parent 2 0 R /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >>",
                content_num, font_num
            ),
        ));
        let text = format!("BT /F1 12 Tf (page {}{}) Tj ET", marker, i);
        bodies.push((
            content_num,
            format!("<< /Length {} >>\nstream\n{}\nendstream", text.len(), text),
        ));
    }
    bodies.push((
        font_num,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ));

    let refs: Vec<(u32, &str)> = bodies.iter().map(|(n, b)| (*n, b.as_str())).collect();
    build_pdf(&refs)
}
