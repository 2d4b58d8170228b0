//! Byte-level tokenizer for the PDF syntax.
//!
//! The lexer is seekable: cross-reference offsets reposition it arbitrarily
//! within the buffer. It produces the token set of ISO 32000-1 section 7.2,
//! leaving composition (arrays, dictionaries, streams, references) to the
//! parser.

use super::error::{PdfError, PdfResult};

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer or real number.
    Number(f64),

    /// Literal string `(...)` with escapes undone.
    String(Vec<u8>),

    /// Hex string `<...>`, odd-length input padded with a trailing 0 digit.
    HexString(Vec<u8>),

    /// Name `/...` with `#xx` escapes undone.
    Name(String),

    Boolean(bool),
    Null,

    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,

    /// Bare keyword: `obj`, `endobj`, `stream`, `R`, `xref`, `trailer`, ...
    Command(String),

    /// End of input.
    Eof,
}

/// White-space per ISO 32000-1 table 1.
#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Delimiters per ISO 32000-1 table 2.
#[inline]
fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline]
fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Tokenizer over a borrowed byte buffer.
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Lexer { data, pos: 0 }
    }

    pub fn new_at(data: &'a [u8], pos: usize) -> Self {
        Lexer { data, pos }
    }

    /// Current byte position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Reposition the lexer. Out-of-bounds positions read as end of input.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Read one raw byte without token interpretation. Used for stream
    /// payloads, where white-space is data.
    #[inline]
    pub fn read_raw_byte(&mut self) -> Option<u8> {
        self.bump()
    }

    /// Consume a single end-of-line sequence (CRLF, LF, or CR) if present.
    /// The PDF format requires one after the `stream` keyword.
    pub fn skip_eol(&mut self) {
        match self.peek() {
            Some(0x0D) => {
                self.pos += 1;
                if self.peek() == Some(0x0A) {
                    self.pos += 1;
                }
            }
            Some(0x0A) => self.pos += 1,
            _ => {}
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                // Comments (including %PDF-x.y and %%EOF) run to end of line.
                while let Some(b) = self.peek() {
                    if b == 0x0A || b == 0x0D {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> PdfResult<Token> {
        self.skip_whitespace_and_comments();

        let b = match self.peek() {
            Some(b) => b,
            None => return Ok(Token::Eof),
        };

        match b {
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.read_number(),
            b'(' => {
                self.pos += 1;
                self.read_literal_string()
            }
            b'<' => {
                self.pos += 1;
                if self.peek() == Some(b'<') {
                    self.pos += 1;
                    Ok(Token::DictStart)
                } else {
                    self.read_hex_string()
                }
            }
            b'>' => {
                self.pos += 1;
                if self.peek() == Some(b'>') {
                    self.pos += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(PdfError::MalformedDocument(
                        "stray '>' outside hex string or dictionary".to_string(),
                    ))
                }
            }
            b'/' => {
                self.pos += 1;
                self.read_name()
            }
            b'[' => {
                self.pos += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.pos += 1;
                Ok(Token::ArrayEnd)
            }
            b')' => Err(PdfError::MalformedDocument(
                "unbalanced ')' outside string".to_string(),
            )),
            b'{' | b'}' => {
                // Only legal inside PostScript function streams; surface as a
                // keyword so the parser can reject it in context.
                self.pos += 1;
                Ok(Token::Command((b as char).to_string()))
            }
            _ => self.read_keyword(),
        }
    }

    fn read_number(&mut self) -> PdfResult<Token> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.data[start..self.pos]).unwrap_or("");
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| PdfError::MalformedDocument(format!("invalid number {:?}", text)))
    }

    /// Literal string body after the opening '('. Parentheses nest; the
    /// escape rules follow ISO 32000-1 section 7.3.4.2.
    fn read_literal_string(&mut self) -> PdfResult<Token> {
        let mut out = Vec::new();
        let mut depth = 1usize;

        loop {
            let b = self.bump().ok_or_else(|| {
                PdfError::MalformedDocument("unterminated literal string".to_string())
            })?;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    let esc = self.bump().ok_or_else(|| {
                        PdfError::MalformedDocument("unterminated string escape".to_string())
                    })?;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' | b')' | b'\\' => out.push(esc),
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u16;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u16;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        // Backslash before a line break continues the string.
                        0x0D => {
                            if self.peek() == Some(0x0A) {
                                self.pos += 1;
                            }
                        }
                        0x0A => {}
                        // Unknown escape: the backslash is dropped.
                        other => out.push(other),
                    }
                }
                // An unescaped EOL in a string reads as a single LF.
                0x0D => {
                    if self.peek() == Some(0x0A) {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(b),
            }
        }

        Ok(Token::String(out))
    }

    /// Hex string body after the opening '<'.
    fn read_hex_string(&mut self) -> PdfResult<Token> {
        let mut digits = Vec::new();
        loop {
            let b = self.bump().ok_or_else(|| {
                PdfError::MalformedDocument("unterminated hex string".to_string())
            })?;
            match b {
                b'>' => break,
                b if is_whitespace(b) => {}
                b'0'..=b'9' => digits.push(b - b'0'),
                b'a'..=b'f' => digits.push(b - b'a' + 10),
                b'A'..=b'F' => digits.push(b - b'A' + 10),
                other => {
                    return Err(PdfError::MalformedDocument(format!(
                        "invalid hex digit 0x{:02X}",
                        other
                    )));
                }
            }
        }
        if digits.len() % 2 != 0 {
            digits.push(0);
        }
        let bytes = digits
            .chunks_exact(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect();
        Ok(Token::HexString(bytes))
    }

    /// Name body after the leading '/'.
    fn read_name(&mut self) -> PdfResult<Token> {
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hi = self.bump();
                let lo = self.bump();
                match (hi.and_then(hex_value), lo.and_then(hex_value)) {
                    (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                    _ => {
                        return Err(PdfError::MalformedDocument(
                            "invalid #xx escape in name".to_string(),
                        ));
                    }
                }
            } else {
                out.push(b);
            }
        }
        Ok(Token::Name(String::from_utf8_lossy(&out).into_owned()))
    }

    fn read_keyword(&mut self) -> PdfResult<Token> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
        }
        let word = &self.data[start..self.pos];
        if word.is_empty() {
            // A byte that is neither regular, white-space, nor a handled
            // delimiter; skip it rather than loop forever.
            self.pos += 1;
            return self.next_token();
        }
        match word {
            b"true" => Ok(Token::Boolean(true)),
            b"false" => Ok(Token::Boolean(false)),
            b"null" => Ok(Token::Null),
            _ => Ok(Token::Command(
                String::from_utf8_lossy(word).into_owned(),
            )),
        }
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok == Token::Eof {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b"42 -17 +3 3.14 .5 4. 0000000017"),
            vec![
                Token::Number(42.0),
                Token::Number(-17.0),
                Token::Number(3.0),
                Token::Number(3.14),
                Token::Number(0.5),
                Token::Number(4.0),
                Token::Number(17.0),
            ]
        );
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(
            tokens(br"(a\(b\)c\\d\n)"),
            vec![Token::String(b"a(b)c\\d\n".to_vec())]
        );
    }

    #[test]
    fn test_literal_string_nested_parens() {
        assert_eq!(
            tokens(b"(a(b(c))d)"),
            vec![Token::String(b"a(b(c))d".to_vec())]
        );
    }

    #[test]
    fn test_literal_string_octal() {
        assert_eq!(tokens(br"(\101\12)"), vec![Token::String(b"A\n".to_vec())]);
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(
            tokens(b"<48656C6C6F>"),
            vec![Token::HexString(b"Hello".to_vec())]
        );
    }

    #[test]
    fn test_hex_string_invalid_digit_is_error() {
        let mut lexer = Lexer::new(b"<48xx>");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_hex_string_whitespace_and_padding() {
        assert_eq!(
            tokens(b"<48 65 6C 6C 6F 7>"),
            vec![Token::HexString(b"Hello\x70".to_vec())]
        );
    }

    #[test]
    fn test_name_with_hash_escape() {
        assert_eq!(
            tokens(b"/Name#20With#20Spaces /Type"),
            vec![
                Token::Name("Name With Spaces".to_string()),
                Token::Name("Type".to_string()),
            ]
        );
    }

    #[test]
    fn test_structural_tokens() {
        assert_eq!(
            tokens(b"[ << >> ] true false null"),
            vec![
                Token::ArrayStart,
                Token::DictStart,
                Token::DictEnd,
                Token::ArrayEnd,
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens(b"%PDF-1.7\n42 % trailing comment\n7"),
            vec![Token::Number(42.0), Token::Number(7.0)]
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            tokens(b"5 0 obj endobj stream R"),
            vec![
                Token::Number(5.0),
                Token::Number(0.0),
                Token::Command("obj".to_string()),
                Token::Command("endobj".to_string()),
                Token::Command("stream".to_string()),
                Token::Command("R".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut lexer = Lexer::new(b"(never closed");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_seek_and_pos() {
        let mut lexer = Lexer::new(b"1 2 3");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(1.0));
        let pos = lexer.pos();
        assert_eq!(lexer.next_token().unwrap(), Token::Number(2.0));
        lexer.seek(pos);
        assert_eq!(lexer.next_token().unwrap(), Token::Number(2.0));
    }
}
