//! Composes lexer tokens into PDF objects.
//!
//! The parser keeps a 2-token lookahead buffer so it can recognize the
//! patterns that need it: indirect references (`N G R`) and stream objects
//! (a dictionary immediately followed by the `stream` keyword).

use super::error::{PdfError, PdfResult};
use super::lexer::{Lexer, Token};
use super::object::{Array, Dict, Object, ObjectId};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    buf1: Token,
    buf2: Token,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> PdfResult<Self> {
        let buf1 = lexer.next_token()?;
        let buf2 = lexer.next_token()?;
        Ok(Parser { lexer, buf1, buf2 })
    }

    /// Parser positioned at an arbitrary byte offset of `data`.
    pub fn new_at(data: &'a [u8], pos: usize) -> PdfResult<Self> {
        Self::new(Lexer::new_at(data, pos))
    }

    /// Advance the lookahead window by one token.
    fn shift(&mut self) -> PdfResult<Token> {
        let out = std::mem::replace(&mut self.buf1, std::mem::replace(&mut self.buf2, Token::Eof));
        self.buf2 = self.lexer.next_token()?;
        Ok(out)
    }

    /// Peek the next token without consuming it.
    pub fn peek(&self) -> &Token {
        &self.buf1
    }

    /// Parse the next complete object.
    pub fn parse_object(&mut self) -> PdfResult<Object> {
        let token = self.shift()?;
        match token {
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dictionary(),
            Token::ArrayEnd => Err(PdfError::MalformedDocument(
                "unexpected ']'".to_string(),
            )),
            Token::DictEnd => Err(PdfError::MalformedDocument(
                "unexpected '>>'".to_string(),
            )),

            Token::Number(n) => {
                // `N G R` is an indirect reference; anything else is a number.
                if let (Token::Number(gen), Token::Command(cmd)) = (&self.buf1, &self.buf2) {
                    if cmd == "R" && n >= 0.0 && n.fract() == 0.0 && gen.fract() == 0.0 {
                        let id = ObjectId::new(n as u32, *gen as u16);
                        self.shift()?;
                        self.shift()?;
                        return Ok(Object::Reference(id));
                    }
                }
                Ok(Object::Number(n))
            }

            Token::Boolean(b) => Ok(Object::Boolean(b)),
            Token::Null => Ok(Object::Null),
            Token::String(s) => Ok(Object::String(s)),
            Token::HexString(s) => Ok(Object::HexString(s)),
            Token::Name(n) => Ok(Object::Name(n)),
            Token::Eof => Err(PdfError::MalformedDocument(
                "unexpected end of input".to_string(),
            )),
            Token::Command(cmd) => Err(PdfError::MalformedDocument(format!(
                "unexpected keyword {:?}",
                cmd
            ))),
        }
    }

    fn parse_array(&mut self) -> PdfResult<Object> {
        let mut array = Array::new();
        loop {
            match &self.buf1 {
                Token::ArrayEnd => {
                    self.shift()?;
                    break;
                }
                Token::Eof => {
                    return Err(PdfError::MalformedDocument(
                        "unterminated array (missing ']')".to_string(),
                    ));
                }
                _ => array.push(Box::new(self.parse_object()?)),
            }
        }
        Ok(Object::Array(array))
    }

    fn parse_dictionary(&mut self) -> PdfResult<Object> {
        let mut dict = Dict::default();
        loop {
            match &self.buf1 {
                Token::DictEnd => break,
                Token::Eof => {
                    return Err(PdfError::MalformedDocument(
                        "unterminated dictionary (missing '>>')".to_string(),
                    ));
                }
                Token::Name(_) => {
                    let key = match self.shift()? {
                        Token::Name(name) => name,
                        _ => unreachable!(),
                    };
                    if matches!(self.buf1, Token::DictEnd) {
                        // Key without a value right before '>>'.
                        dict.insert(key, Object::Null);
                        break;
                    }
                    let value = self.parse_object()?;
                    dict.insert(key, value);
                }
                other => {
                    return Err(PdfError::MalformedDocument(format!(
                        "dictionary key must be a name, found {:?}",
                        other
                    )));
                }
            }
        }

        // buf1 is '>>'. If buf2 is the `stream` keyword this dictionary heads
        // a stream object; the lexer already sits right after that keyword,
        // so the payload must be read with raw byte access, not tokens.
        if let Token::Command(cmd) = &self.buf2 {
            if cmd == "stream" {
                self.buf1 = Token::Eof;
                self.buf2 = Token::Eof;
                return self.parse_stream(dict);
            }
        }

        self.shift()?;
        Ok(Object::Dictionary(dict))
    }

    /// Read a stream payload. Called with the lexer positioned just past the
    /// `stream` keyword.
    fn parse_stream(&mut self, dict: Dict) -> PdfResult<Object> {
        self.lexer.skip_eol();
        let start = self.lexer.pos();
        let data = self.lexer.data();

        // /Length may be an indirect reference; resolving it here would
        // require the xref that is itself being built, so fall back to
        // scanning for `endstream` in that case.
        let length = dict.get("Length").and_then(Object::as_index);

        let payload = match length {
            Some(len) if start + len as usize <= data.len() => {
                let end = start + len as usize;
                // Trust the declared length only if `endstream` actually
                // follows; a wrong /Length falls back to scanning.
                let mut probe = Lexer::new_at(data, end);
                match probe.next_token() {
                    Ok(Token::Command(cmd)) if cmd == "endstream" => {
                        self.lexer.seek(probe.pos());
                        data[start..end].to_vec()
                    }
                    _ => self.scan_for_endstream(start)?,
                }
            }
            _ => {
                if length.is_none() {
                    log::warn!("stream without usable /Length; scanning for endstream");
                }
                self.scan_for_endstream(start)?
            }
        };

        // Refill the lookahead window (next tokens: `endobj`, ...).
        self.buf1 = self.lexer.next_token()?;
        self.buf2 = self.lexer.next_token()?;

        Ok(Object::Stream {
            dict,
            data: payload,
        })
    }

    /// Locate the `endstream` keyword and return the payload before it,
    /// with the end-of-line that precedes the keyword trimmed.
    fn scan_for_endstream(&mut self, start: usize) -> PdfResult<Vec<u8>> {
        let data = self.lexer.data();
        let marker = b"endstream";
        let hay = &data[start..];
        let found = hay
            .windows(marker.len())
            .position(|w| w == marker)
            .ok_or_else(|| {
                PdfError::MalformedDocument("stream without endstream keyword".to_string())
            })?;

        let end = start + found;
        self.lexer.seek(end + marker.len());

        let mut payload = data[start..end].to_vec();
        // Trim the single EOL separating payload from `endstream`.
        if payload.last() == Some(&0x0A) {
            payload.pop();
        }
        if payload.last() == Some(&0x0D) {
            payload.pop();
        }
        Ok(payload)
    }

    /// Parse an indirect object: `N G obj <value> endobj`.
    pub fn parse_indirect_object(&mut self) -> PdfResult<(ObjectId, Object)> {
        let num = match self.shift()? {
            Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as u32,
            other => {
                return Err(PdfError::MalformedDocument(format!(
                    "expected object number, found {:?}",
                    other
                )));
            }
        };
        let gen = match self.shift()? {
            Token::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as u16,
            other => {
                return Err(PdfError::MalformedDocument(format!(
                    "expected generation number, found {:?}",
                    other
                )));
            }
        };
        match self.shift()? {
            Token::Command(cmd) if cmd == "obj" => {}
            other => {
                return Err(PdfError::MalformedDocument(format!(
                    "expected 'obj' keyword, found {:?}",
                    other
                )));
            }
        }

        let object = self.parse_object()?;

        // `endobj` is consumed when present; files that omit it still parse.
        if matches!(&self.buf1, Token::Command(cmd) if cmd == "endobj") {
            self.shift()?;
        }

        Ok((ObjectId::new(num, gen), object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn parse(input: &[u8]) -> PdfResult<Object> {
        Parser::new(Lexer::new(input))?.parse_object()
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse(b"42").unwrap(), Object::Number(42.0));
        assert_eq!(parse(b"true").unwrap(), Object::Boolean(true));
        assert_eq!(parse(b"null").unwrap(), Object::Null);
        assert_eq!(parse(b"(hi)").unwrap(), Object::String(b"hi".to_vec()));
        assert_eq!(parse(b"/Type").unwrap(), Object::Name("Type".to_string()));
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse(b"5 0 R").unwrap(),
            Object::Reference(ObjectId::new(5, 0))
        );
        assert_eq!(
            parse(b"10 2 R").unwrap(),
            Object::Reference(ObjectId::new(10, 2))
        );
    }

    #[test]
    fn test_two_numbers_are_not_a_reference() {
        // Lookahead must not fold "5 0" into anything when no R follows.
        assert_eq!(parse(b"5 0 obj").unwrap(), Object::Number(5.0));
    }

    #[test]
    fn test_parse_array() {
        assert_eq!(
            parse(b"[1 /Two (three)]").unwrap(),
            Object::Array(smallvec![
                Box::new(Object::Number(1.0)),
                Box::new(Object::Name("Two".to_string())),
                Box::new(Object::String(b"three".to_vec())),
            ])
        );
    }

    #[test]
    fn test_parse_nested_dictionary() {
        let obj = parse(b"<< /Outer << /Inner 42 >> /Next 7 0 R >>").unwrap();
        let dict = obj.as_dict().unwrap();
        let inner = dict.get("Outer").unwrap().as_dict().unwrap();
        assert_eq!(inner.get("Inner"), Some(&Object::Number(42.0)));
        assert_eq!(
            dict.get("Next"),
            Some(&Object::Reference(ObjectId::new(7, 0)))
        );
    }

    #[test]
    fn test_parse_array_with_references() {
        assert_eq!(
            parse(b"[5 0 R 6 0 R]").unwrap(),
            Object::Array(smallvec![
                Box::new(Object::Reference(ObjectId::new(5, 0))),
                Box::new(Object::Reference(ObjectId::new(6, 0))),
            ])
        );
    }

    #[test]
    fn test_parse_stream_with_length() {
        let input = b"<< /Length 5 >>\nstream\nhello\nendstream";
        match parse(input).unwrap() {
            Object::Stream { dict, data } => {
                assert_eq!(dict.get("Length"), Some(&Object::Number(5.0)));
                assert_eq!(data, b"hello");
            }
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_scan_fallback() {
        // Indirect /Length cannot be resolved during the initial parse.
        let input = b"<< /Length 9 9 R >>\nstream\nbinary\x00data\nendstream";
        match parse(input).unwrap() {
            Object::Stream { data, .. } => assert_eq!(data, b"binary\x00data"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_with_wrong_length_falls_back() {
        let input = b"<< /Length 3 >>\nstream\nhello\nendstream";
        match parse(input).unwrap() {
            Object::Stream { data, .. } => assert_eq!(data, b"hello"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_indirect_object() {
        let mut parser = Parser::new(Lexer::new(b"7 0 obj << /Type /Page >> endobj")).unwrap();
        let (id, obj) = parser.parse_indirect_object().unwrap();
        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(
            obj.as_dict().unwrap().get("Type"),
            Some(&Object::Name("Page".to_string()))
        );
    }

    #[test]
    fn test_parse_indirect_stream_consumes_endobj() {
        let input = b"4 0 obj << /Length 2 >>\nstream\nok\nendstream\nendobj 9";
        let mut parser = Parser::new(Lexer::new(input)).unwrap();
        let (id, obj) = parser.parse_indirect_object().unwrap();
        assert_eq!(id, ObjectId::new(4, 0));
        assert!(matches!(obj, Object::Stream { .. }));
        assert_eq!(parser.peek(), &Token::Number(9.0));
    }

    #[test]
    fn test_unterminated_structures_error() {
        assert!(parse(b"[1 2 3").is_err());
        assert!(parse(b"<< /Type /Font").is_err());
    }
}
