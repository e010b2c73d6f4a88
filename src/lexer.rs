//! PDF lexer (tokenizer).
//!
//! Pull-based tokenization of PDF syntax directly from a [`Buffer`], one
//! byte of lookahead, no backtracking. Operating on the buffer instead of an
//! in-memory slice is what keeps object access lazy: the lexer only consumes
//! the bytes of the tokens it is asked for, so a stream payload is never
//! touched by tokenization.
//!
//! # PDF syntax overview
//!
//! - Numbers: integers (42, -123) and reals (3.14, -2.5, .5, 1e3)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type), with #xx escapes
//! - Keywords: true, false, null, obj, endobj, stream, endstream, R, ...
//! - Delimiters: `[`, `]`, `<<`, `>>`
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are
//! skipped. A keyword only wins over a bareword when it stands alone,
//! terminated by whitespace or a delimiter.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::name::{hex_value, Name};
use std::io::{Read, Seek};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// Integer number (e.g., 42, -123)
    Integer(i64),
    /// Real number (e.g., 3.14, -2.5, .5); any numeric token with `.` or an exponent
    Real(f64),
    /// Literal string content with escape sequences already decoded
    LiteralString(Vec<u8>),
    /// Hex string content, decoded (odd length implies a trailing zero nibble)
    HexString(Vec<u8>),
    /// Name with `#xx` escapes decoded
    Name(Name),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `obj`
    Obj,
    /// `endobj`
    EndObj,
    /// `stream`
    Stream,
    /// `endstream`
    EndStream,
    /// `R` (reference marker)
    R,
    /// Any other bareword (`trailer`, `xref`, `startxref`, ...)
    Keyword(Vec<u8>),
    /// End of input
    Eof,
}

/// Whitespace per ISO 32000-1, 7.2.2.
pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// Delimiters per ISO 32000-1, 7.2.2.
pub(crate) fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

/// Streaming tokenizer over a [`Buffer`].
pub struct Lexer<'a, R> {
    buf: &'a mut Buffer<R>,
    peeked: Option<u8>,
}

impl<'a, R: Read + Seek> Lexer<'a, R> {
    /// Create a lexer reading from the buffer's current position.
    pub fn new(buf: &'a mut Buffer<R>) -> Self {
        Lexer { buf, peeked: None }
    }

    /// The byte offset of the next unconsumed byte.
    pub fn position(&self) -> u64 {
        self.buf.position() - self.peeked.is_some() as u64
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        match self.peeked.take() {
            Some(byte) => Ok(Some(byte)),
            None => self.buf.read_byte(),
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.buf.read_byte()?;
        }
        Ok(self.peeked)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            match self.peek_byte()? {
                Some(byte) if is_whitespace(byte) => {
                    self.next_byte()?;
                }
                Some(b'%') => {
                    // Comment runs to end of line
                    loop {
                        match self.next_byte()? {
                            None | Some(b'\r') | Some(b'\n') => break,
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments()?;
        let start = self.position();

        let byte = match self.peek_byte()? {
            None => return Ok(Token::Eof),
            Some(byte) => byte,
        };

        match byte {
            b'[' => {
                self.next_byte()?;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.next_byte()?;
                Ok(Token::ArrayEnd)
            }
            b'<' => {
                self.next_byte()?;
                if self.peek_byte()? == Some(b'<') {
                    self.next_byte()?;
                    Ok(Token::DictStart)
                } else {
                    self.read_hex_string(start)
                }
            }
            b'>' => {
                self.next_byte()?;
                if self.next_byte()? == Some(b'>') {
                    Ok(Token::DictEnd)
                } else {
                    Err(Error::parse(start, "'>>'"))
                }
            }
            b'(' => self.read_literal_string(),
            b'/' => {
                self.next_byte()?;
                let raw = self.read_regular_bytes()?;
                Ok(Token::Name(Name::from_escaped(&raw)))
            }
            b')' | b'{' | b'}' => Err(Error::parse(start, "token")),
            _ => {
                let word = self.read_regular_bytes()?;
                if word.is_empty() {
                    return Err(Error::parse(start, "token"));
                }
                if matches!(word[0], b'0'..=b'9' | b'+' | b'-' | b'.') {
                    return self.classify_number(start, &word);
                }
                Ok(match word.as_slice() {
                    b"true" => Token::True,
                    b"false" => Token::False,
                    b"null" => Token::Null,
                    b"obj" => Token::Obj,
                    b"endobj" => Token::EndObj,
                    b"stream" => Token::Stream,
                    b"endstream" => Token::EndStream,
                    b"R" => Token::R,
                    _ => Token::Keyword(word),
                })
            }
        }
    }

    /// Consume the EOL after a `stream` keyword and return the payload offset.
    ///
    /// Must be called immediately after [`Token::Stream`] was returned. The
    /// required form is CRLF or LF; a lone CR (or nothing) is tolerated with
    /// a warning, the way existing tolerant readers treat it.
    pub fn begin_stream_payload(&mut self) -> Result<u64> {
        match self.peek_byte()? {
            Some(b'\n') => {
                self.next_byte()?;
            }
            Some(b'\r') => {
                self.next_byte()?;
                if self.peek_byte()? == Some(b'\n') {
                    self.next_byte()?;
                } else {
                    log::warn!("stream keyword followed by lone CR");
                }
            }
            _ => log::warn!("no EOL after stream keyword"),
        }
        Ok(self.position())
    }

    /// Bytes of a bareword, name body, or number: everything up to the next
    /// whitespace or delimiter.
    fn read_regular_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(byte) = self.peek_byte()? {
            if !is_regular(byte) {
                break;
            }
            out.push(byte);
            self.next_byte()?;
        }
        Ok(out)
    }

    fn classify_number(&self, start: u64, word: &[u8]) -> Result<Token> {
        let text = std::str::from_utf8(word).map_err(|_| Error::parse(start, "number"))?;
        if word.iter().any(|&b| matches!(b, b'.' | b'e' | b'E')) {
            let value: f64 = text.parse().map_err(|_| Error::parse(start, "number"))?;
            Ok(Token::Real(value))
        } else {
            let value: i64 = text.parse().map_err(|_| Error::parse(start, "number"))?;
            Ok(Token::Integer(value))
        }
    }

    /// Literal string: balanced parens with escapes decoded inline
    /// (ISO 32000-1, 7.3.4.2).
    fn read_literal_string(&mut self) -> Result<Token> {
        self.next_byte()?; // consume '('
        let mut out = Vec::new();
        let mut depth = 1usize;
        loop {
            let byte = self.next_byte()?.ok_or(Error::UnexpectedEof)?;
            match byte {
                b'(' => {
                    depth += 1;
                    out.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Token::LiteralString(out));
                    }
                    out.push(byte);
                }
                b'\\' => {
                    let escaped = self.next_byte()?.ok_or(Error::UnexpectedEof)?;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' => out.push(b'('),
                        b')' => out.push(b')'),
                        b'\\' => out.push(b'\\'),
                        // Line continuation: backslash-EOL is dropped
                        b'\n' => {}
                        b'\r' => {
                            if self.peek_byte()? == Some(b'\n') {
                                self.next_byte()?;
                            }
                        }
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek_byte()? {
                                    Some(digit @ b'0'..=b'7') => {
                                        value = value * 8 + (digit - b'0') as u32;
                                        self.next_byte()?;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        // Unknown escape: the backslash is dropped, the
                        // character stands
                        other => out.push(other),
                    }
                }
                _ => out.push(byte),
            }
        }
    }

    /// Hex string: whitespace ignored, odd length implies a trailing zero
    /// nibble (ISO 32000-1, 7.3.4.3). The opening `<` is already consumed.
    fn read_hex_string(&mut self, start: u64) -> Result<Token> {
        let mut out = Vec::new();
        let mut high: Option<u8> = None;
        loop {
            let byte = self.next_byte()?.ok_or(Error::UnexpectedEof)?;
            match byte {
                b'>' => {
                    if let Some(high) = high {
                        out.push(high << 4);
                    }
                    return Ok(Token::HexString(out));
                }
                byte if is_whitespace(byte) => {}
                byte => {
                    let nibble =
                        hex_value(byte).ok_or_else(|| Error::parse(start, "hex digit"))?;
                    match high.take() {
                        Some(high) => out.push((high << 4) | nibble),
                        None => high = Some(nibble),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut buf = Buffer::new(Cursor::new(input.to_vec())).unwrap();
        let mut lexer = Lexer::new(&mut buf);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok == Token::Eof {
                return out;
            }
            out.push(tok);
        }
    }

    fn single(input: &[u8]) -> Token {
        let mut toks = tokens(input);
        assert_eq!(toks.len(), 1, "expected one token from {:?}", input);
        toks.remove(0)
    }

    #[test]
    fn test_integers() {
        assert_eq!(single(b"42"), Token::Integer(42));
        assert_eq!(single(b"-123"), Token::Integer(-123));
        assert_eq!(single(b"+17"), Token::Integer(17));
        assert_eq!(single(b"0"), Token::Integer(0));
    }

    #[test]
    fn test_reals() {
        assert_eq!(single(b"3.14"), Token::Real(3.14));
        assert_eq!(single(b"-2.5"), Token::Real(-2.5));
        assert_eq!(single(b".5"), Token::Real(0.5));
        assert_eq!(single(b"5."), Token::Real(5.0));
        assert_eq!(single(b"-.002"), Token::Real(-0.002));
    }

    #[test]
    fn test_exponent_is_real() {
        assert_eq!(single(b"1e3"), Token::Real(1000.0));
        assert_eq!(single(b"2E2"), Token::Real(200.0));
    }

    #[test]
    fn test_literal_string() {
        assert_eq!(single(b"(Hello)"), Token::LiteralString(b"Hello".to_vec()));
        assert_eq!(single(b"()"), Token::LiteralString(Vec::new()));
        assert_eq!(
            single(b"(Hello (nested) World)"),
            Token::LiteralString(b"Hello (nested) World".to_vec())
        );
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(single(b"(Line1\\nLine2)"), Token::LiteralString(b"Line1\nLine2".to_vec()));
        assert_eq!(single(b"(Open \\( Close \\))"), Token::LiteralString(b"Open ( Close )".to_vec()));
        assert_eq!(single(b"(Section \\247)"), Token::LiteralString(b"Section \xa7".to_vec()));
        // \128 = \12 (octal, stops at '8') followed by literal '8'
        assert_eq!(single(b"(Value \\128)"), Token::LiteralString(b"Value \n8".to_vec()));
        // line continuation
        assert_eq!(single(b"(long \\\nstring)"), Token::LiteralString(b"long string".to_vec()));
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(single(b"<48656C6C6F>"), Token::HexString(b"Hello".to_vec()));
        assert_eq!(single(b"<48 65 6C 6C 6F>"), Token::HexString(b"Hello".to_vec()));
        assert_eq!(single(b"<>"), Token::HexString(Vec::new()));
    }

    #[test]
    fn test_hex_string_odd_length_pads_zero() {
        assert_eq!(single(b"<ABC>"), Token::HexString(vec![0xAB, 0xC0]));
    }

    #[test]
    fn test_names() {
        assert_eq!(single(b"/Type"), Token::Name(Name::from("Type")));
        assert_eq!(single(b"/A#20B"), Token::Name(Name::from("A B")));
        assert_eq!(
            single(b"/A;Name_With-Various***Characters"),
            Token::Name(Name::from("A;Name_With-Various***Characters"))
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(single(b"true"), Token::True);
        assert_eq!(single(b"false"), Token::False);
        assert_eq!(single(b"null"), Token::Null);
        assert_eq!(single(b"obj"), Token::Obj);
        assert_eq!(single(b"endobj"), Token::EndObj);
        assert_eq!(single(b"stream"), Token::Stream);
        assert_eq!(single(b"endstream"), Token::EndStream);
        assert_eq!(single(b"R"), Token::R);
        assert_eq!(single(b"trailer"), Token::Keyword(b"trailer".to_vec()));
        assert_eq!(single(b"startxref"), Token::Keyword(b"startxref".to_vec()));
    }

    #[test]
    fn test_keyword_must_stand_alone() {
        // "trueX" is a bareword, not the boolean followed by junk
        assert_eq!(single(b"trueX"), Token::Keyword(b"trueX".to_vec()));
        assert_eq!(single(b"nullable"), Token::Keyword(b"nullable".to_vec()));
        // but a delimiter terminates a keyword
        assert_eq!(tokens(b"true]"), vec![Token::True, Token::ArrayEnd]);
        assert_eq!(tokens(b"null/Next"), vec![Token::Null, Token::Name(Name::from("Next"))]);
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(tokens(b"[]<<>>"), vec![
            Token::ArrayStart,
            Token::ArrayEnd,
            Token::DictStart,
            Token::DictEnd,
        ]);
    }

    #[test]
    fn test_dict_vs_hex_string() {
        assert_eq!(tokens(b"<<>>"), vec![Token::DictStart, Token::DictEnd]);
        assert_eq!(single(b"<ABCD>"), Token::HexString(vec![0xAB, 0xCD]));
    }

    #[test]
    fn test_comments_are_whitespace() {
        assert_eq!(tokens(b"% a comment\n42 % another\n43"), vec![
            Token::Integer(42),
            Token::Integer(43),
        ]);
    }

    #[test]
    fn test_comment_delimiter_inside_string_is_literal() {
        assert_eq!(single(b"(100% done)"), Token::LiteralString(b"100% done".to_vec()));
    }

    #[test]
    fn test_complex_snippet() {
        let toks = tokens(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj");
        assert_eq!(toks, vec![
            Token::Integer(1),
            Token::Integer(0),
            Token::Obj,
            Token::DictStart,
            Token::Name(Name::from("Type")),
            Token::Name(Name::from("Catalog")),
            Token::Name(Name::from("Pages")),
            Token::Integer(2),
            Token::Integer(0),
            Token::R,
            Token::DictEnd,
            Token::EndObj,
        ]);
    }

    #[test]
    fn test_begin_stream_payload() {
        let data = b"stream\r\nPAYLOAD";
        let mut buf = Buffer::new(Cursor::new(data.to_vec())).unwrap();
        let mut lexer = Lexer::new(&mut buf);
        assert_eq!(lexer.next_token().unwrap(), Token::Stream);
        let start = lexer.begin_stream_payload().unwrap();
        assert_eq!(start, 8);

        let data = b"stream\nPAYLOAD";
        let mut buf = Buffer::new(Cursor::new(data.to_vec())).unwrap();
        let mut lexer = Lexer::new(&mut buf);
        assert_eq!(lexer.next_token().unwrap(), Token::Stream);
        assert_eq!(lexer.begin_stream_payload().unwrap(), 7);
    }

    #[test]
    fn test_unterminated_string_is_eof() {
        let mut buf = Buffer::new(Cursor::new(b"(unclosed".to_vec())).unwrap();
        let mut lexer = Lexer::new(&mut buf);
        assert!(matches!(lexer.next_token(), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_position_tracks_lookahead() {
        let mut buf = Buffer::new(Cursor::new(b"ab".to_vec())).unwrap();
        let mut lexer = Lexer::new(&mut buf);
        assert_eq!(lexer.position(), 0);
        lexer.peek_byte().unwrap();
        assert_eq!(lexer.position(), 0);
        lexer.next_byte().unwrap();
        assert_eq!(lexer.position(), 1);
    }
}
