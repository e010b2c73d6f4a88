//! PDF object parser.
//!
//! Recursive descent over lexer tokens, producing [`Object`] values
//! (ISO 32000-1, 7.3). Three entry points:
//!
//! - [`Parser::parse_object`] — any value, with `N G R` reference lookahead
//! - [`Parser::parse_indirect_object`] — `N G obj <value> endobj`; a
//!   dictionary followed by `stream` becomes a [`Stream`](crate::object::Stream)
//!   whose payload offset is recorded without consuming any payload bytes
//! - [`Parser::parse_trailer`] — the `trailer << ... >>` form
//!
//! The parser repositions the document buffer as it reads; callers seek to
//! the byte they want parsed and construct a parser there.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};
use crate::object::{Dict, IndirectObject, Object, ObjectRef, Stream};
use std::collections::VecDeque;
use std::io::{Read, Seek};

/// Recursive-descent parser over a [`Buffer`].
pub struct Parser<'a, R> {
    lexer: Lexer<'a, R>,
    lookahead: VecDeque<Token>,
}

impl<'a, R: Read + Seek> Parser<'a, R> {
    /// Create a parser reading from the buffer's current position.
    pub fn new(buf: &'a mut Buffer<R>) -> Self {
        Parser {
            lexer: Lexer::new(buf),
            lookahead: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        match self.lookahead.pop_front() {
            Some(tok) => Ok(tok),
            None => self.lexer.next_token(),
        }
    }

    fn position(&self) -> u64 {
        self.lexer.position()
    }

    /// Parse any object value.
    pub fn parse_object(&mut self) -> Result<Object> {
        let tok = self.next_token()?;
        self.parse_object_from(tok)
    }

    fn parse_object_from(&mut self, tok: Token) -> Result<Object> {
        match tok {
            Token::Null => Ok(Object::Null),
            Token::True => Ok(Object::Boolean(true)),
            Token::False => Ok(Object::Boolean(false)),
            Token::Integer(value) => self.integer_or_reference(value),
            Token::Real(value) => Ok(Object::Real(value)),
            Token::LiteralString(bytes) | Token::HexString(bytes) => Ok(Object::String(bytes)),
            Token::Name(name) => Ok(Object::Name(name)),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => Ok(Object::Dictionary(self.parse_dict_body()?)),
            Token::Eof => Err(Error::UnexpectedEof),
            _ => Err(Error::parse(self.position(), "object")),
        }
    }

    /// An integer may be the start of `N G R`. Two tokens of lookahead
    /// decide; a failed match puts them back.
    fn integer_or_reference(&mut self, value: i64) -> Result<Object> {
        let second = self.next_token()?;
        if let Token::Integer(generation) = second {
            let third = self.next_token()?;
            if third == Token::R {
                if value >= 1 && (0..=u16::MAX as i64).contains(&generation) {
                    return Ok(Object::Reference(ObjectRef::new(
                        value as u32,
                        generation as u16,
                    )));
                }
                return Err(Error::parse(self.position(), "valid object reference"));
            }
            self.lookahead.push_back(second);
            self.lookahead.push_back(third);
        } else {
            self.lookahead.push_back(second);
        }
        Ok(Object::Integer(value))
    }

    fn parse_array(&mut self) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            let tok = self.next_token()?;
            match tok {
                Token::ArrayEnd => return Ok(Object::Array(items)),
                Token::Eof => return Err(Error::UnexpectedEof),
                other => items.push(self.parse_object_from(other)?),
            }
        }
    }

    fn parse_dict_body(&mut self) -> Result<Dict> {
        let mut dict = Dict::new();
        loop {
            let tok = self.next_token()?;
            match tok {
                Token::DictEnd => return Ok(dict),
                Token::Name(key) => {
                    let value = self.parse_object()?;
                    dict.insert(key, value);
                }
                Token::Eof => return Err(Error::UnexpectedEof),
                _ => return Err(Error::parse(self.position(), "dictionary key")),
            }
        }
    }

    /// Parse `N G obj <value> endobj`.
    ///
    /// When the value is a dictionary followed by `stream`, the result holds
    /// a [`Stream`] whose `start` is the offset just past the `stream`
    /// keyword's EOL; the payload and the trailing `endstream endobj` are
    /// not consumed (skipping them requires the resolved `Length`).
    pub fn parse_indirect_object(&mut self) -> Result<IndirectObject> {
        let number = match self.next_token()? {
            Token::Integer(n) if n >= 1 => n as u32,
            _ => return Err(Error::parse(self.position(), "object number")),
        };
        let generation = match self.next_token()? {
            Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
            _ => return Err(Error::parse(self.position(), "generation number")),
        };
        if self.next_token()? != Token::Obj {
            return Err(Error::parse(self.position(), "'obj'"));
        }
        let reference = ObjectRef::new(number, generation);

        let tok = self.next_token()?;
        let object = if tok == Token::DictStart {
            let dict = self.parse_dict_body()?;
            match self.next_token()? {
                Token::Stream => {
                    debug_assert!(self.lookahead.is_empty());
                    let start = self.lexer.begin_stream_payload()?;
                    return Ok(IndirectObject {
                        reference,
                        object: Object::Stream(Stream { dict, start }),
                    });
                }
                Token::EndObj => {
                    return Ok(IndirectObject {
                        reference,
                        object: Object::Dictionary(dict),
                    })
                }
                _ => return Err(Error::parse(self.position(), "'stream' or 'endobj'")),
            }
        } else {
            self.parse_object_from(tok)?
        };

        if self.next_token()? != Token::EndObj {
            return Err(Error::parse(self.position(), "'endobj'"));
        }
        Ok(IndirectObject { reference, object })
    }

    /// Parse the `trailer << ... >>` form.
    pub fn parse_trailer(&mut self) -> Result<Dict> {
        match self.next_token()? {
            Token::Keyword(word) if word == b"trailer" => {}
            _ => return Err(Error::parse(self.position(), "'trailer'")),
        }
        if self.next_token()? != Token::DictStart {
            return Err(Error::parse(self.position(), "'<<'"));
        }
        self.parse_dict_body()
    }
}

/// Parse a single object from an in-memory slice.
///
/// Used for object stream members, which live in decoded container payloads
/// rather than in the file.
pub fn parse_object_from_slice(data: &[u8]) -> Result<Object> {
    let mut buf = Buffer::new(std::io::Cursor::new(data))?;
    Parser::new(&mut buf).parse_object()
}
