//! Object stream containers (`Type /ObjStm`, ISO 32000-1, 7.5.7).
//!
//! An object stream packs multiple non-stream objects into one compressed
//! payload: a prologue of `N` (object number, relative offset) pairs, then
//! the concatenated object bodies starting at byte `First`.
//!
//! Contained objects always have generation 0 and are located through
//! type-2 xref entries as (container, index). The container itself is
//! decrypted as a stream when document encryption is active; its members
//! are never decrypted again.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};
use crate::object::{Dict, Object};
use crate::parser::parse_object_from_slice;
use std::io::Cursor;

/// A decoded object stream, ready for member extraction.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    first: usize,
    pairs: Vec<(u32, usize)>,
    data: Vec<u8>,
}

impl ObjectStream {
    /// Validate the container dictionary and parse the prologue of the
    /// already-decoded payload.
    pub fn new(dict: &Dict, data: Vec<u8>) -> Result<Self> {
        match dict.get("Type").and_then(|o| o.as_name()) {
            Some(name) if name == "ObjStm" => {}
            _ => return Err(Error::corrupted("container is not /Type /ObjStm")),
        }

        let n = dict
            .get("N")
            .and_then(|o| o.as_integer())
            .filter(|&v| v >= 0)
            .ok_or_else(|| Error::corrupted("object stream missing /N"))?
            as usize;
        let first = dict
            .get("First")
            .and_then(|o| o.as_integer())
            .filter(|&v| v >= 0)
            .ok_or_else(|| Error::corrupted("object stream missing /First"))?
            as usize;

        if first > data.len() {
            return Err(Error::corrupted(format!(
                "/First {} beyond payload of {} bytes",
                first,
                data.len()
            )));
        }

        let pairs = parse_prologue(&data[..first], n)?;
        Ok(ObjectStream { first, pairs, data })
    }

    /// Number of contained objects.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parse the member at `index`, returning its object number and value.
    pub fn get(&self, index: u32) -> Result<(u32, Object)> {
        let &(number, relative) = self.pairs.get(index as usize).ok_or_else(|| {
            Error::corrupted(format!(
                "object stream index {} out of range ({} members)",
                index,
                self.pairs.len()
            ))
        })?;
        let offset = self.first + relative;
        if offset > self.data.len() {
            return Err(Error::corrupted(format!(
                "member offset {} beyond payload",
                offset
            )));
        }
        let object = parse_object_from_slice(&self.data[offset..])?;
        Ok((number, object))
    }
}

/// The prologue: `n` pairs of bare integers.
fn parse_prologue(data: &[u8], n: usize) -> Result<Vec<(u32, usize)>> {
    let mut buf = Buffer::new(Cursor::new(data))?;
    let mut lexer = Lexer::new(&mut buf);
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let number = match lexer.next_token()? {
            Token::Integer(v) if v >= 0 => v as u32,
            _ => return Err(Error::corrupted("object stream prologue: bad object number")),
        };
        let offset = match lexer.next_token()? {
            Token::Integer(v) if v >= 0 => v as usize,
            _ => return Err(Error::corrupted("object stream prologue: bad offset")),
        };
        pairs.push((number, offset));
    }
    Ok(pairs)
}
