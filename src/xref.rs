//! Cross-reference parsing.
//!
//! An xref maps object numbers to file locations. Two wire forms exist:
//! the classic textual table (`xref` keyword, fixed 20-byte entries) and,
//! since PDF 1.5, cross-reference streams with packed binary entries.
//!
//! Table entries are not materialized into a map: a parsed [`XRefTable`]
//! records where each subsection's entry block lives, and lookups seek to
//! the exact 20-byte record on demand. Higher layers that want a cache
//! build their own.

use crate::buffer::Buffer;
use crate::decoders::DecodeChain;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser::Parser;
use std::io::{Read, Seek};

/// Width of one textual xref entry, terminator included.
const ENTRY_WIDTH: u64 = 20;

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// The object number is free; `next_free` chains the free list.
    Free {
        /// Next free object number
        next_free: u32,
        /// Generation to use if the number is reused
        generation: u16,
    },
    /// The object lives at a byte offset in the file.
    InUse {
        /// Absolute byte offset of `N G obj`
        offset: u64,
        /// Generation number
        generation: u16,
    },
    /// The object lives inside an object stream.
    Compressed {
        /// Object number of the `ObjStm` container
        container: u32,
        /// Index within the container
        index: u32,
    },
}

/// A subsection of a classic xref table: `count` entries for object numbers
/// starting at `first`, stored as fixed-width records at `entries_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefSection {
    /// First object number covered
    pub first: u32,
    /// Number of entries
    pub count: u32,
    /// Absolute offset of the first 20-byte record
    pub entries_offset: u64,
}

/// A classic textual cross-reference table and its trailer.
#[derive(Debug, Clone)]
pub struct XRefTable {
    /// Offset the table was parsed from
    pub start: u64,
    /// Subsections in file order
    pub sections: Vec<XRefSection>,
    /// The trailer dictionary following the table
    pub trailer: Dict,
}

impl XRefTable {
    /// Parse the table at `offset`. Entry blocks are located but not
    /// decoded; the trailer dictionary is.
    pub fn parse<R: Read + Seek>(buf: &mut Buffer<R>, offset: u64) -> Result<Self> {
        buf.seek(offset)?;
        let first_line = buf.read_line()?;
        if trim(&first_line) != b"xref" {
            return Err(Error::corrupted(format!(
                "expected 'xref' keyword at offset {}",
                offset
            )));
        }

        let mut sections = Vec::new();
        let trailer = loop {
            let line_start = buf.position();
            let line = buf.read_line()?;
            let text = trim(&line);

            if text.is_empty() || text.starts_with(b"%") {
                continue;
            }
            if text.starts_with(b"trailer") {
                // The dictionary may share the keyword's line; re-parse from
                // the keyword itself.
                let keyword_at = find(&line, b"trailer")
                    .ok_or_else(|| Error::corrupted("trailer keyword vanished on re-read"))?;
                buf.seek(line_start + keyword_at as u64)?;
                break Parser::new(buf).parse_trailer()?;
            }

            let header = parse_subsection_header(text).ok_or_else(|| {
                Error::corrupted(format!(
                    "malformed xref subsection header at offset {}",
                    line_start
                ))
            })?;
            let (first, count) = header;
            let entries_offset = buf.position();
            sections.push(XRefSection {
                first,
                count,
                entries_offset,
            });
            // Skip the fixed-width entry block
            buf.seek(entries_offset + count as u64 * ENTRY_WIDTH)?;
        };

        Ok(XRefTable {
            start: offset,
            sections,
            trailer,
        })
    }

    /// Whether some subsection covers the object number.
    pub fn contains(&self, number: u32) -> bool {
        self.sections
            .iter()
            .any(|s| number >= s.first && number - s.first < s.count)
    }

    /// Decode the entry for an object number, seeking to its record.
    pub fn lookup<R: Read + Seek>(
        &self,
        buf: &mut Buffer<R>,
        number: u32,
    ) -> Result<Option<XRefEntry>> {
        for section in &self.sections {
            if number >= section.first && number - section.first < section.count {
                let slot = (number - section.first) as u64;
                buf.seek(section.entries_offset + slot * ENTRY_WIDTH)?;
                let mut record = [0u8; ENTRY_WIDTH as usize];
                buf.read_exact(&mut record)?;
                return decode_table_entry(&record).map(Some);
            }
        }
        Ok(None)
    }
}

/// `first count` subsection header.
fn parse_subsection_header(text: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(text).ok()?;
    let mut parts = text.split_ascii_whitespace();
    let first: u32 = parts.next()?.parse().ok()?;
    let count: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((first, count))
}

/// Decode one fixed-width record: `oooooooooo ggggg n|f` plus a two-byte
/// terminator. Anything off-grid is corruption, since record positions are
/// computed by multiplication.
fn decode_table_entry(record: &[u8; 20]) -> Result<XRefEntry> {
    let bad = || Error::corrupted("malformed 20-byte xref entry");

    if record[10] != b' ' || record[16] != b' ' {
        return Err(bad());
    }
    if !record[18].is_ascii_whitespace() || !record[19].is_ascii_whitespace() {
        return Err(bad());
    }
    let offset = parse_decimal(&record[0..10]).ok_or_else(bad)?;
    let generation = parse_decimal(&record[11..16]).ok_or_else(bad)? as u16;

    match record[17] {
        b'n' => Ok(XRefEntry::InUse { offset, generation }),
        b'f' => Ok(XRefEntry::Free {
            next_free: offset as u32,
            generation,
        }),
        _ => Err(bad()),
    }
}

fn parse_decimal(digits: &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    for &digit in digits {
        if !digit.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (digit - b'0') as u64;
    }
    Some(value)
}

fn trim(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &line[start..end]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A cross-reference stream: `Type /XRef` with packed big-endian entries
/// (ISO 32000-1, 7.5.8). The stream dictionary doubles as the trailer.
#[derive(Debug, Clone)]
pub struct XRefStream {
    /// The stream's own object label
    pub reference: ObjectRef,
    /// The stream dictionary (also the trailer)
    pub dict: Dict,
    widths: [usize; 3],
    index: Vec<(u32, u32)>,
    entries: Vec<u8>,
}

impl XRefStream {
    /// Parse the xref stream at `offset`, decoding its payload through the
    /// filter pipeline.
    ///
    /// Everything the decoder needs (`Length`, `W`, `Index`, `Filter`) must
    /// be direct: this runs before any object lookup is possible.
    pub fn parse<R: Read + Seek>(buf: &mut Buffer<R>, offset: u64) -> Result<Self> {
        buf.seek(offset)?;
        let indirect = Parser::new(buf).parse_indirect_object()?;
        let stream = match &indirect.object {
            Object::Stream(s) => s,
            other => {
                return Err(Error::corrupted(format!(
                    "xref at offset {} is {}, expected a stream",
                    offset,
                    other.type_name()
                )))
            }
        };
        let dict = stream.dict.clone();

        match dict.get("Type").and_then(|o| o.as_name()) {
            Some(name) if name == "XRef" => {}
            _ => return Err(Error::corrupted("xref stream is not /Type /XRef")),
        }

        let length = dict
            .get("Length")
            .and_then(|o| o.as_integer())
            .ok_or_else(|| Error::corrupted("xref stream Length must be a direct integer"))?;
        if length < 0 {
            return Err(Error::corrupted("negative xref stream Length"));
        }
        buf.seek(stream.start)?;
        let raw = buf.read_vec(length as usize)?;
        let entries = DecodeChain::from_stream_dict(&dict)?.decode(&raw)?;

        let widths = parse_widths(&dict)?;
        let size = dict
            .get("Size")
            .and_then(|o| o.as_integer())
            .ok_or_else(|| Error::corrupted("xref stream missing /Size"))? as u32;
        let index = parse_index(&dict, size)?;

        let entry_width: usize = widths.iter().sum();
        let total: u64 = index.iter().map(|&(_, count)| count as u64).sum();
        if entry_width == 0 || (entries.len() as u64) < total * entry_width as u64 {
            return Err(Error::corrupted("truncated xref stream data"));
        }

        Ok(XRefStream {
            reference: indirect.reference,
            dict,
            widths,
            index,
            entries,
        })
    }

    /// Decode the entry for an object number.
    pub fn lookup(&self, number: u32) -> Result<Option<XRefEntry>> {
        let entry_width: usize = self.widths.iter().sum();
        let mut base = 0usize;
        for &(first, count) in &self.index {
            if number >= first && number - first < count {
                let slot = base + (number - first) as usize;
                let record = &self.entries[slot * entry_width..(slot + 1) * entry_width];
                return decode_stream_entry(record, &self.widths).map(Some);
            }
            base += count as usize;
        }
        Ok(None)
    }
}

fn parse_widths(dict: &Dict) -> Result<[usize; 3]> {
    let w = dict
        .get("W")
        .and_then(|o| o.as_array())
        .ok_or_else(|| Error::corrupted("xref stream missing /W"))?;
    if w.len() != 3 {
        return Err(Error::corrupted(format!("/W has {} elements", w.len())));
    }
    let mut widths = [0usize; 3];
    for (i, entry) in w.iter().enumerate() {
        let width = entry
            .as_integer()
            .filter(|&v| (0..=8).contains(&v))
            .ok_or_else(|| Error::corrupted("invalid /W element"))?;
        widths[i] = width as usize;
    }
    Ok(widths)
}

fn parse_index(dict: &Dict, size: u32) -> Result<Vec<(u32, u32)>> {
    let Some(obj) = dict.get("Index") else {
        return Ok(vec![(0, size)]);
    };
    let items = obj
        .as_array()
        .ok_or_else(|| Error::corrupted("/Index is not an array"))?;
    if items.len() % 2 != 0 {
        return Err(Error::corrupted("/Index has odd length"));
    }
    let mut index = Vec::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        let first = pair[0]
            .as_integer()
            .filter(|&v| v >= 0)
            .ok_or_else(|| Error::corrupted("invalid /Index start"))? as u32;
        let count = pair[1]
            .as_integer()
            .filter(|&v| v >= 0)
            .ok_or_else(|| Error::corrupted("invalid /Index count"))? as u32;
        index.push((first, count));
    }
    Ok(index)
}

/// Big-endian packed field; width 0 yields 0 (the caller applies defaults).
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn decode_stream_entry(record: &[u8], widths: &[usize; 3]) -> Result<XRefEntry> {
    let [w1, w2, w3] = *widths;
    // A zero-width type field defaults to type 1; other fields default to 0
    let kind = if w1 == 0 { 1 } else { read_be(&record[..w1]) };
    let field2 = read_be(&record[w1..w1 + w2]);
    let field3 = read_be(&record[w1 + w2..w1 + w2 + w3]);

    match kind {
        0 => Ok(XRefEntry::Free {
            next_free: field2 as u32,
            generation: field3 as u16,
        }),
        1 => Ok(XRefEntry::InUse {
            offset: field2,
            generation: field3 as u16,
        }),
        2 => Ok(XRefEntry::Compressed {
            container: field2 as u32,
            index: field3 as u32,
        }),
        other => Err(Error::corrupted(format!("xref entry type {}", other))),
    }
}

/// One link of the cross-reference chain, in either wire form.
#[derive(Debug, Clone)]
pub enum XRef {
    /// Classic textual table
    Table(XRefTable),
    /// Cross-reference stream
    Stream(XRefStream),
}

impl XRef {
    /// Parse whichever xref form lives at `offset`.
    pub fn parse<R: Read + Seek>(buf: &mut Buffer<R>, offset: u64) -> Result<Self> {
        buf.seek(offset)?;
        let mut probe = [0u8; 24];
        let got = buf.read(&mut probe)?;
        let head = trim_start(&probe[..got]);

        if head.starts_with(b"xref") {
            log::debug!("classic xref table at offset {}", offset);
            Ok(XRef::Table(XRefTable::parse(buf, offset)?))
        } else if head.first().is_some_and(|b| b.is_ascii_digit()) {
            log::debug!("xref stream at offset {}", offset);
            Ok(XRef::Stream(XRefStream::parse(buf, offset)?))
        } else {
            Err(Error::corrupted(format!("no xref at offset {}", offset)))
        }
    }

    /// The trailer dictionary: the table's own, or the stream's dictionary.
    pub fn trailer(&self) -> &Dict {
        match self {
            XRef::Table(t) => &t.trailer,
            XRef::Stream(s) => &s.dict,
        }
    }

    /// Offset of the previous xref in the chain (`Prev`).
    pub fn prev(&self) -> Result<Option<u64>> {
        match self.trailer().get("Prev") {
            None => Ok(None),
            Some(obj) => obj
                .as_integer()
                .filter(|&v| v >= 0)
                .map(|v| Some(v as u64))
                .ok_or_else(|| Error::corrupted("invalid /Prev")),
        }
    }

    /// Offset of the hybrid-file xref stream (`XRefStm` in a classic
    /// trailer), visited immediately after this table.
    pub fn hybrid_stream(&self) -> Result<Option<u64>> {
        let XRef::Table(table) = self else {
            return Ok(None);
        };
        match table.trailer.get("XRefStm") {
            None => Ok(None),
            Some(obj) => obj
                .as_integer()
                .filter(|&v| v >= 0)
                .map(|v| Some(v as u64))
                .ok_or_else(|| Error::corrupted("invalid /XRefStm")),
        }
    }

    /// Decode the entry for an object number, if this xref covers it.
    pub fn lookup<R: Read + Seek>(
        &self,
        buf: &mut Buffer<R>,
        number: u32,
    ) -> Result<Option<XRefEntry>> {
        match self {
            XRef::Table(t) => t.lookup(buf, number),
            XRef::Stream(s) => s.lookup(number),
        }
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
