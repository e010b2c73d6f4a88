//! Cross-reference table and trailer emission.

use super::serializer::write_object;
use crate::object::{Dict, Object};
use crate::xref::XRefEntry;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Write a classic xref table: the `xref` keyword, then one subsection per
/// contiguous run of object numbers, each entry in the fixed 20-byte form.
///
/// Compressed entries cannot be expressed in table form and are rejected.
pub fn write_xref_table<W: Write>(
    w: &mut W,
    entries: &BTreeMap<u32, XRefEntry>,
) -> io::Result<()> {
    w.write_all(b"xref\n")?;

    let numbers: Vec<u32> = entries.keys().copied().collect();
    let mut start = 0usize;
    while start < numbers.len() {
        // extend the run while numbers stay contiguous
        let mut end = start + 1;
        while end < numbers.len() && numbers[end] == numbers[end - 1] + 1 {
            end += 1;
        }

        let first = numbers[start];
        let count = (end - start) as u32;
        write!(w, "{} {}\n", first, count)?;
        for &number in &numbers[start..end] {
            match entries[&number] {
                XRefEntry::InUse { offset, generation } => {
                    write!(w, "{:010} {:05} n\r\n", offset, generation)?
                }
                XRefEntry::Free {
                    next_free,
                    generation,
                } => write!(w, "{:010} {:05} f\r\n", next_free, generation)?,
                XRefEntry::Compressed { .. } => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "compressed entries require an xref stream",
                    ))
                }
            }
        }
        start = end;
    }
    Ok(())
}

/// Write `trailer <<...>> startxref <offset> %%EOF`.
pub fn write_trailer<W: Write>(w: &mut W, trailer: &Dict, startxref: u64) -> io::Result<()> {
    w.write_all(b"trailer\n")?;
    write_object(w, &Object::Dictionary(trailer.clone()))?;
    write!(w, "\nstartxref\n{}\n%%EOF\n", startxref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::xref::XRefTable;
    use std::io::Cursor;

    fn in_use(offset: u64) -> XRefEntry {
        XRefEntry::InUse {
            offset,
            generation: 0,
        }
    }

    #[test]
    fn test_single_contiguous_run() {
        let mut entries = BTreeMap::new();
        entries.insert(
            0,
            XRefEntry::Free {
                next_free: 0,
                generation: 65535,
            },
        );
        entries.insert(1, in_use(17));
        entries.insert(2, in_use(81));

        let mut out = Vec::new();
        write_xref_table(&mut out, &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("xref\n0 3\n"));
        assert!(text.contains("0000000000 65535 f\r\n"));
        assert!(text.contains("0000000017 00000 n\r\n"));
        assert!(text.contains("0000000081 00000 n\r\n"));
    }

    #[test]
    fn test_gap_splits_subsections() {
        let mut entries = BTreeMap::new();
        entries.insert(1, in_use(17));
        entries.insert(2, in_use(81));
        entries.insert(7, in_use(200));
        entries.insert(8, in_use(260));

        let mut out = Vec::new();
        write_xref_table(&mut out, &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 2\n"));
        assert!(text.contains("7 2\n"));
    }

    #[test]
    fn test_compressed_entry_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(
            3,
            XRefEntry::Compressed {
                container: 4,
                index: 0,
            },
        );
        assert!(write_xref_table(&mut Vec::new(), &entries).is_err());
    }

    #[test]
    fn test_written_table_reparses() {
        let mut entries = BTreeMap::new();
        entries.insert(
            0,
            XRefEntry::Free {
                next_free: 0,
                generation: 65535,
            },
        );
        entries.insert(1, in_use(18));
        entries.insert(5, in_use(301));

        let mut data = Vec::new();
        write_xref_table(&mut data, &entries).unwrap();
        let trailer = Dict::from_pairs([
            ("Size", Object::Integer(6)),
            ("Root", Object::reference(1, 0)),
        ]);
        write_trailer(&mut data, &trailer, 0).unwrap();

        let mut buf = Buffer::new(Cursor::new(data)).unwrap();
        let table = XRefTable::parse(&mut buf, 0).unwrap();
        assert_eq!(table.sections.len(), 2);
        assert_eq!(table.lookup(&mut buf, 1).unwrap(), Some(in_use(18)));
        assert_eq!(table.lookup(&mut buf, 5).unwrap(), Some(in_use(301)));
        assert_eq!(
            table.trailer.get("Root").unwrap().as_reference(),
            Some(crate::object::ObjectRef::new(1, 0))
        );
    }

    #[test]
    fn test_entry_records_are_twenty_bytes() {
        let mut entries = BTreeMap::new();
        entries.insert(4, in_use(99));
        let mut out = Vec::new();
        write_xref_table(&mut out, &entries).unwrap();
        // "xref\n" + "4 1\n" + one record
        assert_eq!(out.len(), 5 + 4 + 20);
    }
}
