//! Object serialization (ISO 32000-1, 7.3 syntax).

use crate::object::{Dict, IndirectObject, Object, ObjectRef};
use std::io::{self, Write};

/// Write any non-stream object in canonical textual form.
///
/// Stream objects carry a payload locator instead of bytes, so they cannot
/// be written here; use [`write_stream`] with the payload in hand.
pub fn write_object<W: Write>(w: &mut W, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => write!(w, "null"),
        Object::Boolean(true) => write!(w, "true"),
        Object::Boolean(false) => write!(w, "false"),
        Object::Integer(value) => write!(w, "{}", value),
        Object::Real(value) => write_real(w, *value),
        Object::String(bytes) => write_string(w, bytes),
        Object::Name(name) => {
            w.write_all(b"/")?;
            w.write_all(&name.escaped())
        }
        Object::Array(items) => {
            w.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    w.write_all(b" ")?;
                }
                write_object(w, item)?;
            }
            w.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dict(w, dict),
        Object::Reference(ObjectRef { number, generation }) => {
            write!(w, "{} {} R", number, generation)
        }
        Object::Stream(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "stream objects are written with write_stream",
        )),
    }
}

/// Write `N G obj <value> endobj` for a non-stream object.
pub fn write_indirect_object<W: Write>(w: &mut W, indirect: &IndirectObject) -> io::Result<()> {
    let ObjectRef { number, generation } = indirect.reference;
    write!(w, "{} {} obj\n", number, generation)?;
    write_object(w, &indirect.object)?;
    write!(w, "\nendobj\n")
}

/// Write an indirect stream object: the dictionary with an up-to-date
/// `Length`, then `stream\n`, the raw payload, and `\nendstream`.
pub fn write_stream<W: Write>(
    w: &mut W,
    reference: ObjectRef,
    dict: &Dict,
    payload: &[u8],
) -> io::Result<()> {
    let mut dict = dict.clone();
    dict.insert("Length", Object::Integer(payload.len() as i64));

    write!(w, "{} {} obj\n", reference.number, reference.generation)?;
    write_dict(w, &dict)?;
    w.write_all(b"\nstream\n")?;
    w.write_all(payload)?;
    w.write_all(b"\nendstream\nendobj\n")
}

fn write_dict<W: Write>(w: &mut W, dict: &Dict) -> io::Result<()> {
    w.write_all(b"<<")?;
    for (key, value) in dict.iter() {
        w.write_all(b" /")?;
        w.write_all(&key.escaped())?;
        w.write_all(b" ")?;
        write_object(w, value)?;
    }
    w.write_all(b" >>")
}

/// Reals print in the shortest decimal form that parses back to the same
/// value; whole values keep a `.0` so they stay reals on re-read.
fn write_real<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    if !value.is_finite() {
        return write!(w, "0");
    }
    if value.fract() == 0.0 {
        write!(w, "{:.1}", value)
    } else {
        write!(w, "{}", value)
    }
}

/// Literal form with escapes for text-like content; hex form otherwise.
fn write_string<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    let text_like = bytes
        .iter()
        .all(|&b| matches!(b, b'\n' | b'\r' | b'\t') || (0x20..=0x7E).contains(&b));

    if text_like {
        w.write_all(b"(")?;
        for &byte in bytes {
            match byte {
                b'(' => w.write_all(b"\\(")?,
                b')' => w.write_all(b"\\)")?,
                b'\\' => w.write_all(b"\\\\")?,
                b'\n' => w.write_all(b"\\n")?,
                b'\r' => w.write_all(b"\\r")?,
                b'\t' => w.write_all(b"\\t")?,
                byte => w.write_all(&[byte])?,
            }
        }
        w.write_all(b")")
    } else {
        w.write_all(b"<")?;
        for byte in bytes {
            write!(w, "{:02X}", byte)?;
        }
        w.write_all(b">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use crate::parser::parse_object_from_slice;
    use proptest::prelude::*;

    fn to_string(object: &Object) -> String {
        let mut out = Vec::new();
        write_object(&mut out, object).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_primitives() {
        assert_eq!(to_string(&Object::Null), "null");
        assert_eq!(to_string(&Object::Boolean(true)), "true");
        assert_eq!(to_string(&Object::Boolean(false)), "false");
        assert_eq!(to_string(&Object::Integer(-42)), "-42");
        assert_eq!(to_string(&Object::name("Type")), "/Type");
        assert_eq!(to_string(&Object::reference(10, 0)), "10 0 R");
    }

    #[test]
    fn test_write_reals() {
        assert_eq!(to_string(&Object::Real(0.5)), "0.5");
        assert_eq!(to_string(&Object::Real(-2.25)), "-2.25");
        assert_eq!(to_string(&Object::Real(1.0)), "1.0");
        assert_eq!(to_string(&Object::Real(-3.0)), "-3.0");
    }

    #[test]
    fn test_write_strings() {
        assert_eq!(to_string(&Object::string(&b"Hello"[..])), "(Hello)");
        assert_eq!(
            to_string(&Object::string(&b"a(b)c\\d"[..])),
            "(a\\(b\\)c\\\\d)"
        );
        assert_eq!(to_string(&Object::string(vec![0x00, 0xFF, 0x80])), "<00FF80>");
    }

    #[test]
    fn test_write_name_escaping() {
        assert_eq!(
            to_string(&Object::name("Name With Space")),
            "/Name#20With#20Space"
        );
    }

    #[test]
    fn test_write_array_and_dict() {
        let arr = Object::Array(vec![
            Object::Integer(1),
            Object::name("Two"),
            Object::reference(3, 0),
        ]);
        assert_eq!(to_string(&arr), "[1 /Two 3 0 R]");

        let dict = Object::Dictionary(Dict::from_pairs([
            ("Type", Object::name("Page")),
            ("Count", Object::Integer(3)),
        ]));
        assert_eq!(to_string(&dict), "<< /Type /Page /Count 3 >>");
    }

    #[test]
    fn test_dict_keys_written_in_insertion_order() {
        let dict = Object::Dictionary(Dict::from_pairs([
            ("Zebra", Object::Integer(1)),
            ("Alpha", Object::Integer(2)),
        ]));
        assert_eq!(to_string(&dict), "<< /Zebra 1 /Alpha 2 >>");
    }

    #[test]
    fn test_write_indirect() {
        let indirect = IndirectObject {
            reference: ObjectRef::new(7, 0),
            object: Object::Integer(42),
        };
        let mut out = Vec::new();
        write_indirect_object(&mut out, &indirect).unwrap();
        assert_eq!(out, b"7 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_write_stream_sets_length() {
        let dict = Dict::from_pairs([("Filter", Object::name("FlateDecode"))]);
        let mut out = Vec::new();
        write_stream(&mut out, ObjectRef::new(5, 0), &dict, b"payload").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("5 0 obj\n"));
        assert!(text.contains("/Length 7"));
        assert!(text.contains("stream\npayload\nendstream"));
    }

    #[test]
    fn test_stream_object_rejected_by_write_object() {
        let stream = Object::Stream(crate::object::Stream {
            dict: Dict::new(),
            start: 0,
        });
        assert!(write_object(&mut Vec::new(), &stream).is_err());
    }

    #[test]
    fn test_written_stream_reparses() {
        let dict = Dict::from_pairs([("Kind", Object::name("Data"))]);
        let mut out = Vec::new();
        write_stream(&mut out, ObjectRef::new(5, 0), &dict, b"ABCDEF").unwrap();

        let mut buf = crate::buffer::Buffer::new(std::io::Cursor::new(out)).unwrap();
        let indirect = crate::parser::Parser::new(&mut buf)
            .parse_indirect_object()
            .unwrap();
        let stream = indirect.object.as_stream().unwrap();
        assert_eq!(stream.dict.get("Length").unwrap().as_integer(), Some(6));

        buf.seek(stream.start).unwrap();
        assert_eq!(buf.read_vec(6).unwrap(), b"ABCDEF");
    }

    fn arb_object() -> impl Strategy<Value = Object> {
        let leaf = prop_oneof![
            Just(Object::Null),
            any::<bool>().prop_map(Object::Boolean),
            any::<i64>().prop_map(Object::Integer),
            (-1.0e9f64..1.0e9).prop_map(Object::Real),
            proptest::collection::vec(any::<u8>(), 0..24).prop_map(Object::String),
            proptest::collection::vec(any::<u8>(), 1..10)
                .prop_map(|bytes| Object::Name(Name::new(bytes))),
            (1u32..10_000, 0u16..10).prop_map(|(n, g)| Object::reference(n, g)),
        ];
        leaf.prop_recursive(3, 24, 6, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..5).prop_map(Object::Array),
                proptest::collection::vec(("[A-Za-z][A-Za-z0-9]{0,5}", inner), 0..5).prop_map(
                    |pairs| {
                        Object::Dictionary(
                            pairs
                                .into_iter()
                                .map(|(k, v)| (Name::from(k.as_str()), v))
                                .collect(),
                        )
                    }
                ),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_write_then_parse_round_trips(object in arb_object()) {
            let mut out = Vec::new();
            write_object(&mut out, &object).unwrap();
            let reparsed = parse_object_from_slice(&out).unwrap();
            prop_assert_eq!(reparsed, object);
        }

        #[test]
        fn prop_string_forms_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut out = Vec::new();
            write_string(&mut out, &bytes).unwrap();
            let reparsed = parse_object_from_slice(&out).unwrap();
            prop_assert_eq!(reparsed, Object::String(bytes));
        }

        #[test]
        fn prop_name_escape_round_trips(bytes in proptest::collection::vec(any::<u8>(), 1..24)) {
            let name = Name::new(bytes);
            prop_assert_eq!(Name::from_escaped(&name.escaped()), name);
        }
    }
}
