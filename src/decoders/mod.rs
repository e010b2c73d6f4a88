//! Stream filter pipeline.
//!
//! Decoders for the stream filters this layer supports:
//! - FlateDecode (`Fl`) — zlib, with the TIFF/PNG predictor post-pass
//! - ASCII85Decode (`A85`)
//! - ASCIIHexDecode (`AHx`)
//!
//! A chain is built from a stream dictionary's `Filter` and `DecodeParms`
//! entries and applied left-to-right: the first filter decodes the raw
//! payload. `Crypt` filters with the identity name are dropped from the
//! chain (they mark the stream as exempt from document encryption); every
//! other filter name is [`Error::Unsupported`].

use crate::error::{Error, Result};
use crate::object::{Dict, Object};

mod ascii85;
mod ascii_hex;
mod flate;
mod predictor;

pub use predictor::PredictorParams;

pub(crate) use ascii85::decode as ascii85_decode;
pub(crate) use ascii_hex::decode as ascii_hex_decode;

/// A single decoding transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// FlateDecode: zlib inflate followed by the optional predictor pass
    Flate {
        /// Predictor parameters from the filter's `DecodeParms`
        predictor: PredictorParams,
    },
    /// ASCII85Decode
    Ascii85,
    /// ASCIIHexDecode
    AsciiHex,
}

impl Filter {
    /// Apply this transform to a complete buffer.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Filter::Flate { predictor } => {
                let inflated = flate::inflate(data)?;
                predictor.decode(&inflated)
            }
            Filter::Ascii85 => ascii85::decode(data),
            Filter::AsciiHex => ascii_hex::decode(data),
        }
    }
}

/// The decoding chain of a stream, plus whether an identity `Crypt` filter
/// marked it as exempt from document encryption.
#[derive(Debug, Clone, Default)]
pub struct DecodeChain {
    /// Transforms in application order
    pub filters: Vec<Filter>,
    /// An identity `Crypt` filter was present
    pub identity_crypt: bool,
}

impl DecodeChain {
    /// Build the chain from a stream dictionary's `Filter` (Name or Array of
    /// Names) and `DecodeParms` (Dict or Array of Dicts) entries.
    ///
    /// The dictionary values must already be direct; the document layer
    /// dereferences them first.
    pub fn from_stream_dict(dict: &Dict) -> Result<Self> {
        let names: Vec<&Object> = match dict.get("Filter") {
            None | Some(Object::Null) => Vec::new(),
            Some(single @ Object::Name(_)) => vec![single],
            Some(Object::Array(items)) => items.iter().collect(),
            Some(other) => {
                return Err(Error::corrupted(format!(
                    "Filter entry is {}, expected name or array",
                    other.type_name()
                )))
            }
        };

        let parms_of = |index: usize| -> Option<&Dict> {
            match dict.get("DecodeParms") {
                Some(Object::Dictionary(d)) if index == 0 => Some(d),
                Some(Object::Array(items)) => items.get(index).and_then(|o| o.as_dict()),
                _ => None,
            }
        };

        let mut chain = DecodeChain::default();
        for (index, entry) in names.iter().enumerate() {
            let name = entry.as_name().ok_or_else(|| {
                Error::corrupted(format!("filter is {}, expected name", entry.type_name()))
            })?;
            let parms = parms_of(index);
            match name.as_bytes() {
                b"FlateDecode" | b"Fl" => chain.filters.push(Filter::Flate {
                    predictor: PredictorParams::from_parms(parms),
                }),
                b"ASCII85Decode" | b"A85" => chain.filters.push(Filter::Ascii85),
                b"ASCIIHexDecode" | b"AHx" => chain.filters.push(Filter::AsciiHex),
                b"Crypt" => {
                    let crypt_name = parms
                        .and_then(|p| p.get("Name"))
                        .and_then(|o| o.as_name())
                        .map(|n| n.as_bytes().to_vec())
                        .unwrap_or_else(|| b"Identity".to_vec());
                    if crypt_name == b"Identity" {
                        chain.identity_crypt = true;
                    } else {
                        return Err(Error::Unsupported(format!(
                            "Crypt filter {}",
                            String::from_utf8_lossy(&crypt_name)
                        )));
                    }
                }
                other => {
                    return Err(Error::Unsupported(format!(
                        "filter {}",
                        String::from_utf8_lossy(other)
                    )))
                }
            }
        }
        Ok(chain)
    }

    /// Apply every filter in order to a complete buffer.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut current = data.to_vec();
        for filter in &self.filters {
            current = filter.decode(&current)?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = DecodeChain::from_stream_dict(&Dict::new()).unwrap();
        assert!(chain.filters.is_empty());
        assert_eq!(chain.decode(b"raw bytes").unwrap(), b"raw bytes");
    }

    #[test]
    fn test_single_filter_name() {
        let dict = Dict::from_pairs([("Filter", Object::name("ASCIIHexDecode"))]);
        let chain = DecodeChain::from_stream_dict(&dict).unwrap();
        assert_eq!(chain.decode(b"48656C6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn test_abbreviated_names() {
        for (abbrev, full) in [("Fl", "FlateDecode"), ("A85", "ASCII85Decode"), ("AHx", "ASCIIHexDecode")] {
            let short = DecodeChain::from_stream_dict(&Dict::from_pairs([(
                "Filter",
                Object::name(abbrev),
            )]))
            .unwrap();
            let long = DecodeChain::from_stream_dict(&Dict::from_pairs([(
                "Filter",
                Object::name(full),
            )]))
            .unwrap();
            assert_eq!(short.filters, long.filters);
        }
    }

    #[test]
    fn test_filter_array_applies_left_to_right() {
        // Payload is hex-of-ascii85: AHx decodes first, then A85
        let encoded = b"3C2B552C6D>"; // hex of "<+U,m", the ascii85 form of "Test"
        let dict = Dict::from_pairs([(
            "Filter",
            Object::Array(vec![Object::name("ASCIIHexDecode"), Object::name("ASCII85Decode")]),
        )]);
        let chain = DecodeChain::from_stream_dict(&dict).unwrap();
        assert_eq!(chain.decode(encoded).unwrap(), b"Test");
    }

    #[test]
    fn test_chain_composes() {
        // decode([A, B]) == B(A(x))
        let plain = b"composition check";
        let encoded = deflate(plain);
        let hex: Vec<u8> = encoded.iter().flat_map(|b| format!("{:02X}", b).into_bytes()).collect();

        let dict = Dict::from_pairs([(
            "Filter",
            Object::Array(vec![Object::name("ASCIIHexDecode"), Object::name("FlateDecode")]),
        )]);
        let chain = DecodeChain::from_stream_dict(&dict).unwrap();
        let composed = chain.decode(&hex).unwrap();

        let step1 = Filter::AsciiHex.decode(&hex).unwrap();
        let step2 = Filter::Flate {
            predictor: PredictorParams::default(),
        }
        .decode(&step1)
        .unwrap();
        assert_eq!(composed, step2);
        assert_eq!(composed, plain);
    }

    #[test]
    fn test_unsupported_filter() {
        let dict = Dict::from_pairs([("Filter", Object::name("LZWDecode"))]);
        let err = DecodeChain::from_stream_dict(&dict).unwrap_err();
        assert!(matches!(err, Error::Unsupported(name) if name.contains("LZWDecode")));
    }

    #[test]
    fn test_identity_crypt_is_skipped_and_flagged() {
        let dict = Dict::from_pairs([
            (
                "Filter",
                Object::Array(vec![Object::name("Crypt"), Object::name("FlateDecode")]),
            ),
            (
                "DecodeParms",
                Object::Array(vec![
                    Object::Dictionary(Dict::from_pairs([("Name", Object::name("Identity"))])),
                    Object::Null,
                ]),
            ),
        ]);
        let chain = DecodeChain::from_stream_dict(&dict).unwrap();
        assert!(chain.identity_crypt);
        assert_eq!(chain.filters.len(), 1);

        let plain = b"exempt stream";
        assert_eq!(chain.decode(&deflate(plain)).unwrap(), plain);
    }

    #[test]
    fn test_crypt_without_parms_is_identity() {
        let dict = Dict::from_pairs([("Filter", Object::name("Crypt"))]);
        let chain = DecodeChain::from_stream_dict(&dict).unwrap();
        assert!(chain.identity_crypt);
        assert!(chain.filters.is_empty());
    }

    #[test]
    fn test_named_crypt_filter_unsupported() {
        let dict = Dict::from_pairs([
            ("Filter", Object::name("Crypt")),
            (
                "DecodeParms",
                Object::Dictionary(Dict::from_pairs([("Name", Object::name("StdCF"))])),
            ),
        ]);
        assert!(matches!(
            DecodeChain::from_stream_dict(&dict),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_flate_with_predictor_params() {
        let dict = Dict::from_pairs([
            ("Filter", Object::name("FlateDecode")),
            (
                "DecodeParms",
                Object::Dictionary(Dict::from_pairs([
                    ("Predictor", Object::Integer(12)),
                    ("Columns", Object::Integer(4)),
                ])),
            ),
        ]);
        let chain = DecodeChain::from_stream_dict(&dict).unwrap();
        match &chain.filters[0] {
            Filter::Flate { predictor } => {
                assert_eq!(predictor.predictor, 12);
                assert_eq!(predictor.columns, 4);
            }
            other => panic!("expected flate filter, got {:?}", other),
        }
    }
}
