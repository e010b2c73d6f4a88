//! Stream content extraction.
//!
//! [`StreamContent`] is a pull-based byte source over a stream payload:
//! a reader bounded to exactly `Length` bytes of the file, wrapped by the
//! per-object decryptor when encryption is active, wrapped by the filter
//! chain. Flate payloads and RC4 decryption stay fully incremental; the
//! batch transforms (ASCII85/Hex, predictor rows, AES-CBC) buffer on first
//! read.
//!
//! Dropping a `StreamContent` mid-read is safe: every stream read seeks to
//! its own payload offset on entry, so an abandoned reader cannot corrupt
//! later parsing.

use crate::buffer::Buffer;
use crate::decoders::{DecodeChain, Filter, PredictorParams};
use crate::encryption::Rc4;
use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use std::io::{self, Cursor, Read, Seek};

/// Per-object decryption applied under the filter chain.
pub(crate) enum Decryptor {
    /// RC4, streamable
    Rc4(Rc4),
    /// AES-128-CBC with the given object key; buffered
    Aes(Vec<u8>),
}

/// Lazily-consumed decoded bytes of one stream.
pub struct StreamContent<'a> {
    inner: Box<dyn Read + 'a>,
}

impl<'a> StreamContent<'a> {
    /// Assemble the pipeline. The caller resolved `Length` and built the
    /// filter chain already; `start` addresses the raw payload.
    pub(crate) fn build<R: Read + Seek>(
        buf: &'a mut Buffer<R>,
        start: u64,
        length: u64,
        chain: &DecodeChain,
        decryptor: Option<Decryptor>,
    ) -> Result<Self> {
        buf.seek(start)?;
        let mut source: Box<dyn Read + 'a> = Box::new(Bounded {
            buf,
            remaining: length,
        });

        match decryptor {
            None => {}
            Some(Decryptor::Rc4(cipher)) => {
                source = Box::new(Rc4Reader {
                    inner: source,
                    cipher,
                })
            }
            Some(Decryptor::Aes(key)) => source = Box::new(Deferred::new(source, Op::Aes(key))),
        }

        for filter in &chain.filters {
            source = match filter {
                Filter::Flate { predictor } => {
                    let inflated: Box<dyn Read + 'a> = Box::new(ZlibDecoder::new(source));
                    if predictor.predictor == 1 {
                        inflated
                    } else {
                        Box::new(Deferred::new(inflated, Op::Predictor(predictor.clone())))
                    }
                }
                Filter::Ascii85 => Box::new(Deferred::new(source, Op::Ascii85)),
                Filter::AsciiHex => Box::new(Deferred::new(source, Op::AsciiHex)),
            };
        }

        Ok(StreamContent { inner: source })
    }

    /// Drain the remaining bytes into a vector.
    pub fn read_to_vec(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.inner
            .read_to_end(&mut out)
            .map_err(from_io_error)?;
        Ok(out)
    }
}

impl Read for StreamContent<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.inner.read(out)
    }
}

fn to_io_error(err: Error) -> io::Error {
    match err {
        Error::Io(io) => io,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

fn from_io_error(err: io::Error) -> Error {
    match err.downcast::<Error>() {
        Ok(inner) => inner,
        Err(err) => Error::Io(err),
    }
}

/// Exactly `remaining` bytes of the underlying file.
struct Bounded<'a, R> {
    buf: &'a mut Buffer<R>,
    remaining: u64,
}

impl<R: Read + Seek> Read for Bounded<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || out.is_empty() {
            return Ok(0);
        }
        let want = self.remaining.min(out.len() as u64) as usize;
        let got = self.buf.read(&mut out[..want]).map_err(to_io_error)?;
        if got == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                Error::UnexpectedEof,
            ));
        }
        self.remaining -= got as u64;
        Ok(got)
    }
}

/// Streaming RC4: XOR the keystream over whatever the inner reader yields.
struct Rc4Reader<'a> {
    inner: Box<dyn Read + 'a>,
    cipher: Rc4,
}

impl Read for Rc4Reader<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let got = self.inner.read(out)?;
        self.cipher.apply_keystream(&mut out[..got]);
        Ok(got)
    }
}

/// The batch transforms: applied to the whole inner payload on first read,
/// then served incrementally.
enum Op {
    Ascii85,
    AsciiHex,
    Predictor(PredictorParams),
    Aes(Vec<u8>),
}

struct Deferred<'a> {
    source: Option<Box<dyn Read + 'a>>,
    op: Op,
    decoded: Cursor<Vec<u8>>,
}

impl<'a> Deferred<'a> {
    fn new(source: Box<dyn Read + 'a>, op: Op) -> Self {
        Deferred {
            source: Some(source),
            op,
            decoded: Cursor::new(Vec::new()),
        }
    }

    fn force(&mut self) -> io::Result<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let mut raw = Vec::new();
        source.read_to_end(&mut raw)?;
        let decoded = match &self.op {
            Op::Ascii85 => crate::decoders::ascii85_decode(&raw),
            Op::AsciiHex => crate::decoders::ascii_hex_decode(&raw),
            Op::Predictor(params) => params.decode(&raw),
            Op::Aes(key) => crate::encryption::aes_decrypt(key, &raw),
        }
        .map_err(to_io_error)?;
        self.decoded = Cursor::new(decoded);
        Ok(())
    }
}

impl Read for Deferred<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.force()?;
        self.decoded.read(out)
    }
}
