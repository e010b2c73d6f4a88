//! Document handle and xref navigation.
//!
//! [`Document`] owns the [`Buffer`] and exposes the structural operations:
//! trailer access, lazy object lookup through the xref chain, stream
//! content extraction, and password authentication. Nothing is cached —
//! every lookup walks the chain from the newest xref, and higher layers
//! that want caches build their own.

use crate::buffer::Buffer;
use crate::decoders::DecodeChain;
use crate::encryption::{CryptMethod, EncryptionHandler, Permissions};
use crate::error::{Error, Result, ResultExt};
use crate::object::{Dict, Object, ObjectRef, Stream};
use crate::objstm::ObjectStream;
use crate::parser::Parser;
use crate::stream::{Decryptor, StreamContent};
use crate::xref::{XRef, XRefEntry};
use std::collections::HashSet;
use std::io::{Read, Seek};

/// How many trailing bytes are searched for `startxref`.
const STARTXREF_WINDOW: u64 = 1024;

/// A PDF document opened over a seekable byte source.
///
/// The handle owns the source; dropping the handle closes it, and stream
/// readers derived from the handle borrow it, so they cannot outlive it.
/// One handle is strictly single-threaded; open the same file twice for
/// concurrent readers.
#[derive(Debug)]
pub struct Document<R> {
    buffer: Buffer<R>,
    version: (u8, u8),
    startxref: u64,
    trailer: Dict,
    encryption: Option<EncryptionHandler>,
    encrypt_ref: Option<ObjectRef>,
}

impl<R: Read + Seek> Document<R> {
    /// Open a document: validate the header, locate `startxref`, load the
    /// newest trailer, and set up encryption (trying the empty user
    /// password) when an `Encrypt` dictionary is present.
    pub fn open(source: R) -> Result<Self> {
        let mut buffer = Buffer::new(source)?;
        let version = parse_header(&mut buffer)?;
        let startxref = find_startxref(&mut buffer)?;
        log::debug!("PDF {}.{}, startxref at {}", version.0, version.1, startxref);

        let newest = XRef::parse(&mut buffer, startxref)
            .context(|| format!("xref at startxref offset {}", startxref))?;
        let trailer = newest.trailer().clone();

        let mut doc = Document {
            buffer,
            version,
            startxref,
            trailer,
            encryption: None,
            encrypt_ref: None,
        };
        doc.init_encryption()?;
        Ok(doc)
    }

    /// The header version, e.g. `(1, 7)`.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The most recent trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Whether the document carries an `Encrypt` dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// The user permissions of an encrypted document.
    pub fn permissions(&self) -> Option<Permissions> {
        self.encryption.as_ref().map(|h| h.permissions())
    }

    /// Verify a user password. Success replaces the file key; failure is
    /// [`Error::AuthFailure`] and keeps any previously verified key.
    /// A no-op on unencrypted documents.
    pub fn set_user_password(&mut self, password: &[u8]) -> Result<()> {
        let Some(handler) = self.encryption.as_mut() else {
            return Ok(());
        };
        if handler.authenticate(password) {
            Ok(())
        } else {
            Err(Error::AuthFailure)
        }
    }

    /// Walk the chain newest to oldest, visiting each xref until the
    /// callback yields a value. A classic table's `XRefStm` stream is
    /// visited immediately after the table, before its `Prev`.
    fn walk_chain<T>(
        &mut self,
        mut visit: impl FnMut(&mut Buffer<R>, &XRef) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        let mut pending = vec![(self.startxref, false)];
        let mut visited = HashSet::new();
        while let Some((offset, via_hybrid)) = pending.pop() {
            if !visited.insert(offset) {
                return Err(Error::corrupted("circular xref chain"));
            }
            let xref = XRef::parse(&mut self.buffer, offset)
                .context(|| format!("xref at offset {}", offset))?;
            if let Some(found) = visit(&mut self.buffer, &xref)? {
                return Ok(Some(found));
            }
            // Pushed in reverse visiting order. A hybrid stream carries the
            // same /Prev as the table it supplements (so stream-only readers
            // can walk back); the classic trailer drives the walk here, and
            // the stream's copy is ignored.
            if !via_hybrid {
                if let Some(prev) = xref.prev()? {
                    pending.push((prev, false));
                }
            }
            if let Some(hybrid) = xref.hybrid_stream()? {
                pending.push((hybrid, true));
            }
        }
        Ok(None)
    }

    /// Materialize the whole chain, newest first.
    pub fn xref_chain(&mut self) -> Result<Vec<XRef>> {
        let mut chain = Vec::new();
        self.walk_chain(|_, xref| {
            chain.push(xref.clone());
            Ok(None::<()>)
        })?;
        Ok(chain)
    }

    /// The effective xref entry for an object number: the first entry found
    /// walking newest to oldest. `None` means no xref covers the number,
    /// which callers treat as free.
    pub fn lookup_entry(&mut self, number: u32) -> Result<Option<XRefEntry>> {
        self.walk_chain(|buf, xref| xref.lookup(buf, number))
            .context(|| format!("xref entry for object {}", number))
    }

    /// Load the object a reference points at. Free or absent entries
    /// resolve to `Null`; a generation mismatch is corruption.
    pub fn lookup_object(&mut self, reference: ObjectRef) -> Result<Object> {
        let entry = self.lookup_entry(reference.number)?;
        match entry {
            None | Some(XRefEntry::Free { .. }) => Ok(Object::Null),
            Some(XRefEntry::InUse { offset, generation }) => {
                if generation != reference.generation {
                    return Err(Error::corrupted(format!(
                        "generation mismatch for object {}: entry has {}, reference wants {}",
                        reference.number, generation, reference.generation
                    )))
                    .context(|| format!("object {}", reference));
                }
                self.load_at(offset, reference)
                    .context(|| format!("object {}", reference))
            }
            Some(XRefEntry::Compressed { container, index }) => self
                .load_compressed(reference, container, index)
                .context(|| format!("object {} in container {}", reference, container)),
        }
    }

    /// Resolve a top-level reference by one lookup; all other objects pass
    /// through unchanged. Not recursive into compound values.
    pub fn deref(&mut self, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(r) => self.lookup_object(*r),
            other => Ok(other.clone()),
        }
    }

    /// Parse the indirect object at a byte offset and check its header
    /// against the requesting reference.
    fn load_at(&mut self, offset: u64, expected: ObjectRef) -> Result<Object> {
        self.buffer.seek(offset)?;
        let indirect = Parser::new(&mut self.buffer).parse_indirect_object()?;
        if indirect.reference != expected {
            return Err(Error::corrupted(format!(
                "object header at offset {} is {}, expected {}",
                offset, indirect.reference, expected
            )));
        }
        let mut object = indirect.object;

        // Strings decrypt on read; the Encrypt dictionary itself is stored
        // in the clear.
        if self.encrypt_ref != Some(expected) {
            if let Some(handler) = &self.encryption {
                if handler.is_authenticated() {
                    decrypt_strings(handler, &mut object, expected)?;
                }
            }
        }
        Ok(object)
    }

    /// Load a member of an object stream. The container is decrypted as a
    /// stream; members are never decrypted again.
    fn load_compressed(&mut self, reference: ObjectRef, container: u32, index: u32) -> Result<Object> {
        let entry = self.lookup_entry(container)?;
        let Some(XRefEntry::InUse { offset, generation }) = entry else {
            return Err(Error::corrupted(format!(
                "container {} is not an in-use object",
                container
            )));
        };

        self.buffer.seek(offset)?;
        let indirect = Parser::new(&mut self.buffer).parse_indirect_object()?;
        let container_ref = ObjectRef::new(container, generation);
        if indirect.reference != container_ref {
            return Err(Error::corrupted(format!(
                "container header at offset {} is {}, expected {}",
                offset, indirect.reference, container_ref
            )));
        }
        let Object::Stream(stream) = indirect.object else {
            return Err(Error::corrupted(format!(
                "container {} is not a stream",
                container
            )));
        };

        let data = self
            .stream_content(container_ref, &stream)?
            .read_to_vec()?;
        let object_stream = ObjectStream::new(&stream.dict, data)?;
        let (number, object) = object_stream.get(index)?;
        if number != reference.number {
            return Err(Error::corrupted(format!(
                "container member {} is object {}, expected {}",
                index, number, reference.number
            )));
        }
        Ok(object)
    }

    /// A lazily-consumed byte source over a stream's decoded content.
    ///
    /// Resolves `Length` (possibly indirect), applies the per-object
    /// decryptor when encryption is active and the stream is not exempt,
    /// and stacks the filter pipeline on top.
    pub fn stream_content(
        &mut self,
        reference: ObjectRef,
        stream: &Stream,
    ) -> Result<StreamContent<'_>> {
        let length = self
            .stream_length(&stream.dict)
            .context(|| format!("length of stream {}", reference))?;

        // Filter and DecodeParms may themselves be indirect
        let mut dict = stream.dict.clone();
        for key in ["Filter", "DecodeParms"] {
            if let Some(Object::Reference(r)) = dict.get(key) {
                let resolved = self.lookup_object(*r)?;
                dict.insert(key, resolved);
            }
        }
        let chain = DecodeChain::from_stream_dict(&dict)
            .context(|| format!("filters of stream {}", reference))?;

        let decryptor = match &self.encryption {
            Some(handler) if !handler.stream_exempt(&stream.dict, chain.identity_crypt) => {
                if !handler.is_authenticated() {
                    return Err(Error::AuthFailure);
                }
                match handler.stream_method() {
                    CryptMethod::Identity => None,
                    CryptMethod::Rc4 => handler.stream_rc4(reference)?.map(Decryptor::Rc4),
                    CryptMethod::AesV2 => {
                        Some(Decryptor::Aes(handler.object_key(reference, true)?))
                    }
                }
            }
            _ => None,
        };

        StreamContent::build(&mut self.buffer, stream.start, length, &chain, decryptor)
    }

    /// `Length` resolved to a byte count before any payload bounds apply.
    fn stream_length(&mut self, dict: &Dict) -> Result<u64> {
        let value = match dict.get("Length") {
            None => return Err(Error::corrupted("stream dictionary missing /Length")),
            Some(Object::Reference(r)) => {
                let r = *r;
                self.lookup_object(r)?
            }
            Some(direct) => direct.clone(),
        };
        value
            .as_integer()
            .filter(|&v| v >= 0)
            .map(|v| v as u64)
            .ok_or_else(|| Error::corrupted("stream /Length is not a non-negative integer"))
    }

    /// Parse the `Encrypt` entry of the trailer, if any, and try the empty
    /// user password.
    fn init_encryption(&mut self) -> Result<()> {
        let Some(encrypt_obj) = self.trailer.get("Encrypt").cloned() else {
            return Ok(());
        };
        self.encrypt_ref = encrypt_obj.as_reference();
        let resolved = self.deref(&encrypt_obj).context(|| "Encrypt dictionary".to_string())?;
        let Some(encrypt_dict) = resolved.as_dict() else {
            return Err(Error::corrupted("Encrypt entry is not a dictionary"));
        };

        let file_id = match self.trailer.get("ID").and_then(|o| o.as_array()) {
            Some(id) => id
                .first()
                .and_then(|o| o.as_string())
                .map(|s| s.to_vec())
                .unwrap_or_default(),
            None => {
                log::warn!("encrypted document without /ID; deriving keys from an empty ID");
                Vec::new()
            }
        };

        let mut handler = EncryptionHandler::new(encrypt_dict, file_id)?;
        if handler.authenticate(b"") {
            log::debug!("empty user password accepted");
        }
        self.encryption = Some(handler);
        Ok(())
    }
}

/// Decrypt every string in the object tree with the object's key. Names,
/// numbers and dictionary keys are never encrypted.
fn decrypt_strings(
    handler: &EncryptionHandler,
    object: &mut Object,
    owner: ObjectRef,
) -> Result<()> {
    match object {
        Object::String(bytes) => {
            *bytes = handler.decrypt_string(bytes, owner)?;
        }
        Object::Array(items) => {
            for item in items {
                decrypt_strings(handler, item, owner)?;
            }
        }
        Object::Dictionary(dict) => decrypt_dict_strings(handler, dict, owner)?,
        Object::Stream(stream) => decrypt_dict_strings(handler, &mut stream.dict, owner)?,
        _ => {}
    }
    Ok(())
}

fn decrypt_dict_strings(
    handler: &EncryptionHandler,
    dict: &mut Dict,
    owner: ObjectRef,
) -> Result<()> {
    for value in dict.values_mut() {
        decrypt_strings(handler, value, owner)?;
    }
    Ok(())
}

/// `%PDF-x.y` on one of the first lines; a bounded prefix of junk before it
/// is tolerated.
fn parse_header<R: Read + Seek>(buf: &mut Buffer<R>) -> Result<(u8, u8)> {
    buf.seek(0)?;
    let window = buf.len().min(1024) as usize;
    let mut head = vec![0u8; window];
    buf.read_exact(&mut head)?;

    let marker = head
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::corrupted("missing %PDF- header"))?;
    let rest = &head[marker + 5..];

    let mut parts = rest.splitn(2, |&b| b == b'.');
    let major = digits(parts.next().unwrap_or_default());
    let minor = digits(parts.next().unwrap_or_default());
    match (major, minor) {
        (Some(major), Some(minor)) => Ok((major, minor)),
        _ => Err(Error::corrupted("malformed header version")),
    }
}

fn digits(bytes: &[u8]) -> Option<u8> {
    let end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    if end == 0 || end > 3 {
        return None;
    }
    std::str::from_utf8(&bytes[..end]).ok()?.parse().ok()
}

/// Backward-scan the file tail for `startxref <offset> %%EOF`, tolerating
/// trailing whitespace and comments after the `%%EOF` marker.
fn find_startxref<R: Read + Seek>(buf: &mut Buffer<R>) -> Result<u64> {
    let (_, tail) = buf.read_tail(STARTXREF_WINDOW)?;
    let keyword = b"startxref";
    let at = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::corrupted("startxref not found near end of file"))?;

    let mut rest = &tail[at + keyword.len()..];
    rest = skip_ws(rest);

    let digit_end = rest
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if digit_end == 0 {
        return Err(Error::corrupted("startxref is not followed by an offset"));
    }
    let offset: u64 = std::str::from_utf8(&rest[..digit_end])
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| Error::corrupted("startxref offset out of range"))?;

    let after = skip_ws(&rest[digit_end..]);
    if !after.starts_with(b"%%EOF") {
        return Err(Error::corrupted("missing %%EOF after startxref offset"));
    }
    Ok(offset)
}

fn skip_ws(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
