//! Standard Security Handler (ISO 32000-1, 7.6).
//!
//! Supported revisions:
//! - V=1 R=2 — 40-bit RC4
//! - V=2 R=3 — RC4 with the key width taken from `Length`
//! - V=4 R=4 — crypt filters selecting `V2` (RC4) or `AESV2` (AES-128-CBC)
//!
//! Encryption applies to strings and stream payloads only; names, numbers
//! and dictionary keys are never encrypted. The xref machinery runs below
//! the handler, so the `Encrypt` dictionary itself and the xref stream stay
//! readable without a key.

use crate::error::{Error, Result};
use crate::object::{Dict, Object};

mod aes;
mod algorithms;
mod handler;
mod rc4;

pub use algorithms::{compute_file_key, compute_owner_hash, compute_user_check};
pub use handler::EncryptionHandler;
pub(crate) use aes::{decrypt as aes_decrypt, encrypt as aes_encrypt};
pub(crate) use rc4::{rc4_crypt, Rc4};

/// How strings or streams of a document are encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    /// No transformation
    Identity,
    /// RC4 with the per-object key
    Rc4,
    /// AES-128-CBC with an IV-prefixed payload (`AESV2`)
    AesV2,
}

/// Parsed `Encrypt` dictionary of the Standard Security Handler.
#[derive(Debug, Clone)]
pub struct EncryptDict {
    /// Algorithm version (V)
    pub version: u32,
    /// Revision number (R)
    pub revision: u32,
    /// Key length in bytes
    pub key_length: usize,
    /// Owner password hash (O)
    pub owner_hash: Vec<u8>,
    /// User password hash (U)
    pub user_hash: Vec<u8>,
    /// User access permissions (P)
    pub permissions: i32,
    /// Whether the metadata stream is encrypted
    pub encrypt_metadata: bool,
    /// Method applied to stream payloads
    pub stream_method: CryptMethod,
    /// Method applied to strings
    pub string_method: CryptMethod,
}

impl EncryptDict {
    /// Parse an `Encrypt` dictionary. Anything but the Standard handler at
    /// revisions 2-4 is [`Error::Unsupported`].
    pub fn from_dict(dict: &Dict) -> Result<Self> {
        let filter = dict
            .get("Filter")
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::corrupted("Encrypt dictionary missing /Filter"))?;
        if filter != "Standard" {
            return Err(Error::Unsupported(format!(
                "security handler {}",
                filter.to_string_lossy()
            )));
        }

        let int = |key: &str| -> Result<i64> {
            dict.get(key)
                .and_then(|o| o.as_integer())
                .ok_or_else(|| Error::corrupted(format!("Encrypt dictionary missing /{}", key)))
        };
        let version = int("V")? as u32;
        let revision = int("R")? as u32;
        let permissions = int("P")? as i32;

        let bytes = |key: &str| -> Result<Vec<u8>> {
            dict.get(key)
                .and_then(|o| o.as_string())
                .map(|s| s.to_vec())
                .ok_or_else(|| Error::corrupted(format!("Encrypt dictionary missing /{}", key)))
        };
        let owner_hash = bytes("O")?;
        let user_hash = bytes("U")?;

        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(|o| o.as_bool())
            .unwrap_or(true);

        let key_length = match dict.get("Length").and_then(|o| o.as_integer()) {
            Some(bits) if bits % 8 == 0 && (40..=128).contains(&bits) => (bits / 8) as usize,
            Some(bits) => {
                return Err(Error::corrupted(format!("invalid key length {} bits", bits)))
            }
            None => match version {
                1 | 2 => 5,
                _ => 16,
            },
        };

        let (stream_method, string_method) = match (version, revision) {
            (1, 2) | (2, 3) => (CryptMethod::Rc4, CryptMethod::Rc4),
            (4, 4) => {
                let stream_method = crypt_filter_method(dict, "StmF")?;
                let string_method = crypt_filter_method(dict, "StrF")?;
                (stream_method, string_method)
            }
            (v, r) => {
                return Err(Error::Unsupported(format!("encryption V={} R={}", v, r)));
            }
        };

        Ok(EncryptDict {
            version,
            revision,
            key_length,
            owner_hash,
            user_hash,
            permissions,
            encrypt_metadata,
            stream_method,
            string_method,
        })
    }
}

/// Resolve a V=4 crypt filter selector (`StmF` or `StrF`) through the `CF`
/// dictionary to a concrete method.
fn crypt_filter_method(dict: &Dict, selector: &str) -> Result<CryptMethod> {
    let name = match dict.get(selector).and_then(|o| o.as_name()) {
        // An absent selector means the identity filter
        None => return Ok(CryptMethod::Identity),
        Some(name) if name == "Identity" => return Ok(CryptMethod::Identity),
        Some(name) => name,
    };

    let cfm = dict
        .get("CF")
        .and_then(|o| o.as_dict())
        .and_then(|cf| cf.get(&name.to_string_lossy()))
        .and_then(|o| o.as_dict())
        .and_then(|f| f.get("CFM"))
        .and_then(|o| o.as_name())
        .ok_or_else(|| {
            Error::corrupted(format!("crypt filter {} not defined in /CF", name))
        })?;

    match cfm.as_bytes() {
        b"V2" => Ok(CryptMethod::Rc4),
        b"AESV2" => Ok(CryptMethod::AesV2),
        b"None" => Ok(CryptMethod::Identity),
        other => Err(Error::Unsupported(format!(
            "crypt filter method {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// User access permissions, decoded from the `P` field
/// (ISO 32000-1, Table 22).
#[derive(Debug, Clone, Copy)]
pub struct Permissions {
    bits: i32,
}

impl Permissions {
    /// Wrap a raw `P` value.
    pub fn from_bits(bits: i32) -> Self {
        Self { bits }
    }

    /// The raw `P` value.
    pub fn bits(&self) -> i32 {
        self.bits
    }

    /// Printing allowed.
    pub fn can_print(&self) -> bool {
        self.bits & (1 << 2) != 0
    }

    /// Modifying the document allowed.
    pub fn can_modify(&self) -> bool {
        self.bits & (1 << 3) != 0
    }

    /// Copying text and graphics allowed.
    pub fn can_copy(&self) -> bool {
        self.bits & (1 << 4) != 0
    }

    /// Adding or modifying annotations allowed.
    pub fn can_annotate(&self) -> bool {
        self.bits & (1 << 5) != 0
    }
}

/// Build a minimal `Encrypt` dictionary object for writer clients.
///
/// `O` and `U` must already be computed with [`compute_owner_hash`] and
/// [`compute_user_check`].
pub fn encrypt_dict_object(
    version: u32,
    revision: u32,
    key_length_bits: u32,
    owner_hash: &[u8],
    user_hash: &[u8],
    permissions: i32,
) -> Object {
    let mut dict = Dict::new();
    dict.insert("Filter", Object::name("Standard"));
    dict.insert("V", Object::Integer(version as i64));
    dict.insert("R", Object::Integer(revision as i64));
    dict.insert("Length", Object::Integer(key_length_bits as i64));
    dict.insert("O", Object::string(owner_hash.to_vec()));
    dict.insert("U", Object::string(user_hash.to_vec()));
    dict.insert("P", Object::Integer(permissions as i64));
    if version == 4 {
        let std_cf = Dict::from_pairs([
            ("CFM", Object::name("AESV2")),
            ("AuthEvent", Object::name("DocOpen")),
            ("Length", Object::Integer(16)),
        ]);
        dict.insert(
            "CF",
            Object::Dictionary(Dict::from_pairs([("StdCF", Object::Dictionary(std_cf))])),
        );
        dict.insert("StmF", Object::name("StdCF"));
        dict.insert("StrF", Object::name("StdCF"));
    }
    Object::Dictionary(dict)
}
