//! Per-document encryption state.
//!
//! The handler is built once at document open from the `Encrypt` dictionary
//! and the first element of the file's `ID` array, and never changes
//! afterwards; password attempts only set the derived key.

use super::{aes, algorithms, rc4, CryptMethod, EncryptDict, Permissions};
use crate::error::{Error, Result};
use crate::object::{Dict, ObjectRef};
use md5::{Digest, Md5};

/// Encryption state of one document.
#[derive(Debug, Clone)]
pub struct EncryptionHandler {
    dict: EncryptDict,
    file_id: Vec<u8>,
    key: Option<Vec<u8>>,
}

impl EncryptionHandler {
    /// Parse the `Encrypt` dictionary and remember the file ID. No password
    /// is tried yet.
    pub fn new(encrypt: &Dict, file_id: Vec<u8>) -> Result<Self> {
        let dict = EncryptDict::from_dict(encrypt)?;
        log::info!(
            "document encrypted with V={} R={} ({} bit key)",
            dict.version,
            dict.revision,
            dict.key_length * 8
        );
        Ok(Self {
            dict,
            file_id,
            key: None,
        })
    }

    /// Try a user password. On success the file key is derived and kept;
    /// on failure previous state is untouched.
    pub fn authenticate(&mut self, password: &[u8]) -> bool {
        match algorithms::verify_user_password(
            password,
            &self.dict.user_hash,
            &self.dict.owner_hash,
            self.dict.permissions,
            &self.file_id,
            self.dict.revision,
            self.dict.key_length,
            self.dict.encrypt_metadata,
        ) {
            Some(key) => {
                self.key = Some(key);
                true
            }
            None => false,
        }
    }

    /// Whether a password has verified.
    pub fn is_authenticated(&self) -> bool {
        self.key.is_some()
    }

    /// The user access permissions.
    pub fn permissions(&self) -> Permissions {
        Permissions::from_bits(self.dict.permissions)
    }

    /// Whether a stream with this dictionary skips decryption: an identity
    /// `Crypt` filter, an identity stream method, or the metadata stream of
    /// a document with `EncryptMetadata false`.
    pub fn stream_exempt(&self, dict: &Dict, identity_crypt_filter: bool) -> bool {
        if identity_crypt_filter || self.dict.stream_method == CryptMethod::Identity {
            return true;
        }
        if !self.dict.encrypt_metadata {
            if let Some(kind) = dict.get("Type").and_then(|o| o.as_name()) {
                if kind == "Metadata" {
                    return true;
                }
            }
        }
        false
    }

    /// Decrypt a string value of the given object.
    pub fn decrypt_string(&self, data: &[u8], owner: ObjectRef) -> Result<Vec<u8>> {
        self.apply(self.dict.string_method, data, owner, Direction::Decrypt, None)
    }

    /// Decrypt a raw stream payload of the given object.
    pub fn decrypt_stream(&self, data: &[u8], owner: ObjectRef) -> Result<Vec<u8>> {
        self.apply(self.dict.stream_method, data, owner, Direction::Decrypt, None)
    }

    /// Encrypt a string value. `iv` is used by AES only; RC4 ignores it.
    pub fn encrypt_string(&self, data: &[u8], owner: ObjectRef, iv: &[u8; 16]) -> Result<Vec<u8>> {
        self.apply(self.dict.string_method, data, owner, Direction::Encrypt, Some(iv))
    }

    /// Encrypt a stream payload. `iv` is used by AES only; RC4 ignores it.
    pub fn encrypt_stream(&self, data: &[u8], owner: ObjectRef, iv: &[u8; 16]) -> Result<Vec<u8>> {
        self.apply(self.dict.stream_method, data, owner, Direction::Encrypt, Some(iv))
    }

    /// The per-object crypt key (Algorithm 1): MD5 of the file key, the low
    /// three bytes of the object number, the low two bytes of the
    /// generation, and for AES the `sAlT` marker; truncated to
    /// `min(n + 5, 16)` bytes.
    pub fn object_key(&self, owner: ObjectRef, aes: bool) -> Result<Vec<u8>> {
        let key = self.key.as_ref().ok_or(Error::AuthFailure)?;
        let mut hasher = Md5::new();
        hasher.update(key);
        hasher.update(&owner.number.to_le_bytes()[..3]);
        hasher.update(&(owner.generation as u32).to_le_bytes()[..2]);
        if aes {
            hasher.update(b"sAlT");
        }
        let hash = hasher.finalize();
        let len = (key.len() + 5).min(16);
        Ok(hash[..len].to_vec())
    }

    /// The streaming cipher for a stream payload, when the stream method is
    /// RC4. AES payloads cannot be deciphered incrementally.
    pub(crate) fn stream_rc4(&self, owner: ObjectRef) -> Result<Option<rc4::Rc4>> {
        match self.dict.stream_method {
            CryptMethod::Rc4 => {
                let key = self.object_key(owner, false)?;
                Ok(Some(rc4::Rc4::new(&key)))
            }
            _ => Ok(None),
        }
    }

    /// The stream payload method.
    pub(crate) fn stream_method(&self) -> CryptMethod {
        self.dict.stream_method
    }

    fn apply(
        &self,
        method: CryptMethod,
        data: &[u8],
        owner: ObjectRef,
        direction: Direction,
        iv: Option<&[u8; 16]>,
    ) -> Result<Vec<u8>> {
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::Rc4 => {
                let key = self.object_key(owner, false)?;
                Ok(rc4::rc4_crypt(&key, data))
            }
            CryptMethod::AesV2 => {
                let key = self.object_key(owner, true)?;
                match direction {
                    Direction::Decrypt => aes::decrypt(&key, data),
                    Direction::Encrypt => {
                        let iv = iv.ok_or_else(|| {
                            Error::corrupted("AES encryption requires an IV")
                        })?;
                        aes::encrypt(&key, iv, data)
                    }
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}
