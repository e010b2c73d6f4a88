//! AES-128-CBC for V=4 `AESV2` crypt filters.
//!
//! Encrypted payloads carry their 16-byte IV as a prefix and use PKCS#7
//! padding (ISO 32000-1, 7.6.2).

use crate::error::{Error, Result};
use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Encrypt with AES-128-CBC. The result is the IV followed by the
/// PKCS#7-padded ciphertext.
pub fn encrypt(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if key.len() != 16 {
        return Err(Error::corrupted("AES-128 key must be 16 bytes"));
    }

    let padding_len = 16 - (data.len() % 16);
    let mut buffer = Vec::with_capacity(16 + data.len() + padding_len);
    buffer.extend_from_slice(iv);
    buffer.extend_from_slice(data);
    buffer.extend(std::iter::repeat(padding_len as u8).take(padding_len));

    let len = buffer.len() - 16;
    let cipher = Aes128CbcEnc::new(key.into(), iv.into());
    cipher
        .encrypt_padded_mut::<NoPadding>(&mut buffer[16..], len)
        .map_err(|_| Error::corrupted("AES encryption failed"))?;
    Ok(buffer)
}

/// Decrypt an IV-prefixed AES-128-CBC payload and strip the PKCS#7 padding.
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if key.len() != 16 {
        return Err(Error::corrupted("AES-128 key must be 16 bytes"));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() < 32 || (data.len() - 16) % 16 != 0 {
        return Err(Error::corrupted(format!(
            "AES payload length {} is not IV plus whole blocks",
            data.len()
        )));
    }

    let (iv, ciphertext) = data.split_at(16);
    let mut buffer = ciphertext.to_vec();
    let cipher = Aes128CbcDec::new(key.into(), iv.into());
    cipher
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| Error::corrupted("AES decryption failed"))?;

    let padding_len = *buffer.last().unwrap_or(&0) as usize;
    if padding_len == 0 || padding_len > 16 || padding_len > buffer.len() {
        return Err(Error::corrupted("invalid PKCS#7 padding"));
    }
    let data_len = buffer.len() - padding_len;
    if buffer[data_len..].iter().any(|&b| b != padding_len as u8) {
        return Err(Error::corrupted("invalid PKCS#7 padding"));
    }
    buffer.truncate(data_len);
    Ok(buffer)
}
