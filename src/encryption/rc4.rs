//! RC4 stream cipher.
//!
//! RC4 is the cipher of the Standard Security Handler at V=1/V=2 and of V=4
//! `V2` crypt filters. There is no maintained RC4 crate in the ecosystem, so
//! the cipher is carried in-tree; it is a dozen lines of state machine.

/// RC4 keystream state.
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Initialize with a key (5-16 bytes for PDF).
    pub fn new(key: &[u8]) -> Self {
        debug_assert!(!key.is_empty());
        let mut s = [0u8; 256];
        for (i, slot) in s.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        Rc4 { s, i: 0, j: 0 }
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }

    /// XOR the keystream over `data` in place. Encryption and decryption are
    /// the same operation.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.next_byte();
        }
    }
}

/// One-shot RC4 over a buffer.
pub fn rc4_crypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut cipher = Rc4::new(key);
    let mut result = data.to_vec();
    cipher.apply_keystream(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc4_symmetric() {
        let key = b"testkey";
        let plaintext = b"Hello, World!";
        let ciphertext = rc4_crypt(key, plaintext);
        assert_ne!(plaintext, &ciphertext[..]);
        assert_eq!(plaintext, &rc4_crypt(key, &ciphertext)[..]);
    }

    #[test]
    fn test_rc4_known_vector() {
        // RFC 6229-style test vector: key "Key", plaintext "Plaintext"
        let ciphertext = rc4_crypt(b"Key", b"Plaintext");
        assert_eq!(ciphertext, [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
    }

    #[test]
    fn test_rc4_empty() {
        assert!(rc4_crypt(b"testkey", b"").is_empty());
    }

    #[test]
    fn test_rc4_different_keys_differ() {
        let plaintext = b"Secret message";
        assert_ne!(rc4_crypt(b"key1", plaintext), rc4_crypt(b"key2", plaintext));
    }

    #[test]
    fn test_rc4_streaming_matches_one_shot() {
        let key = b"streamkey";
        let data = b"chunked encryption must match one-shot";
        let whole = rc4_crypt(key, data);

        let mut cipher = Rc4::new(key);
        let mut chunked = data.to_vec();
        for chunk in chunked.chunks_mut(7) {
            cipher.apply_keystream(chunk);
        }
        assert_eq!(whole, chunked);
    }
}
