//! Key derivation and password verification for the Standard Security
//! Handler (ISO 32000-1, 7.6.3), revisions 2-4.

use super::rc4::rc4_crypt;
use md5::{Digest, Md5};

/// The 32-byte padding string of Algorithm 2.
pub(crate) const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// Pad or truncate a password to exactly 32 bytes (Algorithm 2, step a).
pub(crate) fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Compute the file encryption key from a password (Algorithm 2).
pub fn compute_file_key(
    password: &[u8],
    owner_hash: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(owner_hash);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut hash = hasher.finalize().to_vec();

    // R >= 3: 50 more MD5 rounds over the truncated key
    if revision >= 3 {
        for _ in 0..50 {
            let mut hasher = Md5::new();
            hasher.update(&hash[..key_length]);
            hash = hasher.finalize().to_vec();
        }
    }

    hash.truncate(key_length);
    hash
}

/// Compute the `O` entry from the owner password (Algorithm 3).
///
/// Needed by writer clients and by the encrypted test fixtures.
pub fn compute_owner_hash(
    owner_password: &[u8],
    user_password: &[u8],
    revision: u32,
    key_length: usize,
) -> Vec<u8> {
    // An absent owner password defaults to the user password
    let source = if owner_password.is_empty() {
        user_password
    } else {
        owner_password
    };

    let mut hash = Md5::digest(pad_password(source)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    let key = &hash[..key_length];

    let mut out = rc4_crypt(key, &pad_password(user_password));
    if revision >= 3 {
        for round in 1..=19u8 {
            let round_key: Vec<u8> = key.iter().map(|&b| b ^ round).collect();
            out = rc4_crypt(&round_key, &out);
        }
    }
    out
}

/// Compute the expected `U` entry for a file key (Algorithms 4 and 5).
pub fn compute_user_check(key: &[u8], file_id: &[u8], revision: u32) -> Vec<u8> {
    if revision == 2 {
        // Algorithm 4: RC4 of the padding string
        return rc4_crypt(key, &PADDING);
    }

    // Algorithm 5: MD5 of padding plus file ID, one RC4 pass, then 19
    // rounds with counter-XORed keys
    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();

    hash = rc4_crypt(key, &hash);
    for round in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|&b| b ^ round).collect();
        hash = rc4_crypt(&round_key, &hash);
    }

    // Pad to the 32-byte entry size with arbitrary bytes
    hash.extend_from_slice(&[0u8; 16]);
    hash
}

/// Verify a user password (Algorithms 4/5/6 check side). Returns the file
/// key on success.
#[allow(clippy::too_many_arguments)]
pub fn verify_user_password(
    password: &[u8],
    user_hash: &[u8],
    owner_hash: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Option<Vec<u8>> {
    let key = compute_file_key(
        password,
        owner_hash,
        permissions,
        file_id,
        revision,
        key_length,
        encrypt_metadata,
    );
    let expected = compute_user_check(&key, file_id, revision);

    // R >= 3 only defines the first 16 bytes of U
    let compare_len = if revision >= 3 { 16 } else { 32 };
    if user_hash.len() < compare_len {
        return None;
    }
    if constant_time_compare(&user_hash[..compare_len], &expected[..compare_len]) {
        Some(key)
    } else {
        None
    }
}

/// Constant-time comparison, so password checks do not leak a prefix length.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_password() {
        let padded = pad_password(b"test");
        assert_eq!(&padded[..4], b"test");
        assert_eq!(&padded[4..], &PADDING[..28]);

        let long = pad_password(b"this password is much longer than thirty-two bytes");
        assert_eq!(&long[..], &b"this password is much longer tha"[..]);
    }

    #[test]
    fn test_file_key_length() {
        for (revision, key_length) in [(2u32, 5usize), (3, 16), (4, 16)] {
            let key = compute_file_key(b"user", &[0u8; 32], -1, b"id", revision, key_length, true);
            assert_eq!(key.len(), key_length);
        }
    }

    #[test]
    fn test_key_depends_on_metadata_flag_only_for_r4() {
        let with = compute_file_key(b"", &[0u8; 32], -1, b"id", 4, 16, true);
        let without = compute_file_key(b"", &[0u8; 32], -1, b"id", 4, 16, false);
        assert_ne!(with, without);

        let with = compute_file_key(b"", &[0u8; 32], -1, b"id", 3, 16, true);
        let without = compute_file_key(b"", &[0u8; 32], -1, b"id", 3, 16, false);
        assert_eq!(with, without);
    }

    #[test]
    fn test_verify_round_trip_r2() {
        let owner = compute_owner_hash(b"owner", b"user", 2, 5);
        let key = compute_file_key(b"user", &owner, -1, b"fileid", 2, 5, true);
        let user = compute_user_check(&key, b"fileid", 2);

        let verified =
            verify_user_password(b"user", &user, &owner, -1, b"fileid", 2, 5, true).unwrap();
        assert_eq!(verified, key);

        assert!(verify_user_password(b"wrong", &user, &owner, -1, b"fileid", 2, 5, true).is_none());
    }

    #[test]
    fn test_verify_round_trip_r3() {
        let owner = compute_owner_hash(b"", b"", 3, 16);
        let key = compute_file_key(b"", &owner, -4, b"another-id", 3, 16, true);
        let user = compute_user_check(&key, b"another-id", 3);

        assert!(verify_user_password(b"", &user, &owner, -4, b"another-id", 3, 16, true).is_some());
        assert!(
            verify_user_password(b"nope", &user, &owner, -4, b"another-id", 3, 16, true).is_none()
        );
    }

    #[test]
    fn test_user_check_sizes() {
        let key = vec![1u8; 16];
        assert_eq!(compute_user_check(&key, b"id", 2).len(), 32);
        assert_eq!(compute_user_check(&key, b"id", 3).len(), 32);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"same bytes", b"same bytes"));
        assert!(!constant_time_compare(b"same bytes", b"Same bytes"));
        assert!(!constant_time_compare(b"short", b"longer"));
    }
}
