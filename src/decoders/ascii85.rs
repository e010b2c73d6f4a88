//! ASCII85Decode implementation.
//!
//! Four bytes are represented as five characters in `!`..`u`; `z` is
//! shorthand for four zero bytes and `~>` terminates the data.

use crate::error::{Error, Result};

/// Decode a complete ASCII85 buffer.
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut acc: u32 = 0;
    let mut count = 0usize;

    for &byte in input {
        match byte {
            b'~' => break,
            b'z' => {
                if count != 0 {
                    return Err(Error::corrupted(
                        "ASCII85: 'z' inside a group",
                    ));
                }
                output.extend_from_slice(&[0, 0, 0, 0]);
            }
            b'!'..=b'u' => {
                acc = acc
                    .checked_mul(85)
                    .and_then(|v| v.checked_add((byte - b'!') as u32))
                    .ok_or_else(|| Error::corrupted("ASCII85: group overflow"))?;
                count += 1;
                if count == 5 {
                    output.extend_from_slice(&acc.to_be_bytes());
                    acc = 0;
                    count = 0;
                }
            }
            byte if byte.is_ascii_whitespace() => {}
            byte => {
                return Err(Error::corrupted(format!(
                    "ASCII85: invalid character 0x{:02x}",
                    byte
                )))
            }
        }
    }

    // A trailing partial group of n characters yields n-1 bytes
    if count > 0 {
        if count == 1 {
            return Err(Error::corrupted("ASCII85: single trailing character"));
        }
        for _ in count..5 {
            acc = acc
                .checked_mul(85)
                .and_then(|v| v.checked_add(84))
                .ok_or_else(|| Error::corrupted("ASCII85: group overflow"))?;
        }
        output.extend_from_slice(&acc.to_be_bytes()[..count - 1]);
    }

    Ok(output)
}
