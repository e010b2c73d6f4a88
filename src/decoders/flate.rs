//! FlateDecode (zlib) implementation.
//!
//! The most common PDF stream filter. Raw zlib inflate via the `flate2`
//! crate; the predictor post-pass lives in [`super::predictor`].

use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Inflate a complete zlib stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::corrupted(format!("flate stream: {}", e)))?;
    Ok(output)
}
