//! Predictor post-pass for FlateDecode.
//!
//! Predictors reverse the row-wise differencing applied by PNG/TIFF
//! encoders before compression. Supported values: 1 (none), 2 (TIFF),
//! 10-15 (the PNG family, where each row carries its own predictor tag).

use crate::error::{Error, Result};
use crate::object::Dict;

/// Predictor parameters, from a filter's `DecodeParms` dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl PredictorParams {
    /// Extract parameters from a `DecodeParms` dictionary, defaulting
    /// missing entries per ISO 32000-1, Table 8.
    pub fn from_parms(parms: Option<&Dict>) -> Self {
        let defaults = Self::default();
        let Some(dict) = parms else { return defaults };
        let int = |key: &str, default: i64| {
            dict.get(key).and_then(|o| o.as_integer()).unwrap_or(default)
        };
        Self {
            predictor: int("Predictor", defaults.predictor),
            columns: int("Columns", defaults.columns as i64).max(1) as usize,
            colors: int("Colors", defaults.colors as i64).max(1) as usize,
            bits_per_component: int("BitsPerComponent", defaults.bits_per_component as i64).max(1)
                as usize,
        }
    }

    /// Bytes of sample data per row, without the PNG predictor tag.
    fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Distance in bytes to the "left" sample for Sub/Average/Paeth.
    fn sample_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }

    /// Reverse the predictor on decoded filter output.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.predictor {
            1 => Ok(data.to_vec()),
            2 => self.decode_tiff(data),
            10..=15 => self.decode_png(data),
            other => Err(Error::Unsupported(format!("predictor {}", other))),
        }
    }

    /// TIFF predictor 2: each sample is the difference from its left
    /// neighbor in the same row.
    fn decode_tiff(&self, data: &[u8]) -> Result<Vec<u8>> {
        if self.bits_per_component != 8 {
            return Err(Error::Unsupported(format!(
                "TIFF predictor with {} bits per component",
                self.bits_per_component
            )));
        }
        let row_bytes = self.row_bytes();
        if row_bytes == 0 || data.len() % row_bytes != 0 {
            return Err(Error::corrupted(format!(
                "predictor data length {} is not a multiple of row size {}",
                data.len(),
                row_bytes
            )));
        }

        let colors = self.colors;
        let mut output = Vec::with_capacity(data.len());
        for row in data.chunks(row_bytes) {
            let row_start = output.len();
            for (i, &byte) in row.iter().enumerate() {
                let left = if i >= colors {
                    output[row_start + i - colors]
                } else {
                    0
                };
                output.push(byte.wrapping_add(left));
            }
        }
        Ok(output)
    }

    /// PNG predictors: every row is prefixed by a tag byte selecting
    /// None/Sub/Up/Average/Paeth for that row.
    fn decode_png(&self, data: &[u8]) -> Result<Vec<u8>> {
        let pixel_bytes = self.row_bytes();
        let row_bytes = pixel_bytes + 1;
        if data.len() % row_bytes != 0 {
            return Err(Error::corrupted(format!(
                "predictor data length {} is not a multiple of row size {}",
                data.len(),
                row_bytes
            )));
        }

        let bpp = self.sample_bytes();
        let row_count = data.len() / row_bytes;
        let mut output: Vec<u8> = Vec::with_capacity(row_count * pixel_bytes);

        for (row_idx, row) in data.chunks(row_bytes).enumerate() {
            let tag = row[0];
            let encoded = &row[1..];
            let row_start = row_idx * pixel_bytes;

            for (i, &byte) in encoded.iter().enumerate() {
                let left = || -> u8 {
                    if i >= bpp {
                        output[row_start + i - bpp]
                    } else {
                        0
                    }
                };
                let up = || -> u8 {
                    if row_idx > 0 {
                        output[row_start - pixel_bytes + i]
                    } else {
                        0
                    }
                };
                let up_left = || -> u8 {
                    if row_idx > 0 && i >= bpp {
                        output[row_start - pixel_bytes + i - bpp]
                    } else {
                        0
                    }
                };

                let value = match tag {
                    0 => byte,
                    1 => byte.wrapping_add(left()),
                    2 => byte.wrapping_add(up()),
                    3 => byte.wrapping_add((((left() as u16) + (up() as u16)) / 2) as u8),
                    4 => byte.wrapping_add(paeth(left(), up(), up_left())),
                    other => {
                        return Err(Error::corrupted(format!(
                            "invalid PNG predictor tag {}",
                            other
                        )))
                    }
                };
                output.push(value);
            }
        }
        Ok(output)
    }
}

/// Paeth predictor function from the PNG specification.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i16, b as i16, c as i16);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}
