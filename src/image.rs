use anyhow::{Context, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::CentroidError;
use crate::fits;

/// Basic per-frame statistics, used for star-finder thresholds and reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImageStatistics {
    pub width: usize,
    pub height: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// A guide-camera frame: 16-bit unsigned pixels, row-major, row 0 at the top.
///
/// The centroiding core only ever reads from this; (i, j) is (row, column).
pub struct GuideImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl GuideImage {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self, CentroidError> {
        if data.len() != width * height {
            return Err(CentroidError::BadInput(format!(
                "image data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(GuideImage {
            width,
            height,
            data,
        })
    }

    /// Load the primary HDU of a FITS file.
    ///
    /// The header parse leaves the reader at the data section, so header and
    /// pixels come out of a single pass over the file.
    pub fn from_fits(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let header = fits::read_primary_header(&mut reader)
            .with_context(|| format!("bad FITS header in {}", path.display()))?;
        let info = fits::image_info_from_header(&header)
            .ok_or_else(|| anyhow::anyhow!("no image information found in FITS file"))?;
        if info.bit_depth != 16 {
            return Err(anyhow::anyhow!(
                "unsupported BITPIX {} (only 16-bit images are handled)",
                info.bit_depth
            ));
        }

        // pixel data follows as 16-bit big-endian words
        let mut data = vec![0u16; info.width * info.height];
        reader
            .read_u16_into::<BigEndian>(&mut data)
            .with_context(|| format!("truncated FITS data in {}", path.display()))?;

        Ok(GuideImage {
            width: info.width,
            height: info.height,
            data,
        })
    }

    /// Pixel value at (row, column), or None outside the image.
    #[inline]
    pub fn get(&self, i: i64, j: i64) -> Option<u16> {
        if i < 0 || j < 0 || i as usize >= self.height || j as usize >= self.width {
            return None;
        }
        Some(self.data[i as usize * self.width + j as usize])
    }

    /// Calculate whole-frame statistics: moments, min, and max in one pass,
    /// the median from a sorted copy.
    pub fn statistics(&self) -> ImageStatistics {
        let n = self.data.len();
        if n == 0 {
            return ImageStatistics {
                width: self.width,
                height: self.height,
                mean: 0.0,
                median: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        let mut min = u16::MAX;
        let mut max = u16::MIN;
        for &value in &self.data {
            sum += value as u64;
            sum_sq += value as u64 * value as u64;
            min = min.min(value);
            max = max.max(value);
        }

        let mean = sum as f64 / n as f64;
        let variance = (sum_sq as f64 / n as f64 - mean * mean).max(0.0);

        let mut sorted = self.data.clone();
        sorted.sort_unstable();
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
        } else {
            sorted[n / 2] as f64
        };

        ImageStatistics {
            width: self.width,
            height: self.height,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: min as f64,
            max: max as f64,
        }
    }
}

/// A validity mask with the same shape as its image; true means "ignore".
pub struct PixelMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl PixelMask {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self, CentroidError> {
        if data.len() != width * height {
            return Err(CentroidError::BadInput(format!(
                "mask data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(PixelMask {
            width,
            height,
            data,
        })
    }

    /// Load a mask from a FITS image: nonzero pixels are masked.
    /// With `invert`, zero pixels are masked instead.
    pub fn from_fits(path: &Path, invert: bool) -> Result<Self> {
        let image = GuideImage::from_fits(path)?;
        let data = image
            .data
            .iter()
            .map(|&v| if invert { v == 0 } else { v != 0 })
            .collect();
        Ok(PixelMask {
            width: image.width,
            height: image.height,
            data,
        })
    }

    /// True when (i, j) is masked. Out-of-image indices report unmasked;
    /// the accumulator already excludes them as outside the frame.
    #[inline]
    pub fn is_masked(&self, i: i64, j: i64) -> bool {
        if i < 0 || j < 0 || i as usize >= self.height || j as usize >= self.width {
            return false;
        }
        self.data[i as usize * self.width + j as usize]
    }
}
