//! Radial profiles and the noise-weighted radial asymmetry measure.
//!
//! A star centered on a pixel is radially symmetric, so the variance of
//! pixel values within each annulus around that pixel is small; summing the
//! squared per-annulus variances, weighted by their expected noise, gives a
//! score that is minimized at the star center:
//!
//! ```text
//!   asymm = sum over rad of var(rad)^2 / weight(rad)
//!   weight(rad)   = pixNoise(rad) * sqrt(2(numPix(rad) - 1)) / numPix(rad)
//!   pixNoise(rad) = sqrt((readNoise/ccdGain)^2 + (meanVal(rad) - bias)/ccdGain)
//! ```

use crate::ccd::CcdInfo;
use crate::error::CentroidError;
use crate::image::{GuideImage, PixelMask};

/// Per-annulus pixel counts and value sums around a center pixel.
///
/// Bin `k` holds the unmasked, in-image pixels whose Euclidean distance from
/// the center rounds to `k`; pixels rounding past `rad` are excluded. The
/// center pixel itself is bin 0.
#[derive(Debug, Clone)]
pub struct RadialProfile {
    pub rad: i64,
    pub n_pix: Vec<u32>,
    pub sum: Vec<u64>,
}

impl RadialProfile {
    /// Mean pixel value of bin `k`, or None for an empty bin.
    pub fn mean(&self, k: usize) -> Option<f64> {
        if self.n_pix[k] > 0 {
            Some(self.sum[k] as f64 / self.n_pix[k] as f64)
        } else {
            None
        }
    }

    /// Total unmasked pixels over all bins.
    pub fn total_pix(&self) -> u32 {
        self.n_pix.iter().sum()
    }

    /// Total counts (ADU) over all bins.
    pub fn total_counts(&self) -> u64 {
        self.sum.iter().sum()
    }
}

/// Radial bin for the offset (di, dj), or None when it rounds past `rad`.
#[inline]
fn radial_bin(di: i64, dj: i64, rad: i64) -> Option<usize> {
    let k = (((di * di + dj * dj) as f64).sqrt()).round() as i64;
    if k <= rad {
        Some(k as usize)
    } else {
        None
    }
}

/// Accumulate the radial profile of a disc of integer radius `rad` around
/// the center pixel `ctr` = (i, j). Masked and out-of-image pixels are
/// excluded. The traversal order is fixed, so results are deterministic.
pub fn radial_profile(
    image: &GuideImage,
    mask: Option<&PixelMask>,
    ctr: (i64, i64),
    rad: i64,
) -> RadialProfile {
    let (ci, cj) = ctr;
    let nbins = rad as usize + 1;
    let mut n_pix = vec![0u32; nbins];
    let mut sum = vec![0u64; nbins];

    for di in -rad..=rad {
        for dj in -rad..=rad {
            let Some(k) = radial_bin(di, dj, rad) else {
                continue;
            };
            let Some(value) = image.get(ci + di, cj + dj) else {
                continue;
            };
            if mask.is_some_and(|m| m.is_masked(ci + di, cj + dj)) {
                continue;
            }
            n_pix[k] += 1;
            sum[k] += value as u64;
        }
    }

    RadialProfile { rad, n_pix, sum }
}

/// Expected per-pixel noise sigma (ADU) for an annulus with the given mean.
/// The shot-noise term is clipped to zero when the mean falls below the bias.
pub fn pixel_noise(mean: f64, ccd: &CcdInfo) -> f64 {
    let read_noise_adu = ccd.read_noise / ccd.ccd_gain;
    let shot = ((mean - ccd.bias) / ccd.ccd_gain).max(0.0);
    (read_noise_adu * read_noise_adu + shot).sqrt()
}

/// Expected sigma of the annulus variance estimate. Annuli with fewer than
/// two pixels have no variance estimate and get weight zero.
pub fn annulus_weight(mean: f64, n_pix: u32, ccd: &CcdInfo) -> f64 {
    if n_pix < 2 {
        return 0.0;
    }
    pixel_noise(mean, ccd) * (2.0 * (n_pix - 1) as f64).sqrt() / n_pix as f64
}

/// Radial asymmetry of a candidate center, with totals over the disc.
#[derive(Debug, Clone, Copy)]
pub struct RadAsymm {
    /// Noise-weighted sum of squared per-annulus variances
    pub asymm: f64,
    /// Total counts (ADU) over unmasked pixels in the disc
    pub counts: u64,
    /// Number of unmasked pixels in the disc
    pub n_pix: u32,
}

/// Noise-weighted radial asymmetry of the disc around `ctr`.
///
/// Fails with `NoData` when no annulus has positive weight (all pixels
/// masked or out of the image, or no annulus kept two pixels).
pub fn rad_asymm_weighted(
    image: &GuideImage,
    mask: Option<&PixelMask>,
    ctr: (i64, i64),
    rad: i64,
    ccd: &CcdInfo,
) -> Result<RadAsymm, CentroidError> {
    let profile = radial_profile(image, mask, ctr, rad);
    let nbins = profile.n_pix.len();

    let mut means = vec![0.0f64; nbins];
    let mut weights = vec![0.0f64; nbins];
    let mut usable = false;
    for k in 0..nbins {
        if let Some(mean) = profile.mean(k) {
            means[k] = mean;
            weights[k] = annulus_weight(mean, profile.n_pix[k], ccd);
            usable = usable || weights[k] > 0.0;
        }
    }
    if !usable {
        return Err(CentroidError::NoData);
    }

    let var_sum = residual_sums(image, mask, ctr, rad, &profile, &means);

    let mut asymm = 0.0;
    for k in 0..nbins {
        if weights[k] > 0.0 {
            let var = var_sum[k] / profile.n_pix[k] as f64;
            asymm += var * var / weights[k];
        }
    }

    Ok(RadAsymm {
        asymm,
        counts: profile.total_counts(),
        n_pix: profile.total_pix(),
    })
}

/// Radial asymmetry without noise weighting: the plain sum of squared
/// per-annulus variances. The error estimate downstream assumes the
/// weighted form, so this is not used by the centroider itself.
pub fn rad_asymm(
    image: &GuideImage,
    mask: Option<&PixelMask>,
    ctr: (i64, i64),
    rad: i64,
) -> Result<RadAsymm, CentroidError> {
    let profile = radial_profile(image, mask, ctr, rad);
    let nbins = profile.n_pix.len();

    let mut means = vec![0.0f64; nbins];
    let mut usable = false;
    for k in 0..nbins {
        if let Some(mean) = profile.mean(k) {
            means[k] = mean;
            usable = usable || profile.n_pix[k] >= 2;
        }
    }
    if !usable {
        return Err(CentroidError::NoData);
    }

    let var_sum = residual_sums(image, mask, ctr, rad, &profile, &means);

    let mut asymm = 0.0;
    for k in 0..nbins {
        if profile.n_pix[k] >= 2 {
            let var = var_sum[k] / profile.n_pix[k] as f64;
            asymm += var * var;
        }
    }

    Ok(RadAsymm {
        asymm,
        counts: profile.total_counts(),
        n_pix: profile.total_pix(),
    })
}

/// Second pass over the disc: per-annulus sums of squared residuals against
/// the annulus mean. Annuli with fewer than two pixels are skipped.
fn residual_sums(
    image: &GuideImage,
    mask: Option<&PixelMask>,
    ctr: (i64, i64),
    rad: i64,
    profile: &RadialProfile,
    means: &[f64],
) -> Vec<f64> {
    let (ci, cj) = ctr;
    let mut var_sum = vec![0.0f64; profile.n_pix.len()];

    for di in -rad..=rad {
        for dj in -rad..=rad {
            let Some(k) = radial_bin(di, dj, rad) else {
                continue;
            };
            if profile.n_pix[k] < 2 {
                continue;
            }
            let Some(value) = image.get(ci + di, cj + dj) else {
                continue;
            };
            if mask.is_some_and(|m| m.is_masked(ci + di, cj + dj)) {
                continue;
            }
            let resid = value as f64 - means[k];
            var_sum[k] += resid * resid;
        }
    }

    var_sum
}
