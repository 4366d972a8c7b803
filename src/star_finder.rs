//! Threshold-based star finder that supplies centroid guesses.
//!
//! Pixels brighter than `median + thresh * stddev` are grouped into
//! connected components; each component's peak pixel seeds a centroid
//! measurement with a search radius scaled from the component size. The
//! centroiding core does the actual position measurement.

use crate::ccd::CcdInfo;
use crate::centroid::{centroid, CentroidResult, MIN_RAD};
use crate::coords::xy_pos_from_ij_pos;
use crate::image::{GuideImage, PixelMask};

/// Star finder tuning knobs.
#[derive(Debug, Clone)]
pub struct FindStarsParams {
    /// Detection threshold in standard deviations above the median
    pub thresh: f64,
    /// Multiplier applied to each blob's half-diagonal to get the search radius
    pub rad_mult: f64,
    /// Fixed search radius override; None derives it per blob
    pub rad: Option<f64>,
}

impl Default for FindStarsParams {
    fn default() -> Self {
        Self {
            thresh: 3.0,
            rad_mult: 1.0,
            rad: None,
        }
    }
}

/// A connected component of above-threshold pixels.
#[derive(Debug, Clone)]
struct Blob {
    /// Bounding box as (min_i, min_j, max_i, max_j), inclusive
    bbox: (i64, i64, i64, i64),
    /// Brightest pixel in the component
    peak: (i64, i64),
    peak_value: u16,
    area: usize,
}

impl Blob {
    fn half_diagonal(&self) -> f64 {
        let (min_i, min_j, max_i, max_j) = self.bbox;
        let h = (max_i - min_i + 1) as f64;
        let w = (max_j - min_j + 1) as f64;
        (h * h + w * w).sqrt() / 2.0
    }
}

/// Find and centroid star-like features across the whole frame.
///
/// Returns successful centroid measurements sorted by descending counts.
/// Components whose centroid fails are skipped. Measurements landing within
/// each other's search radius collapse to the brighter one.
pub fn find_stars(
    image: &GuideImage,
    mask: Option<&PixelMask>,
    params: &FindStarsParams,
    ccd: &CcdInfo,
) -> Vec<CentroidResult> {
    let threshold = detection_threshold(image, mask, params.thresh);
    let blobs = label_blobs(image, mask, threshold);
    tracing::debug!(threshold, n_blobs = blobs.len(), "thresholded frame");

    let mut stars: Vec<CentroidResult> = Vec::new();
    for blob in &blobs {
        // single-pixel blobs are treated as noise or cosmic-ray hits
        if blob.area < 2 {
            continue;
        }

        let rad = params
            .rad
            .unwrap_or(params.rad_mult * blob.half_diagonal())
            .max(MIN_RAD as f64);
        let xy_guess = xy_pos_from_ij_pos((blob.peak.0 as f64, blob.peak.1 as f64));

        match centroid(image, mask, xy_guess, rad, ccd) {
            Ok(result) => stars.push(result),
            Err(e) => {
                tracing::debug!(
                    peak_i = blob.peak.0,
                    peak_j = blob.peak.1,
                    peak_value = blob.peak_value,
                    %e,
                    "centroid failed for candidate"
                );
            }
        }
    }

    stars.sort_by(|a, b| b.counts.cmp(&a.counts));
    dedupe_stars(stars)
}

/// Detection threshold over unmasked pixels: median + thresh * stddev.
fn detection_threshold(image: &GuideImage, mask: Option<&PixelMask>, thresh: f64) -> f64 {
    let mut values: Vec<u16> = Vec::with_capacity(image.data.len());
    for i in 0..image.height as i64 {
        for j in 0..image.width as i64 {
            if mask.is_some_and(|m| m.is_masked(i, j)) {
                continue;
            }
            values.push(image.data[i as usize * image.width + j as usize]);
        }
    }
    if values.is_empty() {
        return f64::INFINITY;
    }

    values.sort_unstable();
    let median = if values.len() % 2 == 0 {
        let mid = values.len() / 2;
        (values[mid - 1] as f64 + values[mid] as f64) / 2.0
    } else {
        values[values.len() / 2] as f64
    };

    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    median + thresh * variance.sqrt()
}

/// Two-pass connected-component labeling (4-connectivity) of unmasked
/// pixels above the threshold.
fn label_blobs(image: &GuideImage, mask: Option<&PixelMask>, threshold: f64) -> Vec<Blob> {
    let width = image.width;
    let height = image.height;

    let mut labels = vec![0u32; width * height];
    let mut next_label = 1u32;
    let mut equivalences: Vec<(u32, u32)> = Vec::new();

    let above = |i: usize, j: usize| -> bool {
        let value = image.data[i * width + j] as f64;
        value > threshold && !mask.is_some_and(|m| m.is_masked(i as i64, j as i64))
    };

    // First pass - assign temporary labels
    for i in 0..height {
        for j in 0..width {
            if !above(i, j) {
                continue;
            }
            let idx = i * width + j;

            let left = if j > 0 { labels[idx - 1] } else { 0 };
            let top = if i > 0 { labels[idx - width] } else { 0 };

            labels[idx] = match (left, top) {
                (0, 0) => {
                    let label = next_label;
                    next_label += 1;
                    label
                }
                (l, 0) => l,
                (0, t) => t,
                (l, t) => {
                    let min = l.min(t);
                    if l != t {
                        equivalences.push((min, l.max(t)));
                    }
                    min
                }
            };
        }
    }

    // Resolve equivalences with a union-find over the label map
    let mut label_map: Vec<u32> = (0..next_label).collect();
    for &(a, b) in &equivalences {
        let root_a = find_root(&mut label_map, a);
        let root_b = find_root(&mut label_map, b);
        if root_a != root_b {
            label_map[root_b as usize] = root_a;
        }
    }

    // Second pass - collect per-component bounding box, peak, and area
    let mut blob_info: std::collections::HashMap<u32, Blob> = std::collections::HashMap::new();
    for i in 0..height {
        for j in 0..width {
            let idx = i * width + j;
            if labels[idx] == 0 {
                continue;
            }
            let root = find_root(&mut label_map, labels[idx]);
            let value = image.data[idx];
            let (ii, jj) = (i as i64, j as i64);

            let entry = blob_info.entry(root).or_insert(Blob {
                bbox: (ii, jj, ii, jj),
                peak: (ii, jj),
                peak_value: value,
                area: 0,
            });
            entry.bbox.0 = entry.bbox.0.min(ii);
            entry.bbox.1 = entry.bbox.1.min(jj);
            entry.bbox.2 = entry.bbox.2.max(ii);
            entry.bbox.3 = entry.bbox.3.max(jj);
            if value > entry.peak_value {
                entry.peak = (ii, jj);
                entry.peak_value = value;
            }
            entry.area += 1;
        }
    }

    // Deterministic order for downstream iteration
    let mut blobs: Vec<Blob> = blob_info.into_values().collect();
    blobs.sort_by_key(|b| b.bbox);
    blobs
}

fn find_root(label_map: &mut [u32], label: u32) -> u32 {
    let mut root = label;
    while label_map[root as usize] != root {
        root = label_map[root as usize];
    }
    // path compression
    let mut current = label;
    while label_map[current as usize] != root {
        let next = label_map[current as usize];
        label_map[current as usize] = root;
        current = next;
    }
    root
}

/// Drop measurements that landed within the search radius of a brighter one
/// (several blobs can belong to a single star).
fn dedupe_stars(stars: Vec<CentroidResult>) -> Vec<CentroidResult> {
    let mut kept: Vec<CentroidResult> = Vec::with_capacity(stars.len());
    for star in stars {
        let duplicate = kept.iter().any(|k| {
            let dx = k.xy_ctr.0 - star.xy_ctr.0;
            let dy = k.xy_ctr.1 - star.xy_ctr.1;
            let min_rad = k.rad.min(star.rad) as f64;
            dx * dx + dy * dy < min_rad * min_rad
        });
        if !duplicate {
            kept.push(star);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_square(width: usize, height: usize, top_left: (usize, usize)) -> GuideImage {
        let mut data = vec![100u16; width * height];
        let (i0, j0) = top_left;
        for di in 0..3 {
            for dj in 0..3 {
                data[(i0 + di) * width + (j0 + dj)] = 1000;
            }
        }
        data[(i0 + 1) * width + (j0 + 1)] = 2000;
        GuideImage::new(width, height, data).unwrap()
    }

    #[test]
    fn test_label_blobs_single_component() {
        let image = image_with_square(16, 16, (5, 6));
        let blobs = label_blobs(&image, None, 500.0);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 9);
        assert_eq!(blobs[0].bbox, (5, 6, 7, 8));
        assert_eq!(blobs[0].peak, (6, 7));
        assert_eq!(blobs[0].peak_value, 2000);
    }

    #[test]
    fn test_label_blobs_merges_l_shape() {
        // An L-shape that the first pass labels as two runs; the union-find
        // must merge them.
        let mut data = vec![0u16; 8 * 8];
        for j in 2..6 {
            data[4 * 8 + j] = 900;
        }
        for i in 1..4 {
            data[i * 8 + 5] = 900;
        }
        let image = GuideImage::new(8, 8, data).unwrap();
        let blobs = label_blobs(&image, None, 500.0);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 7);
    }

    #[test]
    fn test_label_blobs_separate_components() {
        let mut data = vec![0u16; 16 * 16];
        data[2 * 16 + 2] = 900;
        data[2 * 16 + 3] = 900;
        data[12 * 16 + 12] = 900;
        data[13 * 16 + 12] = 900;
        let image = GuideImage::new(16, 16, data).unwrap();
        let blobs = label_blobs(&image, None, 500.0);
        assert_eq!(blobs.len(), 2);
    }

    #[test]
    fn test_label_blobs_respects_mask() {
        let image = image_with_square(16, 16, (5, 6));
        let mut mask_data = vec![false; 16 * 16];
        for di in 0..3 {
            for dj in 0..3 {
                mask_data[(5 + di) * 16 + (6 + dj)] = true;
            }
        }
        let mask = PixelMask::new(16, 16, mask_data).unwrap();
        assert!(label_blobs(&image, Some(&mask), 500.0).is_empty());
    }

    #[test]
    fn test_detection_threshold_flat_frame() {
        let image = GuideImage::new(8, 8, vec![200u16; 64]).unwrap();
        // zero variance: threshold sits at the median
        assert_eq!(detection_threshold(&image, None, 3.0), 200.0);
    }

    #[test]
    fn test_detection_threshold_all_masked() {
        let image = GuideImage::new(4, 4, vec![200u16; 16]).unwrap();
        let mask = PixelMask::new(4, 4, vec![true; 16]).unwrap();
        assert_eq!(detection_threshold(&image, Some(&mask), 3.0), f64::INFINITY);
    }

    #[test]
    fn test_find_stars_empty_frame() {
        let image = GuideImage::new(32, 32, vec![100u16; 32 * 32]).unwrap();
        let ccd = CcdInfo::new(0.0, 1.0, 1.0);
        let stars = find_stars(&image, None, &FindStarsParams::default(), &ccd);
        assert!(stars.is_empty());
    }
}
