//! Sub-pixel star centroiding by radial-asymmetry minimization.
//!
//! The minimum is found in two stages. First a grid walk: the asymmetry is
//! measured at the 3x3 block of pixels around the current candidate, and the
//! candidate steps toward the smallest cell until the smallest cell is the
//! center. Then a separable parabolic fit across the final 3x3 block refines
//! the center to a fraction of a pixel and yields a 1-sigma error estimate.

use serde::Serialize;

use crate::ccd::CcdInfo;
use crate::coords::{ij_index_from_xy_pos, xy_pos_from_ij_pos};
use crate::error::CentroidError;
use crate::image::{GuideImage, PixelMask};
use crate::radial_profile::rad_asymm_weighted;

/// Search radii below this are raised to this value.
pub const MIN_RAD: i64 = 3;

/// Iteration cap on the grid walk.
const MAX_ITER: usize = 40;

/// A measured centroid.
///
/// `asymm`, `pix`, and `counts` describe the radial profile centered on the
/// pixel nearest the centroid, not the sub-pixel centroid itself. `asymm` is
/// nominally normalized but is known to inflate for bright sources with many
/// masked pixels; it is reported as computed.
#[derive(Debug, Clone, Serialize)]
pub struct CentroidResult {
    /// Sub-pixel centroid, x then y, in position-space coordinates
    pub xy_ctr: (f64, f64),
    /// Predicted 1-sigma uncertainty in `xy_ctr` (pixels)
    pub xy_err: (f64, f64),
    /// Radial asymmetry at the nearest integer pixel
    pub asymm: f64,
    /// Number of unmasked pixels in the final search disc
    pub pix: u32,
    /// Total counts (ADU) over those pixels
    pub counts: u64,
    /// Search radius actually used (pixels)
    pub rad: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct GridCell {
    asymm: f64,
    counts: u64,
    n_pix: u32,
}

impl GridCell {
    /// A cell is filled once an evaluation found usable pixels there.
    fn filled(&self) -> bool {
        self.n_pix > 0
    }
}

/// The 3x3 block of asymmetry measurements around the walk candidate,
/// indexed [a][b] for the center pixel (ci + a - 1, cj + b - 1).
#[derive(Debug, Clone, Copy, Default)]
struct AsymmGrid {
    cells: [[GridCell; 3]; 3],
}

impl AsymmGrid {
    /// Position of the smallest asymmetry; ties resolve to the first cell
    /// in row-major order.
    fn min_pos(&self) -> (usize, usize) {
        let mut min = (0, 0);
        for a in 0..3 {
            for b in 0..3 {
                if self.cells[a][b].asymm < self.cells[min.0][min.1].asymm {
                    min = (a, b);
                }
            }
        }
        min
    }

    /// Shift the grid contents by (-di, -dj) after the candidate stepped by
    /// (di, dj): surviving cells keep their values, the rest empty out and
    /// will be re-evaluated.
    fn shift(&mut self, di: i64, dj: i64) {
        let mut shifted = AsymmGrid::default();
        for a in 0..3i64 {
            for b in 0..3i64 {
                let (sa, sb) = (a + di, b + dj);
                if (0..3).contains(&sa) && (0..3).contains(&sb) {
                    shifted.cells[a as usize][b as usize] =
                        self.cells[sa as usize][sb as usize];
                }
            }
        }
        *self = shifted;
    }

    fn center(&self) -> &GridCell {
        &self.cells[1][1]
    }
}

/// Find the centroid of a star-like feature near `xy_guess`.
///
/// * `image` - frame data, read-only
/// * `mask` - optional validity mask of the same shape; true means ignore.
///   Absent is equivalent to all-false.
/// * `xy_guess` - initial x,y position estimate
/// * `rad` - search radius (pixels); rounded to the nearest integer and
///   raised to `MIN_RAD` if below it
/// * `ccd` - CCD parameters for the noise model
pub fn centroid(
    image: &GuideImage,
    mask: Option<&PixelMask>,
    xy_guess: (f64, f64),
    rad: f64,
    ccd: &CcdInfo,
) -> Result<CentroidResult, CentroidError> {
    ccd.validate()?;
    if let Some(m) = mask {
        if m.width != image.width || m.height != image.height {
            return Err(CentroidError::BadInput(format!(
                "mask shape {}x{} does not match image shape {}x{}",
                m.width, m.height, image.width, image.height
            )));
        }
    }
    if !rad.is_finite() {
        return Err(CentroidError::BadInput(format!(
            "search radius {} must be finite",
            rad
        )));
    }

    let (gi, gj) = ij_index_from_xy_pos(xy_guess)?;
    let rad = (rad.round() as i64).max(MIN_RAD);
    let rad_sq = rad * rad;

    // Walk a 3x3 gridlet of asymmetry measurements toward the minimum.
    let (mut ci, mut cj) = (gi, gj);
    let mut grid = AsymmGrid::default();
    let mut converged = false;

    for niter in 1..=MAX_ITER {
        for a in 0..3usize {
            for b in 0..3usize {
                if grid.cells[a][b].filled() {
                    continue;
                }
                let cell_ctr = (ci + a as i64 - 1, cj + b as i64 - 1);
                grid.cells[a][b] = match rad_asymm_weighted(image, mask, cell_ctr, rad, ccd) {
                    Ok(r) => GridCell {
                        asymm: r.asymm,
                        counts: r.counts,
                        n_pix: r.n_pix,
                    },
                    // An empty cell can never win the minimum scan; leaving
                    // n_pix at zero keeps it re-evaluated after shifts.
                    Err(CentroidError::NoData) => GridCell {
                        asymm: f64::INFINITY,
                        counts: 0,
                        n_pix: 0,
                    },
                    Err(e) => return Err(e),
                };
            }
        }

        let (mi, mj) = grid.min_pos();
        if !grid.cells[mi][mj].asymm.is_finite() {
            // every cell came up empty
            return Err(CentroidError::NoData);
        }

        if (mi, mj) == (1, 1) {
            tracing::debug!(niter, ci, cj, asymm = grid.center().asymm, "walk converged");
            converged = true;
            break;
        }

        let (di, dj) = (mi as i64 - 1, mj as i64 - 1);
        ci += di;
        cj += dj;
        tracing::debug!(niter, di, dj, ci, cj, "walk step");

        if (ci - gi).pow(2) + (cj - gj).pow(2) >= rad_sq {
            return Err(CentroidError::WalkedTooFar { rad });
        }

        grid.shift(di, dj);
    }

    if !converged {
        return Err(CentroidError::NoConvergence(MAX_ITER));
    }

    refine(&grid, (ci, cj), rad)
}

/// Parabolic refinement of the converged grid: fit y(x) = ymin + a(x - xmin)^2
/// independently along each axis through the center, using only the on-axis
/// neighbors. The diagonal cells would couple the axes through off-axis
/// asymmetries and are ignored.
fn refine(
    grid: &AsymmGrid,
    ctr: (i64, i64),
    rad: i64,
) -> Result<CentroidResult, CentroidError> {
    let g = |a: usize, b: usize| grid.cells[a][b].asymm;

    let ai = 0.5 * (g(2, 1) - 2.0 * g(1, 1) + g(0, 1));
    let bi = 0.5 * (g(2, 1) - g(0, 1));
    let aj = 0.5 * (g(1, 2) - 2.0 * g(1, 1) + g(1, 0));
    let bj = 0.5 * (g(1, 2) - g(1, 0));

    // The fit must be concave upward on both axes
    if !ai.is_finite() || !aj.is_finite() || ai <= 0.0 || aj <= 0.0 {
        return Err(CentroidError::BadFit);
    }

    let di = -0.5 * bi / ai;
    let dj = -0.5 * bj / aj;

    // 1-sigma offset along each axis for a unit rise of the asymmetry
    // above its floor at the minimum
    let asymm_sigma = g(1, 1);
    let i_err = (asymm_sigma / ai).sqrt();
    let j_err = (asymm_sigma / aj).sqrt();

    if !di.is_finite() || !dj.is_finite() || !i_err.is_finite() || !j_err.is_finite() {
        return Err(CentroidError::BadFit);
    }

    let (ci, cj) = ctr;
    let xy_ctr = xy_pos_from_ij_pos((ci as f64 + di, cj as f64 + dj));
    let center = grid.center();

    Ok(CentroidResult {
        xy_ctr,
        xy_err: (j_err, i_err),
        asymm: center.asymm,
        pix: center.n_pix,
        counts: center.counts,
        rad,
    })
}
