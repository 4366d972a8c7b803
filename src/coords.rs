//! Conversion between pixel index space and position space.
//!
//! Index space counts integer pixels (row, column) from zero. Position space
//! puts the origin at the corner of pixel [0, 0], so each pixel center sits
//! at a half-integer position: x runs along columns, y along rows.

use crate::error::CentroidError;

/// Offset added to a pixel index to obtain its position-space coordinate.
/// Must be applied uniformly in both conversion directions; changing it
/// silently shifts every reported centroid.
pub const POS_MINUS_INDEX: f64 = 0.5;

/// Truncate an x,y position to the (i, j) index of the containing pixel.
///
/// Any point inside a pixel selects that pixel. Fails if either component
/// is not finite.
pub fn ij_index_from_xy_pos(xy_pos: (f64, f64)) -> Result<(i64, i64), CentroidError> {
    let (x, y) = xy_pos;
    if !x.is_finite() || !y.is_finite() {
        return Err(CentroidError::BadInput(format!(
            "guess ({}, {}) must have two finite components",
            x, y
        )));
    }
    let i = (y - POS_MINUS_INDEX).floor() as i64;
    let j = (x - POS_MINUS_INDEX).floor() as i64;
    Ok((i, j))
}

/// Convert a possibly fractional (i, j) index to an x,y position.
pub fn xy_pos_from_ij_pos(ij_pos: (f64, f64)) -> (f64, f64) {
    let (i, j) = ij_pos;
    (j + POS_MINUS_INDEX, i + POS_MINUS_INDEX)
}
