use thiserror::Error;

/// Ways a centroid measurement can fail.
///
/// Every failure is returned as a value; the core never panics on bad data.
/// Callers typically retry with a larger radius or a different guess.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CentroidError {
    /// Malformed guess, mismatched mask shape, or invalid CCD parameters
    #[error("bad input: {0}")]
    BadInput(String),

    /// Every pixel in the search disc was masked or outside the image
    #[error("no usable data within the search radius")]
    NoData,

    /// The grid walk left the disc of radius `rad` around the initial guess
    #[error("could not find a star within {rad} pixels of the guess")]
    WalkedTooFar { rad: i64 },

    /// The minimum never settled at the center cell
    #[error("could not find a star in {0} iterations")]
    NoConvergence(usize),

    /// The parabolic fit was not concave upward or produced non-finite values
    #[error("parabolic fit failed near the asymmetry minimum")]
    BadFit,
}
