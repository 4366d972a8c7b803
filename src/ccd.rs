use serde::{Deserialize, Serialize};

use crate::error::CentroidError;

/// CCD parameters needed to convert pixel counts into expected noise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CcdInfo {
    /// Additive pedestal subtracted when converting counts to electrons (ADU)
    pub bias: f64,
    /// Per-pixel readout noise (e-)
    pub read_noise: f64,
    /// Inverse gain (e-/ADU)
    pub ccd_gain: f64,
}

impl Default for CcdInfo {
    fn default() -> Self {
        // NA2 guider values
        Self {
            bias: 1780.0,
            read_noise: 21.391,
            ccd_gain: 1.643,
        }
    }
}

impl CcdInfo {
    pub fn new(bias: f64, read_noise: f64, ccd_gain: f64) -> Self {
        Self {
            bias,
            read_noise,
            ccd_gain,
        }
    }

    /// Reject parameter bundles the noise model cannot use.
    pub fn validate(&self) -> Result<(), CentroidError> {
        if !self.bias.is_finite() || self.bias < 0.0 {
            return Err(CentroidError::BadInput(format!(
                "bias {} must be finite and non-negative",
                self.bias
            )));
        }
        if !self.read_noise.is_finite() || self.read_noise < 0.0 {
            return Err(CentroidError::BadInput(format!(
                "read noise {} must be finite and non-negative",
                self.read_noise
            )));
        }
        if !self.ccd_gain.is_finite() || self.ccd_gain <= 0.0 {
            return Err(CentroidError::BadInput(format!(
                "ccd gain {} must be finite and positive",
                self.ccd_gain
            )));
        }
        Ok(())
    }
}
