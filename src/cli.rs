use clap::{Parser, Subcommand};

use crate::ccd::CcdInfo;

#[derive(Parser)]
#[command(name = "guide-centroid")]
#[command(about = "Sub-pixel star centroiding for guide camera FITS images", long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Centroid a single star near a given position guess
    Centroid {
        /// Path to the FITS image
        path: String,

        /// Initial x,y position guess, e.g. --guess 32.4,28.7
        #[arg(short, long, value_name = "X,Y")]
        guess: String,

        /// Search radius in pixels (values below 3 are raised to 3)
        #[arg(short, long, default_value = "15")]
        rad: f64,

        /// Path to a FITS mask image (nonzero pixels are ignored)
        #[arg(short, long)]
        mask: Option<String>,

        /// Treat zero mask pixels as invalid instead of nonzero ones
        #[arg(long, requires = "mask")]
        invert_mask: bool,

        #[command(flatten)]
        ccd_options: CcdOptions,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Find star-like features across the frame and centroid each one
    FindStars {
        /// Path to the FITS image
        path: String,

        /// Detection threshold in standard deviations above the median
        #[arg(short, long, default_value = "3.0")]
        thresh: f64,

        /// Multiplier applied to each candidate's size to get its search radius
        #[arg(long, default_value = "1.0")]
        rad_mult: f64,

        /// Fixed search radius override in pixels
        #[arg(short, long)]
        rad: Option<f64>,

        /// Path to a FITS mask image (nonzero pixels are ignored)
        #[arg(short, long)]
        mask: Option<String>,

        /// Treat zero mask pixels as invalid instead of nonzero ones
        #[arg(long, requires = "mask")]
        invert_mask: bool,

        #[command(flatten)]
        ccd_options: CcdOptions,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Read and display metadata and statistics from a FITS file
    ReadFits {
        /// Path to the FITS file
        path: String,

        /// Show all header keywords
        #[arg(short, long)]
        verbose: bool,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

/// CCD parameters shared by the measuring commands. The defaults match the
/// NA2 guider; set them for your camera or the error estimate is meaningless.
#[derive(Parser, Debug, Clone)]
pub struct CcdOptions {
    /// CCD bias pedestal (ADU)
    #[arg(long, default_value = "1780.0")]
    pub bias: f64,

    /// CCD read noise (e-)
    #[arg(long, default_value = "21.391")]
    pub read_noise: f64,

    /// CCD inverse gain (e-/ADU)
    #[arg(long, default_value = "1.643")]
    pub ccd_gain: f64,
}

impl CcdOptions {
    pub fn to_ccd_info(&self) -> CcdInfo {
        CcdInfo::new(self.bias, self.read_noise, self.ccd_gain)
    }
}
