use anyhow::Result;

use crate::ccd::CcdInfo;
use crate::commands::common::{load_image_and_mask, print_star_header, print_star_row};
use crate::star_finder::{self, FindStarsParams};

/// Find and centroid every star-like feature in the frame.
#[allow(clippy::too_many_arguments)]
pub fn find_stars(
    path: &str,
    thresh: f64,
    rad_mult: f64,
    rad: Option<f64>,
    mask_path: Option<&str>,
    invert_mask: bool,
    ccd: &CcdInfo,
    format: &str,
) -> Result<()> {
    let (image, mask) = load_image_and_mask(path, mask_path, invert_mask)?;

    let params = FindStarsParams {
        thresh,
        rad_mult,
        rad,
    };
    let stars = star_finder::find_stars(&image, mask.as_ref(), &params, ccd);

    match format.to_lowercase().as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stars)?);
        }
        _ => {
            println!("{} stars found:", stars.len());
            print_star_header();
            for star in &stars {
                print_star_row(star);
            }
        }
    }

    Ok(())
}
