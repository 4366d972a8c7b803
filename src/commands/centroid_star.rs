use anyhow::Result;

use crate::ccd::CcdInfo;
use crate::centroid::centroid;
use crate::commands::common::{load_image_and_mask, parse_xy_guess, print_star_header, print_star_row};

/// Centroid a single star near the given guess and report the measurement.
#[allow(clippy::too_many_arguments)]
pub fn centroid_star(
    path: &str,
    guess: &str,
    rad: f64,
    mask_path: Option<&str>,
    invert_mask: bool,
    ccd: &CcdInfo,
    format: &str,
) -> Result<()> {
    let (image, mask) = load_image_and_mask(path, mask_path, invert_mask)?;
    let xy_guess = parse_xy_guess(guess)?;

    let result = centroid(&image, mask.as_ref(), xy_guess, rad, ccd)?;

    match format.to_lowercase().as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_star_header();
            print_star_row(&result);
        }
    }

    Ok(())
}
