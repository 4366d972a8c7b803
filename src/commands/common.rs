use anyhow::{Context, Result};
use std::path::Path;

use crate::centroid::CentroidResult;
use crate::image::{GuideImage, PixelMask};

/// Load a frame and its optional mask, checking that the shapes agree.
pub fn load_image_and_mask(
    path: &str,
    mask_path: Option<&str>,
    invert_mask: bool,
) -> Result<(GuideImage, Option<PixelMask>)> {
    let image = GuideImage::from_fits(Path::new(path))
        .with_context(|| format!("Failed to load FITS image: {}", path))?;

    let mask = match mask_path {
        Some(mask_path) => {
            let mask = PixelMask::from_fits(Path::new(mask_path), invert_mask)
                .with_context(|| format!("Failed to load FITS mask: {}", mask_path))?;
            if mask.width != image.width || mask.height != image.height {
                return Err(anyhow::anyhow!(
                    "mask shape {}x{} does not match image shape {}x{}",
                    mask.width,
                    mask.height,
                    image.width,
                    image.height
                ));
            }
            Some(mask)
        }
        None => None,
    };

    Ok((image, mask))
}

/// Parse an "X,Y" position argument.
pub fn parse_xy_guess(guess: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = guess.split(',').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!(
            "guess '{}' must be two comma-separated numbers, e.g. 32.4,28.7",
            guess
        ));
    }
    let x: f64 = parts[0]
        .trim()
        .parse()
        .with_context(|| format!("bad x component in guess '{}'", guess))?;
    let y: f64 = parts[1]
        .trim()
        .parse()
        .with_context(|| format!("bad y component in guess '{}'", guess))?;
    Ok((x, y))
}

pub fn print_star_header() {
    println!(
        "{:>8} {:>8} {:>7} {:>7} {:>12} {:>5} {:>7} {:>10}",
        "xctr", "yctr", "xerr", "yerr", "asymm", "rad", "pix", "counts"
    );
}

pub fn print_star_row(star: &CentroidResult) {
    println!(
        "{:>8.2} {:>8.2} {:>7.2} {:>7.2} {:>12.1} {:>5} {:>7} {:>10}",
        star.xy_ctr.0,
        star.xy_ctr.1,
        star.xy_err.0,
        star.xy_err.1,
        star.asymm,
        star.rad,
        star.pix,
        star.counts
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xy_guess() {
        assert_eq!(parse_xy_guess("32.4,28.7").unwrap(), (32.4, 28.7));
        assert_eq!(parse_xy_guess(" 10 , 20 ").unwrap(), (10.0, 20.0));
        assert!(parse_xy_guess("32.4").is_err());
        assert!(parse_xy_guess("a,b").is_err());
        assert!(parse_xy_guess("1,2,3").is_err());
    }
}
