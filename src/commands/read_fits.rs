use anyhow::{Context, Result};
use std::path::Path;

use crate::fits::{format_fits_metadata, read_fits_metadata};
use crate::image::GuideImage;

/// Display metadata and pixel statistics for a FITS file.
pub fn read_fits(path: &str, verbose: bool, format: &str) -> Result<()> {
    let path = Path::new(path);
    let metadata = read_fits_metadata(path)
        .with_context(|| format!("Failed to read FITS metadata: {}", path.display()))?;

    // Statistics need the pixel data; skip them for images we cannot decode
    let statistics = GuideImage::from_fits(path).ok().map(|image| image.statistics());

    match format.to_lowercase().as_str() {
        "json" => {
            let output = serde_json::json!({
                "metadata": metadata,
                "statistics": statistics,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            print!("{}", format_fits_metadata(&metadata, verbose));
            if let Some(stats) = statistics {
                println!("\nPixel Statistics:");
                println!("  Mean: {:.2}", stats.mean);
                println!("  Median: {:.2}", stats.median);
                println!("  Std Dev: {:.2}", stats.std_dev);
                println!("  Min: {:.0}", stats.min);
                println!("  Max: {:.0}", stats.max);
            }
        }
    }

    Ok(())
}
