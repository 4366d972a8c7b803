use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use guide_centroid::cli::{Cli, Commands};
use guide_centroid::commands::{centroid_star, find_stars, read_fits};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the flag-derived default
    let default_filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Centroid {
            path,
            guess,
            rad,
            mask,
            invert_mask,
            ccd_options,
            format,
        } => {
            let ccd = ccd_options.to_ccd_info();
            centroid_star(
                &path,
                &guess,
                rad,
                mask.as_deref(),
                invert_mask,
                &ccd,
                &format,
            )?;
        }
        Commands::FindStars {
            path,
            thresh,
            rad_mult,
            rad,
            mask,
            invert_mask,
            ccd_options,
            format,
        } => {
            let ccd = ccd_options.to_ccd_info();
            find_stars(
                &path,
                thresh,
                rad_mult,
                rad,
                mask.as_deref(),
                invert_mask,
                &ccd,
                &format,
            )?;
        }
        Commands::ReadFits {
            path,
            verbose,
            format,
        } => {
            read_fits(&path, verbose, &format)?;
        }
    }

    Ok(())
}
