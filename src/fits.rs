use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// FITS headers come in 2880-byte blocks of 80-character cards.
pub const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// Give up if the primary header runs longer than this many blocks.
const MAX_HEADER_BLOCKS: usize = 64;

/// Metadata extracted from a FITS file
#[derive(Debug, serde::Serialize)]
pub struct FitsMetadata {
    pub filename: String,
    pub primary_header: HashMap<String, String>,
    pub image_info: Option<ImageInfo>,
}

#[derive(Debug, serde::Serialize)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub bit_depth: i32,
    pub dimensions: Vec<usize>,
}

/// Read metadata from a FITS file using basic FITS format parsing
pub fn read_fits_metadata(path: &Path) -> Result<FitsMetadata> {
    let mut reader = BufReader::new(File::open(path)?);
    let primary_header = read_primary_header(&mut reader)
        .with_context(|| format!("bad FITS header in {}", path.display()))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let image_info = image_info_from_header(&primary_header);

    Ok(FitsMetadata {
        filename,
        primary_header,
        image_info,
    })
}

/// One 80-character header card.
enum Card {
    End,
    Value(String, String),
    Other,
}

/// Consume header blocks from `reader` through the END card, collecting
/// keyword/value pairs. On return the reader sits at the start of the data
/// section, so this doubles as the header skip for pixel loading.
pub fn read_primary_header<R: Read>(reader: &mut R) -> Result<HashMap<String, String>> {
    let mut keywords = HashMap::new();
    let mut block = [0u8; BLOCK_SIZE];

    for _ in 0..MAX_HEADER_BLOCKS {
        reader.read_exact(&mut block)?;
        for chunk in block.chunks_exact(CARD_SIZE) {
            let Ok(card) = std::str::from_utf8(chunk) else {
                continue;
            };
            match parse_card(card) {
                Card::End => return Ok(keywords),
                Card::Value(keyword, value) => {
                    keywords.insert(keyword, value);
                }
                Card::Other => {}
            }
        }
    }

    Err(anyhow::anyhow!(
        "no END card within {} header blocks",
        MAX_HEADER_BLOCKS
    ))
}

/// Parse one fixed-format card: keyword in columns 1-8, a "= " value
/// indicator in columns 9-10, then the value with an optional / comment.
/// COMMENT, HISTORY, and blank cards have no value indicator and fall
/// through as `Other`.
fn parse_card(card: &str) -> Card {
    let keyword = card.get(..8).unwrap_or("").trim_end();
    if keyword == "END" {
        return Card::End;
    }
    if keyword.is_empty() || card.get(8..10) != Some("= ") {
        return Card::Other;
    }

    let body = card.get(10..).unwrap_or("").trim();
    let value = if let Some(quoted) = body.strip_prefix('\'') {
        // string value: runs to the closing quote, slashes inside are literal
        let end = quoted.find('\'').unwrap_or(quoted.len());
        quoted[..end].trim_end().to_string()
    } else {
        // numeric or logical value: the comment starts at the slash
        body.split('/').next().unwrap_or("").trim().to_string()
    };

    Card::Value(keyword.to_string(), value)
}

/// Pull the image shape out of a parsed header, if it describes one.
pub fn image_info_from_header(header: &HashMap<String, String>) -> Option<ImageInfo> {
    let axis_len = |key: &str| header.get(key)?.parse::<usize>().ok();

    let naxis = axis_len("NAXIS")?;
    let dimensions: Vec<usize> = (1..=naxis)
        .map_while(|axis| axis_len(&format!("NAXIS{}", axis)))
        .collect();
    if dimensions.len() < 2 {
        return None;
    }

    let (width, height) = (dimensions[0], dimensions[1]);
    let bit_depth = header
        .get("BITPIX")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    Some(ImageInfo {
        width,
        height,
        bit_depth,
        dimensions,
    })
}

/// Summary lines for display: label, then header keywords in fallback order.
const SUMMARY_FIELDS: &[(&str, &[&str])] = &[
    ("Date", &["DATE-OBS"]),
    ("Object", &["OBJECT", "OBJNAME", "TARGET"]),
    ("Exposure", &["EXPTIME", "EXPOSURE"]),
    ("Telescope", &["TELESCOP"]),
    ("Instrument", &["INSTRUME"]),
    ("Gain", &["GAIN"]),
    ("Read Noise", &["RDNOISE", "READNOIS"]),
    ("CCD Temp", &["CCD-TEMP"]),
    ("Binning", &["XBINNING"]),
];

/// Format FITS metadata for display
pub fn format_fits_metadata(metadata: &FitsMetadata, verbose: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "FITS File: {}", metadata.filename);

    if let Some(info) = &metadata.image_info {
        let _ = writeln!(
            out,
            "Image: {} x {} ({}-bit)",
            info.width, info.height, info.bit_depth
        );
        if info.dimensions.len() > 2 {
            let _ = writeln!(out, "Full Shape: {:?}", info.dimensions);
        }
    }

    let _ = writeln!(out, "\nKey Metadata:");
    for (label, keys) in SUMMARY_FIELDS {
        if let Some(value) = keys.iter().find_map(|k| metadata.primary_header.get(*k)) {
            let _ = writeln!(out, "  {}: {}", label, value);
        }
    }

    if verbose {
        let _ = writeln!(out, "\nAll Keywords:");
        let mut sorted_keys: Vec<_> = metadata.primary_header.iter().collect();
        sorted_keys.sort_by_key(|&(k, _)| k);
        for (key, value) in sorted_keys {
            let _ = writeln!(out, "  {:<16} = {}", key, value);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_block(cards: &[&str]) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_SIZE);
        for text in cards {
            let mut card = text.as_bytes().to_vec();
            card.resize(CARD_SIZE, b' ');
            block.extend(card);
        }
        block.resize(BLOCK_SIZE, b' ');
        block
    }

    #[test]
    fn test_read_primary_header() {
        let block = header_block(&[
            "SIMPLE  =                    T / conforms to FITS",
            "BITPIX  =                   16",
            "NAXIS   =                    2",
            "NAXIS1  =                  640",
            "NAXIS2  =                  480",
            "OBJECT  = 'M 31    '",
            "COMMENT this card carries no value",
            "HISTORY neither does this one",
            "END",
        ]);

        let keywords = read_primary_header(&mut &block[..]).unwrap();
        assert_eq!(keywords.get("SIMPLE").map(String::as_str), Some("T"));
        assert_eq!(keywords.get("BITPIX").map(String::as_str), Some("16"));
        assert_eq!(keywords.get("NAXIS1").map(String::as_str), Some("640"));
        assert_eq!(keywords.get("OBJECT").map(String::as_str), Some("M 31"));
        assert!(!keywords.contains_key("COMMENT"));
        assert!(!keywords.contains_key("HISTORY"));
    }

    #[test]
    fn test_read_stops_at_end_card() {
        let mut data = header_block(&["NAXIS   =                    2", "END"]);
        data.extend(header_block(&["IGNORED =                    1"]));

        let keywords = read_primary_header(&mut &data[..]).unwrap();
        assert!(keywords.contains_key("NAXIS"));
        assert!(!keywords.contains_key("IGNORED"));
    }

    #[test]
    fn test_missing_end_is_an_error() {
        let block = header_block(&["NAXIS   =                    2"]);
        assert!(read_primary_header(&mut &block[..]).is_err());
    }

    #[test]
    fn test_slash_inside_quoted_value() {
        let block = header_block(&[
            "OBJECT  = 'NGC 1275 / Per A'   / a slash in the name",
            "EXPTIME =                 30.0 / seconds",
            "END",
        ]);
        let keywords = read_primary_header(&mut &block[..]).unwrap();
        assert_eq!(
            keywords.get("OBJECT").map(String::as_str),
            Some("NGC 1275 / Per A")
        );
        assert_eq!(keywords.get("EXPTIME").map(String::as_str), Some("30.0"));
    }

    #[test]
    fn test_image_info_from_header() {
        let block = header_block(&[
            "BITPIX  =                   16",
            "NAXIS   =                    2",
            "NAXIS1  =                  640",
            "NAXIS2  =                  480",
            "END",
        ]);
        let keywords = read_primary_header(&mut &block[..]).unwrap();
        let info = image_info_from_header(&keywords).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert_eq!(info.bit_depth, 16);
        assert_eq!(info.dimensions, vec![640, 480]);
    }

    #[test]
    fn test_image_info_needs_two_axes() {
        let block = header_block(&[
            "NAXIS   =                    1",
            "NAXIS1  =                  640",
            "END",
        ]);
        let keywords = read_primary_header(&mut &block[..]).unwrap();
        assert!(image_info_from_header(&keywords).is_none());
    }
}
