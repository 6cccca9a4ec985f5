//! DSC (document structuring comments) header pre-scan.
//!
//! A simple line-oriented scanner, independent of the execution core: it
//! reads comment lines from the start of a document and stops at the first
//! line that is not a comment. Only the bounding-box comments are
//! interpreted; `%%HiResBoundingBox` and `%%ExactBoundingBox` override the
//! plain `%%BoundingBox` form.

use crate::utils::Rect;
use once_cell::sync::Lazy;
use regex::Regex;

static DSC_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%(\w+):?\s*(.*?)\s*$").expect("valid regex"));

static BBOX_VALUES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s*$").expect("valid regex"));

/// Parsed DSC header fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DscHeader {
    /// Value of BoundingBox, HiResBoundingBox or ExactBoundingBox.
    pub bounding_box: Option<Rect>,
}

impl DscHeader {
    /// Scans the header of a document. Reading stops at the first line that
    /// does not start with a `%` character.
    pub fn scan(data: &[u8]) -> Self {
        let mut header = Self::default();
        let mut high_res = false;

        for line in data.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(line);
            let line = line.trim_end_matches('\r');
            if !line.starts_with('%') {
                break;
            }
            let Some(caps) = DSC_COMMENT.captures(line) else {
                continue;
            };
            let field = caps[1].to_ascii_lowercase();
            match field.as_str() {
                "hiresboundingbox" | "exactboundingbox" => {
                    if let Some(bbox) = parse_bounding_box(&caps[2]) {
                        header.bounding_box = Some(bbox);
                        high_res = true;
                    }
                }
                "boundingbox" if !high_res => {
                    if let Some(bbox) = parse_bounding_box(&caps[2]) {
                        header.bounding_box = Some(bbox);
                    }
                }
                _ => {}
            }
        }
        header
    }
}

fn parse_bounding_box(text: &str) -> Option<Rect> {
    let caps = BBOX_VALUES.captures(text)?;
    let x0 = caps[1].parse().ok()?;
    let y0 = caps[2].parse().ok()?;
    let x1 = caps[3].parse().ok()?;
    let y1 = caps[4].parse().ok()?;
    Some((x0, y0, x1, y1))
}
