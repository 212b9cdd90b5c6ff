use crate::error::{RegionError, Result};
use log::warn;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A genomic interval on a single chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(chrom: &str, start: u64, end: u64) -> Result<Self> {
        if chrom.is_empty() {
            return Err(RegionError::InvalidCoordinate {
                record: to_identifier(chrom, start, end),
                reason: "empty chromosome name".to_string(),
            });
        }
        if start > end {
            return Err(RegionError::InvalidCoordinate {
                record: to_identifier(chrom, start, end),
                reason: format!("start ({}) is greater than end ({})", start, end),
            });
        }
        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }

    /// Parse a `chrom:start-end` identifier.
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        let (chrom, start, end) = to_triple(identifier)?;
        Ok(Self { chrom, start, end })
    }

    pub fn to_identifier(&self) -> String {
        to_identifier(&self.chrom, self.start, self.end)
    }

    /// Tab-separated BED representation, without a trailing newline.
    pub fn to_bed_line(&self) -> String {
        format!("{}\t{}\t{}", self.chrom, self.start, self.end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

pub fn to_identifier(chrom: &str, start: u64, end: u64) -> String {
    format!("{}:{}-{}", chrom, start, end)
}

/// Split an identifier on the first `:` and the `-` that follows it.
pub fn to_triple(identifier: &str) -> Result<(String, u64, u64)> {
    let malformed = || RegionError::MalformedInterval {
        identifier: identifier.to_string(),
    };
    let (chrom, range) = identifier.split_once(':').ok_or_else(malformed)?;
    let (start, end) = range.split_once('-').ok_or_else(malformed)?;

    let start = parse_coordinate(identifier, start)?;
    let end = parse_coordinate(identifier, end)?;
    let interval = Interval::new(chrom, start, end)?;
    Ok((interval.chrom, interval.start, interval.end))
}

/// Parse one interval record in either tab-separated or identifier form.
///
/// Returns `Ok(None)` when a tabbed line has fewer than three fields, so
/// callers can report the position of the offending line.
pub fn parse_record(line: &str) -> Result<Option<Interval>> {
    if !line.contains('\t') {
        return Interval::from_identifier(line.trim()).map(Some);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Ok(None);
    }
    let start = parse_coordinate(line, fields[1])?;
    let end = parse_coordinate(line, fields[2])?;
    Interval::new(fields[0], start, end).map(Some)
}

fn parse_coordinate(record: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| RegionError::InvalidCoordinate {
            record: record.to_string(),
            reason: format!("'{}' is not a valid position ({})", value, e),
        })
}

fn standard_chrom_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(chr.*|[0-9]+)$").unwrap())
}

/// Conventional chromosome names: `chr`-prefixed or purely numeric.
pub fn is_standard_chrom(chrom: &str) -> bool {
    standard_chrom_regex().is_match(chrom)
}

/// Keep only identifiers whose chromosome passes [`is_standard_chrom`].
///
/// Identifiers that cannot be parsed are kept; validation happens elsewhere.
pub fn retain_standard(identifiers: Vec<String>, label: &str) -> Vec<String> {
    let before = identifiers.len();
    let kept: Vec<String> = identifiers
        .into_iter()
        .filter(|id| {
            let chrom = id.split(':').next().unwrap_or(id.as_str());
            is_standard_chrom(chrom)
        })
        .collect();

    let dropped = before - kept.len();
    if dropped > 0 {
        warn!(
            "Dropped {} {} on non-standard chromosomes ({} kept)",
            dropped,
            label,
            kept.len()
        );
    }
    kept
}
