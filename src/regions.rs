use crate::error::{RegionError, Result};
use crate::interval::{parse_record, Interval};
use crate::natsort::{natural_key, natural_sort};
use crate::tools::run_checked;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::Builder;

/// Read an interval file and return its records as `chrom:start-end` identifiers.
pub fn load_intervals(path: &Path) -> Result<Vec<String>> {
    Ok(read_interval_file(path)?
        .iter()
        .map(Interval::to_identifier)
        .collect())
}

/// Read an interval file in tab-separated or identifier form.
///
/// Blank lines and `#` header lines are skipped.
pub fn read_interval_file(path: &Path) -> Result<Vec<Interval>> {
    let reader = BufReader::new(File::open(path)?);
    let mut intervals = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_record(line)? {
            Some(interval) => intervals.push(interval),
            None => {
                return Err(RegionError::Format {
                    path: path.display().to_string(),
                    line: idx + 1,
                    found: line.split('\t').count(),
                })
            }
        }
    }

    Ok(intervals)
}

/// Write intervals in tab-separated form, one per line.
pub fn write_intervals(path: &Path, intervals: &[Interval]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for interval in intervals {
        writeln!(writer, "{}", interval.to_bed_line())?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_identifiers(identifiers: &[String]) -> Result<Vec<Interval>> {
    identifiers
        .iter()
        .map(|id| Interval::from_identifier(id))
        .collect()
}

/// Coalesce overlapping and book-ended intervals.
///
/// Output is ordered by chromosome (natural order), then start.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    if intervals.len() <= 1 {
        return intervals;
    }
    intervals.sort_by_cached_key(|iv| (natural_key(&iv.chrom), iv.chrom.clone(), iv.start, iv.end));

    let mut write_idx = 0;
    for read_idx in 1..intervals.len() {
        let same_chrom = intervals[write_idx].chrom == intervals[read_idx].chrom;
        if same_chrom && intervals[read_idx].start <= intervals[write_idx].end {
            let next_end = intervals[read_idx].end;
            let curr = &mut intervals[write_idx];
            curr.end = curr.end.max(next_end);
        } else {
            write_idx += 1;
            if write_idx != read_idx {
                intervals.swap(write_idx, read_idx);
            }
        }
    }
    intervals.truncate(write_idx + 1);
    intervals
}

/// Backend that turns a sorted interval list into a canonical set.
#[derive(Debug, Clone)]
pub enum Merger {
    /// In-process sweep-line merge.
    Builtin,
    /// `bedtools merge` run over a scratch file in `work_dir`.
    Bedtools { program: String, work_dir: PathBuf },
}

impl Merger {
    /// Natural-sort `identifiers` and merge them into a canonical set.
    pub fn merge(&self, mut identifiers: Vec<String>) -> Result<Vec<Interval>> {
        natural_sort(&mut identifiers);
        let intervals = parse_identifiers(&identifiers)?;
        debug!("Merging {} intervals", intervals.len());

        let merged = match self {
            Merger::Builtin => merge_intervals(intervals),
            Merger::Bedtools { program, work_dir } => bedtools_merge(program, work_dir, &intervals)?,
        };
        debug!("{} intervals after merging", merged.len());
        Ok(merged)
    }

    /// Merge `identifiers` and write the canonical set to `output`.
    pub fn merge_into(&self, identifiers: Vec<String>, output: &Path) -> Result<Vec<Interval>> {
        let merged = self.merge(identifiers)?;
        write_intervals(output, &merged)?;
        Ok(merged)
    }
}

fn bedtools_merge(program: &str, work_dir: &Path, intervals: &[Interval]) -> Result<Vec<Interval>> {
    if intervals.is_empty() {
        return Ok(Vec::new());
    }

    // Removed when dropped, whether or not the merge succeeds
    let scratch = Builder::new()
        .prefix("unmerged_")
        .suffix(".bed")
        .tempfile_in(work_dir)?;
    write_intervals(scratch.path(), intervals)?;

    let mut command = Command::new(program);
    command.arg("merge").arg("-i").arg(scratch.path());
    let output = run_checked(command, program)?;

    let mut merged = Vec::new();
    for (idx, line) in String::from_utf8_lossy(&output.stdout).lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line)? {
            Some(interval) => merged.push(interval),
            None => {
                return Err(RegionError::Format {
                    path: format!("{} merge output", program),
                    line: idx + 1,
                    found: line.split('\t').count(),
                })
            }
        }
    }
    Ok(merged)
}
