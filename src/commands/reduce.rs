use crate::error::Result;
use crate::tools::ArchiveReducer;
use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary.list";
pub const REDUCED_SUFFIX: &str = ".reduced.cram";

/// One archive to reduce against a region file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionJob {
    pub archive: PathBuf,
    pub reference: PathBuf,
    pub regions: PathBuf,
    pub output_dir: PathBuf,
}

impl ReductionJob {
    pub fn basename(&self) -> String {
        self.archive
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.archive.to_string_lossy().to_string())
    }

    /// `<output_dir>/<stem>.reduced.cram`
    pub fn reduced_path(&self) -> PathBuf {
        let stem = self
            .archive
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| self.basename());
        self.output_dir.join(format!("{}{}", stem, REDUCED_SUFFIX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionStatus {
    Success,
    Error,
}

impl fmt::Display for ReductionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionStatus::Success => write!(f, "SUCCESS"),
            ReductionStatus::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionResult {
    pub basename: String,
    pub status: ReductionStatus,
}

impl ReductionResult {
    pub fn is_success(&self) -> bool {
        self.status == ReductionStatus::Success
    }
}

impl fmt::Display for ReductionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.basename, self.status)
    }
}

/// Read a newline-delimited list of archive paths, skipping blank lines.
pub fn read_archive_list(path: &Path) -> io::Result<Vec<PathBuf>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to read archive list '{}': {}", path.display(), e),
        )
    })?;
    let mut archives = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            archives.push(PathBuf::from(line));
        }
    }
    Ok(archives)
}

/// Reduce one archive and index the result. Never fails: errors become an
/// `ERROR` status.
pub fn run_job<R>(job: &ReductionJob, reducer: &R) -> ReductionResult
where
    R: ArchiveReducer + ?Sized,
{
    let basename = job.basename();
    info!("Working on {}...", basename);

    let status = match reduce_and_index(job, reducer) {
        Ok(()) => ReductionStatus::Success,
        Err(e) => {
            warn!("Reduction of {} failed: {}", basename, e);
            ReductionStatus::Error
        }
    };
    ReductionResult { basename, status }
}

fn reduce_and_index<R>(job: &ReductionJob, reducer: &R) -> Result<()>
where
    R: ArchiveReducer + ?Sized,
{
    let output = job.reduced_path();
    reducer.reduce(&job.archive, &job.reference, &job.regions, &output)?;
    reducer.index(&output)
}

/// Mark jobs whose output path was already claimed by an earlier job.
fn find_output_clashes(jobs: &[ReductionJob]) -> Vec<bool> {
    let mut claimed = HashSet::new();
    jobs.iter()
        .map(|job| {
            let clash = !claimed.insert(job.reduced_path());
            if clash {
                warn!(
                    "Skipping {}: {} is already written by an earlier archive",
                    job.archive.display(),
                    job.reduced_path().display()
                );
            }
            clash
        })
        .collect()
}

/// Reduce every archive with at most `concurrency` jobs in flight.
///
/// Results are returned, and written to `summary.list`, in input order.
/// An archive whose output name collides with an earlier one is not run and
/// reported as `ERROR`.
pub fn reduce_all<R>(
    archives: &[PathBuf],
    reference: &Path,
    regions: &Path,
    output_dir: &Path,
    concurrency: NonZeroUsize,
    reducer: &R,
) -> io::Result<Vec<ReductionResult>>
where
    R: ArchiveReducer + Sync + ?Sized,
{
    fs::create_dir_all(output_dir)?;

    let jobs: Vec<ReductionJob> = archives
        .iter()
        .map(|archive| ReductionJob {
            archive: archive.clone(),
            reference: reference.to_path_buf(),
            regions: regions.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        })
        .collect();
    let clashes = find_output_clashes(&jobs);

    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency.get())
        .build()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to build thread pool: {}", e),
            )
        })?;

    // Indexed collect keeps submission order regardless of completion order
    let results: Vec<ReductionResult> = pool.install(|| {
        jobs.par_iter()
            .zip(clashes.par_iter())
            .with_max_len(1)
            .map(|(job, &clash)| {
                if clash {
                    ReductionResult {
                        basename: job.basename(),
                        status: ReductionStatus::Error,
                    }
                } else {
                    run_job(job, reducer)
                }
            })
            .collect()
    });

    write_summary(&output_dir.join(SUMMARY_FILE), &results)?;
    Ok(results)
}

pub fn write_summary(path: &Path, results: &[ReductionResult]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for result in results {
        writeln!(writer, "{}", result)?;
    }
    writer.flush()
}

/// Entry point for the `reduce` subcommand.
pub fn run_reduce(
    input: &str,
    output_dir: &str,
    reference: &str,
    regions: &str,
    concurrency: NonZeroUsize,
    reducer: &(dyn ArchiveReducer + Sync),
) -> io::Result<Vec<ReductionResult>> {
    let archives = read_archive_list(Path::new(input))?;

    info!("Using '{}' as input-list of archive files ({} entries)", input, archives.len());
    info!("Using '{}' as reference FASTA file", reference);
    info!("Using '{}' as region BED file", regions);
    info!("Using '{}' as output directory", output_dir);
    info!("Using {} concurrent jobs", concurrency);

    let results = reduce_all(
        &archives,
        Path::new(reference),
        Path::new(regions),
        Path::new(output_dir),
        concurrency,
        reducer,
    )?;

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        warn!(
            "{} of {} archives failed; see {}",
            failed,
            results.len(),
            Path::new(output_dir).join(SUMMARY_FILE).display()
        );
    }
    info!("Completed all processes. Results saved in '{}'", output_dir);

    Ok(results)
}
