//! Tests for the reduction worker pool, with samtools replaced by in-process
//! reducers.

use regionkit::commands::reduce::{
    read_archive_list, reduce_all, ReductionStatus, SUMMARY_FILE,
};
use regionkit::error::{RegionError, Result};
use regionkit::tools::ArchiveReducer;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Writes a marker file per archive; fails the reduce or index step for
/// archives whose name contains the configured pattern.
struct MarkerReducer {
    fail_reduce: Option<&'static str>,
    fail_index: Option<&'static str>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MarkerReducer {
    fn new() -> Self {
        Self {
            fail_reduce: None,
            fail_index: None,
            delay: Duration::from_millis(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

fn tool_error(command: String) -> RegionError {
    RegionError::ExternalTool {
        command,
        code: Some(1),
        stderr: "truncated file".to_string(),
    }
}

impl ArchiveReducer for MarkerReducer {
    fn reduce(
        &self,
        archive: &Path,
        _reference: &Path,
        _regions: &Path,
        output: &Path,
    ) -> Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);

        let name = archive.display().to_string();
        if self.fail_reduce.is_some_and(|pattern| name.contains(pattern)) {
            return Err(tool_error(format!("samtools view {}", name)));
        }
        fs::write(output, format!("reduced {}\n", name))?;
        Ok(())
    }

    fn index(&self, output: &Path) -> Result<()> {
        let name = output.display().to_string();
        if self.fail_index.is_some_and(|pattern| name.contains(pattern)) {
            return Err(tool_error(format!("samtools index {}", name)));
        }
        fs::write(format!("{}.crai", name), "")?;
        Ok(())
    }
}

fn archives(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|n| PathBuf::from("/data/crams").join(n)).collect()
}

fn threads(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn test_failed_job_does_not_abort_batch() {
    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("reduced");
    let reducer = MarkerReducer {
        fail_reduce: Some("s2"),
        ..MarkerReducer::new()
    };

    let results = reduce_all(
        &archives(&["s1.cram", "s2.cram", "s3.cram"]),
        Path::new("ref.fa"),
        Path::new("regions.bed"),
        &out_dir,
        threads(3),
        &reducer,
    )
    .unwrap();

    let statuses: Vec<(&str, ReductionStatus)> = results
        .iter()
        .map(|r| (r.basename.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("s1.cram", ReductionStatus::Success),
            ("s2.cram", ReductionStatus::Error),
            ("s3.cram", ReductionStatus::Success),
        ]
    );
    assert_eq!(
        fs::read_to_string(out_dir.join(SUMMARY_FILE)).unwrap(),
        "s1.cram\tSUCCESS\ns2.cram\tERROR\ns3.cram\tSUCCESS\n"
    );
    assert!(out_dir.join("s1.reduced.cram").exists());
    assert!(out_dir.join("s3.reduced.cram.crai").exists());
}

#[test]
fn test_index_failure_marks_error() {
    let temp_dir = TempDir::new().unwrap();
    let reducer = MarkerReducer {
        fail_index: Some("b.reduced"),
        ..MarkerReducer::new()
    };

    let results = reduce_all(
        &archives(&["a.cram", "b.cram"]),
        Path::new("ref.fa"),
        Path::new("regions.bed"),
        temp_dir.path(),
        threads(1),
        &reducer,
    )
    .unwrap();

    assert!(results[0].is_success());
    assert_eq!(results[1].status, ReductionStatus::Error);
    // The reduced archive exists even though indexing failed
    assert!(temp_dir.path().join("b.reduced.cram").exists());
}

#[test]
fn test_concurrency_bound_is_respected() {
    let temp_dir = TempDir::new().unwrap();
    let reducer = MarkerReducer {
        delay: Duration::from_millis(100),
        ..MarkerReducer::new()
    };

    let results = reduce_all(
        &archives(&["a.cram", "b.cram", "c.cram", "d.cram", "e.cram"]),
        Path::new("ref.fa"),
        Path::new("regions.bed"),
        temp_dir.path(),
        threads(2),
        &reducer,
    )
    .unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.is_success()));
    // Both workers are busy at some point, and never more than that
    assert_eq!(reducer.peak.load(Ordering::SeqCst), 2);
}

#[test]
fn test_summary_follows_input_order_not_completion_order() {
    let temp_dir = TempDir::new().unwrap();

    /// The first archive finishes last.
    struct SlowFirst;
    impl ArchiveReducer for SlowFirst {
        fn reduce(
            &self,
            archive: &Path,
            _reference: &Path,
            _regions: &Path,
            output: &Path,
        ) -> Result<()> {
            if archive.ends_with("first.cram") {
                thread::sleep(Duration::from_millis(100));
            }
            fs::write(output, "")?;
            Ok(())
        }
        fn index(&self, _output: &Path) -> Result<()> {
            Ok(())
        }
    }

    let names = ["first.cram", "second.cram", "third.cram", "fourth.cram"];
    let results = reduce_all(
        &archives(&names),
        Path::new("ref.fa"),
        Path::new("regions.bed"),
        temp_dir.path(),
        threads(4),
        &SlowFirst,
    )
    .unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.basename.as_str()).collect();
    assert_eq!(order, names);
}

#[test]
fn test_archives_sharing_a_file_name_do_not_overwrite_each_other() {
    let temp_dir = TempDir::new().unwrap();
    let reducer = MarkerReducer::new();
    let archives = vec![PathBuf::from("/a/x.cram"), PathBuf::from("/b/x.cram")];

    let results = reduce_all(
        &archives,
        Path::new("ref.fa"),
        Path::new("regions.bed"),
        temp_dir.path(),
        threads(2),
        &reducer,
    )
    .unwrap();

    let lines: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    assert_eq!(lines, vec!["x.cram\tSUCCESS", "x.cram\tERROR"]);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("x.reduced.cram")).unwrap(),
        "reduced /a/x.cram\n"
    );
    assert_eq!(
        fs::read_to_string(temp_dir.path().join(SUMMARY_FILE)).unwrap(),
        "x.cram\tSUCCESS\nx.cram\tERROR\n"
    );
}

#[test]
fn test_read_archive_list_skips_blank_lines() {
    let temp_dir = TempDir::new().unwrap();
    let list = temp_dir.path().join("crams.list");
    fs::write(&list, "/data/a.cram\n\n  /data/b.cram  \n").unwrap();

    assert_eq!(
        read_archive_list(&list).unwrap(),
        vec![PathBuf::from("/data/a.cram"), PathBuf::from("/data/b.cram")]
    );
    assert!(read_archive_list(&temp_dir.path().join("missing.list")).is_err());
}
