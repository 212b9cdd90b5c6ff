use crate::error::{RegionError, Result};
use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Discovers intervals homologous to a locus.
pub trait HomologyPooler {
    /// Append every interval homologous to `locus` to `output`.
    fn pool(&self, locus: &str, reference: &Path, table: &Path, output: &Path) -> Result<()>;
}

/// Filters an alignment archive down to a region set and indexes the result.
pub trait ArchiveReducer {
    /// Write the records of `archive` that fall in `regions` to `output`.
    fn reduce(
        &self,
        archive: &Path,
        reference: &Path,
        regions: &Path,
        output: &Path,
    ) -> Result<()>;
    fn index(&self, output: &Path) -> Result<()>;
}

/// `parascopy pool`, used only for the region list it writes with `-x`.
#[derive(Debug, Clone)]
pub struct Parascopy {
    pub program: String,
    pub work_dir: PathBuf,
}

impl Parascopy {
    pub fn new(program: &str, work_dir: &Path) -> Self {
        Self {
            program: program.to_string(),
            work_dir: work_dir.to_path_buf(),
        }
    }
}

impl HomologyPooler for Parascopy {
    fn pool(&self, locus: &str, reference: &Path, table: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .arg("pool")
            .arg("-i")
            .arg("in.bam")
            .arg("-t")
            .arg(table)
            .arg("-f")
            .arg(reference)
            .arg("-r")
            .arg(locus)
            .arg("-o")
            .arg(self.work_dir.join("pool.bam"))
            .arg("-x")
            .arg(output);
        run_checked(command, &self.program)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Samtools {
    pub program: String,
}

impl Samtools {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl ArchiveReducer for Samtools {
    fn reduce(
        &self,
        archive: &Path,
        reference: &Path,
        regions: &Path,
        output: &Path,
    ) -> Result<()> {
        let output_file = File::create(output)?;
        let mut command = Command::new(&self.program);
        command
            .arg("view")
            .arg("-C")
            .arg("-h")
            .arg("-M")
            .arg("-L")
            .arg(regions)
            .arg("-T")
            .arg(reference)
            .arg(archive)
            .stdout(Stdio::from(output_file));
        run_checked(command, &self.program)?;
        Ok(())
    }

    fn index(&self, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.arg("index").arg(output);
        run_checked(command, &self.program)?;
        Ok(())
    }
}

/// Render a command line for logs and error messages.
pub fn command_line(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `command` to completion, turning a non-zero exit into an error.
///
/// Streams that were not redirected by the caller are captured.
pub fn run_checked(mut command: Command, program: &str) -> Result<Output> {
    let label = command_line(&command);
    debug!("Running: {}", label);

    let output = command.output().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            RegionError::CommandNotFound {
                command: program.to_string(),
            }
        } else {
            RegionError::Io(err)
        }
    })?;

    if !output.status.success() {
        return Err(RegionError::ExternalTool {
            command: label,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}
