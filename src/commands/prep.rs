use crate::error::Result;
use crate::interval::retain_standard;
use crate::regions::{load_intervals, Merger};
use crate::tools::HomologyPooler;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Canonical region files written by a preparation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOutputs {
    pub depth: PathBuf,
    pub homology: PathBuf,
    pub combined: PathBuf,
}

impl RegionOutputs {
    pub fn new(output_dir: &Path, genome_version: &str) -> Self {
        Self {
            depth: output_dir.join(format!("depth.regions.{}.bed", genome_version)),
            homology: output_dir.join(format!("hom.regions.{}.bed", genome_version)),
            combined: output_dir.join(format!("combined.regions.{}.bed", genome_version)),
        }
    }
}

/// Inputs of a preparation run.
#[derive(Debug, Clone)]
pub struct PrepInputs {
    pub depth_regions: PathBuf,
    pub loci: PathBuf,
    pub reference: PathBuf,
    pub homology_table: PathBuf,
    pub genome_version: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedRegions {
    /// Loci followed by their canonical homologous regions.
    pub regions_of_interest: Vec<String>,
    pub depth_regions: Vec<String>,
    pub loci_count: usize,
    pub homology_count: usize,
    pub combined_count: usize,
}

/// Builds the canonical region sets: depth windows, homologous regions of
/// the loci of interest, and their union.
pub struct RegionPreparer<'a> {
    pooler: &'a dyn HomologyPooler,
    merger: Merger,
    drop_nonstandard: bool,
}

impl<'a> RegionPreparer<'a> {
    pub fn new(pooler: &'a dyn HomologyPooler, merger: Merger) -> Self {
        Self {
            pooler,
            merger,
            drop_nonstandard: false,
        }
    }

    /// Drop records whose chromosome is neither `chr*` nor numeric.
    pub fn drop_nonstandard(mut self, drop: bool) -> Self {
        self.drop_nonstandard = drop;
        self
    }

    fn filter(&self, identifiers: Vec<String>, label: &str) -> Vec<String> {
        if self.drop_nonstandard {
            retain_standard(identifiers, label)
        } else {
            identifiers
        }
    }

    /// Collect the regions homologous to every locus into a canonical set at
    /// `output`.
    pub fn expand_homology(
        &self,
        loci: &[String],
        reference: &Path,
        homology_table: &Path,
        output: &Path,
    ) -> Result<Vec<String>> {
        if output.exists() {
            fs::remove_file(output)?;
        }

        for locus in loci {
            debug!("Pooling homologous regions of {}", locus);
            self.pooler.pool(locus, reference, homology_table, output)?;
        }

        let unmerged = if output.exists() {
            load_intervals(output)?
        } else {
            Vec::new()
        };
        let unmerged = self.filter(unmerged, "homologous regions");
        debug!(
            "Collected {} homologous regions for {} loci",
            unmerged.len(),
            loci.len()
        );

        self.merger.merge_into(unmerged, output)?;
        load_intervals(output)
    }

    /// Merge the depth and homology region files into `output`.
    pub fn combine(
        &self,
        depth_regions: &Path,
        homology_regions: &Path,
        output: &Path,
    ) -> Result<Vec<String>> {
        let mut combined = load_intervals(depth_regions)?;
        combined.extend(load_intervals(homology_regions)?);

        self.merger.merge_into(combined, output)?;
        load_intervals(output)
    }

    /// Canonicalize a raw interval file into `output`.
    pub fn canonicalize(&self, input: &Path, output: &Path) -> Result<Vec<String>> {
        let intervals = self.filter(load_intervals(input)?, "depth regions");
        self.merger.merge_into(intervals, output)?;
        load_intervals(output)
    }

    /// Run the whole preparation and leave the three canonical files under
    /// `inputs.output_dir`.
    pub fn prepare(&self, inputs: &PrepInputs) -> Result<PreparedRegions> {
        fs::create_dir_all(&inputs.output_dir)?;
        let outputs = RegionOutputs::new(&inputs.output_dir, &inputs.genome_version);

        self.canonicalize(&inputs.depth_regions, &outputs.depth)?;
        info!("Preparing regions...");

        let loci = self.filter(load_intervals(&inputs.loci)?, "loci");
        let depth_regions = load_intervals(&outputs.depth)?;
        let homology_regions = self.expand_homology(
            &loci,
            &inputs.reference,
            &inputs.homology_table,
            &outputs.homology,
        )?;
        let combined = self.combine(&outputs.depth, &outputs.homology, &outputs.combined)?;

        let loci_count = loci.len();
        let homology_count = homology_regions.len();
        let mut regions_of_interest = loci;
        regions_of_interest.extend(homology_regions);

        Ok(PreparedRegions {
            regions_of_interest,
            depth_regions,
            loci_count,
            homology_count,
            combined_count: combined.len(),
        })
    }
}

fn require_file(path: &Path, what: &str) -> io::Result<()> {
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} '{}' not found", what, path.display()),
        ));
    }
    Ok(())
}

/// Entry point for the `prep` subcommand.
pub fn run_prep(preparer: &RegionPreparer<'_>, inputs: &PrepInputs) -> io::Result<PreparedRegions> {
    require_file(&inputs.depth_regions, "Depth region file")?;
    require_file(&inputs.loci, "Loci file")?;
    require_file(&inputs.reference, "Reference file")?;
    require_file(&inputs.homology_table, "Homology table")?;

    info!("Using the following depth region file: {}", inputs.depth_regions.display());
    info!("Using the following loci list: {}", inputs.loci.display());
    info!("Using the following homology table: {}", inputs.homology_table.display());
    info!("Using the following reference file: {}", inputs.reference.display());

    let prepared = preparer.prepare(inputs)?;

    info!("Found the following regions");
    info!("- LOCI REGIONS       : {}", prepared.loci_count);
    info!("- HOMOLOGOUS REGIONS : {}", prepared.homology_count);
    info!("- DEPTH REGIONS      : {}", prepared.depth_regions.len());
    info!("- COMBINED REGIONS   : {}", prepared.combined_count);
    info!("Completed all processes.");

    Ok(prepared)
}
