use clap::Parser;
use regionkit::commands::prep::{run_prep, PrepInputs, RegionPreparer};
use regionkit::commands::reduce::run_reduce;
use regionkit::regions::Merger;
use regionkit::tools::{Parascopy, Samtools};
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "1")]
    verbose: u8,
}

/// Prepare genomic region sets and reduce alignment archives to them.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Build canonical depth, homology and combined region files
    Prep {
        #[clap(flatten)]
        common: CommonOpts,

        /// Path to background depth regions
        #[clap(short = 'b', long, value_parser)]
        bg_depth: String,

        /// Path to the file with loci of interest
        #[clap(short = 'l', long, value_parser)]
        loci: String,

        /// Path to the FASTA reference
        #[clap(short = 'r', long, value_parser)]
        reference: String,

        /// Path to the homology table
        #[clap(short = 't', long, value_parser)]
        hom_table: String,

        /// Genome version label used in output file names (e.g. hg38)
        #[clap(short = 'z', long, value_parser)]
        hg_ver: String,

        /// Directory for the region files
        #[clap(short = 'o', long, value_parser)]
        outdir: String,

        /// Path to the parascopy executable
        #[clap(long, value_parser, default_value = "parascopy")]
        parascopy: String,

        /// Merge intervals with this bedtools executable instead of the built-in merge
        #[clap(long, value_parser)]
        bedtools: Option<String>,

        /// Drop regions on chromosomes that are neither `chr`-prefixed nor numeric
        #[clap(long, action)]
        drop_nonstandard: bool,
    },
    /// Reduce alignment archives to the reads overlapping a region file
    Reduce {
        #[clap(flatten)]
        common: CommonOpts,

        /// Path to a list of input archive files (one per line)
        #[clap(short = 'i', long, value_parser)]
        input: String,

        /// Path to the output directory
        #[clap(short = 'o', long, value_parser)]
        outdir: String,

        /// Path to the FASTA reference
        #[clap(short = 'f', long, value_parser)]
        reference: String,

        /// Path to the regions BED file
        #[clap(short = 'r', long, value_parser)]
        regions: String,

        /// Maximum number of archives processed at once [default: number of CPUs]
        #[clap(short = 't', short_alias = '@', long, value_parser)]
        threads: Option<NonZeroUsize>,

        /// Path to the samtools executable
        #[clap(long, value_parser, default_value = "samtools")]
        samtools: String,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Prep {
            common,
            bg_depth,
            loci,
            reference,
            hom_table,
            hg_ver,
            outdir,
            parascopy,
            bedtools,
            drop_nonstandard,
        } => {
            init_logger(&common);

            let output_dir = PathBuf::from(&outdir);
            let pooler = Parascopy::new(&parascopy, &output_dir);
            let merger = match bedtools {
                Some(program) => Merger::Bedtools {
                    program,
                    work_dir: output_dir.clone(),
                },
                None => Merger::Builtin,
            };
            let preparer = RegionPreparer::new(&pooler, merger).drop_nonstandard(drop_nonstandard);
            let inputs = PrepInputs {
                depth_regions: PathBuf::from(bg_depth),
                loci: PathBuf::from(loci),
                reference: PathBuf::from(reference),
                homology_table: PathBuf::from(hom_table),
                genome_version: hg_ver,
                output_dir,
            };
            run_prep(&preparer, &inputs)?;
        }
        Args::Reduce {
            common,
            input,
            outdir,
            reference,
            regions,
            threads,
            samtools,
        } => {
            init_logger(&common);

            let concurrency = threads.unwrap_or_else(default_concurrency);
            let reducer = Samtools::new(&samtools);
            run_reduce(&input, &outdir, &reference, &regions, concurrency, &reducer)?;
        }
    }

    Ok(())
}

fn init_logger(common: &CommonOpts) {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();
}

fn default_concurrency() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}
