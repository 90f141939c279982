use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use color3mf::pipeline::{self, DEFAULT_THREADS, PipelineConfig};
use color3mf::{MergeConfig, MergeWarning, merge_to_file};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "color3mf", version)]
#[command(
    about = "Render each color() of an OpenSCAD file separately and merge the results into one multi-color 3MF",
    long_about = None
)]
#[command(subcommand_negates_reqs = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// OpenSCAD source file
    #[arg(short, long, required = true)]
    input: Option<PathBuf>,

    /// Output 3MF file [default: input with .3mf extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the OpenSCAD executable
    #[arg(long)]
    openscad: Option<PathBuf>,

    /// Number of colors rendered in parallel
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Do not attach Metadata/model_settings.config part names
    #[arg(long)]
    no_slicer_metadata: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge existing single-color 3MF files, each named after its color
    Merge {
        /// Output 3MF file
        #[arg(short, long)]
        output: PathBuf,

        /// Do not attach Metadata/model_settings.config part names
        #[arg(long)]
        no_slicer_metadata: bool,

        /// Input files such as red.3mf or tab:blue.3mf, merged in this order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Merge {
            output,
            no_slicer_metadata,
            inputs,
        }) => {
            let config = MergeConfig::new().with_slicer_metadata(!no_slicer_metadata);
            let report = merge_to_file(&inputs, &output, &config)
                .with_context(|| format!("merging into '{}' failed", output.display()))?;
            report_warnings(&report.warnings);
            info!("Done! Merged file is '{}'", report.output.display());
        }
        None => {
            let Some(input) = cli.input else {
                bail!("--input is required");
            };
            if !input.is_file() {
                bail!("Cannot find input file '{}'", input.display());
            }

            let mut config = PipelineConfig::new(&input)
                .with_threads(cli.threads)
                .with_merge_config(
                    MergeConfig::new().with_slicer_metadata(!cli.no_slicer_metadata),
                );
            if let Some(output) = cli.output {
                config = config.with_output(output);
            }
            if let Some(openscad) = cli.openscad {
                config = config.with_renderer_path(openscad);
            }

            let report = pipeline::run(&config)
                .with_context(|| format!("converting '{}' failed", input.display()))?;

            for failure in &report.render_failures {
                error!("Could not render '{}': {}", failure.color, failure.error);
            }
            report_warnings(&report.merge.warnings);
            info!("Done! Merged file is '{}'", report.merge.output.display());
        }
    }

    Ok(())
}

fn report_warnings(warnings: &[MergeWarning]) {
    let skipped = warnings.iter().filter(|w| w.is_skip()).count();
    if skipped > 0 {
        warn!("{} input file(s) were skipped", skipped);
    }
}
