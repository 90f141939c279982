//! End-to-end conversion of an OpenSCAD file into a multi-color 3MF
//!
//! 1. find the color tokens used by the source
//! 2. render one 3MF per color in parallel, into a temporary directory
//! 3. merge the successful renders in color order
//! 4. write the composite model and drop the temporary renders

use crate::error::Result;
use crate::merge::{MergeConfig, MergeReport, merge_to_file};
use crate::render::{OpenScad, RenderFailure, Renderer, render_all};
use crate::scad::extract_colors;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default number of parallel renders
pub const DEFAULT_THREADS: usize = 4;

/// Configuration of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    source: PathBuf,
    output: Option<PathBuf>,
    renderer_path: Option<PathBuf>,
    threads: usize,
    merge: MergeConfig,
}

impl PipelineConfig {
    /// Convert `source` with default settings
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: None,
            renderer_path: None,
            threads: DEFAULT_THREADS,
            merge: MergeConfig::default(),
        }
    }

    /// Write the result to `output` instead of next to the source
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Try this renderer executable before the platform defaults
    pub fn with_renderer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.renderer_path = Some(path.into());
        self
    }

    /// Number of parallel renders (at least one is used)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Settings for the merge step
    pub fn with_merge_config(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    /// Source file
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Output path: the configured one, or the source with a `.3mf` extension
    pub fn output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.source.with_extension("3mf"))
    }

    /// Number of parallel renders
    pub fn threads(&self) -> usize {
        self.threads
    }
}

/// What a pipeline run did
#[derive(Debug)]
pub struct PipelineReport {
    /// Every color token found in the source, sorted
    pub colors: Vec<String>,
    /// Colors whose render failed; they are missing from the output
    pub render_failures: Vec<RenderFailure>,
    /// Result of the merge step
    pub merge: MergeReport,
}

/// Run the pipeline with the OpenSCAD renderer
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let renderer = OpenScad::discover(config.renderer_path.as_deref())?;
    run_with(&renderer, config)
}

/// Run the pipeline with any renderer
pub fn run_with<R: Renderer>(renderer: &R, config: &PipelineConfig) -> Result<PipelineReport> {
    let colors = extract_colors(&config.source)?;
    info!("Found {} color(s): {}", colors.len(), colors.join(", "));

    // Renders live only as long as this directory
    let work_dir = tempfile::tempdir()?;
    let renders = render_all(
        renderer,
        &colors,
        &config.source,
        work_dir.path(),
        config.threads,
    )?;

    let inputs = renders.rendered.iter().map(|rendered| &rendered.path);
    let merge = merge_to_file(inputs, config.output(), &config.merge)?;

    Ok(PipelineReport {
        colors,
        render_failures: renders.failures,
        merge,
    })
}
