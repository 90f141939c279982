//! # color3mf
//!
//! Multi-color 3MF assembly: merge several single-color 3MF files into one
//! composite model whose parts each carry a resolved display color.
//!
//! The typical input is the output of rendering one color of an OpenSCAD
//! design at a time. Each file's name is its color label (`red.3mf`,
//! `tab:blue.3mf`, `#00ff00.3mf`). The merged model contains:
//!
//! - one colored mesh object per input mesh, with canonically ordered triangles,
//! - one components object aggregating every part with identity transforms,
//! - a single build item, and
//! - an optional slicer configuration part (`Metadata/model_settings.config`)
//!   that names each part after its color.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Read and write 3MF packages (ZIP/OPC container, core + material color groups)
//! - Deterministic output: identical geometry yields byte-identical triangle lists
//! - Partial failure tolerant: unreadable inputs become warnings, not errors
//!
//! ## Example
//!
//! ```no_run
//! use color3mf::{MergeConfig, merge_to_file};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = merge_to_file(
//!     ["red.3mf", "blue.3mf"],
//!     "out.3mf",
//!     &MergeConfig::default(),
//! )?;
//!
//! for warning in &report.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! println!("Merged {} parts", report.parts.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod canonical;
pub mod color;
pub mod error;
pub mod merge;
pub mod model;
pub mod opc;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod scad;
pub mod slicer;
mod writer;

pub use color::{ColorSpec, Rgba, parse_color, resolve_color};
pub use error::{ColorParseWarning, Error, MergeWarning, Result};
pub use merge::{
    MergeConfig, MergeOutput, MergeReport, MergeSession, PartRecord, merge, merge_to_file,
};
pub use model::{
    Attachment, BaseMaterial, BaseMaterialGroup, Build, BuildItem, ColorGroup, Component,
    Extension, Mesh, MetadataEntry, Model, Object, ObjectShape, ObjectType, Resource, Resources,
    Transform, Triangle, Vertex,
};
pub use pipeline::{PipelineConfig, PipelineReport};
pub use render::{OpenScad, RenderFailure, Renderer};
pub use slicer::SlicerConfig;

use std::io::{Read, Seek, Write};
use std::path::Path;

impl Model {
    /// Parse a 3MF file from a reader
    ///
    /// Only the model part is read; other package parts are not loaded as
    /// attachments.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use color3mf::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("red.3mf")?;
    /// let model = Model::from_reader(file)?;
    /// println!("Model contains {} objects", model.resources.objects.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        parser::parse_3mf(reader)
    }

    /// Parse a 3MF file from a path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Write a 3MF file to a writer
    ///
    /// Serializes the model XML and packages it together with every attachment.
    /// Returns the writer once the ZIP archive is finished.
    pub fn to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut xml_buffer = Vec::new();
        writer::write_model_xml(self, &mut xml_buffer)?;
        let model_xml = String::from_utf8(xml_buffer)
            .map_err(|e| Error::xml_write(format!("Failed to convert XML to UTF-8: {}", e)))?;

        opc::create_package(writer, &model_xml, &self.attachments)
    }

    /// Write a 3MF file to a file path
    ///
    /// The package is written to a temporary file next to `path` and moved into
    /// place only once complete, so a failed write never leaves a partial file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use color3mf::Model;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let model = Model::new();
    /// model.write_to_file("output.3mf")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.write_atomically(path)
            .map_err(|e| Error::write(path, e))
    }

    fn write_atomically(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = temp_builder().tempfile_in(dir)?;
        let file = self.to_writer(std::io::BufWriter::new(temp.reopen()?))?;
        file.into_inner()
            .map_err(|e| Error::Io(e.into_error()))?
            .sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Temp files default to 0600; ask for 0666 so the umask applies as for `File::create`
#[cfg(unix)]
fn temp_builder() -> tempfile::Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = tempfile::Builder::new();
    builder.permissions(std::fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_builder() -> tempfile::Builder<'static, 'static> {
    tempfile::Builder::new()
}
