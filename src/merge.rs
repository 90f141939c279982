//! Merging single-color 3MF files into one multi-color model
//!
//! Each input file contributes its mesh objects as parts of one composite
//! model. Every part is bound to a single-entry color group holding the color
//! resolved from the file's label, gets its triangles canonicalized, and is
//! referenced with an identity transform from one aggregate components object.
//! A single build item references the aggregate.
//!
//! Inputs that cannot be read are skipped with a [`MergeWarning`]; the merge
//! only fails when nothing at all could be merged or the result cannot be
//! written.
//!
//! ```no_run
//! use color3mf::{MergeConfig, MergeSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = MergeSession::new(MergeConfig::default());
//! session.add_file("red.3mf");
//! session.add_file("blue.3mf");
//!
//! let output = session.finish()?;
//! output.model.write_to_file("merged.3mf")?;
//! # Ok(())
//! # }
//! ```

use crate::canonical::canonicalize;
use crate::color::ColorSpec;
use crate::error::{Error, MergeWarning, Result};
use crate::model::{
    BuildItem, ColorGroup, Component, Mesh, MetadataEntry, Model, Object, Transform, Triangle,
};
use crate::slicer::{MODEL_SETTINGS_PATH, SlicerConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration for a merge run
///
/// # Example
///
/// ```
/// use color3mf::MergeConfig;
///
/// let config = MergeConfig::new()
///     .with_unit("inch")
///     .with_slicer_metadata(false);
/// assert!(!config.slicer_metadata());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    unit: String,
    slicer_metadata: bool,
    metadata_path: String,
    application: Option<String>,
}

impl MergeConfig {
    /// Default configuration: millimeters, slicer metadata attached
    pub fn new() -> Self {
        Self {
            unit: "millimeter".to_string(),
            slicer_metadata: true,
            metadata_path: MODEL_SETTINGS_PATH.to_string(),
            application: Some(format!("color3mf {}", env!("CARGO_PKG_VERSION"))),
        }
    }

    /// Unit of the composite model
    ///
    /// Input coordinates are copied as they are; set this to the unit the
    /// renderer wrote.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Whether to attach the slicer part-naming document
    pub fn with_slicer_metadata(mut self, enabled: bool) -> Self {
        self.slicer_metadata = enabled;
        self
    }

    /// Package path of the slicer part-naming document
    pub fn with_metadata_path(mut self, path: impl Into<String>) -> Self {
        self.metadata_path = path.into();
        self
    }

    /// Value of the `Application` metadata entry, `None` to omit it
    pub fn with_application(mut self, application: Option<String>) -> Self {
        self.application = application;
        self
    }

    /// Unit of the composite model
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Whether the slicer part-naming document is attached
    pub fn slicer_metadata(&self) -> bool {
        self.slicer_metadata
    }

    /// Package path of the slicer part-naming document
    pub fn metadata_path(&self) -> &str {
        &self.metadata_path
    }

    /// Value of the `Application` metadata entry
    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One merged part: the mesh object's resource id and its color label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// Resource id of the mesh object in the composite model
    pub resource_id: usize,
    /// Color label of the input file the mesh came from
    pub label: String,
}

/// Result of a finished merge, still in memory
#[derive(Debug)]
pub struct MergeOutput {
    /// The composite model
    pub model: Model,
    /// Merged parts in the order they were added
    pub parts: Vec<PartRecord>,
    /// Non-fatal problems, in the order they occurred
    pub warnings: Vec<MergeWarning>,
}

/// Result of a merge written to disk
#[derive(Debug)]
pub struct MergeReport {
    /// Where the composite model was written
    pub output: PathBuf,
    /// Merged parts in the order they were added
    pub parts: Vec<PartRecord>,
    /// Non-fatal problems, in the order they occurred
    pub warnings: Vec<MergeWarning>,
}

/// State of one merge run
///
/// The session owns the composite model while it is being built. Files are
/// processed strictly in the order they are added, and resource ids are
/// assigned in that order; independent sessions share nothing.
#[derive(Debug)]
pub struct MergeSession {
    config: MergeConfig,
    model: Model,
    aggregate_id: usize,
    components: Vec<Component>,
    parts: Vec<PartRecord>,
    warnings: Vec<MergeWarning>,
    next_id: usize,
}

impl MergeSession {
    /// Start a merge; the aggregate components object takes the first resource id
    pub fn new(config: MergeConfig) -> Self {
        let mut model = Model::new();
        model.unit = config.unit.clone();

        Self {
            config,
            model,
            aggregate_id: 1,
            components: Vec::new(),
            parts: Vec::new(),
            warnings: Vec::new(),
            next_id: 2,
        }
    }

    /// Resource id of the aggregate components object
    pub fn aggregate_id(&self) -> usize {
        self.aggregate_id
    }

    /// Parts merged so far
    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    /// Warnings collected so far
    pub fn warnings(&self) -> &[MergeWarning] {
        &self.warnings
    }

    /// Merge one input file, labelled by its file stem
    ///
    /// Returns the number of parts the file contributed. A file that cannot
    /// be read contributes nothing and is recorded as a warning.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();

        let (spec, color_warning) = ColorSpec::from_path(path);
        if let Some(warning) = color_warning {
            self.warn(MergeWarning::ColorParse {
                path: path.to_path_buf(),
                warning,
            });
        }

        let model = match Model::from_file(path) {
            Ok(model) => model,
            Err(error) => {
                self.warn(MergeWarning::ModelRead {
                    path: path.to_path_buf(),
                    error,
                });
                return 0;
            }
        };

        self.add_model(&spec, &model, path)
    }

    /// Merge the mesh objects of an already loaded model
    ///
    /// `source` is only used to attribute warnings. Non-mesh resources are
    /// ignored. Returns the number of parts added.
    pub fn add_model(&mut self, spec: &ColorSpec, model: &Model, source: &Path) -> usize {
        let meshes: Vec<&Mesh> = model.resources.mesh_objects().map(|(_, mesh)| mesh).collect();
        if meshes.is_empty() {
            self.warn(MergeWarning::NoMeshes {
                path: source.to_path_buf(),
            });
            return 0;
        }

        let parts_before = self.parts.len();
        let group_id = self.allocate_id();
        let mut group = ColorGroup::new(group_id);
        let color_index = group.add_color(spec.rgba.to_rgba8());
        self.model.resources.color_groups.push(group);

        for mesh in meshes {
            let object_id = self.allocate_id();

            // Source property groups do not exist in the composite model
            let triangles: Vec<Triangle> = canonicalize(&mesh.triangles)
                .iter()
                .map(Triangle::without_properties)
                .collect();
            let mut object = Object::mesh(
                object_id,
                Mesh::from_geometry(mesh.vertices.clone(), triangles),
            );
            object.name = Some(spec.token.clone());
            object.set_object_level_property(group_id, color_index);
            self.model.resources.objects.push(object);

            self.components
                .push(Component::with_transform(object_id, Transform::IDENTITY));
            self.parts.push(PartRecord {
                resource_id: object_id,
                label: spec.token.clone(),
            });

            debug!(
                object_id,
                color_group = group_id,
                label = %spec.token,
                vertices = mesh.vertices.len(),
                triangles = mesh.triangles.len(),
                "Merged part from {}",
                source.display()
            );
        }

        self.parts.len() - parts_before
    }

    /// Build the aggregate, the build item and the slicer document
    ///
    /// Fails with [`Error::AggregateBuild`] when no input contributed a part.
    pub fn finish(self) -> Result<MergeOutput> {
        let MergeSession {
            config,
            mut model,
            aggregate_id,
            components,
            parts,
            warnings,
            ..
        } = self;

        if components.is_empty() {
            return Err(Error::AggregateBuild(format!(
                "no input contributed a mesh ({} warning(s))",
                warnings.len()
            )));
        }

        model
            .resources
            .objects
            .push(Object::components(aggregate_id, components));
        model
            .build
            .items
            .push(BuildItem::with_transform(aggregate_id, Transform::IDENTITY));

        if let Some(application) = config.application() {
            model
                .metadata
                .push(MetadataEntry::new("Application", application));
        }

        if config.slicer_metadata() {
            SlicerConfig::new(aggregate_id)
                .with_parts(parts.iter().cloned())
                .with_path(config.metadata_path())
                .attach(&mut model)?;
        }

        info!(
            parts = parts.len(),
            warnings = warnings.len(),
            "Merged composite model"
        );

        Ok(MergeOutput {
            model,
            parts,
            warnings,
        })
    }

    fn allocate_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn warn(&mut self, warning: MergeWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Merge `inputs` in order into an in-memory composite model
pub fn merge<I, P>(inputs: I, config: &MergeConfig) -> Result<MergeOutput>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut session = MergeSession::new(config.clone());
    for input in inputs {
        session.add_file(input);
    }
    session.finish()
}

/// Merge `inputs` in order and write the composite model to `dest`
///
/// Nothing is written when the merge fails, and a failed write leaves no
/// file at `dest`.
pub fn merge_to_file<I, P>(
    inputs: I,
    dest: impl AsRef<Path>,
    config: &MergeConfig,
) -> Result<MergeReport>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let dest = dest.as_ref();
    let output = merge(inputs, config)?;
    output.model.write_to_file(dest)?;

    info!(
        parts = output.parts.len(),
        "Wrote composite model to {}",
        dest.display()
    );

    Ok(MergeReport {
        output: dest.to_path_buf(),
        parts: output.parts,
        warnings: output.warnings,
    })
}
