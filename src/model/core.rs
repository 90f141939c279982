//! Core 3MF types and structures

use super::material::{BaseMaterialGroup, ColorGroup};

/// 3MF namespaces understood by the reader and emitted by the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Core 3MF specification (always required)
    Core,
    /// Materials & Properties Extension (color groups)
    Material,
}

impl Extension {
    /// Get the namespace URI for this extension
    pub fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => "http://schemas.microsoft.com/3dmanufacturing/core/2015/02",
            Extension::Material => "http://schemas.microsoft.com/3dmanufacturing/material/2015/02",
        }
    }

    /// Namespace prefix used when writing elements of this extension
    pub fn prefix(&self) -> &'static str {
        match self {
            Extension::Core => "",
            Extension::Material => "m",
        }
    }
}

/// A 3D vertex with x, y, z coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle defined by three vertex indices
///
/// The order of `v1, v2, v3` encodes the facing of the triangle. The optional
/// per-vertex property indices belong to the vertex in the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
    /// Optional property group ID
    pub pid: Option<usize>,
    /// Optional property index for vertex 1
    pub p1: Option<usize>,
    /// Optional property index for vertex 2
    pub p2: Option<usize>,
    /// Optional property index for vertex 3
    pub p3: Option<usize>,
}

impl Triangle {
    /// Create a new triangle without properties
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self {
            v1,
            v2,
            v3,
            pid: None,
            p1: None,
            p2: None,
            p3: None,
        }
    }

    /// The vertex indices in order
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// The same face without any property references
    pub fn without_properties(&self) -> Self {
        Self::new(self.v1, self.v2, self.v3)
    }
}

/// A 3D mesh containing vertices and triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from a vertex buffer and triangle list
    pub fn from_geometry(vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }
}

/// A 4x3 affine transformation (12 floats in row-major order)
///
/// Format: `[m00 m01 m02 m10 m11 m12 m20 m21 m22 tx ty tz]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f64; 12]);

impl Transform {
    /// Number of values in a serialized 3MF transform
    pub const LEN: usize = 12;

    /// The identity transform
    pub const IDENTITY: Transform = Transform([
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
    ]);

    /// Whether this is exactly the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A component that references another object with optional transformation
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// ID of the referenced object
    pub objectid: usize,
    /// Optional transformation of the referenced object
    pub transform: Option<Transform>,
}

impl Component {
    /// Create a new component with the given object reference
    pub fn new(objectid: usize) -> Self {
        Self {
            objectid,
            transform: None,
        }
    }

    /// Create a new component with a transformation matrix
    pub fn with_transform(objectid: usize, transform: Transform) -> Self {
        Self {
            objectid,
            transform: Some(transform),
        }
    }
}

/// What an object is made of
///
/// An object is either a mesh or an assembly of other objects, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Triangle mesh geometry
    Mesh(Mesh),
    /// References to other objects (assemblies)
    Components(Vec<Component>),
}

/// Type of 3D object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// A standard model object
    Model,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// A surface object
    Surface,
    /// Other types
    Other,
}

impl ObjectType {
    /// Value of the `type` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
            ObjectType::Other => "other",
        }
    }
}

/// A 3D object
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Object ID
    pub id: usize,
    /// Object name (optional)
    pub name: Option<String>,
    /// Type of object
    pub object_type: ObjectType,
    /// Optional object-level property group ID
    pub pid: Option<usize>,
    /// Optional property index within `pid`, used to select a color from a color group
    pub pindex: Option<usize>,
    /// Mesh or components
    pub shape: ObjectShape,
}

impl Object {
    /// Create a mesh object
    pub fn mesh(id: usize, mesh: Mesh) -> Self {
        Self::with_shape(id, ObjectShape::Mesh(mesh))
    }

    /// Create a components object
    pub fn components(id: usize, components: Vec<Component>) -> Self {
        Self::with_shape(id, ObjectShape::Components(components))
    }

    fn with_shape(id: usize, shape: ObjectShape) -> Self {
        Self {
            id,
            name: None,
            object_type: ObjectType::Model,
            pid: None,
            pindex: None,
            shape,
        }
    }

    /// Bind the whole object to one entry of a property group
    pub fn set_object_level_property(&mut self, pid: usize, pindex: usize) {
        self.pid = Some(pid);
        self.pindex = Some(pindex);
    }

    /// The mesh, if this is a mesh object
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.shape {
            ObjectShape::Mesh(mesh) => Some(mesh),
            ObjectShape::Components(_) => None,
        }
    }

    /// The components, if this is a components object
    pub fn as_components(&self) -> Option<&[Component]> {
        match &self.shape {
            ObjectShape::Mesh(_) => None,
            ObjectShape::Components(components) => Some(components),
        }
    }
}

/// One resource of a model, viewed by kind
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A mesh object
    Mesh(&'a Object, &'a Mesh),
    /// A components object
    Components(&'a Object, &'a [Component]),
    /// A color group
    ColorGroup(&'a ColorGroup),
    /// A base materials group
    BaseMaterials(&'a BaseMaterialGroup),
}

impl Resource<'_> {
    /// The resource ID
    pub fn id(&self) -> usize {
        match self {
            Resource::Mesh(object, _) | Resource::Components(object, _) => object.id,
            Resource::ColorGroup(group) => group.id,
            Resource::BaseMaterials(group) => group.id,
        }
    }
}

/// Resources section containing objects and property groups
#[derive(Debug, Clone, Default)]
pub struct Resources {
    /// List of objects
    pub objects: Vec<Object>,
    /// List of color groups (materials extension)
    pub color_groups: Vec<ColorGroup>,
    /// List of base material groups
    pub base_material_groups: Vec<BaseMaterialGroup>,
}

impl Resources {
    /// Create a new empty resources section
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over every resource: objects first, then property groups
    pub fn iter(&self) -> impl Iterator<Item = Resource<'_>> {
        let objects = self.objects.iter().map(|object| match &object.shape {
            ObjectShape::Mesh(mesh) => Resource::Mesh(object, mesh),
            ObjectShape::Components(components) => Resource::Components(object, components),
        });
        let colors = self.color_groups.iter().map(Resource::ColorGroup);
        let bases = self
            .base_material_groups
            .iter()
            .map(Resource::BaseMaterials);
        objects.chain(colors).chain(bases)
    }

    /// Look up an object by ID
    pub fn object(&self, id: usize) -> Option<&Object> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Look up a color group by ID
    pub fn color_group(&self, id: usize) -> Option<&ColorGroup> {
        self.color_groups.iter().find(|group| group.id == id)
    }

    /// Whether any resource already uses `id`
    pub fn contains_id(&self, id: usize) -> bool {
        self.iter().any(|resource| resource.id() == id)
    }

    /// Mesh objects in declaration order
    pub fn mesh_objects(&self) -> impl Iterator<Item = (&Object, &Mesh)> {
        self.iter().filter_map(|resource| match resource {
            Resource::Mesh(object, mesh) => Some((object, mesh)),
            _ => None,
        })
    }
}

/// An item to be built, referencing an object
#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    /// Reference to object ID
    pub objectid: usize,
    /// Optional transformation matrix
    pub transform: Option<Transform>,
}

impl BuildItem {
    /// Create a new build item
    pub fn new(objectid: usize) -> Self {
        Self {
            objectid,
            transform: None,
        }
    }

    /// Create a new build item with a transformation matrix
    pub fn with_transform(objectid: usize, transform: Transform) -> Self {
        Self {
            objectid,
            transform: Some(transform),
        }
    }
}

/// Build section specifying which objects to manufacture
#[derive(Debug, Clone, Default)]
pub struct Build {
    /// List of items to build
    pub items: Vec<BuildItem>,
}

impl Build {
    /// Create a new empty build section
    pub fn new() -> Self {
        Self::default()
    }
}

/// Metadata entry of the model part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Name of the metadata entry
    pub name: String,
    /// Value of the metadata entry
    pub value: String,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An extra part stored in the package next to the model
///
/// Slicers look for their own configuration files at well-known paths, e.g.
/// `Metadata/model_settings.config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Part path inside the package, without a leading slash
    pub path: String,
    /// MIME content type of the part
    pub content_type: String,
    /// Relationship type linking the model part to this attachment, if any
    pub relationship_type: Option<String>,
    /// Raw content
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment that is not referenced by any relationship
    pub fn new(path: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        let path = path.into();
        Self {
            path: path.trim_start_matches('/').to_string(),
            content_type: content_type.into(),
            relationship_type: None,
            data,
        }
    }

    /// File extension of the part path (lowercase), used for content type defaults
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Complete 3MF model
#[derive(Debug, Clone)]
pub struct Model {
    /// Unit of measurement (e.g., "millimeter", "inch")
    pub unit: String,
    /// Metadata entries of the model part
    pub metadata: Vec<MetadataEntry>,
    /// Resources (objects, property groups)
    pub resources: Resources,
    /// Build specification
    pub build: Build,
    /// Additional package parts
    pub attachments: Vec<Attachment>,
}

impl Model {
    /// Create a new empty model
    pub fn new() -> Self {
        Self {
            unit: "millimeter".to_string(),
            metadata: Vec::new(),
            resources: Resources::new(),
            build: Build::new(),
            attachments: Vec::new(),
        }
    }

    /// Get metadata value by name
    pub fn get_metadata(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    /// Get an attachment by package path (leading slash optional)
    pub fn attachment(&self, path: &str) -> Option<&Attachment> {
        let path = path.trim_start_matches('/');
        self.attachments.iter().find(|a| a.path == path)
    }

    /// Add an attachment, replacing any existing one at the same path
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.retain(|a| a.path != attachment.path);
        self.attachments.push(attachment);
    }

    /// Extensions whose namespace the model needs when written
    pub fn used_extensions(&self) -> Vec<Extension> {
        let mut extensions = vec![Extension::Core];
        if !self.resources.color_groups.is_empty() {
            extensions.push(Extension::Material);
        }
        extensions
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
