//! Data structures representing 3MF models

// Declare all submodules
mod core;
mod material;

// Re-export all public types from core module
pub use core::{
    Attachment, Build, BuildItem, Component, Extension, Mesh, MetadataEntry, Model, Object,
    ObjectShape, ObjectType, Resource, Resources, Transform, Triangle, Vertex,
};

// Re-export all public types from material module
pub use material::{
    BaseMaterial, BaseMaterialGroup, ColorGroup, format_hex_color, parse_hex_color,
};
