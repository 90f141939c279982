//! Shared helpers for integration tests
//!
//! Builds small single-color 3MF packages on disk the way a renderer would
//! produce them.

#![allow(dead_code)]

use color3mf::{BuildItem, Mesh, Model, Object, Triangle, Vertex};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// Unit triangle vertices shared by most fixtures
pub fn unit_vertices() -> Vec<Vertex> {
    vec![
        Vertex::new(0.0, 0.0, 0.0),
        Vertex::new(10.0, 0.0, 0.0),
        Vertex::new(0.0, 10.0, 0.0),
        Vertex::new(0.0, 0.0, 10.0),
    ]
}

/// A model with one mesh object per triangle list
pub fn model_with_meshes(meshes: Vec<Vec<Triangle>>) -> Model {
    let mut model = Model::new();
    for (index, triangles) in meshes.into_iter().enumerate() {
        let id = index + 1;
        model
            .resources
            .objects
            .push(Object::mesh(id, Mesh::from_geometry(unit_vertices(), triangles)));
        model.build.items.push(BuildItem::new(id));
    }
    model
}

/// Write `model` as `<dir>/<name>` and return the path
pub fn write_model(dir: &Path, name: &str, model: &Model) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("create fixture");
    model.to_writer(file).expect("write fixture");
    path
}

/// Write a renderer-style file holding a single triangle mesh
pub fn write_single_triangle(dir: &Path, name: &str) -> PathBuf {
    write_model(dir, name, &model_with_meshes(vec![vec![Triangle::new(0, 1, 2)]]))
}

/// Write a package by hand from raw model XML
pub fn write_raw_package(dir: &Path, name: &str, model_xml: &str) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("create fixture");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(RELS.as_bytes()).unwrap();
    zip.start_file("3D/3dmodel.model", options).unwrap();
    zip.write_all(model_xml.as_bytes()).unwrap();

    zip.finish().unwrap();
    path
}

/// Write a file that is not a 3MF package at all
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"PK\x03\x04 truncated render output").expect("write fixture");
    path
}
